//! C ABI for linking parker-core as a static library from the iOS (Swift) and Android (NDK) apps.
//! The host owns location callbacks and networking; it forwards them here and acts on the
//! returned action codes. Search results come back as the backend's JSON body.
//!
//! Weekday codes are 0 = Monday through 6 = Sunday; times of day are seconds since midnight
//! in device-local time.

use std::ffi::{c_char, c_void, CStr};
use std::os::raw::c_int;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use tracing::warn;

use crate::availability::{self, MarkerState};
use crate::credential;
use crate::geo::{self, Coordinate};
use crate::session::{AuthorizationState, SessionAction, SyncSession};
use crate::spot::{ParkingSpot, Restriction, SpotRecord};

/// ABI revision. Bump when a signature below changes.
pub const FFI_VERSION: u8 = 2;

/// No action for the host.
pub const PARKER_ACTION_NONE: c_int = 0;
/// Host should ask the user for location permission.
pub const PARKER_ACTION_REQUEST_AUTHORIZATION: c_int = 1;
/// Host should request a one-shot location fix.
pub const PARKER_ACTION_REQUEST_LOCATION: c_int = 2;
/// Host should run a spot search around the current location.
pub const PARKER_ACTION_SEARCH: c_int = 3;

pub const PARKER_MARKER_BLOCKED: c_int = 0;
pub const PARKER_MARKER_AVAILABLE: c_int = 1;
pub const PARKER_MARKER_CAUTION: c_int = 2;
pub const PARKER_MARKER_UNKNOWN: c_int = 3;

#[no_mangle]
pub extern "C" fn parker_core_version() -> u8 {
    FFI_VERSION
}

/// Great-circle distance in meters.
#[no_mangle]
pub extern "C" fn parker_distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    geo::distance(Coordinate::new(lat1, lon1), Coordinate::new(lat2, lon2))
}

/// Write the distance label (UTF-8, NUL-terminated) into out_buf. Returns bytes written
/// excluding the NUL, or -1 if out_buf is null or too small.
#[no_mangle]
pub extern "C" fn parker_format_distance(meters: f64, out_buf: *mut u8, out_len: usize) -> c_int {
    write_c_string(&geo::format_distance(meters), out_buf, out_len)
}

/// Hash a NUL-terminated UTF-8 string into 64 hex chars + NUL. Returns 64, or -1 on error.
#[no_mangle]
pub extern "C" fn parker_hash_credential(
    text: *const c_char,
    out_buf: *mut u8,
    out_len: usize,
) -> c_int {
    if text.is_null() {
        return -1;
    }
    let text = match unsafe { CStr::from_ptr(text) }.to_str() {
        Ok(s) => s,
        Err(_) => return -1,
    };
    write_c_string(&credential::hash(text), out_buf, out_len)
}

/// Authorization codes: 0 undetermined, 1 authorized, 2 denied.
fn authorization_from_code(code: c_int) -> AuthorizationState {
    match code {
        1 => AuthorizationState::Authorized,
        2 => AuthorizationState::Denied,
        _ => AuthorizationState::Undetermined,
    }
}

fn action_code(actions: &[SessionAction]) -> c_int {
    // The session emits at most one action per call.
    match actions.first() {
        None => PARKER_ACTION_NONE,
        Some(SessionAction::RequestAuthorization) => PARKER_ACTION_REQUEST_AUTHORIZATION,
        Some(SessionAction::RequestLocation) => PARKER_ACTION_REQUEST_LOCATION,
        Some(SessionAction::Search { .. }) => PARKER_ACTION_SEARCH,
    }
}

/// Create a session seeded at (default_lat, default_lon). Returns opaque handle.
#[no_mangle]
pub extern "C" fn parker_session_create(
    default_lat: f64,
    default_lon: f64,
    authorization: c_int,
) -> *mut c_void {
    let session = SyncSession::new(
        Coordinate::new(default_lat, default_lon),
        authorization_from_code(authorization),
    );
    Box::into_raw(Box::new(session)) as *mut c_void
}

/// Destroy session. No-op if h is null.
#[no_mangle]
pub extern "C" fn parker_session_destroy(h: *mut c_void) {
    if h.is_null() {
        return;
    }
    let _ = unsafe { Box::from_raw(h as *mut SyncSession) };
}

/// Returns an action code, or -1 if h is null.
#[no_mangle]
pub extern "C" fn parker_session_request_location(h: *mut c_void) -> c_int {
    if h.is_null() {
        return -1;
    }
    let session = unsafe { &mut *(h as *mut SyncSession) };
    action_code(&session.request_location())
}

/// Returns an action code, or -1 if h is null.
#[no_mangle]
pub extern "C" fn parker_session_authorization_changed(
    h: *mut c_void,
    authorization: c_int,
) -> c_int {
    if h.is_null() {
        return -1;
    }
    let session = unsafe { &mut *(h as *mut SyncSession) };
    action_code(&session.on_authorization_changed(authorization_from_code(authorization)))
}

/// Returns PARKER_ACTION_SEARCH if the fix was accepted and a search should start,
/// PARKER_ACTION_NONE if it was ignored, or -1 if h is null.
#[no_mangle]
pub extern "C" fn parker_session_location_update(h: *mut c_void, lat: f64, lon: f64) -> c_int {
    if h.is_null() {
        return -1;
    }
    let session = unsafe { &mut *(h as *mut SyncSession) };
    action_code(&session.on_location_update(Coordinate::new(lat, lon)))
}

/// Host finished the search it was asked for. `body` is the backend's spot array as JSON.
/// A null or empty body means the search failed and the list is emptied.
/// Returns the number of spots stored, or -1 if h is null or the body does not decode;
/// the in-flight guard is released either way.
#[no_mangle]
pub extern "C" fn parker_session_search_complete(
    h: *mut c_void,
    body: *const u8,
    body_len: usize,
) -> c_int {
    if h.is_null() {
        return -1;
    }
    let session = unsafe { &mut *(h as *mut SyncSession) };
    if body.is_null() || body_len == 0 {
        session.on_search_complete(Vec::new());
        return 0;
    }
    let bytes = unsafe { std::slice::from_raw_parts(body, body_len) };
    match serde_json::from_slice::<Vec<SpotRecord>>(bytes) {
        Ok(records) => {
            let spots: Vec<ParkingSpot> = records.into_iter().map(ParkingSpot::from).collect();
            let count = spots.len();
            session.on_search_complete(spots);
            c_int::try_from(count).unwrap_or(c_int::MAX)
        }
        Err(e) => {
            warn!(error = %e, "undecodable search body, storing empty result");
            session.on_search_complete(Vec::new());
            -1
        }
    }
}

/// Number of spots from the last completed search, or -1 if h is null.
#[no_mangle]
pub extern "C" fn parker_session_spot_count(h: *const c_void) -> c_int {
    if h.is_null() {
        return -1;
    }
    let session = unsafe { &*(h as *const SyncSession) };
    c_int::try_from(session.spots().len()).unwrap_or(c_int::MAX)
}

/// Marker code (PARKER_MARKER_*) for the spot at `index` at the given local time.
/// Returns -1 if h is null, index is out of range, or the time is invalid.
#[no_mangle]
pub extern "C" fn parker_session_marker_state(
    h: *const c_void,
    index: usize,
    now_weekday: c_int,
    now_sec: u32,
) -> c_int {
    if h.is_null() {
        return -1;
    }
    let session = unsafe { &*(h as *const SyncSession) };
    let (Some(spot), Some(now)) = (session.spots().get(index), local_instant(now_weekday, now_sec))
    else {
        return -1;
    };
    marker_code(availability::marker_state(spot, now))
}

/// Select a spot by NUL-terminated id. Returns 1 if selected, 0 if no such spot, -1 on error.
#[no_mangle]
pub extern "C" fn parker_session_select_spot(h: *mut c_void, id: *const c_char) -> c_int {
    if h.is_null() || id.is_null() {
        return -1;
    }
    let id = match unsafe { CStr::from_ptr(id) }.to_str() {
        Ok(s) => s,
        Err(_) => return -1,
    };
    let session = unsafe { &mut *(h as *mut SyncSession) };
    c_int::from(session.select_spot(id))
}

/// Eligibility check for a spot restricted on `day` from `start_sec` to `end_sec`.
/// Returns 1 if parking is legal at (now_weekday, now_sec), 0 if blocked, -1 on invalid
/// codes or seconds. A window ending before it starts is treated as no restriction.
#[no_mangle]
pub extern "C" fn parker_can_park_now(
    day: c_int,
    start_sec: u32,
    end_sec: u32,
    now_weekday: c_int,
    now_sec: u32,
) -> c_int {
    let (Some(day), Some(start), Some(end), Some(now)) = (
        weekday_from_code(day),
        time_from_secs(start_sec),
        time_from_secs(end_sec),
        local_instant(now_weekday, now_sec),
    ) else {
        return -1;
    };
    match Restriction::new(day, start, end) {
        Ok(r) => c_int::from(!r.covers(now)),
        Err(_) => 1,
    }
}

fn weekday_from_code(code: c_int) -> Option<Weekday> {
    Weekday::try_from(u8::try_from(code).ok()?).ok()
}

fn time_from_secs(secs: u32) -> Option<NaiveTime> {
    NaiveTime::from_num_seconds_from_midnight_opt(secs, 0)
}

/// A local date-time on the given weekday. Only weekday and time of day matter to the
/// eligibility rules, so any week will do; ISO week 1 of 2024 starts on a Monday.
fn local_instant(weekday: c_int, secs: u32) -> Option<NaiveDateTime> {
    let date = NaiveDate::from_isoywd_opt(2024, 1, weekday_from_code(weekday)?)?;
    Some(date.and_time(time_from_secs(secs)?))
}

fn marker_code(state: MarkerState) -> c_int {
    match state {
        MarkerState::Blocked => PARKER_MARKER_BLOCKED,
        MarkerState::Available => PARKER_MARKER_AVAILABLE,
        MarkerState::Caution => PARKER_MARKER_CAUTION,
        MarkerState::Unknown => PARKER_MARKER_UNKNOWN,
    }
}

fn write_c_string(s: &str, out_buf: *mut u8, out_len: usize) -> c_int {
    let bytes = s.as_bytes();
    if out_buf.is_null() || out_len < bytes.len() + 1 {
        return -1;
    }
    unsafe {
        out_buf.copy_from_nonoverlapping(bytes.as_ptr(), bytes.len());
        *out_buf.add(bytes.len()) = 0;
    }
    bytes.len() as c_int
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPOTS: &[u8] = br#"[
      {"id": 12, "latitude": 40.7001, "longitude": -73.9001, "street_name": "Bond St",
       "status": "available", "day": "Monday", "start_time": "08:00", "end_time": "18:00"},
      {"id": "13", "latitude": 40.7002, "longitude": -73.9002, "street_name": "Hoyt St",
       "status": "restricted"}
    ]"#;

    fn session<'a>(h: *mut c_void) -> &'a mut SyncSession {
        unsafe { &mut *(h as *mut SyncSession) }
    }

    #[test]
    fn format_distance_into_buffer() {
        let mut buf = [0u8; 16];
        let n = parker_format_distance(1500.0, buf.as_mut_ptr(), buf.len());
        assert_eq!(n, 6);
        assert_eq!(&buf[..7], b"1.5 km\0");
        let mut small = [0u8; 4];
        assert_eq!(parker_format_distance(1500.0, small.as_mut_ptr(), small.len()), -1);
    }

    #[test]
    fn hash_credential_into_buffer() {
        let mut buf = [0u8; 65];
        let n = parker_hash_credential(c"abc".as_ptr(), buf.as_mut_ptr(), buf.len());
        assert_eq!(n, 64);
        assert_eq!(&buf[..64], credential::hash("abc").as_bytes());
        assert_eq!(buf[64], 0);
    }

    #[test]
    fn session_lifecycle_over_ffi() {
        let h = parker_session_create(40.6935, -73.9859, 0);
        assert!(!h.is_null());
        assert_eq!(
            parker_session_request_location(h),
            PARKER_ACTION_REQUEST_AUTHORIZATION
        );
        assert_eq!(
            parker_session_authorization_changed(h, 1),
            PARKER_ACTION_REQUEST_LOCATION
        );
        assert_eq!(parker_session_location_update(h, 40.7, -73.9), PARKER_ACTION_SEARCH);
        assert_eq!(parker_session_location_update(h, 40.8, -73.9), PARKER_ACTION_NONE);
        // Relocating is refused until the running search reports back.
        assert_eq!(parker_session_request_location(h), PARKER_ACTION_NONE);
        assert_eq!(
            parker_session_search_complete(h, SPOTS.as_ptr(), SPOTS.len()),
            2
        );
        assert_eq!(parker_session_spot_count(h), 2);
        assert_eq!(
            parker_session_request_location(h),
            PARKER_ACTION_REQUEST_LOCATION
        );
        parker_session_destroy(h);
    }

    #[test]
    fn search_results_survive_the_boundary() {
        let h = parker_session_create(40.7, -73.9, 1);
        // Seeded and authorized, so a fix is not needed before the first search.
        assert_eq!(
            action_code(&session(h).fetch_spots()),
            PARKER_ACTION_SEARCH
        );
        assert_eq!(
            parker_session_search_complete(h, SPOTS.as_ptr(), SPOTS.len()),
            2
        );
        assert_eq!(parker_session_select_spot(h, c"12".as_ptr()), 1);
        assert_eq!(parker_session_select_spot(h, c"99".as_ptr()), 0);

        // Monday 10:00 is inside spot 12's window; Tuesday is not.
        assert_eq!(
            parker_session_marker_state(h, 0, 0, 10 * 3600),
            PARKER_MARKER_BLOCKED
        );
        assert_eq!(
            parker_session_marker_state(h, 0, 1, 10 * 3600),
            PARKER_MARKER_AVAILABLE
        );
        assert_eq!(
            parker_session_marker_state(h, 1, 0, 10 * 3600),
            PARKER_MARKER_CAUTION
        );
        assert_eq!(parker_session_marker_state(h, 2, 0, 0), -1);
        assert_eq!(parker_session_marker_state(h, 0, 7, 0), -1);

        assert_eq!(session(h).snapshot().selected_spot.as_deref(), Some("12"));
        parker_session_destroy(h);
    }

    #[test]
    fn bad_search_body_releases_guard_with_empty_list() {
        let h = parker_session_create(40.7, -73.9, 1);
        session(h).fetch_spots();
        let junk = b"<html>502</html>";
        assert_eq!(parker_session_search_complete(h, junk.as_ptr(), junk.len()), -1);
        assert_eq!(parker_session_spot_count(h), 0);
        assert!(!session(h).fetch_in_flight());
        assert_eq!(session(h).snapshot().fetch_generation, 1);

        session(h).fetch_spots();
        assert_eq!(parker_session_search_complete(h, std::ptr::null(), 0), 0);
        assert_eq!(session(h).snapshot().fetch_generation, 2);
        parker_session_destroy(h);
    }

    #[test]
    fn can_park_now_over_ffi() {
        let (eight, six_pm) = (8 * 3600, 18 * 3600);
        // Monday 08:00-18:00, inclusive at both ends.
        assert_eq!(parker_can_park_now(0, eight, six_pm, 0, eight - 1), 1);
        assert_eq!(parker_can_park_now(0, eight, six_pm, 0, eight), 0);
        assert_eq!(parker_can_park_now(0, eight, six_pm, 0, six_pm), 0);
        assert_eq!(parker_can_park_now(0, eight, six_pm, 0, six_pm + 1), 1);
        assert_eq!(parker_can_park_now(0, eight, six_pm, 6, 12 * 3600), 1);
        // Inverted window is no restriction.
        assert_eq!(parker_can_park_now(4, 22 * 3600, 6 * 3600, 4, 23 * 3600), 1);
        assert_eq!(parker_can_park_now(7, eight, six_pm, 0, 0), -1);
        assert_eq!(parker_can_park_now(0, eight, six_pm, -1, 0), -1);
        assert_eq!(parker_can_park_now(0, eight, 86_400, 0, 0), -1);
    }

    #[test]
    fn null_handles_rejected() {
        let null = std::ptr::null_mut();
        assert_eq!(parker_session_request_location(null), -1);
        assert_eq!(parker_session_location_update(null, 0.0, 0.0), -1);
        assert_eq!(parker_session_search_complete(null, std::ptr::null(), 0), -1);
        assert_eq!(parker_session_spot_count(null), -1);
        assert_eq!(parker_session_marker_state(null, 0, 0, 0), -1);
        assert_eq!(parker_session_select_spot(null, c"1".as_ptr()), -1);
        parker_session_destroy(null);
    }
}
