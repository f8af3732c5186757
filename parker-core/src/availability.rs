//! Legal-to-park decisions, derived from spot metadata and the wall clock.
//! Nothing here is cached: callers recompute on every render because `now` keeps moving.

use chrono::{Local, NaiveDateTime};

use crate::spot::{ParkingSpot, SpotStatus};

/// What the map pin for a spot should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerState {
    /// Inside the restriction window right now.
    Blocked,
    Available,
    /// Legal now, but the backend flags it restricted.
    Caution,
    Unknown,
}

/// True unless `now` (device-local wall clock) falls inside the spot's restriction window.
/// Both window ends are inclusive.
pub fn can_park_now(spot: &ParkingSpot, now: NaiveDateTime) -> bool {
    spot.restriction.map_or(true, |r| !r.covers(now))
}

pub fn marker_state(spot: &ParkingSpot, now: NaiveDateTime) -> MarkerState {
    if !can_park_now(spot, now) {
        return MarkerState::Blocked;
    }
    match spot.status {
        SpotStatus::Available => MarkerState::Available,
        SpotStatus::Restricted => MarkerState::Caution,
        _ => MarkerState::Unknown,
    }
}

/// `marker_state` against the device's local clock.
pub fn marker_state_now(spot: &ParkingSpot) -> MarkerState {
    marker_state(spot, Local::now().naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use crate::spot::Restriction;
    use chrono::{NaiveDate, NaiveTime, Weekday};

    fn spot(status: SpotStatus, restriction: Option<Restriction>) -> ParkingSpot {
        ParkingSpot {
            id: "s1".to_string(),
            location: Coordinate::new(40.0, -74.0),
            label: "Atlantic Ave".to_string(),
            status,
            restriction,
            last_reported_at: None,
        }
    }

    fn monday_8_to_18() -> Restriction {
        Restriction::new(
            Weekday::Mon,
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        )
        .unwrap()
    }

    // 2025-05-05 is a Monday.
    fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, day)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn unrestricted_always_legal() {
        let s = spot(SpotStatus::Unknown, None);
        assert!(can_park_now(&s, at(5, 10, 0, 0)));
        assert!(can_park_now(&s, at(6, 0, 0, 0)));
        assert!(can_park_now(&s, at(11, 23, 59, 59)));
    }

    #[test]
    fn inside_window_blocked() {
        let s = spot(SpotStatus::Available, Some(monday_8_to_18()));
        assert!(!can_park_now(&s, at(5, 10, 0, 0)));
    }

    #[test]
    fn window_boundaries() {
        let s = spot(SpotStatus::Available, Some(monday_8_to_18()));
        assert!(can_park_now(&s, at(5, 7, 59, 59)));
        assert!(!can_park_now(&s, at(5, 8, 0, 0)));
        assert!(!can_park_now(&s, at(5, 18, 0, 0)));
        assert!(can_park_now(&s, at(5, 18, 0, 1)));
    }

    #[test]
    fn other_day_legal() {
        let s = spot(SpotStatus::Available, Some(monday_8_to_18()));
        assert!(can_park_now(&s, at(6, 10, 0, 0)));
        // Following Monday is blocked again.
        assert!(!can_park_now(&s, at(12, 10, 0, 0)));
    }

    #[test]
    fn single_instant_window() {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        let r = Restriction::new(Weekday::Mon, noon, noon).unwrap();
        let s = spot(SpotStatus::Available, Some(r));
        assert!(!can_park_now(&s, at(5, 12, 0, 0)));
        assert!(can_park_now(&s, at(5, 12, 0, 1)));
    }

    #[test]
    fn marker_blocked_overrides_status() {
        let s = spot(SpotStatus::Available, Some(monday_8_to_18()));
        assert_eq!(marker_state(&s, at(5, 9, 0, 0)), MarkerState::Blocked);
        assert_eq!(marker_state(&s, at(5, 19, 0, 0)), MarkerState::Available);
    }

    #[test]
    fn marker_maps_status() {
        let now = at(7, 12, 0, 0);
        assert_eq!(
            marker_state(&spot(SpotStatus::Available, None), now),
            MarkerState::Available
        );
        assert_eq!(
            marker_state(&spot(SpotStatus::Restricted, None), now),
            MarkerState::Caution
        );
        assert_eq!(
            marker_state(&spot(SpotStatus::Occupied, None), now),
            MarkerState::Unknown
        );
        assert_eq!(
            marker_state(&spot(SpotStatus::Other("towing".into()), None), now),
            MarkerState::Unknown
        );
    }
}
