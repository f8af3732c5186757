//! Parker client core: spot eligibility, geo math, credential hashing and the sync session.
//! Host-driven: no I/O; the host passes location events and search results in and
//! performs the actions the session returns.

pub mod availability;
pub mod credential;
pub mod ffi;
pub mod geo;
pub mod session;
pub mod spot;

pub use availability::{can_park_now, marker_state, marker_state_now, MarkerState};
pub use credential::{AuthCredential, AuthResult};
pub use geo::{distance, format_distance, rank_by_distance, Coordinate, DEFAULT_CENTER};
pub use session::{
    AuthorizationState, LocationEvent, SessionAction, SessionError, SessionPhase,
    SessionSnapshot, SyncSession, DEFAULT_SEARCH_LIMIT,
};
pub use spot::{ParkingSpot, Restriction, RestrictionError, SpotRecord, SpotStatus};
