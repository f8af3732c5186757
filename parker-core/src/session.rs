//! Host-driven sync session: the host passes location events and fetch results in,
//! the session returns actions for the host to perform. No I/O happens here.
//!
//! Two guards hold the ordering guarantees:
//! - a location fix is accepted only while `current_location` is empty, so a burst of
//!   callbacks produces one fetch;
//! - `fetch_in_flight` keeps a second search from starting until the first completes,
//!   and the location is not cleared for a new fix while it is set, so an older result
//!   can never overwrite a newer one.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::geo::Coordinate;
use crate::spot::ParkingSpot;

/// Default number of spots requested per search.
pub const DEFAULT_SEARCH_LIMIT: usize = 100;

/// Location permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthorizationState {
    #[default]
    Undetermined,
    Authorized,
    Denied,
}

/// Callbacks from the location collaborator, delivered in order over a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    AuthorizationChanged(AuthorizationState),
    LocationUpdate(Coordinate),
    LocationError(String),
}

/// Work for the host to carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    RequestAuthorization,
    RequestLocation,
    /// Run a spot search and hand the result back via `on_search_complete`.
    Search { center: Coordinate, limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingAuthorization,
    AwaitingLocation,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no device location available yet")]
    NoLocation,
}

/// Read-only copy of session state for presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub current_location: Option<Coordinate>,
    pub authorization: AuthorizationState,
    pub phase: SessionPhase,
    pub spots: Vec<ParkingSpot>,
    pub fetch_in_flight: bool,
    /// Incremented on every completed search; 0 means no search has finished yet.
    pub fetch_generation: u64,
    pub last_fetch_at: Option<DateTime<Utc>>,
    pub selected_spot: Option<String>,
    pub last_location_error: Option<String>,
}

impl SessionSnapshot {
    pub fn selected(&self) -> Option<&ParkingSpot> {
        let id = self.selected_spot.as_deref()?;
        self.spots.iter().find(|s| s.id == id)
    }
}

/// Orchestration state for one user session.
pub struct SyncSession {
    current_location: Option<Coordinate>,
    authorization: AuthorizationState,
    spots: Vec<ParkingSpot>,
    fetch_in_flight: bool,
    search_limit: usize,
    fetch_generation: u64,
    last_fetch_at: Option<DateTime<Utc>>,
    selected_spot: Option<String>,
    last_location_error: Option<String>,
}

impl SyncSession {
    /// New session with `current_location` seeded to `default_center` until the first real fix.
    pub fn new(default_center: Coordinate, authorization: AuthorizationState) -> Self {
        Self {
            current_location: Some(default_center),
            authorization,
            spots: Vec::new(),
            fetch_in_flight: false,
            search_limit: DEFAULT_SEARCH_LIMIT,
            fetch_generation: 0,
            last_fetch_at: None,
            selected_spot: None,
            last_location_error: None,
        }
    }

    pub fn set_search_limit(&mut self, limit: usize) {
        self.search_limit = limit;
    }

    pub fn search_limit(&self) -> usize {
        self.search_limit
    }

    pub fn current_location(&self) -> Option<Coordinate> {
        self.current_location
    }

    pub fn authorization(&self) -> AuthorizationState {
        self.authorization
    }

    pub fn spots(&self) -> &[ParkingSpot] {
        &self.spots
    }

    pub fn fetch_in_flight(&self) -> bool {
        self.fetch_in_flight
    }

    pub fn phase(&self) -> SessionPhase {
        match (self.authorization, self.current_location) {
            (AuthorizationState::Authorized, Some(_)) => SessionPhase::Ready,
            (AuthorizationState::Authorized, None) => SessionPhase::AwaitingLocation,
            _ => SessionPhase::AwaitingAuthorization,
        }
    }

    /// Ask for a fresh fix if permitted, otherwise ask for permission.
    /// Does nothing while a search is running; the host asks again once it completes.
    pub fn request_location(&mut self) -> Vec<SessionAction> {
        if self.authorization != AuthorizationState::Authorized {
            return vec![SessionAction::RequestAuthorization];
        }
        if self.fetch_in_flight {
            debug!("fetch in flight, not requesting a new location");
            return Vec::new();
        }
        self.current_location = None;
        vec![SessionAction::RequestLocation]
    }

    /// Dispatch a collaborator callback.
    pub fn on_event(&mut self, event: LocationEvent) -> Vec<SessionAction> {
        match event {
            LocationEvent::AuthorizationChanged(state) => self.on_authorization_changed(state),
            LocationEvent::LocationUpdate(coord) => self.on_location_update(coord),
            LocationEvent::LocationError(err) => {
                self.on_location_error(err);
                Vec::new()
            }
        }
    }

    pub fn on_authorization_changed(&mut self, state: AuthorizationState) -> Vec<SessionAction> {
        info!(?state, "location authorization changed");
        self.authorization = state;
        if state == AuthorizationState::Authorized {
            if self.fetch_in_flight {
                debug!("fetch in flight, keeping current location");
                return Vec::new();
            }
            self.current_location = None;
            return vec![SessionAction::RequestLocation];
        }
        Vec::new()
    }

    /// First fix after a request wins; later ones are dropped until the next request.
    pub fn on_location_update(&mut self, coord: Coordinate) -> Vec<SessionAction> {
        if self.current_location.is_some() {
            debug!(?coord, "location already set, ignoring update");
            return Vec::new();
        }
        if !coord.is_valid() {
            warn!(?coord, "ignoring invalid coordinate");
            return Vec::new();
        }
        self.current_location = Some(coord);
        self.last_location_error = None;
        self.fetch_spots()
    }

    pub fn on_location_error(&mut self, err: String) {
        warn!(error = %err, "location request failed");
        self.last_location_error = Some(err);
    }

    /// Start a search unless one is already running or there is nothing to search around.
    pub fn fetch_spots(&mut self) -> Vec<SessionAction> {
        if self.fetch_in_flight {
            debug!("fetch already in flight, skipping");
            return Vec::new();
        }
        let Some(center) = self.current_location else {
            debug!("no location to search around, skipping fetch");
            return Vec::new();
        };
        self.fetch_in_flight = true;
        vec![SessionAction::Search {
            center,
            limit: self.search_limit,
        }]
    }

    /// Store a finished search. Empty results replace the list too.
    pub fn on_search_complete(&mut self, spots: Vec<ParkingSpot>) {
        debug!(count = spots.len(), "search complete");
        self.spots = spots;
        self.fetch_in_flight = false;
        self.fetch_generation = self.fetch_generation.saturating_add(1);
        self.last_fetch_at = Some(Utc::now());
        let selection_gone = self
            .selected_spot
            .as_ref()
            .is_some_and(|id| !self.spots.iter().any(|s| &s.id == id));
        if selection_gone {
            self.selected_spot = None;
        }
    }

    /// Coordinate to attach to a report or status update.
    pub fn report_location(&self) -> Result<Coordinate, SessionError> {
        self.current_location.ok_or(SessionError::NoLocation)
    }

    /// Select a spot by id. Returns false (and leaves selection unchanged) if no such spot.
    pub fn select_spot(&mut self, id: &str) -> bool {
        if self.spots.iter().any(|s| s.id == id) {
            self.selected_spot = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected_spot = None;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_location: self.current_location,
            authorization: self.authorization,
            phase: self.phase(),
            spots: self.spots.clone(),
            fetch_in_flight: self.fetch_in_flight,
            fetch_generation: self.fetch_generation,
            last_fetch_at: self.last_fetch_at,
            selected_spot: self.selected_spot.clone(),
            last_location_error: self.last_location_error.clone(),
        }
    }
}
