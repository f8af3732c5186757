//! Location collaborator: the platform side that owns permission prompts and GPS.
//! Requests are fire-and-forget; answers arrive later as `LocationEvent`s on a channel.

use std::sync::Mutex;

use parker_core::{AuthorizationState, Coordinate, LocationEvent};
use tokio::sync::mpsc;
use tracing::debug;

pub type LocationEvents = mpsc::UnboundedReceiver<LocationEvent>;
pub type LocationEventSender = mpsc::UnboundedSender<LocationEvent>;

pub trait LocationProvider: Send + Sync {
    fn authorization_state(&self) -> AuthorizationState;
    /// Prompt for permission. Result arrives as `AuthorizationChanged`.
    fn request_authorization(&self);
    /// Ask for one fix. Result arrives as `LocationUpdate` or `LocationError`.
    fn request_one_shot_location(&self);
}

/// Create the channel a provider publishes into and the session driver consumes.
pub fn event_channel() -> (LocationEventSender, LocationEvents) {
    mpsc::unbounded_channel()
}

/// Provider that reports a fixed coordinate, for the CLI and for hosts without GPS.
/// Permission is granted or denied according to `grant`.
pub struct FixedLocationProvider {
    position: Coordinate,
    grant: bool,
    state: Mutex<AuthorizationState>,
    events: LocationEventSender,
}

impl FixedLocationProvider {
    pub fn new(position: Coordinate, grant: bool, events: LocationEventSender) -> Self {
        Self {
            position,
            grant,
            state: Mutex::new(AuthorizationState::Undetermined),
            events,
        }
    }

    /// Provider that starts out already authorized.
    pub fn authorized(position: Coordinate, events: LocationEventSender) -> Self {
        let p = Self::new(position, true, events);
        p.set_state(AuthorizationState::Authorized);
        p
    }

    fn set_state(&self, state: AuthorizationState) {
        if let Ok(mut s) = self.state.lock() {
            *s = state;
        }
    }

    fn emit(&self, event: LocationEvent) {
        // The receiver goes away when the session is torn down; nothing to do then.
        if self.events.send(event).is_err() {
            debug!("location event dropped, session closed");
        }
    }
}

impl LocationProvider for FixedLocationProvider {
    fn authorization_state(&self) -> AuthorizationState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(AuthorizationState::Undetermined)
    }

    fn request_authorization(&self) {
        let state = if self.grant {
            AuthorizationState::Authorized
        } else {
            AuthorizationState::Denied
        };
        self.set_state(state);
        self.emit(LocationEvent::AuthorizationChanged(state));
    }

    fn request_one_shot_location(&self) {
        if self.authorization_state() != AuthorizationState::Authorized {
            self.emit(LocationEvent::LocationError(
                "location permission not granted".to_string(),
            ));
            return;
        }
        self.emit(LocationEvent::LocationUpdate(self.position));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HERE: Coordinate = Coordinate::new(40.70, -73.99);

    #[test]
    fn grant_then_locate() {
        let (tx, mut rx) = event_channel();
        let p = FixedLocationProvider::new(HERE, true, tx);
        assert_eq!(p.authorization_state(), AuthorizationState::Undetermined);
        p.request_authorization();
        assert_eq!(
            rx.try_recv().unwrap(),
            LocationEvent::AuthorizationChanged(AuthorizationState::Authorized)
        );
        p.request_one_shot_location();
        assert_eq!(rx.try_recv().unwrap(), LocationEvent::LocationUpdate(HERE));
    }

    #[test]
    fn denied_provider_reports_error() {
        let (tx, mut rx) = event_channel();
        let p = FixedLocationProvider::new(HERE, false, tx);
        p.request_authorization();
        assert_eq!(
            rx.try_recv().unwrap(),
            LocationEvent::AuthorizationChanged(AuthorizationState::Denied)
        );
        p.request_one_shot_location();
        assert!(matches!(
            rx.try_recv().unwrap(),
            LocationEvent::LocationError(_)
        ));
    }

    #[test]
    fn closed_channel_is_harmless() {
        let (tx, rx) = event_channel();
        drop(rx);
        let p = FixedLocationProvider::authorized(HERE, tx);
        p.request_one_shot_location();
    }
}
