//! Async host for `SyncSession`: consumes location events from a channel, performs the
//! actions the session returns, and publishes a snapshot after every change.
//!
//! Searches run on spawned tasks so the event loop keeps draining location callbacks
//! while a fetch is in flight; the session's in-flight guard drops any fetch or location
//! request made meanwhile. There is no cancellation: a running search always completes
//! and its result is stored.

use std::sync::Arc;

use parker_core::{Coordinate, LocationEvent, SessionAction, SessionSnapshot, SyncSession};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::ReportError;
use crate::location::{LocationEvents, LocationProvider};
use crate::repository::SpotRepository;

pub struct SyncDriver<R, L> {
    session: Arc<Mutex<SyncSession>>,
    repository: Arc<R>,
    location: Arc<L>,
    snapshots: Arc<watch::Sender<SessionSnapshot>>,
}

impl<R, L> Clone for SyncDriver<R, L> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            repository: self.repository.clone(),
            location: self.location.clone(),
            snapshots: self.snapshots.clone(),
        }
    }
}

impl<R, L> SyncDriver<R, L>
where
    R: SpotRepository + 'static,
    L: LocationProvider + 'static,
{
    /// New session seeded at `default_center`, with authorization read from the provider.
    pub fn new(
        repository: Arc<R>,
        location: Arc<L>,
        default_center: Coordinate,
        search_limit: usize,
    ) -> Self {
        let mut session = SyncSession::new(default_center, location.authorization_state());
        session.set_search_limit(search_limit);
        let (tx, _) = watch::channel(session.snapshot());
        Self {
            session: Arc::new(Mutex::new(session)),
            repository,
            location,
            snapshots: Arc::new(tx),
        }
    }

    /// Observe session state. Receivers only ever see whole snapshots.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Consume location events until every sender is dropped.
    pub async fn run(self, mut events: LocationEvents) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        debug!("location event channel closed, driver stopping");
    }

    /// Run the event loop on a background task.
    pub fn spawn(&self, events: LocationEvents) -> JoinHandle<()> {
        tokio::spawn(self.clone().run(events))
    }

    pub async fn handle_event(&self, event: LocationEvent) {
        self.apply(|s| s.on_event(event)).await;
    }

    pub async fn request_location(&self) {
        self.apply(SyncSession::request_location).await;
    }

    /// Refresh spots around the current location. No-op while a fetch is in flight.
    pub async fn fetch_spots(&self) {
        self.apply(SyncSession::fetch_spots).await;
    }

    pub async fn select_spot(&self, id: &str) -> bool {
        let mut session = self.session.lock().await;
        let found = session.select_spot(id);
        self.publish(&session);
        found
    }

    pub async fn clear_selection(&self) {
        let mut session = self.session.lock().await;
        session.clear_selection();
        self.publish(&session);
    }

    /// Report that the spot nearest the current location is open. Not retried.
    pub async fn report_availability(&self) -> Result<(), ReportError> {
        let coord = self.session.lock().await.report_location()?;
        info!(?coord, "reporting open spot");
        self.repository.report_spot_available(coord).await?;
        Ok(())
    }

    /// Push a status update for the spot nearest the current location. Not retried.
    pub async fn update_spot_status(&self) -> Result<(), ReportError> {
        let coord = self.session.lock().await.report_location()?;
        info!(?coord, "updating spot status");
        self.repository.update_spot_status(coord).await?;
        Ok(())
    }

    async fn apply<F>(&self, f: F)
    where
        F: FnOnce(&mut SyncSession) -> Vec<SessionAction>,
    {
        let actions = {
            let mut session = self.session.lock().await;
            let actions = f(&mut *session);
            self.publish(&session);
            actions
        };
        self.perform(actions);
    }

    fn perform(&self, actions: Vec<SessionAction>) {
        for action in actions {
            match action {
                SessionAction::RequestAuthorization => self.location.request_authorization(),
                SessionAction::RequestLocation => self.location.request_one_shot_location(),
                SessionAction::Search { center, limit } => {
                    debug!(?center, limit, "starting spot search");
                    let driver = self.clone();
                    tokio::spawn(async move {
                        let spots = driver.repository.search_spots(center, limit).await;
                        let mut session = driver.session.lock().await;
                        session.on_search_complete(spots);
                        driver.publish(&session);
                    });
                }
            }
        }
    }

    fn publish(&self, session: &SyncSession) {
        self.snapshots.send_replace(session.snapshot());
    }
}
