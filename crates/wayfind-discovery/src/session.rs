//! The application root: one task, one event queue, one published state.
//!
//! [`DiscoverySession::start`] wires a facility feed, a position sensor and
//! a map camera together. Every input (snapshots, location events, criteria
//! edits, selection requests) is handled in arrival order by a single task,
//! which recomputes the view before looking at the next input and publishes
//! the result through a `watch` channel. A published [`SessionState`] is
//! therefore never a mix of old and new inputs.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use wayfind_core::{
    AppConfig, DiscoveryCriteria, FacilityId, FilterCriteria, LongitudePolicy, SortKey,
    UserLocation,
};
use wayfind_feed::{FacilityFeed, FacilityRepository, FacilitySnapshot, FeedSubscription};
use wayfind_geo::{GeoSubscription, GeoWatcher, GeoWatcherConfig, LocationEvent, PositionSensor};

use crate::directions::{DirectionLinks, Directions, DirectionsError, Platform};
use crate::notice::LocationNotice;
use crate::query::{DiscoveryView, MemoizedQuery};
use crate::selection::{
    CameraCommand, CameraControl, Selection, SelectionCoordinator, SelectionError,
    SelectionOrigin,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("discovery session has shut down")]
    Closed,

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Directions(#[from] DirectionsError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub geo: GeoWatcherConfig,
    pub longitude_policy: LongitudePolicy,
    pub directions_wait: Duration,
    pub selection_zoom: u8,
    pub platform: Platform,
    /// Running as an installed web app.
    pub standalone: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            geo: GeoWatcherConfig::default(),
            longitude_policy: LongitudePolicy::default(),
            directions_wait: Duration::from_secs(3),
            selection_zoom: 16,
            platform: Platform::Desktop,
            standalone: false,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            geo: GeoWatcherConfig::from_app_config(config),
            longitude_policy: config.longitude_policy,
            directions_wait: Duration::from_secs(config.directions_wait_secs),
            selection_zoom: config.selection_zoom,
            ..Self::default()
        }
    }
}

/// Everything a front end renders, recomputed as one unit.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Revision of the facility snapshot the view was computed from; `0`
    /// until the first snapshot arrives.
    pub revision: u64,
    pub view: Arc<DiscoveryView>,
    pub criteria: DiscoveryCriteria,
    pub location: Option<UserLocation>,
    pub notice: Option<LocationNotice>,
    pub selection: Selection,
}

impl SessionState {
    #[must_use]
    pub fn distance_sort_available(&self) -> bool {
        SortKey::Distance.is_available(self.location.is_some())
    }
}

enum Command {
    Snapshot(FacilitySnapshot),
    SetCriteria(DiscoveryCriteria),
    SetFilters(FilterCriteria),
    SetSortKey(SortKey),
    SetSearchText(String),
    Select {
        id: FacilityId,
        origin: SelectionOrigin,
        reply: oneshot::Sender<Result<CameraCommand, SelectionError>>,
    },
    ClearSelection,
    Recenter {
        reply: oneshot::Sender<Option<CameraCommand>>,
    },
    Directions {
        id: FacilityId,
        reply: oneshot::Sender<Result<DirectionLinks, DirectionsError>>,
    },
    DismissNotice,
    RetryLocation,
    Shutdown,
}

pub struct DiscoverySession;

impl DiscoverySession {
    /// Start the session task. Must be called from within a Tokio runtime.
    pub fn start<F, S, C>(config: SessionConfig, feed: F, sensor: S, camera: C) -> SessionHandle
    where
        F: FacilityFeed,
        S: PositionSensor,
        C: CameraControl,
    {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::default());

        let geo = GeoWatcher::start(sensor, config.geo);
        let directions = Directions::new(geo.state(), config.directions_wait)
            .with_platform(config.platform, config.standalone);

        let snapshots = commands_tx.clone();
        let feed = FacilityRepository::new(feed, config.longitude_policy).subscribe(move |s| {
            // Fails only once the session has stopped.
            let _ = snapshots.send(Command::Snapshot(s));
        });

        let session = Session {
            coordinator: SelectionCoordinator::new(camera, config.selection_zoom),
            query: MemoizedQuery::new(),
            snapshot: FacilitySnapshot::default(),
            criteria: DiscoveryCriteria::default(),
            location: None,
            notice: None,
            directions,
            output: state_tx,
        };

        let task = tokio::spawn(run_session(session, commands_rx, geo, feed));

        SessionHandle {
            commands: commands_tx,
            state: state_rx,
            task: Some(task),
        }
    }
}

struct Session<C> {
    coordinator: SelectionCoordinator<C>,
    query: MemoizedQuery,
    snapshot: FacilitySnapshot,
    criteria: DiscoveryCriteria,
    location: Option<UserLocation>,
    notice: Option<LocationNotice>,
    directions: Directions,
    output: watch::Sender<SessionState>,
}

impl<C: CameraControl> Session<C> {
    fn apply(&mut self, command: Command, geo: &GeoSubscription) {
        match command {
            Command::Snapshot(snapshot) => {
                self.coordinator
                    .set_facilities(Arc::clone(&snapshot.facilities));
                self.snapshot = snapshot;
            }
            Command::SetCriteria(criteria) => self.criteria = criteria,
            Command::SetFilters(filters) => self.criteria.filters = filters,
            Command::SetSortKey(sort_key) => self.criteria.sort_key = sort_key,
            Command::SetSearchText(text) => self.criteria.search_text = text,
            Command::Select { id, origin, reply } => {
                let result = self.coordinator.select(&id, origin);
                if let Err(e) = &result {
                    tracing::warn!(error = %e, "selection rejected");
                }
                let _ = reply.send(result);
            }
            Command::ClearSelection => self.coordinator.clear_selection(),
            Command::Recenter { reply } => {
                let command = self
                    .location
                    .map(|location| self.coordinator.recenter_on_user(&location));
                let _ = reply.send(command);
            }
            Command::Directions { id, reply } => {
                // The bounded wait for a fix runs off the session task.
                let pending = self.coordinator.request_directions(&id, &self.directions);
                tokio::spawn(async move {
                    let _ = reply.send(pending.await);
                });
            }
            Command::DismissNotice => {
                if let Some(notice) = &mut self.notice {
                    notice.dismiss();
                }
            }
            Command::RetryLocation => {
                self.notice = None;
                geo.retry();
            }
            Command::Shutdown => {}
        }
    }

    fn on_location(&mut self, event: LocationEvent) {
        match event {
            LocationEvent::Fix(location) => {
                self.location = Some(location);
                self.notice = None;
            }
            LocationEvent::Fault(fault) => self.notice = Some(LocationNotice::new(fault)),
        }
    }

    fn publish(&mut self) {
        let view = self
            .query
            .evaluate(&self.snapshot, self.location.as_ref(), &self.criteria);
        self.output.send_replace(SessionState {
            revision: self.snapshot.revision,
            view,
            criteria: self.criteria.clone(),
            location: self.location,
            notice: self.notice,
            selection: self.coordinator.current(),
        });
    }
}

async fn run_session<C: CameraControl>(
    mut session: Session<C>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut geo: GeoSubscription,
    mut feed: FeedSubscription,
) {
    tracing::info!("discovery session started");
    session.publish();
    let mut geo_open = true;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Shutdown) | None => break,
                Some(command) => session.apply(command, &geo),
            },
            event = geo.next_event(), if geo_open => match event {
                Some(event) => session.on_location(event),
                None => {
                    geo_open = false;
                    continue;
                }
            },
        }
        session.publish();
    }

    feed.unsubscribe().await;
    geo.stop().await;
    tracing::info!("discovery session stopped");
}

/// Front-end handle to a running session.
///
/// Dropping it shuts the session down in the background; call
/// [`SessionHandle::shutdown`] to wait for the feed and sensor to be
/// released.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionState>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    #[must_use]
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    #[must_use]
    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    fn send(&self, command: Command) -> Result<(), SessionError> {
        if self.task.is_none() {
            return Err(SessionError::Closed);
        }
        self.commands.send(command).map_err(|_| SessionError::Closed)
    }

    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] after shutdown.
    pub fn set_criteria(&self, criteria: DiscoveryCriteria) -> Result<(), SessionError> {
        self.send(Command::SetCriteria(criteria))
    }

    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] after shutdown.
    pub fn set_filters(&self, filters: FilterCriteria) -> Result<(), SessionError> {
        self.send(Command::SetFilters(filters))
    }

    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] after shutdown.
    pub fn set_sort_key(&self, sort_key: SortKey) -> Result<(), SessionError> {
        self.send(Command::SetSortKey(sort_key))
    }

    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] after shutdown.
    pub fn set_search_text(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.send(Command::SetSearchText(text.into()))
    }

    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] after shutdown.
    pub fn clear_selection(&self) -> Result<(), SessionError> {
        self.send(Command::ClearSelection)
    }

    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] after shutdown.
    pub fn dismiss_notice(&self) -> Result<(), SessionError> {
        self.send(Command::DismissNotice)
    }

    /// Clear the notice and ask the sensor for a new fix.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] after shutdown.
    pub fn retry_location(&self) -> Result<(), SessionError> {
        self.send(Command::RetryLocation)
    }

    /// Select a facility and fly the camera to it.
    ///
    /// # Errors
    ///
    /// [`SessionError::Selection`] for an id not in the current snapshot,
    /// [`SessionError::Closed`] after shutdown.
    pub async fn select(
        &self,
        id: FacilityId,
        origin: SelectionOrigin,
    ) -> Result<CameraCommand, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Select { id, origin, reply })?;
        Ok(rx.await.map_err(|_| SessionError::Closed)??)
    }

    /// Fly the camera to the user, if a fix is known.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] after shutdown.
    pub async fn recenter(&self) -> Result<Option<CameraCommand>, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Recenter { reply })?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Deep links to a facility, waiting a bounded time for a fix.
    ///
    /// # Errors
    ///
    /// [`SessionError::Directions`] for an unknown id or when no fix
    /// arrives in time, [`SessionError::Closed`] after shutdown.
    pub async fn directions(&self, id: FacilityId) -> Result<DirectionLinks, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Directions { id, reply })?;
        Ok(rx.await.map_err(|_| SessionError::Closed)??)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    /// Stop the session, the feed subscription and the location watch.
    ///
    /// No state is published after this returns. Calling it again is a
    /// no-op.
    pub async fn shutdown(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        let _ = self.commands.send(Command::Shutdown);
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "discovery session task ended abnormally");
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.commands.send(Command::Shutdown);
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
