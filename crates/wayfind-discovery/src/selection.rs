//! Which facility is selected, and the camera commands that follow from it.
//!
//! [`SelectionCoordinator`] is the only writer of [`Selection`]. Every
//! selection bumps the epoch and sends the map a camera command tagged with
//! it; the map side wraps its camera in an [`EpochGate`] so a command from an
//! older selection can never override a newer one.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use wayfind_core::{Coordinate, Facility, FacilityId, UserLocation};

use crate::directions::{DirectionLinks, Directions, DirectionsError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no facility with id {0} in the current snapshot")]
    UnknownFacility(FacilityId),
}

/// Where a selection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOrigin {
    List,
    Marker,
    DeepLink,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Selection {
    #[default]
    Idle,
    Selected {
        id: FacilityId,
        epoch: u64,
        origin: SelectionOrigin,
    },
}

impl Selection {
    #[must_use]
    pub fn facility_id(&self) -> Option<&FacilityId> {
        match self {
            Self::Idle => None,
            Self::Selected { id, .. } => Some(id),
        }
    }
}

/// A request to move the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraCommand {
    pub center: Coordinate,
    pub zoom: u8,
    pub animated: bool,
    pub epoch: u64,
}

/// Capability handle to the map camera, supplied by whoever renders the map.
pub trait CameraControl: Send + 'static {
    fn apply(&mut self, command: CameraCommand);
}

impl CameraControl for mpsc::UnboundedSender<CameraCommand> {
    fn apply(&mut self, command: CameraCommand) {
        if self.send(command).is_err() {
            tracing::debug!(epoch = command.epoch, "camera receiver gone; command dropped");
        }
    }
}

impl CameraControl for Vec<CameraCommand> {
    fn apply(&mut self, command: CameraCommand) {
        self.push(command);
    }
}

/// Map-side filter: forwards a command only if its epoch is not older than
/// the newest one already seen.
#[derive(Debug)]
pub struct EpochGate<C> {
    inner: C,
    latest: Option<u64>,
}

impl<C: CameraControl> EpochGate<C> {
    #[must_use]
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            latest: None,
        }
    }

    #[must_use]
    pub fn latest_epoch(&self) -> Option<u64> {
        self.latest
    }

    #[must_use]
    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: CameraControl> CameraControl for EpochGate<C> {
    fn apply(&mut self, command: CameraCommand) {
        if let Some(latest) = self.latest {
            if command.epoch < latest {
                tracing::debug!(
                    epoch = command.epoch,
                    latest,
                    "discarding stale camera command"
                );
                return;
            }
        }
        self.latest = Some(command.epoch);
        self.inner.apply(command);
    }
}

/// Single source of truth for the selected facility.
pub struct SelectionCoordinator<C> {
    camera: C,
    zoom: u8,
    epoch: u64,
    facilities: Arc<Vec<Facility>>,
    selection: watch::Sender<Selection>,
}

impl<C: CameraControl> SelectionCoordinator<C> {
    /// `zoom` is the level every selection and recenter flies to.
    #[must_use]
    pub fn new(camera: C, zoom: u8) -> Self {
        let (selection, _) = watch::channel(Selection::Idle);
        Self {
            camera,
            zoom,
            epoch: 0,
            facilities: Arc::new(Vec::new()),
            selection,
        }
    }

    /// Replace the facilities that ids are resolved against.
    ///
    /// An existing selection is kept even if its facility is gone; the
    /// detail view decides what to show for it.
    pub fn set_facilities(&mut self, facilities: Arc<Vec<Facility>>) {
        if let Some(id) = self.selection.borrow().facility_id() {
            if !facilities.iter().any(|f| f.id() == id) {
                tracing::debug!(facility_id = %id, "selected facility left the snapshot");
            }
        }
        self.facilities = facilities;
    }

    #[must_use]
    pub fn facility(&self, id: &FacilityId) -> Option<&Facility> {
        self.facilities.iter().find(|f| f.id() == id)
    }

    /// Number of selections made so far.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub fn current(&self) -> Selection {
        self.selection.borrow().clone()
    }

    /// A read-only view of the selection.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Selection> {
        self.selection.subscribe()
    }

    #[must_use]
    pub fn camera(&self) -> &C {
        &self.camera
    }

    /// # Errors
    ///
    /// Returns [`SelectionError::UnknownFacility`] if `id` is not in the
    /// current snapshot. The epoch is unchanged in that case.
    pub fn select_from_list(&mut self, id: &FacilityId) -> Result<CameraCommand, SelectionError> {
        self.select(id, SelectionOrigin::List)
    }

    /// # Errors
    ///
    /// See [`SelectionCoordinator::select_from_list`].
    pub fn select_from_marker(&mut self, id: &FacilityId) -> Result<CameraCommand, SelectionError> {
        self.select(id, SelectionOrigin::Marker)
    }

    /// # Errors
    ///
    /// See [`SelectionCoordinator::select_from_list`].
    pub fn select_from_deep_link(
        &mut self,
        id: &FacilityId,
    ) -> Result<CameraCommand, SelectionError> {
        self.select(id, SelectionOrigin::DeepLink)
    }

    /// # Errors
    ///
    /// See [`SelectionCoordinator::select_from_list`].
    pub fn select(
        &mut self,
        id: &FacilityId,
        origin: SelectionOrigin,
    ) -> Result<CameraCommand, SelectionError> {
        let center = self
            .facility(id)
            .map(Facility::location)
            .ok_or_else(|| SelectionError::UnknownFacility(id.clone()))?;

        self.epoch += 1;
        let epoch = self.epoch;
        self.selection.send_replace(Selection::Selected {
            id: id.clone(),
            epoch,
            origin,
        });
        tracing::debug!(facility_id = %id, epoch, ?origin, "facility selected");

        let command = CameraCommand {
            center,
            zoom: self.zoom,
            animated: true,
            epoch,
        };
        self.camera.apply(command);
        Ok(command)
    }

    pub fn clear_selection(&mut self) {
        self.selection.send_replace(Selection::Idle);
    }

    /// Fly to the user's position. Tagged with the current epoch, so it
    /// loses to any selection made after it.
    pub fn recenter_on_user(&mut self, location: &UserLocation) -> CameraCommand {
        let command = CameraCommand {
            center: location.coordinate,
            zoom: self.zoom,
            animated: true,
            epoch: self.epoch,
        };
        self.camera.apply(command);
        command
    }

    /// Build deep links to `id`, independent of the selection.
    ///
    /// The destination is resolved now; the returned future owns everything
    /// it needs, so the caller can await it elsewhere.
    pub fn request_directions(
        &self,
        id: &FacilityId,
        directions: &Directions,
    ) -> impl Future<Output = Result<DirectionLinks, DirectionsError>> + Send + 'static {
        let destination = self.facility(id).map(Facility::location);
        let id = id.clone();
        let directions = directions.clone();
        async move {
            let destination = destination.ok_or(DirectionsError::UnknownFacility(id))?;
            directions.to(destination).await
        }
    }
}

#[cfg(test)]
#[path = "selection_test.rs"]
mod tests;
