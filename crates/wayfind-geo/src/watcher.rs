//! Continuous device-location subscription.
//!
//! [`GeoWatcher::start`] spawns one task that owns the sensor. The task is
//! the only writer of [`LocationState`]; everyone else reads it through a
//! `watch` receiver. A fix window is armed on start and on every retry; if
//! no fix arrives before it closes the task raises
//! [`LocationFault::Timeout`] itself.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use wayfind_core::{AppConfig, LocationFault, UserLocation};

use crate::sensor::{PositionSensor, SensorReading, WatchOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoWatcherConfig {
    pub fix_timeout: Duration,
    pub high_accuracy: bool,
}

impl Default for GeoWatcherConfig {
    fn default() -> Self {
        Self {
            fix_timeout: Duration::from_secs(10),
            high_accuracy: true,
        }
    }
}

impl GeoWatcherConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            fix_timeout: Duration::from_secs(config.location_timeout_secs),
            high_accuracy: true,
        }
    }

    fn watch_options(self) -> WatchOptions {
        WatchOptions {
            high_accuracy: self.high_accuracy,
            timeout: self.fix_timeout,
        }
    }
}

/// What the watcher emits, in delivery order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationEvent {
    Fix(UserLocation),
    Fault(LocationFault),
}

/// Latest known position plus the outstanding fault, if any.
///
/// A fault never clears `last_known`; a fix clears `fault`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocationState {
    pub last_known: Option<UserLocation>,
    pub fault: Option<LocationFault>,
}

#[derive(Debug, Clone, Copy)]
enum WatchCommand {
    Retry,
    Stop,
}

/// Entry point for location subscriptions.
pub struct GeoWatcher;

impl GeoWatcher {
    /// Start watching `sensor`. Must be called from within a Tokio runtime.
    pub fn start<S: PositionSensor>(sensor: S, config: GeoWatcherConfig) -> GeoSubscription {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(LocationState::default());

        let task = tokio::spawn(run_watch(sensor, config, commands_rx, events_tx, state_tx));

        GeoSubscription {
            commands: commands_tx,
            events: events_rx,
            state: state_rx,
            task: Some(task),
        }
    }
}

/// Handle to a running location watch.
///
/// Dropping the handle stops the watch in the background; call
/// [`GeoSubscription::stop`] to wait until the sensor has been released.
pub struct GeoSubscription {
    commands: mpsc::UnboundedSender<WatchCommand>,
    events: mpsc::UnboundedReceiver<LocationEvent>,
    state: watch::Receiver<LocationState>,
    task: Option<JoinHandle<()>>,
}

impl GeoSubscription {
    /// Next fix or fault. Returns `None` after [`GeoSubscription::stop`].
    pub async fn next_event(&mut self) -> Option<LocationEvent> {
        if self.task.is_none() {
            return None;
        }
        self.events.recv().await
    }

    /// A reader of the shared location state.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<LocationState> {
        self.state.clone()
    }

    /// Snapshot of the current location state.
    #[must_use]
    pub fn current(&self) -> LocationState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    /// Re-request a fix after a fault, keeping this subscription.
    pub fn retry(&self) {
        if self.task.is_none() || self.commands.send(WatchCommand::Retry).is_err() {
            tracing::debug!("location retry ignored: watch already stopped");
        }
    }

    /// Stop the watch and release the sensor.
    ///
    /// Once this returns no further events are delivered and the shared
    /// state has been cleared. Calling it again is a no-op.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        // The task may already have exited; a failed send is fine.
        let _ = self.commands.send(WatchCommand::Stop);
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "location watch task ended abnormally");
        }
        self.events.close();
        while self.events.try_recv().is_ok() {}
    }
}

impl Drop for GeoSubscription {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.commands.send(WatchCommand::Stop);
        }
    }
}

async fn run_watch<S: PositionSensor>(
    mut sensor: S,
    config: GeoWatcherConfig,
    mut commands: mpsc::UnboundedReceiver<WatchCommand>,
    events: mpsc::UnboundedSender<LocationEvent>,
    state: watch::Sender<LocationState>,
) {
    let options = config.watch_options();
    sensor.watch(&options);
    tracing::info!(
        fix_timeout_secs = config.fix_timeout.as_secs(),
        high_accuracy = config.high_accuracy,
        "location watch started"
    );

    let mut deadline = Some(Instant::now() + config.fix_timeout);
    let mut sensor_open = true;

    loop {
        let window = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            command = commands.recv() => match command {
                Some(WatchCommand::Retry) => {
                    tracing::debug!("location retry requested");
                    sensor.request_fix(&options);
                    sensor_open = true;
                    deadline = Some(Instant::now() + config.fix_timeout);
                    state.send_modify(|s| s.fault = None);
                }
                Some(WatchCommand::Stop) | None => break,
            },
            reading = sensor.next_reading(), if sensor_open => {
                let reading: SensorReading = match reading {
                    Some(reading) => reading,
                    None => {
                        sensor_open = false;
                        Err(LocationFault::PositionUnavailable)
                    }
                };
                deadline = None;
                publish(&events, &state, reading);
            }
            () = window => {
                tracing::warn!(
                    fix_timeout_secs = config.fix_timeout.as_secs(),
                    "no position fix within window"
                );
                deadline = None;
                publish(&events, &state, Err(LocationFault::Timeout));
            }
        }
    }

    sensor.release();
    state.send_replace(LocationState::default());
    tracing::info!("location watch stopped");
}

fn publish(
    events: &mpsc::UnboundedSender<LocationEvent>,
    state: &watch::Sender<LocationState>,
    reading: SensorReading,
) {
    let event = match reading {
        Ok(location) => {
            state.send_modify(|s| {
                s.last_known = Some(location);
                s.fault = None;
            });
            LocationEvent::Fix(location)
        }
        Err(fault) => {
            tracing::warn!(%fault, "location fault");
            state.send_modify(|s| s.fault = Some(fault));
            LocationEvent::Fault(fault)
        }
    };
    // The receiver is gone once the subscription is dropped; state still updates.
    let _ = events.send(event);
}

#[cfg(test)]
#[path = "watcher_test.rs"]
mod tests;
