//! Platform location sensor abstraction.
//!
//! A [`PositionSensor`] is whatever the host platform offers for continuous
//! position updates. [`ChannelSensor`] bridges callback-style platform APIs
//! (and tests) into that shape: the platform side pushes readings through a
//! cloneable [`SensorHandle`].

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use wayfind_core::{LocationFault, UserLocation};

/// One delivery from the sensor: a fix or a typed fault.
pub type SensorReading = Result<UserLocation, LocationFault>;

/// Capabilities requested from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    /// Window after which the watcher raises [`LocationFault::Timeout`] if no
    /// fix arrived. Forwarded so platforms that enforce their own timeout
    /// can use the same value.
    pub timeout: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
        }
    }
}

pub trait PositionSensor: Send + 'static {
    /// Begin continuous ("watch") delivery.
    fn watch(&mut self, options: &WatchOptions);

    /// Wait for the next reading. Resolves to `None` once the platform has
    /// closed the stream.
    fn next_reading(&mut self) -> impl Future<Output = Option<SensorReading>> + Send;

    /// Ask the platform for a fresh fix after a fault.
    fn request_fix(&mut self, options: &WatchOptions);

    /// Release the underlying hardware resource.
    fn release(&mut self);
}

#[derive(Debug, Default)]
struct SensorCounters {
    watching: AtomicBool,
    released: AtomicBool,
    fix_requests: AtomicU32,
}

/// Channel-backed sensor fed by a [`SensorHandle`].
#[derive(Debug)]
pub struct ChannelSensor {
    readings: mpsc::UnboundedReceiver<SensorReading>,
    counters: Arc<SensorCounters>,
}

/// Producer side of a [`ChannelSensor`].
#[derive(Debug, Clone)]
pub struct SensorHandle {
    readings: mpsc::UnboundedSender<SensorReading>,
    counters: Arc<SensorCounters>,
}

impl ChannelSensor {
    #[must_use]
    pub fn new() -> (Self, SensorHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(SensorCounters::default());
        (
            Self {
                readings: rx,
                counters: Arc::clone(&counters),
            },
            SensorHandle {
                readings: tx,
                counters,
            },
        )
    }
}

impl PositionSensor for ChannelSensor {
    fn watch(&mut self, options: &WatchOptions) {
        tracing::debug!(
            high_accuracy = options.high_accuracy,
            timeout_ms = u64::try_from(options.timeout.as_millis()).unwrap_or(u64::MAX),
            "sensor watch started"
        );
        self.counters.watching.store(true, Ordering::SeqCst);
    }

    async fn next_reading(&mut self) -> Option<SensorReading> {
        self.readings.recv().await
    }

    fn request_fix(&mut self, _options: &WatchOptions) {
        self.counters.fix_requests.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&mut self) {
        self.counters.watching.store(false, Ordering::SeqCst);
        self.counters.released.store(true, Ordering::SeqCst);
        self.readings.close();
    }
}

impl SensorHandle {
    /// Deliver a fix. Returns `false` if the sensor has been released.
    pub fn push_fix(&self, location: UserLocation) -> bool {
        self.readings.send(Ok(location)).is_ok()
    }

    /// Deliver a fault. Returns `false` if the sensor has been released.
    pub fn push_fault(&self, fault: LocationFault) -> bool {
        self.readings.send(Err(fault)).is_ok()
    }

    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.counters.watching.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.counters.released.load(Ordering::SeqCst)
    }

    /// Number of times the watcher asked for a fresh fix.
    #[must_use]
    pub fn fix_requests(&self) -> u32 {
        self.counters.fix_requests.load(Ordering::SeqCst)
    }
}
