//! Geographic primitives and the device-location subscription.
//!
//! [`distance_km`] is the great-circle distance used for every facility in a
//! discovery view. [`GeoWatcher`] owns a [`PositionSensor`] and turns its raw
//! readings into a stream of [`LocationEvent`]s plus a shared
//! [`LocationState`] that always keeps the last good fix.

pub mod distance;
pub mod sensor;
pub mod watcher;

pub use distance::{distance_km, EARTH_RADIUS_KM};
pub use sensor::{ChannelSensor, PositionSensor, SensorHandle, SensorReading, WatchOptions};
pub use watcher::{GeoSubscription, GeoWatcher, GeoWatcherConfig, LocationEvent, LocationState};
