//! Derived views and selection for `wayfind`.
//!
//! - [`query`]: the pure filter/annotate/sort pipeline and its memoized
//!   wrapper.
//! - [`selection`]: the selected facility, camera commands and the epoch
//!   gate that drops stale ones.
//! - [`directions`]: navigation deep links with a bounded wait for a fix.
//! - [`session`]: the event loop that ties feed, sensor and camera together.

pub mod directions;
pub mod format;
pub mod notice;
pub mod query;
pub mod selection;
pub mod session;

pub use directions::{DirectionLinks, Directions, DirectionsError, MapProvider, Platform};
pub use format::{format_distance_km, walking_distance_m};
pub use notice::LocationNotice;
pub use query::{evaluate, DiscoveryEntry, DiscoveryView, MemoizedQuery};
pub use selection::{
    CameraCommand, CameraControl, EpochGate, Selection, SelectionCoordinator, SelectionError,
    SelectionOrigin,
};
pub use session::{DiscoverySession, SessionConfig, SessionError, SessionHandle, SessionState};
