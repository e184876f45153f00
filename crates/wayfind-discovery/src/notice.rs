//! User-facing notice for location faults.

use serde::Serialize;
use wayfind_core::LocationFault;

/// A dismissible banner describing the current location fault. Its retry
/// button maps to [`crate::SessionHandle::retry_location`].
///
/// Never blocks the facility list: with a notice showing, the view simply
/// has no distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocationNotice {
    pub fault: LocationFault,
    pub dismissed: bool,
}

impl LocationNotice {
    #[must_use]
    pub fn new(fault: LocationFault) -> Self {
        Self {
            fault,
            dismissed: false,
        }
    }

    #[must_use]
    pub fn message(&self) -> &'static str {
        match self.fault {
            LocationFault::PermissionDenied => {
                "Please enable location services to find facilities near you."
            }
            LocationFault::PositionUnavailable => {
                "Unable to determine your location. Please try again."
            }
            LocationFault::Timeout => "Location service timed out. Please try again.",
        }
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        !self.dismissed
    }

    pub fn dismiss(&mut self) {
        self.dismissed = true;
    }
}

impl std::fmt::Display for LocationNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_fault_has_its_own_message() {
        let denied = LocationNotice::new(LocationFault::PermissionDenied);
        let unavailable = LocationNotice::new(LocationFault::PositionUnavailable);
        let timeout = LocationNotice::new(LocationFault::Timeout);
        assert!(denied.message().contains("enable location services"));
        assert!(unavailable.message().starts_with("Unable to determine"));
        assert!(timeout.to_string().contains("timed out"));
    }

    #[test]
    fn dismiss_hides_notice() {
        let mut notice = LocationNotice::new(LocationFault::Timeout);
        assert!(notice.is_visible());
        notice.dismiss();
        assert!(!notice.is_visible());
    }
}
