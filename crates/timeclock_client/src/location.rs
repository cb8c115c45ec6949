//! Best-effort location capture.

use async_trait::async_trait;
use timeclock_protocol::Location;

/// Supplies the device location for a clock action.
///
/// Capture is best effort: `None` never blocks the action.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Returns the current location, if one can be determined.
    async fn current_location(&self) -> Option<Location>;
}

/// Never reports a location.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn current_location(&self) -> Option<Location> {
        None
    }
}

/// Always reports the same location.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Location);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_location(&self) -> Option<Location> {
        Some(self.0)
    }
}
