//! Clock records and the status derived from them.

use crate::time::date_of;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The two actions a user can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockAction {
    /// Start of a worked interval.
    ClockIn,
    /// End of a worked interval.
    ClockOut,
}

impl ClockAction {
    /// Returns the wire name (`clock_in` / `clock_out`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ClockAction::ClockIn => "clock_in",
            ClockAction::ClockOut => "clock_out",
        }
    }

    /// Returns the status this action leads to.
    pub fn resulting_status(&self) -> ClockStatus {
        match self {
            ClockAction::ClockIn => ClockStatus::In,
            ClockAction::ClockOut => ClockStatus::Out,
        }
    }
}

impl fmt::Display for ClockAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the user is currently clocked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockStatus {
    /// Not working.
    #[default]
    Out,
    /// Working.
    In,
}

impl ClockStatus {
    /// Returns the action that toggles away from this status.
    pub fn next_action(&self) -> ClockAction {
        match self {
            ClockStatus::Out => ClockAction::ClockIn,
            ClockStatus::In => ClockAction::ClockOut,
        }
    }

    /// Derives the status from a newest-first record sequence.
    ///
    /// The first record that is not [`SyncState::Failed`] decides; an empty
    /// sequence is `Out`.
    pub fn from_records(records: &[ClockRecord]) -> Self {
        records
            .iter()
            .find(|r| r.sync_state != SyncState::Failed)
            .map(|r| r.action.resulting_status())
            .unwrap_or_default()
    }

    /// Returns the wire name (`in` / `out`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ClockStatus::Out => "out",
            ClockStatus::In => "in",
        }
    }
}

impl fmt::Display for ClockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reconciliation state of a cached record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// Written locally, not yet acknowledged by the server.
    Pending,
    /// Acknowledged by the server.
    Confirmed,
    /// Outcome unknown or rejected; ignored when deriving status.
    Failed,
}

/// Identity of a record.
///
/// Records start with a locally generated marker and receive their
/// permanent ID when the server confirms them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordId {
    /// Local marker for a record the server has not acknowledged.
    Pending(Uuid),
    /// Server-assigned ID.
    Server(String),
}

impl RecordId {
    /// Creates a fresh pending marker.
    pub fn new_pending() -> Self {
        RecordId::Pending(Uuid::new_v4())
    }

    /// Returns true for a local marker.
    pub fn is_pending(&self) -> bool {
        matches!(self, RecordId::Pending(_))
    }

    /// Returns the server ID, if assigned.
    pub fn server_id(&self) -> Option<&str> {
        match self {
            RecordId::Server(id) => Some(id),
            RecordId::Pending(_) => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Pending(marker) => write!(f, "pending:{marker}"),
            RecordId::Server(id) => f.write_str(id),
        }
    }
}

/// Position captured when the action was performed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// WGS84 latitude in degrees.
    pub latitude: f64,
    /// WGS84 longitude in degrees.
    pub longitude: f64,
    /// Horizontal accuracy in metres.
    pub accuracy: f64,
}

/// One clock-in or clock-out event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockRecord {
    /// Local marker or server ID.
    pub id: RecordId,
    /// What the user did.
    pub action: ClockAction,
    /// When, in epoch milliseconds.
    pub timestamp: i64,
    /// UTC calendar date of `timestamp` (`YYYY-MM-DD`).
    pub date: String,
    /// Best-effort position.
    pub location: Option<Location>,
    /// Owner of the record.
    pub user_id: String,
    /// Reconciliation state.
    pub sync_state: SyncState,
}

impl ClockRecord {
    /// Creates a pending record with a fresh local marker.
    pub fn pending(
        action: ClockAction,
        timestamp: i64,
        location: Option<Location>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            id: RecordId::new_pending(),
            action,
            timestamp,
            date: date_of(timestamp),
            location,
            user_id: user_id.into(),
            sync_state: SyncState::Pending,
        }
    }

    /// Creates a record the server already knows about.
    pub fn confirmed(
        id: impl Into<String>,
        action: ClockAction,
        timestamp: i64,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            id: RecordId::Server(id.into()),
            action,
            timestamp,
            date: date_of(timestamp),
            location: None,
            user_id: user_id.into(),
            sync_state: SyncState::Confirmed,
        }
    }

    /// Attaches a location.
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Returns true once the server acknowledged the record.
    pub fn is_confirmed(&self) -> bool {
        self.sync_state == SyncState::Confirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_wire_names() {
        assert_eq!(
            serde_json::to_string(&ClockAction::ClockIn).unwrap(),
            "\"clock_in\""
        );
        assert_eq!(
            serde_json::from_str::<ClockAction>("\"clock_out\"").unwrap(),
            ClockAction::ClockOut
        );
        assert_eq!(serde_json::to_string(&ClockStatus::In).unwrap(), "\"in\"");
    }

    #[test]
    fn status_toggles() {
        assert_eq!(ClockStatus::Out.next_action(), ClockAction::ClockIn);
        assert_eq!(ClockStatus::In.next_action(), ClockAction::ClockOut);
        assert_eq!(
            ClockStatus::Out.next_action().resulting_status(),
            ClockStatus::In
        );
    }

    #[test]
    fn status_follows_newest_record() {
        assert_eq!(ClockStatus::from_records(&[]), ClockStatus::Out);

        let records = vec![
            ClockRecord::confirmed("2", ClockAction::ClockIn, 2_000, "u"),
            ClockRecord::confirmed("1", ClockAction::ClockOut, 1_000, "u"),
        ];
        assert_eq!(ClockStatus::from_records(&records), ClockStatus::In);
    }

    #[test]
    fn status_skips_failed_records() {
        let mut failed = ClockRecord::pending(ClockAction::ClockOut, 3_000, None, "u");
        failed.sync_state = SyncState::Failed;
        let records = vec![
            failed,
            ClockRecord::confirmed("2", ClockAction::ClockIn, 2_000, "u"),
        ];
        assert_eq!(ClockStatus::from_records(&records), ClockStatus::In);
    }

    #[test]
    fn pending_record_derives_date() {
        let record = ClockRecord::pending(ClockAction::ClockIn, 1_709_337_600_000, None, "u-1");
        assert!(record.id.is_pending());
        assert_eq!(record.date, "2024-03-02");
        assert_eq!(record.sync_state, SyncState::Pending);
        assert!(!record.is_confirmed());
    }

    #[test]
    fn cached_record_uses_camel_case() {
        let record = ClockRecord::confirmed("r-9", ClockAction::ClockIn, 0, "u-1");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["userId"], "u-1");
        assert_eq!(json["syncState"], "confirmed");
        assert_eq!(json["id"]["server"], "r-9");

        let back: ClockRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn record_id_display() {
        assert_eq!(RecordId::Server("abc".into()).to_string(), "abc");
        assert!(RecordId::new_pending().to_string().starts_with("pending:"));
        assert_eq!(RecordId::Server("abc".into()).server_id(), Some("abc"));
    }
}
