//! Request and response bodies for the attendance backend.

use crate::record::{ClockAction, ClockRecord, Location};
use crate::time::date_of;
use crate::user::User;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Body of `POST /auth/wechat-login`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// One-time authorization code from the identity provider.
    pub code: String,
}

/// Response of `POST /auth/wechat-login`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Opaque bearer token.
    pub token: String,
    /// The signed-in user.
    pub user: User,
}

/// Body of `POST /clock/records`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    /// Performed action.
    pub action: ClockAction,
    /// Client timestamp in epoch milliseconds.
    pub timestamp: i64,
    /// UTC calendar date of `timestamp`.
    pub date: String,
    /// Best-effort position; serialized as `null` when absent.
    pub location: Option<Location>,
    /// Owner of the record.
    pub user_id: String,
}

impl From<&ClockRecord> for CreateRecordRequest {
    fn from(record: &ClockRecord) -> Self {
        Self {
            action: record.action,
            timestamp: record.timestamp,
            date: record.date.clone(),
            location: record.location,
            user_id: record.user_id.clone(),
        }
    }
}

/// Response of `POST /clock/records`. Other fields are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateRecordResponse {
    /// Server-assigned record ID.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

/// A record as returned by `GET /clock/records`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    /// Server ID.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Performed action.
    pub action: ClockAction,
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// Calendar date; derived from `timestamp` when the server omits it.
    #[serde(default)]
    pub date: Option<String>,
    /// Captured position.
    #[serde(default)]
    pub location: Option<Location>,
    /// Owner.
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
}

impl RemoteRecord {
    /// Converts into a confirmed cache record.
    pub fn into_record(self) -> ClockRecord {
        let date = self.date.unwrap_or_else(|| date_of(self.timestamp));
        let mut record = ClockRecord::confirmed(self.id, self.action, self.timestamp, self.user_id);
        record.date = date;
        record.location = self.location;
        record
    }
}

/// Response of `GET /clock/records`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordsResponse {
    /// Records; a missing list means none.
    #[serde(default)]
    pub records: Vec<RemoteRecord>,
}

/// Filters for `GET /clock/records`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordsQuery {
    /// Owner; always set by the client from the session.
    pub user_id: String,
    /// Inclusive first date (`YYYY-MM-DD`).
    pub start_date: Option<String>,
    /// Inclusive last date (`YYYY-MM-DD`).
    pub end_date: Option<String>,
    /// Maximum number of records.
    pub limit: Option<u32>,
}

impl RecordsQuery {
    /// Creates a query for every record of `user_id`.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Restricts the query to a date range.
    pub fn with_range(mut self, range: &DateRange) -> Self {
        self.start_date = range.start_date.clone();
        self.end_date = range.end_date.clone();
        self
    }

    /// Limits the number of records.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns the query string pairs.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("userId".to_string(), self.user_id.clone())];
        if let Some(start) = &self.start_date {
            pairs.push(("startDate".into(), start.clone()));
        }
        if let Some(end) = &self.end_date {
            pairs.push(("endDate".into(), end.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".into(), limit.to_string()));
        }
        pairs
    }
}

/// Body of `PATCH /clock/records/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    /// Corrected action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ClockAction>,
    /// Corrected timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Corrected location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

/// Body of `PATCH /user/profile`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nick_name: Option<String>,
    /// New avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Optional inclusive date range used by timesheet and admin endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
    /// First date (`YYYY-MM-DD`).
    pub start_date: Option<String>,
    /// Last date (`YYYY-MM-DD`).
    pub end_date: Option<String>,
}

impl DateRange {
    /// Creates a bounded range.
    pub fn between(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start_date: Some(start.into()),
            end_date: Some(end.into()),
        }
    }

    /// Returns the query string pairs.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(start) = &self.start_date {
            pairs.push(("startDate".to_string(), start.clone()));
        }
        if let Some(end) = &self.end_date {
            pairs.push(("endDate".to_string(), end.clone()));
        }
        pairs
    }
}

/// Output format of `GET /timesheet/export`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Comma-separated values.
    #[default]
    Csv,
    /// Excel workbook.
    Xlsx,
    /// PDF document.
    Pdf,
    /// JSON document.
    Json,
}

impl ExportFormat {
    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            "pdf" => Ok(ExportFormat::Pdf),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

/// Accepts IDs the backend sends either as strings or as integers.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
