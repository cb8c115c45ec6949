//! Typed access to the backend endpoints outside the clock toggle.

use crate::error::{ClientError, ClientResult};
use crate::session::Session;
use crate::transport::{ApiRequest, TransportClient};
use serde_json::Value;
use std::sync::Arc;
use timeclock_protocol::{
    ClockRecord, DateRange, ExportFormat, ProfilePatch, RecordPatch, RecordsQuery,
    RecordsResponse, RemoteRecord, User,
};
use tracing::debug;

/// Authenticated endpoint calls.
///
/// Every call fails with [`ClientError::NotAuthenticated`] before sending
/// anything when there is no session. Admin calls additionally require the
/// `manager` or `admin` role.
#[derive(Debug, Clone)]
pub struct ClockApi {
    session: Arc<Session>,
    transport: Arc<TransportClient>,
}

impl ClockApi {
    /// Creates the API over `transport`.
    pub fn new(session: Arc<Session>, transport: Arc<TransportClient>) -> Self {
        Self { session, transport }
    }

    fn require_user(&self) -> ClientResult<User> {
        match self.session.user() {
            Some(user) if self.session.is_authenticated() => Ok(user),
            _ => Err(ClientError::NotAuthenticated),
        }
    }

    fn require_manager(&self) -> ClientResult<User> {
        let user = self.require_user()?;
        if !user.role.can_manage() {
            debug!(role = %user.role, "admin endpoint refused locally");
            return Err(ClientError::PermissionDenied(user.role));
        }
        Ok(user)
    }

    /// `GET /clock/records` for the signed-in user.
    pub async fn list_records(&self, range: &DateRange, limit: Option<u32>) -> ClientResult<Vec<ClockRecord>> {
        let user = self.require_user()?;
        let mut query = RecordsQuery::for_user(user.id).with_range(range);
        if let Some(limit) = limit {
            query = query.with_limit(limit);
        }

        let response: RecordsResponse = self
            .transport
            .send_json(ApiRequest::get("/clock/records").with_query(query.to_pairs()))
            .await?;
        Ok(response.records.into_iter().map(RemoteRecord::into_record).collect())
    }

    /// `PATCH /clock/records/{id}`; returns the record as stored by the server.
    pub async fn update_record(&self, id: &str, patch: &RecordPatch) -> ClientResult<ClockRecord> {
        self.require_user()?;
        let request = ApiRequest::patch(format!("/clock/records/{id}")).with_json(patch)?;
        let updated: RemoteRecord = self.transport.send_json(request).await?;
        Ok(updated.into_record())
    }

    /// `DELETE /clock/records/{id}`.
    pub async fn delete_record(&self, id: &str) -> ClientResult<()> {
        self.require_user()?;
        self.transport
            .send_empty(ApiRequest::delete(format!("/clock/records/{id}")))
            .await?;
        Ok(())
    }

    /// `GET /timesheet/summary`. The summary is returned as sent.
    pub async fn timesheet_summary(&self, range: &DateRange) -> ClientResult<Value> {
        self.require_user()?;
        let request = ApiRequest::get("/timesheet/summary").with_query(range.to_pairs());
        Ok(self.transport.send_json(request).await?)
    }

    /// `GET /timesheet/export`; returns the raw document bytes.
    pub async fn export_timesheet(&self, format: ExportFormat, range: &DateRange) -> ClientResult<Vec<u8>> {
        self.require_user()?;
        let request = ApiRequest::get("/timesheet/export")
            .with_query([("format".to_string(), format.as_str().to_string())])
            .with_query(range.to_pairs());
        Ok(self.transport.send(request).await?.body)
    }

    /// `GET /user/profile`.
    pub async fn profile(&self) -> ClientResult<User> {
        self.require_user()?;
        Ok(self.transport.send_json(ApiRequest::get("/user/profile")).await?)
    }

    /// `PATCH /user/profile`.
    pub async fn update_profile(&self, patch: &ProfilePatch) -> ClientResult<User> {
        self.require_user()?;
        let request = ApiRequest::patch("/user/profile").with_json(patch)?;
        Ok(self.transport.send_json(request).await?)
    }

    /// `GET /reports/{kind}`. The report is returned as sent.
    pub async fn report(&self, kind: &str, params: Vec<(String, String)>) -> ClientResult<Value> {
        self.require_user()?;
        let request = ApiRequest::get(format!("/reports/{kind}")).with_query(params);
        Ok(self.transport.send_json(request).await?)
    }

    /// `GET /admin/team/{id}/records`.
    pub async fn team_records(&self, team_id: &str, range: &DateRange) -> ClientResult<Vec<ClockRecord>> {
        self.require_manager()?;
        let request = ApiRequest::get(format!("/admin/team/{team_id}/records")).with_query(range.to_pairs());
        let response: RecordsResponse = self.transport.send_json(request).await?;
        Ok(response.records.into_iter().map(RemoteRecord::into_record).collect())
    }

    /// `POST /admin/timesheets/{id}/approve`.
    pub async fn approve_timesheet(&self, timesheet_id: &str) -> ClientResult<()> {
        self.require_manager()?;
        self.transport
            .send_empty(ApiRequest::post(format!("/admin/timesheets/{timesheet_id}/approve")))
            .await?;
        Ok(())
    }
}
