//! Authentication state.
//!
//! [`Session`] owns the bearer token and user identity. It is populated by
//! [`Session::restore`] or [`Session::login`] and emptied by
//! [`Session::invalidate`], which also clears the record cache.

use crate::error::{ClientError, ClientResult, RequestError};
use crate::records::RecordStore;
use crate::transport::{ApiRequest, TokenSource, TransportClient};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use timeclock_protocol::{LoginRequest, LoginResponse, Role, User};
use timeclock_storage::{get_json, keys, set_json, KeyValueStore, StorageError, StorageResult};
use tracing::{debug, info, warn};

/// Token and identity held by a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Bearer token.
    pub token: Option<String>,
    /// Signed-in user.
    pub user: Option<User>,
    /// Set by invalidation; cleared by a successful login or restore.
    pub invalidated: bool,
}

impl SessionState {
    /// True iff token and user are present and the state was not invalidated.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some() && !self.invalidated
    }

    /// True if neither token nor user is present.
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.user.is_none()
    }
}

/// Shared holder of the session state.
///
/// The transport reads the bearer token from here, which keeps the
/// transport independent of [`Session`].
#[derive(Debug, Default)]
pub struct Credentials {
    state: RwLock<SessionState>,
}

impl Credentials {
    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }

    fn replace(&self, state: SessionState) {
        *self.state.write() = state;
    }

    /// Empties the state. Returns false if it was already empty.
    fn clear(&self) -> bool {
        let mut state = self.state.write();
        let had_state = !state.is_empty();
        *state = SessionState {
            token: None,
            user: None,
            invalidated: true,
        };
        had_state
    }
}

impl TokenSource for Credentials {
    fn bearer_token(&self) -> Option<String> {
        let state = self.state.read();
        if state.invalidated {
            None
        } else {
            state.token.clone()
        }
    }
}

/// Outcome of checking a token against the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenCheck {
    Valid,
    Rejected,
    Unreachable,
}

/// The authenticated session.
pub struct Session {
    credentials: Arc<Credentials>,
    records: Arc<RecordStore>,
    store: Arc<dyn KeyValueStore>,
    transport: Arc<TransportClient>,
    invalidations: AtomicU64,
}

impl Session {
    /// Creates an empty session.
    pub fn new(
        credentials: Arc<Credentials>,
        records: Arc<RecordStore>,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<TransportClient>,
    ) -> Self {
        Self {
            credentials,
            records,
            store,
            transport,
            invalidations: AtomicU64::new(0),
        }
    }

    /// Reads the persisted token and user. The token is not validated.
    ///
    /// A corrupted persisted value is discarded and treated as absent.
    /// Returns whether the restored session is authenticated.
    pub fn restore(&self) -> StorageResult<bool> {
        let token: Option<String> = self.read_or_discard(keys::AUTH_TOKEN)?;
        let user: Option<User> = self.read_or_discard(keys::USER_INFO)?;

        let state = SessionState {
            token: token.filter(|t| !t.is_empty()),
            user,
            invalidated: false,
        };
        let authenticated = state.is_authenticated();
        self.credentials.replace(state);

        info!(authenticated, "session restored");
        Ok(authenticated)
    }

    fn read_or_discard<T: serde::de::DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match get_json(self.store.as_ref(), key) {
            Ok(value) => Ok(value),
            Err(StorageError::Corrupted { key, message }) => {
                warn!(%key, %message, "discarding corrupted session value");
                self.store.delete(&key)?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Exchanges an identity-provider authorization code for a session.
    ///
    /// On success the token and user are persisted and the session becomes
    /// authenticated. On failure the prior state is left untouched and
    /// [`ClientError::Authentication`] is returned.
    pub async fn login(&self, code: &str) -> ClientResult<User> {
        let request = ApiRequest::post("/auth/wechat-login")
            .anonymous()
            .with_json(&LoginRequest {
                code: code.to_string(),
            })
            .map_err(ClientError::Authentication)?;

        let response: LoginResponse = self.transport.send_json(request).await.map_err(|e| {
            warn!(error = %e, "login exchange failed");
            ClientError::Authentication(e)
        })?;

        if response.token.is_empty() {
            return Err(ClientError::Authentication(RequestError::Decode(
                "login response carried an empty token".into(),
            )));
        }

        let previous = self.credentials.snapshot();
        if previous.user.as_ref().is_some_and(|u| u.id != response.user.id) {
            debug!("different user signed in, dropping cached records");
            self.records.clear()?;
        }

        set_json(self.store.as_ref(), keys::AUTH_TOKEN, &response.token)?;
        set_json(self.store.as_ref(), keys::USER_INFO, &response.user)?;

        let user = response.user.clone();
        self.credentials.replace(SessionState {
            token: Some(response.token),
            user: Some(response.user),
            invalidated: false,
        });

        info!(user_id = %user.id, role = %user.role, "signed in");
        Ok(user)
    }

    /// Checks `token` with a lightweight authenticated request.
    ///
    /// Returns false on any non-2xx response or transport failure; never
    /// fails.
    pub async fn verify(&self, token: &str) -> bool {
        self.check_token(token).await == TokenCheck::Valid
    }

    /// Verifies the session's own token. False when signed out.
    pub async fn verify_current(&self) -> bool {
        match self.token() {
            Some(token) => self.verify(&token).await,
            None => false,
        }
    }

    pub(crate) async fn check_token(&self, token: &str) -> TokenCheck {
        match self
            .transport
            .send(ApiRequest::get("/auth/verify").with_bearer(token))
            .await
        {
            Ok(response) if response.is_success() => TokenCheck::Valid,
            Ok(response) if response.status >= 500 => {
                debug!(status = response.status, "token check hit a server error");
                TokenCheck::Unreachable
            }
            Ok(response) => {
                debug!(status = response.status, "token check returned non-2xx");
                TokenCheck::Rejected
            }
            Err(e) if e.is_transport() || e.status().is_some_and(|s| s >= 500) => {
                debug!(error = %e, "token check could not reach the server");
                TokenCheck::Unreachable
            }
            Err(e) => {
                debug!(error = %e, "token rejected");
                TokenCheck::Rejected
            }
        }
    }

    /// Clears token, user and the record cache, in memory and on disk.
    ///
    /// Idempotent: invalidating an empty session does nothing. In-memory
    /// state is always cleared; the first persistence error, if any, is
    /// returned afterwards.
    pub fn invalidate(&self) -> StorageResult<()> {
        if !self.credentials.clear() {
            return Ok(());
        }
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        info!("session invalidated");

        let mut first_error = None;
        for key in [keys::AUTH_TOKEN, keys::USER_INFO] {
            if let Err(e) = self.store.delete(key) {
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = self.records.clear() {
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Signs the user out.
    pub fn logout(&self) -> StorageResult<()> {
        info!("signing out");
        self.invalidate()
    }

    /// Returns true if the session holds a token and user and was not invalidated.
    pub fn is_authenticated(&self) -> bool {
        self.credentials.snapshot().is_authenticated()
    }

    /// Returns the current token.
    pub fn token(&self) -> Option<String> {
        self.credentials.bearer_token()
    }

    /// Returns the signed-in user.
    pub fn user(&self) -> Option<User> {
        self.credentials.snapshot().user
    }

    /// Returns the user's role; `employee` when signed out.
    pub fn role(&self) -> Role {
        self.user().map(|u| u.role).unwrap_or_default()
    }

    /// Returns how many times a non-empty session was invalidated.
    pub fn invalidation_count(&self) -> u64 {
        self.invalidations.load(Ordering::SeqCst)
    }

    /// Returns the transport used by this session.
    pub fn transport(&self) -> &Arc<TransportClient> {
        &self.transport
    }

    /// Returns the record store cleared on invalidation.
    pub fn records(&self) -> &Arc<RecordStore> {
        &self.records
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.credentials.snapshot();
        f.debug_struct("Session")
            .field("authenticated", &state.is_authenticated())
            .field("user", &state.user.map(|u| u.id))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportFailure;
    use crate::test_support::{harness, seed_session, signed_in, TOKEN};
    use serde_json::json;
    use timeclock_protocol::ClockAction;

    #[test]
    fn restore_reads_persisted_session() {
        let h = harness();
        seed_session(&h.store, TOKEN, &User::new("u-1", Role::Manager));

        assert!(h.ctx.session().restore().unwrap());
        assert_eq!(h.ctx.session().token().as_deref(), Some(TOKEN));
        assert_eq!(h.ctx.session().role(), Role::Manager);
        assert_eq!(h.mock.request_count(), 0);
    }

    #[test]
    fn restore_without_user_is_not_authenticated() {
        let h = harness();
        set_json(h.store.as_ref(), keys::AUTH_TOKEN, TOKEN).unwrap();

        assert!(!h.ctx.session().restore().unwrap());
        assert!(!h.ctx.session().is_authenticated());
    }

    #[test]
    fn restore_discards_corrupted_user() {
        let h = harness();
        set_json(h.store.as_ref(), keys::AUTH_TOKEN, TOKEN).unwrap();
        h.store.set(keys::USER_INFO, "{broken").unwrap();

        assert!(!h.ctx.session().restore().unwrap());
        assert_eq!(h.store.get(keys::USER_INFO).unwrap(), None);
    }

    #[test]
    fn stored_user_without_role_is_employee() {
        let h = harness();
        set_json(h.store.as_ref(), keys::AUTH_TOKEN, TOKEN).unwrap();
        h.store.set(keys::USER_INFO, r#"{"id":"u-1"}"#).unwrap();

        assert!(h.ctx.session().restore().unwrap());
        assert_eq!(h.ctx.session().role(), Role::Employee);
    }

    #[tokio::test]
    async fn login_persists_token_and_user() {
        let h = harness();
        h.mock.push_json(
            200,
            json!({"token": "fresh", "user": {"id": "u-9", "role": "admin"}}),
        );

        let user = h.ctx.session().login("wx-code").await.unwrap();
        assert_eq!(user.id, "u-9");
        assert!(h.ctx.session().is_authenticated());
        assert_eq!(h.ctx.session().role(), Role::Admin);

        let token: Option<String> = get_json(h.store.as_ref(), keys::AUTH_TOKEN).unwrap();
        assert_eq!(token.as_deref(), Some("fresh"));
        let stored: Option<User> = get_json(h.store.as_ref(), keys::USER_INFO).unwrap();
        assert_eq!(stored, Some(user));

        let sent = &h.mock.requests()[0];
        assert!(sent.url.ends_with("/auth/wechat-login"));
        assert_eq!(sent.json_body(), Some(json!({"code": "wx-code"})));
        assert_eq!(sent.header("authorization"), None);
    }

    #[tokio::test]
    async fn failed_login_leaves_prior_state_untouched() {
        let h = signed_in();
        let before_store = h.store.snapshot();
        h.mock.push_json(401, json!({"message": "invalid code"}));

        let err = h.ctx.session().login("bad").await.unwrap_err();
        assert!(matches!(err, ClientError::Authentication(_)));

        assert!(h.ctx.session().is_authenticated());
        assert_eq!(h.ctx.session().token().as_deref(), Some(TOKEN));
        assert_eq!(h.store.snapshot(), before_store);
        assert_eq!(h.navigator.login_routes(), 0);
    }

    #[tokio::test]
    async fn login_with_malformed_response_fails() {
        let h = harness();
        h.mock.push_json(200, json!({"user": {"id": "u-1"}}));

        let err = h.ctx.session().login("code").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Authentication(RequestError::Decode(_))
        ));
        assert!(!h.ctx.session().is_authenticated());
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn login_accepts_numeric_user_id() {
        let h = harness();
        h.mock.push_json(200, json!({"token": "t", "user": {"id": 42}}));

        let user = h.ctx.session().login("code").await.unwrap();
        assert_eq!(user.id, "42");
        assert!(h.ctx.session().is_authenticated());
        let stored: Option<User> = get_json(h.store.as_ref(), keys::USER_INFO).unwrap();
        assert_eq!(stored.map(|u| u.id).as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn login_as_another_user_drops_cached_records() {
        let h = signed_in();
        h.ctx
            .records()
            .begin_optimistic_write_at(ClockAction::ClockIn, None, "u-1", 1);
        h.mock.push_json(200, json!({"token": "t-2", "user": {"id": "u-2"}}));

        h.ctx.session().login("code").await.unwrap();
        assert!(h.ctx.records().is_empty());
    }

    #[tokio::test]
    async fn verify_is_true_only_for_2xx() {
        let h = harness();
        h.mock.push_json(200, json!({"valid": true}));
        h.mock.push_response(crate::http::HttpResponse::empty(302));
        h.mock.push_json(500, json!({}));
        h.mock.push_failure(TransportFailure::Timeout(std::time::Duration::from_secs(10)));

        assert!(h.ctx.session().verify("t").await);
        assert!(!h.ctx.session().verify("t").await);
        assert!(!h.ctx.session().verify("t").await);
        assert!(!h.ctx.session().verify("t").await);

        let sent = &h.mock.requests()[0];
        assert!(sent.url.ends_with("/auth/verify"));
        assert_eq!(sent.header("authorization"), Some("Bearer t"));
    }

    #[tokio::test]
    async fn token_check_separates_rejection_from_outage() {
        let h = harness();
        h.mock.push_json(200, json!({"valid": true}));
        h.mock.push_json(401, json!({"message": "expired"}));
        h.mock.push_json(403, json!({}));
        h.mock.push_json(503, json!({"message": "maintenance"}));
        h.mock.push_failure(TransportFailure::Timeout(std::time::Duration::from_secs(10)));

        let session = h.ctx.session();
        assert_eq!(session.check_token("t").await, TokenCheck::Valid);
        assert_eq!(session.check_token("t").await, TokenCheck::Rejected);
        assert_eq!(session.check_token("t").await, TokenCheck::Rejected);
        assert_eq!(session.check_token("t").await, TokenCheck::Unreachable);
        assert_eq!(session.check_token("t").await, TokenCheck::Unreachable);
    }

    #[test]
    fn invalidate_cascades_to_records() {
        let h = signed_in();
        let records = h.ctx.records();
        records.begin_optimistic_write_at(ClockAction::ClockIn, None, "u-1", 1);
        records.persist().unwrap();

        h.ctx.session().invalidate().unwrap();

        assert!(!h.ctx.session().is_authenticated());
        assert!(records.is_empty());
        assert_eq!(records.status(), timeclock_protocol::ClockStatus::Out);
        for key in keys::ALL {
            assert_eq!(h.store.get(key).unwrap(), None, "{key} should be removed");
        }
    }

    #[test]
    fn invalidate_twice_is_a_no_op() {
        let h = signed_in();
        h.ctx.session().invalidate().unwrap();
        h.ctx.session().invalidate().unwrap();
        assert_eq!(h.ctx.session().invalidation_count(), 1);
    }

    #[test]
    fn invalidated_session_sends_no_token() {
        let credentials = Credentials::default();
        credentials.replace(SessionState {
            token: Some("t".into()),
            user: Some(User::new("u", Role::Employee)),
            invalidated: false,
        });
        assert_eq!(credentials.bearer_token().as_deref(), Some("t"));

        assert!(credentials.clear());
        assert_eq!(credentials.bearer_token(), None);
        assert!(!credentials.clear());
    }
}
