//! The application context.
//!
//! [`AppContext`] is built once by the entry point and owns every
//! long-lived component. Nothing in this crate is a global.

use crate::api::ClockApi;
use crate::config::ClientConfig;
use crate::controller::ClockController;
use crate::error::ClientResult;
use crate::guard::{AuthGuard, Navigator, NoopNavigator};
use crate::http::HttpClient;
use crate::location::{LocationProvider, NoLocation};
use crate::records::RecordStore;
use crate::session::{Credentials, Session, TokenCheck};
use crate::transport::TransportClient;
use std::sync::Arc;
use timeclock_protocol::{ClockRecord, ClockStatus, DateRange, RecordId, RecordPatch, User};
use timeclock_storage::KeyValueStore;
use tracing::{info, warn};

/// Outcome of [`AppContext::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupReport {
    /// Whether a session survived startup.
    pub authenticated: bool,
    /// Clock status after startup.
    pub status: ClockStatus,
    /// Number of records restored from the local cache.
    pub cached_records: usize,
    /// Whether records were refreshed from the server.
    pub refreshed: bool,
}

/// Builder for [`AppContext`].
pub struct AppContextBuilder {
    config: ClientConfig,
    http: Arc<dyn HttpClient>,
    store: Arc<dyn KeyValueStore>,
    locator: Arc<dyn LocationProvider>,
    navigator: Arc<dyn Navigator>,
}

impl AppContextBuilder {
    /// Sets the location provider used by clock actions.
    pub fn location_provider(mut self, locator: Arc<dyn LocationProvider>) -> Self {
        self.locator = locator;
        self
    }

    /// Sets the navigator told to show the login entry point.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    /// Wires the components together.
    pub fn build(self) -> AppContext {
        let credentials = Arc::new(Credentials::default());
        let records = Arc::new(RecordStore::new(Arc::clone(&self.store)));
        let guard = Arc::new(AuthGuard::new(self.navigator));

        let transport = Arc::new(
            TransportClient::new(self.config.clone(), self.http, credentials.clone())
                .with_observer(guard.clone()),
        );
        let session = Arc::new(Session::new(
            credentials,
            Arc::clone(&records),
            Arc::clone(&self.store),
            Arc::clone(&transport),
        ));
        guard.attach(&session);

        let controller = Arc::new(ClockController::new(
            Arc::clone(&session),
            Arc::clone(&records),
            Arc::clone(&transport),
            self.locator,
            self.config.location_timeout,
        ));
        let api = ClockApi::new(Arc::clone(&session), Arc::clone(&transport));

        AppContext {
            config: self.config,
            store: self.store,
            records,
            session,
            transport,
            controller,
            api,
            guard,
        }
    }
}

/// Owns the store, session, record cache, transport and controller.
pub struct AppContext {
    config: ClientConfig,
    store: Arc<dyn KeyValueStore>,
    records: Arc<RecordStore>,
    session: Arc<Session>,
    transport: Arc<TransportClient>,
    controller: Arc<ClockController>,
    api: ClockApi,
    guard: Arc<AuthGuard>,
}

impl AppContext {
    /// Starts building a context.
    pub fn builder(
        config: ClientConfig,
        http: Arc<dyn HttpClient>,
        store: Arc<dyn KeyValueStore>,
    ) -> AppContextBuilder {
        AppContextBuilder {
            config,
            http,
            store,
            locator: Arc::new(NoLocation),
            navigator: Arc::new(NoopNavigator),
        }
    }

    /// Restores the session and record cache from the store.
    ///
    /// Makes no requests. Returns the number of cached records.
    pub fn restore(&self) -> ClientResult<usize> {
        self.session.restore()?;
        Ok(self.records.load()?.len())
    }

    /// Runs the launch sequence.
    ///
    /// 1. Restore the session and record cache (no network)
    /// 2. Verify a restored token; drop the session only on a 4xx rejection
    /// 3. Refresh records from the server; on failure keep the cache
    ///
    /// An unreachable server or a 5xx keeps the cached session so the last
    /// known state is still usable offline.
    pub async fn start(&self) -> ClientResult<StartupReport> {
        let cached_records = self.restore()?;

        if let Some(token) = self.session.token().filter(|_| self.session.is_authenticated()) {
            match self.session.check_token(&token).await {
                TokenCheck::Valid => {}
                TokenCheck::Rejected => {
                    info!("stored token rejected, signing out");
                    self.session.invalidate()?;
                }
                TokenCheck::Unreachable => {
                    warn!("could not verify stored token, keeping cached session");
                }
            }
        }

        let mut refreshed = false;
        if self.session.is_authenticated() {
            match self.refresh_records().await {
                Ok(_) => refreshed = true,
                Err(e) => warn!(error = %e, "startup refresh failed, showing cached records"),
            }
        }

        let report = StartupReport {
            authenticated: self.session.is_authenticated(),
            status: self.records.status(),
            cached_records,
            refreshed,
        };
        info!(?report, "started");
        Ok(report)
    }

    /// Signs in and loads the user's records.
    ///
    /// A failed record refresh does not fail the login.
    pub async fn login(&self, code: &str) -> ClientResult<User> {
        let user = self.session.login(code).await?;
        if let Err(e) = self.refresh_records().await {
            warn!(error = %e, "could not load records after login");
        }
        Ok(user)
    }

    /// Signs out and clears the local cache.
    pub fn logout(&self) -> ClientResult<()> {
        Ok(self.session.logout()?)
    }

    /// Performs one clock action.
    pub async fn toggle(&self) -> ClientResult<ClockRecord> {
        self.controller.toggle().await
    }

    /// Replaces the cached records with the server's and persists them.
    ///
    /// Returns the number of records received.
    pub async fn refresh_records(&self) -> ClientResult<usize> {
        let server_records = self.api.list_records(&DateRange::default(), None).await?;
        let count = self.records.reconcile(server_records);
        self.records.persist()?;
        Ok(count)
    }

    /// Corrects a record on the server and mirrors the change locally.
    pub async fn amend_record(&self, id: &str, patch: &RecordPatch) -> ClientResult<ClockRecord> {
        let updated = self.api.update_record(id, patch).await?;
        if !self.records.apply_update(updated.clone()) {
            warn!(id, "amended record is not in the local cache");
        }
        self.records.persist()?;
        Ok(updated)
    }

    /// Deletes a record on the server and from the local cache.
    pub async fn remove_record(&self, id: &str) -> ClientResult<()> {
        self.api.delete_record(id).await?;
        self.records.remove(&RecordId::Server(id.to_string()));
        self.records.persist()?;
        Ok(())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the persistent store.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Returns the session.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Returns the record cache.
    pub fn records(&self) -> &Arc<RecordStore> {
        &self.records
    }

    /// Returns the clock controller.
    pub fn controller(&self) -> &Arc<ClockController> {
        &self.controller
    }

    /// Returns the endpoint API.
    pub fn api(&self) -> &ClockApi {
        &self.api
    }

    /// Returns the transport.
    pub fn transport(&self) -> &Arc<TransportClient> {
        &self.transport
    }

    /// Returns the guard watching for unauthorized responses.
    pub fn auth_guard(&self) -> &Arc<AuthGuard> {
        &self.guard
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("base_url", &self.config.base_url)
            .field("session", &self.session)
            .field("records", &self.records)
            .finish()
    }
}
