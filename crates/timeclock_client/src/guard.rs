//! Interception of unauthorized responses.

use crate::session::Session;
use crate::transport::{Exchange, ResponseObserver};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use tracing::{error, warn};

/// Presentation-layer hook for sending the user to the login entry point.
pub trait Navigator: Send + Sync {
    /// Called after the session was invalidated by an unauthorized response.
    fn route_to_login(&self);
}

/// A navigator that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn route_to_login(&self) {}
}

/// A navigator that counts how often it was asked to route to login.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routed: AtomicU64,
}

impl RecordingNavigator {
    /// Creates a navigator with a zero count.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many times [`Navigator::route_to_login`] was called.
    pub fn login_routes(&self) -> u64 {
        self.routed.load(Ordering::SeqCst)
    }
}

impl Navigator for RecordingNavigator {
    fn route_to_login(&self) {
        self.routed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Forces session invalidation when the server rejects the session token.
///
/// Registered as a [`ResponseObserver`] on the transport, so it sees each
/// exchange once. It reacts only to a 401 on a request that carried a
/// token; an anonymous 401 (a rejected login) leaves the session alone.
/// The guard never retries the offending request.
///
/// The guard holds a weak reference to the session because the session
/// owns the transport that owns the guard.
pub struct AuthGuard {
    session: OnceLock<Weak<Session>>,
    navigator: Arc<dyn Navigator>,
    interceptions: AtomicU64,
}

impl AuthGuard {
    /// Creates an unattached guard.
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self {
            session: OnceLock::new(),
            navigator,
            interceptions: AtomicU64::new(0),
        }
    }

    /// Binds the guard to the session it invalidates. Only the first call
    /// has an effect.
    pub fn attach(&self, session: &Arc<Session>) {
        if self.session.set(Arc::downgrade(session)).is_err() {
            warn!("auth guard is already attached to a session");
        }
    }

    /// Returns the number of unauthorized responses intercepted.
    pub fn interceptions(&self) -> u64 {
        self.interceptions.load(Ordering::SeqCst)
    }
}

impl ResponseObserver for AuthGuard {
    fn observe(&self, exchange: &Exchange) {
        if !exchange.is_unauthorized() || !exchange.carried_token {
            return;
        }

        self.interceptions.fetch_add(1, Ordering::SeqCst);
        warn!(
            method = exchange.method.as_str(),
            path = %exchange.path,
            "unauthorized response, invalidating session"
        );

        if let Some(session) = self.session.get().and_then(Weak::upgrade) {
            if let Err(e) = session.invalidate() {
                error!(error = %e, "failed to clear persisted session");
            }
        }
        self.navigator.route_to_login();
    }
}

impl std::fmt::Debug for AuthGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGuard")
            .field("interceptions", &self.interceptions())
            .finish()
    }
}
