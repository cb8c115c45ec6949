//! # Timeclock Client
//!
//! Session and clock state machine for the attendance client.
//!
//! This crate provides:
//! - Session handling (restore, login, verify, invalidate)
//! - The local record cache with optimistic writes and rollback
//! - The in/out clock state machine with single-flight toggles
//! - Interception of unauthorized responses
//! - An HTTP transport abstraction with a reqwest implementation
//! - Typed access to the remaining backend endpoints
//!
//! ## Architecture
//!
//! A toggle follows an **optimistic-then-confirm** model:
//! 1. Insert a pending record; the status flips immediately
//! 2. Ask the server to create the record
//! 3. Confirm and persist on success, roll back on any failure
//!
//! Every exchange passes through one [`TransportClient`]. Its
//! [`AuthGuard`] invalidates the session on a 401, which also clears the
//! record cache.
//!
//! ## Key Invariants
//!
//! - Status is derived from the newest non-failed record, never stored apart
//! - Rollback restores the exact sequence that preceded the write
//! - At most one toggle is in flight
//! - A 401 invalidates the session once per response
//! - Nothing is persisted for a rolled-back write

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod config;
mod context;
mod controller;
mod error;
mod guard;
mod http;
mod location;
mod records;
mod session;
mod transport;

#[cfg(test)]
mod test_support;

pub use api::ClockApi;
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use context::{AppContext, AppContextBuilder, StartupReport};
pub use controller::ClockController;
pub use error::{ClientError, ClientResult, RequestError, TransportFailure, UNAUTHORIZED};
pub use guard::{AuthGuard, Navigator, NoopNavigator, RecordingNavigator};
pub use http::{HttpClient, HttpRequest, HttpResponse, Method, MockHttpClient, ReqwestClient};
pub use location::{FixedLocation, LocationProvider, NoLocation};
pub use records::{compute_worked_hours, PendingWrite, RecordStore};
pub use session::{Credentials, Session, SessionState};
pub use transport::{ApiRequest, Auth, Exchange, ResponseObserver, TokenSource, TransportClient};
