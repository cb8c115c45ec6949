//! # Timeclock Protocol
//!
//! Types exchanged with the attendance backend and persisted in the local
//! cache.
//!
//! This crate provides:
//! - [`ClockRecord`] with its [`RecordId`], [`ClockAction`] and [`SyncState`]
//! - [`ClockStatus`], derived from a record sequence
//! - [`User`] and [`Role`]
//! - Request and response bodies for every backend endpoint
//! - Calendar helpers for epoch-millisecond timestamps
//!
//! This is a pure data crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod messages;
mod record;
mod time;
mod user;

pub use messages::{
    CreateRecordRequest, CreateRecordResponse, DateRange, ExportFormat, LoginRequest,
    LoginResponse, ProfilePatch, RecordPatch, RecordsQuery, RecordsResponse, RemoteRecord,
};
pub use record::{ClockAction, ClockRecord, ClockStatus, Location, RecordId, SyncState};
pub use time::{date_of, format_time, now_millis, MILLIS_PER_HOUR};
pub use user::{Role, User};
