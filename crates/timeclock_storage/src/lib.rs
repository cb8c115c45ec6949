//! # Timeclock Storage
//!
//! Durable key-value persistence for the timeclock client.
//!
//! This crate is the lowest layer of the client. Stores are **opaque
//! string maps**: they do not interpret the JSON documents they hold.
//! The client owns the schema of every key (see [`keys`]).
//!
//! ## Design Principles
//!
//! - Access is synchronous and treated as instantaneous by callers
//! - Writes go through `&self` so a store can be shared behind an `Arc`
//! - Must be `Send + Sync`
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral sessions
//! - [`FileStore`] - One JSON file per key inside a directory
//!
//! ## Example
//!
//! ```rust
//! use timeclock_storage::{get_json, set_json, InMemoryStore, KeyValueStore};
//!
//! let store = InMemoryStore::new();
//! set_json(&store, "currentStatus", &"in").unwrap();
//! let status: Option<String> = get_json(&store, "currentStatus").unwrap();
//! assert_eq!(status.as_deref(), Some("in"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod json;
pub mod keys;
mod memory;
mod store;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use json::{get_json, set_json};
pub use memory::InMemoryStore;
pub use store::KeyValueStore;
