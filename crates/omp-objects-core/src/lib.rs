//! Object storage logic for the OMP object server.
//!
//! The storage itself sits behind the [`storage::StoragePort`] trait with an
//! in-memory adapter. [`handler::OmpObjectsHandler`] bridges the HTTP layer to
//! [`provider::OmpObjects`], and [`config::ObjectsConfig`] turns the
//! environment into the signature gate the HTTP layer enforces.
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handler;
pub mod provider;
pub mod storage;

pub use config::ObjectsConfig;
pub use handler::OmpObjectsHandler;
pub use provider::OmpObjects;
pub use storage::{MemoryStorage, StorageError, StoragePort};
