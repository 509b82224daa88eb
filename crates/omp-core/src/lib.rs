//! Core configuration and error types for the OMP object server.
//!
//! This crate provides the process-wide building blocks shared by the server
//! crates: the environment-driven [`ServerConfig`] and the [`OmpError`] type.

mod config;
mod error;

pub use config::{ServerConfig, env_bool, lookup_bool};
pub use error::{OmpError, OmpResult};
