//! HTTP Message Signature verification (Ed25519) for the OMP object server.
//!
//! This crate decides whether an incoming request carries a valid detached
//! signature. It parses the `Signature-Input` and `Signature` headers,
//! rebuilds the signature base from the received request, resolves the public
//! key named by each signature's `keyid`, verifies with Ed25519, and maps the
//! result to a 400, 401 or 500 class error under the configured enforcement
//! mode.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use omp_auth::{EnforcementMode, KeyStore, SignatureGate};
//!
//! let keys = KeyStore::new().with_key("client-1", "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo");
//! let gate = SignatureGate::new(EnforcementMode::Strict, Arc::new(keys));
//!
//! let (parts, ()) = http::Request::builder()
//!     .uri("/objects")
//!     .body(())
//!     .unwrap()
//!     .into_parts();
//! assert!(gate.check(&parts).is_err());
//! ```
//!
//! # Modules
//!
//! - [`sfv`] - Structured field dictionary parsing and serialization
//! - [`header`] - `Signature-Input` / `Signature` header parsing
//! - [`canonical`] - Signature base construction and tolerated variants
//! - [`keys`] - Key provider trait and configured key store
//! - [`verify`] - Ed25519 verification over candidate bases
//! - [`gate`] - Enforcement modes and outcome folding
//! - [`signer`] - Client-side signing
//! - [`error`] - Error types and outcome classification

pub mod canonical;
pub mod error;
pub mod gate;
pub mod header;
pub mod keys;
pub mod sfv;
pub mod signer;
pub mod verify;

pub use canonical::RequestTarget;
pub use error::{AuthError, VerificationOutcome};
pub use gate::{EnforcementMode, GateDecision, SignatureGate};
pub use header::{Component, ParsedSignatures, SignatureInputEntry};
pub use keys::{KeyProvider, KeyRecord, KeySource, KeyStore};
pub use signer::{RequestSigner, SignatureHeaders};
pub use verify::verify_signature;
