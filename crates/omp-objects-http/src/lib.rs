//! HTTP service layer for the OMP object API.
//!
//! This crate provides:
//!
//! - **Router**: maps method and path to a [`router::Route`]
//! - **Signature gate**: every `/objects` and `/exchange` request passes
//!   through [`omp_auth::SignatureGate`] before its body is read
//! - **Exchange**: validates and acknowledges agent messages
//! - **Handler trait**: the boundary between HTTP and storage logic
//! - **Service**: hyper `Service` implementation
//! - **Response helpers**: JSON bodies and the error envelope

pub mod body;
pub mod discovery;
pub mod dispatch;
pub mod exchange;
pub mod response;
pub mod router;
pub mod service;

pub use body::ObjectsResponseBody;
pub use dispatch::ObjectsHandler;
pub use router::{ObjectRequest, Route};
pub use service::{ObjectsHttpConfig, ObjectsHttpService};
