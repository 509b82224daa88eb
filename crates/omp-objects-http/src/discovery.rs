//! Discovery document served at `/.well-known/omp.json`.

use serde_json::{Value, json};

use crate::exchange::{CAPABILITIES, EXCHANGE_PATH};
use crate::router::OBJECTS_PREFIX;

/// Protocol version advertised to clients.
pub const OMP_VERSION: &str = "0.1";

/// Values advertised in the discovery document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryInfo {
    /// Request body cap in megabytes.
    pub max_payload_mb: u64,
    /// Advertised rate limit.
    pub rate_limit_per_min: u32,
    /// Port the server listens on.
    pub port: u16,
    /// Signature enforcement mode name.
    pub signature_mode: String,
}

/// Build the discovery document.
#[must_use]
pub fn discovery_document(info: &DiscoveryInfo) -> Value {
    json!({
        "omp_version": OMP_VERSION,
        "transport": ["http/1.1"],
        "endpoints": {
            "store": OBJECTS_PREFIX,
            "list": OBJECTS_PREFIX,
            "search": format!("{OBJECTS_PREFIX}/search"),
            "get": format!("{OBJECTS_PREFIX}/{{id}}"),
            "update": format!("{OBJECTS_PREFIX}/{{id}}"),
            "delete": format!("{OBJECTS_PREFIX}/{{id}}"),
            "exchange": EXCHANGE_PATH,
            "health": "/health",
        },
        "capabilities": CAPABILITIES,
        "signatures": {
            "mode": info.signature_mode,
            "algorithms": ["ed25519"],
            "headers": ["signature-input", "signature"],
        },
        "limits": {
            "max_payload_mb": info.max_payload_mb,
            "rate_limit_per_min": info.rate_limit_per_min,
        },
        "server": { "port": info.port },
    })
}
