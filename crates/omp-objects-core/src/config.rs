//! Object service configuration.

use std::env;
use std::sync::Arc;

use omp_auth::{AuthError, EnforcementMode, KeyStore, SignatureGate};

/// Environment variable selecting the enforcement mode.
pub const ENV_SIG_MODE: &str = "OMP_SIG_MODE";

/// Environment variable naming the scheme clients use to reach the server.
pub const ENV_PUBLIC_SCHEME: &str = "OMP_PUBLIC_SCHEME";

/// Object service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectsConfig {
    /// Signature enforcement mode.
    pub signature_mode: EnforcementMode,
    /// Configured verification keys.
    pub keys: KeyStore,
    /// Scheme assumed when rebuilding signature bases.
    pub public_scheme: String,
}

impl Default for ObjectsConfig {
    fn default() -> Self {
        Self {
            signature_mode: EnforcementMode::Off,
            keys: KeyStore::default(),
            public_scheme: "http".to_owned(),
        }
    }
}

impl ObjectsConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] for an unknown `OMP_SIG_MODE` or a
    /// malformed `OMP_SIG_KEYS`.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_vars(env::vars())
    }

    /// Create configuration from `(name, value)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] for an unknown `OMP_SIG_MODE` or a
    /// malformed `OMP_SIG_KEYS`.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self, AuthError> {
        let vars: Vec<(String, String)> = vars.into_iter().collect();
        let lookup = |key: &str| {
            vars.iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.clone())
        };

        let signature_mode = match lookup(ENV_SIG_MODE) {
            Some(mode) if !mode.trim().is_empty() => mode.parse()?,
            _ => EnforcementMode::Off,
        };
        let public_scheme = lookup(ENV_PUBLIC_SCHEME)
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "http".to_owned());
        let keys = KeyStore::from_vars(vars)?;

        Ok(Self {
            signature_mode,
            keys,
            public_scheme,
        })
    }

    /// Build the signature gate this configuration describes.
    #[must_use]
    pub fn signature_gate(&self) -> SignatureGate {
        SignatureGate::new(self.signature_mode, Arc::new(self.keys.clone()))
            .with_scheme(self.public_scheme.clone())
    }
}
