//! Public key resolution.
//!
//! This module defines the [`KeyProvider`] trait for resolving Ed25519 public
//! keys from key identifiers, along with [`KeyStore`], an immutable snapshot of
//! the configured key sources built once at startup.
//!
//! Sources are consulted in order, first match wins:
//!
//! 1. explicit registry (`OMP_SIG_KEYS` or [`KeyStore::with_key`])
//! 2. pinned pair (`OMP_SIG_KEYID` + `OMP_SIG_ED25519_PUB`), exact keyid match
//! 3. keyed lookup (`OMP_SIG_PUB_<keyid>`, `OMP_SIG_PUB_HEX_<keyid>`), case-insensitive
//! 4. broad scan of every `OMP_SIG_PUB*` entry, only with `OMP_SIG_BROAD_SCAN`
//!
//! A configured value that does not decode to exactly 32 bytes is reported as
//! an unknown key and logged for operators.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::header::{STANDARD_OPTIONAL_PAD, URL_SAFE_OPTIONAL_PAD};

/// Length of an Ed25519 public key in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// JSON object of `keyid -> public key` bindings.
pub const ENV_KEYS: &str = "OMP_SIG_KEYS";
/// Identifier of the pinned key.
pub const ENV_PINNED_KEYID: &str = "OMP_SIG_KEYID";
/// Public key of the pinned key.
pub const ENV_PINNED_KEY: &str = "OMP_SIG_ED25519_PUB";
/// Prefix of keyed lookup entries.
pub const ENV_KEY_PREFIX: &str = "OMP_SIG_PUB_";
/// Prefix of hex keyed lookup entries.
pub const ENV_HEX_KEY_PREFIX: &str = "OMP_SIG_PUB_HEX_";
/// Opt-in flag for the broad scan.
pub const ENV_BROAD_SCAN: &str = "OMP_SIG_BROAD_SCAN";

const BROAD_SCAN_PREFIX: &str = "OMP_SIG_PUB";

/// Where a key was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySource {
    /// Explicit `keyid -> key` binding.
    ExplicitRegistry,
    /// Pinned keyid/key pair.
    PinnedEnv,
    /// Configuration entry named after the keyid.
    KeyedEnv,
    /// First decodable entry of the opt-in broad scan.
    BroadScan,
}

impl KeySource {
    /// Short name for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExplicitRegistry => "explicit-registry",
            Self::PinnedEnv => "pinned-env",
            Self::KeyedEnv => "keyed-env",
            Self::BroadScan => "broad-scan",
        }
    }
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    /// The key identifier that was requested.
    pub keyid: String,
    /// Raw Ed25519 public key.
    pub public_key: [u8; PUBLIC_KEY_LENGTH],
    /// Source the key came from.
    pub source: KeySource,
}

/// Trait for looking up Ed25519 public keys by key identifier.
///
/// Implementations must not perform I/O; resolution runs on the request path.
pub trait KeyProvider: Send + Sync {
    /// Resolve the public key for `keyid`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownKey`] when no source provides a usable key.
    fn resolve(&self, keyid: &str) -> Result<KeyRecord, AuthError>;
}

/// Decode a public key written as base64url, standard base64, or hex.
///
/// Surrounding whitespace is ignored and base64 padding is optional, but
/// must be canonical when present. Returns `None` unless the value decodes to
/// exactly 32 bytes.
#[must_use]
pub fn decode_public_key(value: &str) -> Option<[u8; PUBLIC_KEY_LENGTH]> {
    let value = value.trim();
    [
        URL_SAFE_OPTIONAL_PAD.decode(value).ok(),
        STANDARD_OPTIONAL_PAD.decode(value).ok(),
        hex::decode(value).ok(),
    ]
    .into_iter()
    .flatten()
    .find_map(|bytes| <[u8; PUBLIC_KEY_LENGTH]>::try_from(bytes).ok())
}

/// Encode a public key the way [`KeyStore`] stores registered keys.
#[must_use]
pub fn encode_public_key(key: &[u8; PUBLIC_KEY_LENGTH]) -> String {
    URL_SAFE_NO_PAD.encode(key)
}

/// Immutable snapshot of every configured key source.
///
/// Values are kept in their configured encoding and decoded on lookup, so a
/// corrupted entry surfaces as [`AuthError::UnknownKey`] for the request that
/// names it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyStore {
    registry: BTreeMap<String, String>,
    pinned: Option<(String, String)>,
    env: BTreeMap<String, String>,
    broad_scan: bool,
}

impl KeyStore {
    /// Create an empty key store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `keyid` to an encoded public key in the explicit registry.
    #[must_use]
    pub fn with_key(mut self, keyid: impl Into<String>, encoded: impl Into<String>) -> Self {
        self.registry.insert(keyid.into(), encoded.into());
        self
    }

    /// Bind `keyid` to a raw public key in the explicit registry.
    #[must_use]
    pub fn with_public_key(self, keyid: impl Into<String>, key: &[u8; PUBLIC_KEY_LENGTH]) -> Self {
        self.with_key(keyid, encode_public_key(key))
    }

    /// Set the pinned keyid/key pair.
    #[must_use]
    pub fn with_pinned(mut self, keyid: impl Into<String>, encoded: impl Into<String>) -> Self {
        self.pinned = Some((keyid.into(), encoded.into()));
        self
    }

    /// Add configuration entries for keyed lookup and broad scan.
    ///
    /// Only names starting with `OMP_SIG_PUB` or equal to `OMP_SIG_ED25519_PUB`
    /// are retained.
    #[must_use]
    pub fn with_env_entries(
        mut self,
        entries: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.env.extend(
            entries
                .into_iter()
                .filter(|(name, _)| is_key_entry_name(name)),
        );
        self
    }

    /// Enable or disable the broad scan.
    #[must_use]
    pub fn with_broad_scan(mut self, enabled: bool) -> Self {
        self.broad_scan = enabled;
        self
    }

    /// Build a key store from configuration variables (typically `std::env::vars()`).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] when `OMP_SIG_KEYS` is not a JSON
    /// object of strings.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self, AuthError> {
        let vars: BTreeMap<String, String> = vars.into_iter().collect();
        let mut store = Self::new().with_broad_scan(
            vars.get(ENV_BROAD_SCAN)
                .is_some_and(|v| parse_bool(v)),
        );

        if let Some(raw) = vars.get(ENV_KEYS).filter(|v| !v.trim().is_empty()) {
            let bindings: BTreeMap<String, String> = serde_json::from_str(raw).map_err(|e| {
                AuthError::Configuration(format!("{ENV_KEYS} must be a JSON object of strings: {e}"))
            })?;
            for (keyid, encoded) in bindings {
                store = store.with_key(keyid, encoded);
            }
        }

        if let (Some(keyid), Some(encoded)) = (vars.get(ENV_PINNED_KEYID), vars.get(ENV_PINNED_KEY))
        {
            store = store.with_pinned(keyid.trim(), encoded.clone());
        }

        Ok(store.with_env_entries(vars))
    }

    /// Whether the broad scan is enabled.
    #[must_use]
    pub fn broad_scan_enabled(&self) -> bool {
        self.broad_scan
    }

    /// Number of explicit registry bindings.
    #[must_use]
    pub fn registry_len(&self) -> usize {
        self.registry.len()
    }

    /// The pinned key identifier, if configured.
    #[must_use]
    pub fn pinned_keyid(&self) -> Option<&str> {
        self.pinned.as_ref().map(|(keyid, _)| keyid.as_str())
    }

    /// Number of retained configuration entries.
    #[must_use]
    pub fn env_len(&self) -> usize {
        self.env.len()
    }

    fn decode(
        keyid: &str,
        source: KeySource,
        origin: &str,
        encoded: &str,
    ) -> Result<KeyRecord, AuthError> {
        match decode_public_key(encoded) {
            Some(public_key) => Ok(KeyRecord {
                keyid: keyid.to_owned(),
                public_key,
                source,
            }),
            None => {
                warn!(
                    keyid,
                    source = %source,
                    origin,
                    "configured public key does not decode to 32 bytes"
                );
                Err(AuthError::UnknownKey)
            }
        }
    }

    fn keyed_entry(&self, keyid: &str) -> Option<(&str, &str)> {
        let names = [
            format!("{ENV_KEY_PREFIX}{keyid}"),
            format!("{ENV_HEX_KEY_PREFIX}{keyid}"),
        ];
        for name in &names {
            if let Some((k, v)) = self.env.get_key_value(name.as_str()) {
                return Some((k.as_str(), v.as_str()));
            }
        }
        names.iter().find_map(|name| {
            self.env
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(k, v)| (k.as_str(), v.as_str()))
        })
    }

    fn broad_scan(&self, keyid: &str) -> Option<KeyRecord> {
        self.env.iter().find_map(|(name, value)| {
            decode_public_key(value).map(|public_key| {
                debug!(keyid, origin = %name, "resolved key through broad scan");
                KeyRecord {
                    keyid: keyid.to_owned(),
                    public_key,
                    source: KeySource::BroadScan,
                }
            })
        })
    }
}

impl KeyProvider for KeyStore {
    fn resolve(&self, keyid: &str) -> Result<KeyRecord, AuthError> {
        if let Some(encoded) = self.registry.get(keyid) {
            return Self::decode(keyid, KeySource::ExplicitRegistry, ENV_KEYS, encoded);
        }

        if let Some((pinned_keyid, encoded)) = &self.pinned {
            if pinned_keyid == keyid {
                return Self::decode(keyid, KeySource::PinnedEnv, ENV_PINNED_KEY, encoded);
            }
        }

        if let Some((name, encoded)) = self.keyed_entry(keyid) {
            return Self::decode(keyid, KeySource::KeyedEnv, name, encoded);
        }

        if self.broad_scan {
            if let Some(record) = self.broad_scan(keyid) {
                return Ok(record);
            }
        }

        debug!(keyid, "no configured key for keyid");
        Err(AuthError::UnknownKey)
    }
}

fn is_key_entry_name(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    upper.starts_with(BROAD_SCAN_PREFIX) || upper == ENV_PINNED_KEY
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
