//! Client-side request signing.
//!
//! Produces `Signature-Input` / `Signature` header values that the gate on the
//! server side accepts. Used by the signing CLI and by tests.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::{Signer as _, SigningKey};

use crate::canonical::{RequestTarget, build_signature_base};
use crate::error::AuthError;
use crate::header::{Component, SIGNATURE_HEADER, SIGNATURE_INPUT_HEADER, SignatureInputEntry};

/// Default signature label.
pub const DEFAULT_LABEL: &str = "sig1";

/// Algorithm name written to the `alg` parameter.
pub const ED25519_ALGORITHM: &str = "ed25519";

/// Header values for one signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeaders {
    /// Value of the `Signature-Input` header.
    pub signature_input: String,
    /// Value of the `Signature` header.
    pub signature: String,
}

impl SignatureHeaders {
    /// Insert both headers into `headers`, replacing existing values.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InternalFault`] if a value is not a valid header value.
    pub fn insert_into(&self, headers: &mut http::HeaderMap) -> Result<(), AuthError> {
        for (name, value) in [
            (SIGNATURE_INPUT_HEADER, &self.signature_input),
            (SIGNATURE_HEADER, &self.signature),
        ] {
            let value = http::HeaderValue::from_str(value)
                .map_err(|e| AuthError::InternalFault(format!("invalid {name} value: {e}")))?;
            headers.insert(name, value);
        }
        Ok(())
    }
}

/// Signs requests with one Ed25519 key.
pub struct RequestSigner {
    label: String,
    keyid: String,
    key: SigningKey,
    components: Vec<Component>,
    algorithm: Option<String>,
    expires_in: Option<i64>,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("label", &self.label)
            .field("keyid", &self.keyid)
            .field("components", &self.components)
            .field("algorithm", &self.algorithm)
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Create a signer covering `@method`, `@authority` and `@path`.
    #[must_use]
    pub fn new(keyid: impl Into<String>, key: SigningKey) -> Self {
        Self {
            label: DEFAULT_LABEL.to_owned(),
            keyid: keyid.into(),
            key,
            components: vec![Component::Method, Component::Authority, Component::Path],
            algorithm: Some(ED25519_ALGORITHM.to_owned()),
            expires_in: None,
        }
    }

    /// Use a different signature label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Cover a different ordered set of components.
    #[must_use]
    pub fn with_components(mut self, components: Vec<Component>) -> Self {
        self.components = components;
        self
    }

    /// Emit `expires = created + seconds`.
    #[must_use]
    pub fn with_expires_in(mut self, seconds: i64) -> Self {
        self.expires_in = Some(seconds);
        self
    }

    /// Set or omit the `alg` parameter.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Option<String>) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// The public half of the signing key.
    #[must_use]
    pub fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    /// Build the signature input entry for a signature created at `created`.
    #[must_use]
    pub fn entry(&self, created: i64) -> SignatureInputEntry {
        SignatureInputEntry::new(
            self.label.clone(),
            self.components.clone(),
            created,
            self.expires_in.map(|secs| created + secs),
            self.keyid.clone(),
            self.algorithm.clone(),
        )
    }

    /// Sign `target` with a signature created at `created` (unix seconds).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedSignature`] if a covered component cannot
    /// be resolved from `target`.
    pub fn sign(&self, target: &RequestTarget, created: i64) -> Result<SignatureHeaders, AuthError> {
        let entry = self.entry(created);
        let base = build_signature_base(&entry, target)?;
        let signature = self.key.sign(base.as_bytes());
        Ok(SignatureHeaders {
            signature_input: entry.to_header_member(),
            signature: format!("{}=:{}:", self.label, STANDARD.encode(signature.to_bytes())),
        })
    }
}
