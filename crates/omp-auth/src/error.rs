//! Error types and outcome classification for signature verification.
//!
//! Every per-signature result is a [`VerificationOutcome`]. The gate folds
//! those into one decisive outcome, and [`VerificationOutcome::to_error`]
//! classifies it into the [`AuthError`] the HTTP layer turns into a response.

/// Message shared by every credential failure that reached key resolution.
///
/// Unknown keys and bad signatures must be indistinguishable to the caller.
pub const INVALID_SIGNATURE_MESSAGE: &str = "Invalid signature";

/// Errors that can occur while authenticating a signed request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The signature headers are not valid message-signature syntax.
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    /// Signature headers are required but absent.
    #[error("Missing required signature")]
    MissingSignature,

    /// No public key is configured for the claimed key identifier.
    #[error("Invalid signature")]
    UnknownKey,

    /// The signature was evaluated and rejected.
    #[error("Invalid signature")]
    SignatureMismatch,

    /// A fault unrelated to the request, such as a corrupted key entry.
    ///
    /// The reason is for logs only and never rendered to callers.
    #[error("Internal server error")]
    InternalFault(String),

    /// Invalid signature configuration detected at startup.
    #[error("invalid signature configuration: {0}")]
    Configuration(String),
}

impl AuthError {
    /// HTTP status code reported for this error.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        match self {
            Self::MalformedSignature(_) => http::StatusCode::BAD_REQUEST,
            Self::MissingSignature | Self::UnknownKey | Self::SignatureMismatch => {
                http::StatusCode::UNAUTHORIZED
            }
            Self::InternalFault(_) | Self::Configuration(_) => {
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Shorthand for [`AuthError::MalformedSignature`].
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedSignature(reason.into())
    }
}

/// Result of evaluating one labeled signature, or the request as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The labeled signature verified against a resolved key.
    Verified(String),
    /// The labeled signature did not verify, was expired, or used another algorithm.
    SignatureMismatch(String),
    /// The labeled signature names a key identifier nobody configured.
    UnknownKey(String),
    /// The signature headers, or one labeled entry, are syntactically broken.
    MalformedSyntax(String),
    /// The request carries no signature headers.
    NoSignaturePresent,
    /// Key resolution or verification failed for reasons unrelated to the request.
    InternalFault {
        /// Label of the entry being evaluated.
        label: String,
        /// Diagnostic detail, logged only.
        reason: String,
    },
}

impl VerificationOutcome {
    /// The signature label this outcome belongs to, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Verified(label)
            | Self::SignatureMismatch(label)
            | Self::UnknownKey(label)
            | Self::InternalFault { label, .. } => Some(label),
            Self::MalformedSyntax(_) | Self::NoSignaturePresent => None,
        }
    }

    /// Whether this outcome authenticates the request.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }

    /// Classify the outcome into the error reported to the caller.
    ///
    /// Returns `None` for [`VerificationOutcome::Verified`].
    #[must_use]
    pub fn to_error(&self) -> Option<AuthError> {
        match self {
            Self::Verified(_) => None,
            Self::SignatureMismatch(_) => Some(AuthError::SignatureMismatch),
            Self::UnknownKey(_) => Some(AuthError::UnknownKey),
            Self::MalformedSyntax(reason) => Some(AuthError::MalformedSignature(reason.clone())),
            Self::NoSignaturePresent => Some(AuthError::MissingSignature),
            Self::InternalFault { reason, .. } => Some(AuthError::InternalFault(reason.clone())),
        }
    }
}
