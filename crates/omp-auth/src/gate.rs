//! Enforcement policy.
//!
//! [`SignatureGate`] runs the header parser, base builder, key resolver and
//! verifier for each labeled signature, folds the per-label outcomes into one
//! decisive [`VerificationOutcome`], and applies the configured
//! [`EnforcementMode`] to it.
//!
//! Folding precedence, highest first:
//!
//! 1. any malformed entry rejects the request with 400
//! 2. any verified entry authenticates the request
//! 3. any internal fault
//! 4. the first unknown-key or mismatch outcome in label order

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, warn};

use crate::canonical::{RequestTarget, candidate_signature_bases};
use crate::error::{AuthError, VerificationOutcome};
use crate::header::{
    SIGNATURE_LENGTH, SignatureInputEntry, extract_signature_headers, parse_signature_headers,
};
use crate::keys::KeyProvider;
use crate::signer::ED25519_ALGORITHM;
use crate::verify::verify_signature;

/// How signature verification failures affect a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EnforcementMode {
    /// Headers are not inspected.
    #[default]
    Off,
    /// Malformed headers are rejected; failed verification is logged only.
    Permissive,
    /// At least one labeled signature must verify.
    Strict,
}

impl EnforcementMode {
    /// Configuration name of the mode.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Permissive => "permissive",
            Self::Strict => "strict",
        }
    }
}

impl fmt::Display for EnforcementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnforcementMode {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "permissive" => Ok(Self::Permissive),
            "strict" => Ok(Self::Strict),
            other => Err(AuthError::Configuration(format!(
                "unknown enforcement mode {other:?}, expected off, permissive or strict"
            ))),
        }
    }
}

/// What the gate decided for a request that may proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Proceed without an authenticated identity.
    Unauthenticated,
    /// Proceed as the holder of `keyid`.
    Authenticated {
        /// Label of the signature that verified.
        label: String,
        /// Key identifier of the signature that verified.
        keyid: String,
    },
}

impl GateDecision {
    /// Whether the request carries a verified signature.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    /// The verified key identifier, if any.
    #[must_use]
    pub fn keyid(&self) -> Option<&str> {
        match self {
            Self::Authenticated { keyid, .. } => Some(keyid),
            Self::Unauthenticated => None,
        }
    }
}

/// Signature verification policy shared by every request.
pub struct SignatureGate {
    mode: EnforcementMode,
    scheme: String,
    keys: RwLock<Arc<dyn KeyProvider>>,
}

impl fmt::Debug for SignatureGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureGate")
            .field("mode", &self.mode)
            .field("scheme", &self.scheme)
            .finish_non_exhaustive()
    }
}

struct NoKeys;

impl KeyProvider for NoKeys {
    fn resolve(&self, _keyid: &str) -> Result<crate::keys::KeyRecord, AuthError> {
        Err(AuthError::UnknownKey)
    }
}

impl SignatureGate {
    /// Create a gate for `mode` backed by `keys`.
    #[must_use]
    pub fn new(mode: EnforcementMode, keys: Arc<dyn KeyProvider>) -> Self {
        Self {
            mode,
            scheme: "http".to_owned(),
            keys: RwLock::new(keys),
        }
    }

    /// A gate that never inspects requests.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(EnforcementMode::Off, Arc::new(NoKeys))
    }

    /// Scheme assumed for requests whose URI does not carry one.
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into().to_ascii_lowercase();
        self
    }

    /// The configured mode.
    #[must_use]
    pub fn mode(&self) -> EnforcementMode {
        self.mode
    }

    /// Replace the key provider.
    ///
    /// Takes the write lock, so in-flight checks finish against the old keys.
    pub fn reload(&self, keys: Arc<dyn KeyProvider>) {
        *self.keys.write() = keys;
        debug!("signature key provider reloaded");
    }

    /// Check a request against the current time.
    ///
    /// # Errors
    ///
    /// Returns the classified [`AuthError`] when the request must be rejected.
    pub fn check(&self, parts: &http::request::Parts) -> Result<GateDecision, AuthError> {
        self.check_at(parts, chrono::Utc::now().timestamp())
    }

    /// Check a request as of `now` (unix seconds).
    ///
    /// # Errors
    ///
    /// Returns the classified [`AuthError`] when the request must be rejected.
    pub fn check_at(
        &self,
        parts: &http::request::Parts,
        now: i64,
    ) -> Result<GateDecision, AuthError> {
        if self.mode == EnforcementMode::Off {
            return Ok(GateDecision::Unauthenticated);
        }

        let (outcome, keyid) = self.evaluate(parts, now);
        debug!(mode = %self.mode, outcome = ?outcome, "signature evaluation finished");

        if let VerificationOutcome::Verified(label) = &outcome {
            return Ok(GateDecision::Authenticated {
                label: label.clone(),
                keyid: keyid.unwrap_or_default(),
            });
        }

        match (self.mode, &outcome) {
            (_, VerificationOutcome::MalformedSyntax(reason)) => {
                debug!(reason = %reason, "rejecting malformed signature headers");
            }
            (EnforcementMode::Permissive, VerificationOutcome::NoSignaturePresent) => {
                return Ok(GateDecision::Unauthenticated);
            }
            (EnforcementMode::Permissive, VerificationOutcome::InternalFault { label, reason }) => {
                error!(label = %label, reason = %reason, "signature check faulted, proceeding unauthenticated");
                return Ok(GateDecision::Unauthenticated);
            }
            (EnforcementMode::Permissive, _) => {
                warn!(outcome = ?outcome, "signature did not verify, proceeding unauthenticated");
                return Ok(GateDecision::Unauthenticated);
            }
            (_, VerificationOutcome::InternalFault { label, reason }) => {
                error!(label = %label, reason = %reason, "signature check faulted");
            }
            _ => {}
        }

        Err(outcome
            .to_error()
            .unwrap_or_else(|| AuthError::InternalFault("verified outcome reached rejection".to_owned())))
    }

    /// Evaluate every labeled signature and fold the results.
    ///
    /// Returns the decisive outcome and, when verified, the key identifier of
    /// the verifying entry.
    fn evaluate(&self, parts: &http::request::Parts, now: i64) -> (VerificationOutcome, Option<String>) {
        let parsed = match extract_signature_headers(&parts.headers).and_then(|(input, signature)| {
            parse_signature_headers(input.as_deref(), signature.as_deref())
        }) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => return (VerificationOutcome::NoSignaturePresent, None),
            Err(AuthError::MalformedSignature(reason)) => {
                return (VerificationOutcome::MalformedSyntax(reason), None);
            }
            Err(other) => return (VerificationOutcome::MalformedSyntax(other.to_string()), None),
        };

        let target = RequestTarget::from_parts(parts, &self.scheme);
        let keys = Arc::clone(&self.keys.read());

        let mut tally = Tally::default();
        for (entry, signature) in parsed.pairs() {
            let outcome = evaluate_entry(entry, signature, &target, keys.as_ref(), now);
            debug!(label = %entry.label, keyid = %entry.keyid, outcome = ?outcome, "evaluated signature");
            tally.record(outcome, &entry.keyid);
        }
        tally.finish()
    }
}

fn evaluate_entry(
    entry: &SignatureInputEntry,
    signature: &[u8; SIGNATURE_LENGTH],
    target: &RequestTarget,
    keys: &dyn KeyProvider,
    now: i64,
) -> VerificationOutcome {
    let label = entry.label.clone();

    let bases = match candidate_signature_bases(entry, target) {
        Ok(bases) => bases,
        Err(err) => return VerificationOutcome::MalformedSyntax(reason_of(err)),
    };

    if let Some(alg) = &entry.algorithm {
        if !alg.eq_ignore_ascii_case(ED25519_ALGORITHM) {
            debug!(label = %label, alg = %alg, "unsupported signature algorithm");
            return VerificationOutcome::SignatureMismatch(label);
        }
    }

    if entry.expires.is_some_and(|expires| expires < now) {
        debug!(label = %label, now, "signature expired");
        return VerificationOutcome::SignatureMismatch(label);
    }

    let key = match keys.resolve(&entry.keyid) {
        Ok(key) => key,
        Err(AuthError::UnknownKey) => return VerificationOutcome::UnknownKey(label),
        Err(err) => {
            return VerificationOutcome::InternalFault {
                label,
                reason: reason_of(err),
            };
        }
    };

    match verify_signature(&bases, signature, &key) {
        Ok(true) => VerificationOutcome::Verified(label),
        Ok(false) => VerificationOutcome::SignatureMismatch(label),
        Err(err) => VerificationOutcome::InternalFault {
            label,
            reason: reason_of(err),
        },
    }
}

fn reason_of(err: AuthError) -> String {
    match err {
        AuthError::MalformedSignature(reason)
        | AuthError::InternalFault(reason)
        | AuthError::Configuration(reason) => reason,
        other => other.to_string(),
    }
}

#[derive(Default)]
struct Tally {
    malformed: Option<VerificationOutcome>,
    verified: Option<(VerificationOutcome, String)>,
    fault: Option<VerificationOutcome>,
    rejected: Option<VerificationOutcome>,
}

impl Tally {
    fn record(&mut self, outcome: VerificationOutcome, keyid: &str) {
        let slot = match &outcome {
            VerificationOutcome::MalformedSyntax(_) => &mut self.malformed,
            VerificationOutcome::Verified(_) => {
                if self.verified.is_none() {
                    self.verified = Some((outcome, keyid.to_owned()));
                }
                return;
            }
            VerificationOutcome::InternalFault { .. } => &mut self.fault,
            _ => &mut self.rejected,
        };
        if slot.is_none() {
            *slot = Some(outcome);
        }
    }

    fn finish(self) -> (VerificationOutcome, Option<String>) {
        if let Some(outcome) = self.malformed {
            return (outcome, None);
        }
        if let Some((outcome, keyid)) = self.verified {
            return (outcome, Some(keyid));
        }
        let outcome = self
            .fault
            .or(self.rejected)
            .unwrap_or(VerificationOutcome::NoSignaturePresent);
        (outcome, None)
    }
}
