//! Ed25519 verification over candidate signature bases.

use ed25519_dalek::{Signature, VerifyingKey};
use subtle::Choice;

use crate::error::AuthError;
use crate::header::SIGNATURE_LENGTH;
use crate::keys::KeyRecord;

/// Verify `signature` against every candidate base with the resolved key.
///
/// Returns `Ok(true)` if any base verifies. Every candidate is checked so the
/// time spent does not depend on which variant matched.
///
/// # Errors
///
/// Returns [`AuthError::InternalFault`] when the configured key bytes are not
/// a valid Ed25519 public key.
pub fn verify_signature(
    bases: &[String],
    signature: &[u8; SIGNATURE_LENGTH],
    key: &KeyRecord,
) -> Result<bool, AuthError> {
    let verifying_key = VerifyingKey::from_bytes(&key.public_key).map_err(|_| {
        AuthError::InternalFault(format!(
            "key {} from {} is not a valid Ed25519 point",
            key.keyid, key.source
        ))
    })?;
    let signature = Signature::from_bytes(signature);

    let matched = bases.iter().fold(Choice::from(0u8), |acc, base| {
        let ok = verifying_key
            .verify_strict(base.as_bytes(), &signature)
            .is_ok();
        acc | Choice::from(u8::from(ok))
    });

    Ok(bool::from(matched))
}
