//! Parsing of the `Signature-Input` and `Signature` request headers.
//!
//! ```text
//! Signature-Input: sig1=("@method" "@authority" "@path");created=1700000000;keyid="sig1";alg="ed25519"
//! Signature: sig1=:<base64 of 64 bytes>:
//! ```
//!
//! Both headers are structured-field dictionaries keyed by signature label.
//! Every label must appear exactly once in each header.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use tracing::debug;

use crate::error::AuthError;
use crate::sfv::{self, BareItem, InnerList, Item, Member, Parameters};

/// Header carrying the covered components and signature parameters.
pub const SIGNATURE_INPUT_HEADER: &str = "signature-input";

/// Header carrying the signature values.
pub const SIGNATURE_HEADER: &str = "signature";

/// Length of an Ed25519 signature in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Derived request components a signature may cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// `@method`: the request method.
    Method,
    /// `@authority`: host and optional port.
    Authority,
    /// `@path`: the request path.
    Path,
    /// `@scheme`: `http` or `https`.
    Scheme,
    /// `@query`: the query string with a leading `?`.
    Query,
    /// `@target-uri`: the full request URI.
    TargetUri,
}

impl Component {
    /// The component identifier as written in `Signature-Input`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Method => "@method",
            Self::Authority => "@authority",
            Self::Path => "@path",
            Self::Scheme => "@scheme",
            Self::Query => "@query",
            Self::TargetUri => "@target-uri",
        }
    }

    /// Look up a component by identifier.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "@method" => Some(Self::Method),
            "@authority" => Some(Self::Authority),
            "@path" => Some(Self::Path),
            "@scheme" => Some(Self::Scheme),
            "@query" => Some(Self::Query),
            "@target-uri" => Some(Self::TargetUri),
            _ => None,
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One labeled entry of the `Signature-Input` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInputEntry {
    /// Dictionary label shared with the `Signature` header.
    pub label: String,
    /// Covered components in signing order. Never empty.
    pub covered_components: Vec<Component>,
    /// `created` parameter (seconds since the epoch).
    pub created: i64,
    /// `expires` parameter (seconds since the epoch).
    pub expires: Option<i64>,
    /// `keyid` parameter.
    pub keyid: String,
    /// `alg` parameter.
    pub algorithm: Option<String>,
    /// All parameters in wire order, including unrecognized ones.
    params: Parameters,
}

impl SignatureInputEntry {
    /// Build an entry for signing.
    ///
    /// Parameters are emitted in the order `created`, `expires`, `keyid`, `alg`.
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        covered_components: Vec<Component>,
        created: i64,
        expires: Option<i64>,
        keyid: impl Into<String>,
        algorithm: Option<String>,
    ) -> Self {
        let keyid = keyid.into();
        let mut params: Parameters = vec![("created".to_owned(), BareItem::Integer(created))];
        if let Some(expires) = expires {
            params.push(("expires".to_owned(), BareItem::Integer(expires)));
        }
        params.push(("keyid".to_owned(), BareItem::String(keyid.clone())));
        if let Some(alg) = &algorithm {
            params.push(("alg".to_owned(), BareItem::String(alg.clone())));
        }
        Self {
            label: label.into(),
            covered_components,
            created,
            expires,
            keyid,
            algorithm,
            params,
        }
    }

    /// The serialized inner list, as used for the `@signature-params` line and
    /// as the member value in `Signature-Input`.
    #[must_use]
    pub fn serialize_params(&self) -> String {
        let list = InnerList {
            items: self
                .covered_components
                .iter()
                .map(|c| Item {
                    bare: BareItem::String(c.as_str().to_owned()),
                    params: Vec::new(),
                })
                .collect(),
            params: self.params.clone(),
        };
        sfv::serialize_inner_list(&list)
    }

    /// The member as written in a `Signature-Input` header.
    #[must_use]
    pub fn to_header_member(&self) -> String {
        format!("{}={}", self.label, self.serialize_params())
    }
}

/// Signature headers of one request, paired by label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSignatures {
    entries: BTreeMap<String, SignatureInputEntry>,
    signatures: BTreeMap<String, [u8; SIGNATURE_LENGTH]>,
}

impl ParsedSignatures {
    /// All `Signature-Input` entries keyed by label.
    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, SignatureInputEntry> {
        &self.entries
    }

    /// All raw signatures keyed by label.
    #[must_use]
    pub fn signatures(&self) -> &BTreeMap<String, [u8; SIGNATURE_LENGTH]> {
        &self.signatures
    }

    /// Iterate over `(entry, signature)` pairs in label order.
    pub fn pairs(&self) -> impl Iterator<Item = (&SignatureInputEntry, &[u8; SIGNATURE_LENGTH])> {
        self.entries
            .iter()
            .filter_map(|(label, entry)| self.signatures.get(label).map(|sig| (entry, sig)))
    }

    /// Number of labeled signatures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a successfully parsed request.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read both signature headers from a header map.
///
/// Repeated field lines are combined with `", "` as HTTP allows for list-based
/// fields. Non-ASCII values are malformed.
pub fn extract_signature_headers(
    headers: &http::HeaderMap,
) -> Result<(Option<String>, Option<String>), AuthError> {
    Ok((
        combined_header(headers, SIGNATURE_INPUT_HEADER)?,
        combined_header(headers, SIGNATURE_HEADER)?,
    ))
}

fn combined_header(headers: &http::HeaderMap, name: &str) -> Result<Option<String>, AuthError> {
    let mut values = Vec::new();
    for value in headers.get_all(name) {
        let value = value
            .to_str()
            .map_err(|_| AuthError::malformed(format!("{name} header is not valid ASCII")))?;
        values.push(value);
    }
    if values.is_empty() {
        Ok(None)
    } else {
        Ok(Some(values.join(", ")))
    }
}

/// Parse the raw header values.
///
/// Returns `Ok(None)` when both headers are absent.
pub fn parse_signature_headers(
    signature_input: Option<&str>,
    signature: Option<&str>,
) -> Result<Option<ParsedSignatures>, AuthError> {
    let (input, signature) = match (signature_input, signature) {
        (None, None) => return Ok(None),
        (Some(input), Some(signature)) => (input, signature),
        (Some(_), None) => {
            return Err(AuthError::malformed(
                "Signature-Input present without Signature",
            ));
        }
        (None, Some(_)) => {
            return Err(AuthError::malformed(
                "Signature present without Signature-Input",
            ));
        }
    };

    let entries = parse_signature_input(input)?;
    let signatures = parse_signature(signature)?;

    for label in entries.keys() {
        if !signatures.contains_key(label) {
            return Err(AuthError::malformed(format!(
                "label {label} has no matching Signature entry"
            )));
        }
    }
    for label in signatures.keys() {
        if !entries.contains_key(label) {
            return Err(AuthError::malformed(format!(
                "label {label} has no matching Signature-Input entry"
            )));
        }
    }

    debug!(labels = ?entries.keys().collect::<Vec<_>>(), "parsed signature headers");

    Ok(Some(ParsedSignatures {
        entries,
        signatures,
    }))
}

/// Parse a `Signature-Input` header value.
pub fn parse_signature_input(
    value: &str,
) -> Result<BTreeMap<String, SignatureInputEntry>, AuthError> {
    let members = sfv::parse_dictionary(value)?;
    if members.is_empty() {
        return Err(AuthError::malformed("empty Signature-Input"));
    }

    let mut entries = BTreeMap::new();
    for (label, member) in members {
        if entries.contains_key(&label) {
            return Err(AuthError::malformed(format!(
                "duplicate label {label} in Signature-Input"
            )));
        }
        let Member::InnerList(list) = member else {
            return Err(AuthError::malformed(format!(
                "label {label} must be an inner list of covered components"
            )));
        };
        let entry = parse_entry(&label, list)?;
        entries.insert(label, entry);
    }
    Ok(entries)
}

fn parse_entry(label: &str, list: InnerList) -> Result<SignatureInputEntry, AuthError> {
    if list.items.is_empty() {
        return Err(AuthError::malformed(format!(
            "label {label} covers no components"
        )));
    }

    let mut covered_components = Vec::with_capacity(list.items.len());
    for item in &list.items {
        let BareItem::String(name) = &item.bare else {
            return Err(AuthError::malformed(format!(
                "label {label} has a component identifier that is not a string"
            )));
        };
        if !item.params.is_empty() {
            return Err(AuthError::malformed(format!(
                "label {label} uses unsupported parameters on component {name}"
            )));
        }
        let component = Component::from_name(name).ok_or_else(|| {
            AuthError::malformed(format!(
                "label {label} covers unsupported component {name}"
            ))
        })?;
        if covered_components.contains(&component) {
            return Err(AuthError::malformed(format!(
                "label {label} covers {name} more than once"
            )));
        }
        covered_components.push(component);
    }

    let mut created = None;
    let mut expires = None;
    let mut keyid = None;
    let mut algorithm = None;
    for (key, value) in &list.params {
        match (key.as_str(), value) {
            ("created", BareItem::Integer(v)) => created = Some(*v),
            ("expires", BareItem::Integer(v)) => expires = Some(*v),
            ("keyid", BareItem::String(v)) => keyid = Some(v.clone()),
            ("alg", BareItem::String(v)) => algorithm = Some(v.clone()),
            ("created" | "expires", _) => {
                return Err(AuthError::malformed(format!(
                    "label {label} parameter {key} must be an integer"
                )));
            }
            ("keyid" | "alg", _) => {
                return Err(AuthError::malformed(format!(
                    "label {label} parameter {key} must be a string"
                )));
            }
            _ => {}
        }
    }

    let created = created.ok_or_else(|| {
        AuthError::malformed(format!("label {label} is missing the created parameter"))
    })?;
    let keyid = keyid
        .filter(|k| !k.is_empty())
        .ok_or_else(|| AuthError::malformed(format!("label {label} is missing the keyid parameter")))?;

    Ok(SignatureInputEntry {
        label: label.to_owned(),
        covered_components,
        created,
        expires,
        keyid,
        algorithm,
        params: list.params,
    })
}

/// Parse a `Signature` header value into label → raw signature bytes.
pub fn parse_signature(
    value: &str,
) -> Result<BTreeMap<String, [u8; SIGNATURE_LENGTH]>, AuthError> {
    let members = sfv::parse_dictionary(value)?;
    if members.is_empty() {
        return Err(AuthError::malformed("empty Signature"));
    }

    let mut signatures = BTreeMap::new();
    for (label, member) in members {
        if signatures.contains_key(&label) {
            return Err(AuthError::malformed(format!(
                "duplicate label {label} in Signature"
            )));
        }
        let Member::Item(Item {
            bare: BareItem::ByteSequence(raw),
            ..
        }) = member
        else {
            return Err(AuthError::malformed(format!(
                "label {label} must be a byte sequence"
            )));
        };
        let bytes = decode_signature(&raw).ok_or_else(|| {
            AuthError::malformed(format!(
                "label {label} is not a base64-encoded {SIGNATURE_LENGTH}-byte signature"
            ))
        })?;
        signatures.insert(label, bytes);
    }
    Ok(signatures)
}

const OPTIONAL_PADDING: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

/// Standard base64 that decodes with canonical padding or none.
pub(crate) const STANDARD_OPTIONAL_PAD: GeneralPurpose =
    GeneralPurpose::new(&alphabet::STANDARD, OPTIONAL_PADDING);

/// URL-safe base64 that decodes with canonical padding or none.
pub(crate) const URL_SAFE_OPTIONAL_PAD: GeneralPurpose =
    GeneralPurpose::new(&alphabet::URL_SAFE, OPTIONAL_PADDING);

/// Decode a signature in standard or URL-safe base64, padded or not.
///
/// Padding, when present, must be canonical.
#[must_use]
pub fn decode_signature(raw: &str) -> Option<[u8; SIGNATURE_LENGTH]> {
    let bytes = STANDARD_OPTIONAL_PAD
        .decode(raw)
        .or_else(|_| URL_SAFE_OPTIONAL_PAD.decode(raw))
        .ok()?;
    bytes.try_into().ok()
}
