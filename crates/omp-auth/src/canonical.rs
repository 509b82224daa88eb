//! Signature base construction.
//!
//! The signature base is one line per covered component followed by the
//! `@signature-params` line, joined with `\n` and without a trailing newline:
//!
//! ```text
//! "@method": POST
//! "@authority": example.com
//! "@path": /objects
//! "@signature-params": ("@method" "@authority" "@path");created=1700000000;keyid="sig1"
//! ```
//!
//! Two differences between what a client signed and what the server observes
//! are tolerated, and no others: the default port of the scheme being present
//! or absent in the authority, and a single trailing slash on the path. The
//! literal form is always produced first.

use std::fmt::Write as _;

use crate::error::AuthError;
use crate::header::{Component, SignatureInputEntry};

/// Pseudo-component carrying the serialized signature parameters.
pub const SIGNATURE_PARAMS: &str = "@signature-params";

/// The request properties a signature base is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    /// Request method token.
    pub method: String,
    /// Lowercase scheme.
    pub scheme: String,
    /// Host and optional port, when known.
    pub authority: Option<String>,
    /// Request path as received.
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
}

impl RequestTarget {
    /// Build a target from explicit values.
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        scheme: impl Into<String>,
        authority: Option<String>,
        path: impl Into<String>,
        query: Option<String>,
    ) -> Self {
        Self {
            method: method.into(),
            scheme: scheme.into().to_ascii_lowercase(),
            authority,
            path: path.into(),
            query,
        }
    }

    /// Build a target from an absolute or origin-form URI.
    ///
    /// `default_scheme` is used when the URI carries no scheme.
    #[must_use]
    pub fn from_uri(method: &http::Method, uri: &http::Uri, default_scheme: &str) -> Self {
        Self::new(
            method.as_str(),
            uri.scheme_str().unwrap_or(default_scheme),
            uri.authority().map(|a| a.as_str().to_owned()),
            uri.path(),
            uri.query().map(ToOwned::to_owned),
        )
    }

    /// Build a target from received request parts.
    ///
    /// The authority comes from the request URI when present (HTTP/2 or
    /// absolute-form), otherwise from the `Host` header.
    #[must_use]
    pub fn from_parts(parts: &http::request::Parts, default_scheme: &str) -> Self {
        let mut target = Self::from_uri(&parts.method, &parts.uri, default_scheme);
        if target.authority.is_none() {
            target.authority = parts
                .headers
                .get(http::header::HOST)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty());
        }
        target
    }

    fn component_value(&self, component: Component) -> Result<String, AuthError> {
        match component {
            Component::Method => Ok(self.method.clone()),
            Component::Scheme => Ok(self.scheme.clone()),
            Component::Authority => Ok(self.require_authority()?.to_ascii_lowercase()),
            Component::Path => Ok(self.normalized_path().to_owned()),
            Component::Query => self
                .query
                .as_deref()
                .map(|query| format!("?{query}"))
                .ok_or_else(|| AuthError::malformed("request has no query")),
            Component::TargetUri => {
                let mut uri = format!(
                    "{}://{}{}",
                    self.scheme,
                    self.require_authority()?.to_ascii_lowercase(),
                    self.normalized_path()
                );
                if let Some(query) = &self.query {
                    uri.push('?');
                    uri.push_str(query);
                }
                Ok(uri)
            }
        }
    }

    fn require_authority(&self) -> Result<&str, AuthError> {
        self.authority
            .as_deref()
            .ok_or_else(|| AuthError::malformed("request authority cannot be determined"))
    }

    fn normalized_path(&self) -> &str {
        if self.path.is_empty() { "/" } else { &self.path }
    }

    /// The literal target followed by each tolerated variant, deduplicated.
    ///
    /// At most four targets are produced.
    #[must_use]
    pub fn candidates(&self) -> Vec<Self> {
        let authorities = match &self.authority {
            Some(authority) => {
                let mut forms = vec![Some(authority.clone())];
                if let Some(alt) = toggle_default_port(authority, &self.scheme) {
                    forms.push(Some(alt));
                }
                forms
            }
            None => vec![None],
        };
        let mut paths = vec![self.path.clone()];
        if let Some(alt) = toggle_trailing_slash(&self.path) {
            paths.push(alt);
        }

        let mut out: Vec<Self> = Vec::with_capacity(authorities.len() * paths.len());
        for path in &paths {
            for authority in &authorities {
                let candidate = Self {
                    authority: authority.clone(),
                    path: path.clone(),
                    ..self.clone()
                };
                if !out.contains(&candidate) {
                    out.push(candidate);
                }
            }
        }
        out
    }
}

/// Default port of a scheme.
#[must_use]
pub fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// Add the scheme's default port when absent, or remove it when present.
///
/// Returns `None` when the authority carries a non-default port, the scheme
/// has no default port, or the authority does not parse.
fn toggle_default_port(authority: &str, scheme: &str) -> Option<String> {
    let default = default_port(scheme)?;
    let parsed: http::uri::Authority = authority.parse().ok()?;
    match parsed.port_u16() {
        Some(port) if port == default => Some(parsed.host().to_owned()),
        Some(_) => None,
        None => Some(format!("{}:{default}", parsed.host())),
    }
}

/// Remove a single trailing slash when present, or add one when absent.
///
/// The root path has no variant.
fn toggle_trailing_slash(path: &str) -> Option<String> {
    if path.is_empty() || path == "/" {
        return None;
    }
    match path.strip_suffix('/') {
        Some(stripped) => Some(stripped.to_owned()),
        None => Some(format!("{path}/")),
    }
}

/// Build the signature base of `entry` for exactly this `target`.
///
/// A covered component that cannot be resolved from the target is malformed.
pub fn build_signature_base(
    entry: &SignatureInputEntry,
    target: &RequestTarget,
) -> Result<String, AuthError> {
    let mut base = String::new();
    for component in &entry.covered_components {
        let value = target.component_value(*component).map_err(|err| match err {
            AuthError::MalformedSignature(reason) => AuthError::malformed(format!(
                "label {} covers {component} but {reason}",
                entry.label
            )),
            other => other,
        })?;
        let _ = writeln!(base, "\"{}\": {value}", component.as_str());
    }
    let _ = write!(base, "\"{SIGNATURE_PARAMS}\": {}", entry.serialize_params());
    Ok(base)
}

/// Build the signature bases of `entry` for the literal target and its
/// tolerated variants, deduplicated with the literal form first.
pub fn candidate_signature_bases(
    entry: &SignatureInputEntry,
    target: &RequestTarget,
) -> Result<Vec<String>, AuthError> {
    let mut bases: Vec<String> = Vec::new();
    for candidate in target.candidates() {
        let base = build_signature_base(entry, &candidate)?;
        if !bases.contains(&base) {
            bases.push(base);
        }
    }
    Ok(bases)
}
