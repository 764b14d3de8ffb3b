//! Bearer credential and the identity claims embedded in it.
//!
//! The service issues a three-part signed token (`header.claims.signature`). The client
//! reads the middle segment to learn who is logged in and which role they hold, but it
//! never checks the signature: that is the server's job on every authenticated request.
//! [`ClaimedIdentity`] is the only thing decoding produces, so the unverified nature of
//! the data stays visible at every use site.

use std::fmt;

use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Opaque bearer token as issued by `POST /login`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new<S: Into<String>>(token: S) -> Self { Self(token.into()) }

    /// Raw token text, for the `Authorization` header only.
    pub fn expose(&self) -> &str { &self.0 }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Role claim. The service emits single-letter codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoleCode {
    /// "H": hospital staff (doctor, nurse, admin).
    Clinician,
    /// "R"
    Researcher,
    Unrecognized(String),
}

impl RoleCode {
    pub fn as_code(&self) -> &str {
        match self {
            RoleCode::Clinician => "H",
            RoleCode::Researcher => "R",
            RoleCode::Unrecognized(code) => code.as_str(),
        }
    }

    /// Code used to key the access policy table. Unrecognized roles have none, so a
    /// hand-built `Unrecognized("H")` can never pick up clinician capabilities.
    pub fn policy_key(&self) -> Option<&'static str> {
        match self {
            RoleCode::Clinician => Some("H"),
            RoleCode::Researcher => Some("R"),
            RoleCode::Unrecognized(_) => None,
        }
    }
}

impl From<String> for RoleCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "H" => RoleCode::Clinician,
            "R" => RoleCode::Researcher,
            _ => RoleCode::Unrecognized(code),
        }
    }
}

impl From<&str> for RoleCode {
    fn from(code: &str) -> Self { RoleCode::from(code.to_string()) }
}

impl From<RoleCode> for String {
    fn from(role: RoleCode) -> Self { role.as_code().to_string() }
}

impl fmt::Display for RoleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_code()) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimsError {
    #[error("credential is empty")]
    Empty,
    #[error("credential has no claims segment")]
    MissingSegment,
    #[error("claims segment is not valid base64url: {0}")]
    Encoding(String),
    #[error("claims segment is not a JSON object: {0}")]
    Payload(String),
    #[error("claims are missing required field '{0}'")]
    MissingClaim(&'static str),
}

/// Identity read from a credential's claims without signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedIdentity {
    username: String,
    role: RoleCode,
    expires_at: Option<DateTime<Utc>>,
}

impl ClaimedIdentity {
    pub fn username(&self) -> &str { &self.username }
    pub fn role(&self) -> &RoleCode { &self.role }
    pub fn expires_at(&self) -> Option<DateTime<Utc>> { self.expires_at }

    /// True once `now` has reached the `exp` claim. Credentials without `exp` are left to
    /// the server to reject.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }
}

// The service writes the role under `group`; `role` is accepted too and wins if both appear.
#[derive(Deserialize)]
struct RawClaims {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    exp: Option<serde_json::Value>,
}

/// Decode the claims segment of `credential`.
pub fn decode_claims(credential: &Credential) -> Result<ClaimedIdentity, ClaimsError> {
    let token = credential.expose().trim();
    if token.is_empty() {
        return Err(ClaimsError::Empty);
    }
    let segment = token.split('.').nth(1).ok_or(ClaimsError::MissingSegment)?;
    let bytes = decode_segment(segment)?;
    let raw: RawClaims = serde_json::from_slice(&bytes).map_err(|e| ClaimsError::Payload(e.to_string()))?;

    let username = raw
        .username
        .filter(|u| !u.is_empty())
        .ok_or(ClaimsError::MissingClaim("username"))?;
    let role = raw
        .role
        .or(raw.group)
        .map(RoleCode::from)
        .ok_or(ClaimsError::MissingClaim("role"))?;
    let expires_at = raw
        .exp
        .as_ref()
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

    crate::tprintln!("claims.decode user={} role={}", username, role);
    Ok(ClaimedIdentity { username, role, expires_at })
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, ClaimsError> {
    let unpadded = segment.trim_end_matches('=');
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(unpadded)
        .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(unpadded))
        .map_err(|e| ClaimsError::Encoding(e.to_string()))
}
