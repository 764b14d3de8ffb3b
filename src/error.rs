//! Unified client error model.
//! Every failure the portal can surface maps onto one of these variants, whether it came
//! from the remote service, the transport, or a client-side precondition.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    MalformedCredential { code: String, message: String },
    AuthenticationFailed { code: String, message: String },
    RegistrationFailed { code: String, message: String },
    InvalidSearchRange { code: String, message: String },
    InvalidRecord { code: String, message: String },
    QueryFailed { code: String, message: String },
    Unauthorized { code: String, message: String },
    Forbidden { code: String, message: String },
    NetworkError { code: String, message: String },
    Config { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::MalformedCredential { code, .. }
            | AppError::AuthenticationFailed { code, .. }
            | AppError::RegistrationFailed { code, .. }
            | AppError::InvalidSearchRange { code, .. }
            | AppError::InvalidRecord { code, .. }
            | AppError::QueryFailed { code, .. }
            | AppError::Unauthorized { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::NetworkError { code, .. }
            | AppError::Config { code, .. } => code.as_str(),
        }
    }

    /// The user-facing message. Remote-originated messages are carried verbatim.
    pub fn message(&self) -> &str {
        match self {
            AppError::MalformedCredential { message, .. }
            | AppError::AuthenticationFailed { message, .. }
            | AppError::RegistrationFailed { message, .. }
            | AppError::InvalidSearchRange { message, .. }
            | AppError::InvalidRecord { message, .. }
            | AppError::QueryFailed { message, .. }
            | AppError::Unauthorized { message, .. }
            | AppError::Forbidden { message, .. }
            | AppError::NetworkError { message, .. }
            | AppError::Config { message, .. } => message.as_str(),
        }
    }

    pub fn malformed_credential<S: Into<String>>(msg: S) -> Self { AppError::MalformedCredential { code: "malformed_credential".into(), message: msg.into() } }
    pub fn authentication_failed<S: Into<String>>(msg: S) -> Self { AppError::AuthenticationFailed { code: "authentication_failed".into(), message: msg.into() } }
    pub fn registration_failed<S: Into<String>>(msg: S) -> Self { AppError::RegistrationFailed { code: "registration_failed".into(), message: msg.into() } }
    pub fn invalid_search_range<S: Into<String>>(msg: S) -> Self { AppError::InvalidSearchRange { code: "invalid_search_range".into(), message: msg.into() } }
    pub fn invalid_record<S: Into<String>>(msg: S) -> Self { AppError::InvalidRecord { code: "invalid_record".into(), message: msg.into() } }
    pub fn query_failed<S: Into<String>>(msg: S) -> Self { AppError::QueryFailed { code: "query_failed".into(), message: msg.into() } }
    pub fn unauthorized<S: Into<String>>(msg: S) -> Self { AppError::Unauthorized { code: "unauthorized".into(), message: msg.into() } }
    pub fn forbidden<S: Into<String>>(msg: S) -> Self { AppError::Forbidden { code: "forbidden".into(), message: msg.into() } }
    pub fn network<S: Into<String>>(msg: S) -> Self { AppError::NetworkError { code: "network_error".into(), message: msg.into() } }
    pub fn config<S: Into<String>>(msg: S) -> Self { AppError::Config { code: "config_error".into(), message: msg.into() } }

    /// Errors that mean the held credential can no longer be trusted. The portal tears the
    /// session down when it sees one of these on a session-owned call.
    pub fn ends_session(&self) -> bool {
        matches!(self, AppError::MalformedCredential { .. } | AppError::Unauthorized { .. })
    }

    /// Remote failures also replace the content area; client-side ones only raise a notice.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            AppError::AuthenticationFailed { .. }
                | AppError::RegistrationFailed { .. }
                | AppError::QueryFailed { .. }
                | AppError::Unauthorized { .. }
                | AppError::Forbidden { .. }
                | AppError::NetworkError { .. }
        )
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        // Anything reqwest raises before a status line is read is a transport failure
        AppError::network(err.to_string())
    }
}

impl From<crate::identity::ClaimsError> for AppError {
    fn from(err: crate::identity::ClaimsError) -> Self {
        AppError::malformed_credential(err.to_string())
    }
}
