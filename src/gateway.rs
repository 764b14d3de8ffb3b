//! Typed client for the records service HTTP API.
//!
//! One request per call and no retries: a transport failure comes back as
//! [`AppError::NetworkError`] straight away and retrying is left to the user. Every
//! non-success status is folded into the shared [`AppError`] taxonomy with the server's own
//! message kept verbatim.

use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::identity::{Capabilities, Credential};
use crate::records::{NewPatient, PatientRecord, WeightRange};

#[derive(Deserialize)]
struct LoginBody {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Deserialize, Default)]
struct MessageBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    patient_id: Option<i64>,
}

/// Outcome of a successful `POST /add_data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendReceipt {
    pub patient_id: Option<i64>,
    pub message: Option<String>,
}

#[derive(Clone, Copy)]
enum Op {
    Authenticate,
    Register,
    Query,
    Append,
}

impl Op {
    fn fallback(self) -> &'static str {
        match self {
            Op::Authenticate => "Login failed",
            Op::Register => "Register failed",
            Op::Query => "Query failed",
            Op::Append => "Add failed",
        }
    }
}

#[derive(Clone)]
pub struct RemoteGateway {
    base: Url,
    client: reqwest::Client,
}

impl RemoteGateway {
    pub fn new(base: Url, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { base, client })
    }

    pub fn base(&self) -> &Url { &self.base }

    fn url(&self, path: &str) -> AppResult<Url> {
        self.base
            .join(path)
            .map_err(|e| AppError::config(format!("invalid endpoint {}: {}", path, e)))
    }

    /// `POST /login`. Returns the bearer credential; decoding it is the session's job.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<Credential> {
        let resp = self
            .client
            .post(self.url("/login")?)
            .json(&serde_json::json!({"username": username, "password": password}))
            .send()
            .await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            return Err(classify(Op::Authenticate, status, &bytes));
        }
        let body: LoginBody = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::authentication_failed(format!("invalid login response: {}", e)))?;
        match body.token.filter(|t| !t.is_empty()) {
            Some(token) => {
                debug!(target: "medrec::gateway", "login ok user={}", username);
                Ok(Credential::new(token))
            }
            None => Err(AppError::authentication_failed("login response did not include a token")),
        }
    }

    /// `POST /register`. Returns the server's confirmation message if it sent one.
    pub async fn register(&self, username: &str, password: &str, occupation: &str) -> AppResult<Option<String>> {
        let resp = self
            .client
            .post(self.url("/register")?)
            .json(&serde_json::json!({"username": username, "password": password, "occupation": occupation}))
            .send()
            .await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            return Err(classify(Op::Register, status, &bytes));
        }
        // Body is informational only
        let body: MessageBody = serde_json::from_slice(&bytes).unwrap_or_default();
        Ok(body.message)
    }

    /// `GET /query_all`.
    pub async fn list_all(&self, credential: &Credential) -> AppResult<Vec<PatientRecord>> {
        let req = self.client.get(self.url("/query_all")?).bearer_auth(credential.expose());
        self.fetch_records(req).await
    }

    /// `GET /query_by_weight?min=&max=`.
    pub async fn search_by_weight(&self, credential: &Credential, range: WeightRange) -> AppResult<Vec<PatientRecord>> {
        let req = self
            .client
            .get(self.url("/query_by_weight")?)
            .query(&[("min", range.min()), ("max", range.max())])
            .bearer_auth(credential.expose());
        self.fetch_records(req).await
    }

    /// `POST /add_data`. Refused locally with `Forbidden` when the caller's capabilities
    /// do not include appending, without touching the network.
    pub async fn append_record(
        &self,
        credential: &Credential,
        capabilities: &Capabilities,
        record: &NewPatient,
    ) -> AppResult<AppendReceipt> {
        if !capabilities.can_append_records {
            warn!(target: "medrec::gateway", "append_record refused locally: role may not append");
            return Err(AppError::forbidden("Access Denied: your role may not add new data."));
        }
        let resp = self
            .client
            .post(self.url("/add_data")?)
            .bearer_auth(credential.expose())
            .json(record)
            .send()
            .await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            return Err(classify(Op::Append, status, &bytes));
        }
        let body: MessageBody = serde_json::from_slice(&bytes).unwrap_or_default();
        Ok(AppendReceipt { patient_id: body.patient_id, message: body.message })
    }

    async fn fetch_records(&self, req: reqwest::RequestBuilder) -> AppResult<Vec<PatientRecord>> {
        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            return Err(classify(Op::Query, status, &bytes));
        }
        let rows: Vec<PatientRecord> = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::query_failed(format!("invalid records response: {}", e)))?;
        debug!(target: "medrec::gateway", "fetched {} record(s)", rows.len());
        Ok(rows)
    }
}

/// Pull the server's message out of an error body: `error` first, then `message` (the
/// token guard uses that key), then the per-operation fallback.
fn server_message(op: Op, body: &[u8]) -> String {
    let v: serde_json::Value = serde_json::from_slice(body).unwrap_or(serde_json::Value::Null);
    ["error", "message"]
        .iter()
        .find_map(|k| v.get(*k).and_then(|m| m.as_str()).filter(|m| !m.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| op.fallback().to_string())
}

fn classify(op: Op, status: StatusCode, body: &[u8]) -> AppError {
    let msg = server_message(op, body);
    warn!(target: "medrec::gateway", "remote error status={} msg={}", status.as_u16(), msg);
    match op {
        Op::Authenticate => AppError::authentication_failed(msg),
        Op::Register => AppError::registration_failed(msg),
        Op::Query | Op::Append => match status {
            StatusCode::UNAUTHORIZED => AppError::unauthorized(msg),
            StatusCode::FORBIDDEN => AppError::forbidden(msg),
            _ => AppError::query_failed(msg),
        },
    }
}
