#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use parking_lot::Mutex;
use reqwest::Url;
use serde_json::{json, Value};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use medrec::config::ClientConfig;
use medrec::gateway::RemoteGateway;
use medrec::identity::ClaimedIdentity;
use medrec::portal::{Notice, NoticeKind, Portal, Surface};
use medrec::view::{Rendered, ViewState};

/// Unsigned JWT-shaped token; the client never checks the signature.
pub fn mint(claims: Value) -> String {
    let enc = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    format!("{}.{}.sig", enc.encode(br#"{"alg":"HS256","typ":"JWT"}"#), enc.encode(claims.to_string()))
}

fn claims_of(token: &str) -> Option<Value> {
    let seg = token.split('.').nth(1)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(seg).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn err(status: StatusCode, key: &str, msg: &str) -> Response {
    let mut body = serde_json::Map::new();
    body.insert(key.to_string(), Value::String(msg.to_string()));
    (status, Json(Value::Object(body))).into_response()
}

#[derive(Default)]
pub struct MockState {
    /// username -> (password, group)
    pub users: Mutex<HashMap<String, (String, String)>>,
    pub records: Mutex<Vec<Value>>,
    /// "METHOD /path[?query]" per request received.
    pub hits: Mutex<Vec<String>>,
    /// Served instead of a token from /login when set.
    pub login_token: Mutex<Option<String>>,
    /// Status and body returned by the query endpoints instead of records when set.
    pub query_failure: Mutex<Option<(StatusCode, Value)>>,
    /// When set, /query_all waits for a notification before answering.
    pub hold_queries: Mutex<Option<Arc<Notify>>>,
    /// Same for /login.
    pub hold_login: Mutex<Option<Arc<Notify>>>,
    /// Every bearer token is treated as expired.
    pub expire_tokens: AtomicBool,
}

impl MockState {
    pub fn add_user(&self, username: &str, password: &str, group: &str) {
        self.users.lock().insert(username.into(), (password.into(), group.into()));
    }

    pub fn hits(&self) -> Vec<String> { self.hits.lock().clone() }

    fn hit(&self, what: String) { self.hits.lock().push(what); }

    // Mirrors the service's token guard
    fn guard(&self, headers: &HeaderMap) -> Result<(String, String), Response> {
        let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) else {
            return Err(err(StatusCode::UNAUTHORIZED, "message", "Authentication token is missing!"));
        };
        let Some(token) = auth.strip_prefix("Bearer ") else {
            return Err(err(StatusCode::UNAUTHORIZED, "message", "Invalid Token format. Use \"Bearer <token>\"."));
        };
        if self.expire_tokens.load(Ordering::SeqCst) {
            return Err(err(StatusCode::UNAUTHORIZED, "message", "Token has expired! Please log in again."));
        }
        let claims = claims_of(token).ok_or_else(|| err(StatusCode::UNAUTHORIZED, "message", "Token is invalid!"))?;
        let user = claims["username"].as_str().unwrap_or_default().to_string();
        match self.users.lock().get(&user) {
            Some((_, group)) => Ok((user, group.clone())),
            None => Err(err(StatusCode::UNAUTHORIZED, "message", "Token is invalid (user not found)!")),
        }
    }
}

pub fn patient(id: i64, first: &str, last: &str, gender: Value, weight: f64) -> Value {
    json!({
        "patient_id": id,
        "first_name": first,
        "last_name": last,
        "gender": gender,
        "age": 30 + id,
        "weight": weight,
        "height": 170.0,
        "health_history": format!("notes {}", id),
    })
}

async fn login(State(st): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    st.hit("POST /login".into());
    let hold = st.hold_login.lock().clone();
    if let Some(n) = hold {
        n.notified().await;
    }
    let user = body["username"].as_str().unwrap_or_default().to_string();
    let pass = body["password"].as_str().unwrap_or_default().to_string();
    let group = match st.users.lock().get(&user) {
        Some((p, g)) if *p == pass => g.clone(),
        _ => return err(StatusCode::UNAUTHORIZED, "error", "Invalid username or password"),
    };
    let token = st.login_token.lock().clone().unwrap_or_else(|| {
        let exp = chrono::Utc::now().timestamp() + 3600;
        mint(json!({"user_id": 1, "username": user, "group": group, "exp": exp}))
    });
    Json(json!({"message": "Login successful", "token": token, "group": group})).into_response()
}

async fn register(State(st): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    st.hit("POST /register".into());
    let user = body["username"].as_str().unwrap_or_default().to_string();
    let pass = body["password"].as_str().unwrap_or_default().to_string();
    let occupation = body["occupation"].as_str().unwrap_or_default().to_string();
    let group = match occupation.trim().to_lowercase().as_str() {
        "doctor" | "nurse" | "admin" | "hospital administration staff" => "H",
        "researcher" => "R",
        _ => {
            let msg = format!("Invalid occupation: '{}'. Must be Doctor, Nurse, Admin, or Researcher.", occupation);
            return err(StatusCode::BAD_REQUEST, "error", &msg);
        }
    };
    if st.users.lock().contains_key(&user) {
        return err(StatusCode::CONFLICT, "error", "Username already exists");
    }
    st.add_user(&user, &pass, group);
    (StatusCode::CREATED, Json(json!({"message": "User registered successfully"}))).into_response()
}

async fn query_all(State(st): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    st.hit("GET /query_all".into());
    if let Err(resp) = st.guard(&headers) {
        return resp;
    }
    let hold = st.hold_queries.lock().clone();
    if let Some(n) = hold {
        n.notified().await;
    }
    if let Some((status, body)) = st.query_failure.lock().clone() {
        return (status, Json(body)).into_response();
    }
    Json(Value::Array(st.records.lock().clone())).into_response()
}

async fn query_by_weight(
    State(st): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let min = params.get("min").cloned().unwrap_or_default();
    let max = params.get("max").cloned().unwrap_or_default();
    st.hit(format!("GET /query_by_weight?min={}&max={}", min, max));
    if let Err(resp) = st.guard(&headers) {
        return resp;
    }
    if let Some((status, body)) = st.query_failure.lock().clone() {
        return (status, Json(body)).into_response();
    }
    let (Ok(lo), Ok(hi)) = (min.parse::<f64>(), max.parse::<f64>()) else {
        return err(StatusCode::BAD_REQUEST, "error", "Invalid numbers");
    };
    let rows: Vec<Value> = st
        .records
        .lock()
        .iter()
        .filter(|r| r["weight"].as_f64().map(|w| w >= lo && w <= hi).unwrap_or(false))
        .cloned()
        .collect();
    Json(Value::Array(rows)).into_response()
}

async fn add_data(State(st): State<Arc<MockState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    st.hit("POST /add_data".into());
    let (_, group) = match st.guard(&headers) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    if group != "H" {
        return err(StatusCode::FORBIDDEN, "error", "Access Denied: Only users from Group H can add new data.");
    }
    let mut records = st.records.lock();
    let id = records.len() as i64 + 1;
    let mut row = body.clone();
    row["patient_id"] = json!(id);
    records.push(row);
    (StatusCode::CREATED, Json(json!({"message": "Patient added successfully", "patient_id": id}))).into_response()
}

pub struct MockService {
    pub base: Url,
    pub state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl Drop for MockService {
    fn drop(&mut self) { self.handle.abort(); }
}

/// Start the mock records service on an ephemeral localhost port.
pub async fn start_mock() -> MockService {
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/query_all", get(query_all))
        .route("/query_by_weight", get(query_by_weight))
        .route("/add_data", post(add_data))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind 127.0.0.1:0");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("mock service error: {e:?}");
        }
    });
    let base = Url::parse(&format!("http://{}", addr)).expect("mock url");
    MockService { base, state, handle }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Screen(ViewState),
    Banner(Option<String>),
    AppendVisible(bool),
    Loading(String),
    Render(Rendered),
    ErrorContent(String),
    ResetContent,
    Notice(NoticeKind, String),
    Dismiss(u64),
    ClearInputs,
    ResetRegister,
    ResetPatient,
}

#[derive(Default)]
pub struct RecordingSurface {
    events: Mutex<Vec<Event>>,
}

impl RecordingSurface {
    pub fn events(&self) -> Vec<Event> { self.events.lock().clone() }
    pub fn take(&self) -> Vec<Event> { std::mem::take(&mut *self.events.lock()) }

    pub fn renders(&self) -> Vec<Rendered> {
        self.events()
            .into_iter()
            .filter_map(|e| match e { Event::Render(r) => Some(r), _ => None })
            .collect()
    }

    pub fn notices(&self) -> Vec<(NoticeKind, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e { Event::Notice(k, t) => Some((k, t)), _ => None })
            .collect()
    }

    pub fn last_append_visible(&self) -> Option<bool> {
        self.events().into_iter().rev().find_map(|e| match e { Event::AppendVisible(v) => Some(v), _ => None })
    }

    fn push(&self, e: Event) { self.events.lock().push(e); }
}

impl Surface for RecordingSurface {
    fn show_screen(&self, screen: ViewState) { self.push(Event::Screen(screen)); }
    fn set_session_banner(&self, identity: Option<&ClaimedIdentity>) {
        self.push(Event::Banner(identity.map(|i| i.username().to_string())));
    }
    fn set_append_section_visible(&self, visible: bool) { self.push(Event::AppendVisible(visible)); }
    fn show_loading(&self, label: &str) { self.push(Event::Loading(label.to_string())); }
    fn render(&self, rendered: &Rendered) { self.push(Event::Render(rendered.clone())); }
    fn show_error_content(&self, message: &str) { self.push(Event::ErrorContent(message.to_string())); }
    fn reset_content(&self) { self.push(Event::ResetContent); }
    fn show_notice(&self, notice: &Notice) { self.push(Event::Notice(notice.kind, notice.text.clone())); }
    fn dismiss_notice(&self, id: u64) { self.push(Event::Dismiss(id)); }
    fn clear_staged_inputs(&self) { self.push(Event::ClearInputs); }
    fn reset_register_form(&self) { self.push(Event::ResetRegister); }
    fn reset_patient_form(&self) { self.push(Event::ResetPatient); }
}

pub fn gateway_for(mock: &MockService) -> RemoteGateway {
    RemoteGateway::new(mock.base.clone(), Duration::from_secs(5)).expect("gateway")
}

/// Portal wired to `mock` with notice timers disabled.
pub fn portal_for(mock: &MockService) -> (Arc<Portal>, Arc<RecordingSurface>) {
    let surface = Arc::new(RecordingSurface::default());
    let cfg = ClientConfig { api_base: mock.base.clone(), notice_ttl: Duration::ZERO, ..ClientConfig::default() };
    let portal = Portal::new(gateway_for(mock), surface.clone(), cfg);
    surface.take();
    (Arc::new(portal), surface)
}
