//!
//! Portal controller
//! -----------------
//! Owns the session store and the view router and is the only thing that mutates them.
//! Front ends feed it [`Intent`]s and receive commands through the [`Surface`] trait;
//! the portal never deals in markup or terminal escapes itself.
//!
//! Responsibilities:
//! - Login/register/logout lifecycle, including teardown when a credential turns out to be
//!   malformed, expired, or rejected by the service.
//! - Routing list/search/append requests through the gateway with the current credential.
//! - Presenting results through the access policy for whoever is logged in *when the
//!   result arrives*; results that belong to an ended session are dropped.
//! - Transient notices with a cosmetic auto-dismiss timer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{AppError, AppResult};
use crate::gateway::RemoteGateway;
use crate::identity::{capabilities_for, Capabilities, ClaimedIdentity, Credential, SessionStore};
use crate::records::{PatientForm, PatientRecord, WeightRange};
use crate::view::{render, NavIntent, Rendered, ViewRouter, ViewState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub text: String,
}

/// Sink for everything the portal wants shown. Calls arrive while the portal holds its
/// state lock, so implementations must not call back into the portal.
pub trait Surface: Send + Sync {
    fn show_screen(&self, screen: ViewState);
    fn set_session_banner(&self, identity: Option<&ClaimedIdentity>);
    fn set_append_section_visible(&self, visible: bool);
    fn show_loading(&self, label: &str);
    fn render(&self, rendered: &Rendered);
    fn show_error_content(&self, message: &str);
    /// Back to the empty content area shown before any query.
    fn reset_content(&self);
    fn show_notice(&self, notice: &Notice);
    fn dismiss_notice(&self, id: u64);
    /// Drop staged search bounds and the add-patient form.
    fn clear_staged_inputs(&self);
    fn reset_register_form(&self);
    fn reset_patient_form(&self);
}

/// User intents coming from the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SubmitLogin { username: String, password: String },
    SubmitRegister { username: String, password: String, occupation: String },
    ShowRegister,
    ShowLogin,
    ViewAll,
    SearchByWeight { min: String, max: String },
    SubmitPatient(PatientForm),
    Logout,
}

struct PortalState {
    session: SessionStore,
    router: ViewRouter,
}

struct SessionTicket {
    credential: Credential,
    generation: u64,
    capabilities: Capabilities,
}

pub struct Portal {
    gateway: RemoteGateway,
    surface: Arc<dyn Surface>,
    config: ClientConfig,
    state: Mutex<PortalState>,
    notice_seq: AtomicU64,
}

impl Portal {
    pub fn new(gateway: RemoteGateway, surface: Arc<dyn Surface>, config: ClientConfig) -> Self {
        let portal = Self {
            gateway,
            surface,
            config,
            state: Mutex::new(PortalState { session: SessionStore::new(), router: ViewRouter::new() }),
            notice_seq: AtomicU64::new(1),
        };
        portal.surface.show_screen(ViewState::default());
        portal.surface.set_session_banner(None);
        portal.surface.set_append_section_visible(false);
        portal
    }

    pub fn current_view(&self) -> ViewState { self.state.lock().router.current() }

    pub fn current_identity(&self) -> Option<ClaimedIdentity> {
        self.state.lock().session.current_identity().cloned()
    }

    /// Capabilities of whoever is logged in right now (restricted when nobody is).
    pub fn capabilities(&self) -> Capabilities {
        let st = self.state.lock();
        capabilities_for(st.session.current_identity().map(|i| i.role()))
    }

    pub fn has_session(&self) -> bool {
        let st = self.state.lock();
        st.session.is_active()
    }

    /// Handle one intent. Every failure has already been surfaced by the time the error is
    /// returned; callers only need it for logging or tests.
    pub async fn handle(&self, intent: Intent) -> AppResult<()> {
        match intent {
            Intent::SubmitLogin { username, password } => self.login(&username, &password).await,
            Intent::SubmitRegister { username, password, occupation } => self.register(&username, &password, &occupation).await,
            Intent::ShowRegister => { self.navigate(NavIntent::ShowRegister); Ok(()) }
            Intent::ShowLogin => { self.navigate(NavIntent::ShowLogin); Ok(()) }
            Intent::ViewAll => self.view_all().await,
            Intent::SearchByWeight { min, max } => self.search_by_weight(&min, &max).await,
            Intent::SubmitPatient(form) => self.submit_patient(&form).await,
            Intent::Logout => { self.logout(); Ok(()) }
        }
    }

    fn navigate(&self, intent: NavIntent) {
        let mut st = self.state.lock();
        let t = st.router.apply(intent);
        if t.changed() {
            self.surface.show_screen(t.to);
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> AppResult<()> {
        if self.current_view() != ViewState::LoggedOutLogin {
            return self.fail(AppError::authentication_failed("Open the login screen (and log out) before logging in."));
        }
        let credential = match self.gateway.authenticate(username, password).await {
            Ok(c) => c,
            Err(e) => return self.fail(e),
        };

        let mut st = self.state.lock();
        if st.router.current() != ViewState::LoggedOutLogin {
            // The user navigated away while the request was in flight
            debug!(target: "medrec::portal", "discarding login result; view is now {}", st.router.current().label());
            return Ok(());
        }
        let identity = match st.session.begin_session(credential) {
            Ok(id) => id,
            Err(e) => {
                self.teardown(&mut st);
                drop(st);
                return self.fail(e);
            }
        };
        if identity.is_expired_at(Utc::now()) {
            self.teardown(&mut st);
            drop(st);
            return self.fail(AppError::unauthorized("Token has expired! Please log in again."));
        }
        let t = st.router.apply(NavIntent::AuthenticateSucceeded);
        let caps = capabilities_for(Some(identity.role()));
        self.surface.set_session_banner(Some(&identity));
        self.surface.set_append_section_visible(caps.append_section_visible());
        if t.changed() {
            self.surface.show_screen(t.to);
        }
        drop(st);
        info!(target: "medrec::portal", "logged in user={} role={}", identity.username(), identity.role());
        self.notify(NoticeKind::Success, "Login successful!");
        Ok(())
    }

    pub async fn register(&self, username: &str, password: &str, occupation: &str) -> AppResult<()> {
        if self.current_view() != ViewState::LoggedOutRegister {
            return self.fail(AppError::registration_failed("Open the register screen before registering."));
        }
        if let Err(e) = self.gateway.register(username, password, occupation).await {
            return self.fail(e);
        }
        {
            let mut st = self.state.lock();
            let t = st.router.apply(NavIntent::RegisterSucceeded);
            self.surface.reset_register_form();
            if t.changed() {
                self.surface.show_screen(t.to);
            }
        }
        info!(target: "medrec::portal", "registered user={}", username);
        self.notify(NoticeKind::Success, "Registration successful! Please login.");
        Ok(())
    }

    pub async fn view_all(&self) -> AppResult<()> {
        let ticket = match self.ticket() {
            Ok(t) => t,
            Err(e) => return self.fail(e),
        };
        self.surface.show_loading("Loading...");
        let result = self.gateway.list_all(&ticket.credential).await;
        self.apply_records(ticket.generation, result)
    }

    pub async fn search_by_weight(&self, min: &str, max: &str) -> AppResult<()> {
        // Checked before anything else so an incomplete range never reaches the network
        let range = match WeightRange::parse(min, max) {
            Ok(r) => r,
            Err(e) => return self.fail(e),
        };
        let ticket = match self.ticket() {
            Ok(t) => t,
            Err(e) => return self.fail(e),
        };
        self.surface.show_loading("Searching...");
        let result = self.gateway.search_by_weight(&ticket.credential, range).await;
        self.apply_records(ticket.generation, result)
    }

    pub async fn submit_patient(&self, form: &PatientForm) -> AppResult<()> {
        let ticket = match self.ticket() {
            Ok(t) => t,
            Err(e) => return self.fail(e),
        };
        let record = match form.parse() {
            Ok(r) => r,
            Err(e) => return self.fail(e),
        };
        let receipt = self.gateway.append_record(&ticket.credential, &ticket.capabilities, &record).await;
        {
            let mut st = self.state.lock();
            if !st.session.is_current(ticket.generation) {
                debug!(target: "medrec::portal", "discarding append result for ended session");
                return Ok(());
            }
            match receipt {
                Ok(r) => {
                    info!(target: "medrec::portal", "patient added id={:?}", r.patient_id);
                    self.surface.reset_patient_form();
                }
                Err(e) => {
                    if e.ends_session() {
                        self.teardown(&mut st);
                    }
                    drop(st);
                    return self.fail(e);
                }
            }
        }
        self.notify(NoticeKind::Success, "Patient added successfully!");
        self.view_all().await
    }

    /// End the session and return to the login screen. The session clear and input reset
    /// run even when the router ignores the logout (e.g. on the register screen).
    pub fn logout(&self) {
        let mut st = self.state.lock();
        self.teardown(&mut st);
    }

    fn teardown(&self, st: &mut PortalState) {
        let had_session = st.session.end_session();
        let t = st.router.apply(NavIntent::Logout);
        self.surface.set_session_banner(None);
        self.surface.set_append_section_visible(false);
        self.surface.clear_staged_inputs();
        self.surface.reset_content();
        if t.changed() {
            self.surface.show_screen(t.to);
        }
        if had_session {
            info!(target: "medrec::portal", "session torn down; view={}", t.to.label());
        }
    }

    /// Credential, generation and capabilities for a session-owned request. Fails with
    /// `Unauthorized` when nobody is logged in, and tears down an expired session.
    fn ticket(&self) -> AppResult<SessionTicket> {
        let mut st = self.state.lock();
        let Some((credential, generation)) = st.session.snapshot() else {
            return Err(AppError::unauthorized("Please log in first."));
        };
        let (expired, capabilities) = match st.session.current_identity() {
            Some(id) => (id.is_expired_at(Utc::now()), capabilities_for(Some(id.role()))),
            None => (false, Capabilities::RESTRICTED),
        };
        if expired {
            self.teardown(&mut st);
            return Err(AppError::unauthorized("Token has expired! Please log in again."));
        }
        Ok(SessionTicket { credential, generation, capabilities })
    }

    fn apply_records(&self, generation: u64, result: AppResult<Vec<PatientRecord>>) -> AppResult<()> {
        let mut st = self.state.lock();
        if !st.session.is_current(generation) {
            debug!(target: "medrec::portal", "discarding result addressed to session gen={}", generation);
            return Ok(());
        }
        match result {
            Ok(records) => {
                // Policy is evaluated per render against the identity current now
                let caps = capabilities_for(st.session.current_identity().map(|i| i.role()));
                self.surface.render(&render(&records, &caps));
                Ok(())
            }
            Err(e) => {
                if e.is_remote() {
                    self.surface.show_error_content(&format!("Error: {}", e.message()));
                }
                if e.ends_session() {
                    self.teardown(&mut st);
                }
                drop(st);
                self.fail(e)
            }
        }
    }

    fn fail(&self, err: AppError) -> AppResult<()> {
        info!(target: "medrec::portal", "{}", err);
        self.notify(NoticeKind::Error, err.message());
        Err(err)
    }

    fn notify(&self, kind: NoticeKind, text: &str) {
        let notice = Notice { id: self.notice_seq.fetch_add(1, Ordering::Relaxed), kind, text: text.to_string() };
        self.surface.show_notice(&notice);
        let ttl = self.config.notice_ttl;
        if ttl.is_zero() {
            return;
        }
        // Cosmetic only: the timer never touches session or view state
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let surface = Arc::clone(&self.surface);
            let id = notice.id;
            handle.spawn(async move {
                tokio::time::sleep(ttl).await;
                surface.dismiss_notice(id);
            });
        }
    }
}
