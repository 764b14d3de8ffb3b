use serde::Serialize;
use tracing::debug;

/// The three mutually exclusive screens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ViewState {
    #[default]
    LoggedOutLogin,
    LoggedOutRegister,
    LoggedInApp,
}

impl ViewState {
    pub const ALL: [ViewState; 3] = [ViewState::LoggedOutLogin, ViewState::LoggedOutRegister, ViewState::LoggedInApp];

    pub fn label(&self) -> &'static str {
        match self {
            ViewState::LoggedOutLogin => "login",
            ViewState::LoggedOutRegister => "register",
            ViewState::LoggedInApp => "app",
        }
    }
}

/// Navigation intents and session lifecycle events the router reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavIntent {
    ShowRegister,
    ShowLogin,
    AuthenticateSucceeded,
    RegisterSucceeded,
    Logout,
}

impl NavIntent {
    pub const ALL: [NavIntent; 5] = [
        NavIntent::ShowRegister,
        NavIntent::ShowLogin,
        NavIntent::AuthenticateSucceeded,
        NavIntent::RegisterSucceeded,
        NavIntent::Logout,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ViewState,
    pub to: ViewState,
}

impl Transition {
    pub fn changed(&self) -> bool { self.from != self.to }
}

/// Screen selector. Holds a single state value, so exactly one screen is ever current.
#[derive(Debug, Clone, Default)]
pub struct ViewRouter {
    state: ViewState,
}

/// Legal edges; every other (state, intent) pair is ignored.
fn next_state(state: ViewState, intent: NavIntent) -> Option<ViewState> {
    use NavIntent::*;
    use ViewState::*;
    match (state, intent) {
        (LoggedOutLogin, ShowRegister) => Some(LoggedOutRegister),
        (LoggedOutRegister, ShowLogin) => Some(LoggedOutLogin),
        (LoggedOutLogin, AuthenticateSucceeded) => Some(LoggedInApp),
        (LoggedOutRegister, RegisterSucceeded) => Some(LoggedOutLogin),
        (LoggedInApp, Logout) => Some(LoggedOutLogin),
        _ => None,
    }
}

impl ViewRouter {
    pub fn new() -> Self { Self::default() }

    pub fn current(&self) -> ViewState { self.state }

    pub fn apply(&mut self, intent: NavIntent) -> Transition {
        let from = self.state;
        match next_state(from, intent) {
            Some(to) => {
                self.state = to;
                debug!(target: "medrec::router", "{} -> {} on {:?}", from.label(), to.label(), intent);
                Transition { from, to }
            }
            None => {
                debug!(target: "medrec::router", "ignoring {:?} on {}", intent, from.label());
                Transition { from, to: from }
            }
        }
    }

    /// Visibility of each screen, in [`ViewState::ALL`] order.
    pub fn visibility(&self) -> [(ViewState, bool); 3] {
        ViewState::ALL.map(|s| (s, s == self.state))
    }
}
