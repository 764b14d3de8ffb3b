use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::tprintln;

use super::claims::{decode_claims, ClaimedIdentity, Credential};

#[derive(Debug, Clone)]
struct ActiveSession {
    credential: Credential,
    identity: ClaimedIdentity,
}

/// Holds the logged-in principal.
///
/// Credential and identity live in one `Option`, so the store is either fully
/// authenticated or fully empty. The generation counter moves on every lifecycle event;
/// work started under one generation can check [`SessionStore::is_current`] before
/// applying its result.
#[derive(Debug, Default)]
pub struct SessionStore {
    active: Option<ActiveSession>,
    generation: u64,
}

impl SessionStore {
    pub fn new() -> Self { Self::default() }

    /// Decode `credential` and make it the current session. On failure the store is left
    /// empty, including when a previous session was active.
    pub fn begin_session(&mut self, credential: Credential) -> AppResult<ClaimedIdentity> {
        self.generation += 1;
        match decode_claims(&credential) {
            Ok(identity) => {
                info!(target: "medrec::session", "session started user={} role={} gen={}", identity.username(), identity.role(), self.generation);
                self.active = Some(ActiveSession { credential, identity: identity.clone() });
                Ok(identity)
            }
            Err(e) => {
                warn!(target: "medrec::session", "rejecting credential: {}", e);
                self.active = None;
                Err(e.into())
            }
        }
    }

    /// Clear the session. Returns whether one was active; calling it again is a no-op.
    pub fn end_session(&mut self) -> bool {
        match self.active.take() {
            Some(prev) => {
                self.generation += 1;
                info!(target: "medrec::session", "session ended user={} gen={}", prev.identity.username(), self.generation);
                true
            }
            None => {
                debug!(target: "medrec::session", "end_session with no active session");
                false
            }
        }
    }

    pub fn current_identity(&self) -> Option<&ClaimedIdentity> {
        self.active.as_ref().map(|s| &s.identity)
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.active.as_ref().map(|s| &s.credential)
    }

    pub fn is_active(&self) -> bool { self.active.is_some() }

    pub fn generation(&self) -> u64 { self.generation }

    /// Credential plus the generation it belongs to, for work that outlives the lock.
    pub fn snapshot(&self) -> Option<(Credential, u64)> {
        self.active.as_ref().map(|s| (s.credential.clone(), self.generation))
    }

    /// True while the session that existed at `generation` is still the active one.
    pub fn is_current(&self, generation: u64) -> bool {
        let current = self.active.is_some() && self.generation == generation;
        if !current {
            tprintln!("session.stale gen={} now={}", generation, self.generation);
        }
        current
    }
}
