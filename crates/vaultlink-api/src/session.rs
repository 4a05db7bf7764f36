// Session state shared by every call a `RouterClient` makes.
//
// The session id sits behind a lock and is read at call time, so a
// re-login replacing it mid-flight is last-writer-wins. The request
// counter is a separate atomic and never resets.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Where the login handshake currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No session id held.
    Unauthenticated,
    /// A challenge/login exchange is in progress and no session is held yet.
    Challenging,
    /// A session id is held.
    Authenticated,
}

#[derive(Debug, Default)]
struct SessionInner {
    sid: Option<String>,
    challenging: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Session {
    inner: RwLock<SessionInner>,
    next_id: AtomicU64,
}

impl Session {
    /// Current session id, if any.
    pub(crate) fn sid(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .sid
            .clone()
    }

    pub(crate) fn state(&self) -> AuthState {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        match (&inner.sid, inner.challenging) {
            (Some(_), _) => AuthState::Authenticated,
            (None, true) => AuthState::Challenging,
            (None, false) => AuthState::Unauthenticated,
        }
    }

    /// Claim the next request id.
    pub(crate) fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// The id the next request will carry.
    pub(crate) fn peek_id(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }

    /// Install a freshly granted session id, replacing any previous one.
    pub(crate) fn replace(&self, sid: String) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .sid = Some(sid);
    }

    pub(crate) fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .sid = None;
    }

    /// Drop `sid` if it is still the current session. A concurrent re-login
    /// that already replaced it is left alone.
    pub(crate) fn invalidate(&self, sid: &str) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.sid.as_deref() == Some(sid) {
            inner.sid = None;
            true
        } else {
            false
        }
    }

    /// Mark a handshake as running until the returned guard is dropped.
    pub(crate) fn begin_challenge(&self) -> ChallengeGuard<'_> {
        self.set_challenging(true);
        ChallengeGuard { session: self }
    }

    fn set_challenging(&self, value: bool) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .challenging = value;
    }
}

pub(crate) struct ChallengeGuard<'a> {
    session: &'a Session,
}

impl Drop for ChallengeGuard<'_> {
    fn drop(&mut self) {
        self.session.set_challenging(false);
    }
}
