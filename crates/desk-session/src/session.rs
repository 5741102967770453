//! Session management around the session FSM.
//!
//! [`SessionManager`] owns the in-memory session (credential, resolved
//! identity, bootstrapping flag) and drives it from four kinds of events:
//! process start ([`SessionManager::init`]), user intents (login, logout,
//! refresh), identity-resolution responses, and the pipeline's
//! session-invalidated broadcast.
//!
//! Every transition happens under one lock with no `.await` inside, so no
//! observer sees a half-applied session. Resolution responses are checked
//! against the credential they were issued for and dropped when it changed
//! in the meantime.

use crate::auth_fsm::{
    accepts, SessionMachine, SessionMachineInput, SessionState, SessionStateChanged,
};
use crate::token::extract_login_token;
use crate::{SessionError, SessionResult};
use desk_api::{
    ApiEnvelope, ApiResult, AuthApi, ErrorKind, LoginParams, RequestPipeline, Subscription,
    UserIdentity,
};
use desk_storage::{Credential, CredentialStore};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

/// Callback type for session state change notifications.
pub type SessionStateCallback = Box<dyn Fn(SessionStateChanged) + Send + Sync>;

/// Which screen the host should show for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionView {
    Loading,
    Login,
    Dashboard,
}

/// Snapshot of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub state: SessionState,
    pub credential: Option<Credential>,
    pub identity: Option<UserIdentity>,
    pub bootstrapping: bool,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    pub fn view(&self) -> SessionView {
        if self.bootstrapping {
            SessionView::Loading
        } else if self.credential.is_some() {
            SessionView::Dashboard
        } else {
            SessionView::Login
        }
    }
}

/// Outcome of one identity-resolution attempt.
#[derive(Debug)]
enum Resolution {
    Resolved(UserIdentity),
    /// Credential must be discarded.
    Rejected(String),
    /// Credential kept, identity unchanged.
    Deferred(String),
}

fn classify_resolution(result: ApiResult<ApiEnvelope<UserIdentity>>) -> Resolution {
    match result {
        Ok(envelope) if envelope.is_success() => match envelope.data {
            Some(identity) => Resolution::Resolved(identity),
            None => Resolution::Deferred("identity payload missing".to_string()),
        },
        Ok(envelope) if envelope.is_business_unauthorized() => {
            Resolution::Rejected(format!("business unauthorized: {}", envelope.message))
        }
        Ok(envelope) => Resolution::Deferred(format!(
            "business code {}: {}",
            envelope.code, envelope.message
        )),
        Err(e) => match e.kind() {
            ErrorKind::Unauthorized
            | ErrorKind::Forbidden
            | ErrorKind::BadRequest
            | ErrorKind::TransientNetwork => Resolution::Rejected(e.to_string()),
            _ => Resolution::Deferred(e.to_string()),
        },
    }
}

struct SessionCore {
    fsm: SessionMachine,
    credential: Option<Credential>,
    identity: Option<UserIdentity>,
    bootstrapping: bool,
    initialized: bool,
}

impl SessionCore {
    fn state(&self) -> SessionState {
        SessionState::from(self.fsm.state())
    }

    fn snapshot(&self) -> Session {
        Session {
            state: self.state(),
            credential: self.credential.clone(),
            identity: self.identity.clone(),
            bootstrapping: self.bootstrapping,
        }
    }
}

struct SessionInner {
    auth: AuthApi,
    credentials: Arc<CredentialStore>,
    core: Mutex<SessionCore>,
    state_callback: Mutex<Option<Arc<dyn Fn(SessionStateChanged) + Send + Sync>>>,
}

/// Transition guard: only apply when the in-memory credential still equals
/// the one a request was issued with.
enum Guard<'a> {
    None,
    CurrentCredential(&'a Credential),
}

impl SessionInner {
    /// Apply `input` and `mutate` atomically.
    ///
    /// Returns `Ok(None)` when the guard discarded the event as stale.
    fn transition<F>(
        &self,
        input: SessionMachineInput,
        guard: Guard<'_>,
        mutate: F,
    ) -> SessionResult<Option<SessionState>>
    where
        F: FnOnce(&mut SessionCore) -> SessionResult<()>,
    {
        let (old_state, new_state, username) = {
            let mut core = self.core.lock();

            if let Guard::CurrentCredential(captured) = guard {
                if core.credential.as_ref() != Some(captured) {
                    debug!(input = ?input, "Discarding stale session event");
                    return Ok(None);
                }
            }

            let old_state = core.state();
            if !accepts(core.fsm.state(), &input) {
                return Err(SessionError::InvalidStateTransition(format!(
                    "Cannot apply {:?} in state {:?}",
                    input, old_state
                )));
            }

            mutate(&mut core)?;
            core.fsm.consume(&input).map_err(|_| {
                SessionError::InvalidStateTransition(format!(
                    "Cannot apply {:?} in state {:?}",
                    input, old_state
                ))
            })?;

            if core.credential.is_none() {
                core.identity = None;
            }

            let username = core.identity.as_ref().map(|i| i.username.clone());
            (old_state, core.state(), username)
        };

        if old_state != new_state {
            debug!(
                old_state = %old_state,
                new_state = %new_state,
                "Session state transition"
            );
            self.notify_state_change(new_state, username);
        }

        Ok(Some(new_state))
    }

    /// The callback runs with no lock held, so it may call back into the
    /// manager, including replacing itself.
    fn notify_state_change(&self, state: SessionState, username: Option<String>) {
        let callback = self.state_callback.lock().clone();
        if let Some(callback) = callback {
            callback(SessionStateChanged { state, username });
        }
    }

    fn state(&self) -> SessionState {
        self.core.lock().state()
    }

    fn finish_bootstrap(&self) {
        let mut core = self.core.lock();
        if core.bootstrapping {
            core.bootstrapping = false;
            debug!(state = %core.state(), "Bootstrap finished");
        }
    }

    fn handle_invalidated(&self) {
        match self.transition(SessionMachineInput::SessionInvalidated, Guard::None, |core| {
            core.credential = None;
            Ok(())
        }) {
            Ok(_) => info!("Session invalidated by server, credential dropped"),
            Err(e) => error!(error = %e, "Failed to apply session invalidation"),
        }
    }

    /// Fetch the identity behind `credential` and apply the outcome.
    async fn resolve(&self, credential: Credential, bootstrap: bool) -> SessionState {
        let result = self.auth.info().await;
        let resolution = classify_resolution(result);

        let finishing = |core: &mut SessionCore| {
            if bootstrap {
                core.bootstrapping = false;
            }
        };

        let applied = match resolution {
            Resolution::Resolved(identity) => {
                let username = identity.username.clone();
                let applied = self.transition(
                    SessionMachineInput::IdentityResolved,
                    Guard::CurrentCredential(&credential),
                    |core| {
                        core.identity = Some(identity);
                        finishing(core);
                        Ok(())
                    },
                );
                if matches!(applied, Ok(Some(_))) {
                    info!(username = %username, "Identity resolved");
                }
                applied
            }
            Resolution::Rejected(reason) => {
                let credentials = &self.credentials;
                let applied = self.transition(
                    SessionMachineInput::IdentityRejected,
                    Guard::CurrentCredential(&credential),
                    |core| {
                        if let Err(e) = credentials.clear() {
                            error!(error = %e, "Failed to clear rejected credential");
                        }
                        core.credential = None;
                        finishing(core);
                        Ok(())
                    },
                );
                if matches!(applied, Ok(Some(_))) {
                    warn!(reason = %reason, "Identity resolution rejected, credential cleared");
                }
                applied
            }
            Resolution::Deferred(reason) => {
                let applied = self.transition(
                    SessionMachineInput::IdentityDeferred,
                    Guard::CurrentCredential(&credential),
                    |core| {
                        finishing(core);
                        Ok(())
                    },
                );
                if matches!(applied, Ok(Some(_))) {
                    warn!(reason = %reason, "Identity not resolved, keeping credential");
                }
                applied
            }
        };

        if let Err(e) = applied {
            warn!(error = %e, "Identity resolution result dropped");
        }
        if bootstrap {
            self.finish_bootstrap();
        }
        self.state()
    }
}

/// Session manager for the authentication lifecycle with FSM-based state
/// tracking.
///
/// Registers exactly one session-invalidated handler on the pipeline. It is
/// deregistered when the manager is dropped.
pub struct SessionManager {
    inner: Arc<SessionInner>,
    _invalidation: Subscription,
}

impl SessionManager {
    /// Create a session manager over the given pipeline. The session starts
    /// in `Bootstrapping`; call [`SessionManager::init`] once.
    pub fn new(pipeline: RequestPipeline) -> Self {
        let inner = Arc::new(SessionInner {
            auth: AuthApi::new(pipeline.clone()),
            credentials: pipeline.credentials().clone(),
            core: Mutex::new(SessionCore {
                fsm: SessionMachine::new(),
                credential: None,
                identity: None,
                bootstrapping: true,
                initialized: false,
            }),
            state_callback: Mutex::new(None),
        });

        let weak: Weak<SessionInner> = Arc::downgrade(&inner);
        let subscription = pipeline.on_session_invalidated(move || {
            if let Some(inner) = weak.upgrade() {
                inner.handle_invalidated();
            }
        });

        Self {
            inner,
            _invalidation: subscription,
        }
    }

    /// Set a callback to be notified of session state changes.
    pub fn set_state_callback(&self, callback: SessionStateCallback) {
        *self.inner.state_callback.lock() = Some(Arc::from(callback));
    }

    /// Current FSM state.
    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    /// Snapshot of the whole session.
    pub fn session(&self) -> Session {
        self.inner.core.lock().snapshot()
    }

    pub fn is_bootstrapping(&self) -> bool {
        self.inner.core.lock().bootstrapping
    }

    pub fn identity(&self) -> Option<UserIdentity> {
        self.inner.core.lock().identity.clone()
    }

    /// Resolve the persisted credential after process start.
    ///
    /// Without a credential the session becomes `Anonymous` immediately.
    /// Otherwise it becomes `AuthenticatedUnresolved` and the identity is
    /// fetched. `bootstrapping` is false once this returns, whatever the
    /// outcome. Calling it a second time is an error.
    pub async fn init(&self) -> SessionResult<SessionState> {
        {
            let mut core = self.inner.core.lock();
            if core.initialized {
                return Err(SessionError::InvalidStateTransition(
                    "session already initialized".to_string(),
                ));
            }
            core.initialized = true;
        }

        let credential = match self.inner.credentials.read() {
            Ok(credential) => credential,
            Err(e) => {
                error!(error = %e, "Failed to read persisted credential, starting anonymous");
                None
            }
        };

        let Some(credential) = credential else {
            info!("No persisted credential found on startup");
            let applied = self.inner.transition(
                SessionMachineInput::NoCredential,
                Guard::None,
                |core| {
                    core.credential = None;
                    core.bootstrapping = false;
                    Ok(())
                },
            );
            self.inner.finish_bootstrap();
            applied?;
            return Ok(self.state());
        };

        let found = credential.clone();
        let applied = self.inner.transition(
            SessionMachineInput::CredentialFound,
            Guard::None,
            move |core| {
                core.credential = Some(found);
                Ok(())
            },
        );
        if let Err(e) = applied {
            // A broadcast may have moved the session on already.
            warn!(error = %e, "Persisted credential not applied");
            self.inner.finish_bootstrap();
            return Ok(self.state());
        }

        info!("Persisted credential found, resolving identity");
        Ok(self.inner.resolve(credential, true).await)
    }

    /// Log in and resolve the new identity.
    ///
    /// On any failure the session is left as it was and the error carries a
    /// user-visible message.
    pub async fn login(&self, username: &str, password: &str) -> SessionResult<SessionState> {
        let username = username.trim();
        if username.is_empty() || password.trim().is_empty() {
            return Err(SessionError::MissingCredentials);
        }

        {
            let core = self.inner.core.lock();
            if !accepts(core.fsm.state(), &SessionMachineInput::LoginSucceeded) {
                return Err(SessionError::InvalidStateTransition(format!(
                    "Cannot log in while {}",
                    core.state()
                )));
            }
        }

        let params = LoginParams {
            username: username.to_string(),
            password: password.to_string(),
        };

        debug!(username = %username, "Submitting login");
        let envelope = self.inner.auth.login(&params).await?;

        if !envelope.is_success() {
            let message = if envelope.message.trim().is_empty() {
                "login failed".to_string()
            } else {
                envelope.message
            };
            warn!(username = %username, code = envelope.code, "Login rejected");
            return Err(SessionError::LoginRejected(message));
        }

        let Some(data) = envelope.data else {
            warn!(username = %username, "Login succeeded without a token");
            return Err(SessionError::LoginRejected("login failed".to_string()));
        };

        let credential = extract_login_token(&data)
            .and_then(Credential::parse)
            .ok_or_else(|| {
                warn!(username = %username, "Login returned an unusable token");
                SessionError::InvalidTokenFormat
            })?;

        let credentials = &self.inner.credentials;
        let stored = credential.clone();
        self.inner.transition(
            SessionMachineInput::LoginSucceeded,
            Guard::None,
            move |core| {
                credentials.write(&stored)?;
                core.credential = Some(stored);
                core.identity = None;
                Ok(())
            },
        )?;

        info!(username = %username, "Login succeeded");
        Ok(self.inner.resolve(credential, false).await)
    }

    /// Log out locally, telling the server on a best-effort basis.
    ///
    /// Always ends `Anonymous` with the credential cleared. Calling it while
    /// already anonymous is a no-op.
    pub async fn logout(&self) -> SessionResult<SessionState> {
        let mut had_credential = false;
        self.inner.transition(
            SessionMachineInput::LogoutRequested,
            Guard::None,
            |core| {
                had_credential = core.credential.take().is_some();
                Ok(())
            },
        )?;

        let persisted = match self.inner.credentials.read() {
            Ok(credential) => credential.is_some(),
            Err(e) => {
                warn!(error = %e, "Failed to read credential during logout");
                false
            }
        };

        if had_credential || persisted {
            match self.inner.auth.logout().await {
                Ok(envelope) if envelope.is_success() => debug!("Remote logout acknowledged"),
                Ok(envelope) => warn!(
                    code = envelope.code,
                    message = %envelope.message,
                    "Remote logout rejected, continuing local logout"
                ),
                Err(e) => warn!(error = %e, "Remote logout failed, continuing local logout"),
            }
        } else {
            debug!("No credential held, skipping remote logout");
        }

        if let Err(e) = self.inner.credentials.clear() {
            error!(error = %e, "Failed to clear credential during logout");
        }

        self.inner.transition(
            SessionMachineInput::TeardownComplete,
            Guard::None,
            |core| {
                core.credential = None;
                Ok(())
            },
        )?;

        info!("Logged out");
        Ok(self.state())
    }

    /// Re-fetch the identity for the current credential, applying the same
    /// rules as the startup resolution.
    pub async fn refresh_identity(&self) -> SessionResult<SessionState> {
        let credential = {
            let core = self.inner.core.lock();
            match (&core.credential, core.state().is_authenticated()) {
                (Some(credential), true) => credential.clone(),
                _ => {
                    return Err(SessionError::InvalidStateTransition(format!(
                        "Cannot refresh identity while {}",
                        core.state()
                    )))
                }
            }
        };

        Ok(self.inner.resolve(credential, false).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desk_api::{ApiError, FailureClassification};
    use serde_json::json;

    fn identity() -> UserIdentity {
        serde_json::from_value(json!({ "id": 1, "username": "admin", "status": 1 })).unwrap()
    }

    fn envelope(code: i64, data: Option<UserIdentity>) -> ApiEnvelope<UserIdentity> {
        ApiEnvelope {
            code,
            message: "msg".to_string(),
            data,
        }
    }

    fn status(code: u16) -> ApiError {
        ApiError::Status {
            status: code,
            classification: FailureClassification::from_status(code),
            body_summary: String::new(),
        }
    }

    #[test]
    fn test_classify_success() {
        assert!(matches!(
            classify_resolution(Ok(envelope(200, Some(identity())))),
            Resolution::Resolved(_)
        ));
        assert!(matches!(
            classify_resolution(Ok(envelope(200, None))),
            Resolution::Deferred(_)
        ));
    }

    #[test]
    fn test_classify_business_codes() {
        assert!(matches!(
            classify_resolution(Ok(envelope(401, None))),
            Resolution::Rejected(_)
        ));
        assert!(matches!(
            classify_resolution(Ok(envelope(500, None))),
            Resolution::Deferred(_)
        ));
    }

    #[test]
    fn test_classify_http_failures() {
        for code in [400, 401, 403] {
            assert!(matches!(
                classify_resolution(Err(status(code))),
                Resolution::Rejected(_)
            ));
        }
        assert!(matches!(
            classify_resolution(Err(status(502))),
            Resolution::Deferred(_)
        ));
        assert!(matches!(
            classify_resolution(Err(ApiError::MalformedResponse("x".to_string()))),
            Resolution::Deferred(_)
        ));
    }

    #[test]
    fn test_session_view() {
        let mut session = Session {
            state: SessionState::Bootstrapping,
            credential: None,
            identity: None,
            bootstrapping: true,
        };
        assert_eq!(session.view(), SessionView::Loading);

        session.bootstrapping = false;
        session.state = SessionState::Anonymous;
        assert_eq!(session.view(), SessionView::Login);

        session.credential = Credential::parse("abc");
        session.state = SessionState::AuthenticatedUnresolved;
        assert_eq!(session.view(), SessionView::Dashboard);
    }
}
