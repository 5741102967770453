//! Session state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐  NoCredential
//! │  Bootstrapping  │ ──────────────────────────────┐
//! └────────┬────────┘                               │
//!          │ CredentialFound                        ▼
//!          ▼                                 ┌─────────────┐
//! ┌─────────────────────────┐ IdentityRejected│  Anonymous  │◄──┐
//! │ AuthenticatedUnresolved │ ───────────────►└──────┬──────┘   │
//! └────────┬────────────────┘ ◄──────────────────────┘          │
//!          │ IdentityResolved       LoginSucceeded              │
//!          ▼                                                    │
//! ┌─────────────────────────┐  LogoutRequested ┌──────────────┐ │
//! │  AuthenticatedResolved  │ ───────────────► │ Invalidating │─┘
//! └─────────────────────────┘                  └──────────────┘
//!                                              TeardownComplete
//! ```
//!
//! `SessionInvalidated` leads to `Anonymous` from every state.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Bootstrapping)

    Bootstrapping => {
        NoCredential => Anonymous,
        CredentialFound => AuthenticatedUnresolved,
        SessionInvalidated => Anonymous
    },
    Anonymous => {
        LoginSucceeded => AuthenticatedUnresolved,
        LogoutRequested => Invalidating,
        // A broadcast that raced a logout lands here first.
        TeardownComplete => Anonymous,
        SessionInvalidated => Anonymous
    },
    AuthenticatedUnresolved => {
        IdentityResolved => AuthenticatedResolved,
        IdentityRejected => Anonymous,
        IdentityDeferred => AuthenticatedUnresolved,
        LoginSucceeded => AuthenticatedUnresolved,
        LogoutRequested => Invalidating,
        SessionInvalidated => Anonymous
    },
    AuthenticatedResolved => {
        IdentityResolved => AuthenticatedResolved,
        IdentityRejected => Anonymous,
        IdentityDeferred => AuthenticatedResolved,
        LoginSucceeded => AuthenticatedUnresolved,
        LogoutRequested => Invalidating,
        SessionInvalidated => Anonymous
    },
    Invalidating => {
        TeardownComplete => Anonymous,
        SessionInvalidated => Anonymous
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Whether `input` is accepted in `state`, without consuming it.
pub fn accepts(state: &SessionMachineState, input: &SessionMachineInput) -> bool {
    <session_machine::Impl as StateMachineImpl>::transition(state, input).is_some()
}

/// Session state for external consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Resolving the persisted credential after process start.
    Bootstrapping,
    /// No credential.
    Anonymous,
    /// Credential present, identity not (yet) confirmed.
    AuthenticatedUnresolved,
    /// Credential present and identity resolved.
    AuthenticatedResolved,
    /// Logging out.
    Invalidating,
}

impl SessionState {
    /// Returns true if a credential is held.
    pub fn is_authenticated(&self) -> bool {
        matches!(
            self,
            SessionState::AuthenticatedUnresolved | SessionState::AuthenticatedResolved
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Bootstrapping => "bootstrapping",
            SessionState::Anonymous => "anonymous",
            SessionState::AuthenticatedUnresolved => "authenticated_unresolved",
            SessionState::AuthenticatedResolved => "authenticated_resolved",
            SessionState::Invalidating => "invalidating",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&SessionMachineState> for SessionState {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Bootstrapping => SessionState::Bootstrapping,
            SessionMachineState::Anonymous => SessionState::Anonymous,
            SessionMachineState::AuthenticatedUnresolved => SessionState::AuthenticatedUnresolved,
            SessionMachineState::AuthenticatedResolved => SessionState::AuthenticatedResolved,
            SessionMachineState::Invalidating => SessionState::Invalidating,
        }
    }
}

/// Payload for session state change notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStateChanged {
    pub state: SessionState,
    /// Username of the resolved identity, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}
