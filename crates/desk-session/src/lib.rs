//! Authentication session lifecycle for ordersdesk.
//!
//! This crate provides:
//! - An explicit session state machine (`auth_fsm`)
//! - `SessionManager`, which bootstraps from the persisted credential,
//!   logs in and out, and reacts to the pipeline's invalidation broadcast
//! - Login token extraction from heterogeneous response payloads

mod auth_fsm;
mod error;
mod session;
mod token;

pub use auth_fsm::{SessionMachineInput, SessionMachineState, SessionState, SessionStateChanged};
pub use error::{SessionError, SessionResult};
pub use session::{Session, SessionManager, SessionStateCallback, SessionView};
pub use token::extract_login_token;
