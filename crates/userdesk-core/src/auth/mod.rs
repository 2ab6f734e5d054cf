//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionStore`: persisted token + issue timestamp
//! - `validate_token`: verdict over the stored session (clears it when invalid)
//! - `RouteGuard`: gate in front of every protected route
//!
//! Sessions expire 24 hours after the token was stored. There is no refresh;
//! an expired session means logging in again.

pub mod clock;
pub mod guard;
pub mod store;
pub mod validator;

pub use clock::{Clock, FixedClock, SystemClock};
pub use guard::{GuardDecision, GuardState, Mount, Navigator, Route, RouteGuard};
pub use store::{FileSessionStore, MemorySessionStore, Session, SessionStore};
pub use validator::{check, enforce, validate_token, InvalidReason, Verdict, SESSION_MAX_AGE_MS};
