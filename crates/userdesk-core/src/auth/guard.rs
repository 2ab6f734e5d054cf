//! Route guard for protected screens.
//!
//! Every entry into a route passes through `RouteGuard::enter`. Protected
//! routes are validated synchronously before anything is rendered or fetched:
//!
//! ```text
//! Checking ──valid──▶ Allowed
//!     │
//!     └──invalid──▶ Rejected ──▶ notice + replace(Login)
//! ```
//!
//! Each entry hands out a `Mount` ticket. Work started on behalf of a mount
//! (API calls, mostly) must check `is_current` before applying its result,
//! so nothing lands on a screen the user already left.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use super::clock::Clock;
use super::store::SessionStore;
use super::validator::validate_token;

/// Notice shown when a rejection carries no specific reason.
pub const LOGIN_PROMPT: &str = "Please login to continue";

/// Navigable screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Public entry point
    Login,
    Users { page: u32 },
    UserDetail(u64),
    EditUser(u64),
}

impl Route {
    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Login)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Login => write!(f, "/"),
            Route::Users { page } => write!(f, "/users?page={}", page),
            Route::UserDetail(id) => write!(f, "/users/{}", id),
            Route::EditUser(id) => write!(f, "/edit/{}", id),
        }
    }
}

/// Navigation primitive the guard drives on rejection.
pub trait Navigator {
    /// Show a single user-facing notice.
    fn notify(&mut self, message: &str);

    /// Switch to `route`, replacing the current entry (no way back).
    fn replace(&mut self, route: Route);
}

/// Guard state for the current entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Checking,
    Allowed,
    Rejected,
}

/// Ticket for one entry into a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mount {
    generation: u64,
    route: Route,
}

impl Mount {
    pub fn route(&self) -> Route {
        self.route
    }
}

/// Outcome of entering a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render the requested route.
    Allow(Mount),
    /// Session rejected; the navigator was sent to the login screen, mounted here.
    Redirect(Mount),
}

pub struct RouteGuard {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    state: GuardState,
    generation: u64,
    current: Option<Mount>,
}

impl RouteGuard {
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            state: GuardState::Checking,
            generation: 0,
            current: None,
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    /// The mount currently on screen, if any.
    pub fn current(&self) -> Option<Mount> {
        self.current
    }

    /// True if `mount` is still the live entry.
    pub fn is_current(&self, mount: &Mount) -> bool {
        self.current.as_ref() == Some(mount)
    }

    /// True if `route` is mounted and was allowed.
    pub fn allows(&self, route: Route) -> bool {
        self.state == GuardState::Allowed
            && self.current.map(|m| m.route == route).unwrap_or(false)
    }

    fn mount(&mut self, route: Route) -> Mount {
        self.generation += 1;
        let mount = Mount {
            generation: self.generation,
            route,
        };
        self.current = Some(mount);
        mount
    }

    /// Enter `route`. Protected routes are validated against the session
    /// store; on failure the navigator gets exactly one notice and one
    /// `replace(Route::Login)`.
    pub fn enter(&mut self, route: Route, navigator: &mut dyn Navigator) -> GuardDecision {
        // Invalidate whatever was mounted before
        self.current = None;

        if !route.is_protected() {
            self.state = GuardState::Allowed;
            return GuardDecision::Allow(self.mount(route));
        }

        self.state = GuardState::Checking;
        let verdict = validate_token(self.store.as_ref(), self.clock.now_millis());

        if verdict.is_valid {
            debug!(%route, "Route allowed");
            self.state = GuardState::Allowed;
            return GuardDecision::Allow(self.mount(route));
        }

        self.state = GuardState::Rejected;
        let message = verdict
            .message()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| LOGIN_PROMPT.to_string());
        info!(%route, reason = %message, "Route rejected, redirecting to login");

        navigator.notify(&message);
        navigator.replace(Route::Login);
        GuardDecision::Redirect(self.mount(Route::Login))
    }

    /// Enter `route` and build its content only if the guard allows it.
    pub fn protect<T>(
        &mut self,
        route: Route,
        navigator: &mut dyn Navigator,
        content: impl FnOnce(Mount) -> T,
    ) -> Option<T> {
        match self.enter(route, navigator) {
            GuardDecision::Allow(mount) => Some(content(mount)),
            GuardDecision::Redirect(_) => None,
        }
    }

    /// Drop the current mount; pending results for it become stale.
    pub fn leave(&mut self) {
        self.current = None;
        self.state = GuardState::Checking;
    }
}

// ============================================================================
// Tests
// ============================================================================
