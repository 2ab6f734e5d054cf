//! Application state management for userdesk.
//!
//! This module contains the core `App` struct that owns all UI state, the
//! session store, the route guard and the channel that background API calls
//! report back on.
//!
//! Every screen change goes through `App::navigate`, which asks the route
//! guard first. Background results are tagged with the guard `Mount` that
//! started them and are dropped if the user has navigated away since.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use userdesk_core::api::{user_message, ApiClient};
use userdesk_core::auth::{Clock, GuardDecision, Mount, Navigator, Route, RouteGuard, SessionStore};
use userdesk_core::config::{Config, ENV_EMAIL, ENV_PASSWORD};
use userdesk_core::models::{Credentials, User, UserUpdate, UsersPage};
use userdesk_core::utils::cmp_ignore_case;

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Maximum length for the login email.
const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum length for edit form name fields.
const MAX_NAME_LENGTH: usize = 64;

/// Number of rows to move on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

// ============================================================================
// UI State Types
// ============================================================================

/// Overlay / input mode on top of the current route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    Searching,
    ShowingHelp,
    ConfirmingQuit,
    ConfirmingDelete,
    ConfirmingDiscard,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Email,
    Password,
    Button,
}

/// Edit form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditFocus {
    FirstName,
    LastName,
    Email,
    Save,
}

impl EditFocus {
    pub fn next(&self) -> Self {
        match self {
            EditFocus::FirstName => EditFocus::LastName,
            EditFocus::LastName => EditFocus::Email,
            EditFocus::Email => EditFocus::Save,
            EditFocus::Save => EditFocus::FirstName,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            EditFocus::FirstName => EditFocus::Save,
            EditFocus::LastName => EditFocus::FirstName,
            EditFocus::Email => EditFocus::LastName,
            EditFocus::Save => EditFocus::Email,
        }
    }
}

/// Sort column for the users table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSortColumn {
    Id,
    Name,
    Email,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

/// One-line message shown in the status bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub kind: NoticeKind,
}

/// Navigation half of the app: what is on screen and the current notice.
/// The route guard drives it directly on rejection.
#[derive(Debug)]
pub struct Screen {
    pub route: Route,
    pub notice: Option<Notice>,
}

impl Screen {
    pub fn info(&mut self, text: impl Into<String>) {
        self.set_notice(text, NoticeKind::Info);
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.set_notice(text, NoticeKind::Success);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.set_notice(text, NoticeKind::Error);
    }

    fn set_notice(&mut self, text: impl Into<String>, kind: NoticeKind) {
        self.notice = Some(Notice {
            text: text.into(),
            kind,
        });
    }
}

impl Navigator for Screen {
    fn notify(&mut self, message: &str) {
        self.error(message);
    }

    fn replace(&mut self, route: Route) {
        self.route = route;
    }
}

/// Edit form contents for one user
#[derive(Debug, Clone)]
pub struct EditForm {
    pub user_id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub focus: EditFocus,
    pub loaded: bool,
    pub dirty: bool,
    pub saving: bool,
    pub error: Option<String>,
}

impl EditForm {
    fn loading(user_id: u64) -> Self {
        Self {
            user_id,
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            focus: EditFocus::FirstName,
            loaded: false,
            dirty: false,
            saving: false,
            error: None,
        }
    }

    fn fill(&mut self, user: &User) {
        self.first_name = user.first_name.clone();
        self.last_name = user.last_name.clone();
        self.email = user.email.clone();
        self.loaded = true;
        self.dirty = false;
        self.error = None;
    }

    pub fn to_update(&self) -> UserUpdate {
        UserUpdate {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
        }
    }

    /// The text field under focus, if focus is on a field
    pub fn focused_field_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            EditFocus::FirstName => Some(&mut self.first_name),
            EditFocus::LastName => Some(&mut self.last_name),
            EditFocus::Email => Some(&mut self.email),
            EditFocus::Save => None,
        }
    }

    fn max_len(&self) -> usize {
        match self.focus {
            EditFocus::Email => MAX_EMAIL_LENGTH,
            _ => MAX_NAME_LENGTH,
        }
    }

    /// Type a character into the focused field
    pub fn push_char(&mut self, c: char) {
        let max = self.max_len();
        if !self.loaded || self.saving {
            return;
        }
        if let Some(field) = self.focused_field_mut() {
            if field.chars().count() < max && is_valid_input_char(c) {
                field.push(c);
                self.dirty = true;
                self.error = None;
            }
        }
    }

    pub fn backspace(&mut self) {
        if !self.loaded || self.saving {
            return;
        }
        if let Some(field) = self.focused_field_mut() {
            if field.pop().is_some() {
                self.dirty = true;
                self.error = None;
            }
        }
    }

    /// Save is only offered once something changed
    pub fn can_save(&self) -> bool {
        self.loaded && self.dirty && !self.saving
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Which API call a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListUsers,
    GetUser,
    UpdateUser,
    DeleteUser,
}

/// Results sent from spawned API calls back to the UI loop.
#[derive(Debug)]
pub enum ApiResult {
    LoggedIn { mount: Mount, email: String, token: String },
    LoginFailed { mount: Mount, message: String },
    Users(Mount, UsersPage),
    User(Mount, User),
    Updated(Mount, u64, UserUpdate),
    Deleted(Mount, u64),
    Failed { mount: Mount, op: Operation, message: String },
}

impl ApiResult {
    fn mount(&self) -> &Mount {
        match self {
            ApiResult::LoggedIn { mount, .. }
            | ApiResult::LoginFailed { mount, .. }
            | ApiResult::Users(mount, _)
            | ApiResult::User(mount, _)
            | ApiResult::Updated(mount, _, _)
            | ApiResult::Deleted(mount, _)
            | ApiResult::Failed { mount, .. } => mount,
        }
    }
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    // Core services
    pub config: Config,
    /// Where `config` is written back; None keeps it in memory only
    config_path: Option<PathBuf>,
    pub store: Arc<dyn SessionStore>,
    pub clock: Arc<dyn Clock>,
    pub guard: RouteGuard,
    pub api: ApiClient,

    // Navigation
    pub screen: Screen,
    pub state: AppState,

    // Login form state
    pub login_email: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,
    pub login_in_flight: bool,

    // Users list
    pub users: Vec<User>,
    pub page: u32,
    pub total_pages: u32,
    pub total_users: u32,
    pub loading: bool,
    pub search_query: String,
    pub user_selection: usize,
    pub sort_column: UserSortColumn,
    pub sort_ascending: bool,

    // Detail / edit / delete
    pub selected_user: Option<User>,
    pub edit_form: Option<EditForm>,
    pub pending_delete: Option<User>,

    // Background task channel
    result_rx: mpsc::Receiver<ApiResult>,
    result_tx: mpsc::Sender<ApiResult>,
}

impl App {
    /// Create a new application instance
    pub fn new(config: Config, store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        let api = ApiClient::new(config.api_base_url(), config.api_key())?;
        debug!(base_url = api.base_url(), "API client configured");

        let guard = RouteGuard::new(store.clone(), clock.clone());
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        // Prefill the login form from env vars or config
        let login_email = std::env::var(ENV_EMAIL)
            .ok()
            .or_else(|| config.last_email.clone())
            .unwrap_or_default();
        let login_password = std::env::var(ENV_PASSWORD).unwrap_or_default();

        Ok(Self {
            config,
            config_path: None,
            store,
            clock,
            guard,
            api,

            screen: Screen {
                route: Route::Login,
                notice: None,
            },
            state: AppState::Normal,

            login_email,
            login_password,
            login_focus: LoginFocus::Email,
            login_error: None,
            login_in_flight: false,

            users: Vec::new(),
            page: 1,
            total_pages: 1,
            total_users: 0,
            loading: false,
            search_query: String::new(),
            user_selection: 0,
            sort_column: UserSortColumn::Id,
            sort_ascending: true,

            selected_user: None,
            edit_form: None,
            pending_delete: None,

            result_rx: rx,
            result_tx: tx,
        })
    }

    /// Persist config changes (last login email) to `path`
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    fn save_config(&self) {
        let Some(path) = self.config_path.as_deref() else {
            return;
        };
        if let Err(e) = self.config.save_to(path) {
            warn!(error = %e, "Failed to save config");
        }
    }

    /// Pick the first screen: the users list when a session is stored,
    /// otherwise the login form without a notice.
    pub fn start(&mut self) {
        if self.store.get().is_some() {
            self.navigate(Route::Users { page: 1 });
        } else {
            self.navigate(Route::Login);
        }
    }

    pub fn route(&self) -> Route {
        self.screen.route
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Go to `route`. Protected routes are validated first; a rejected
    /// session lands on the login screen with the reason as a notice.
    pub fn navigate(&mut self, route: Route) {
        self.state = AppState::Normal;

        match self.guard.enter(route, &mut self.screen) {
            GuardDecision::Allow(mount) => {
                self.screen.route = route;
                self.on_enter(mount);
            }
            GuardDecision::Redirect(mount) => {
                self.reset_authenticated_state();
                self.on_enter(mount);
            }
        }
    }

    fn on_enter(&mut self, mount: Mount) {
        match mount.route() {
            Route::Login => self.enter_login(),
            Route::Users { page } => {
                self.page = page.max(1);
                self.edit_form = None;
                self.pending_delete = None;
                self.spawn_list_users(mount, self.page);
            }
            Route::UserDetail(id) => {
                self.edit_form = None;
                // Show the row we already have while the fresh copy loads
                self.selected_user = self.users.iter().find(|u| u.id == id).cloned();
                self.spawn_get_user(mount, id);
            }
            Route::EditUser(id) => {
                self.edit_form = Some(EditForm::loading(id));
                self.spawn_get_user(mount, id);
            }
        }
    }

    fn enter_login(&mut self) {
        self.login_in_flight = false;
        self.login_error = None;
        self.login_focus = if self.login_email.is_empty() {
            LoginFocus::Email
        } else {
            LoginFocus::Password
        };
    }

    /// Forget everything fetched under the old session
    fn reset_authenticated_state(&mut self) {
        self.api.clear_token();
        self.users.clear();
        self.selected_user = None;
        self.edit_form = None;
        self.pending_delete = None;
        self.search_query.clear();
        self.user_selection = 0;
        self.loading = false;
    }

    /// Back to the list page the user came from
    pub fn back_to_list(&mut self) {
        self.navigate(Route::Users { page: self.page });
    }

    pub fn has_prev_page(&self) -> bool {
        self.page > 1
    }

    pub fn has_next_page(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn next_page(&mut self) {
        if self.has_next_page() {
            self.user_selection = 0;
            self.navigate(Route::Users { page: self.page + 1 });
        }
    }

    pub fn prev_page(&mut self) {
        if self.has_prev_page() {
            self.user_selection = 0;
            self.navigate(Route::Users { page: self.page - 1 });
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Submit the login form
    pub fn attempt_login(&mut self) {
        if self.login_in_flight {
            return;
        }

        let email = self.login_email.trim().to_string();
        if email.is_empty() || self.login_password.is_empty() {
            self.login_error = Some("Email and password required".to_string());
            return;
        }

        let Some(mount) = self.guard.current() else {
            warn!("Login submitted without a mounted login screen");
            return;
        };

        self.login_error = None;
        self.login_in_flight = true;
        self.screen.info("Logging in...");

        let credentials = Credentials {
            email: email.clone(),
            password: self.login_password.clone(),
        };
        let api = self.api.with_token(None);
        let tx = self.result_tx.clone();

        tokio::spawn(async move {
            let result = match api.login(&credentials).await {
                Ok(token) => ApiResult::LoggedIn { mount, email, token },
                Err(e) => {
                    error!(error = %e, "Login failed");
                    ApiResult::LoginFailed {
                        mount,
                        message: user_message(&e),
                    }
                }
            };
            Self::send_result(&tx, result).await;
        });
    }

    fn complete_login(&mut self, email: String, token: String) {
        self.login_in_flight = false;

        // Token and timestamp are stored as one write
        if let Err(e) = self.store.set(&token, self.clock.now_millis()) {
            warn!(error = %e, "Failed to save session");
        }
        self.api.set_token(token);

        self.config.last_email = Some(email);
        self.save_config();

        self.login_password.clear();
        info!("Login successful");
        self.navigate(Route::Users { page: 1 });
        // Only announce success if the guard let us in
        if self.still_allowed() {
            self.screen.success("Login successful!");
        }
    }

    /// Stop the UI loop. Results still in flight are dropped as stale.
    pub fn quit(&mut self) {
        self.guard.leave();
        self.state = AppState::Quitting;
    }

    /// Clear the session and return to the login screen
    pub fn logout(&mut self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear session");
        }
        info!("Logged out");
        self.reset_authenticated_state();
        self.navigate(Route::Login);
        self.screen.success("Logged out successfully");
    }

    // =========================================================================
    // Background API calls
    // =========================================================================

    /// Helper to send results, logging any channel errors
    async fn send_result(tx: &mpsc::Sender<ApiResult>, result: ApiResult) {
        if let Err(e) = tx.send(result).await {
            error!(error = %e, "Failed to send API result - channel closed");
        }
    }

    fn failed(mount: Mount, op: Operation, e: &anyhow::Error) -> ApiResult {
        error!(error = %e, ?op, "API call failed");
        ApiResult::Failed {
            mount,
            op,
            message: user_message(e),
        }
    }

    fn spawn_list_users(&mut self, mount: Mount, page: u32) {
        self.loading = true;
        let api = self.api.clone();
        let tx = self.result_tx.clone();

        tokio::spawn(async move {
            let result = match api.list_users(page).await {
                Ok(data) => ApiResult::Users(mount, data),
                Err(e) => Self::failed(mount, Operation::ListUsers, &e),
            };
            Self::send_result(&tx, result).await;
        });
    }

    fn spawn_get_user(&mut self, mount: Mount, id: u64) {
        self.loading = true;
        let api = self.api.clone();
        let tx = self.result_tx.clone();

        tokio::spawn(async move {
            let result = match api.get_user(id).await {
                Ok(user) => ApiResult::User(mount, user),
                Err(e) => Self::failed(mount, Operation::GetUser, &e),
            };
            Self::send_result(&tx, result).await;
        });
    }

    /// Validate and submit the edit form
    pub fn save_edit(&mut self) {
        let Some(mount) = self.guard.current() else {
            return;
        };
        let Some(form) = self.edit_form.as_mut() else {
            return;
        };
        if !form.can_save() {
            return;
        }

        let update = match form.to_update().validated() {
            Ok(update) => update,
            Err(e) => {
                form.error = Some(e.to_string());
                return;
            }
        };

        form.saving = true;
        let id = form.user_id;
        self.screen.info("Saving changes...");

        let api = self.api.clone();
        let tx = self.result_tx.clone();
        tokio::spawn(async move {
            let result = match api.update_user(id, &update).await {
                Ok(()) => ApiResult::Updated(mount, id, update),
                Err(e) => Self::failed(mount, Operation::UpdateUser, &e),
            };
            Self::send_result(&tx, result).await;
        });
    }

    /// Ask before deleting `user`
    pub fn request_delete(&mut self, user: User) {
        self.pending_delete = Some(user);
        self.state = AppState::ConfirmingDelete;
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
        self.state = AppState::Normal;
    }

    /// Delete the user awaiting confirmation
    pub fn confirm_delete(&mut self) {
        self.state = AppState::Normal;
        let Some(user) = self.pending_delete.take() else {
            return;
        };
        let Some(mount) = self.guard.current() else {
            return;
        };

        self.screen.info("Deleting user...");
        let api = self.api.clone();
        let tx = self.result_tx.clone();
        tokio::spawn(async move {
            let result = match api.delete_user(user.id).await {
                Ok(()) => ApiResult::Deleted(mount, user.id),
                Err(e) => Self::failed(mount, Operation::DeleteUser, &e),
            };
            Self::send_result(&tx, result).await;
        });
    }

    /// Leave the edit screen, asking first if there are unsaved changes
    pub fn cancel_edit(&mut self) {
        let dirty = self.edit_form.as_ref().map(|f| f.dirty).unwrap_or(false);
        if dirty {
            self.state = AppState::ConfirmingDiscard;
        } else {
            self.back_to_list();
        }
    }

    // =========================================================================
    // Result processing
    // =========================================================================

    /// Drain finished background calls and apply them
    pub fn check_background_tasks(&mut self) {
        let mut results = Vec::new();
        while let Ok(result) = self.result_rx.try_recv() {
            results.push(result);
        }

        for result in results {
            self.process_result(result);
        }
    }

    /// Apply one result. Results for a screen the user already left are dropped.
    pub fn process_result(&mut self, result: ApiResult) {
        if !self.guard.is_current(result.mount()) {
            debug!(route = %result.mount().route(), "Dropping stale API result");
            return;
        }

        match result {
            ApiResult::LoggedIn { email, token, .. } => self.complete_login(email, token),
            ApiResult::LoginFailed { message, .. } => {
                self.login_in_flight = false;
                self.screen.error(message.clone());
                self.login_error = Some(message);
            }
            ApiResult::Users(_, page) => {
                self.loading = false;
                self.page = page.page.max(1);
                self.total_pages = page.total_pages.max(1);
                self.total_users = page.total;
                self.users = page.data;
                self.clamp_selection();
            }
            ApiResult::User(_, user) => {
                self.loading = false;
                match self.screen.route {
                    Route::EditUser(_) => {
                        if let Some(form) = self.edit_form.as_mut() {
                            form.fill(&user);
                        }
                    }
                    _ => self.selected_user = Some(user),
                }
            }
            ApiResult::Updated(_, id, update) => {
                if let Some(user) = self.users.iter_mut().find(|u| u.id == id) {
                    user.apply(&update);
                }
                if let Some(user) = self.selected_user.as_mut().filter(|u| u.id == id) {
                    user.apply(&update);
                }
                self.back_to_list();
                if self.still_allowed() {
                    self.screen.success("Changes saved successfully");
                }
            }
            ApiResult::Deleted(_, id) => {
                self.users.retain(|u| u.id != id);
                self.total_users = self.total_users.saturating_sub(1);
                self.clamp_selection();
                if matches!(self.screen.route, Route::UserDetail(_)) {
                    self.selected_user = None;
                    self.back_to_list();
                }
                if self.still_allowed() {
                    self.screen.success("User deleted successfully");
                }
            }
            ApiResult::Failed { op, message, .. } => {
                self.loading = false;
                match op {
                    // Nothing to edit without the user; go back like a missing page would
                    Operation::GetUser if matches!(self.screen.route, Route::EditUser(_)) => {
                        self.back_to_list();
                    }
                    Operation::UpdateUser => {
                        if let Some(form) = self.edit_form.as_mut() {
                            form.saving = false;
                        }
                    }
                    _ => {}
                }
                if self.still_allowed() {
                    self.screen.error(message);
                }
            }
        }
    }

    /// False once the guard has bounced us to login; its notice must stay.
    fn still_allowed(&self) -> bool {
        self.guard.allows(self.route())
    }

    // =========================================================================
    // Users list helpers
    // =========================================================================

    /// Users on the current page, filtered by the search query and sorted.
    pub fn visible_users(&self) -> Vec<&User> {
        let query = self.search_query.to_lowercase();
        let mut users: Vec<&User> = self
            .users
            .iter()
            .filter(|u| u.matches_search(&query))
            .collect();

        users.sort_by(|a, b| {
            let cmp = match self.sort_column {
                UserSortColumn::Id => a.id.cmp(&b.id),
                UserSortColumn::Name => cmp_ignore_case(&a.last_name, &b.last_name)
                    .then_with(|| cmp_ignore_case(&a.first_name, &b.first_name))
                    .then_with(|| a.id.cmp(&b.id)),
                UserSortColumn::Email => cmp_ignore_case(&a.email, &b.email),
            };
            if self.sort_ascending {
                cmp
            } else {
                cmp.reverse()
            }
        });

        users
    }

    /// The highlighted row on the users list
    pub fn highlighted_user(&self) -> Option<&User> {
        self.visible_users().get(self.user_selection).copied()
    }

    pub fn clamp_selection(&mut self) {
        let len = self.visible_users().len();
        if len == 0 {
            self.user_selection = 0;
        } else if self.user_selection >= len {
            self.user_selection = len - 1;
        }
    }

    pub fn select_next(&mut self, step: usize) {
        let len = self.visible_users().len();
        if len > 0 {
            self.user_selection = (self.user_selection + step).min(len - 1);
        }
    }

    pub fn select_prev(&mut self, step: usize) {
        self.user_selection = self.user_selection.saturating_sub(step);
    }

    /// Toggle sort column - if already sorting by this column, flip direction;
    /// otherwise switch to this column with ascending=true. Resets selection to 0.
    pub fn toggle_sort(&mut self, column: UserSortColumn) {
        if self.sort_column == column {
            self.sort_ascending = !self.sort_ascending;
        } else {
            self.sort_column = column;
            self.sort_ascending = true;
        }
        self.user_selection = 0;
    }

    /// The user the current screen is about (detail/edit), falling back to
    /// the highlighted list row
    pub fn focused_user(&self) -> Option<User> {
        match self.screen.route {
            Route::UserDetail(_) => self.selected_user.clone(),
            Route::Users { .. } => self.highlighted_user().cloned(),
            _ => None,
        }
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if an email character should be accepted
pub fn can_add_email_char(current_len: usize, c: char) -> bool {
    current_len < MAX_EMAIL_LENGTH && is_valid_input_char(c) && !c.is_whitespace()
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use userdesk_core::auth::{FixedClock, GuardState, MemorySessionStore, SESSION_MAX_AGE_MS};

    const T0: i64 = 1_700_000_000_000;

    fn test_config() -> Config {
        Config {
            // Nothing listens here; spawned calls fail fast and are ignored
            api_base_url: Some("http://127.0.0.1:9/api".to_string()),
            api_key: None,
            last_email: Some("eve.holt@reqres.in".to_string()),
        }
    }

    fn test_app(store: Arc<MemorySessionStore>, clock: Arc<FixedClock>) -> App {
        App::new(test_config(), store, clock).unwrap()
    }

    fn user(id: u64, first: &str, last: &str, email: &str) -> User {
        User {
            id,
            email: email.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            avatar: None,
        }
    }

    fn sample_users() -> Vec<User> {
        vec![
            user(1, "George", "Bluth", "george.bluth@reqres.in"),
            user(2, "Janet", "Weaver", "janet.weaver@reqres.in"),
            user(3, "Emma", "Wong", "emma.wong@reqres.in"),
        ]
    }

    fn logged_in() -> (App, Arc<MemorySessionStore>, Arc<FixedClock>) {
        let store = Arc::new(MemorySessionStore::new());
        store.set("QpwL5tke4Pnpja7X4", T0).unwrap();
        let clock = Arc::new(FixedClock::new(T0 + 1000));
        let app = test_app(store.clone(), clock.clone());
        (app, store, clock)
    }

    fn page(page: u32, total_pages: u32, data: Vec<User>) -> UsersPage {
        UsersPage {
            page,
            per_page: 6,
            total: 12,
            total_pages,
            data,
        }
    }

    // -------------------------------------------------------------------------
    // Guarded navigation
    // -------------------------------------------------------------------------

    #[test]
    fn test_start_without_session_shows_login_quietly() {
        let store = Arc::new(MemorySessionStore::new());
        let mut app = test_app(store, Arc::new(FixedClock::new(T0)));
        app.start();
        assert_eq!(app.route(), Route::Login);
        assert!(app.screen.notice.is_none());
        assert_eq!(app.login_focus, LoginFocus::Password);
    }

    #[test]
    fn test_protected_route_without_session_redirects() {
        let store = Arc::new(MemorySessionStore::new());
        let mut app = test_app(store, Arc::new(FixedClock::new(T0)));

        app.navigate(Route::UserDetail(2));

        assert_eq!(app.route(), Route::Login);
        assert_eq!(app.guard.state(), GuardState::Rejected);
        let notice = app.screen.notice.clone().unwrap();
        assert_eq!(notice.text, "No token found");
        assert_eq!(notice.kind, NoticeKind::Error);
        assert!(!app.loading);
    }

    #[tokio::test]
    async fn test_expired_session_on_page_change() {
        let (mut app, store, clock) = logged_in();
        app.navigate(Route::Users { page: 1 });
        assert_eq!(app.route(), Route::Users { page: 1 });
        let mount = app.guard.current().unwrap();
        app.process_result(ApiResult::Users(mount, page(1, 2, sample_users())));

        clock.advance(SESSION_MAX_AGE_MS);
        app.next_page();

        assert_eq!(app.route(), Route::Login);
        assert!(app.screen.notice.as_ref().unwrap().text.contains("expired"));
        assert!(app.users.is_empty());
        assert_eq!(store.get(), None);
    }

    #[tokio::test]
    async fn test_stale_results_are_dropped() {
        let (mut app, _store, _clock) = logged_in();
        app.navigate(Route::UserDetail(2));
        let detail_mount = app.guard.current().unwrap();

        // User leaves before the detail fetch returns
        app.back_to_list();
        app.process_result(ApiResult::User(
            detail_mount,
            user(2, "Janet", "Weaver", "janet.weaver@reqres.in"),
        ));
        assert!(app.selected_user.is_none());

        // The same goes for a late failure
        app.process_result(ApiResult::Failed {
            mount: detail_mount,
            op: Operation::GetUser,
            message: "User not found".to_string(),
        });
        assert!(app.screen.notice.is_none());
    }

    // -------------------------------------------------------------------------
    // Login / logout
    // -------------------------------------------------------------------------

    #[test]
    fn test_login_requires_both_fields() {
        let store = Arc::new(MemorySessionStore::new());
        let mut app = test_app(store, Arc::new(FixedClock::new(T0)));
        app.start();
        app.login_password.clear();

        app.attempt_login();
        assert_eq!(app.login_error.as_deref(), Some("Email and password required"));
        assert!(!app.login_in_flight);
    }

    #[tokio::test]
    async fn test_login_success_stores_session() {
        let store = Arc::new(MemorySessionStore::new());
        let clock = Arc::new(FixedClock::new(T0));
        let mut app = test_app(store.clone(), clock);
        app.start();
        let mount = app.guard.current().unwrap();
        app.login_password = "cityslicka".to_string();

        app.process_result(ApiResult::LoggedIn {
            mount,
            email: "eve.holt@reqres.in".to_string(),
            token: "QpwL5tke4Pnpja7X4".to_string(),
        });

        let session = store.get().unwrap();
        assert_eq!(session.token, "QpwL5tke4Pnpja7X4");
        assert_eq!(session.issued_at, Some(T0));
        assert_eq!(app.route(), Route::Users { page: 1 });
        assert!(app.login_password.is_empty());
        assert_eq!(app.screen.notice.as_ref().unwrap().text, "Login successful!");
    }

    #[tokio::test]
    async fn test_short_token_from_login_is_rejected() {
        let store = Arc::new(MemorySessionStore::new());
        let mut app = test_app(store.clone(), Arc::new(FixedClock::new(T0)));
        app.start();
        let mount = app.guard.current().unwrap();

        app.process_result(ApiResult::LoggedIn {
            mount,
            email: "eve.holt@reqres.in".to_string(),
            token: "short".to_string(),
        });

        assert_eq!(app.route(), Route::Login);
        assert_eq!(app.screen.notice.as_ref().unwrap().text, "Invalid token format");
        assert_eq!(store.get(), None);
    }

    #[tokio::test]
    async fn test_login_remembers_email() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        let store = Arc::new(MemorySessionStore::new());
        let mut app = test_app(store, Arc::new(FixedClock::new(T0))).with_config_path(path.clone());
        app.start();
        let mount = app.guard.current().unwrap();

        app.process_result(ApiResult::LoggedIn {
            mount,
            email: "janet.weaver@reqres.in".to_string(),
            token: "QpwL5tke4Pnpja7X4".to_string(),
        });

        let saved = Config::load_from(&path).unwrap();
        assert_eq!(saved.last_email.as_deref(), Some("janet.weaver@reqres.in"));
    }

    #[test]
    fn test_login_failure_shows_message() {
        let store = Arc::new(MemorySessionStore::new());
        let mut app = test_app(store, Arc::new(FixedClock::new(T0)));
        app.start();
        let mount = app.guard.current().unwrap();
        app.login_in_flight = true;

        app.process_result(ApiResult::LoginFailed {
            mount,
            message: "user not found".to_string(),
        });
        assert!(!app.login_in_flight);
        assert_eq!(app.login_error.as_deref(), Some("user not found"));
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let (mut app, store, _clock) = logged_in();
        app.navigate(Route::Users { page: 1 });
        app.logout();

        assert_eq!(store.get(), None);
        assert_eq!(app.route(), Route::Login);
        assert_eq!(app.screen.notice.as_ref().unwrap().text, "Logged out successfully");

        // Back into a protected route is refused now
        app.navigate(Route::Users { page: 1 });
        assert_eq!(app.route(), Route::Login);
    }

    // -------------------------------------------------------------------------
    // Users list
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_users_page_and_pagination_bounds() {
        let (mut app, _store, _clock) = logged_in();
        app.navigate(Route::Users { page: 1 });
        let mount = app.guard.current().unwrap();
        app.process_result(ApiResult::Users(mount, page(1, 2, sample_users())));

        assert_eq!(app.users.len(), 3);
        assert_eq!(app.total_pages, 2);
        assert!(!app.loading);

        app.prev_page();
        assert_eq!(app.route(), Route::Users { page: 1 });

        app.next_page();
        assert_eq!(app.route(), Route::Users { page: 2 });
        let mount = app.guard.current().unwrap();
        app.process_result(ApiResult::Users(mount, page(2, 2, sample_users())));
        assert!(app.has_prev_page());
        assert!(!app.has_next_page());

        app.next_page();
        assert_eq!(app.route(), Route::Users { page: 2 });
    }

    #[test]
    fn test_search_filters_name_and_email() {
        let store = Arc::new(MemorySessionStore::new());
        let mut app = test_app(store, Arc::new(FixedClock::new(T0)));
        app.users = sample_users();

        app.search_query = "WEAVER".to_string();
        let visible: Vec<u64> = app.visible_users().iter().map(|u| u.id).collect();
        assert_eq!(visible, vec![2]);

        app.search_query = "emma.wong@".to_string();
        let visible: Vec<u64> = app.visible_users().iter().map(|u| u.id).collect();
        assert_eq!(visible, vec![3]);

        app.search_query = "nobody".to_string();
        assert!(app.visible_users().is_empty());
        app.clamp_selection();
        assert_eq!(app.user_selection, 0);
        assert!(app.highlighted_user().is_none());
    }

    #[test]
    fn test_toggle_sort() {
        let store = Arc::new(MemorySessionStore::new());
        let mut app = test_app(store, Arc::new(FixedClock::new(T0)));
        app.users = sample_users();

        app.toggle_sort(UserSortColumn::Name);
        let names: Vec<&str> = app.visible_users().iter().map(|u| u.last_name.as_str()).collect();
        assert_eq!(names, vec!["Bluth", "Weaver", "Wong"]);

        app.toggle_sort(UserSortColumn::Name);
        assert!(!app.sort_ascending);
        let names: Vec<&str> = app.visible_users().iter().map(|u| u.last_name.as_str()).collect();
        assert_eq!(names, vec!["Wong", "Weaver", "Bluth"]);

        app.toggle_sort(UserSortColumn::Email);
        assert!(app.sort_ascending);
        assert_eq!(app.visible_users()[0].id, 3);
    }

    #[test]
    fn test_selection_bounds() {
        let store = Arc::new(MemorySessionStore::new());
        let mut app = test_app(store, Arc::new(FixedClock::new(T0)));
        app.users = sample_users();

        app.select_next(PAGE_SCROLL_SIZE);
        assert_eq!(app.user_selection, 2);
        app.select_prev(1);
        assert_eq!(app.user_selection, 1);
        app.select_prev(PAGE_SCROLL_SIZE);
        assert_eq!(app.user_selection, 0);
    }

    // -------------------------------------------------------------------------
    // Edit / delete
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_edit_form_dirty_tracking_and_save() {
        let (mut app, _store, _clock) = logged_in();
        app.users = sample_users();
        app.navigate(Route::EditUser(2));
        let mount = app.guard.current().unwrap();

        // Typing before the user loads is ignored
        app.edit_form.as_mut().unwrap().push_char('x');
        assert!(!app.edit_form.as_ref().unwrap().dirty);

        app.process_result(ApiResult::User(
            mount,
            user(2, "Janet", "Weaver", "janet.weaver@reqres.in"),
        ));
        let form = app.edit_form.as_mut().unwrap();
        assert!(form.loaded);
        assert!(!form.can_save());

        form.push_char('!');
        assert!(form.dirty);
        assert_eq!(form.first_name, "Janet!");

        app.process_result(ApiResult::Updated(
            mount,
            2,
            UserUpdate {
                first_name: "Jan".to_string(),
                last_name: "Weaver".to_string(),
                email: "jan@example.com".to_string(),
            },
        ));
        assert_eq!(app.route(), Route::Users { page: 1 });
        assert_eq!(app.users[1].first_name, "Jan");
        assert_eq!(app.screen.notice.as_ref().unwrap().text, "Changes saved successfully");
    }

    #[tokio::test]
    async fn test_edit_validation_error_blocks_save() {
        let (mut app, _store, _clock) = logged_in();
        app.navigate(Route::EditUser(2));
        let mount = app.guard.current().unwrap();
        app.process_result(ApiResult::User(
            mount,
            user(2, "Janet", "Weaver", "janet.weaver@reqres.in"),
        ));

        let form = app.edit_form.as_mut().unwrap();
        form.focus = EditFocus::Email;
        for _ in 0.."janet.weaver@reqres.in".len() {
            form.backspace();
        }
        form.push_char('x');

        app.save_edit();
        let form = app.edit_form.as_ref().unwrap();
        assert_eq!(form.error.as_deref(), Some("Enter a valid email address"));
        assert!(!form.saving);
    }

    #[tokio::test]
    async fn test_cancel_dirty_edit_asks_first() {
        let (mut app, _store, _clock) = logged_in();
        app.navigate(Route::EditUser(2));
        let mount = app.guard.current().unwrap();
        app.process_result(ApiResult::User(
            mount,
            user(2, "Janet", "Weaver", "janet.weaver@reqres.in"),
        ));

        app.edit_form.as_mut().unwrap().push_char('a');
        app.cancel_edit();
        assert_eq!(app.state, AppState::ConfirmingDiscard);
        assert_eq!(app.route(), Route::EditUser(2));
    }

    #[tokio::test]
    async fn test_edit_load_failure_returns_to_list() {
        let (mut app, _store, _clock) = logged_in();
        app.navigate(Route::EditUser(99));
        let mount = app.guard.current().unwrap();

        app.process_result(ApiResult::Failed {
            mount,
            op: Operation::GetUser,
            message: "User not found".to_string(),
        });
        assert_eq!(app.route(), Route::Users { page: 1 });
        assert_eq!(app.screen.notice.as_ref().unwrap().text, "User not found");
    }

    #[tokio::test]
    async fn test_delete_from_detail_returns_to_list() {
        let (mut app, _store, _clock) = logged_in();
        app.users = sample_users();
        app.total_users = 3;
        app.navigate(Route::UserDetail(3));
        assert_eq!(app.selected_user.as_ref().map(|u| u.id), Some(3));
        let mount = app.guard.current().unwrap();

        app.process_result(ApiResult::Deleted(mount, 3));
        assert_eq!(app.route(), Route::Users { page: 1 });
        assert!(app.users.iter().all(|u| u.id != 3));
        assert_eq!(app.total_users, 2);
        assert_eq!(app.screen.notice.as_ref().unwrap().text, "User deleted successfully");
    }

    #[tokio::test]
    async fn test_save_after_expiry_keeps_expired_notice() {
        let (mut app, store, clock) = logged_in();
        app.navigate(Route::EditUser(2));
        let mount = app.guard.current().unwrap();

        clock.advance(SESSION_MAX_AGE_MS + 1);
        app.process_result(ApiResult::Updated(
            mount,
            2,
            UserUpdate {
                first_name: "Jan".to_string(),
                last_name: "Weaver".to_string(),
                email: "jan@example.com".to_string(),
            },
        ));

        assert_eq!(app.route(), Route::Login);
        let notice = app.screen.notice.clone().unwrap();
        assert_eq!(notice.text, "Session expired. Please login again");
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(store.get(), None);
    }

    #[tokio::test]
    async fn test_delete_after_expiry_keeps_expired_notice() {
        let (mut app, store, clock) = logged_in();
        app.users = sample_users();
        app.navigate(Route::UserDetail(3));
        let mount = app.guard.current().unwrap();

        clock.advance(SESSION_MAX_AGE_MS + 1);
        app.process_result(ApiResult::Deleted(mount, 3));

        assert_eq!(app.route(), Route::Login);
        assert_eq!(
            app.screen.notice.as_ref().unwrap().text,
            "Session expired. Please login again"
        );
        assert_eq!(store.get(), None);
    }

    #[tokio::test]
    async fn test_edit_load_failure_after_expiry_keeps_expired_notice() {
        let (mut app, _store, clock) = logged_in();
        app.navigate(Route::EditUser(99));
        let mount = app.guard.current().unwrap();

        clock.advance(SESSION_MAX_AGE_MS + 1);
        app.process_result(ApiResult::Failed {
            mount,
            op: Operation::GetUser,
            message: "User not found".to_string(),
        });

        assert_eq!(app.route(), Route::Login);
        assert_eq!(
            app.screen.notice.as_ref().unwrap().text,
            "Session expired. Please login again"
        );
    }

    #[test]
    fn test_cancel_delete() {
        let store = Arc::new(MemorySessionStore::new());
        let mut app = test_app(store, Arc::new(FixedClock::new(T0)));
        app.request_delete(user(1, "George", "Bluth", "george.bluth@reqres.in"));
        assert_eq!(app.state, AppState::ConfirmingDelete);
        app.cancel_delete();
        assert_eq!(app.state, AppState::Normal);
        assert!(app.pending_delete.is_none());
    }

    // -------------------------------------------------------------------------
    // Focus / input helpers
    // -------------------------------------------------------------------------

    #[test]
    fn test_edit_focus_cycle() {
        assert_eq!(EditFocus::FirstName.next(), EditFocus::LastName);
        assert_eq!(EditFocus::Save.next(), EditFocus::FirstName); // Wraps around
        assert_eq!(EditFocus::FirstName.prev(), EditFocus::Save);
        assert_eq!(EditFocus::Email.prev(), EditFocus::LastName);
    }

    #[test]
    fn test_can_add_email_char() {
        assert!(can_add_email_char(0, 'a'));
        assert!(can_add_email_char(0, '@'));
        assert!(!can_add_email_char(0, ' '));
        assert!(!can_add_email_char(0, '\n'));
        assert!(!can_add_email_char(MAX_EMAIL_LENGTH, 'a'));
    }

    #[test]
    fn test_can_add_password_char() {
        assert!(can_add_password_char(0, 'a'));
        assert!(can_add_password_char(127, '!'));
        assert!(!can_add_password_char(128, 'a'));
        assert!(!can_add_password_char(0, '\x00'));
        assert!(!can_add_password_char(0, '\r'));
    }
}
