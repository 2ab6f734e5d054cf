//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes. Overlays (help, confirmations, search) take
//! keys first; otherwise the current route decides.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use userdesk_core::auth::Route;

use crate::app::{
    can_add_email_char, can_add_password_char, App, AppState, EditFocus, LoginFocus,
    UserSortColumn, PAGE_SCROLL_SIZE,
};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Handle help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.quit();
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    // Handle delete confirmation
    if matches!(app.state, AppState::ConfirmingDelete) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_delete(),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_delete(),
            _ => {}
        }
        return Ok(false);
    }

    // Handle unsaved-changes confirmation
    if matches!(app.state, AppState::ConfirmingDiscard) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.back_to_list(),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    // Handle search mode
    if matches!(app.state, AppState::Searching) {
        return handle_search_input(app, key);
    }

    match app.route() {
        Route::Login => handle_login_input(app, key),
        // Text entry owns the keyboard on the edit screen
        Route::EditUser(_) => handle_edit_input(app, key),
        route => {
            if handle_global_keys(app, key) {
                return Ok(false);
            }
            match route {
                Route::Users { .. } => handle_users_input(app, key),
                Route::UserDetail(_) => handle_detail_input(app, key),
                _ => {}
            }
            Ok(false)
        }
    }
}

/// Keys shared by the list and detail screens. Returns true if consumed.
fn handle_global_keys(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Char('l') => app.logout(),
        _ => return false,
    }
    true
}

fn handle_search_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Normal;
            app.search_query.clear();
            app.user_selection = 0;
        }
        KeyCode::Enter => {
            app.state = AppState::Normal;
            // Keep search query active
        }
        KeyCode::Backspace => {
            app.search_query.pop();
            app.user_selection = 0;
        }
        KeyCode::Char(c) => {
            app.search_query.push(c);
            // Reset selection when search changes
            app.user_selection = 0;
        }
        _ => {}
    }
    Ok(false)
}

fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Ignore edits while a login request is out
    if app.login_in_flight && key.code != KeyCode::Esc {
        return Ok(false);
    }

    match key.code {
        KeyCode::Esc => {
            // Quit if on login screen
            app.quit();
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            // Move to next field
            app.login_focus = match app.login_focus {
                LoginFocus::Email => LoginFocus::Password,
                LoginFocus::Password => LoginFocus::Button,
                LoginFocus::Button => LoginFocus::Email,
            };
        }
        KeyCode::Up | KeyCode::BackTab => {
            // Move to previous field
            app.login_focus = match app.login_focus {
                LoginFocus::Email => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::Email,
                LoginFocus::Button => LoginFocus::Password,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Email => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => app.attempt_login(),
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Email => {
                app.login_email.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Email => {
                if can_add_email_char(app.login_email.chars().count(), c) {
                    app.login_email.push(c);
                    app.login_error = None;
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                    app.login_error = None;
                }
            }
            LoginFocus::Button => {
                // Ignore character input on button
            }
        },
        _ => {}
    }
    Ok(false)
}

fn handle_users_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(1),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(1),
        KeyCode::PageUp => app.select_prev(PAGE_SCROLL_SIZE),
        KeyCode::PageDown => app.select_next(PAGE_SCROLL_SIZE),
        KeyCode::Home => app.user_selection = 0,
        KeyCode::End => app.select_next(app.users.len()),
        KeyCode::Left | KeyCode::Char('[') => app.prev_page(),
        KeyCode::Right | KeyCode::Char(']') => app.next_page(),
        KeyCode::Char('/') => {
            app.state = AppState::Searching;
        }
        KeyCode::Char('i') => app.toggle_sort(UserSortColumn::Id),
        KeyCode::Char('n') => app.toggle_sort(UserSortColumn::Name),
        KeyCode::Char('m') => app.toggle_sort(UserSortColumn::Email),
        KeyCode::Char('r') => app.navigate(Route::Users { page: app.page }),
        KeyCode::Enter => {
            if let Some(id) = app.highlighted_user().map(|u| u.id) {
                app.navigate(Route::UserDetail(id));
            }
        }
        KeyCode::Char('e') => {
            if let Some(id) = app.highlighted_user().map(|u| u.id) {
                app.navigate(Route::EditUser(id));
            }
        }
        KeyCode::Char('d') => {
            if let Some(user) = app.focused_user() {
                app.request_delete(user);
            }
        }
        KeyCode::Esc => {
            // Clear an applied search
            if !app.search_query.is_empty() {
                app.search_query.clear();
                app.user_selection = 0;
            }
        }
        _ => {}
    }
}

fn handle_detail_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Backspace => app.back_to_list(),
        KeyCode::Char('e') => {
            if let Route::UserDetail(id) = app.route() {
                app.navigate(Route::EditUser(id));
            }
        }
        KeyCode::Char('d') => {
            if let Some(user) = app.focused_user() {
                app.request_delete(user);
            }
        }
        _ => {}
    }
}

fn handle_edit_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    if key.code == KeyCode::Esc {
        app.cancel_edit();
        return Ok(false);
    }

    let Some(form) = app.edit_form.as_mut() else {
        return Ok(false);
    };

    match key.code {
        KeyCode::Down | KeyCode::Tab => form.focus = form.focus.next(),
        KeyCode::Up | KeyCode::BackTab => form.focus = form.focus.prev(),
        KeyCode::Enter => {
            if form.focus == EditFocus::Save {
                app.save_edit();
            } else {
                form.focus = form.focus.next();
            }
        }
        KeyCode::Backspace => form.backspace(),
        KeyCode::Char(c) => form.push_char(c),
        _ => {}
    }
    Ok(false)
}
