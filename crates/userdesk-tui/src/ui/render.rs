use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use userdesk_core::auth::Route;
use userdesk_core::utils::truncate_string;

use crate::app::{App, AppState, LoginFocus};

use super::styles;
use super::views::{detail, edit, users};

/// Width of the text inside login form brackets
const LOGIN_FIELD_WIDTH: usize = 24;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Breadcrumb
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_breadcrumb(frame, app, chunks[1]);
    render_main_content(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::ConfirmingQuit => render_confirm_overlay(
            frame,
            "Are you sure you want to quit?",
            " to quit, ",
        ),
        AppState::ConfirmingDelete => {
            let name = app
                .pending_delete
                .as_ref()
                .map(|u| u.full_name())
                .unwrap_or_default();
            let question = format!("Delete {}?", truncate_string(&name, 30));
            render_confirm_overlay(frame, &question, " to delete, ");
        }
        AppState::ConfirmingDiscard => {
            render_confirm_overlay(frame, "Discard unsaved changes?", " to discard, ")
        }
        _ => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  userdesk";
    let help_hint = match app.route() {
        Route::Login => "[Esc] Quit",
        Route::EditUser(_) => "[Esc] Back",
        _ => "[?] Help",
    };

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            area.width
                .saturating_sub(title.len() as u16 + help_hint.len() as u16 + 4)
                as usize,
        )),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

/// Where we are: `Users > page 2 > Janet Weaver > Edit`
fn render_breadcrumb(frame: &mut Frame, app: &App, area: Rect) {
    let separator = Span::styled(" > ", styles::muted_style());
    let current = styles::highlight_style();

    let user_label = |id: u64| {
        app.selected_user
            .as_ref()
            .filter(|u| u.id == id)
            .or_else(|| app.users.iter().find(|u| u.id == id))
            .map(|u| u.full_name())
            .unwrap_or_else(|| format!("User #{}", id))
    };

    let mut spans = vec![Span::raw(" ")];
    match app.route() {
        Route::Login => spans.push(Span::styled("Login", current)),
        Route::Users { page } => {
            spans.push(Span::styled("Users", styles::muted_style()));
            spans.push(separator);
            spans.push(Span::styled(format!("page {}", page), current));
        }
        Route::UserDetail(id) => {
            spans.push(Span::styled("Users", styles::muted_style()));
            spans.push(separator);
            spans.push(Span::styled(user_label(id), current));
        }
        Route::EditUser(id) => {
            spans.push(Span::styled("Users", styles::muted_style()));
            spans.push(separator.clone());
            spans.push(Span::styled(user_label(id), styles::muted_style()));
            spans.push(separator);
            spans.push(Span::styled("Edit", current));
        }
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    let route = app.route();

    // Protected content only renders once the guard has allowed this entry
    if route.is_protected() && !app.guard.allows(route) {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            " Verifying session...",
            styles::muted_style(),
        )));
        frame.render_widget(paragraph, area);
        return;
    }

    match route {
        Route::Login => render_login(frame, app, area),
        Route::Users { .. } => users::render(frame, app, area),
        Route::UserDetail(_) => detail::render(frame, app, area),
        Route::EditUser(_) => edit::render(frame, app, area),
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = match app.route() {
        Route::Login => "[Tab] next field | [Enter] login",
        Route::Users { .. } => "[/] search | [l]ogout | [q]uit",
        Route::UserDetail(_) => "[e]dit | [d]elete | [Esc] back",
        Route::EditUser(_) => "[Tab] next field | [Esc] cancel",
    };

    let (left_text, left_style) = match app.screen.notice {
        Some(ref notice) => (format!(" {} ", notice.text), styles::notice_style(notice.kind)),
        None if app.loading => (" Loading... ".to_string(), styles::muted_style()),
        None => (String::new(), styles::muted_style()),
    };
    let right_text = format!(" {} ", shortcuts);

    let width = area.width as usize;
    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.len());

    let status_line = Line::from(vec![
        Span::styled(left_text, left_style),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 24, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled(
            format!("  userdesk  version {}", version),
            styles::title_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Users list", styles::highlight_style())),
        help_line("↑/↓ j/k", "Move selection"),
        help_line("←/→ [ ]", "Previous/next page"),
        help_line("Enter", "View user"),
        help_line("/", "Search name or email"),
        help_line("i/n/m", "Sort by id/name/email"),
        help_line("r", "Reload page"),
        Line::from(""),
        Line::from(Span::styled(" Users", styles::highlight_style())),
        help_line("e", "Edit user"),
        help_line("d", "Delete user"),
        help_line("Esc", "Go back"),
        Line::from(""),
        Line::from(Span::styled(" Session", styles::highlight_style())),
        help_line("l", "Log out"),
        help_line("q", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

/// One bracketed login field, e.g. `Email:    [eve.holt@reqres.in▌   ]`
fn login_field<'a>(label: &'a str, value: String, focused: bool) -> Line<'a> {
    // Show the tail of long values so the cursor stays visible
    let count = value.chars().count();
    let visible: String = value
        .chars()
        .skip(count.saturating_sub(LOGIN_FIELD_WIDTH))
        .collect();
    let cursor = if focused { "▌" } else { "" };

    Line::from(vec![
        Span::raw("  "),
        Span::styled(label, styles::muted_style()),
        Span::styled("[", styles::muted_style()),
        Span::styled(
            format!("{:<width$}{}", visible, cursor, width = LOGIN_FIELD_WIDTH),
            styles::field_style(focused),
        ),
        Span::styled("]", styles::muted_style()),
    ])
}

fn render_login(frame: &mut Frame, app: &App, area: Rect) {
    // Fixed size dialog - compact
    let height = if app.login_error.is_some() { 11 } else { 9 };
    let dialog = centered_rect_fixed(46, height, area);

    // Clear the area
    frame.render_widget(Clear, dialog);

    let mut lines = vec![
        Line::from(Span::styled("  Sign in", styles::title_style())),
        Line::from(""),
    ];

    lines.push(login_field(
        "Email:    ",
        app.login_email.clone(),
        app.login_focus == LoginFocus::Email,
    ));
    lines.push(login_field(
        "Password: ",
        "*".repeat(app.login_password.chars().count()),
        app.login_focus == LoginFocus::Password,
    ));

    // Login button (centered)
    let button_focused = app.login_focus == LoginFocus::Button;
    let label = if app.login_in_flight {
        " Logging in "
    } else if button_focused {
        " ▶ Login ◀  "
    } else {
        "   Login    "
    };
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("               ["),
        Span::styled(label, styles::field_style(button_focused)),
        Span::raw("]"),
    ]));

    // Error message
    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("  {}", truncate_string(error, 40)),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), dialog);
}

/// Create a centered rectangle with fixed dimensions
pub fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

/// Yes/no dialog shared by quit, delete and discard
fn render_confirm_overlay(frame: &mut Frame, question: &str, yes_action: &'static str) {
    let area = centered_rect_fixed(46, 7, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(format!("   {}", question), styles::highlight_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(yes_action, styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
