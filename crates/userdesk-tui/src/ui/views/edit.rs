use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, EditFocus, EditForm};
use crate::ui::styles;

/// Width of the text inside field brackets
const FIELD_WIDTH: usize = 32;

fn field_line<'a>(label: &'a str, value: &str, focused: bool) -> Line<'a> {
    let count = value.chars().count();
    let visible: String = value.chars().skip(count.saturating_sub(FIELD_WIDTH)).collect();
    let cursor = if focused { "▌" } else { "" };

    Line::from(vec![
        Span::styled(label, styles::muted_style()),
        Span::styled("[", styles::muted_style()),
        Span::styled(
            format!("{:<width$}{}", visible, cursor, width = FIELD_WIDTH),
            styles::field_style(focused),
        ),
        Span::styled("]", styles::muted_style()),
    ])
}

fn form_lines(form: &EditForm) -> Vec<Line<'static>> {
    let mut lines = vec![
        field_line("First name: ", &form.first_name, form.focus == EditFocus::FirstName),
        field_line("Last name:  ", &form.last_name, form.focus == EditFocus::LastName),
        field_line("Email:      ", &form.email, form.focus == EditFocus::Email),
        Line::from(""),
    ];

    let save_focused = form.focus == EditFocus::Save;
    let label = if form.saving {
        " Saving... "
    } else if save_focused {
        " ▶ Save ◀  "
    } else {
        "   Save    "
    };
    let button_style = if form.can_save() || form.saving {
        styles::field_style(save_focused)
    } else {
        styles::muted_style()
    };
    lines.push(Line::from(vec![
        Span::raw("            ["),
        Span::styled(label, button_style),
        Span::raw("]"),
    ]));

    lines.push(Line::from(""));
    if let Some(ref error) = form.error {
        lines.push(Line::from(Span::styled(error.clone(), styles::error_style())));
    } else if form.dirty {
        lines.push(Line::from(Span::styled("Unsaved changes", styles::highlight_style())));
    } else {
        lines.push(Line::from(Span::styled("No changes", styles::muted_style())));
    }

    lines
}

/// Render the edit form
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let content = match app.edit_form {
        Some(ref form) if form.loaded => form_lines(form),
        Some(_) => vec![Line::from(Span::styled("Loading...", styles::muted_style()))],
        None => vec![Line::from(Span::styled("No user selected", styles::muted_style()))],
    };

    let title = match app.edit_form {
        Some(ref form) => format!(" Edit user #{} ", form.user_id),
        None => " Edit user ".to_string(),
    };

    let block = Block::default()
        .title(title)
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(content).block(block), area);
}
