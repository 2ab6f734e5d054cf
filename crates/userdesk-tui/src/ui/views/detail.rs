use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use userdesk_core::models::User;

use crate::app::App;
use crate::ui::styles;

/// Render the user detail screen
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    if app.selected_user.is_none() && app.loading {
        let block = Block::default()
            .title(" User ")
            .title_style(styles::muted_style())
            .borders(Borders::ALL)
            .border_style(styles::border_style(true));
        let paragraph = Paragraph::new(Span::styled("Loading...", styles::muted_style())).block(block);
        frame.render_widget(paragraph, area);
        return;
    }
    render_card(frame, app.selected_user.as_ref(), area, true);
}

/// Profile card for one user; also used as the list preview
pub fn render_card(frame: &mut Frame, user: Option<&User>, area: Rect, focused: bool) {
    let placeholder = "-";

    let content = match user {
        Some(user) => {
            let avatar = user.avatar.as_deref().unwrap_or(placeholder);
            vec![
                Line::from(Span::styled(user.full_name(), styles::title_style())),
                Line::from(""),
                Line::from(vec![
                    Span::styled("ID:         ", styles::muted_style()),
                    Span::raw(user.id.to_string()),
                ]),
                Line::from(vec![
                    Span::styled("First name: ", styles::muted_style()),
                    Span::raw(user.first_name.as_str()),
                ]),
                Line::from(vec![
                    Span::styled("Last name:  ", styles::muted_style()),
                    Span::raw(user.last_name.as_str()),
                ]),
                Line::from(vec![
                    Span::styled("Email:      ", styles::muted_style()),
                    Span::raw(user.email.as_str()),
                ]),
                Line::from(vec![
                    Span::styled("Avatar:     ", styles::muted_style()),
                    Span::raw(avatar),
                ]),
            ]
        }
        None => vec![Line::from(Span::styled("No user selected", styles::muted_style()))],
    };

    let block = Block::default()
        .title(" User ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
