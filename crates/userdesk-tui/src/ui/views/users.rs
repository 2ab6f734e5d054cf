use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::{App, AppState, UserSortColumn};
use crate::ui::styles;
use crate::ui::views::detail;

/// Render the users list - table with sortable columns, search line,
/// pagination footer and a preview of the highlighted user
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // Table
            Constraint::Length(1), // Search / pagination
        ])
        .split(chunks[0]);

    render_table(frame, app, left[0]);
    render_footer(frame, app, left[1]);
    detail::render_card(frame, app.highlighted_user(), chunks[1], false);
}

fn render_table(frame: &mut Frame, app: &App, area: Rect) {
    let visible = app.visible_users();

    // Build header with sort indicators
    let sort_indicator = |col: UserSortColumn| {
        if app.sort_column == col {
            if app.sort_ascending { " ▲" } else { " ▼" }
        } else {
            ""
        }
    };

    let header = Row::new([
        Cell::from(format!("ID{}", sort_indicator(UserSortColumn::Id))),
        Cell::from(format!("Name{}", sort_indicator(UserSortColumn::Name))),
        Cell::from(format!("Email{}", sort_indicator(UserSortColumn::Email))),
    ])
    .style(styles::title_style())
    .height(1);

    let rows: Vec<Row> = visible
        .iter()
        .enumerate()
        .map(|(i, user)| {
            let style = if i == app.user_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            Row::new(vec![
                Cell::from(format!("{:>3}", user.id)),
                Cell::from(user.full_name()),
                Cell::from(user.email.clone()),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(6),
        Constraint::Percentage(35),
        Constraint::Fill(1),
    ];

    let count = if app.search_query.is_empty() {
        format!("{}", app.total_users)
    } else {
        format!("{} of {}", visible.len(), app.users.len())
    };
    let title = format!(" Users ({}) - sort [i]d [n]ame e[m]ail ", count);

    let mut table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(true)),
        )
        .row_highlight_style(styles::selected_style());

    if visible.is_empty() && !app.loading {
        let message = if app.search_query.is_empty() {
            " No users on this page"
        } else {
            " No users match your search"
        };
        table = table.footer(Row::new([Cell::from(Span::styled(message, styles::muted_style()))]));
    }

    let mut state = TableState::default();
    if !visible.is_empty() {
        state.select(Some(app.user_selection));
    }

    frame.render_stateful_widget(table, area, &mut state);
}

/// `Search: foo▌` on the left, `◀ Page 1 of 2 ▶` on the right
fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let searching = app.state == AppState::Searching;
    let search_text = if searching {
        format!(" Search: {}▌", app.search_query)
    } else if !app.search_query.is_empty() {
        format!(" Search: {}  [Esc] clear", app.search_query)
    } else {
        String::new()
    };

    let prev = if app.has_prev_page() { "◀ " } else { "  " };
    let next = if app.has_next_page() { " ▶" } else { "  " };
    let page_text = format!("{}Page {} of {}{} ", prev, app.page, app.total_pages, next);

    let padding = (area.width as usize)
        .saturating_sub(search_text.chars().count())
        .saturating_sub(page_text.chars().count());

    let line = Line::from(vec![
        Span::styled(search_text, styles::search_style()),
        Span::raw(" ".repeat(padding)),
        Span::styled(page_text, styles::muted_style()),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
