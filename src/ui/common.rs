//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, status bar, and the help
//! and cleanup confirmation overlays.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs},
    Frame,
};

use crate::app::{App, View};
use crate::data::duration::format_age;

/// Render the header bar with the gateway link indicator.
///
/// Displays: link status, device count, snapshot age.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let status = app.dashboard().health().status();
    let view = &app.view;

    let mut spans = vec![
        Span::styled(" ● ", app.theme.link_style(status)),
        Span::styled("VMI WATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(status.label(), app.theme.link_style(status)),
        Span::raw(" │ "),
        Span::styled(
            format!("{}", view.len()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" devices"),
    ];

    if let Some(age) = view.age() {
        let age_style = if app.dashboard().snapshot_is_stale() {
            app.theme.stale_style()
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        spans.push(Span::raw(" │ "));
        spans.push(Span::styled(format!("updated {} ago", format_age(age)), age_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render the tab bar showing available views.
///
/// Highlights the currently active view.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = [View::Current, View::History, View::Devices]
        .iter()
        .enumerate()
        .map(|(i, v)| Line::from(format!(" {}:{} ", i + 1, v.label())))
        .collect();

    let selected = match app.current_view {
        View::Current => 0,
        View::History => 1,
        View::Devices => 2,
    };

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Render the status bar at the bottom.
///
/// Temporary status messages take precedence over the controls hint.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let controls = match app.current_view {
        View::Current => "↑↓:select Enter:history r:refresh c:cleanup e:export ?:help q:quit",
        View::History => "↑↓:select Enter:load r:refresh Esc:back ?:help q:quit",
        View::Devices => "↑↓:select r:reload Esc:back ?:help q:quit",
    };

    let paragraph = Paragraph::new(format!(" {} | {}", app.current_view.label(), controls))
        .style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(vec![Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )])
    };

    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        section(" Navigation"),
        Line::from("  ←/→ h/l     Switch views"),
        Line::from("  1/2/3       Jump to view"),
        Line::from("  ↑/↓ j/k     Navigate list"),
        Line::from("  PgUp/PgDn   Jump 10 items"),
        Line::from("  Enter       Show history"),
        Line::from("  Esc         Go back"),
        Line::from(""),
        section(" Data"),
        Line::from("  r         Refresh now"),
        Line::from("  c         Delete old readings"),
        Line::from("  e         Export to JSON"),
        Line::from(""),
        section(" General"),
        Line::from("  ?         Toggle help"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let help_area = centered(area, 42, 22);
    frame.render_widget(Clear, help_area);
    frame.render_widget(Paragraph::new(help_text).block(block), help_area);
}

/// Render the cleanup confirmation prompt.
pub fn render_cleanup_confirm(frame: &mut Frame, app: &App, area: Rect) {
    let text = vec![
        Line::from(""),
        Line::from(" Delete old readings on the gateway?"),
        Line::from(""),
        Line::from(vec![
            Span::styled(" y", Style::default().fg(app.theme.critical).add_modifier(Modifier::BOLD)),
            Span::raw(": delete   any other key: cancel"),
        ]),
    ];

    let block = Block::default()
        .title(" Cleanup ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.warning));

    let prompt_area = centered(area, 44, 6);
    frame.render_widget(Clear, prompt_area);
    frame.render_widget(Paragraph::new(text).block(block), prompt_area);
}

/// A centered rectangle of at most `width` x `height`.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

/// A bordered block in the theme's style.
pub fn block(app: &App, title: String) -> Block<'static> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border))
}
