//! Configured devices view.

use ratatui::{
    layout::{Alignment, Constraint, Rect},
    style::{Modifier, Style},
    widgets::{Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::ui::common::block;

/// Render the list of devices known to the gateway.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let devices = app.dashboard().devices();

    if devices.is_empty() {
        let paragraph = Paragraph::new("No configured device.\nPress r to reload.")
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(block(app, " Configured devices ".to_string()));
        frame.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(vec!["Name", "Type", "ID"])
        .height(1)
        .style(app.theme.header);

    let rows: Vec<Row> = devices
        .iter()
        .map(|d| {
            let live = app.view.get(&d.id).is_some();
            let style = if live {
                Style::default()
            } else {
                Style::default().add_modifier(Modifier::DIM)
            };
            Row::new(vec![d.name.clone(), d.kind.clone(), d.id.clone()]).style(style)
        })
        .collect();

    let widths = [Constraint::Fill(2), Constraint::Fill(1), Constraint::Fill(2)];
    let selected = app.selected_config_index.min(devices.len() - 1);

    let table = Table::new(rows, widths)
        .header(header)
        .block(block(app, format!(" Configured devices ({}) ", devices.len())))
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(selected));
    frame.render_stateful_widget(table, area, &mut state);
}
