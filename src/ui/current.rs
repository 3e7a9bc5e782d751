//! Current values view.
//!
//! One row per device in the snapshot: name, type, last update and every
//! metric formatted with its unit.

use ratatui::{
    layout::{Alignment, Constraint, Rect},
    style::{Modifier, Style},
    widgets::{Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::ui::common::block;

/// Shown instead of an empty table.
const NO_DEVICES: &str = "No device detected.\nCheck the EnOcean link of the gateway.";

/// Render the current values table.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let view = &app.view;

    if view.is_empty() {
        let message = if view.refreshed_at.is_none() {
            "Loading..."
        } else {
            NO_DEVICES
        };
        let paragraph = Paragraph::new(message)
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(block(app, " Devices ".to_string()));
        frame.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(vec!["Device", "Type", "Last update", "Metrics"])
        .height(1)
        .style(app.theme.header);

    let value_style = if app.dashboard().snapshot_is_stale() {
        app.theme.stale_style()
    } else {
        Style::default()
    };

    let rows: Vec<Row> = view
        .snapshot
        .values()
        .map(|state| {
            let metrics = state
                .readings()
                .map(|r| format!("{}: {}", r.label(), r.formatted()))
                .collect::<Vec<_>>()
                .join("  ");

            Row::new(vec![
                Cell::from(state.name.clone()),
                Cell::from(state.kind.clone()),
                Cell::from(state.last_update.format("%Y-%m-%d %H:%M:%S").to_string()),
                Cell::from(if metrics.is_empty() { "-".to_string() } else { metrics })
                    .style(value_style),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(2),
        Constraint::Fill(1),
        Constraint::Length(20),
        Constraint::Fill(5),
    ];

    let selected = app.selected_device_index.min(view.len().saturating_sub(1));
    let title = format!(" Devices ({}) [{}/{}] ", view.len(), selected + 1, view.len());

    let table = Table::new(rows, widths)
        .header(header)
        .block(block(app, title))
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(selected));

    frame.render_stateful_widget(table, area, &mut state);
}
