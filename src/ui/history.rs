//! History view: metric picker, chart and statistics.

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, List, ListItem, ListState, Paragraph},
    Frame,
};

use vmiwatch_types::{display_label, MetricKind};

use crate::app::App;
use crate::data::{DerivedStatistics, HistoryResult};
use crate::ui::common::block;

/// Render the History view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let [picker, detail] =
        Layout::horizontal([Constraint::Percentage(30), Constraint::Percentage(70)]).areas(area);
    let [chart, stats] = Layout::vertical([Constraint::Min(8), Constraint::Length(4)]).areas(detail);

    render_picker(frame, app, picker);

    let Some(selection) = app.dashboard().history().selection() else {
        let hint = Paragraph::new("Select a metric and press Enter")
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(block(app, " History ".to_string()));
        frame.render_widget(hint, detail);
        return;
    };

    match app.history_result() {
        Some(result) => {
            render_chart(frame, app, &result, chart);
            render_stats(frame, app, &result, stats);
        }
        None => {
            let title = format!(" {} ", selection);
            let loading = Paragraph::new("Loading...")
                .alignment(Alignment::Center)
                .block(block(app, title));
            frame.render_widget(loading, detail);
        }
    }
}

fn render_picker(frame: &mut Frame, app: &App, area: Rect) {
    let active = app.history_selection.as_ref();
    let items: Vec<ListItem> = app
        .choices
        .iter()
        .map(|c| {
            let marker = if active.is_some_and(|(d, m)| d == &c.device_id && m == &c.metric) {
                "● "
            } else {
                "  "
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(app.theme.highlight)),
                Span::raw(format!("{} › {}", c.device_name, display_label(&c.metric))),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block(app, format!(" Metrics ({}) ", app.choices.len())))
        .highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = ListState::default();
    if !app.choices.is_empty() {
        state.select(Some(app.selected_choice_index));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_chart(frame: &mut Frame, app: &App, result: &HistoryResult, area: Rect) {
    let selection = &result.selection;
    let title = format!(
        " {} - {} ({}) ",
        selection.device_id,
        display_label(&selection.metric),
        selection.window
    );

    if result.is_empty() {
        let empty = Paragraph::new("No data in this window")
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(block(app, title));
        frame.render_widget(empty, area);
        return;
    }

    let origin = result.points[0].timestamp;
    let data: Vec<(f64, f64)> = result
        .points
        .iter()
        .map(|p| ((p.timestamp - origin).num_seconds() as f64, p.value))
        .collect();

    let x_max = data.last().map_or(1.0, |(x, _)| x.max(1.0));
    let (y_min, y_max) = result
        .statistics
        .map_or((0.0, 1.0), |s| padded_bounds(s.min, s.max));

    let last = result.points[result.points.len() - 1].timestamp;
    let x_labels = vec![
        origin.format("%d/%m %H:%M").to_string(),
        last.format("%d/%m %H:%M").to_string(),
    ];
    let kind = MetricKind::from_key(&selection.metric);
    let y_labels = vec![kind.format(y_min), kind.format(y_max)];

    let dataset = Dataset::default()
        .name(display_label(&selection.metric))
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(app.theme.chart))
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .block(block(app, title))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(app.theme.border))
                .bounds([0.0, x_max])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(app.theme.border))
                .bounds([y_min, y_max])
                .labels(y_labels),
        );

    frame.render_widget(chart, area);
}

fn render_stats(frame: &mut Frame, app: &App, result: &HistoryResult, area: Rect) {
    let line = match result.statistics {
        Some(stats) => stats_line(&stats),
        None => Line::from(Span::styled(
            "No data available",
            Style::default().add_modifier(Modifier::DIM),
        )),
    };
    frame.render_widget(
        Paragraph::new(line).block(block(app, " Statistics ".to_string())),
        area,
    );
}

fn stats_line(stats: &DerivedStatistics) -> Line<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    Line::from(vec![
        Span::raw(" Min "),
        Span::styled(format!("{:.2}", stats.min), bold),
        Span::raw("   Max "),
        Span::styled(format!("{:.2}", stats.max), bold),
        Span::raw("   Mean "),
        Span::styled(format!("{:.2}", stats.mean), bold),
        Span::raw("   Samples "),
        Span::styled(stats.sample_count.to_string(), bold),
    ])
}

/// Y bounds with a little headroom; a flat series gets a unit band around it.
fn padded_bounds(min: f64, max: f64) -> (f64, f64) {
    if (max - min).abs() < f64::EPSILON {
        return (min - 1.0, max + 1.0);
    }
    let pad = (max - min) * 0.05;
    (min - pad, max + pad)
}
