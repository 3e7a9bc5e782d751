//! Application state and navigation logic.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::dashboard::Dashboard;
use crate::data::{HistoryResult, SnapshotView};
use crate::scheduler::Visibility;
use crate::ui::Theme;

/// How long a status message stays on screen.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// The current view/tab in the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Current values of every device in the snapshot.
    Current,
    /// Metric history with chart and statistics.
    History,
    /// Devices configured on the gateway.
    Devices,
}

impl View {
    /// Cycle to the next view.
    pub fn next(self) -> Self {
        match self {
            View::Current => View::History,
            View::History => View::Devices,
            View::Devices => View::Current,
        }
    }

    /// Cycle to the previous view.
    pub fn prev(self) -> Self {
        match self {
            View::Current => View::Devices,
            View::History => View::Current,
            View::Devices => View::History,
        }
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Current => "Current",
            View::History => "History",
            View::Devices => "Devices",
        }
    }
}

/// Results of background actions, delivered back to the UI thread.
#[derive(Debug)]
pub enum Notice {
    Cleanup(bool),
    DevicesLoaded(usize),
}

/// One selectable row of the history picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricChoice {
    pub device_id: String,
    pub device_name: String,
    pub metric: String,
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub current_view: View,
    pub show_help: bool,
    pub show_cleanup_confirm: bool,

    dashboard: Arc<Dashboard>,
    runtime: Handle,
    snapshot_rx: watch::Receiver<Arc<SnapshotView>>,
    notice_tx: mpsc::UnboundedSender<Notice>,
    notice_rx: mpsc::UnboundedReceiver<Notice>,

    /// The snapshot being displayed.
    pub view: Arc<SnapshotView>,
    /// Flattened (device, metric) pairs of the current snapshot.
    pub choices: Vec<MetricChoice>,

    // Navigation state
    pub selected_device_index: usize,
    pub selected_choice_index: usize,
    pub selected_config_index: usize,
    /// The (device, metric) pair whose history is shown.
    pub history_selection: Option<(String, String)>,

    // UI
    pub theme: Theme,
    pub export_path: PathBuf,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create a new App over a started or unstarted dashboard.
    ///
    /// Background work (history queries, cleanup, device loading) is spawned
    /// on `runtime`.
    pub fn new(dashboard: Arc<Dashboard>, runtime: Handle, theme: Theme) -> Self {
        let snapshot_rx = dashboard.snapshots().subscribe();
        let view = snapshot_rx.borrow().clone();
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let mut app = Self {
            running: true,
            current_view: View::Current,
            show_help: false,
            show_cleanup_confirm: false,
            dashboard,
            runtime,
            snapshot_rx,
            notice_tx,
            notice_rx,
            view,
            choices: Vec::new(),
            selected_device_index: 0,
            selected_choice_index: 0,
            selected_config_index: 0,
            history_selection: None,
            theme,
            export_path: PathBuf::from("vmiwatch_export.json"),
            status_message: None,
        };
        app.rebuild_choices();
        app
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        match &self.status_message {
            Some((msg, time)) if time.elapsed() < STATUS_MESSAGE_TTL => Some(msg),
            _ => None,
        }
    }

    /// Pull state published by background tasks.
    ///
    /// Returns true if anything changed and the screen should be redrawn.
    pub fn sync(&mut self) -> bool {
        let mut changed = false;

        if self.snapshot_rx.has_changed().unwrap_or(false) {
            self.view = self.snapshot_rx.borrow_and_update().clone();
            self.rebuild_choices();
            changed = true;
        }

        while let Ok(notice) = self.notice_rx.try_recv() {
            match notice {
                Notice::Cleanup(true) => {
                    self.set_status_message("Old readings removed".to_string())
                }
                Notice::Cleanup(false) => {
                    self.set_status_message("Cleanup failed".to_string())
                }
                Notice::DevicesLoaded(n) => {
                    debug!(devices = n, "device list loaded");
                }
            }
            changed = true;
        }
        changed
    }

    /// Rebuild the history picker after a snapshot change.
    ///
    /// A history selection whose device or metric vanished is cleared.
    fn rebuild_choices(&mut self) {
        self.choices = self
            .view
            .snapshot
            .iter()
            .flat_map(|(id, state)| {
                state.metric_keys().map(move |metric| MetricChoice {
                    device_id: id.clone(),
                    device_name: state.name.clone(),
                    metric: metric.to_string(),
                })
            })
            .collect();

        self.selected_device_index = clamp(self.selected_device_index, self.view.len());
        self.selected_choice_index = clamp(self.selected_choice_index, self.choices.len());

        let vanished = self
            .history_selection
            .as_ref()
            .is_some_and(|(device, metric)| !self.view.has_metric(device, metric));
        if vanished {
            debug!(selection = ?self.history_selection, "selection left the snapshot");
            self.history_selection = None;
            self.dashboard.history().clear();
        }
    }

    /// Result of the current history query, if loaded.
    pub fn history_result(&self) -> Option<Arc<HistoryResult>> {
        self.dashboard.history().current()
    }

    /// Switch to the next view.
    pub fn next_view(&mut self) {
        self.current_view = self.current_view.next();
    }

    /// Switch to the previous view.
    pub fn prev_view(&mut self) {
        self.current_view = self.current_view.prev();
    }

    /// Switch to a specific view.
    pub fn set_view(&mut self, view: View) {
        self.current_view = view;
    }

    /// Move selection down by one item.
    pub fn select_next(&mut self) {
        self.select_next_n(1);
    }

    /// Move selection up by one item.
    pub fn select_prev(&mut self) {
        self.select_prev_n(1);
    }

    /// Move selection down by n items.
    pub fn select_next_n(&mut self, n: usize) {
        let len = self.list_len();
        let index = self.selected_index_mut();
        *index = clamp(*index + n, len);
    }

    /// Move selection up by n items.
    pub fn select_prev_n(&mut self, n: usize) {
        let index = self.selected_index_mut();
        *index = index.saturating_sub(n);
    }

    /// Jump to the first item in the list.
    pub fn select_first(&mut self) {
        *self.selected_index_mut() = 0;
    }

    /// Jump to the last item in the list.
    pub fn select_last(&mut self) {
        let len = self.list_len();
        *self.selected_index_mut() = len.saturating_sub(1);
    }

    fn list_len(&self) -> usize {
        match self.current_view {
            View::Current => self.view.len(),
            View::History => self.choices.len(),
            View::Devices => self.dashboard.devices().len(),
        }
    }

    fn selected_index_mut(&mut self) -> &mut usize {
        match self.current_view {
            View::Current => &mut self.selected_device_index,
            View::History => &mut self.selected_choice_index,
            View::Devices => &mut self.selected_config_index,
        }
    }

    /// Act on the selected row.
    ///
    /// From the current values view this jumps to the history of the
    /// device's first metric; in the history view it runs the query.
    pub fn activate(&mut self) {
        match self.current_view {
            View::Current => {
                let Some(id) = self.view.device_ids.get(self.selected_device_index) else {
                    return;
                };
                if let Some(pos) = self.choices.iter().position(|c| &c.device_id == id) {
                    self.selected_choice_index = pos;
                    self.current_view = View::History;
                    self.query_selected();
                }
            }
            View::History => self.query_selected(),
            View::Devices => {}
        }
    }

    /// Issue a history query for the highlighted metric.
    pub fn query_selected(&mut self) {
        let Some(choice) = self.choices.get(self.selected_choice_index).cloned() else {
            return;
        };
        let selection = self.dashboard.selection(&choice.device_id, &choice.metric);
        let history = self.dashboard.history().clone();
        let ticket = history.select(selection);
        self.history_selection = Some((choice.device_id, choice.metric));
        self.runtime.spawn(async move {
            history.load(ticket).await;
        });
    }

    /// Manual refresh: snapshot through the scheduler, plus the open history query.
    pub fn refresh(&mut self) {
        if !self.dashboard.refresh_now() {
            self.set_status_message("Refresh already in progress".to_string());
        }
        if self.current_view == View::History && self.history_selection.is_some() {
            let history = self.dashboard.history().clone();
            self.runtime.spawn(async move {
                history.refresh().await;
            });
        }
        if self.current_view == View::Devices {
            self.load_devices();
        }
    }

    /// Reload the configured device list in the background.
    pub fn load_devices(&self) {
        let dashboard = self.dashboard.clone();
        let tx = self.notice_tx.clone();
        self.runtime.spawn(async move {
            let devices = dashboard.load_devices().await;
            let _ = tx.send(Notice::DevicesLoaded(devices.len()));
        });
    }

    /// Ask for cleanup confirmation.
    pub fn request_cleanup(&mut self) {
        self.show_cleanup_confirm = true;
    }

    /// Answer the cleanup confirmation.
    pub fn confirm_cleanup(&mut self, confirmed: bool) {
        self.show_cleanup_confirm = false;
        if !confirmed {
            self.set_status_message("Cleanup cancelled".to_string());
            return;
        }
        self.set_status_message("Cleaning up...".to_string());
        let dashboard = self.dashboard.clone();
        let tx = self.notice_tx.clone();
        self.runtime.spawn(async move {
            let acknowledged = dashboard.cleanup().await;
            let _ = tx.send(Notice::Cleanup(acknowledged));
        });
    }

    /// Export the current state to [`App::export_path`].
    pub fn export(&mut self) {
        let message = match self.dashboard.export_report(&self.export_path) {
            Ok(()) => format!("Exported to {}", self.export_path.display()),
            Err(e) => format!("Export failed: {}", e),
        };
        self.set_status_message(message);
    }

    /// Terminal focus changes stand in for page visibility.
    pub fn set_focus(&mut self, focused: bool) {
        let visibility = if focused {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
        self.dashboard.set_visibility(visibility);
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Navigate back: close overlays first, then return to the current values view.
    pub fn go_back(&mut self) {
        if self.show_help {
            self.show_help = false;
        } else if self.show_cleanup_confirm {
            self.confirm_cleanup(false);
        } else {
            self.current_view = View::Current;
        }
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }
}

fn clamp(index: usize, len: usize) -> usize {
    index.min(len.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{MockReply, MockTransport};
    use crate::client::BackendClient;
    use crate::dashboard::DashboardOptions;
    use serde_json::json;

    fn device(metrics: serde_json::Value) -> serde_json::Value {
        json!({"name": "VMI", "type": "vmi", "last_update": "2024-05-01T12:00:00", "metrics": metrics})
    }

    fn app_with(mock: &Arc<MockTransport>) -> App {
        let dashboard = Dashboard::new(BackendClient::new(mock.clone()), DashboardOptions::default());
        App::new(Arc::new(dashboard), Handle::current(), Theme::dark())
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_view_cycle() {
        assert_eq!(View::Current.next(), View::History);
        assert_eq!(View::Devices.next(), View::Current);
        assert_eq!(View::Current.prev(), View::Devices);
    }

    #[tokio::test]
    async fn test_choices_follow_snapshot() {
        let mock = Arc::new(MockTransport::new());
        mock.reply("/api/current", MockReply::Json(json!({"V": device(json!({"co2": 600, "humidity": 50}))})));
        let mut app = app_with(&mock);

        app.dashboard().snapshots().refresh().await;
        assert!(app.sync());
        assert_eq!(app.choices.len(), 2);
        assert_eq!(app.choices[0].metric, "co2");
        assert!(!app.sync());
    }

    #[tokio::test]
    async fn test_vanished_selection_is_cleared() {
        let mock = Arc::new(MockTransport::new());
        mock.push("/api/current", MockReply::Json(json!({"V": device(json!({"co2": 600}))})));
        mock.push("/api/current", MockReply::Json(json!({"V": device(json!({"humidity": 50}))})));
        mock.reply("/api/reading/V/co2", MockReply::Json(json!([])));
        let mut app = app_with(&mock);

        app.dashboard().snapshots().refresh().await;
        app.sync();
        app.set_view(View::History);
        app.activate();
        settle().await;
        assert_eq!(app.history_selection, Some(("V".to_string(), "co2".to_string())));
        assert!(app.history_result().is_some());

        app.dashboard().snapshots().refresh().await;
        app.sync();
        assert!(app.history_selection.is_none());
        assert!(app.dashboard().history().selection().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_requires_confirmation() {
        let mock = Arc::new(MockTransport::new());
        mock.reply("/api/cleanup", MockReply::Raw(Vec::new()));
        let mut app = app_with(&mock);

        app.request_cleanup();
        assert!(app.show_cleanup_confirm);
        app.confirm_cleanup(false);
        settle().await;
        assert_eq!(mock.call_count("/api/cleanup"), 0);

        app.request_cleanup();
        app.confirm_cleanup(true);
        settle().await;
        app.sync();
        assert_eq!(mock.call_count("/api/cleanup"), 1);
        assert_eq!(app.get_status_message(), Some("Old readings removed"));
    }

    #[tokio::test]
    async fn test_selection_is_clamped() {
        let mock = Arc::new(MockTransport::new());
        mock.reply("/api/current", MockReply::Json(json!({"A": device(json!({})), "B": device(json!({}))})));
        let mut app = app_with(&mock);
        app.dashboard().snapshots().refresh().await;
        app.sync();

        app.select_next_n(10);
        assert_eq!(app.selected_device_index, 1);
        app.select_prev_n(10);
        assert_eq!(app.selected_device_index, 0);
        app.select_last();
        assert_eq!(app.selected_device_index, 1);
    }
}
