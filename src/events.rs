use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, View};

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Dispatch one terminal event to the app
pub fn handle_event(app: &mut App, event: Event) {
    match event {
        Event::Key(key) => handle_key_event(app, key),
        Event::Mouse(mouse) => handle_mouse_event(app, mouse),
        Event::FocusLost => app.set_focus(false),
        Event::FocusGained => app.set_focus(true),
        // Terminal will redraw on next iteration
        _ => {}
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    if app.show_cleanup_confirm {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_cleanup(true),
            _ => app.confirm_cleanup(false),
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),

        KeyCode::Tab => {
            if key.modifiers.contains(KeyModifiers::SHIFT) {
                app.prev_view();
            } else {
                app.next_view();
            }
        }
        KeyCode::BackTab => app.prev_view(),

        KeyCode::Char('1') => app.set_view(View::Current),
        KeyCode::Char('2') => app.set_view(View::History),
        KeyCode::Char('3') => {
            if app.current_view != View::Devices && app.dashboard().devices().is_empty() {
                app.load_devices();
            }
            app.set_view(View::Devices);
        }

        // Navigation (up/down for items, left/right for tabs)
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Left | KeyCode::Char('h') => app.prev_view(),
        KeyCode::Right | KeyCode::Char('l') => app.next_view(),
        KeyCode::PageUp => app.select_prev_n(10),
        KeyCode::PageDown => app.select_next_n(10),
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),

        KeyCode::Enter => app.activate(),
        KeyCode::Esc | KeyCode::Backspace => app.go_back(),

        KeyCode::Char('r') => app.refresh(),
        KeyCode::Char('c') => app.request_cleanup(),
        KeyCode::Char('e') => app.export(),
        KeyCode::Char('?') => app.toggle_help(),

        _ => {}
    }
}

/// Handle mouse events
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.select_prev(),
        MouseEventKind::ScrollDown => app.select_next(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::client::mock::MockTransport;
    use crate::client::BackendClient;
    use crate::dashboard::{Dashboard, DashboardOptions};
    use crate::ui::Theme;

    fn app() -> App {
        let mock = Arc::new(MockTransport::new());
        let dashboard = Dashboard::new(BackendClient::new(mock), DashboardOptions::default());
        App::new(Arc::new(dashboard), tokio::runtime::Handle::current(), Theme::dark())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn test_tab_switching() {
        let mut app = app();
        handle_key_event(&mut app, key(KeyCode::Tab));
        assert_eq!(app.current_view, View::History);
        handle_key_event(&mut app, key(KeyCode::Char('1')));
        assert_eq!(app.current_view, View::Current);
    }

    #[tokio::test]
    async fn test_cleanup_prompt_swallows_next_key() {
        let mut app = app();
        handle_key_event(&mut app, key(KeyCode::Char('c')));
        assert!(app.show_cleanup_confirm);

        handle_key_event(&mut app, key(KeyCode::Char('q')));
        assert!(!app.show_cleanup_confirm);
        assert!(app.running);
    }

    #[tokio::test]
    async fn test_help_closes_on_any_key() {
        let mut app = app();
        handle_key_event(&mut app, key(KeyCode::Char('?')));
        assert!(app.show_help);
        handle_key_event(&mut app, key(KeyCode::Char('x')));
        assert!(!app.show_help);
    }

    #[tokio::test]
    async fn test_quit() {
        let mut app = app();
        handle_key_event(&mut app, key(KeyCode::Char('q')));
        assert!(!app.running);
    }
}
