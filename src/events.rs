use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};

use crate::app::App;

/// File written by the in-app export key.
const EXPORT_FILE: &str = "statusboard_export.json";

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    if app.detail.is_some() {
        handle_detail_key(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),

        // Grid navigation
        KeyCode::Left | KeyCode::Char('h') => app.select_prev(),
        KeyCode::Right | KeyCode::Char('l') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_up(),
        KeyCode::Down | KeyCode::Char('j') => app.select_down(),
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),

        KeyCode::Enter => {
            app.show_detail();
        }

        KeyCode::Char('r') | KeyCode::Char('R') => app.refresh_all(),

        KeyCode::Char('?') => app.toggle_help(),

        KeyCode::Char('e') => {
            let export_path = PathBuf::from(EXPORT_FILE);
            match app.export_state(&export_path) {
                Ok(()) => {
                    app.set_status_message(format!("Exported to {}", export_path.display()));
                }
                Err(e) => {
                    app.set_status_message(format!("Export failed: {}", e));
                }
            }
        }

        _ => {}
    }
}

/// Keys while the group detail dialog is open
fn handle_detail_key(app: &mut App, key: KeyEvent) {
    let body_open = app.detail.as_ref().is_some_and(|d| d.body_open);

    match key.code {
        KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('q') => app.close_overlay(),

        KeyCode::Enter | KeyCode::Char('b') => {
            if let Some(dialog) = app.detail.as_mut() {
                if !dialog.toggle_body() && !body_open {
                    app.set_status_message("No body captured for this endpoint".to_string());
                }
            }
        }

        KeyCode::Up | KeyCode::Char('k') if body_open => scroll_body(app, -1),
        KeyCode::Down | KeyCode::Char('j') if body_open => scroll_body(app, 1),
        KeyCode::PageUp => scroll_body(app, -10),
        KeyCode::PageDown => scroll_body(app, 10),

        KeyCode::Up | KeyCode::Char('k') => {
            if let Some(dialog) = app.detail.as_mut() {
                dialog.select_prev();
            }
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if let Some(dialog) = app.detail.as_mut() {
                dialog.select_next();
            }
        }

        KeyCode::Char('r') => app.refresh_selected_endpoint(),
        KeyCode::Char('R') => app.refresh_all(),

        KeyCode::Char('?') => app.toggle_help(),

        _ => {}
    }
}

fn scroll_body(app: &mut App, delta: i32) {
    if let Some(dialog) = app.detail.as_mut() {
        dialog.scroll_body(delta);
    }
}

/// Handle mouse events
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => match app.detail.as_mut() {
            Some(dialog) if dialog.body_open => dialog.scroll_body(-3),
            Some(dialog) => dialog.select_prev(),
            None => app.select_up(),
        },
        MouseEventKind::ScrollDown => match app.detail.as_mut() {
            Some(dialog) if dialog.body_open => dialog.scroll_body(3),
            Some(dialog) => dialog.select_next(),
            None => app.select_down(),
        },

        // Click a tile to open its group, click outside a dialog to close it
        MouseEventKind::Down(MouseButton::Left) => app.click(mouse.column, mouse.row),

        // Right-click goes back
        MouseEventKind::Down(MouseButton::Right) => app.close_overlay(),

        _ => {}
    }
}
