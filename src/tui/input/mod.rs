use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::io::tmux;
use crate::ops::navigation::{self, NavCommand};

use super::app::{App, LaunchKind};

/// What a key press asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Nav(NavCommand),
    View,
    Edit,
    CopyRelative,
    CopyAbsolute,
    Zoom,
    Quit,
}

/// Map a key to an action. `page` is the number of rows a page key moves.
pub fn action_for(key: KeyEvent, page: usize) -> Option<Action> {
    let key = normalize_key(key);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    let action = match key.code {
        KeyCode::Up if shift => Action::Nav(NavCommand::JumpPrevSiblingDir),
        KeyCode::Down if shift => Action::Nav(NavCommand::JumpNextSiblingDir),
        KeyCode::Up | KeyCode::Char('k') => Action::Nav(NavCommand::Up),
        KeyCode::Down | KeyCode::Char('j') => Action::Nav(NavCommand::Down),
        KeyCode::Char('K') => Action::Nav(NavCommand::JumpPrevSiblingDir),
        KeyCode::Char('J') => Action::Nav(NavCommand::JumpNextSiblingDir),
        KeyCode::Char('g') | KeyCode::Home => Action::Nav(NavCommand::Top),
        KeyCode::Char('G') | KeyCode::End => Action::Nav(NavCommand::Bottom),
        KeyCode::PageUp => Action::Nav(NavCommand::PageUp(page)),
        KeyCode::PageDown => Action::Nav(NavCommand::PageDown(page)),
        KeyCode::Enter | KeyCode::Char(' ') => Action::Nav(NavCommand::Toggle),
        KeyCode::Char('o') => Action::View,
        KeyCode::Char('e') => Action::Edit,
        KeyCode::Char('c') => Action::CopyRelative,
        KeyCode::Char('C') => Action::CopyAbsolute,
        KeyCode::Char('z') => Action::Zoom,
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        _ => return None,
    };
    Some(action)
}

/// Shift+letter arrives as either `Char('k')` with SHIFT or `Char('K')`
fn normalize_key(mut key: KeyEvent) -> KeyEvent {
    if let KeyCode::Char(c) = key.code
        && key.modifiers.contains(KeyModifiers::SHIFT)
        && c.is_ascii_lowercase()
    {
        key.code = KeyCode::Char(c.to_ascii_uppercase());
    }
    key
}

/// Handle a key event
pub fn handle_key(app: &mut App, key: KeyEvent) {
    // Ignore bare modifier key presses (Shift, Ctrl, Alt, etc.)
    if matches!(key.code, KeyCode::Modifier(_)) {
        return;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }
    let Some(action) = action_for(key, app.page_height.max(1)) else {
        return;
    };
    app.status = None;

    match action {
        Action::Nav(NavCommand::Toggle) => app.toggle_cursor(),
        Action::Nav(command) => {
            if let Err(e) = navigation::apply(command, &mut app.tree) {
                app.notify_error(e.to_string());
            }
        }
        Action::View => app.request_launch(LaunchKind::View),
        Action::Edit => app.request_launch(LaunchKind::Edit),
        Action::CopyRelative => app.copy_cursor_path(false),
        Action::CopyAbsolute => app.copy_cursor_path(true),
        Action::Zoom => {
            if let Err(e) = tmux::zoom_pane() {
                app.notify_error(e.to_string());
            }
        }
        Action::Quit => app.should_quit = true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::render::test_helpers::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn shift(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::SHIFT)
    }

    #[test]
    fn arrows_and_vim_keys_move() {
        assert_eq!(action_for(key(KeyCode::Up), 10), Some(Action::Nav(NavCommand::Up)));
        assert_eq!(action_for(key(KeyCode::Char('j')), 10), Some(Action::Nav(NavCommand::Down)));
        assert_eq!(
            action_for(key(KeyCode::PageDown), 12),
            Some(Action::Nav(NavCommand::PageDown(12)))
        );
    }

    #[test]
    fn shifted_keys_jump_between_directories() {
        assert_eq!(
            action_for(shift(KeyCode::Up), 1),
            Some(Action::Nav(NavCommand::JumpPrevSiblingDir))
        );
        assert_eq!(
            action_for(shift(KeyCode::Down), 1),
            Some(Action::Nav(NavCommand::JumpNextSiblingDir))
        );
        // Some terminals report Shift+j as lowercase with SHIFT
        assert_eq!(
            action_for(shift(KeyCode::Char('j')), 1),
            Some(Action::Nav(NavCommand::JumpNextSiblingDir))
        );
        assert_eq!(
            action_for(key(KeyCode::Char('K')), 1),
            Some(Action::Nav(NavCommand::JumpPrevSiblingDir))
        );
    }

    #[test]
    fn copy_keys_are_case_sensitive() {
        assert_eq!(action_for(key(KeyCode::Char('c')), 1), Some(Action::CopyRelative));
        assert_eq!(action_for(shift(KeyCode::Char('c')), 1), Some(Action::CopyAbsolute));
        assert_eq!(action_for(key(KeyCode::Char('x')), 1), None);
    }

    #[test]
    fn enter_toggles_and_root_stays_expanded() {
        let fx = Fixture::new(&["src"], &[]);
        let mut app = fx.app();
        handle_key(&mut app, key(KeyCode::Enter));
        assert_eq!(app.tree.get(app.tree.root()).map(|n| n.expanded), Some(true));

        handle_key(&mut app, key(KeyCode::Down));
        handle_key(&mut app, key(KeyCode::Char(' ')));
        let src = app.tree.find(&fx.path("src")).unwrap();
        assert_eq!(app.cursor(), src);
        assert_eq!(app.tree.get(src).map(|n| n.expanded), Some(true));
    }

    #[test]
    fn key_press_clears_status_and_quit_sets_flag() {
        let fx = Fixture::new(&[], &["a.txt"]);
        let mut app = fx.app();
        app.notify("Copied: a.txt");
        handle_key(&mut app, key(KeyCode::Down));
        assert!(app.status.is_none());
        handle_key(&mut app, key(KeyCode::Esc));
        assert!(app.should_quit);
    }
}
