use super::ViewState;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Represents the result of handling a key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Quit the application
    Quit,
    /// Move to next image
    Next,
    /// Move to previous image
    Previous,
    /// Copy the current image to the shortlist
    Select,
    /// Toggle help overlay
    Help,
    /// No action
    None,
}

/// Maps keyboard events to actions
pub fn handle_key_event(key: KeyEvent) -> KeyAction {
    // Windows reports releases as well
    if key.kind == KeyEventKind::Release {
        return KeyAction::None;
    }

    match (key.code, key.modifiers) {
        // Quit: q, Esc or Ctrl+C
        (KeyCode::Char('q'), KeyModifiers::NONE) => KeyAction::Quit,
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => KeyAction::Quit,
        (KeyCode::Esc, KeyModifiers::NONE) => KeyAction::Quit,

        (KeyCode::Right, KeyModifiers::NONE) => KeyAction::Next,
        (KeyCode::Char('l'), KeyModifiers::NONE) => KeyAction::Next,
        (KeyCode::Char(' '), KeyModifiers::NONE) => KeyAction::Next,

        (KeyCode::Left, KeyModifiers::NONE) => KeyAction::Previous,
        (KeyCode::Char('h'), KeyModifiers::NONE) => KeyAction::Previous,

        (KeyCode::Enter, KeyModifiers::NONE) => KeyAction::Select,

        // Some terminals send '?' with SHIFT
        (KeyCode::Char('?'), _) => KeyAction::Help,

        _ => KeyAction::None,
    }
}

/// Applies `action` to the overlay state.
///
/// Returns the next view and the action the session should still handle.
/// The welcome screen closes on any key and lets Quit through. Help closes
/// on `?`, a quit key or an unmapped key; navigation keys leave it open.
pub fn route_key(view: ViewState, action: KeyAction) -> (ViewState, Option<KeyAction>) {
    match (view, action) {
        (ViewState::Welcome, KeyAction::Quit) => (ViewState::Browsing, Some(KeyAction::Quit)),
        (ViewState::Welcome, _) => (ViewState::Browsing, None),
        (ViewState::Help, KeyAction::Help | KeyAction::Quit | KeyAction::None) => {
            (ViewState::Browsing, None)
        }
        (ViewState::Help, _) => (ViewState::Help, None),
        (ViewState::Browsing, KeyAction::Help) => (ViewState::Help, None),
        (ViewState::Browsing, action) => (ViewState::Browsing, Some(action)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_quit() {
        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(handle_key_event(key), KeyAction::Quit);

        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key_event(key), KeyAction::Quit);

        let key = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(handle_key_event(key), KeyAction::Quit);
    }

    #[test]
    fn test_key_navigation() {
        let key = KeyEvent::new(KeyCode::Right, KeyModifiers::NONE);
        assert_eq!(handle_key_event(key), KeyAction::Next);

        let key = KeyEvent::new(KeyCode::Left, KeyModifiers::NONE);
        assert_eq!(handle_key_event(key), KeyAction::Previous);
    }

    #[test]
    fn test_key_navigation_aliases() {
        let key = KeyEvent::new(KeyCode::Char('l'), KeyModifiers::NONE);
        assert_eq!(handle_key_event(key), KeyAction::Next);

        let key = KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE);
        assert_eq!(handle_key_event(key), KeyAction::Next);

        let key = KeyEvent::new(KeyCode::Char('h'), KeyModifiers::NONE);
        assert_eq!(handle_key_event(key), KeyAction::Previous);
    }

    #[test]
    fn test_key_select() {
        let key = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(handle_key_event(key), KeyAction::Select);
    }

    #[test]
    fn test_key_help() {
        let key = KeyEvent::new(KeyCode::Char('?'), KeyModifiers::NONE);
        assert_eq!(handle_key_event(key), KeyAction::Help);

        let key = KeyEvent::new(KeyCode::Char('?'), KeyModifiers::SHIFT);
        assert_eq!(handle_key_event(key), KeyAction::Help);
    }

    #[test]
    fn test_key_release_ignored() {
        let key = KeyEvent::new_with_kind(KeyCode::Right, KeyModifiers::NONE, KeyEventKind::Release);
        assert_eq!(handle_key_event(key), KeyAction::None);
    }

    #[test]
    fn test_key_unmapped() {
        let key = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE);
        assert_eq!(handle_key_event(key), KeyAction::None);

        // Ctrl+Right is not navigation
        let key = KeyEvent::new(KeyCode::Right, KeyModifiers::CONTROL);
        assert_eq!(handle_key_event(key), KeyAction::None);
    }

    #[test]
    fn test_route_welcome_lets_quit_through() {
        assert_eq!(
            route_key(ViewState::Welcome, KeyAction::Quit),
            (ViewState::Browsing, Some(KeyAction::Quit))
        );
        assert_eq!(
            route_key(ViewState::Welcome, KeyAction::Next),
            (ViewState::Browsing, None)
        );
        assert_eq!(
            route_key(ViewState::Welcome, KeyAction::None),
            (ViewState::Browsing, None)
        );
    }

    #[test]
    fn test_route_help_closes_on_help_quit_and_unmapped() {
        for action in [KeyAction::Help, KeyAction::Quit, KeyAction::None] {
            assert_eq!(route_key(ViewState::Help, action), (ViewState::Browsing, None));
        }
        for action in [KeyAction::Next, KeyAction::Previous, KeyAction::Select] {
            assert_eq!(route_key(ViewState::Help, action), (ViewState::Help, None));
        }
    }

    #[test]
    fn test_route_browsing() {
        assert_eq!(
            route_key(ViewState::Browsing, KeyAction::Help),
            (ViewState::Help, None)
        );
        assert_eq!(
            route_key(ViewState::Browsing, KeyAction::Select),
            (ViewState::Browsing, Some(KeyAction::Select))
        );
    }
}
