//! Key bindings: normal and vim-style.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    /// Jump straight to a lane (digit keys, 0-based).
    Lane(usize),
    Up,
    Down,
    Confirm,
    Pause,
    Restart,
    ToggleSound,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, enter) and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod && modifiers != KeyModifiers::CONTROL {
        return Action::None;
    }
    match code {
        KeyCode::Char('c') if modifiers == KeyModifiers::CONTROL => Action::Quit,
        KeyCode::Char('q') | KeyCode::Esc if no_mod => Action::Quit,
        KeyCode::Char('p') if no_mod => Action::Pause,
        KeyCode::Char('r' | 'R') if no_mod => Action::Restart,
        KeyCode::Char('m') if no_mod => Action::ToggleSound,
        KeyCode::Left | KeyCode::Char('h' | 'a') if no_mod => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('l' | 'd') if no_mod => Action::MoveRight,
        KeyCode::Up | KeyCode::Char('k' | 'w') if no_mod => Action::Up,
        KeyCode::Down | KeyCode::Char('j' | 's') if no_mod => Action::Down,
        KeyCode::Enter | KeyCode::Char(' ') if no_mod => Action::Confirm,
        KeyCode::Char(c @ '1'..='9') if no_mod => Action::Lane(c as usize - '1' as usize),
        _ => Action::None,
    }
}
