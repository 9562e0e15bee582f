use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::core::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    Editor,
}

pub fn map_key_event(key: KeyEvent, focus: Focus) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    let mods = key.modifiers;
    if mods.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char(c) => match c.to_ascii_lowercase() {
                'q' => Some(Command::Quit),
                'n' => Some(Command::NewNote),
                'r' => Some(Command::RenameNote),
                'd' => Some(Command::DeleteNote),
                'f' => Some(Command::OpenSearch),
                'e' => Some(Command::OpenExport),
                'o' => Some(Command::OpenImport),
                't' => Some(Command::ToggleTheme),
                _ => None,
            },
            _ => None,
        };
    }

    match (key.code, focus) {
        (KeyCode::F(1), _) => Some(Command::OpenHelp),
        (KeyCode::Tab, _) | (KeyCode::BackTab, _) => Some(Command::FocusNext),
        (KeyCode::Esc, _) => Some(Command::FocusList),
        (KeyCode::Up, _) => Some(Command::MoveUp),
        (KeyCode::Down, _) => Some(Command::MoveDown),
        (KeyCode::PageUp, _) => Some(Command::PageUp),
        (KeyCode::PageDown, _) => Some(Command::PageDown),

        (KeyCode::Enter, Focus::List) => Some(Command::FocusNext),
        (KeyCode::Delete, Focus::List) => Some(Command::DeleteNote),
        (KeyCode::Char(c), Focus::List) if !mods.contains(KeyModifiers::ALT) => match c {
            'n' => Some(Command::NewNote),
            'r' => Some(Command::RenameNote),
            'd' => Some(Command::DeleteNote),
            '/' => Some(Command::OpenSearch),
            'e' => Some(Command::OpenExport),
            'i' => Some(Command::OpenImport),
            't' => Some(Command::ToggleTheme),
            '?' => Some(Command::OpenHelp),
            'q' => Some(Command::Quit),
            'k' => Some(Command::MoveUp),
            'j' => Some(Command::MoveDown),
            _ => None,
        },
        (_, Focus::List) => None,

        (KeyCode::Left, Focus::Editor) => Some(Command::MoveLeft),
        (KeyCode::Right, Focus::Editor) => Some(Command::MoveRight),
        (KeyCode::Home, Focus::Editor) => Some(Command::MoveHome),
        (KeyCode::End, Focus::Editor) => Some(Command::MoveEnd),
        (KeyCode::Backspace, Focus::Editor) => Some(Command::Backspace),
        (KeyCode::Delete, Focus::Editor) => Some(Command::Delete),
        (KeyCode::Enter, Focus::Editor) => Some(Command::NewLine),
        (KeyCode::Char(c), Focus::Editor)
            if mods == KeyModifiers::NONE || mods == KeyModifiers::SHIFT =>
        {
            Some(Command::Insert(c))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    use super::{Focus, map_key_event};
    use crate::core::Command;

    fn key(code: KeyCode, mods: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, mods)
    }

    #[test]
    fn letters_are_commands_in_the_list_and_text_in_the_editor() {
        let n = key(KeyCode::Char('n'), KeyModifiers::NONE);
        assert_eq!(map_key_event(n, Focus::List), Some(Command::NewNote));
        assert_eq!(map_key_event(n, Focus::Editor), Some(Command::Insert('n')));

        let upper = key(KeyCode::Char('N'), KeyModifiers::SHIFT);
        assert_eq!(map_key_event(upper, Focus::Editor), Some(Command::Insert('N')));
    }

    #[test]
    fn control_shortcuts_work_everywhere() {
        let quit = key(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert_eq!(map_key_event(quit, Focus::Editor), Some(Command::Quit));
        assert_eq!(map_key_event(quit, Focus::List), Some(Command::Quit));

        let theme = key(KeyCode::Char('T'), KeyModifiers::CONTROL | KeyModifiers::SHIFT);
        assert_eq!(map_key_event(theme, Focus::Editor), Some(Command::ToggleTheme));
    }

    #[test]
    fn enter_and_escape_move_focus() {
        let enter = key(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(map_key_event(enter, Focus::List), Some(Command::FocusNext));
        assert_eq!(map_key_event(enter, Focus::Editor), Some(Command::NewLine));

        let esc = key(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(map_key_event(esc, Focus::Editor), Some(Command::FocusList));
    }
}
