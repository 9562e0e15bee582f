#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Insert(char),
    NewLine,
    Backspace,
    Delete,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    MoveHome,
    MoveEnd,
    PageUp,
    PageDown,
    FocusNext,
    FocusList,
    NewNote,
    RenameNote,
    DeleteNote,
    OpenSearch,
    OpenExport,
    OpenImport,
    ToggleTheme,
    OpenHelp,
    Quit,
}
