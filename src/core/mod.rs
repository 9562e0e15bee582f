mod autosave;
mod buffer;
mod commands;
mod note;
mod seed;
mod store;
mod theme;

pub use autosave::{DEFAULT_DELAY, Debouncer, PendingEdit};
pub use buffer::EditorBuffer;
pub use commands::Command;
pub use note::{Note, UNTITLED, parse_timestamp};
pub use store::{ExportScope, NoteStore};
pub use theme::Theme;
