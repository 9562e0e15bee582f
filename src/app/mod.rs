mod cli;

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{info, warn};

use cli::Cli;
pub use cli::Config;
use crate::core::{
    Command, Debouncer, EditorBuffer, ExportScope, Note, NoteStore, PendingEdit, Theme, UNTITLED,
    parse_timestamp,
};
use crate::input::{Focus, map_key_event};
use crate::io::{KeyValueStore, read_import, write_export};
use crate::markdown::{MarkdownRenderer, detect_renderer, enforce_link_targets};
use crate::ui::{UiModel, draw};

const POLL_INTERVAL: Duration = Duration::from_millis(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmChoice {
    Yes,
    No,
}

#[derive(Debug, Clone)]
pub struct ExportItem {
    pub id: String,
    pub title: String,
    pub updated_at: String,
    pub checked: bool,
}

#[derive(Debug, Clone)]
pub enum Overlay {
    None,
    Help,
    NewNote {
        title: String,
    },
    Rename {
        note_id: String,
        title: String,
    },
    Search {
        input: String,
    },
    ConfirmDelete {
        note_id: String,
        title: String,
        choice: ConfirmChoice,
    },
    Export {
        items: Vec<ExportItem>,
        cursor: usize,
        select_all: bool,
    },
    Import {
        path: String,
    },
    Warning {
        message: String,
    },
    Error {
        message: String,
    },
}

pub struct App<S: KeyValueStore> {
    pub store: NoteStore<S>,
    pub renderer: Box<dyn MarkdownRenderer>,
    pub editor: EditorBuffer,
    pub preview: String,
    pub autosave: Debouncer<PendingEdit>,
    pub overlay: Overlay,
    pub focus: Focus,
    pub theme: Theme,
    pub filter: String,
    pub status: String,
    pub export_dir: PathBuf,
    pub running: bool,
    pub needs_redraw: bool,
}

impl<S: KeyValueStore> App<S> {
    pub fn new(
        store: NoteStore<S>,
        renderer: Box<dyn MarkdownRenderer>,
        theme: Theme,
        config: &Config,
    ) -> Self {
        let mut app = Self {
            store,
            renderer,
            editor: EditorBuffer::new(),
            preview: String::new(),
            autosave: Debouncer::new(config.autosave_delay),
            overlay: Overlay::None,
            focus: Focus::List,
            theme,
            filter: String::new(),
            status: "Ready".to_string(),
            export_dir: config.export_dir.clone(),
            running: true,
            needs_redraw: true,
        };
        app.load_current_into_editor();
        app
    }

    fn set_status(&mut self, text: impl Into<String>) {
        self.status = text.into();
        self.needs_redraw = true;
    }

    fn open_error(&mut self, msg: impl Into<String>) {
        self.overlay = Overlay::Error {
            message: msg.into(),
        };
        self.needs_redraw = true;
    }

    /// Notes as the list shows them: filtered, newest first.
    pub fn visible_notes(&self) -> Vec<&Note> {
        self.store.search(&self.filter)
    }

    fn load_current_into_editor(&mut self) {
        if let Some(note) = self.store.current() {
            let (id, content) = (note.id.clone(), note.content.clone());
            self.editor.load(&id, &content);
        }
        self.refresh_preview();
    }

    fn refresh_preview(&mut self) {
        let html = self.renderer.render(&self.editor.text());
        self.preview = enforce_link_targets(&html);
        self.needs_redraw = true;
    }

    fn commit(&mut self, edit: PendingEdit) {
        match self.store.update_content(&edit.note_id, edit.content) {
            Ok(true) => {
                let saved = self
                    .store
                    .get(&edit.note_id)
                    .and_then(|n| parse_timestamp(&n.updated_at))
                    .map(|t| format!("Saved {}", t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")))
                    .unwrap_or_else(|| "Saved".to_string());
                self.set_status(saved);
            }
            Ok(false) => warn!(id = %edit.note_id, "dropped edit for a note that no longer exists"),
            Err(e) => self.open_error(format!("Save failed: {e:#}")),
        }
    }

    /// Commits the pending edit, if any, without waiting for the timer.
    pub fn flush_autosave(&mut self) {
        if let Some(edit) = self.autosave.flush() {
            self.commit(edit);
        }
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some(edit) = self.autosave.take_due(now) {
            self.commit(edit);
        }
    }

    fn poll_timeout(&self, now: Instant) -> Duration {
        self.autosave
            .time_until_due(now)
            .map_or(POLL_INTERVAL, |d| d.min(POLL_INTERVAL))
    }

    fn edited(&mut self, now: Instant) {
        self.refresh_preview();
        if let Some(id) = self.editor.note_id() {
            self.autosave.schedule(
                PendingEdit {
                    note_id: id.to_string(),
                    content: self.editor.text(),
                },
                now,
            );
        }
    }

    pub fn select_note(&mut self, id: &str) {
        self.flush_autosave();
        if let Err(e) = self.store.select(id) {
            self.open_error(format!("Failed to remember selection: {e:#}"));
        }
        self.load_current_into_editor();
    }

    fn move_list_selection(&mut self, delta: isize) {
        let ids: Vec<String> = self.visible_notes().iter().map(|n| n.id.clone()).collect();
        if ids.is_empty() {
            return;
        }
        let pos = self
            .store
            .current_id()
            .and_then(|cur| ids.iter().position(|id| id == cur));
        let next = match pos {
            Some(p) => (p as isize + delta).clamp(0, ids.len() as isize - 1) as usize,
            None => 0,
        };
        self.select_note(&ids[next]);
    }

    pub fn create_note(&mut self, title: &str) {
        self.flush_autosave();
        match self.store.create(title) {
            Ok(_) => {
                self.load_current_into_editor();
                self.focus = Focus::Editor;
                self.set_status("Created");
            }
            Err(e) => self.open_error(format!("Create failed: {e:#}")),
        }
    }

    pub fn rename_note(&mut self, id: &str, title: &str) {
        self.flush_autosave();
        match self.store.rename(id, title) {
            Ok(_) => self.set_status("Renamed"),
            Err(e) => self.open_error(format!("Rename failed: {e:#}")),
        }
    }

    pub fn delete_note(&mut self, id: &str) {
        if self.editor.note_id() == Some(id) {
            self.autosave.cancel();
        } else {
            self.flush_autosave();
        }
        match self.store.delete(id) {
            Ok(_) => {
                self.load_current_into_editor();
                self.set_status("Deleted");
            }
            Err(e) => self.open_error(format!("Delete failed: {e:#}")),
        }
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        if let Err(e) = self.theme.persist(self.store.kv_mut()) {
            warn!("persisting theme failed: {e}");
        }
        self.set_status(format!("Theme: {}", self.theme.as_str()));
    }

    pub fn export(&mut self, ids: Option<Vec<String>>) {
        self.flush_autosave();
        let (notes, scope) = match ids {
            None => (self.store.export_all(), ExportScope::All),
            Some(ids) => match self.store.export_subset(&ids) {
                Ok(notes) => (notes, ExportScope::Selected(ids.len())),
                Err(e) => {
                    self.overlay = Overlay::Warning {
                        message: e.to_string(),
                    };
                    return;
                }
            },
        };
        match write_export(&self.export_dir, &scope.file_name(), &notes) {
            Ok(path) => {
                info!(count = notes.len(), path = %path.display(), "exported notes");
                match scope {
                    ExportScope::All => self.set_status("Exported all"),
                    ExportScope::Selected(n) => self.set_status(format!("Exported {n} note(s)")),
                }
            }
            Err(e) => self.open_error(format!("Export failed: {e:#}")),
        }
    }

    pub fn import_from(&mut self, path: &str) {
        self.flush_autosave();
        let result = read_import(Path::new(path))
            .map_err(anyhow::Error::from)
            .and_then(|raw| self.store.import_json(&raw).map_err(anyhow::Error::from));
        match result {
            Ok(count) => self.set_status(format!("Imported {count} note(s)")),
            Err(e) => self.open_error(format!("Import failed: {e:#}")),
        }
    }

    fn export_overlay(&self) -> Overlay {
        let items = self
            .store
            .search("")
            .into_iter()
            .map(|n| ExportItem {
                id: n.id.clone(),
                title: n.display_title().to_string(),
                updated_at: n.updated_at.clone(),
                checked: false,
            })
            .collect();
        Overlay::Export {
            items,
            cursor: 0,
            select_all: false,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if !matches!(self.overlay, Overlay::None) {
            self.handle_overlay_key(key);
            return;
        }
        if let Some(cmd) = map_key_event(key, self.focus) {
            self.apply_command(cmd, now);
        }
    }

    pub fn apply_command(&mut self, cmd: Command, now: Instant) {
        let changed = match cmd {
            Command::Insert(c) => self.editor.insert_char(c),
            Command::NewLine => self.editor.insert_char('\n'),
            Command::Backspace => self.editor.backspace(),
            Command::Delete => self.editor.delete(),
            Command::MoveLeft => {
                self.editor.move_left();
                false
            }
            Command::MoveRight => {
                self.editor.move_right();
                false
            }
            Command::MoveHome => {
                self.editor.move_home();
                false
            }
            Command::MoveEnd => {
                self.editor.move_end();
                false
            }
            Command::MoveUp | Command::MoveDown | Command::PageUp | Command::PageDown => {
                self.navigate(cmd);
                false
            }
            Command::FocusNext => {
                self.focus = match self.focus {
                    Focus::List => Focus::Editor,
                    Focus::Editor => Focus::List,
                };
                false
            }
            Command::FocusList => {
                self.focus = Focus::List;
                false
            }
            Command::NewNote => {
                self.overlay = Overlay::NewNote {
                    title: UNTITLED.to_string(),
                };
                false
            }
            Command::RenameNote => {
                if let Some(note) = self.store.current() {
                    self.overlay = Overlay::Rename {
                        note_id: note.id.clone(),
                        title: note.title.clone(),
                    };
                }
                false
            }
            Command::DeleteNote => {
                if let Some(note) = self.store.current() {
                    self.overlay = Overlay::ConfirmDelete {
                        note_id: note.id.clone(),
                        title: note.display_title().to_string(),
                        choice: ConfirmChoice::No,
                    };
                }
                false
            }
            Command::OpenSearch => {
                self.overlay = Overlay::Search {
                    input: self.filter.clone(),
                };
                false
            }
            Command::OpenExport => {
                self.overlay = self.export_overlay();
                false
            }
            Command::OpenImport => {
                self.overlay = Overlay::Import {
                    path: String::new(),
                };
                false
            }
            Command::ToggleTheme => {
                self.toggle_theme();
                false
            }
            Command::OpenHelp => {
                self.overlay = Overlay::Help;
                false
            }
            Command::Quit => {
                self.flush_autosave();
                self.running = false;
                false
            }
        };
        if changed {
            self.edited(now);
        }
        self.needs_redraw = true;
    }

    fn navigate(&mut self, cmd: Command) {
        match (self.focus, cmd) {
            (Focus::List, Command::MoveUp) => self.move_list_selection(-1),
            (Focus::List, Command::MoveDown) => self.move_list_selection(1),
            (Focus::List, Command::PageUp) => self.move_list_selection(-10),
            (Focus::List, Command::PageDown) => self.move_list_selection(10),
            (Focus::Editor, Command::MoveUp) => self.editor.move_up(),
            (Focus::Editor, Command::MoveDown) => self.editor.move_down(),
            (Focus::Editor, Command::PageUp) => self.editor.page_up(),
            (Focus::Editor, Command::PageDown) => self.editor.page_down(),
            _ => {}
        }
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) {
        let current = std::mem::replace(&mut self.overlay, Overlay::None);
        let typed = match key.code {
            KeyCode::Char(c)
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT) =>
            {
                Some(c)
            }
            _ => None,
        };

        let next = match current {
            Overlay::None => Overlay::None,
            Overlay::Help | Overlay::Warning { .. } | Overlay::Error { .. }
                if matches!(key.code, KeyCode::Esc | KeyCode::Enter) =>
            {
                Overlay::None
            }
            Overlay::Help => Overlay::Help,
            Overlay::Warning { message } => Overlay::Warning { message },
            Overlay::Error { message } => Overlay::Error { message },

            Overlay::NewNote { mut title } => match key.code {
                KeyCode::Esc => Overlay::None,
                KeyCode::Enter => {
                    self.create_note(&title);
                    return;
                }
                KeyCode::Backspace => {
                    title.pop();
                    Overlay::NewNote { title }
                }
                _ => {
                    title.extend(typed);
                    Overlay::NewNote { title }
                }
            },
            Overlay::Rename {
                note_id,
                mut title,
            } => match key.code {
                KeyCode::Esc => Overlay::None,
                KeyCode::Enter => {
                    self.rename_note(&note_id, &title);
                    return;
                }
                KeyCode::Backspace => {
                    title.pop();
                    Overlay::Rename { note_id, title }
                }
                _ => {
                    title.extend(typed);
                    Overlay::Rename { note_id, title }
                }
            },
            Overlay::Search { mut input } => match key.code {
                KeyCode::Esc => {
                    self.filter.clear();
                    Overlay::None
                }
                KeyCode::Enter => Overlay::None,
                KeyCode::Backspace => {
                    input.pop();
                    self.filter = input.clone();
                    Overlay::Search { input }
                }
                _ => {
                    input.extend(typed);
                    self.filter = input.clone();
                    Overlay::Search { input }
                }
            },
            Overlay::ConfirmDelete {
                note_id,
                title,
                mut choice,
            } => match key.code {
                KeyCode::Esc => Overlay::None,
                KeyCode::Left | KeyCode::Up | KeyCode::Char('y') | KeyCode::Char('Y') => {
                    choice = ConfirmChoice::Yes;
                    Overlay::ConfirmDelete {
                        note_id,
                        title,
                        choice,
                    }
                }
                KeyCode::Right | KeyCode::Down | KeyCode::Char('n') | KeyCode::Char('N') => {
                    choice = ConfirmChoice::No;
                    Overlay::ConfirmDelete {
                        note_id,
                        title,
                        choice,
                    }
                }
                KeyCode::Enter => {
                    if choice == ConfirmChoice::Yes {
                        self.delete_note(&note_id);
                        if !matches!(self.overlay, Overlay::None) {
                            return;
                        }
                    }
                    Overlay::None
                }
                _ => Overlay::ConfirmDelete {
                    note_id,
                    title,
                    choice,
                },
            },
            Overlay::Export {
                mut items,
                mut cursor,
                mut select_all,
            } => match key.code {
                KeyCode::Esc => Overlay::None,
                KeyCode::Up => {
                    cursor = cursor.saturating_sub(1);
                    Overlay::Export {
                        items,
                        cursor,
                        select_all,
                    }
                }
                KeyCode::Down => {
                    cursor = (cursor + 1).min(items.len().saturating_sub(1));
                    Overlay::Export {
                        items,
                        cursor,
                        select_all,
                    }
                }
                KeyCode::Char(' ') => {
                    if let Some(item) = items.get_mut(cursor) {
                        item.checked = !item.checked;
                    }
                    Overlay::Export {
                        items,
                        cursor,
                        select_all,
                    }
                }
                KeyCode::Char('a') => {
                    select_all = !select_all;
                    for item in &mut items {
                        item.checked = select_all;
                    }
                    Overlay::Export {
                        items,
                        cursor,
                        select_all,
                    }
                }
                KeyCode::Enter | KeyCode::Char('s') => {
                    let ids = items
                        .into_iter()
                        .filter(|i| i.checked)
                        .map(|i| i.id)
                        .collect();
                    self.export(Some(ids));
                    return;
                }
                KeyCode::Char('e') => {
                    self.export(None);
                    return;
                }
                _ => Overlay::Export {
                    items,
                    cursor,
                    select_all,
                },
            },
            Overlay::Import { mut path } => match key.code {
                KeyCode::Esc => Overlay::None,
                KeyCode::Enter => {
                    let path = path.trim().to_string();
                    if path.is_empty() {
                        Overlay::Import { path }
                    } else {
                        self.import_from(&path);
                        return;
                    }
                }
                KeyCode::Backspace => {
                    path.pop();
                    Overlay::Import { path }
                }
                _ => {
                    path.extend(typed);
                    Overlay::Import { path }
                }
            },
        };

        self.overlay = next;
        self.needs_redraw = true;
    }

    pub fn update_viewport_from_size(&mut self, width: u16, height: u16) {
        let layout = crate::ui::pane_sizes(width, height);
        self.editor
            .set_viewport_size(layout.editor_width, layout.editor_height);
    }

    pub fn status_hint(&self) -> &'static str {
        match self.focus {
            Focus::List => "n New | r Rename | d Delete | / Search | e Export | i Import | t Theme | ? Help | q Quit",
            Focus::Editor => "Esc List | Ctrl+N New | Ctrl+F Search | Ctrl+T Theme | Ctrl+Q Quit",
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_cli(&cli)?;
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;
    cli::init_logging(&config.data_dir)?;

    if let Some(command) = cli.command {
        return cli::run_command(command, &config, &mut io::stdout().lock());
    }

    let store = cli::open_store(&config)?;
    let theme = Theme::load(store.kv(), std::env::var("COLORFGBG").ok().as_deref());
    let renderer = detect_renderer(config.force_fallback_renderer);
    info!(renderer = renderer.name(), notes = store.len(), "starting editor");

    let mut app = App::new(store, renderer, theme, &config);
    let (_guard, mut terminal) = setup_terminal()?;
    let size = terminal.size()?;
    app.update_viewport_from_size(size.width, size.height);

    while app.running {
        if app.needs_redraw {
            terminal.draw(|f| {
                draw(
                    f,
                    UiModel {
                        notes: app.visible_notes(),
                        current_id: app.store.current_id(),
                        editor: &app.editor,
                        preview: &app.preview,
                        overlay: &app.overlay,
                        focus: app.focus,
                        theme: app.theme,
                        filter: &app.filter,
                        status: &app.status,
                        unsaved: app.autosave.is_pending(),
                        hint: app.status_hint(),
                        renderer: app.renderer.name(),
                    },
                );
            })?;
            app.needs_redraw = false;
        }

        if event::poll(app.poll_timeout(Instant::now()))? {
            match event::read()? {
                Event::Key(key) => app.handle_key(key, Instant::now()),
                Event::Resize(w, h) => {
                    app.update_viewport_from_size(w, h);
                    app.needs_redraw = true;
                }
                _ => {}
            }
        }
        app.tick(Instant::now());
    }

    app.flush_autosave();
    terminal.show_cursor().context("show cursor")?;
    Ok(())
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

fn setup_terminal() -> Result<(TerminalGuard, Terminal<CrosstermBackend<io::Stdout>>)> {
    enable_raw_mode().context("enabling raw mode")?;
    execute!(io::stdout(), EnterAlternateScreen).context("enter alternate screen")?;

    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        hook(panic_info);
    }));

    let guard = TerminalGuard;
    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend).context("creating terminal")?;
    Ok((guard, terminal))
}
