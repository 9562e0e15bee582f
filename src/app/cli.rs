use std::env;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::core::{DEFAULT_DELAY, ExportScope, NoteStore, parse_timestamp};
use crate::io::{FileKvStore, read_import, write_export};
use crate::markdown::detect_renderer;

#[derive(Parser, Debug)]
#[command(author, version, about = "Notebook - multi-note Markdown editor")]
pub struct Cli {
    /// Directory holding the persisted notes; takes precedence over the
    /// environment variable
    #[arg(long, env = "NOTEBOOK_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,
    /// Use the built-in substitution renderer instead of the full engine
    #[arg(long, global = true)]
    pub fallback_renderer: bool,
    /// Quiet period before an edit is saved
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_DELAY.as_millis() as u64)]
    pub autosave_ms: u64,
    /// Directory export files are written to from the editor
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub export_dir: PathBuf,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List notes, most recently updated first
    List {
        /// Only notes whose title or body contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Print the HTML preview of a note (the current note by default)
    Render { id: Option<String> },
    /// Write notes to a JSON file
    Export {
        /// Export only these ids (repeatable); all notes when omitted
        #[arg(long = "id", value_name = "ID")]
        ids: Vec<String>,
        #[arg(long, value_name = "DIR", default_value = ".")]
        out: PathBuf,
    },
    /// Merge notes from a JSON file
    Import { file: PathBuf },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub autosave_delay: Duration,
    pub force_fallback_renderer: bool,
    pub export_dir: PathBuf,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let data_dir = match &cli.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };
        Ok(Self {
            data_dir,
            autosave_delay: Duration::from_millis(cli.autosave_ms),
            force_fallback_renderer: cli.fallback_renderer,
            export_dir: cli.export_dir.clone(),
        })
    }
}

fn default_data_dir() -> Result<PathBuf> {
    let home = env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home)
        .join(".local")
        .join("share")
        .join("notebook"))
}

/// Logs go to a file in the data directory; the terminal belongs to the UI.
pub fn init_logging(data_dir: &Path) -> Result<()> {
    let path = data_dir.join("notebook.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let filter = EnvFilter::try_from_env("NOTEBOOK_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;
    Ok(())
}

pub fn open_store(config: &Config) -> Result<NoteStore<FileKvStore>> {
    let kv = FileKvStore::open(&config.data_dir)
        .with_context(|| format!("opening data dir {}", config.data_dir.display()))?;
    info!(dir = %kv.root().display(), "opening note store");
    NoteStore::load(kv).context("loading notes")
}

pub fn run_command(command: Commands, config: &Config, out: &mut impl Write) -> Result<()> {
    let mut store = open_store(config)?;
    match command {
        Commands::List { search } => {
            for note in store.search(search.as_deref().unwrap_or_default()) {
                let updated = parse_timestamp(&note.updated_at)
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| note.updated_at.clone());
                writeln!(out, "{}  {}  {}", note.id, updated, note.display_title())?;
            }
        }
        Commands::Render { id } => {
            let note = match id {
                Some(id) => store
                    .get(&id)
                    .with_context(|| format!("no note with id {id}"))?,
                None => store.current().context("no current note")?,
            };
            let renderer = detect_renderer(config.force_fallback_renderer);
            info!(renderer = renderer.name(), id = %note.id, "rendering note");
            writeln!(out, "{}", renderer.render(&note.content))?;
        }
        Commands::Export { ids, out: dir } => {
            let (notes, scope) = if ids.is_empty() {
                (store.export_all(), ExportScope::All)
            } else {
                let mut wanted: Vec<String> = Vec::with_capacity(ids.len());
                for id in ids {
                    if store.get(&id).is_none() {
                        bail!("no note with id {id}");
                    }
                    if !wanted.contains(&id) {
                        wanted.push(id);
                    }
                }
                let notes = store.export_subset(&wanted)?;
                let scope = ExportScope::Selected(notes.len());
                (notes, scope)
            };
            let path = write_export(&dir, &scope.file_name(), &notes)
                .with_context(|| format!("exporting to {}", dir.display()))?;
            info!(count = notes.len(), path = %path.display(), "exported notes");
            writeln!(out, "Exported {} note(s) to {}", notes.len(), path.display())?;
        }
        Commands::Import { file } => {
            let raw = read_import(&file)?;
            let count = store
                .import_json(&raw)
                .with_context(|| format!("Import failed: {}", file.display()))?;
            writeln!(out, "Imported {count} note(s)")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::tempdir;

    use clap::Parser;

    use super::{Cli, Commands, Config, run_command};
    use crate::core::DEFAULT_DELAY;

    fn config(dir: &Path) -> Config {
        Config {
            data_dir: dir.join("data"),
            autosave_delay: DEFAULT_DELAY,
            force_fallback_renderer: true,
            export_dir: dir.to_path_buf(),
        }
    }

    fn run(command: Commands, config: &Config) -> String {
        let mut out = Vec::new();
        run_command(command, config, &mut out).expect("command");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn list_shows_seeded_notes() {
        let dir = tempdir().expect("tempdir");
        let cfg = config(dir.path());
        let listing = run(Commands::List { search: None }, &cfg);
        assert_eq!(listing.lines().count(), 2);
        assert!(listing.contains("Welcome"));

        let filtered = run(
            Commands::List {
                search: Some("TABLES".into()),
            },
            &cfg,
        );
        assert_eq!(filtered.lines().count(), 1);
    }

    #[test]
    fn import_then_export_subset() {
        let dir = tempdir().expect("tempdir");
        let cfg = config(dir.path());
        let payload = dir.path().join("in.json");
        std::fs::write(
            &payload,
            r#"[{"id":"keep1","title":"X"},{"content":"no title"}]"#,
        )
        .expect("write");

        let msg = run(Commands::Import { file: payload }, &cfg);
        assert_eq!(msg.trim(), "Imported 1 note(s)");

        run(
            Commands::Export {
                ids: vec!["keep1".into()],
                out: dir.path().to_path_buf(),
            },
            &cfg,
        );
        let exported =
            std::fs::read_to_string(dir.path().join("notebook-notes-selected-1.json"))
                .expect("export file");
        let notes: serde_json::Value = serde_json::from_str(&exported).expect("json");
        assert_eq!(notes[0]["title"], "X");
        assert_eq!(notes[0]["content"], "");
        assert!(notes[0]["updatedAt"].is_string());
    }

    #[test]
    fn import_of_non_array_fails_without_changes() {
        let dir = tempdir().expect("tempdir");
        let cfg = config(dir.path());
        let payload = dir.path().join("bad.json");
        std::fs::write(&payload, r#"{"title":"X"}"#).expect("write");

        let mut out = Vec::new();
        let err = run_command(Commands::Import { file: payload }, &cfg, &mut out)
            .expect_err("rejected");
        assert!(format!("{err:#}").contains("Invalid file format"));
        assert_eq!(run(Commands::List { search: None }, &cfg).lines().count(), 2);
    }

    #[test]
    fn render_prints_html_for_a_note() {
        let dir = tempdir().expect("tempdir");
        let cfg = config(dir.path());
        let html = run(Commands::Render { id: None }, &cfg);
        assert!(html.contains("<h1>Markdown Showcase</h1>"), "{html}");

        let mut out = Vec::new();
        assert!(
            run_command(Commands::Render { id: Some("missing".into()) }, &cfg, &mut out).is_err()
        );
    }

    #[test]
    fn export_all_writes_every_note() {
        let dir = tempdir().expect("tempdir");
        let cfg = config(dir.path());
        run(
            Commands::Export {
                ids: Vec::new(),
                out: dir.path().to_path_buf(),
            },
            &cfg,
        );
        let raw = std::fs::read_to_string(dir.path().join("notebook-notes-all.json"))
            .expect("export file");
        let notes: Vec<serde_json::Value> = serde_json::from_str(&raw).expect("json");
        assert_eq!(notes.len(), 2);
    }

    #[test]
    fn export_dedups_ids_and_rejects_unknown_ones() {
        let dir = tempdir().expect("tempdir");
        let cfg = config(dir.path());
        let payload = dir.path().join("in.json");
        std::fs::write(&payload, r#"[{"id":"keep1","title":"X"}]"#).expect("write");
        run(Commands::Import { file: payload }, &cfg);

        let msg = run(
            Commands::Export {
                ids: vec!["keep1".into(), "keep1".into()],
                out: dir.path().to_path_buf(),
            },
            &cfg,
        );
        assert!(msg.starts_with("Exported 1 note(s)"), "{msg}");
        assert!(dir.path().join("notebook-notes-selected-1.json").is_file());
        assert!(!dir.path().join("notebook-notes-selected-2.json").exists());

        let out_dir = dir.path().join("unknown");
        let mut out = Vec::new();
        let err = run_command(
            Commands::Export {
                ids: vec!["keep1".into(), "zzz".into()],
                out: out_dir.clone(),
            },
            &cfg,
            &mut out,
        )
        .expect_err("unknown id");
        assert!(format!("{err:#}").contains("zzz"));
        assert!(!out_dir.exists());
    }

    #[test]
    fn data_dir_flag_is_used_for_the_config() {
        let cli = Cli::try_parse_from(["notebook", "--data-dir", "/tmp/notes-flag", "list"])
            .expect("parse");
        let cfg = Config::from_cli(&cli).expect("config");
        assert_eq!(cfg.data_dir, std::path::PathBuf::from("/tmp/notes-flag"));
        assert_eq!(cfg.autosave_delay, DEFAULT_DELAY);
        assert!(matches!(cli.command, Some(Commands::List { search: None })));
    }
}
