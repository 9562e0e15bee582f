use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::note::{Note, by_recency, mint_id, normalize_title, now_timestamp};
use super::seed::seed_notes;
use crate::io::{KeyValueStore, StorageError, keys};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid file format")]
    NotAnArray,
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExportError {
    #[error("Please select at least one note (or use Export All).")]
    EmptySelection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportScope {
    All,
    Selected(usize),
}

impl ExportScope {
    pub fn file_name(self) -> String {
        match self {
            ExportScope::All => "notebook-notes-all.json".to_string(),
            ExportScope::Selected(n) => format!("notebook-notes-selected-{n}.json"),
        }
    }
}

/// The note collection plus the current selection, persisted through `S`.
///
/// Every mutation rewrites the whole collection. The collection is never
/// left empty and ids stay unique across every operation.
#[derive(Debug)]
pub struct NoteStore<S: KeyValueStore> {
    kv: S,
    notes: Vec<Note>,
    current: Option<String>,
}

impl<S: KeyValueStore> NoteStore<S> {
    /// Restores the persisted collection, seeding it when nothing usable is
    /// stored. Only a failed seed write is reported.
    pub fn load(kv: S) -> Result<Self, StorageError> {
        let mut store = Self {
            kv,
            notes: Vec::new(),
            current: None,
        };

        match store.read_notes() {
            Some(notes) => {
                store.notes = notes;
                let remembered = match store.kv.get(keys::CURRENT_ID) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!("reading current note id failed: {e}");
                        None
                    }
                };
                store.current = remembered
                    .filter(|id| store.index_of(id).is_some())
                    .or_else(|| store.notes.first().map(|n| n.id.clone()));
                info!(count = store.notes.len(), "loaded notes");
            }
            None => {
                store.notes = seed_notes();
                store.save()?;
                let showcase = store.notes.get(1).map(|n| n.id.clone());
                store.set_current(showcase)?;
                info!("seeded default notes");
            }
        }
        Ok(store)
    }

    fn read_notes(&self) -> Option<Vec<Note>> {
        let raw = match self.kv.get(keys::NOTES) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("reading notes failed, falling back to seed: {e}");
                return None;
            }
        };
        let mut notes: Vec<Note> = match serde_json::from_str(&raw) {
            Ok(notes) => notes,
            Err(e) => {
                warn!("stored notes are malformed, falling back to seed: {e}");
                return None;
            }
        };
        if notes.is_empty() {
            return None;
        }

        let mut seen = HashSet::new();
        for i in 0..notes.len() {
            if notes[i].id.is_empty() || seen.contains(&notes[i].id) {
                let fresh = mint_id(|c| seen.contains(c) || notes.iter().any(|n| n.id == c));
                warn!(old = %notes[i].id, new = %fresh, "reassigned missing or duplicate id");
                notes[i].id = fresh;
            }
            seen.insert(notes[i].id.clone());
        }
        Some(notes)
    }

    pub fn save(&mut self) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&self.notes).map_err(|source| StorageError::Serialize {
            key: keys::NOTES.to_string(),
            source,
        })?;
        self.kv.set(keys::NOTES, &raw)?;
        debug!(count = self.notes.len(), bytes = raw.len(), "saved notes");
        Ok(())
    }

    fn set_current(&mut self, id: Option<String>) -> Result<(), StorageError> {
        match id.as_deref() {
            Some(id) => self.kv.set(keys::CURRENT_ID, id)?,
            None => self.kv.remove(keys::CURRENT_ID)?,
        }
        self.current = id;
        Ok(())
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.notes.iter().position(|n| n.id == id)
    }

    fn fresh_id(&self) -> String {
        mint_id(|candidate| self.index_of(candidate).is_some())
    }

    #[cfg(test)]
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current(&self) -> Option<&Note> {
        self.current.as_deref().and_then(|id| self.get(id))
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    pub fn kv_mut(&mut self) -> &mut S {
        &mut self.kv
    }

    /// Makes `id` current, or the first note when `id` does not resolve.
    pub fn select(&mut self, id: &str) -> Result<Option<&Note>, StorageError> {
        let target = self
            .index_of(id)
            .or(if self.notes.is_empty() { None } else { Some(0) });
        let Some(idx) = target else {
            return Ok(None);
        };
        self.set_current(Some(self.notes[idx].id.clone()))?;
        Ok(Some(&self.notes[idx]))
    }

    pub fn create(&mut self, title: &str) -> Result<&Note, StorageError> {
        let note = Note::new(self.fresh_id(), title, String::new());
        let id = note.id.clone();
        self.notes.push(note);
        self.save()?;
        self.set_current(Some(id.clone()))?;
        info!(%id, "created note");
        let idx = self.notes.len() - 1;
        Ok(&self.notes[idx])
    }

    pub fn rename(&mut self, id: &str, new_title: &str) -> Result<bool, StorageError> {
        let Some(idx) = self.index_of(id) else {
            return Ok(false);
        };
        let note = &mut self.notes[idx];
        note.title = normalize_title(new_title);
        note.touch();
        self.save()?;
        Ok(true)
    }

    /// Commits edited content; the debounced autosave lands here.
    pub fn update_content(&mut self, id: &str, content: String) -> Result<bool, StorageError> {
        let Some(idx) = self.index_of(id) else {
            return Ok(false);
        };
        let note = &mut self.notes[idx];
        note.content = content;
        note.touch();
        self.save()?;
        Ok(true)
    }

    pub fn delete(&mut self, id: &str) -> Result<bool, StorageError> {
        let Some(idx) = self.index_of(id) else {
            return Ok(false);
        };
        self.notes.remove(idx);
        if self.notes.is_empty() {
            let replacement = Note::new(self.fresh_id(), "", String::new());
            self.notes.push(replacement);
        }
        self.save()?;
        let first = self.notes.first().map(|n| n.id.clone());
        self.set_current(first)?;
        info!(%id, "deleted note");
        Ok(true)
    }

    /// Case-insensitive substring search over title and content, newest first.
    pub fn search(&self, query: &str) -> Vec<&Note> {
        let needle = query.trim().to_lowercase();
        let mut out: Vec<&Note> = self.notes.iter().filter(|n| n.matches(&needle)).collect();
        out.sort_by(|a, b| by_recency(a, b));
        out
    }

    /// Merges externally supplied records, skipping entries without a title.
    /// Returns how many were accepted.
    pub fn import_batch(&mut self, entries: &[Value]) -> Result<usize, StorageError> {
        let mut taken: HashSet<String> = self.notes.iter().map(|n| n.id.clone()).collect();
        let mut accepted = Vec::new();

        for entry in entries {
            let Some(fields) = entry.as_object() else {
                continue;
            };
            let Some(title) = fields.get("title").filter(|v| is_truthy(v)) else {
                continue;
            };

            let supplied = fields
                .get("id")
                .filter(|v| v.is_string() || v.is_number())
                .map(coerce_text)
                .filter(|id| !id.is_empty() && !taken.contains(id));
            let id = supplied.unwrap_or_else(|| mint_id(|c| taken.contains(c)));
            taken.insert(id.clone());

            let content = fields
                .get("content")
                .filter(|v| is_truthy(v))
                .map(coerce_text)
                .unwrap_or_default();
            let updated_at = fields
                .get("updatedAt")
                .filter(|v| is_truthy(v))
                .map(coerce_text)
                .unwrap_or_else(now_timestamp);

            accepted.push(Note {
                id,
                title: coerce_text(title),
                content,
                updated_at,
            });
        }

        let count = accepted.len();
        self.notes.extend(accepted);
        self.save()?;
        info!(count, skipped = entries.len() - count, "imported notes");
        Ok(count)
    }

    pub fn import_json(&mut self, raw: &str) -> Result<usize, ImportError> {
        let parsed: Value = serde_json::from_str(raw)?;
        let Value::Array(entries) = parsed else {
            return Err(ImportError::NotAnArray);
        };
        Ok(self.import_batch(&entries)?)
    }

    pub fn export_all(&self) -> Vec<Note> {
        self.notes.clone()
    }

    /// Full records for `ids` in storage order.
    pub fn export_subset(&self, ids: &[String]) -> Result<Vec<Note>, ExportError> {
        if ids.is_empty() {
            return Err(ExportError::EmptySelection);
        }
        Ok(self
            .notes
            .iter()
            .filter(|n| ids.contains(&n.id))
            .cloned()
            .collect())
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn coerce_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::{ExportError, ExportScope, ImportError, NoteStore};
    use crate::core::note::Note;
    use crate::io::{KeyValueStore, MemoryKvStore, keys};

    fn stored(notes: &[(&str, &str, &str)]) -> MemoryKvStore {
        let notes: Vec<Note> = notes
            .iter()
            .map(|(id, title, ts)| Note {
                id: (*id).into(),
                title: (*title).into(),
                content: format!("body of {title}"),
                updated_at: (*ts).into(),
            })
            .collect();
        MemoryKvStore::with_value(keys::NOTES, &serde_json::to_string(&notes).expect("json"))
    }

    fn three_notes() -> NoteStore<MemoryKvStore> {
        NoteStore::load(stored(&[
            ("a", "Alpha", "2025-01-01T00:00:00.000Z"),
            ("b", "Beta", "2025-03-01T00:00:00.000Z"),
            ("c", "Gamma", "2025-02-01T00:00:00.000Z"),
        ]))
        .expect("load")
    }

    fn assert_unique_ids(store: &NoteStore<MemoryKvStore>) {
        let ids: HashSet<_> = store.notes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), store.len());
    }

    #[test]
    fn first_run_seeds_two_notes_and_selects_the_second() {
        let store = NoteStore::load(MemoryKvStore::new()).expect("load");
        assert_eq!(store.len(), 2);
        assert_eq!(store.current_id(), Some(store.notes()[1].id.as_str()));
        assert_eq!(store.kv().writes(keys::NOTES), 1);
        let persisted = store.kv().get(keys::CURRENT_ID).expect("get");
        assert_eq!(persisted.as_deref(), store.current_id());
    }

    #[test]
    fn clearing_the_selection_removes_the_stored_id() {
        let mut store = NoteStore::load(MemoryKvStore::new()).expect("load");
        store.set_current(None).expect("clear");
        assert_eq!(store.current_id(), None);
        assert_eq!(store.kv().get(keys::CURRENT_ID).expect("get"), None);
    }

    #[test]
    fn corrupt_or_empty_storage_falls_back_to_seed() {
        for raw in ["{not json", "[]", "{\"id\":\"x\"}", "null"] {
            let store =
                NoteStore::load(MemoryKvStore::with_value(keys::NOTES, raw)).expect("load");
            assert_eq!(store.len(), 2, "payload {raw:?}");
        }
    }

    #[test]
    fn remembered_selection_is_restored_or_falls_back_to_first() {
        let mut kv = stored(&[
            ("a", "Alpha", "2025-01-01T00:00:00.000Z"),
            ("b", "Beta", "2025-01-02T00:00:00.000Z"),
        ]);
        kv.set(keys::CURRENT_ID, "b").expect("set");
        let store = NoteStore::load(kv).expect("load");
        assert_eq!(store.current_id(), Some("b"));

        let mut kv = stored(&[("a", "Alpha", "2025-01-01T00:00:00.000Z")]);
        kv.set(keys::CURRENT_ID, "gone").expect("set");
        let store = NoteStore::load(kv).expect("load");
        assert_eq!(store.current_id(), Some("a"));
    }

    #[test]
    fn save_of_loaded_store_keeps_the_same_records() {
        let mut store = three_notes();
        let before: Vec<Note> =
            serde_json::from_str(&store.kv().get(keys::NOTES).expect("get").expect("some"))
                .expect("parse");
        store.save().expect("save");
        let after: Vec<Note> =
            serde_json::from_str(&store.kv().get(keys::NOTES).expect("get").expect("some"))
                .expect("parse");
        assert_eq!(before, after);
    }

    #[test]
    fn duplicate_stored_ids_are_repaired_on_load() {
        let store = NoteStore::load(stored(&[
            ("a", "One", "2025-01-01T00:00:00.000Z"),
            ("a", "Two", "2025-01-01T00:00:00.000Z"),
            ("", "Three", "2025-01-01T00:00:00.000Z"),
        ]))
        .expect("load");
        assert_eq!(store.len(), 3);
        assert_unique_ids(&store);
        assert_eq!(store.notes()[0].id, "a");
    }

    #[test]
    fn create_appends_persists_and_selects() {
        let mut store = three_notes();
        let id = store.create("  Shopping  ").expect("create").id.clone();
        let note = store.get(&id).expect("created");
        assert_eq!(note.title, "Shopping");
        assert!(note.content.is_empty());
        assert_eq!(store.current_id(), Some(id.as_str()));
        assert_eq!(store.notes().last().map(|n| n.id.as_str()), Some(id.as_str()));
        assert_eq!(store.kv().writes(keys::NOTES), 1);

        let blank = store.create("   ").expect("create").title.clone();
        assert_eq!(blank, "Untitled");
    }

    #[test]
    fn rename_and_update_touch_the_timestamp() {
        let mut store = three_notes();
        assert!(store.rename("a", " ").expect("rename"));
        let note = store.get("a").expect("a");
        assert_eq!(note.title, "Untitled");
        assert_ne!(note.updated_at, "2025-01-01T00:00:00.000Z");

        assert!(store.update_content("c", "new body".into()).expect("update"));
        let note = store.get("c").expect("c");
        assert_eq!(note.content, "new body");
        assert_ne!(note.updated_at, "2025-02-01T00:00:00.000Z");

        assert!(!store.rename("zzz", "x").expect("rename"));
        assert!(!store.update_content("zzz", "x".into()).expect("update"));
        assert_eq!(store.kv().writes(keys::NOTES), 2);
    }

    #[test]
    fn delete_selects_the_first_remaining_note() {
        let mut store = three_notes();
        store.select("c").expect("select");
        assert!(store.delete("c").expect("delete"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.current_id(), Some("a"));
        assert!(!store.delete("c").expect("delete again"));
    }

    #[test]
    fn deleting_the_last_note_leaves_a_blank_current_one() {
        let mut store = NoteStore::load(stored(&[("only", "Only", "2025-01-01T00:00:00.000Z")]))
            .expect("load");
        assert!(store.delete("only").expect("delete"));
        assert_eq!(store.len(), 1);
        let note = &store.notes()[0];
        assert_ne!(note.id, "only");
        assert_eq!(note.title, "Untitled");
        assert!(note.content.is_empty());
        assert_eq!(store.current_id(), Some(note.id.as_str()));
    }

    #[test]
    fn collection_never_empties_across_create_and_delete() {
        let mut store = three_notes();
        for round in 0..6 {
            if round % 2 == 0 {
                store.create("tmp").expect("create");
            }
            let ids: Vec<String> = store.notes().iter().map(|n| n.id.clone()).collect();
            for id in ids {
                store.delete(&id).expect("delete");
                assert!(store.len() >= 1);
                assert!(store.current().is_some());
            }
        }
    }

    #[test]
    fn select_unknown_id_falls_back_to_first() {
        let mut store = three_notes();
        let picked = store.select("nope").expect("select").map(|n| n.id.clone());
        assert_eq!(picked.as_deref(), Some("a"));
        assert_eq!(store.kv().get(keys::CURRENT_ID).expect("get").as_deref(), Some("a"));
    }

    #[test]
    fn empty_search_lists_everything_newest_first() {
        let store = three_notes();
        let ids: Vec<_> = store.search("").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
        let ids: Vec<_> = store.search("   ").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_body() {
        let store = three_notes();
        let ids: Vec<_> = store.search("GAMMA").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["c"]);
        let ids: Vec<_> = store.search("body of").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
        assert!(store.search("delta").is_empty());
    }

    #[test]
    fn import_drops_untitled_entries() {
        let mut store = three_notes();
        let count = store
            .import_json(r#"[{"title":"X"},{"content":"no title"}]"#)
            .expect("import");
        assert_eq!(count, 1);
        assert_eq!(store.len(), 4);
        let imported = store.notes().last().expect("last");
        assert_eq!(imported.title, "X");
        assert!(imported.content.is_empty());
        assert!(!imported.updated_at.is_empty());
        assert_eq!(store.current_id(), Some("a"));
    }

    #[test]
    fn import_keeps_free_ids_and_remints_colliding_ones() {
        let mut store = three_notes();
        let count = store
            .import_batch(&[
                json!({"id": "fresh", "title": "Kept", "content": "x", "updatedAt": "2020-01-01T00:00:00.000Z"}),
                json!({"id": "a", "title": "Clash with existing"}),
                json!({"id": "dup", "title": "First dup"}),
                json!({"id": "dup", "title": "Second dup"}),
                json!({"id": "", "title": "Empty id"}),
            ])
            .expect("import");
        assert_eq!(count, 5);
        assert_unique_ids(&store);

        let kept = store.get("fresh").expect("kept id");
        assert_eq!(kept.updated_at, "2020-01-01T00:00:00.000Z");
        assert_eq!(store.get("a").map(|n| n.title.as_str()), Some("Alpha"));
        assert_eq!(store.get("dup").map(|n| n.title.as_str()), Some("First dup"));
    }

    #[test]
    fn import_coerces_non_string_fields() {
        let mut store = three_notes();
        let count = store
            .import_batch(&[
                json!({"id": 42, "title": 7, "content": true}),
                json!({"title": 0}),
                json!({"title": false}),
                json!({"title": null}),
                json!("just a string"),
                json!(null),
            ])
            .expect("import");
        assert_eq!(count, 1);
        let note = store.get("42").expect("numeric id");
        assert_eq!(note.title, "7");
        assert_eq!(note.content, "true");
    }

    #[test]
    fn import_persists_once_per_batch() {
        let mut store = three_notes();
        store
            .import_batch(&[json!({"title": "one"}), json!({"title": "two"})])
            .expect("import");
        assert_eq!(store.kv().writes(keys::NOTES), 1);
    }

    #[test]
    fn import_rejects_non_array_payloads_without_merging() {
        let mut store = three_notes();
        let err = store.import_json(r#"{"title":"X"}"#).expect_err("object");
        assert!(matches!(err, ImportError::NotAnArray));
        assert_eq!(err.to_string(), "Invalid file format");

        let err = store.import_json("not json").expect_err("garbage");
        assert!(matches!(err, ImportError::Parse(_)));

        assert_eq!(store.len(), 3);
        assert_eq!(store.kv().writes(keys::NOTES), 0);
    }

    #[test]
    fn export_subset_requires_a_selection() {
        let store = three_notes();
        assert_eq!(store.export_subset(&[]), Err(ExportError::EmptySelection));

        let picked = store
            .export_subset(&["c".to_string(), "a".to_string()])
            .expect("subset");
        let ids: Vec<_> = picked.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
        assert_eq!(picked[0].content, "body of Alpha");
        assert_eq!(store.export_all().len(), 3);
    }

    #[test]
    fn export_file_names_reflect_scope() {
        assert_eq!(ExportScope::All.file_name(), "notebook-notes-all.json");
        assert_eq!(
            ExportScope::Selected(2).file_name(),
            "notebook-notes-selected-2.json"
        );
    }
}
