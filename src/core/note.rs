use std::cmp::Ordering;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: String,
}

impl Note {
    pub fn new(id: String, title: &str, content: String) -> Self {
        Self {
            id,
            title: normalize_title(title),
            content,
            updated_at: now_timestamp(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = now_timestamp();
    }

    pub fn updated_instant(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.updated_at)
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            UNTITLED
        } else {
            &self.title
        }
    }

    pub fn matches(&self, needle_lower: &str) -> bool {
        needle_lower.is_empty()
            || format!("{} {}", self.title, self.content)
                .to_lowercase()
                .contains(needle_lower)
    }
}

pub fn normalize_title(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Most recently updated first; unparseable timestamps sink to the end.
pub fn by_recency(a: &Note, b: &Note) -> Ordering {
    match (a.updated_instant(), b.updated_instant()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Mints an 8-character id not rejected by `taken`.
pub fn mint_id(taken: impl Fn(&str) -> bool) -> String {
    loop {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(8);
        if !taken(&id) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use super::{Note, by_recency, mint_id, normalize_title, now_timestamp, parse_timestamp};

    fn note_at(id: &str, ts: &str) -> Note {
        Note {
            id: id.into(),
            title: id.into(),
            content: String::new(),
            updated_at: ts.into(),
        }
    }

    #[test]
    fn titles_are_trimmed_and_defaulted() {
        assert_eq!(normalize_title("  Plans "), "Plans");
        assert_eq!(normalize_title("   "), "Untitled");
        assert_eq!(normalize_title(""), "Untitled");
    }

    #[test]
    fn timestamps_are_millisecond_utc() {
        let ts = now_timestamp();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2025-01-01T00:00:00.000Z".len());
        assert!(parse_timestamp(&ts).is_some());
    }

    #[test]
    fn recency_orders_newest_first_and_garbage_last() {
        let old = note_at("old", "2024-01-01T00:00:00.000Z");
        let new = note_at("new", "2025-06-01T10:00:00.000Z");
        let bad = note_at("bad", "yesterday");
        assert_eq!(by_recency(&new, &old), Ordering::Less);
        assert_eq!(by_recency(&old, &new), Ordering::Greater);
        assert_eq!(by_recency(&bad, &old), Ordering::Greater);

        let mut all = vec![bad.clone(), old.clone(), new.clone()];
        all.sort_by(by_recency);
        let ids: Vec<_> = all.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["new", "old", "bad"]);
    }

    #[test]
    fn matching_covers_title_and_content() {
        let mut n = note_at("Groceries", "2025-01-01T00:00:00.000Z");
        n.content = "Buy MILK".into();
        assert!(n.matches("milk"));
        assert!(n.matches("groceries"));
        assert!(n.matches("groceries buy"));
        assert!(n.matches(""));
        assert!(!n.matches("bread"));
    }

    #[test]
    fn minted_ids_skip_taken_values() {
        let first = mint_id(|_| false);
        assert_eq!(first.len(), 8);
        let second = mint_id(|candidate| candidate == first);
        assert_ne!(first, second);
    }
}
