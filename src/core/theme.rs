use tracing::warn;

use crate::io::{KeyValueStore, StorageError, keys};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Anything other than `"light"` reads as dark.
    pub fn parse(raw: &str) -> Self {
        if raw.trim() == "light" {
            Theme::Light
        } else {
            Theme::Dark
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Guesses from `COLORFGBG` ("fg;bg"), where background 7 or 15 is light.
    pub fn detect_terminal(colorfgbg: Option<&str>) -> Self {
        let bg = colorfgbg.and_then(|v| v.rsplit(';').next()).map(str::trim);
        match bg {
            Some("7") | Some("15") => Theme::Light,
            _ => Theme::Dark,
        }
    }

    pub fn load(kv: &impl KeyValueStore, colorfgbg: Option<&str>) -> Self {
        match kv.get(keys::THEME) {
            Ok(Some(raw)) => Theme::parse(&raw),
            Ok(None) => Theme::detect_terminal(colorfgbg),
            Err(e) => {
                warn!("reading theme failed: {e}");
                Theme::detect_terminal(colorfgbg)
            }
        }
    }

    pub fn persist(self, kv: &mut impl KeyValueStore) -> Result<(), StorageError> {
        kv.set(keys::THEME, self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Theme;
    use crate::io::{KeyValueStore, MemoryKvStore, keys};

    #[test]
    fn unknown_values_read_as_dark() {
        assert_eq!(Theme::parse("light"), Theme::Light);
        assert_eq!(Theme::parse("dark"), Theme::Dark);
        assert_eq!(Theme::parse("solarized"), Theme::Dark);
    }

    #[test]
    fn terminal_background_probe() {
        assert_eq!(Theme::detect_terminal(Some("0;15")), Theme::Light);
        assert_eq!(Theme::detect_terminal(Some("0;default;7")), Theme::Light);
        assert_eq!(Theme::detect_terminal(Some("15;0")), Theme::Dark);
        assert_eq!(Theme::detect_terminal(None), Theme::Dark);
    }

    #[test]
    fn stored_preference_wins_over_probe() {
        let mut kv = MemoryKvStore::new();
        assert_eq!(Theme::load(&kv, Some("0;15")), Theme::Light);

        Theme::Light.toggled().persist(&mut kv).expect("persist");
        assert_eq!(kv.get(keys::THEME).expect("get").as_deref(), Some("dark"));
        assert_eq!(Theme::load(&kv, Some("0;15")), Theme::Dark);
    }
}
