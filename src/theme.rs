//! Light/dark color scheme preference

use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::constants::storage;
use crate::persistence::{KeyValueStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
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

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

#[derive(Debug)]
pub struct ThemeManager {
    current: Theme,
}

impl ThemeManager {
    /// Restore the stored preference. An unreadable or unknown value falls back
    /// to the light theme.
    pub fn load(store: &impl KeyValueStore) -> Self {
        let default = Theme::default();
        let current = match store.get_or(storage::THEME_KEY, default.as_str()) {
            Ok(value) => value.parse().unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring stored theme");
                default
            }),
            Err(e) => {
                warn!(error = %e, "Theme preference unavailable, using default");
                default
            }
        };
        info!(theme = %current, "Theme loaded");
        Self { current }
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    /// Switch to `theme` and persist it
    pub fn apply(&mut self, theme: Theme, store: &mut impl KeyValueStore) -> Result<(), StoreError> {
        self.current = theme;
        store.set(storage::THEME_KEY, theme.as_str())?;
        info!(theme = %theme, "Theme applied");
        Ok(())
    }

    pub fn toggle(&mut self, store: &mut impl KeyValueStore) -> Result<Theme, StoreError> {
        let next = self.current.toggled();
        self.apply(next, store)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_defaults_to_light() {
        let store = MemoryStore::new();
        assert_eq!(ThemeManager::load(&store).current(), Theme::Light);
    }

    #[test]
    fn test_toggle_persists() {
        let mut store = MemoryStore::new();
        let mut manager = ThemeManager::load(&store);

        assert_eq!(manager.toggle(&mut store).unwrap(), Theme::Dark);
        assert_eq!(store.entries.get("theme").map(String::as_str), Some("dark"));

        let reloaded = ThemeManager::load(&store);
        assert_eq!(reloaded.current(), Theme::Dark);
    }

    #[test]
    fn test_unknown_stored_value_falls_back() {
        let mut store = MemoryStore::new();
        store.entries.insert("theme".to_string(), "sepia".to_string());
        assert_eq!(ThemeManager::load(&store).current(), Theme::Light);
    }

    #[test]
    fn test_unreadable_store_falls_back() {
        let store = MemoryStore {
            fail_reads: true,
            ..MemoryStore::default()
        };
        assert_eq!(ThemeManager::load(&store).current(), Theme::Light);
    }

    #[test]
    fn test_toggle_write_failure_still_switches_in_session() {
        let mut store = MemoryStore {
            fail_writes: true,
            ..MemoryStore::default()
        };
        let mut manager = ThemeManager::load(&store);
        assert!(manager.toggle(&mut store).is_err());
        assert_eq!(manager.current(), Theme::Dark);
    }

    #[test]
    fn test_parse_theme() {
        assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert_eq!(" light ".parse::<Theme>().unwrap(), Theme::Light);
        assert!("blue".parse::<Theme>().is_err());
    }
}
