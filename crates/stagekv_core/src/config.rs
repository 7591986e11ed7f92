//! Engine configuration.

use std::path::PathBuf;

/// Configuration for opening a staging engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the store directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether each durable apply is synced to disk (safer but slower).
    /// When false the commit log is only flushed to the OS.
    pub sync_on_commit: bool,

    /// Number of commit history entries kept in memory.
    pub max_history: usize,

    /// File name of the JSON-lines history sink inside the store
    /// directory. `None` keeps history in memory only.
    pub history_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_commit: true,
            max_history: 10_000,
            history_file: Some(PathBuf::from("commits.jsonl")),
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the store directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to sync the commit log on every durable apply.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets how many history entries stay in memory.
    #[must_use]
    pub const fn max_history(mut self, value: usize) -> Self {
        self.max_history = value;
        self
    }

    /// Sets (or disables) the history sink file name.
    #[must_use]
    pub fn history_file(mut self, name: Option<PathBuf>) -> Self {
        self.history_file = name;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.create_if_missing);
        assert!(config.sync_on_commit);
        assert_eq!(config.max_history, 10_000);
        assert_eq!(config.history_file, Some(PathBuf::from("commits.jsonl")));
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .create_if_missing(false)
            .sync_on_commit(false)
            .max_history(5)
            .history_file(None);

        assert!(!config.create_if_missing);
        assert!(!config.sync_on_commit);
        assert_eq!(config.max_history, 5);
        assert!(config.history_file.is_none());
    }
}
