//! Server configuration.

/// Configuration for the request handler.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum key length in bytes.
    pub max_key_len: usize,
    /// Maximum encoded value size in bytes.
    pub max_value_size: usize,
    /// Whether `dump_committed` and `commit_history` are served.
    pub debug_views: bool,
    /// Maximum number of records in one history response.
    pub max_history_entries: usize,
}

impl ServerConfig {
    /// Creates a configuration with default limits and debug views off.
    pub fn new() -> Self {
        Self {
            max_key_len: 1024,
            max_value_size: 1024 * 1024,
            debug_views: false,
            max_history_entries: 100,
        }
    }

    /// Sets the maximum key length.
    pub fn with_max_key_len(mut self, len: usize) -> Self {
        self.max_key_len = len;
        self
    }

    /// Sets the maximum encoded value size.
    pub fn with_max_value_size(mut self, size: usize) -> Self {
        self.max_value_size = size;
        self
    }

    /// Enables the read-only debug views.
    pub fn with_debug_views(mut self, enabled: bool) -> Self {
        self.debug_views = enabled;
        self
    }

    /// Sets the maximum history page size.
    pub fn with_max_history_entries(mut self, max: usize) -> Self {
        self.max_history_entries = max;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
