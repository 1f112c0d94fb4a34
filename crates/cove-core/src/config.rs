use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub data_dir: PathBuf,
    /// How long a cache entry stays live before the next backing read.
    pub cache_life: Duration,
    /// Grace window granted to a stale entry while one task refreshes it,
    /// so concurrent readers don't pile onto the database.
    pub cache_refresh: Duration,
    /// Customized-content app identifiers that are handled by dedicated
    /// processors elsewhere and must not be stored as chat messages.
    pub system_apps: Vec<String>,
}

impl CoreConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            cache_life: Duration::from_secs(300),
            cache_refresh: Duration::from_secs(32),
            system_apps: Vec::new(),
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new("cove_data")
    }
}
