use std::path::PathBuf;

/// Sync core configuration
///
/// # Environment variables
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | WORK_DIR | ./data | Directory holding the local database |
/// | DB_FILE | guest-sync.redb | Local database file name |
/// | LOG_LEVEL | info | Log level / env-filter directive |
/// | LOG_JSON | false | Emit JSON log lines |
/// | LOG_DIR | (unset) | Daily rolling log files in this directory |
/// | GUESTS_COLLECTION | guests | Remote guest collection |
/// | AUDIT_COLLECTION | audit_logs | Remote audit log collection |
/// | SYNC_INTERVAL_SECS | 30 | Periodic queue drain interval |
/// | AUDIT_BUFFER_SIZE | 256 | Audit channel capacity |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/guests LOG_LEVEL=debug cargo run -p guest-sync
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for the local database
    pub work_dir: String,
    /// Local database file name (inside `work_dir`)
    pub db_file: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    /// Remote collection holding guest documents
    pub guests_collection: String,
    /// Remote collection receiving audit entries
    pub audit_collection: String,
    /// Periodic drain interval while online
    pub sync_interval_secs: u64,
    /// Audit channel capacity; entries beyond it are dropped with a warning
    pub audit_buffer_size: usize,
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            db_file: std::env::var("DB_FILE").unwrap_or_else(|_| "guest-sync.redb".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: std::env::var("LOG_DIR").ok(),
            guests_collection: std::env::var("GUESTS_COLLECTION")
                .unwrap_or_else(|_| "guests".into()),
            audit_collection: std::env::var("AUDIT_COLLECTION")
                .unwrap_or_else(|_| "audit_logs".into()),
            sync_interval_secs: std::env::var("SYNC_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            audit_buffer_size: std::env::var("AUDIT_BUFFER_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(256),
        }
    }

    /// Override the working directory (tests, inspector runs against a copy)
    pub fn with_work_dir(work_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config
    }

    /// Full path of the local database
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join(&self.db_file)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
