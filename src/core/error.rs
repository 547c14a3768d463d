use std::path::PathBuf;
use thiserror::Error;

// ── Storage ─────────────────────────────────────────────

/// Failures of the local persisted store (`versions` / `mods` tables).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to encode library list: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Registry lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Corrupt registry row for {version}: {reason}")]
    CorruptRow { version: String, reason: String },

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

// ── Catalog ─────────────────────────────────────────────

/// Failures while listing installable variants from an upstream ecosystem.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Unexpected upstream payload from {url}: {reason}")]
    Decode { url: String, reason: String },
}

// ── Installation ────────────────────────────────────────

/// Failures of an installation run. None of them leaves a registry record behind.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream format changed: {0}")]
    UpstreamFormatChanged(String),

    #[error("{program} exited unsuccessfully (code {code:?})")]
    ExternalProcessFailed { program: String, code: Option<i32> },

    #[error("Failed to start {program}: {source}")]
    ProcessSpawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Unsupported ecosystem: {0}")]
    UnsupportedEcosystem(String),

    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Installation cancelled")]
    Cancelled,

    #[error("{0} timed out")]
    TimedOut(String),

    #[error("Another installation is already running")]
    Busy,
}

impl From<reqwest::Error> for InstallError {
    fn from(err: reqwest::Error) -> Self {
        InstallError::Network(err.to_string())
    }
}

impl From<FetchError> for InstallError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Decode { url, reason } => {
                InstallError::UpstreamFormatChanged(format!("{url}: {reason}"))
            }
            other => InstallError::Network(other.to_string()),
        }
    }
}

impl InstallError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InstallError::Io {
            path: path.into(),
            source,
        }
    }
}

// ── Launch ──────────────────────────────────────────────

/// Failures while turning a registry entry into a process invocation.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Version {0} is not installed")]
    NotInstalled(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cannot build launch command: {0}")]
    Compose(String),

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

// ── Configuration ───────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type StorageResult<T> = Result<T, StorageError>;
pub type InstallResult<T> = Result<T, InstallError>;
