use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use super::schema;
use crate::core::error::{StorageError, StorageResult};
use crate::core::loaders::fabric::FABRIC_MAIN_CLASS;
use crate::core::loaders::forge::FORGE_FALLBACK_MAIN_CLASS;
use crate::core::loaders::vanilla::VANILLA_MAIN_CLASS;
use crate::core::variant::{Ecosystem, VariantKey, VariantRecord};

/// Durable registry of installed variants and downloaded mods.
///
/// One connection behind one mutex: every call holds the lock for its whole
/// statement sequence and nothing else (no network, no process spawns).
/// Share it as an `Arc<VersionRegistry>`.
pub struct VersionRegistry {
    pub(super) conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl VersionRegistry {
    /// Open (or create) the database file and migrate its schema.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        info!("Opened version registry at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// In-memory registry (tests, dry runs).
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(super) fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockPoisoned(format!("registry lock: {e}")))
    }

    /// Insert or replace the record for `record.key`.
    ///
    /// Runs inside a transaction; on any error the transaction is dropped
    /// and rolled back, leaving the previous row untouched.
    pub fn put(&self, record: &VariantRecord) -> StorageResult<()> {
        let libraries = serde_json::to_string(&record.auxiliary_libraries)?;
        let installed_at = chrono::Utc::now().to_rfc3339();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            r"
            INSERT OR REPLACE INTO versions
                (version, type, path, main_class, libraries, installed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                record.key.version,
                record.key.ecosystem.as_str(),
                record.install_path.to_string_lossy(),
                record.entry_point,
                libraries,
                installed_at,
            ],
        )?;
        tx.commit()?;

        debug!("Registered {} at {:?}", record.key, record.install_path);
        Ok(())
    }

    /// Exact lookup by (ecosystem, version).
    pub fn get(&self, key: &VariantKey) -> StorageResult<Option<VariantRecord>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                r"
                SELECT version, type, path, main_class, libraries
                FROM versions
                WHERE type = ?1 AND version = ?2
                ",
                params![key.ecosystem.as_str(), key.version],
                RawVersionRow::from_row,
            )
            .optional()?;

        row.map(RawVersionRow::into_record).transpose()
    }

    /// Lookup by bare version string. When several ecosystems installed the
    /// same version string, the most recently installed one wins.
    pub fn find_version(&self, version: &str) -> StorageResult<Option<VariantRecord>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                r"
                SELECT version, type, path, main_class, libraries
                FROM versions
                WHERE version = ?1
                ORDER BY installed_at DESC, id DESC
                LIMIT 1
                ",
                params![version],
                RawVersionRow::from_row,
            )
            .optional()?;

        row.map(RawVersionRow::into_record).transpose()
    }

    /// Every installed variant, newest install first. Rows that cannot be
    /// decoded are logged and left out; `get` still reports them.
    pub fn list_versions(&self) -> StorageResult<Vec<VariantRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r"
            SELECT version, type, path, main_class, libraries
            FROM versions
            ORDER BY installed_at DESC, id DESC
            ",
        )?;
        let rows = stmt
            .query_map([], RawVersionRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match row.into_record() {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping unreadable registry row: {}", e);
                    None
                }
            })
            .collect())
    }
}

/// Row as stored; decoded into a `VariantRecord` outside the rusqlite callback.
struct RawVersionRow {
    version: String,
    ecosystem: Option<String>,
    path: Option<String>,
    main_class: Option<String>,
    libraries: Option<String>,
}

impl RawVersionRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            version: row.get(0)?,
            ecosystem: row.get(1)?,
            path: row.get(2)?,
            main_class: row.get(3)?,
            libraries: row.get(4)?,
        })
    }

    fn into_record(self) -> StorageResult<VariantRecord> {
        let corrupt = |reason: String| StorageError::CorruptRow {
            version: self.version.clone(),
            reason,
        };

        let ecosystem = self
            .ecosystem
            .as_deref()
            .ok_or_else(|| corrupt("missing type".into()))?
            .parse::<Ecosystem>()
            .map_err(|e| corrupt(e.to_string()))?;

        // Rows written before main_class existed get the ecosystem's usual one.
        let entry_point = match self.main_class.clone().filter(|c| !c.is_empty()) {
            Some(class) => class,
            None => {
                debug!("{} {} has no main_class, using the default", ecosystem, self.version);
                default_entry_point(ecosystem).to_string()
            }
        };

        let auxiliary_libraries = match self.libraries.as_deref() {
            None | Some("") => Vec::new(),
            Some(raw) => serde_json::from_str(raw)?,
        };

        Ok(VariantRecord {
            key: VariantKey {
                ecosystem,
                version: self.version,
            },
            install_path: PathBuf::from(self.path.unwrap_or_default()),
            entry_point,
            auxiliary_libraries,
        })
    }
}

fn default_entry_point(ecosystem: Ecosystem) -> &'static str {
    match ecosystem {
        Ecosystem::Vanilla => VANILLA_MAIN_CLASS,
        Ecosystem::Fabric => FABRIC_MAIN_CLASS,
        Ecosystem::Forge => FORGE_FALLBACK_MAIN_CLASS,
    }
}
