use std::path::PathBuf;

use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::store::VersionRegistry;
use crate::core::error::StorageResult;

/// A downloaded mod. Linked to installed versions only through the free-text
/// `version` field; no referential integrity is enforced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModRecord {
    pub name: String,
    pub version: String,
    pub file_path: PathBuf,
    pub mod_id: Option<String>,
}

impl VersionRegistry {
    /// Insert or replace by mod name.
    pub fn save_mod(&self, record: &ModRecord) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            r"
            INSERT OR REPLACE INTO mods (name, version, file_path, mod_id)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                record.name,
                record.version,
                record.file_path.to_string_lossy(),
                record.mod_id,
            ],
        )?;
        tx.commit()?;

        debug!("Registered mod {} ({})", record.name, record.version);
        Ok(())
    }

    pub fn get_mod(&self, name: &str) -> StorageResult<Option<ModRecord>> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT name, version, file_path, mod_id FROM mods WHERE name = ?1",
                params![name],
                row_to_mod,
            )
            .optional()?;
        Ok(found)
    }

    pub fn list_mods(&self) -> StorageResult<Vec<ModRecord>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT name, version, file_path, mod_id FROM mods ORDER BY id ASC")?;
        let mods = stmt.query_map([], row_to_mod)?;
        Ok(mods.collect::<Result<Vec<_>, _>>()?)
    }
}

fn row_to_mod(row: &rusqlite::Row<'_>) -> rusqlite::Result<ModRecord> {
    Ok(ModRecord {
        name: row.get(0)?,
        version: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        file_path: PathBuf::from(row.get::<_, Option<String>>(2)?.unwrap_or_default()),
        mod_id: row.get(3)?,
    })
}
