// ─── Registry Schema ───
// Table creation plus migration for databases written by older launcher
// builds. Columns are added in place; a table keyed on `version` alone is
// copied once into the (type, version) layout. Rows are never dropped.

use std::collections::HashSet;

use rusqlite::Connection;
use tracing::{info, warn};

use crate::core::error::StorageResult;

/// Columns every `versions` table must carry, in creation order.
const VERSION_COLUMNS: &[(&str, &str)] = &[
    ("version", "TEXT"),
    ("type", "TEXT"),
    ("path", "TEXT"),
    ("main_class", "TEXT"),
    ("libraries", "TEXT"),
    ("installed_at", "TEXT"),
];

const MOD_COLUMNS: &[(&str, &str)] = &[
    ("name", "TEXT"),
    ("version", "TEXT"),
    ("file_path", "TEXT"),
    ("mod_id", "TEXT"),
];

const CREATE_VERSIONS: &str = r"
    CREATE TABLE IF NOT EXISTS versions (
        id INTEGER PRIMARY KEY,
        version TEXT NOT NULL,
        type TEXT NOT NULL,
        path TEXT,
        main_class TEXT,
        libraries TEXT,
        installed_at TEXT
    );
";

pub(crate) fn initialize(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(CREATE_VERSIONS)?;
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS mods (
            id INTEGER PRIMARY KEY,
            name TEXT UNIQUE,
            version TEXT,
            file_path TEXT,
            mod_id TEXT
        );
        ",
    )?;

    add_missing_columns(conn, "versions", VERSION_COLUMNS)?;
    add_missing_columns(conn, "mods", MOD_COLUMNS)?;

    if keyed_on_version_alone(conn)? {
        rebuild_versions(conn)?;
    }

    conn.execute_batch(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_versions_variant ON versions(type, version);",
    )?;

    Ok(())
}

fn existing_columns(conn: &Connection, table: &str) -> StorageResult<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    Ok(names.collect::<Result<HashSet<_>, _>>()?)
}

/// Whether some unique index on `versions` covers only the `version` column,
/// which would let one ecosystem's install replace another's.
fn keyed_on_version_alone(conn: &Connection) -> StorageResult<bool> {
    let mut stmt = conn.prepare("PRAGMA index_list(versions)")?;
    let indexes = stmt
        .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, bool>(2)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    for (name, unique) in indexes {
        if !unique {
            continue;
        }
        let mut info = conn.prepare(&format!("PRAGMA index_info(\"{name}\")"))?;
        let columns = info
            .query_map([], |row| row.get::<_, String>(2))?
            .collect::<Result<Vec<_>, _>>()?;
        if columns == ["version"] {
            return Ok(true);
        }
    }
    Ok(false)
}

fn rebuild_versions(conn: &Connection) -> StorageResult<()> {
    warn!("Migrating registry: versions table is keyed on version alone, rebuilding");
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch("ALTER TABLE versions RENAME TO versions_legacy;")?;
    tx.execute_batch(CREATE_VERSIONS)?;
    let copied = tx.execute(
        r"
        INSERT INTO versions (id, version, type, path, main_class, libraries, installed_at)
        SELECT id, COALESCE(version, ''), COALESCE(type, ''), path, main_class, libraries, installed_at
        FROM versions_legacy
        ",
        [],
    )?;
    tx.execute_batch("DROP TABLE versions_legacy;")?;
    tx.commit()?;
    info!("Migrating registry: copied {} version rows", copied);
    Ok(())
}

fn add_missing_columns(
    conn: &Connection,
    table: &str,
    columns: &[(&str, &str)],
) -> StorageResult<()> {
    let present = existing_columns(conn, table)?;

    for (name, decl) in columns {
        if present.contains(*name) {
            continue;
        }
        info!("Migrating registry: adding column {}.{}", table, name);
        conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {name} {decl}"))?;
    }

    Ok(())
}
