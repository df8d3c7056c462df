use log::info;
use rusqlite::{Connection, Transaction};

use crate::error::StorageError;

const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Brings the schema up to [`CURRENT_SCHEMA_VERSION`]. Safe to call on every start.
pub fn run_migrations(conn: &mut Connection) -> Result<(), StorageError> {
    let mut version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version > CURRENT_SCHEMA_VERSION {
        return Err(StorageError::SchemaTooNew {
            found: version,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if version == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;

    while version < CURRENT_SCHEMA_VERSION {
        let next_version = version + 1;
        apply_migration(&tx, next_version)?;
        info!("Applied schema migration v{next_version}");
        version = next_version;
    }

    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;
    tx.commit()?;

    Ok(())
}

fn apply_migration(tx: &Transaction<'_>, version: i32) -> Result<(), StorageError> {
    match version {
        1 => {
            tx.execute_batch(include_str!("schemas/schema_v1.sql"))?;
            Ok(())
        }
        _ => Err(StorageError::Corrupt(format!(
            "unknown migration target version: {version}"
        ))),
    }
}
