use chrono::SubsecRound;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{format_timestamp, parse_datetime, to_i64},
    migrations::run_migrations,
};
use crate::error::StorageError;
use crate::metrics::{Reading, StoredSample};
use crate::store::SampleStore;

fn row_to_sample(row: &Row) -> Result<StoredSample, StorageError> {
    let timestamp: String = row.get("timestamp")?;

    Ok(StoredSample {
        id: row.get("id")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
        cpu_pct: row.get("cpu_usage")?,
        ram_pct: row.get("ram_usage")?,
        disk_pct: row.get("disk_usage")?,
    })
}

impl SampleStore for Database {
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        self.execute(run_migrations).await
    }

    async fn append(&self, reading: Reading) -> Result<StoredSample, StorageError> {
        // Stored at millisecond precision; hand back exactly what a later read returns.
        let record = Reading {
            timestamp: reading.timestamp.trunc_subsecs(3),
            ..reading
        };
        self.write(move |tx| {
            tx.execute(
                "INSERT INTO system_data (timestamp, cpu_usage, ram_usage, disk_usage)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    format_timestamp(&record.timestamp),
                    record.cpu_pct,
                    record.ram_pct,
                    record.disk_pct,
                ],
            )?;
            Ok(StoredSample::from_reading(tx.last_insert_rowid(), record))
        })
        .await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<StoredSample>, StorageError> {
        let limit = to_i64(limit)?;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, cpu_usage, ram_usage, disk_usage
                 FROM system_data
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit])?;
            let mut samples = Vec::new();
            while let Some(row) = rows.next()? {
                samples.push(row_to_sample(row)?);
            }

            Ok(samples)
        })
        .await
    }
}
