//! Repository for the `devices` table.

use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::errors::Result;

/// One row of `devices`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceRow {
    /// Device id (UUID v7).
    pub id: String,
    /// Network identity, set once paired.
    pub jid: Option<String>,
    /// Display name reported by the network.
    pub push_name: Option<String>,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// RFC 3339 pairing time.
    pub paired_at: Option<String>,
}

const COLUMNS: &str = "id, jid, push_name, created_at, paired_at";

/// Stateless; every method takes `&Connection`.
pub struct DeviceRepo;

impl DeviceRepo {
    /// Oldest device row, if any.
    pub fn first(conn: &Connection) -> Result<Option<DeviceRow>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM devices ORDER BY created_at, id LIMIT 1"),
                [],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Insert a fresh unpaired device.
    pub fn create(conn: &Connection) -> Result<DeviceRow> {
        let row = DeviceRow {
            id: Uuid::now_v7().to_string(),
            jid: None,
            push_name: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            paired_at: None,
        };
        let _ = conn.execute(
            "INSERT INTO devices (id, created_at) VALUES (?1, ?2)",
            params![row.id, row.created_at],
        )?;
        Ok(row)
    }

    /// Whether any device has completed pairing.
    pub fn any_paired(conn: &Connection) -> Result<bool> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM devices WHERE jid IS NOT NULL)",
            [],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Record a completed pairing. Returns whether the device existed.
    pub fn mark_paired(conn: &Connection, id: &str, jid: &str) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE devices SET jid = ?1, paired_at = ?2 WHERE id = ?3",
            params![jid, chrono::Utc::now().to_rfc3339(), id],
        )?;
        Ok(changed > 0)
    }

    /// Delete a device. Returns whether a row was removed.
    pub fn delete(conn: &Connection, id: &str) -> Result<bool> {
        let changed = conn.execute("DELETE FROM devices WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeviceRow> {
        Ok(DeviceRow {
            id: row.get(0)?,
            jid: row.get(1)?,
            push_name: row.get(2)?,
            created_at: row.get(3)?,
            paired_at: row.get(4)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
