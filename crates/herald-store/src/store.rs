use herald_session::{DeviceIdentity, IdentityStoreError, SessionStore};
use tracing::{debug, info};

use crate::connection::{self, ConnectionConfig, ConnectionPool, PooledConnection};
use crate::devices::{DeviceRepo, DeviceRow};
use crate::errors::Result;
use crate::migrations::run_migrations;

/// [`SessionStore`] over a migrated `SQLite` pool.
#[derive(Clone, Debug)]
pub struct SqliteSessionStore {
    pool: ConnectionPool,
}

impl SqliteSessionStore {
    /// Open (creating if needed) the database at `path` and migrate it.
    ///
    /// `":memory:"` selects a private in-memory database.
    pub fn open(path: &str, config: &ConnectionConfig) -> Result<Self> {
        let pool = connection::open(path, config)?;
        let applied = run_migrations(&*pool.get()?)?;
        info!(path, applied, "session store ready");
        Ok(Self { pool })
    }

    /// Wrap an existing pool, migrating it first.
    pub fn from_pool(pool: ConnectionPool) -> Result<Self> {
        let _ = run_migrations(&*pool.get()?)?;
        Ok(Self { pool })
    }

    /// Underlying pool.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    fn conn(&self) -> std::result::Result<PooledConnection, IdentityStoreError> {
        self.pool.get().map_err(IdentityStoreError::new)
    }
}

impl From<DeviceRow> for DeviceIdentity {
    fn from(row: DeviceRow) -> Self {
        Self {
            device_id: row.id,
            jid: row.jid,
            push_name: row.push_name,
        }
    }
}

impl SessionStore for SqliteSessionStore {
    fn identity_exists(&self) -> std::result::Result<bool, IdentityStoreError> {
        DeviceRepo::any_paired(&*self.conn()?).map_err(IdentityStoreError::new)
    }

    fn fetch_identity(&self) -> std::result::Result<DeviceIdentity, IdentityStoreError> {
        let conn = self.conn()?;
        let row = match DeviceRepo::first(&conn).map_err(IdentityStoreError::new)? {
            Some(row) => row,
            None => {
                let row = DeviceRepo::create(&conn).map_err(IdentityStoreError::new)?;
                info!(device_id = %row.id, "created new device record");
                row
            }
        };
        Ok(row.into())
    }

    fn record_pairing(&self, device_id: &str, jid: &str) -> std::result::Result<(), IdentityStoreError> {
        let updated =
            DeviceRepo::mark_paired(&*self.conn()?, device_id, jid).map_err(IdentityStoreError::new)?;
        if !updated {
            return Err(IdentityStoreError::new(format!("device {device_id} not found")));
        }
        debug!(device_id, "pairing recorded");
        Ok(())
    }

    fn clear_identity(&self, device_id: &str) -> std::result::Result<(), IdentityStoreError> {
        let _ = DeviceRepo::delete(&*self.conn()?, device_id).map_err(IdentityStoreError::new)?;
        info!(device_id, "device record cleared");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::connection::IN_MEMORY;

    fn store() -> SqliteSessionStore {
        SqliteSessionStore::open(IN_MEMORY, &ConnectionConfig::default()).unwrap()
    }

    #[test]
    fn fetch_creates_then_reuses_device() {
        let store = store();
        let first = store.fetch_identity().unwrap();
        assert!(!first.is_paired());
        assert_eq!(store.fetch_identity().unwrap(), first);
        assert!(!store.identity_exists().unwrap());
    }

    #[test]
    fn pairing_round_trip() {
        let store = store();
        let device = store.fetch_identity().unwrap();
        store.record_pairing(&device.device_id, "628123@s.net").unwrap();

        assert!(store.identity_exists().unwrap());
        assert_eq!(
            store.fetch_identity().unwrap().jid.as_deref(),
            Some("628123@s.net")
        );
    }

    #[test]
    fn record_pairing_unknown_device_fails() {
        let store = store();
        assert_matches!(store.record_pairing("missing", "x"), Err(IdentityStoreError { .. }));
    }

    #[test]
    fn clear_identity_forgets_device() {
        let store = store();
        let device = store.fetch_identity().unwrap();
        store.record_pairing(&device.device_id, "628123@s.net").unwrap();
        store.clear_identity(&device.device_id).unwrap();

        assert!(!store.identity_exists().unwrap());
        let fresh = store.fetch_identity().unwrap();
        assert_ne!(fresh.device_id, device.device_id);
        assert!(!fresh.is_paired());
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.db");
        let path = path.to_str().unwrap();

        let device = {
            let store = SqliteSessionStore::open(path, &ConnectionConfig::default()).unwrap();
            let device = store.fetch_identity().unwrap();
            store.record_pairing(&device.device_id, "628123@s.net").unwrap();
            device
        };

        let reopened = SqliteSessionStore::open(path, &ConnectionConfig::default()).unwrap();
        assert!(reopened.identity_exists().unwrap());
        assert_eq!(reopened.fetch_identity().unwrap().device_id, device.device_id);
    }
}
