//! Shared state for the alert API layer.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::api::error::ApiError;

/// Shared context for all API routes.
///
/// SQLite serializes writers anyway, so a single mutex-guarded connection is
/// enough here; the CAS transition keeps concurrent accepts correct even with
/// multiple API processes pointing at the same database file.
#[derive(Clone)]
pub struct ApiContext {
    db: Arc<Mutex<Connection>>,
}

impl ApiContext {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".into()))
    }

    /// The underlying shared connection, usable as a `poll::AlertReader`.
    pub fn shared_db(&self) -> Arc<Mutex<Connection>> {
        self.db.clone()
    }
}
