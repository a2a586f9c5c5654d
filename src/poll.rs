//! Client-side polling shim — one watcher per "view this alert" session.
//!
//! The portals have no push channel; a viewing screen re-reads the alert row
//! on a fixed interval and mirrors whatever it finds. Each watcher owns
//! exactly one timer: it stops on its own when the alert reaches a terminal
//! status or the row is gone (legacy hard-delete, treated as cancellation),
//! and the handle stops it on screen teardown so no interval leaks.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::EmergencyAlert;

/// Read side of the alert store, as seen by a poller.
pub trait AlertReader: Send + Sync + 'static {
    fn read_alert(&self, id: &Uuid) -> Result<Option<EmergencyAlert>, DatabaseError>;
}

/// A shared SQLite connection is a valid reader.
impl AlertReader for Mutex<Connection> {
    fn read_alert(&self, id: &Uuid) -> Result<Option<EmergencyAlert>, DatabaseError> {
        let conn = self
            .lock()
            .map_err(|_| DatabaseError::ConstraintViolation("connection lock poisoned".into()))?;
        db::get_alert(&conn, id)
    }
}

/// What the watcher last observed.
#[derive(Debug, Clone)]
pub enum AlertUpdate {
    /// Fresh row state.
    Snapshot(EmergencyAlert),
    /// The row no longer exists — implicit cancellation. Final update.
    Gone,
}

/// Handle to a running poll session. Dropping it (screen teardown) stops the
/// timer; so does the alert reaching a terminal state.
pub struct AlertWatcher {
    updates: watch::Receiver<Option<AlertUpdate>>,
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl AlertWatcher {
    /// Start polling `id` through `reader` every `interval`.
    pub fn start(reader: Arc<dyn AlertReader>, id: Uuid, interval: Duration) -> Self {
        let (update_tx, updates) = watch::channel(None);
        let (stop_tx, stop_rx) = watch::channel(false);

        let task = tokio::spawn(poll_loop(reader, id, interval, update_tx, stop_rx));

        Self {
            updates,
            stop_tx,
            task: Some(task),
        }
    }

    /// Receiver of observed updates. `None` until the first read completes.
    pub fn updates(&self) -> watch::Receiver<Option<AlertUpdate>> {
        self.updates.clone()
    }

    /// Whether the poll task is still running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop polling and wait for the task to finish.
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for AlertWatcher {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn poll_loop(
    reader: Arc<dyn AlertReader>,
    id: Uuid,
    interval: Duration,
    update_tx: watch::Sender<Option<AlertUpdate>>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop_rx.changed() => {
                if *stop_rx.borrow() {
                    tracing::debug!(alert_id = %id, "Poll session stopped by handle");
                    return;
                }
            }
            _ = ticker.tick() => {
                match reader.read_alert(&id) {
                    Ok(Some(alert)) => {
                        let terminal = alert.status.is_terminal();
                        let _ = update_tx.send(Some(AlertUpdate::Snapshot(alert)));
                        if terminal {
                            tracing::debug!(alert_id = %id, "Poll session reached terminal status");
                            return;
                        }
                    }
                    Ok(None) => {
                        // Row deleted out from under us: treat as cancelled,
                        // stop rather than retry forever.
                        let _ = update_tx.send(Some(AlertUpdate::Gone));
                        tracing::debug!(alert_id = %id, "Polled alert disappeared");
                        return;
                    }
                    Err(e) => {
                        // Transient read failure — keep the session alive.
                        tracing::warn!(alert_id = %id, error = %e, "Poll read failed");
                    }
                }
            }
        }
    }
}
