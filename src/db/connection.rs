use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tokio::sync::oneshot;

use crate::error::StorageError;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

/// SQLite-backed sample store. All statements run on one dedicated thread,
/// so readers never observe a half-written row.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    /// Opens (creating if needed) the database file. The schema is not touched
    /// until [`crate::store::SampleStore::ensure_schema`] is called.
    pub fn open(db_path: PathBuf) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let path_for_thread = db_path.clone();
        Self::spawn(db_path, move || Connection::open(&path_for_thread))
    }

    /// Private in-memory database, mostly useful for tests and dry runs.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::spawn(PathBuf::from(":memory:"), Connection::open_in_memory)
    }

    fn spawn<F>(db_path: PathBuf, open: F) -> Result<Self, StorageError>
    where
        F: FnOnce() -> rusqlite::Result<Connection> + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let display_path = db_path.display().to_string();

        let worker = thread::Builder::new()
            .name("sysrec-db".into())
            .spawn(move || {
                let mut conn = match open() {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }

                if ready_tx.send(Ok(())).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .map_err(|_| StorageError::WorkerGone)?;

        ready_rx
            .recv()
            .map_err(|_| StorageError::WorkerGone)?
            .map_err(|source| StorageError::Open {
                path: display_path,
                source,
            })?;

        info!("Database opened at {}", db_path.display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    /// How long a statement waits on another connection's lock before
    /// failing with `SQLITE_BUSY`. Keep it below the caller's store timeout
    /// so a blocked write fails instead of landing after the caller gave up.
    pub async fn set_busy_timeout(&self, timeout: Duration) -> Result<(), StorageError> {
        self.execute(move |conn| {
            conn.busy_timeout(timeout)?;
            Ok(())
        })
        .await
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        self.dispatch(move |conn, _| task(conn)).await
    }

    /// Runs `task` in an immediate transaction. The transaction is committed
    /// only if the caller is still waiting for the result; otherwise it is
    /// rolled back and nothing is written.
    pub async fn write<F, T>(&self, task: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        self.dispatch(move |conn, abandoned| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let value = task(&tx)?;
            if abandoned() {
                warn!("DB caller gave up before commit; rolling back");
                return Err(StorageError::Abandoned);
            }
            tx.commit()?;
            Ok(value)
        })
        .await
    }

    async fn dispatch<F, T>(&self, task: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Connection, &dyn Fn() -> bool) -> Result<T, StorageError>
            + Send
            + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            // Caller timed out while this was queued.
            if reply_tx.is_closed() {
                warn!("Skipping DB task: caller dropped before it ran");
                return;
            }
            let result = task(conn, &|| reply_tx.is_closed());
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender.send(command).map_err(|_| StorageError::WorkerGone)?;

        reply_rx.await.map_err(|_| StorageError::WorkerGone)?
    }
}
