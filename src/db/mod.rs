//! SQLite catalog of runs and written artifacts.
//!
//! One worker thread owns the connection. Queries are awaited through
//! [`Database::execute`]; artifact rows written on the capture and click paths
//! go through [`Database::submit`] and never block their caller.

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc, Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use rusqlite::Connection;
use tokio::sync::oneshot;

mod helpers;
mod migrations;
mod models;
mod repositories;

pub use models::{ArtifactKind, ArtifactRecord, Run, RunStatus};

use migrations::run_migrations;

pub const CATALOG_FILE: &str = "catalog.sqlite3";

/// How long a statement waits on a lock held by another process (a
/// concurrent `history` reading the same file).
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

type Query = Box<dyn FnOnce(&mut Connection) + Send + 'static>;
type DetachedWrite = Box<dyn FnOnce(&mut Connection) -> Result<()> + Send + 'static>;

enum Job {
    /// Caller awaits the reply through a oneshot captured in the closure.
    Query(Query),
    /// Nobody waits; failures are logged and counted.
    Detached { what: &'static str, write: DetachedWrite },
    Close,
}

struct Worker {
    jobs: mpsc::Sender<Job>,
    handle: Mutex<Option<JoinHandle<()>>>,
    failed_writes: Arc<AtomicU64>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        let handle = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(handle) = handle else {
            return;
        };

        // Close is queued behind pending detached writes, so they land first.
        if self.jobs.send(Job::Close).is_err() {
            error!("Catalog worker exited before close");
        }
        if let Err(join_err) = handle.join() {
            error!("Failed to join catalog worker: {join_err:?}");
        }
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("failed to open catalog {}", path.display()))?;

    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        warn!("Failed to enable WAL mode: {err}");
    }
    if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
        warn!("Failed to enable foreign keys: {err}");
    }
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set catalog busy timeout")?;
    Ok(conn)
}

fn work(mut conn: Connection, jobs: mpsc::Receiver<Job>, failed_writes: &AtomicU64) {
    while let Ok(job) = jobs.recv() {
        match job {
            Job::Query(query) => query(&mut conn),
            Job::Detached { what, write } => {
                if let Err(err) = write(&mut conn) {
                    failed_writes.fetch_add(1, Ordering::Relaxed);
                    error!("Catalog write ({what}) failed: {err:#}");
                }
            }
            Job::Close => break,
        }
    }
    info!("Catalog worker shutting down");
}

#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
}

impl Database {
    /// Opens (creating if needed) the catalog at `db_path` and migrates it
    /// before returning.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create catalog directory {}", parent.display())
            })?;
        }

        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let failed_writes = Arc::new(AtomicU64::new(0));

        let thread_path = db_path.clone();
        let thread_failures = Arc::clone(&failed_writes);
        let handle = thread::Builder::new()
            .name("screenshot-ocr-db".into())
            .spawn(move || {
                let opened = open_connection(&thread_path).and_then(|mut conn| {
                    run_migrations(&mut conn).context("failed to migrate catalog")?;
                    Ok(conn)
                });

                match opened {
                    Ok(conn) => {
                        if ready_tx.send(Ok(())).is_ok() {
                            work(conn, jobs_rx, &thread_failures);
                        }
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                    }
                }
            })
            .context("failed to spawn catalog worker thread")?;

        ready_rx
            .recv()
            .context("catalog worker exited before signaling readiness")??;

        info!("Catalog ready at {}", db_path.display());

        Ok(Self {
            worker: Arc::new(Worker {
                jobs: jobs_tx,
                handle: Mutex::new(Some(handle)),
                failed_writes,
            }),
        })
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let query: Query = Box::new(move |conn| {
            // The caller may have given up; the result is simply dropped then.
            let _ = reply_tx.send(task(conn));
        });

        self.worker
            .jobs
            .send(Job::Query(query))
            .map_err(|_| anyhow!("catalog worker is gone"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("catalog worker dropped the query"))?
    }

    /// Queue a write without waiting for it. Failures are logged on the worker
    /// thread and counted in [`Self::failed_writes`].
    pub fn submit<F>(&self, what: &'static str, write: F)
    where
        F: FnOnce(&mut Connection) -> Result<()> + Send + 'static,
    {
        let job = Job::Detached {
            what,
            write: Box::new(write),
        };
        if self.worker.jobs.send(job).is_err() {
            self.worker.failed_writes.fetch_add(1, Ordering::Relaxed);
            error!("Failed to queue catalog write ({what}): worker is gone");
        }
    }

    /// Detached writes that failed so far.
    pub fn failed_writes(&self) -> u64 {
        self.worker.failed_writes.load(Ordering::Relaxed)
    }
}
