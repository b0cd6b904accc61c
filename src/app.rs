use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::persist::Persister;
use crate::snapshot::Snapshot;
use crate::store::{Effect, Event, JobStore, View};

const COMMAND_BUFFER: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Store loop is not running")]
    Closed,
}

#[derive(Debug)]
pub(crate) enum Command {
    Dispatch(Event),
    View(oneshot::Sender<View>),
    Snapshot(oneshot::Sender<Snapshot>),
}

/// Cheap, cloneable access to the running store
#[derive(Clone)]
pub struct AppHandle {
    commands: mpsc::Sender<Command>,
}

impl AppHandle {
    pub async fn dispatch(&self, event: Event) -> Result<(), AppError> {
        self.commands
            .send(Command::Dispatch(event))
            .await
            .map_err(|_| AppError::Closed)
    }

    pub async fn view(&self) -> Result<View, AppError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::View(tx))
            .await
            .map_err(|_| AppError::Closed)?;
        rx.await.map_err(|_| AppError::Closed)
    }

    pub async fn snapshot(&self) -> Result<Snapshot, AppError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Snapshot(tx))
            .await
            .map_err(|_| AppError::Closed)?;
        rx.await.map_err(|_| AppError::Closed)
    }
}

/// Owns the store task, the persistence writer and the clock.
///
/// The store lives in exactly one task and handles one command at a time,
/// so it needs no locking. Persistence never blocks that task: each
/// snapshot is handed to a writer task which always sends the newest one.
pub struct App {
    handle: AppHandle,
    shutdown: CancellationToken,
    store_handle: Option<JoinHandle<()>>,
    writer_handle: Option<JoinHandle<()>>,
    clock_handle: Option<JoinHandle<()>>,
}

impl App {
    /// Spawn the store loop. The clock is not started until `start_clock()`.
    pub fn new(store: JobStore, persister: Arc<dyn Persister>) -> Self {
        let shutdown = CancellationToken::new();
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshots_tx, snapshots_rx) = watch::channel(None);

        let store_loop = StoreLoop {
            store,
            commands: commands_rx,
            snapshots: snapshots_tx,
        };
        let store_handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { store_loop.run(shutdown).await })
        };
        let writer_handle = tokio::spawn(write_snapshots(persister, snapshots_rx));

        info!("Store loop started");

        Self {
            handle: AppHandle {
                commands: commands_tx,
            },
            shutdown,
            store_handle: Some(store_handle),
            writer_handle: Some(writer_handle),
            clock_handle: None,
        }
    }

    pub fn handle(&self) -> AppHandle {
        self.handle.clone()
    }

    /// Start refreshing the store's time every `interval`
    pub fn start_clock(&mut self, interval: Duration) {
        if self.clock_handle.is_some() {
            return;
        }

        let clock = Clock::new(self.handle.commands.clone()).with_interval(interval);
        let shutdown = self.shutdown.clone();
        self.clock_handle = Some(tokio::spawn(async move { clock.run(shutdown).await }));
    }

    pub fn dashboard(&self) -> axum::Router {
        crate::dashboard::router(self.handle())
    }

    /// Get the shutdown token for external shutdown control
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop the clock and the store loop, then let the writer flush the
    /// last snapshot. Commands already queued are still handled.
    pub async fn shutdown(&mut self) {
        info!("Initiating shutdown");
        self.shutdown.cancel();

        for handle in [
            self.clock_handle.take(),
            self.store_handle.take(),
            self.writer_handle.take(),
        ]
        .into_iter()
        .flatten()
        {
            if let Err(e) = handle.await {
                error!(error = %e, "Task failed during shutdown");
            }
        }

        info!("Shutdown complete");
    }

    /// Wait for Ctrl+C, then shut down
    pub async fn wait_for_shutdown(&mut self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
        }

        self.shutdown().await;
    }
}

struct StoreLoop {
    store: JobStore,
    commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<Option<String>>,
}

impl StoreLoop {
    async fn run(mut self, shutdown: CancellationToken) {
        loop {
            let command = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Store loop shutting down");
                    break;
                }
                command = self.commands.recv() => match command {
                    Some(command) => command,
                    None => {
                        debug!("All handles dropped, store loop stopping");
                        return;
                    }
                },
            };

            self.handle(command);
        }

        // Refuse new commands, then finish the ones already accepted.
        self.commands.close();
        let mut drained = 0usize;
        while let Some(command) = self.commands.recv().await {
            self.handle(command);
            drained += 1;
        }
        debug!(drained, "Queued commands handled");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Dispatch(event) => {
                if self.store.update(event) == Effect::Persist {
                    self.persist();
                }
            }
            Command::View(reply) => {
                let _ = reply.send(self.store.view());
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.store.snapshot());
            }
        }
    }

    fn persist(&self) {
        match self.store.snapshot().encode() {
            Ok(body) => {
                self.snapshots.send_replace(Some(body));
            }
            Err(e) => error!(error = %e, "Failed to encode snapshot"),
        }
    }
}

/// Send each new snapshot onward. Failures are logged and dropped; the
/// store keeps its state either way. Ends once the store loop is gone and
/// the final snapshot has been sent.
async fn write_snapshots(
    persister: Arc<dyn Persister>,
    mut snapshots: watch::Receiver<Option<String>>,
) {
    while snapshots.changed().await.is_ok() {
        let Some(body) = snapshots.borrow_and_update().clone() else {
            continue;
        };

        match persister.persist(body).await {
            Ok(()) => debug!("Snapshot persisted"),
            Err(e) => warn!(error = %e, "Failed to persist snapshot"),
        }
    }
}
