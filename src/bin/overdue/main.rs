mod args;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use overdue::{now_millis, App, HttpPersister, JobStore, Persister, SqliteStorage, Storage, StoragePersister};
use tokio::net::TcpListener;
use tracing::{error, info, warn, Level};

use crate::args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Logging
    if args.debug {
        tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .init();
    } else {
        tracing_subscriber::fmt().json().init();
    }

    if let Err(error) = begin(args).await {
        error!(?error, "encountered runtime error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn begin(args: Args) -> Result<()> {
    let persister: Arc<dyn Persister> = match &args.persist_url {
        Some(url) => {
            info!(url = %url, "Persisting to remote endpoint");
            Arc::new(HttpPersister::new(url))
        }
        None => {
            let storage: Arc<dyn Storage> = Arc::new(
                SqliteStorage::new(&args.database)
                    .await
                    .with_context(|| format!("opening {}", args.database))?,
            );
            Arc::new(StoragePersister::new(storage))
        }
    };

    // A failed bootstrap is the same as no data.
    let snapshot = match persister.load().await {
        Ok(snapshot) => snapshot,
        Err(error) => {
            warn!(%error, "failed to load snapshot, starting empty");
            None
        }
    };
    let store = JobStore::from_snapshot(now_millis(), snapshot.as_deref());

    let mut app = App::new(store, persister);
    app.start_clock(Duration::from_secs(args.tick_minutes * 60));

    let listener = TcpListener::bind((args.listen, args.port)).await?;
    info!(addr = %listener.local_addr()?, "listening");

    let router = app.dashboard();
    let shutdown = app.shutdown_token();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
    });

    app.wait_for_shutdown().await;

    server.await.context("joining server task")?.context("serving")?;
    Ok(())
}
