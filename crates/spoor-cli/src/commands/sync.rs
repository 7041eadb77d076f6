use std::path::Path;
use std::time::Duration;

use spoor_core::db::{Database, LibSqlReportRepository};
use spoor_core::remote::SupabaseRemote;
use spoor_core::sync::{SyncEngine, SyncOptions, SyncSummary};
use tokio_util::sync::CancellationToken;

use crate::commands::common::{format_summary_lines, load_remote_context, open_database, RemoteContext};
use crate::error::CliError;

pub async fn run_sync(
    watch: bool,
    interval_secs: u64,
    profile: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let context = load_remote_context(profile)?;
    let db = open_database(db_path).await?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    if !watch {
        let summary = sync_once(&context, &db, cancel).await?;
        print_summary(&summary);
        return Ok(());
    }

    watch_connectivity(&context, &db, Duration::from_secs(interval_secs.max(1)), cancel).await
}

/// Probe the remote every `interval` and run a sync on each offline-to-online edge.
async fn watch_connectivity(
    context: &RemoteContext,
    db: &Database,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    let probe = SupabaseRemote::anonymous(context.config.clone())?;
    let mut ticker = tokio::time::interval(interval);
    let mut online = false;
    println!(
        "Watching {} every {}s (Ctrl-C to stop)",
        context.config.supabase_url,
        interval.as_secs()
    );

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let reachable = probe.is_reachable().await;
        if reachable && !online {
            tracing::info!(profile = %context.profile_name, "Remote reachable; syncing");
            match sync_once(context, db, cancel.clone()).await {
                Ok(summary) => print_summary(&summary),
                Err(error) => eprintln!("Sync failed: {error}"),
            }
        } else if !reachable && online {
            tracing::info!("Remote unreachable; waiting for connectivity");
        }
        online = reachable;
    }

    println!("Stopped watching");
    Ok(())
}

async fn sync_once(
    context: &RemoteContext,
    db: &Database,
    cancel: CancellationToken,
) -> Result<SyncSummary, CliError> {
    let session = context
        .auth
        .restore_session()
        .await
        .map_err(|error| CliError::Auth(error.to_string()))?
        .ok_or(CliError::NotSignedIn)?;
    let remote = SupabaseRemote::new(context.config.clone(), session.access_token)?;
    let options = SyncOptions {
        cancel,
        ..SyncOptions::from_config(&context.config)
    };

    let engine = SyncEngine::new(
        LibSqlReportRepository::new(db.connection()),
        remote,
        context.auth.clone(),
    )
    .with_options(options);
    Ok(engine.run().await?)
}

fn print_summary(summary: &SyncSummary) {
    for line in format_summary_lines(summary) {
        println!("{line}");
    }
}
