//! Per-record upload pipeline and run loop.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::FutureExt;

use crate::auth::{AuthProvider, AuthUser};
use crate::db::SyncStore;
use crate::models::{Report, ReportId, ReportMedia, SyncStatus};
use crate::remote::{
    media_object_path, DamageRow, MediaRow, ObservationRow, RemoteError, RemoteResult,
    RemoteStore, ReportRow,
};

use super::guard::RunGuard;
use super::validation::{is_allowed_mime_type, is_safe_identifier};
use super::{RecordError, RecordFailure, SyncError, SyncOptions, SyncReport, SyncSummary};

/// Drives queued reports from the local store to the remote service.
pub struct SyncEngine<S, R, A> {
    store: S,
    remote: R,
    auth: A,
    options: SyncOptions,
    running: AtomicBool,
}

impl<S, R, A> SyncEngine<S, R, A>
where
    S: SyncStore,
    R: RemoteStore,
    A: AuthProvider,
{
    pub fn new(store: S, remote: R, auth: A) -> Self {
        Self {
            store,
            remote,
            auth,
            options: SyncOptions::default(),
            running: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run once and fold the outcome into the trigger-facing report.
    pub async fn run_sync(&self) -> SyncReport {
        SyncReport::from(self.run().await)
    }

    /// Sync every pending or failed report.
    ///
    /// A trigger that arrives while another run is in flight returns an empty
    /// summary without reading the store.
    pub async fn run(&self) -> Result<SyncSummary, SyncError> {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            tracing::debug!("Sync already running; ignoring trigger");
            return Ok(SyncSummary::default());
        };

        let user = self
            .auth
            .current_user()
            .await?
            .ok_or(SyncError::NotAuthenticated)?;
        let pending = self.store.list_pending().await?;
        tracing::info!(
            pending = pending.len(),
            user_id = %user.id,
            "Starting sync run"
        );

        let mut summary = SyncSummary::default();
        for entry in pending {
            if self.options.cancel.is_cancelled() {
                break;
            }
            summary.attempted += 1;

            let report = match entry {
                Ok(report) => report,
                Err(undecoded) => {
                    let error = RecordError::Store(undecoded.error);
                    self.fail_record(&mut summary, &undecoded.id, &error).await;
                    continue;
                }
            };

            let outcome = AssertUnwindSafe(self.sync_record(&user, &report))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(report_id = %report.id, "Panic while syncing report: {message}");
                    Err(RecordError::Panicked(message))
                });

            let outcome = match outcome {
                Ok(()) => self
                    .store
                    .set_report_status(&report.id, SyncStatus::Synced)
                    .await
                    .map_err(RecordError::from),
                Err(error) => Err(error),
            };

            match outcome {
                Ok(()) => {
                    tracing::debug!(report_id = %report.id, "Report synced");
                    summary.synced += 1;
                }
                Err(error) => self.fail_record(&mut summary, &report.id, &error).await,
            }
        }
        summary.cancelled = self.options.cancel.is_cancelled();

        tracing::info!(
            attempted = summary.attempted,
            synced = summary.synced,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Sync run finished"
        );
        Ok(summary)
    }

    async fn fail_record(&self, summary: &mut SyncSummary, report_id: &ReportId, error: &RecordError) {
        tracing::warn!(report_id = %report_id, "Report sync failed: {error}");
        if let Err(store_error) = self
            .store
            .set_report_status(report_id, SyncStatus::Failed)
            .await
        {
            tracing::error!(report_id = %report_id, "Failed to record sync failure: {store_error}");
        }
        summary.failed += 1;
        summary.failures.push(RecordFailure {
            report_id: report_id.clone(),
            reason: error.to_string(),
        });
    }

    async fn sync_record(&self, user: &AuthUser, report: &Report) -> Result<(), RecordError> {
        if report.user_id != user.id {
            return Err(RecordError::OwnerMismatch {
                owner: report.user_id.clone(),
            });
        }
        if !is_safe_identifier(report.id.as_str()) {
            return Err(RecordError::UnsafeIdentifier(report.id.to_string()));
        }

        let row = ReportRow::from(report);
        self.remote_call("report", self.remote.upsert_report(&row))
            .await?;

        // The report row is committed from here on; later failures are mirrored remotely.
        if let Err(error) = self.sync_details(report).await {
            self.mark_remote_failed(&report.id).await;
            return Err(error);
        }
        Ok(())
    }

    async fn sync_details(&self, report: &Report) -> Result<(), RecordError> {
        if let Some(observation) = ObservationRow::from_report(report) {
            self.remote_call("observation", self.remote.upsert_observation(&observation))
                .await?;
        }

        for damage in DamageRow::for_report(report) {
            self.remote_call("damage", self.remote.upsert_damage(&damage))
                .await?;
        }

        for media in self.store.list_media(&report.id).await? {
            if !media.sync_status.needs_sync() {
                tracing::debug!(media_id = %media.id, "Media already uploaded; skipping");
                continue;
            }
            if let Err(error) = self.upload_media(report, &media).await {
                if let Err(store_error) = self
                    .store
                    .set_media_status(&media.id, SyncStatus::Failed)
                    .await
                {
                    tracing::warn!(media_id = %media.id, "Failed to mark media failed: {store_error}");
                }
                return Err(error);
            }
            self.store
                .set_media_status(&media.id, SyncStatus::Synced)
                .await?;
        }
        Ok(())
    }

    async fn upload_media(&self, report: &Report, media: &ReportMedia) -> Result<(), RecordError> {
        if !is_safe_identifier(media.id.as_str()) {
            return Err(RecordError::UnsafeIdentifier(media.id.to_string()));
        }
        if !is_allowed_mime_type(&media.mime_type) {
            return Err(RecordError::DisallowedMimeType {
                media_id: media.id.clone(),
                mime_type: media.mime_type.clone(),
            });
        }
        let bytes = media
            .decode_payload()
            .map_err(|error| RecordError::UndecodablePayload {
                media_id: media.id.clone(),
                reason: error.to_string(),
            })?;

        let path = media_object_path(&report.id, &media.id);
        self.remote_call(
            "media upload",
            self.remote.upload_media(&path, bytes, &media.mime_type),
        )
        .await?;

        let row = MediaRow::new(media, path);
        self.remote_call("media metadata", self.remote.upsert_media_metadata(&row))
            .await?;
        tracing::debug!(media_id = %media.id, path = %row.storage_path, "Media uploaded");
        Ok(())
    }

    /// Mirror a local failure onto the committed remote report row.
    ///
    /// Only the timeout bounds this call: a cancelled run still owes the
    /// remote row its `failed` status.
    async fn mark_remote_failed(&self, report_id: &ReportId) {
        let timeout = self.options.call_timeout;
        let result = tokio::time::timeout(timeout, self.remote.mark_report_failed(report_id.as_str()))
            .await
            .unwrap_or_else(|_| Err(RemoteError::Timeout(timeout)));
        if let Err(error) = result {
            tracing::warn!(report_id = %report_id, "Failed to mark remote report failed: {error}");
        }
    }

    /// Bound a remote call by the configured timeout and the cancellation token.
    async fn remote_call<F>(&self, step: &'static str, call: F) -> Result<(), RecordError>
    where
        F: Future<Output = RemoteResult<()>>,
    {
        let timeout = self.options.call_timeout;
        let result = tokio::select! {
            biased;
            () = self.options.cancel.cancelled() => Err(RemoteError::Cancelled),
            outcome = tokio::time::timeout(timeout, call) => {
                outcome.unwrap_or_else(|_| Err(RemoteError::Timeout(timeout)))
            }
        };
        result.map_err(|source| RecordError::Remote { step, source })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
