//! Sync engine
//!
//! Publishes every local asset to the bucket, or clears the bucket, one item
//! at a time. A failure stops the run where it is: nothing is rolled back,
//! and a rerun starts from scratch.

use std::io::Write;

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::assets::{self, EnumerateError};
use crate::config::SettingsError;
use crate::domain::MountSet;
use crate::storage::{Acl, RemoteStore, StoreError};

use super::prompt::ConfirmPrompt;
use super::run::{SyncMode, SyncReport, SyncRun};

const CONFIRM_QUESTION: &str = "Are you sure you want to do this?";

/// Errors that abort a sync run
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Configuration(#[from] SettingsError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Enumerate(#[from] EnumerateError),

    #[error("Confirmation prompt failed: {0}")]
    Prompt(String),

    #[error("{0} needs a bucket connection")]
    Offline(SyncMode),

    #[error("Failed to write progress: {0}")]
    Output(#[from] std::io::Error),
}

/// Flags of the sync command
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Skip the confirmation prompt
    pub no_input: bool,
    /// Reserved; accepted but not applied
    pub ignore: Option<String>,
    /// Delete everything remote instead of uploading
    pub clear: bool,
    /// Describe instead of acting
    pub dry_run: bool,
}

impl SyncOptions {
    pub fn mode(&self) -> SyncMode {
        SyncMode::from_flags(self.clear, self.dry_run)
    }
}

/// Publishes the assets of a [`MountSet`] into a [`RemoteStore`]
pub struct SyncEngine<'a, S: RemoteStore + ?Sized> {
    mounts: &'a MountSet,
    store: Option<&'a S>,
    acl: Acl,
}

impl<'a> SyncEngine<'a, dyn RemoteStore> {
    /// An engine without a bucket; only a dry-run copy can run on it
    pub fn offline(mounts: &'a MountSet) -> Self {
        Self {
            mounts,
            store: None,
            acl: Acl::default(),
        }
    }
}

impl<'a, S: RemoteStore + ?Sized> SyncEngine<'a, S> {
    pub fn new(mounts: &'a MountSet, store: &'a S, acl: Acl) -> Self {
        Self {
            mounts,
            store: Some(store),
            acl,
        }
    }

    fn bucket(&self) -> &str {
        self.store.map_or("-", |store| store.bucket())
    }

    fn store(&self, mode: SyncMode) -> Result<&'a S, SyncError> {
        self.store.ok_or(SyncError::Offline(mode))
    }

    /// Run one sync pass, writing per-item progress to `out`.
    ///
    /// Declining the prompt is not an error: the report comes back with
    /// `declined` set and no store call has been made.
    #[instrument(skip_all, fields(bucket = %self.bucket(), mode = %options.mode()))]
    pub async fn run<W: Write>(
        &self,
        options: &SyncOptions,
        prompt: &dyn ConfirmPrompt,
        out: &mut W,
    ) -> Result<SyncReport, SyncError> {
        let mut run = SyncRun::new(options.mode());

        if let Some(pattern) = options.ignore.as_deref() {
            warn!(pattern, "Ignore patterns are reserved and not applied");
        }

        if !options.no_input {
            run.confirm();
            writeln!(out, "{}", confirm_banner(run.mode))?;
            if !prompt.confirm(CONFIRM_QUESTION)? {
                run.decline();
                info!(run_id = %run.id, "Sync declined");
                return Ok(run.report());
            }
        }

        run.start();
        info!(run_id = %run.id, "Starting {} of bucket {}", run.mode, self.bucket());

        let result = match run.mode {
            SyncMode::Upload => self.upload(&mut run, out).await,
            SyncMode::DryRunCopy => self.dry_run_copy(&mut run, out),
            SyncMode::Clear => self.clear(&mut run, out).await,
            SyncMode::DryRunClear => self.dry_run_clear(&mut run, out).await,
        };

        match result {
            Ok(()) => {
                run.complete();
                info!(
                    run_id = %run.id,
                    count = run.processed,
                    duration_ms = run.duration_ms().unwrap_or(0),
                    "Completed {}",
                    run.mode
                );
                Ok(run.report())
            }
            Err(e) => {
                run.fail(&e.to_string());
                error!(run_id = %run.id, processed = run.processed, "Sync failed: {}", e);
                Err(e)
            }
        }
    }

    /// Enumerate everything first so a bad mount aborts before any upload
    async fn upload<W: Write>(&self, run: &mut SyncRun, out: &mut W) -> Result<(), SyncError> {
        let store = self.store(run.mode)?;
        let records = assets::collect(self.mounts)?;
        debug!("Enumerated {} assets", records.len());

        store.set_bucket_acl(self.acl).await?;

        for record in &records {
            writeln!(out, "Copying '{}'", record.local_path.display())?;
            store.put(&record.remote_key, &record.local_path, self.acl).await?;
            run.increment_processed();
        }

        Ok(())
    }

    fn dry_run_copy<W: Write>(&self, run: &mut SyncRun, out: &mut W) -> Result<(), SyncError> {
        for record in assets::walk(self.mounts) {
            let record = record?;
            writeln!(out, "Pretending to copy '{}'", record.local_path.display())?;
            run.increment_processed();
        }
        Ok(())
    }

    /// Local files are not consulted: everything listed is deleted
    async fn clear<W: Write>(&self, run: &mut SyncRun, out: &mut W) -> Result<(), SyncError> {
        let store = self.store(run.mode)?;
        let objects = store.list().await?;
        debug!("Listed {} remote objects", objects.len());

        for object in &objects {
            writeln!(out, "Deleting '{}'", object.key)?;
            store.delete(&object.key).await?;
            run.increment_processed();
        }

        Ok(())
    }

    async fn dry_run_clear<W: Write>(&self, run: &mut SyncRun, out: &mut W) -> Result<(), SyncError> {
        for object in self.store(run.mode)?.list().await? {
            writeln!(out, "Pretending to delete '{}'", object.key)?;
            run.increment_processed();
        }
        Ok(())
    }
}

fn confirm_banner(mode: SyncMode) -> &'static str {
    if mode.is_clear() {
        "\nYou have requested to delete every file in the destination bucket\n\
         as specified in your settings.\n\n\
         This will remove all remote static files!\n"
    } else {
        "\nYou have requested to collect static files at the destination\n\
         location as specified in your settings.\n\n\
         This will overwrite existing files!\n"
    }
}
