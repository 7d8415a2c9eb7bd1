//! Sync module for publishing static assets
//!
//! Enumerates local assets and either uploads all of them or clears the
//! bucket. There is no diffing: every run does the full amount of work.

mod engine;
mod prompt;
mod run;

pub use engine::{SyncEngine, SyncError, SyncOptions};
pub use prompt::{ConfirmPrompt, FixedAnswer, TerminalPrompt};
pub use run::{SyncMode, SyncReport, SyncRun, SyncState};

use std::io::Write;

use crate::config::{Credentials, Settings};
use crate::storage::S3Store;

/// Run one sync pass against the configured bucket.
///
/// A dry-run copy never talks to the bucket, so it runs without credentials.
/// Every other mode connects (and probes the bucket) before the prompt.
pub async fn run_from_settings<W: Write>(
    settings: &Settings,
    options: &SyncOptions,
    prompt: &dyn ConfirmPrompt,
    out: &mut W,
) -> Result<SyncReport, SyncError> {
    let mounts = settings.mounts();

    if !options.mode().needs_store() {
        return SyncEngine::offline(&mounts).run(options, prompt, out).await;
    }

    let credentials = Credentials::from_env()?;
    let store = S3Store::connect(&settings.bucket, &credentials).await?;

    SyncEngine::new(&mounts, &store, settings.bucket.acl)
        .run(options, prompt, out)
        .await
}
