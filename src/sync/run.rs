//! Sync run bookkeeping: mode, state and timing of one invocation

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// What a run does once confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Upload every local asset
    Upload,
    /// List what an upload would copy
    DryRunCopy,
    /// Delete every remote object
    Clear,
    /// List what a clear would delete
    DryRunClear,
}

impl SyncMode {
    pub fn from_flags(clear: bool, dry_run: bool) -> Self {
        match (clear, dry_run) {
            (false, false) => SyncMode::Upload,
            (false, true) => SyncMode::DryRunCopy,
            (true, false) => SyncMode::Clear,
            (true, true) => SyncMode::DryRunClear,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, SyncMode::DryRunCopy | SyncMode::DryRunClear)
    }

    pub fn is_clear(&self) -> bool {
        matches!(self, SyncMode::Clear | SyncMode::DryRunClear)
    }

    /// Whether the mode talks to the bucket at all
    pub fn needs_store(&self) -> bool {
        !matches!(self, SyncMode::DryRunCopy)
    }

    /// State the run is in while this mode executes
    pub fn state(&self) -> SyncState {
        match self {
            SyncMode::Upload => SyncState::Upload,
            SyncMode::DryRunCopy => SyncState::DryRunCopy,
            SyncMode::Clear => SyncState::Clear,
            SyncMode::DryRunClear => SyncState::DryRunClear,
        }
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Upload => write!(f, "upload"),
            SyncMode::DryRunCopy => write!(f, "dry_run_copy"),
            SyncMode::Clear => write!(f, "clear"),
            SyncMode::DryRunClear => write!(f, "dry_run_clear"),
        }
    }
}

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Confirm,
    DryRunCopy,
    Upload,
    DryRunClear,
    Clear,
    Done,
    Failed,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncState::Idle => write!(f, "idle"),
            SyncState::Confirm => write!(f, "confirm"),
            SyncState::DryRunCopy => write!(f, "dry_run_copy"),
            SyncState::Upload => write!(f, "upload"),
            SyncState::DryRunClear => write!(f, "dry_run_clear"),
            SyncState::Clear => write!(f, "clear"),
            SyncState::Done => write!(f, "done"),
            SyncState::Failed => write!(f, "failed"),
        }
    }
}

/// One invocation of the sync engine
#[derive(Debug, Clone, Serialize)]
pub struct SyncRun {
    pub id: Uuid,
    pub mode: SyncMode,
    pub state: SyncState,
    /// Items copied or deleted (or that would have been, in a dry run)
    pub processed: usize,
    pub declined: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl SyncRun {
    pub fn new(mode: SyncMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode,
            state: SyncState::Idle,
            processed: 0,
            declined: false,
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }

    /// Waiting on the operator
    pub fn confirm(&mut self) {
        self.state = SyncState::Confirm;
    }

    /// Operator said no: back to idle, nothing touched
    pub fn decline(&mut self) {
        self.state = SyncState::Idle;
        self.declined = true;
    }

    /// Enter the mode's working state
    pub fn start(&mut self) {
        self.state = self.mode.state();
        self.started_at = Some(Utc::now());
    }

    pub fn increment_processed(&mut self) {
        self.processed += 1;
    }

    pub fn complete(&mut self) {
        self.state = SyncState::Done;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: &str) {
        self.state = SyncState::Failed;
        self.completed_at = Some(Utc::now());
        self.error_message = Some(error.to_string());
    }

    /// Duration in milliseconds, up to now if still running
    pub fn duration_ms(&self) -> Option<i64> {
        let start = self.started_at?;
        let end = self.completed_at.unwrap_or_else(Utc::now);
        Some((end - start).num_milliseconds())
    }

    pub fn report(&self) -> SyncReport {
        SyncReport {
            run_id: self.id,
            mode: self.mode,
            state: self.state,
            count: self.processed,
            declined: self.declined,
        }
    }
}

/// What a finished run hands back to its caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub mode: SyncMode,
    pub state: SyncState,
    pub count: usize,
    pub declined: bool,
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.mode {
            _ if self.declined => Ok(()),
            SyncMode::Upload => write!(f, "{} static files copied.", self.count),
            SyncMode::DryRunCopy => write!(f, "{} static files would be copied.", self.count),
            SyncMode::Clear => write!(f, "{} static files deleted.", self.count),
            SyncMode::DryRunClear => write!(f, "{} static files would be deleted.", self.count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_flags() {
        assert_eq!(SyncMode::from_flags(false, false), SyncMode::Upload);
        assert_eq!(SyncMode::from_flags(false, true), SyncMode::DryRunCopy);
        assert_eq!(SyncMode::from_flags(true, false), SyncMode::Clear);
        assert_eq!(SyncMode::from_flags(true, true), SyncMode::DryRunClear);
        assert!(SyncMode::DryRunClear.is_dry_run() && SyncMode::DryRunClear.is_clear());
        assert!(SyncMode::DryRunClear.needs_store());
        assert!(!SyncMode::DryRunCopy.needs_store());
    }

    #[test]
    fn test_run_lifecycle() {
        let mut run = SyncRun::new(SyncMode::Clear);
        assert_eq!(run.state, SyncState::Idle);

        run.confirm();
        assert_eq!(run.state, SyncState::Confirm);

        run.start();
        assert_eq!(run.state, SyncState::Clear);
        assert!(run.started_at.is_some());

        run.increment_processed();
        run.complete();
        assert_eq!(run.state, SyncState::Done);
        assert_eq!(run.report().count, 1);
        assert!(run.duration_ms().unwrap() >= 0);
    }

    #[test]
    fn test_declined_report_prints_nothing() {
        let mut run = SyncRun::new(SyncMode::Upload);
        run.confirm();
        run.decline();

        let report = run.report();
        assert_eq!(report.state, SyncState::Idle);
        assert!(report.declined);
        assert_eq!(report.to_string(), "");
    }

    #[test]
    fn test_report_summary_lines() {
        let mut run = SyncRun::new(SyncMode::Upload);
        run.start();
        run.increment_processed();
        run.increment_processed();
        run.complete();
        assert_eq!(run.report().to_string(), "2 static files copied.");

        let run = SyncRun::new(SyncMode::DryRunClear);
        assert_eq!(run.report().to_string(), "0 static files would be deleted.");
    }
}
