//! Operator confirmation before anything touches the bucket

use dialoguer::{theme::ColorfulTheme, Confirm};

use super::engine::SyncError;

/// Asks the operator a yes/no question
pub trait ConfirmPrompt {
    fn confirm(&self, message: &str) -> Result<bool, SyncError>;
}

/// Interactive terminal prompt, defaulting to "no"
pub struct TerminalPrompt;

impl ConfirmPrompt for TerminalPrompt {
    fn confirm(&self, message: &str) -> Result<bool, SyncError> {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(message)
            .default(false)
            .interact()
            .map_err(|e| SyncError::Prompt(e.to_string()))
    }
}

/// A fixed answer, for scripted runs and tests
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl ConfirmPrompt for FixedAnswer {
    fn confirm(&self, _message: &str) -> Result<bool, SyncError> {
        Ok(self.0)
    }
}
