//! Revoke confirmation handling
//!
//! Hosts with their own dialog loop take the
//! [`Outcome::ConfirmRequired`](crate::reconciler::Outcome::ConfirmRequired)
//! value and answer it later. Hosts without one plug a
//! [`ConfirmationHandler`] into the config and use
//! [`ScreenSession::apply_toggle_interactive`](crate::session::ScreenSession::apply_toggle_interactive).

use appperm_api::AppIdentity;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;
use thiserror::Error;

use crate::reconciler::ConfirmMessage;

/// Error type for prompt operations
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Non-interactive environment")]
    NonInteractive,

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

/// User's answer to a revoke confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmChoice {
    /// Go ahead and deny the permission
    Deny,
    /// Keep the current state
    #[default]
    Cancel,
}

/// Trait for presenting a blocking revoke confirmation
pub trait ConfirmationHandler: Send + Sync {
    /// Ask the user whether to deny the group
    fn confirm(
        &self,
        app: &AppIdentity,
        group_label: &str,
        message: ConfirmMessage,
    ) -> Result<ConfirmChoice, PromptError>;

    /// Check if this handler talks to a user
    fn is_interactive(&self) -> bool;
}

// ============================================================================
// Terminal Confirmation Handler
// ============================================================================

/// Terminal-based confirmation handler
#[derive(Debug, Default)]
pub struct TerminalConfirmationHandler;

impl TerminalConfirmationHandler {
    pub fn new() -> Self {
        Self
    }
}

impl ConfirmationHandler for TerminalConfirmationHandler {
    fn confirm(
        &self,
        app: &AppIdentity,
        group_label: &str,
        message: ConfirmMessage,
    ) -> Result<ConfirmChoice, PromptError> {
        if !atty_check() {
            return Err(PromptError::NonInteractive);
        }

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        writeln!(stdout)?;
        writeln!(stdout, "{}: {}", app.package_name, group_label)?;
        writeln!(stdout, "{}", message.text())?;
        write!(stdout, "Deny anyway? [d]eny / [c]ancel: ")?;
        stdout.flush()?;

        let mut input = String::new();
        stdin.lock().read_line(&mut input)?;

        Ok(parse_choice(&input))
    }

    fn is_interactive(&self) -> bool {
        atty_check()
    }
}

/// Anything but an explicit deny keeps the permission
fn parse_choice(input: &str) -> ConfirmChoice {
    match input.trim().to_lowercase().as_str() {
        "d" | "deny" | "y" | "yes" => ConfirmChoice::Deny,
        _ => ConfirmChoice::Cancel,
    }
}

// ============================================================================
// Auto Handler
// ============================================================================

/// Handler that answers every confirmation the same way
#[derive(Debug)]
pub struct AutoConfirmationHandler {
    choice: ConfirmChoice,
}

impl AutoConfirmationHandler {
    pub fn always_deny() -> Self {
        Self {
            choice: ConfirmChoice::Deny,
        }
    }

    pub fn always_cancel() -> Self {
        Self {
            choice: ConfirmChoice::Cancel,
        }
    }
}

impl ConfirmationHandler for AutoConfirmationHandler {
    fn confirm(
        &self,
        _app: &AppIdentity,
        _group_label: &str,
        _message: ConfirmMessage,
    ) -> Result<ConfirmChoice, PromptError> {
        Ok(self.choice)
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

// ============================================================================
// Recording Handler (for testing)
// ============================================================================

/// A recorded confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedConfirmation {
    pub package: String,
    pub group_label: String,
    pub message: ConfirmMessage,
}

/// Handler that records confirmations and answers with a fixed choice
#[derive(Debug, Default)]
pub struct RecordingConfirmationHandler {
    confirmations: Mutex<Vec<RecordedConfirmation>>,
    choice: ConfirmChoice,
}

impl RecordingConfirmationHandler {
    pub fn new(choice: ConfirmChoice) -> Self {
        Self {
            confirmations: Mutex::new(Vec::new()),
            choice,
        }
    }

    pub fn confirmations(&self) -> Vec<RecordedConfirmation> {
        self.confirmations.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.confirmations.lock().unwrap().len()
    }
}

impl ConfirmationHandler for RecordingConfirmationHandler {
    fn confirm(
        &self,
        app: &AppIdentity,
        group_label: &str,
        message: ConfirmMessage,
    ) -> Result<ConfirmChoice, PromptError> {
        self.confirmations
            .lock()
            .unwrap()
            .push(RecordedConfirmation {
                package: app.package_name.clone(),
                group_label: group_label.to_string(),
                message,
            });
        Ok(self.choice)
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Check if stdout is connected to a terminal
fn atty_check() -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        // SAFETY: isatty is safe to call with any file descriptor
        unsafe { libc::isatty(std::io::stdout().as_raw_fd()) != 0 }
    }

    #[cfg(windows)]
    {
        use std::os::windows::io::AsRawHandle;
        use windows_sys::Win32::System::Console::{GetConsoleMode, CONSOLE_MODE};
        let handle = std::io::stdout().as_raw_handle();
        let mut mode: CONSOLE_MODE = 0;
        // SAFETY: GetConsoleMode is safe with valid handle
        unsafe { GetConsoleMode(handle as _, &mut mode) != 0 }
    }

    #[cfg(not(any(unix, windows)))]
    {
        std::env::var("TERM").is_ok()
    }
}
