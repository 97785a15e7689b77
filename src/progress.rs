// Progress events relayed from the queue while a generation runs, and the
// reporter that turns them into the single visible status line.

use std::fmt;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;

/// One log line emitted by the remote worker. Only `message` is required.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogEntry {
    pub message: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl LogEntry {
    pub fn new(message: impl Into<String>) -> Self {
        LogEntry {
            message: message.into(),
            level: None,
            timestamp: None,
        }
    }
}

/// Interim or terminal update for an in-flight request.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Waiting for a worker. `position` is 0-based when reported.
    Queued { position: Option<u64> },
    /// Worker is running; logs are in emission order.
    InProgress { logs: Vec<LogEntry> },
    /// Terminal: the result is ready to be fetched.
    Completed { logs: Vec<LogEntry> },
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Completed { .. })
    }
}

pub const STATUS_STARTING: &str = "🚀 Starting generation...";
pub const STATUS_COMPLETE: &str = "✨ Generation complete!";

/// Owns the status text slot. Optionally mirrors it onto a terminal spinner.
#[derive(Default)]
pub struct ProgressReporter {
    status: String,
    spinner: Option<ProgressBar>,
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("status", &self.status)
            .field("spinner", &self.spinner.is_some())
            .finish()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status text; empty before the first run.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = text.into();
        if let Some(spinner) = &self.spinner {
            spinner.set_message(self.status.clone());
        }
    }

    /// Attach a spinner for the duration of a run. Falls back to a plain
    /// spinner template if the styled one fails to parse.
    pub fn start_spinner(&mut self) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner.set_message(self.status.clone());
        self.spinner = Some(spinner);
    }

    /// Stop the spinner, leaving the last status printed.
    pub fn finish_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(self.status.clone());
        }
    }

    pub fn on_progress(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Queued { position } => {
                let text = match position {
                    Some(p) => format!("⏳ Queued (position {p})"),
                    None => "⏳ Queued".to_string(),
                };
                self.set_status(text);
            }
            ProgressEvent::InProgress { logs } => {
                for log in logs {
                    self.set_status(format!("🔄 {}", log.message));
                }
            }
            ProgressEvent::Completed { .. } => {}
        }
    }
}
