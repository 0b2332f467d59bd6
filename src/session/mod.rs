pub mod controller;

use crate::provider::Measurement;
use serde::Serialize;

pub use controller::{Controller, ControllerConfig};

pub const PROGRESS_MAX: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Idle,
    Running,
    Complete,
    Failed,
}

/// State of one speed-test run.
///
/// Results live in a single `Option<Measurement>`, so download, upload and
/// ping are either all present or all absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    status: Status,
    progress: u8,
    result: Option<Measurement>,
    error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            status: Status::Idle,
            progress: 0,
            result: None,
            error: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    pub fn result(&self) -> Option<&Measurement> {
        self.result.as_ref()
    }

    pub fn download_speed(&self) -> Option<f64> {
        self.result.map(|m| m.download_mbps)
    }

    pub fn upload_speed(&self) -> Option<f64> {
        self.result.map(|m| m.upload_mbps)
    }

    pub fn ping(&self) -> Option<f64> {
        self.result.map(|m| m.ping_ms)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn begin_run(&mut self) {
        self.status = Status::Running;
        self.progress = 0;
        self.result = None;
        self.error = None;
    }

    /// Returns true once progress has hit the ceiling.
    pub(crate) fn advance_progress(&mut self, step: u8) -> bool {
        if self.status == Status::Running {
            self.progress = self.progress.saturating_add(step).min(PROGRESS_MAX);
        }
        self.progress >= PROGRESS_MAX
    }

    pub(crate) fn complete(&mut self, result: Measurement, fill_progress: bool) {
        if fill_progress {
            self.progress = PROGRESS_MAX;
        }
        self.result = Some(result);
        self.status = Status::Complete;
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.result = None;
        self.error = Some(message);
        self.status = Status::Failed;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
