//! Task exit status
//!
//! The completion notification is a single-value channel: the backend holds
//! the [`ExitNotifier`], the start sequence holds the [`ExitWaiter`].

use ctask_foundation::{Error, Result};
use tokio::sync::oneshot;

/// Exit code reported when the real status could not be determined
pub const UNKNOWN_EXIT_CODE: u32 = 255;

/// Exit status of a task run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitStatus {
    code: u32,
    error: Option<String>,
}

impl ExitStatus {
    pub fn new(code: u32) -> Self {
        Self { code, error: None }
    }

    /// The exit could not be observed
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            code: UNKNOWN_EXIT_CODE,
            error: Some(error.into()),
        }
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    /// The exit code, or the error that prevented observing it
    pub fn result(&self) -> Result<u32> {
        match &self.error {
            Some(e) => Err(Error::Wait(e.clone())),
            None => Ok(self.code),
        }
    }
}

/// Sending half of the completion notification
#[derive(Debug)]
pub struct ExitNotifier {
    tx: oneshot::Sender<ExitStatus>,
}

impl ExitNotifier {
    /// Deliver the status. Returns `false` when nobody is waiting anymore.
    pub fn notify(self, status: ExitStatus) -> bool {
        self.tx.send(status).is_ok()
    }
}

/// Receiving half of the completion notification
#[derive(Debug)]
pub struct ExitWaiter {
    rx: oneshot::Receiver<ExitStatus>,
}

impl ExitWaiter {
    pub fn channel() -> (ExitNotifier, ExitWaiter) {
        let (tx, rx) = oneshot::channel();
        (ExitNotifier { tx }, ExitWaiter { rx })
    }

    /// Block until the task exits. No timeout.
    pub async fn recv(self) -> Result<ExitStatus> {
        self.rx
            .await
            .map_err(|_| Error::Wait("completion channel closed before exit".to_string()))
    }
}

/// How the orchestrator itself terminates after a task run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Task exited with 0
    Success,
    /// Task exited non-zero; mirror the code, print nothing
    ExitCode(u32),
}

impl Termination {
    pub fn from_code(code: u32) -> Self {
        if code == 0 {
            Self::Success
        } else {
            Self::ExitCode(code)
        }
    }

    /// Map an exit status; a status carrying an error is fatal
    pub fn resolve(status: &ExitStatus) -> Result<Self> {
        status.result().map(Self::from_code)
    }

    pub fn code(&self) -> u32 {
        match self {
            Self::Success => 0,
            Self::ExitCode(code) => *code,
        }
    }
}
