//! Runtime collaborator traits
//!
//! The start sequence only talks to a container backend through these
//! traits. `docker` provides an Engine API implementation; tests use
//! in-memory fakes.

use crate::exit::ExitWaiter;
use crate::io::{IoAttach, IoConfig};
use async_trait::async_trait;
use ctask_foundation::Result;
use std::sync::Arc;

/// Terminal dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub rows: u16,
    pub cols: u16,
}

impl WindowSize {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }
}

/// A host signal in its native numeric form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signal(pub i32);

impl Signal {
    pub const HUP: Signal = Signal(1);
    pub const INT: Signal = Signal(2);
    pub const QUIT: Signal = Signal(3);
    pub const KILL: Signal = Signal(9);
    pub const TERM: Signal = Signal(15);

    pub fn number(&self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Signal::HUP => f.write_str("SIGHUP"),
            Signal::INT => f.write_str("SIGINT"),
            Signal::QUIT => f.write_str("SIGQUIT"),
            Signal::KILL => f.write_str("SIGKILL"),
            Signal::TERM => f.write_str("SIGTERM"),
            Signal(n) => write!(f, "signal {}", n),
        }
    }
}

/// The parts of a container's process specification the start sequence reads
#[derive(Debug, Clone, Default)]
pub struct ProcessSpec {
    /// Process runs on a terminal
    pub terminal: bool,
    /// Process reads from stdin
    pub open_stdin: bool,
    pub args: Vec<String>,
}

/// Backend-specific task creation options
#[derive(Debug, Clone, Default)]
pub struct TaskOptions {
    /// Key sequence that detaches the host from a terminal-backed task
    pub detach_keys: Option<String>,
}

impl TaskOptions {
    pub fn with_detach_keys(mut self, keys: impl Into<String>) -> Self {
        self.detach_keys = Some(keys.into());
        self
    }
}

/// A running or runnable process bound to a container
#[async_trait]
pub trait Task: Send + Sync {
    /// Identifier of the owning container
    fn id(&self) -> &str;

    /// Process id of the task
    async fn pid(&self) -> Result<u32>;

    /// Register for the one-shot completion notification.
    ///
    /// Must be called before [`Task::start`]; the returned waiter observes the
    /// exit no matter how quickly the process terminates.
    async fn wait(&self) -> Result<ExitWaiter>;

    async fn start(&self) -> Result<()>;

    /// Push new terminal dimensions to the task
    async fn resize(&self, size: WindowSize) -> Result<()>;

    /// Deliver a signal to the task
    async fn kill(&self, signal: Signal) -> Result<()>;
}

pub type TaskRef = Arc<dyn Task>;

/// Handle to a previously created container
#[async_trait]
pub trait Container: Send + Sync {
    fn id(&self) -> &str;

    async fn spec(&self) -> Result<ProcessSpec>;

    /// Reconnect to the streams of the task that is already running.
    /// Fails with `Error::TaskNotFound` when there is none.
    async fn attach_task(&self, attach: IoAttach) -> Result<TaskRef>;

    /// Create a new, not yet started, task
    async fn create_task(&self, io: IoConfig, options: &TaskOptions) -> Result<TaskRef>;
}

pub type ContainerRef = Arc<dyn Container>;

/// Client of a container backend
#[async_trait]
pub trait Runtime: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fails with `Error::ContainerNotFound` when `id` does not exist
    async fn load_container(&self, id: &str) -> Result<ContainerRef>;
}
