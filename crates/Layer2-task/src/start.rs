//! Start orchestration
//!
//! Turns a container id into a started, observed and awaited task:
//!
//! ```text
//! resolve io → acquire task → register wait → console | signals → start
//!            → wait for exit → stop relay, restore console → termination
//! ```
//!
//! Cleanup of the console and of caught signals is owned by guards, so every
//! early return releases them exactly once.

use crate::acquire::acquire_task;
use crate::console::{ConsoleGuard, ResizeEvents, ResizeForwarder};
use crate::exit::Termination;
use crate::host::Host;
use crate::io::{resolve_io, IoFlags};
use crate::runtime::{Runtime, Signal, TaskOptions, TaskRef};
use crate::signals::{SignalEvents, SignalRelay};
use ctask_foundation::{write_pid_file, Error, Result, DEFAULT_FIFO_DIR};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What to start and how
#[derive(Debug, Clone, Default)]
pub struct StartRequest {
    pub container_id: String,
    pub io: IoFlags,
    /// Where to report the task's pid
    pub pid_file: Option<PathBuf>,
    pub options: TaskOptions,
}

impl StartRequest {
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            ..Default::default()
        }
    }

    pub fn with_null_io(mut self, null_io: bool) -> Self {
        self.io.null_io = null_io;
        self
    }

    pub fn with_fifo_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.io.fifo_dir = Some(dir.into());
        self
    }

    pub fn with_pid_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.pid_file = Some(path.into());
        self
    }

    pub fn with_options(mut self, options: TaskOptions) -> Self {
        self.options = options;
        self
    }
}

/// Drives one start/wait cycle against a runtime
pub struct TaskStarter<'a, H: Host> {
    runtime: &'a dyn Runtime,
    host: H,
    default_fifo_dir: PathBuf,
}

impl<'a, H: Host> TaskStarter<'a, H> {
    pub fn new(runtime: &'a dyn Runtime, host: H) -> Self {
        Self {
            runtime,
            host,
            default_fifo_dir: PathBuf::from(DEFAULT_FIFO_DIR),
        }
    }

    pub fn with_default_fifo_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.default_fifo_dir = dir.into();
        self
    }

    /// Run the task to completion.
    ///
    /// Returns the termination to mirror. A non-zero task exit is a
    /// `Termination::ExitCode`, not an error.
    pub async fn run(mut self, request: StartRequest) -> Result<Termination> {
        if request.container_id.is_empty() {
            return Err(Error::InvalidInput(
                "container id must be provided".to_string(),
            ));
        }

        let container = self.runtime.load_container(&request.container_id).await?;
        let spec = container.spec().await?;

        let io = resolve_io(&request.io, spec.terminal, &self.default_fifo_dir);
        debug!(
            container = %container.id(),
            terminal = spec.terminal,
            io = ?io.mode(),
            "resolved task io"
        );

        let acquired = acquire_task(container.as_ref(), io, &request.options).await?;
        let attached = acquired.is_attached();
        let task = acquired.into_task();

        // Registered before start so a fast exit is never missed
        let waiter = task.wait().await?;

        // A running task already has its pid
        if attached {
            if let Some(path) = &request.pid_file {
                write_pid_file(path, task.pid().await?)?;
            }
        }

        let mode = RunMode::prepare(&mut self.host, spec.terminal)?;

        task.start().await.map_err(|e| match e {
            Error::TaskStart(_) => e,
            other => Error::TaskStart(other.to_string()),
        })?;

        if !attached {
            if let Some(path) = &request.pid_file {
                if let Err(e) = report_pid(&task, path).await {
                    // Nobody would observe the exit; take the task down with us
                    if let Err(kill) = task.kill(Signal::KILL).await {
                        warn!(container = %task.id(), error = %kill, "failed to kill task");
                    }
                    return Err(e);
                }
            }
        }
        info!(container = %task.id(), "task started");

        let active = mode.activate(task.clone());
        let status = waiter.recv().await;
        active.finish().await;

        let status = status?;
        let termination = Termination::resolve(&status)?;
        info!(container = %task.id(), code = termination.code(), "task exited");
        Ok(termination)
    }
}

async fn report_pid(task: &TaskRef, path: &Path) -> Result<()> {
    let pid = task.pid().await?;
    write_pid_file(path, pid)
}

// ============================================================================
// Run modes
// ============================================================================

/// Host resources prepared for the run, chosen once from the terminal flag
enum RunMode {
    Terminal(TerminalRun),
    Piped(PipedRun),
}

struct TerminalRun {
    console: ConsoleGuard,
    resizes: ResizeEvents,
}

struct PipedRun {
    signals: SignalEvents,
}

impl RunMode {
    fn prepare<H: Host>(host: &mut H, terminal: bool) -> Result<Self> {
        if terminal {
            let console = ConsoleGuard::enter(host.console()?)?;
            let resizes = host.resize_events()?;
            Ok(RunMode::Terminal(TerminalRun { console, resizes }))
        } else {
            let signals = host.signal_events()?;
            Ok(RunMode::Piped(PipedRun { signals }))
        }
    }

    /// Start relaying to the now running task
    fn activate(self, task: TaskRef) -> ActiveRun {
        match self {
            RunMode::Terminal(run) => ActiveRun::Terminal {
                console: run.console,
                forwarder: ResizeForwarder::spawn(task, run.resizes),
            },
            RunMode::Piped(run) => ActiveRun::Piped {
                relay: SignalRelay::start(task, run.signals),
            },
        }
    }
}

enum ActiveRun {
    Terminal {
        console: ConsoleGuard,
        forwarder: ResizeForwarder,
    },
    Piped {
        relay: SignalRelay,
    },
}

impl ActiveRun {
    /// Stop the auxiliary worker, then release host resources
    async fn finish(self) {
        match self {
            ActiveRun::Terminal {
                mut console,
                forwarder,
            } => {
                let resized = forwarder.stop().await;
                debug!(resized, "resize forwarding stopped");
                console.restore();
            }
            ActiveRun::Piped { relay } => {
                let forwarded = relay.stop().await;
                debug!(forwarded, "signal relay stopped");
            }
        }
    }
}
