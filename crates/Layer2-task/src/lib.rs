//! # ctask-task
//!
//! Start orchestration for a single container task: attach to or create the
//! task, start it, relay terminal resizes or host signals while it runs, and
//! mirror its exit status.
//!
//! ## Modules
//!
//! - `io` - IO configuration resolver
//! - `acquire` - attach-or-create task acquisition
//! - `console` - raw-mode guard and resize forwarding
//! - `signals` - host signal relay
//! - `exit` - completion notification and exit mapping
//! - `start` - the orchestrator tying them together
//! - `docker` - Engine API implementation of the runtime traits

pub mod acquire;
pub mod console;
pub mod docker;
pub mod exit;
pub mod host;
pub mod io;
pub mod runtime;
pub mod signals;
pub mod start;

// Runtime collaborator
pub use runtime::{
    Container, ContainerRef, ProcessSpec, Runtime, Signal, Task, TaskOptions, TaskRef, WindowSize,
};

// Orchestration
pub use acquire::{acquire_task, Acquired};
pub use console::{Console, ConsoleGuard, HostConsole, ResizeEvents, ResizeForwarder};
pub use exit::{ExitNotifier, ExitStatus, ExitWaiter, Termination, UNKNOWN_EXIT_CODE};
pub use host::{Host, OsHost};
pub use io::{resolve_io, IoAttach, IoConfig, IoFlags, IoMode};
pub use signals::{SignalEvents, SignalRelay};
pub use start::{StartRequest, TaskStarter};

// Docker backend
pub use docker::{DockerRuntime, DockerTask};
