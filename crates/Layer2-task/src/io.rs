//! Task IO configuration
//!
//! Decides how the task's standard streams are wired before the task is
//! acquired. Resolution is a pure mapping and never fails.

use std::path::{Path, PathBuf};

/// How the task's standard streams are carried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    /// All streams go to a null sink
    Discard,
    /// Streams travel over named pipes under a FIFO directory
    Fifo,
    /// Streams are bound to the host terminal
    Terminal,
}

/// Resolved, immutable IO configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoConfig {
    mode: IoMode,
    fifo_dir: Option<PathBuf>,
}

impl IoConfig {
    pub fn discard() -> Self {
        Self {
            mode: IoMode::Discard,
            fifo_dir: None,
        }
    }

    pub fn fifo(dir: impl Into<PathBuf>) -> Self {
        Self {
            mode: IoMode::Fifo,
            fifo_dir: Some(dir.into()),
        }
    }

    pub fn terminal(dir: impl Into<PathBuf>) -> Self {
        Self {
            mode: IoMode::Terminal,
            fifo_dir: Some(dir.into()),
        }
    }

    pub fn mode(&self) -> IoMode {
        self.mode
    }

    pub fn fifo_dir(&self) -> Option<&Path> {
        self.fifo_dir.as_deref()
    }

    pub fn is_discard(&self) -> bool {
        self.mode == IoMode::Discard
    }
}

/// IO flags as supplied by the invoking surface
#[derive(Debug, Clone, Default)]
pub struct IoFlags {
    /// Send all IO to a null sink
    pub null_io: bool,
    /// Directory for the IO FIFOs; the configured default applies when unset
    pub fifo_dir: Option<PathBuf>,
}

/// Streams to reconnect when attaching to an already running task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoAttach {
    pub stdin: bool,
    pub stdout: bool,
    pub stderr: bool,
}

impl IoAttach {
    /// Bind all three streams to the host's stdio
    pub fn stdio() -> Self {
        Self {
            stdin: true,
            stdout: true,
            stderr: true,
        }
    }
}

/// Resolve the IO configuration for a task.
///
/// `null_io` wins over everything else. Otherwise the streams follow the
/// process spec's terminal flag, carried under `flags.fifo_dir` or
/// `default_fifo_dir`.
pub fn resolve_io(flags: &IoFlags, terminal: bool, default_fifo_dir: &Path) -> IoConfig {
    if flags.null_io {
        return IoConfig::discard();
    }

    let dir = flags
        .fifo_dir
        .clone()
        .unwrap_or_else(|| default_fifo_dir.to_path_buf());

    if terminal {
        IoConfig::terminal(dir)
    } else {
        IoConfig::fifo(dir)
    }
}
