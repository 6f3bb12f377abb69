//! Console controller for terminal-backed tasks
//!
//! - `ConsoleGuard` owns the host console in raw mode and restores it exactly
//!   once, on drop or on an explicit `restore()`.
//! - `ResizeEvents` is the stream of host terminal dimensions.
//! - `ResizeForwarder` pushes those dimensions to the task until stopped.

use crate::runtime::{TaskRef, WindowSize};
use ctask_foundation::{Error, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Host console operations
pub trait Console: Send {
    fn set_raw(&mut self) -> Result<()>;

    /// Return the console to the mode it had before `set_raw`
    fn reset(&mut self) -> Result<()>;

    fn size(&self) -> Result<WindowSize>;
}

/// The process's controlling terminal, driven through crossterm
#[derive(Debug, Default)]
pub struct HostConsole {
    raw: bool,
}

impl HostConsole {
    pub fn current() -> Self {
        Self::default()
    }
}

impl Console for HostConsole {
    fn set_raw(&mut self) -> Result<()> {
        crossterm::terminal::enable_raw_mode()
            .map_err(|e| Error::console(format!("Failed to enter raw mode: {}", e)))?;
        self.raw = true;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        if !self.raw {
            return Ok(());
        }
        crossterm::terminal::disable_raw_mode()
            .map_err(|e| Error::console(format!("Failed to restore console: {}", e)))?;
        self.raw = false;
        Ok(())
    }

    fn size(&self) -> Result<WindowSize> {
        let (cols, rows) = crossterm::terminal::size()
            .map_err(|e| Error::console(format!("Failed to read console size: {}", e)))?;
        Ok(WindowSize::new(rows, cols))
    }
}

// ============================================================================
// Console Guard
// ============================================================================

/// Raw-mode ownership of the host console.
///
/// Restoration is armed before raw mode is entered, so a failing `set_raw`
/// still resets the console.
pub struct ConsoleGuard {
    console: Box<dyn Console>,
    restored: bool,
}

impl ConsoleGuard {
    /// Put `console` into raw mode
    pub fn enter(console: Box<dyn Console>) -> Result<Self> {
        let mut guard = Self {
            console,
            restored: false,
        };
        guard.console.set_raw()?;
        debug!("console in raw mode");
        Ok(guard)
    }

    /// Restore the console. Later calls are no-ops.
    pub fn restore(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;
        match self.console.reset() {
            Ok(()) => debug!("console restored"),
            Err(e) => error!(error = %e, "console reset"),
        }
    }
}

impl Drop for ConsoleGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

// ============================================================================
// Resize Events
// ============================================================================

/// Stream of host terminal dimensions
pub struct ResizeEvents {
    rx: mpsc::Receiver<WindowSize>,
    listener: Option<JoinHandle<()>>,
}

impl ResizeEvents {
    /// Events fed by the returned sender
    pub fn channel(buffer: usize) -> (mpsc::Sender<WindowSize>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self { rx, listener: None })
    }

    /// Events from the host terminal: the current size first, then one per
    /// `SIGWINCH`.
    #[cfg(unix)]
    pub fn host() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut winch = signal(SignalKind::window_change())
            .map_err(|e| Error::console(format!("Failed to watch terminal resizes: {}", e)))?;
        let (tx, mut events) = Self::channel(16);
        let console = HostConsole::current();

        events.listener = Some(tokio::spawn(async move {
            loop {
                match console.size() {
                    Ok(size) => {
                        if tx.send(size).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "console resize"),
                }
                if winch.recv().await.is_none() {
                    break;
                }
            }
        }));

        Ok(events)
    }

    #[cfg(not(unix))]
    pub fn host() -> Result<Self> {
        Err(Error::console("terminal resize events are not supported on this platform"))
    }

    pub async fn next(&mut self) -> Option<WindowSize> {
        self.rx.recv().await
    }
}

impl Drop for ResizeEvents {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

// ============================================================================
// Resize Forwarder
// ============================================================================

/// Background worker relaying resize events to a task.
///
/// Bound to the run: `stop()` cancels and joins it. A forwarder dropped
/// without `stop()` is aborted.
pub struct ResizeForwarder {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<usize>>,
}

impl ResizeForwarder {
    pub fn spawn(task: TaskRef, mut events: ResizeEvents) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut forwarded = 0usize;
            loop {
                tokio::select! {
                    // Completion wins over a pending resize
                    biased;
                    _ = &mut stop_rx => break,
                    event = events.next() => {
                        let Some(size) = event else { break };
                        match task.resize(size).await {
                            Ok(()) => {
                                forwarded += 1;
                                debug!(rows = size.rows, cols = size.cols, "resized task console");
                            }
                            Err(e) => {
                                warn!(rows = size.rows, cols = size.cols, error = %e, "failed to resize task console");
                            }
                        }
                    }
                }
            }
            forwarded
        });

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Cancel the worker and wait for it. Returns how many resizes reached
    /// the task.
    pub async fn stop(mut self) -> usize {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        match self.handle.take() {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                warn!(error = %e, "resize forwarder ended abnormally");
                0
            }),
            None => 0,
        }
    }
}

impl Drop for ResizeForwarder {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
