//! Signal relay for tasks without a terminal
//!
//! Host signals are caught into `SignalEvents` and forwarded to the task by
//! `SignalRelay` until the run completes. Dropping `SignalEvents` stops
//! catching.

use crate::runtime::{Signal, TaskRef};
use ctask_foundation::Result;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Signals relayed to the task. Child-status and urgent-data notifications
/// concern the host process only and are never listed.
#[cfg(unix)]
pub const FORWARDED_SIGNALS: &[libc::c_int] = &[
    libc::SIGHUP,
    libc::SIGINT,
    libc::SIGQUIT,
    libc::SIGUSR1,
    libc::SIGUSR2,
    libc::SIGPIPE,
    libc::SIGALRM,
    libc::SIGTERM,
    libc::SIGCONT,
    libc::SIGTSTP,
    libc::SIGTTIN,
    libc::SIGTTOU,
    libc::SIGWINCH,
    libc::SIGPROF,
    libc::SIGVTALRM,
    libc::SIGXCPU,
    libc::SIGXFSZ,
];

/// Stream of caught host signals
pub struct SignalEvents {
    rx: mpsc::Receiver<Signal>,
    listeners: Vec<JoinHandle<()>>,
}

impl SignalEvents {
    /// Events fed by the returned sender
    pub fn channel(buffer: usize) -> (mpsc::Sender<Signal>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (
            tx,
            Self {
                rx,
                listeners: Vec::new(),
            },
        )
    }

    /// Catch every signal in [`FORWARDED_SIGNALS`]
    #[cfg(unix)]
    pub fn host() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let (tx, mut events) = Self::channel(32);
        for &number in FORWARDED_SIGNALS {
            let mut stream = match signal(SignalKind::from_raw(number)) {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(signal = number, error = %e, "cannot catch signal");
                    continue;
                }
            };
            let tx = tx.clone();
            events.listeners.push(tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    if tx.send(Signal(number)).await.is_err() {
                        break;
                    }
                }
            }));
        }
        debug!(count = events.listeners.len(), "catching host signals");
        Ok(events)
    }

    #[cfg(not(unix))]
    pub fn host() -> Result<Self> {
        let (_tx, events) = Self::channel(1);
        Ok(events)
    }

    pub async fn next(&mut self) -> Option<Signal> {
        self.rx.recv().await
    }

    /// Stop catching host signals.
    ///
    /// Listeners are aborted and queued events dropped. tokio keeps its
    /// process-wide handler installed, so a signal arriving afterwards is
    /// ignored rather than taking its default action; callers exit right
    /// after the run.
    pub fn stop_catch(&mut self) {
        for listener in self.listeners.drain(..) {
            listener.abort();
        }
        self.rx.close();
    }
}

impl Drop for SignalEvents {
    fn drop(&mut self) {
        self.stop_catch();
    }
}

/// Background worker forwarding caught signals to a task
pub struct SignalRelay {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<usize>>,
}

impl SignalRelay {
    pub fn start(task: TaskRef, mut events: SignalEvents) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut forwarded = 0usize;
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    event = events.next() => {
                        let Some(signal) = event else { break };
                        debug!(%signal, "forwarding signal");
                        match task.kill(signal).await {
                            Ok(()) => forwarded += 1,
                            Err(e) => warn!(%signal, error = %e, "forward signal"),
                        }
                    }
                }
            }
            events.stop_catch();
            forwarded
        });

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Stop relaying and release the caught signals. Returns how many
    /// signals reached the task.
    pub async fn stop(mut self) -> usize {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        match self.handle.take() {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                warn!(error = %e, "signal relay ended abnormally");
                0
            }),
            None => 0,
        }
    }
}

impl Drop for SignalRelay {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_events() {
        let (tx, mut events) = SignalEvents::channel(4);
        tx.send(Signal::INT).await.unwrap();
        tx.send(Signal::TERM).await.unwrap();

        assert_eq!(events.next().await, Some(Signal::INT));
        assert_eq!(events.next().await, Some(Signal::TERM));
    }

    #[tokio::test]
    async fn test_stop_catch_closes_stream() {
        let (tx, mut events) = SignalEvents::channel(4);
        events.stop_catch();

        assert!(tx.send(Signal::HUP).await.is_err());
        assert_eq!(events.next().await, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_child_status_never_forwarded() {
        assert!(!FORWARDED_SIGNALS.contains(&libc::SIGCHLD));
        assert!(!FORWARDED_SIGNALS.contains(&libc::SIGURG));
        assert!(FORWARDED_SIGNALS.contains(&libc::SIGINT));
    }
}
