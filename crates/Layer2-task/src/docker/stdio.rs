//! Relay between an attached container and the host's stdio

use bollard::container::{AttachContainerResults, LogOutput};
use futures::StreamExt;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How long output may keep arriving after the task has exited
pub const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Pumps that copy attached streams to and from host stdio
pub struct StdioRelay {
    output: JoinHandle<()>,
    input: Option<JoinHandle<()>>,
    drained: watch::Receiver<bool>,
}

impl StdioRelay {
    pub fn spawn(results: AttachContainerResults, forward_stdin: bool) -> Self {
        let AttachContainerResults { mut output, mut input } = results;
        let (drained_tx, drained) = watch::channel(false);

        let output = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            let mut stderr = tokio::io::stderr();

            while let Some(frame) = output.next().await {
                let written = match frame {
                    Ok(LogOutput::StdOut { message }) | Ok(LogOutput::Console { message }) => {
                        write_frame(&mut stdout, &message).await
                    }
                    Ok(LogOutput::StdErr { message }) => write_frame(&mut stderr, &message).await,
                    Ok(LogOutput::StdIn { .. }) => Ok(()),
                    Err(e) => {
                        debug!(error = %e, "attach output closed");
                        break;
                    }
                };
                if let Err(e) = written {
                    debug!(error = %e, "host output closed");
                    break;
                }
            }
            drained_tx.send_replace(true);
        });

        let input = forward_stdin.then(|| {
            tokio::spawn(async move {
                let mut stdin = tokio::io::stdin();
                if let Err(e) = tokio::io::copy(&mut stdin, &mut input).await {
                    debug!(error = %e, "stdin relay stopped");
                }
                let _ = input.shutdown().await;
            })
        });

        Self {
            output,
            input,
            drained,
        }
    }

    /// Resolves once every output frame reached the host
    pub fn drained(&self) -> watch::Receiver<bool> {
        self.drained.clone()
    }
}

/// Wait for the output pump to finish, at most `limit`.
///
/// Returns `false` when output was still flowing at the deadline.
pub async fn wait_drained(mut drained: watch::Receiver<bool>, limit: Duration) -> bool {
    match tokio::time::timeout(limit, drained.wait_for(|done| *done)).await {
        Ok(_) => true,
        Err(_) => {
            warn!(limit_ms = limit.as_millis() as u64, "task output still open after exit");
            false
        }
    }
}

async fn write_frame<W: AsyncWrite + Unpin>(out: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    out.write_all(bytes).await?;
    out.flush().await
}

impl Drop for StdioRelay {
    fn drop(&mut self) {
        if let Some(input) = self.input.take() {
            input.abort();
        }
        // Finished once drained; only a run that never completed still has it
        self.output.abort();
    }
}
