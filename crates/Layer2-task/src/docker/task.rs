//! Docker task - the main process of a container

use super::map_error;
use super::stdio::{wait_drained, StdioRelay, OUTPUT_DRAIN_TIMEOUT};
use crate::exit::{ExitStatus, ExitWaiter};
use crate::runtime::{Signal, Task, WindowSize};
use async_trait::async_trait;
use bollard::container::{
    InspectContainerOptions, KillContainerOptions, ResizeContainerTtyOptions,
    StartContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::Docker;
use ctask_foundation::{Error, Result};
use futures::StreamExt;
use tokio::sync::watch;
use tracing::debug;

pub struct DockerTask {
    docker: Docker,
    /// Client without a practical request timeout, for waiting on exit
    wait_client: Docker,
    container_id: String,
    started: watch::Sender<bool>,
    stdio: Option<StdioRelay>,
}

impl DockerTask {
    pub(super) fn created(
        docker: Docker,
        wait_client: Docker,
        container_id: String,
        stdio: Option<StdioRelay>,
    ) -> Self {
        Self::new(docker, wait_client, container_id, stdio, false)
    }

    pub(super) fn running(
        docker: Docker,
        wait_client: Docker,
        container_id: String,
        stdio: Option<StdioRelay>,
    ) -> Self {
        Self::new(docker, wait_client, container_id, stdio, true)
    }

    fn new(
        docker: Docker,
        wait_client: Docker,
        container_id: String,
        stdio: Option<StdioRelay>,
        started: bool,
    ) -> Self {
        let (started, _) = watch::channel(started);
        Self {
            docker,
            wait_client,
            container_id,
            started,
            stdio,
        }
    }
}

#[async_trait]
impl Task for DockerTask {
    fn id(&self) -> &str {
        &self.container_id
    }

    async fn pid(&self) -> Result<u32> {
        let inspect = self
            .docker
            .inspect_container(&self.container_id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_error(&self.container_id, e))?;

        let pid = inspect.state.and_then(|s| s.pid).unwrap_or(0);
        u32::try_from(pid).map_err(|_| Error::runtime(format!("invalid pid {}", pid)))
    }

    async fn wait(&self) -> Result<ExitWaiter> {
        let (notifier, waiter) = ExitWaiter::channel();
        let mut started = self.started.subscribe();
        let docker = self.wait_client.clone();
        let id = self.container_id.clone();
        let drained = self.stdio.as_ref().map(StdioRelay::drained);

        tokio::spawn(async move {
            // A created container already satisfies "not-running"; hold the
            // request until the task has been started.
            if started.wait_for(|started| *started).await.is_err() {
                debug!(container = %id, "task dropped before start");
                return;
            }
            let status = wait_exit(&docker, &id).await;
            // Output still in flight belongs before the exit
            if let Some(drained) = drained {
                wait_drained(drained, OUTPUT_DRAIN_TIMEOUT).await;
            }
            debug!(container = %id, code = status.code(), "task exit observed");
            notifier.notify(status);
        });

        Ok(waiter)
    }

    async fn start(&self) -> Result<()> {
        self.docker
            .start_container(&self.container_id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| Error::TaskStart(e.to_string()))?;
        self.started.send_replace(true);
        Ok(())
    }

    async fn resize(&self, size: WindowSize) -> Result<()> {
        self.docker
            .resize_container_tty(
                &self.container_id,
                ResizeContainerTtyOptions {
                    height: size.rows,
                    width: size.cols,
                },
            )
            .await
            .map_err(|e| map_error(&self.container_id, e))
    }

    async fn kill(&self, signal: Signal) -> Result<()> {
        self.docker
            .kill_container(
                &self.container_id,
                Some(KillContainerOptions {
                    signal: signal.number().to_string(),
                }),
            )
            .await
            .map_err(|e| map_error(&self.container_id, e))
    }
}

/// Wait until the container stops and turn the answer into an exit status
async fn wait_exit(docker: &Docker, id: &str) -> ExitStatus {
    let mut stream = docker.wait_container(
        id,
        Some(WaitContainerOptions {
            condition: "not-running",
        }),
    );

    match stream.next().await {
        Some(Ok(response)) => {
            let error = response
                .error
                .and_then(|e| e.message)
                .filter(|m| !m.is_empty());
            match error {
                Some(message) => ExitStatus::failed(message),
                None => ExitStatus::new(exit_code(response.status_code)),
            }
        }
        // bollard reports non-zero exits as an error carrying the code
        Some(Err(DockerError::DockerContainerWaitError { error, code })) => {
            if error.is_empty() {
                ExitStatus::new(exit_code(code))
            } else {
                ExitStatus::failed(error)
            }
        }
        Some(Err(e)) => ExitStatus::failed(e.to_string()),
        None => ExitStatus::failed("wait stream ended without a status"),
    }
}

fn exit_code(status_code: i64) -> u32 {
    u32::try_from(status_code).unwrap_or(crate::exit::UNKNOWN_EXIT_CODE)
}
