//! Docker Engine API runtime
//!
//! Implements the runtime traits over bollard. Works against Docker or any
//! daemon serving the same API (Podman's compatibility socket).
//!
//! - `DockerRuntime` - connected client, loads containers by id
//! - `DockerContainer` - inspect-backed container handle
//! - `DockerTask` - the container's main process

mod stdio;
mod task;

pub use task::DockerTask;

use crate::io::{IoAttach, IoConfig};
use crate::runtime::{Container, ContainerRef, ProcessSpec, Runtime, TaskOptions, TaskRef};
use async_trait::async_trait;
use bollard::container::{AttachContainerOptions, InspectContainerOptions};
use bollard::errors::Error as DockerError;
use bollard::models::ContainerInspectResponse;
use bollard::{Docker, API_DEFAULT_VERSION};
use ctask_foundation::{ContainerRuntime, CtaskConfig, Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use stdio::StdioRelay;

/// Timeout for requests that legitimately block until the task exits
const WAIT_TIMEOUT: Duration = Duration::from_secs(u32::MAX as u64);

/// Runtime client over the Docker Engine API
pub struct DockerRuntime {
    docker: Docker,
    kind: ContainerRuntime,
}

impl DockerRuntime {
    /// Connect using the address and timeout from `config`
    pub async fn connect(config: &CtaskConfig) -> Result<Self> {
        let address = config.address();
        let timeout = config.timeout().as_secs();

        let docker = if address.starts_with("tcp://") || address.starts_with("http://") {
            Docker::connect_with_http(&address, timeout, API_DEFAULT_VERSION)
        } else {
            let path = address.strip_prefix("unix://").unwrap_or(&address);
            Docker::connect_with_unix(path, timeout, API_DEFAULT_VERSION)
        }
        .map_err(|e| Error::runtime(format!("Cannot connect to {}: {}", address, e)))?;

        docker
            .ping()
            .await
            .map_err(|e| Error::runtime(format!("{} is not reachable at {}: {}", config.runtime(), address, e)))?;

        info!(runtime = %config.runtime(), %address, "connected to runtime");
        Ok(Self {
            docker,
            kind: config.runtime(),
        })
    }
}

#[async_trait]
impl Runtime for DockerRuntime {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    async fn load_container(&self, id: &str) -> Result<ContainerRef> {
        let inspect = inspect(&self.docker, id).await?;
        debug!(container = %id, "loaded container");
        Ok(Arc::new(DockerContainer {
            docker: self.docker.clone(),
            id: id.to_string(),
            inspect,
        }))
    }
}

/// Container handle backed by an inspect snapshot
pub struct DockerContainer {
    docker: Docker,
    id: String,
    inspect: ContainerInspectResponse,
}

impl DockerContainer {
    fn wait_client(&self) -> Docker {
        self.docker.clone().with_timeout(WAIT_TIMEOUT)
    }

    async fn attach_stdio(
        &self,
        attach: IoAttach,
        detach_keys: Option<String>,
    ) -> Result<StdioRelay> {
        let options = AttachContainerOptions::<String> {
            stdin: Some(attach.stdin),
            stdout: Some(attach.stdout),
            stderr: Some(attach.stderr),
            stream: Some(true),
            logs: Some(false),
            detach_keys,
        };

        let results = self
            .docker
            .attach_container(&self.id, Some(options))
            .await
            .map_err(|e| map_error(&self.id, e))?;

        Ok(StdioRelay::spawn(results, attach.stdin))
    }
}

#[async_trait]
impl Container for DockerContainer {
    fn id(&self) -> &str {
        &self.id
    }

    async fn spec(&self) -> Result<ProcessSpec> {
        Ok(process_spec(&self.inspect))
    }

    async fn attach_task(&self, attach: IoAttach) -> Result<TaskRef> {
        // The snapshot may be stale; ask again
        let current = inspect(&self.docker, &self.id).await?;
        if !is_running(&current) {
            return Err(Error::TaskNotFound(self.id.clone()));
        }

        let spec = process_spec(&current);
        let attach = IoAttach {
            stdin: attach.stdin && spec.open_stdin,
            ..attach
        };
        let relay = self.attach_stdio(attach, None).await?;

        Ok(Arc::new(DockerTask::running(
            self.docker.clone(),
            self.wait_client(),
            self.id.clone(),
            Some(relay),
        )))
    }

    async fn create_task(&self, io: IoConfig, options: &TaskOptions) -> Result<TaskRef> {
        let current = inspect(&self.docker, &self.id).await?;
        if is_running(&current) {
            return Err(Error::TaskCreate(format!(
                "container {} already has a running task",
                self.id
            )));
        }

        let spec = process_spec(&current);
        let relay = if io.is_discard() {
            None
        } else {
            // The Engine API carries streams over its own socket
            debug!(container = %self.id, fifo_dir = ?io.fifo_dir(), "streaming task io over the API socket");
            let attach = IoAttach {
                stdin: spec.open_stdin,
                ..IoAttach::stdio()
            };
            Some(
                self.attach_stdio(attach, options.detach_keys.clone())
                    .await
                    .map_err(|e| Error::TaskCreate(e.to_string()))?,
            )
        };

        Ok(Arc::new(DockerTask::created(
            self.docker.clone(),
            self.wait_client(),
            self.id.clone(),
            relay,
        )))
    }
}

// ============================================================================
// Helpers
// ============================================================================

async fn inspect(docker: &Docker, id: &str) -> Result<ContainerInspectResponse> {
    docker
        .inspect_container(id, None::<InspectContainerOptions>)
        .await
        .map_err(|e| map_error(id, e))
}

fn is_running(inspect: &ContainerInspectResponse) -> bool {
    inspect
        .state
        .as_ref()
        .and_then(|s| s.running)
        .unwrap_or(false)
}

fn process_spec(inspect: &ContainerInspectResponse) -> ProcessSpec {
    let config = inspect.config.as_ref();
    ProcessSpec {
        terminal: config.and_then(|c| c.tty).unwrap_or(false),
        open_stdin: config.and_then(|c| c.open_stdin).unwrap_or(false),
        args: config.and_then(|c| c.cmd.clone()).unwrap_or_default(),
    }
}

pub(crate) fn map_error(id: &str, e: DockerError) -> Error {
    match e {
        DockerError::DockerResponseServerError {
            status_code: 404, ..
        } => Error::ContainerNotFound(id.to_string()),
        other => Error::runtime(other.to_string()),
    }
}
