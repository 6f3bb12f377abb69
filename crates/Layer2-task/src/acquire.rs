//! Task acquisition
//!
//! Reuse the container's running task when there is one, otherwise create a
//! fresh one. A created task is never started here.

use crate::io::{IoAttach, IoConfig};
use crate::runtime::{Container, TaskOptions, TaskRef};
use ctask_foundation::{Error, Result};
use tracing::{debug, info, warn};

/// A task handle together with how it was obtained
pub enum Acquired {
    /// An already running task, reconnected to its existing streams
    Attached(TaskRef),
    /// A new task created with the resolved IO configuration
    Created(TaskRef),
}

impl Acquired {
    pub fn into_task(self) -> TaskRef {
        match self {
            Acquired::Attached(task) | Acquired::Created(task) => task,
        }
    }

    pub fn is_attached(&self) -> bool {
        matches!(self, Acquired::Attached(_))
    }
}

impl std::fmt::Debug for Acquired {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Acquired::Attached(task) => f.debug_tuple("Attached").field(&task.id()).finish(),
            Acquired::Created(task) => f.debug_tuple("Created").field(&task.id()).finish(),
        }
    }
}

/// Attach to the running task, falling back to creation on any attach failure.
///
/// Only a creation failure is returned to the caller.
pub async fn acquire_task(
    container: &dyn Container,
    io: IoConfig,
    options: &TaskOptions,
) -> Result<Acquired> {
    match container.attach_task(IoAttach::stdio()).await {
        Ok(task) => {
            info!(container = %container.id(), "attached to running task");
            return Ok(Acquired::Attached(task));
        }
        Err(e) if e.is_task_not_found() => {
            debug!(container = %container.id(), "no running task, creating one");
        }
        Err(e) => {
            // Not a plain "no task"; the backend still gets a chance to create one
            warn!(container = %container.id(), error = %e, "attach failed, creating a new task");
        }
    }

    let task = container
        .create_task(io, options)
        .await
        .map_err(|e| match e {
            Error::TaskCreate(_) => e,
            other => Error::TaskCreate(other.to_string()),
        })?;
    info!(container = %container.id(), "created task");
    Ok(Acquired::Created(task))
}
