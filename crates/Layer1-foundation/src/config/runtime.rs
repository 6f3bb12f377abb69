//! Container runtime kind

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::Error;

/// Container runtime serving a Docker-compatible Engine API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRuntime {
    #[default]
    Docker,
    Podman,
}

impl ContainerRuntime {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }

    /// Default API socket for this runtime
    pub fn default_address(&self) -> String {
        match self {
            Self::Docker => "unix:///var/run/docker.sock".to_string(),
            Self::Podman => match std::env::var("XDG_RUNTIME_DIR") {
                Ok(dir) if !dir.is_empty() => format!("unix://{}/podman/podman.sock", dir),
                _ => "unix:///run/podman/podman.sock".to_string(),
            },
        }
    }
}

impl FromStr for ContainerRuntime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "podman" => Ok(Self::Podman),
            other => Err(Error::Config(format!("Unknown runtime: {}", other))),
        }
    }
}

impl std::fmt::Display for ContainerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
