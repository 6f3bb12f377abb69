//! `ctask start`

use crate::StartArgs;
use ctask_foundation::CtaskConfig;
use ctask_task::{DockerRuntime, OsHost, StartRequest, TaskOptions, TaskStarter, Termination};

/// Start the container's task and wait for it
pub async fn start(config: &CtaskConfig, args: StartArgs) -> anyhow::Result<Termination> {
    let runtime = DockerRuntime::connect(config).await?;

    let request = build_request(config, args);
    tracing::debug!(container = %request.container_id, "starting task");

    let termination = TaskStarter::new(&runtime, OsHost)
        .with_default_fifo_dir(config.fifo_dir())
        .run(request)
        .await?;

    Ok(termination)
}

fn build_request(config: &CtaskConfig, args: StartArgs) -> StartRequest {
    let mut options = TaskOptions::default();
    if let Some(keys) = args.detach_keys.or_else(|| config.detach_keys.clone()) {
        options = options.with_detach_keys(keys);
    }

    let mut request = StartRequest::new(args.container)
        .with_null_io(args.null_io)
        .with_options(options);
    if let Some(dir) = args.fifo_dir {
        request = request.with_fifo_dir(dir);
    }
    if let Some(path) = args.pid_file {
        request = request.with_pid_file(path);
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(container: &str) -> StartArgs {
        StartArgs {
            container: container.to_string(),
            null_io: false,
            fifo_dir: None,
            pid_file: None,
            detach_keys: None,
        }
    }

    #[test]
    fn test_request_from_flags() {
        let mut flags = args("web");
        flags.null_io = true;
        flags.fifo_dir = Some(PathBuf::from("/tmp/fifo"));
        flags.pid_file = Some(PathBuf::from("/tmp/web.pid"));

        let request = build_request(&CtaskConfig::new(), flags);
        assert_eq!(request.container_id, "web");
        assert!(request.io.null_io);
        assert_eq!(request.io.fifo_dir, Some(PathBuf::from("/tmp/fifo")));
        assert_eq!(request.pid_file, Some(PathBuf::from("/tmp/web.pid")));
        assert!(request.options.detach_keys.is_none());
    }

    #[test]
    fn test_detach_keys_fall_back_to_config() {
        let mut config = CtaskConfig::new();
        config.detach_keys = Some("ctrl-p,ctrl-q".to_string());

        let request = build_request(&config, args("web"));
        assert_eq!(request.options.detach_keys.as_deref(), Some("ctrl-p,ctrl-q"));

        let mut flags = args("web");
        flags.detach_keys = Some("ctrl-x".to_string());
        let request = build_request(&config, flags);
        assert_eq!(request.options.detach_keys.as_deref(), Some("ctrl-x"));
    }
}
