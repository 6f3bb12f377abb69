//! ctask CLI - Main entry point

mod cli;

use clap::{Parser, Subcommand};
use ctask_foundation::CtaskConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// ctask - start container tasks and mirror their exit
#[derive(Parser, Debug)]
#[command(name = "ctask")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Runtime API address (e.g. unix:///var/run/docker.sock)
    #[arg(short, long, global = true)]
    address: Option<String>,

    /// Timeout for runtime requests, in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Container runtime (docker, podman)
    #[arg(long, global = true)]
    runtime: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a container's task and wait for it to exit
    Start(StartArgs),
}

#[derive(clap::Args, Debug)]
pub struct StartArgs {
    /// Container id
    #[arg(value_name = "CONTAINER")]
    pub container: String,

    /// Send all IO to /dev/null
    #[arg(long)]
    pub null_io: bool,

    /// Directory used for storing IO FIFOs
    #[arg(long, value_name = "DIR")]
    pub fifo_dir: Option<PathBuf>,

    /// File path to write the task's pid
    #[arg(long, value_name = "PATH")]
    pub pid_file: Option<PathBuf>,

    /// Key sequence for detaching from a terminal-backed task
    #[arg(long, value_name = "KEYS")]
    pub detach_keys: Option<String>,
}

fn main() {
    let args = Args::parse();

    let code = match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ctask: {}", render_error(&e));
            1
        }
    };

    std::process::exit(code);
}

fn run(args: Args) -> anyhow::Result<i32> {
    let config = load_config(&args)?;

    // Initialize logging
    let log_level = if args.debug { "debug" } else { config.log_level() };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = match args.command {
        Command::Start(start) => runtime.block_on(cli::start(&config, start)),
    };
    // The stdin relay may still sit in a blocking read
    runtime.shutdown_background();

    let termination = result?;
    Ok(i32::try_from(termination.code()).unwrap_or(i32::MAX))
}

/// Plain message for user-facing errors, full chain for everything else
fn render_error(e: &anyhow::Error) -> String {
    match e.downcast_ref::<ctask_foundation::Error>() {
        Some(inner) if inner.is_user_facing() => inner.to_string(),
        _ => format!("{:#} (rerun with --debug for details)", e),
    }
}

/// Config files and environment, then command-line flags
fn load_config(args: &Args) -> anyhow::Result<CtaskConfig> {
    let mut config = CtaskConfig::load()?;

    if let Some(runtime) = &args.runtime {
        config = config.with_runtime(runtime.parse()?);
    }
    if let Some(address) = &args.address {
        config = config.with_address(address.clone());
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = Some(timeout);
    }

    Ok(config)
}
