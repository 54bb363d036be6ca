//! Entry point for the execri runtime server.

use clap::Parser;
use execri::{CriServer, NodeOptions};
use execri_shared::constants::{defaults, envs};
use execri_shared::{ExecriError, ExecriResult, Transport};
use std::path::PathBuf;
use tracing::info;

/// execri - container runtime interface backed by executor programs
#[derive(Parser, Debug)]
#[command(author, version, about = "execri - container runtime interface server")]
struct Args {
    /// Listen URI for the runtime endpoint
    ///
    /// Examples:
    ///   --listen unix:///run/execri.sock
    ///   --listen tcp://127.0.0.1:9090
    #[arg(short, long, env = envs::LISTEN, default_value = defaults::LISTEN)]
    listen: String,

    /// Node name passed to every executor invocation
    #[arg(long, env = envs::NODE, default_value = defaults::NODE)]
    node: String,

    /// Directory holding the pod, showip and ct programs
    #[arg(long, env = envs::BIN_DIR, default_value = defaults::BIN_DIR)]
    bindir: PathBuf,

    /// Root of the images/ and nodes/ layout
    #[arg(long, env = envs::ROOT_DIR, default_value = defaults::ROOT_DIR)]
    rootdir: PathBuf,
}

impl Args {
    fn options(&self) -> NodeOptions {
        NodeOptions {
            node: self.node.clone(),
            bin_dir: self.bindir.clone(),
            root_dir: self.rootdir.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExecriResult<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("[PANIC] execri panicked: {}", panic_info);
        std::process::exit(1);
    }));

    // Respects RUST_LOG, defaults to "info"
    if let Err(e) = tracing_subscriber::fmt()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
    {
        eprintln!("[ERROR] Failed to initialize tracing: {}", e);
    }

    let args = Args::parse();
    let options = args.options();
    options.validate()?;

    let transport = Transport::from_uri(&args.listen)
        .map_err(|e| ExecriError::Config(format!("Invalid listen URI: {}", e)))?;

    info!(
        node = %options.node,
        bin_dir = %options.bin_dir.display(),
        root_dir = %options.root_dir.display(),
        "Starting execri on {}",
        transport
    );

    CriServer::new(&options).run(transport).await
}
