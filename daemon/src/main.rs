//! vspd: the voting service provider daemon.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use vsp_daemon::admin::config_path;
use vsp_node::{init_logging, LogFormat, VspConfig, VspNode};
use vsp_rpc::RpcServer;
use vsp_types::NetworkId;

#[derive(Parser)]
#[command(name = "vspd", about = "Voting service provider daemon")]
struct Cli {
    /// Path to the TOML config file. Defaults to `<home-dir>/vspd.toml`.
    #[arg(long, env = "VSPD_CONFIG")]
    config: Option<PathBuf>,

    /// Application home directory.
    #[arg(long, env = "VSPD_HOME")]
    home_dir: Option<PathBuf>,

    /// Network: "mainnet", "testnet" or "simnet".
    #[arg(long, env = "VSPD_NETWORK")]
    network: Option<NetworkId>,

    /// Address the HTTP API listens on.
    #[arg(long, env = "VSPD_LISTEN")]
    listen: Option<String>,

    /// Log level or `RUST_LOG`-style filter.
    #[arg(long, env = "VSPD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output: "human" or "json".
    #[arg(long, env = "VSPD_LOG_FORMAT")]
    log_format: Option<String>,

    /// Expose Prometheus metrics at /metrics.
    #[arg(long, env = "VSPD_ENABLE_METRICS")]
    metrics: bool,

    /// Refuse new tickets.
    #[arg(long, env = "VSPD_CLOSED")]
    vsp_closed: bool,
}

fn load_config(cli: Cli) -> anyhow::Result<VspConfig> {
    let home_dir = cli
        .home_dir
        .clone()
        .unwrap_or_else(|| VspConfig::default().home_dir);
    let path = cli.config.clone().unwrap_or_else(|| config_path(&home_dir));

    let mut config = if path.exists() {
        VspConfig::from_toml_file(&path)?
    } else if cli.config.is_some() {
        anyhow::bail!("config file {} not found", path.display());
    } else {
        VspConfig::default()
    };

    if let Some(home_dir) = cli.home_dir {
        config.home_dir = home_dir;
    }
    if let Some(network) = cli.network {
        config.network = network;
    }
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    config.enable_metrics |= cli.metrics;
    config.vsp_closed |= cli.vsp_closed;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config(Cli::parse())?;
    let format: LogFormat = config.log_format.parse()?;
    init_logging(format, &config.log_level)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        network = %config.network,
        home = %config.home_dir.display(),
        "vspd starting"
    );
    if config.vsp_closed {
        tracing::warn!(message = %config.vsp_closed_msg, "service is closed to new tickets");
    }

    let listen = config.listen.clone();
    let mut node = VspNode::open(config).context("failed to start voting service")?;
    let server = RpcServer::new(&listen, node.core.clone())?;
    node.start();

    let api_shutdown = node.shutdown.subscribe();
    let mut api = tokio::spawn(server.serve(api_shutdown));

    let shutdown = node.shutdown.clone();
    let early_exit = tokio::select! {
        _ = shutdown.wait_for_signal() => None,
        result = &mut api => Some(result),
    };
    let served = match early_exit {
        // The server only returns early on failure.
        Some(result) => {
            shutdown.shutdown();
            result
        }
        None => api.await,
    };

    node.stop().await?;
    match served {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(e).context("API server failed"),
        Err(e) => return Err(e).context("API server task panicked"),
    }
    tracing::info!("vspd exited cleanly");
    Ok(())
}
