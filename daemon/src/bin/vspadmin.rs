//! vspadmin: create the database, write a default config, rotate fee keys.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use vsp_daemon::admin;
use vsp_types::{Clock, NetworkId, SystemClock};

#[derive(Parser)]
#[command(name = "vspadmin", about = "Voting service provider maintenance tool")]
struct Cli {
    /// Application home directory.
    #[arg(long, default_value = "./vspd_data", env = "VSPD_HOME")]
    home_dir: PathBuf,

    /// Network: "mainnet", "testnet" or "simnet".
    #[arg(long, default_value = "mainnet", env = "VSPD_NETWORK")]
    network: NetworkId,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new database using <xpub> as the fee key.
    #[command(name = "createdatabase")]
    CreateDatabase { xpub: String },

    /// Write a config file with default values.
    #[command(name = "writeconfig")]
    WriteConfig,

    /// Replace the current fee key with <xpub>.
    #[command(name = "retirexpub")]
    RetireXPub { xpub: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::CreateDatabase { xpub } => {
            let dir = admin::create_database(&cli.home_dir, cli.network, &xpub)?;
            println!("New {} database created in {}", cli.network, dir.display());
        }
        Command::WriteConfig => {
            let path = admin::write_config(&cli.home_dir)?;
            println!("Config file with default values written to {}", path.display());
            println!("Edit the file and fill in values specific to your vspd deployment");
        }
        Command::RetireXPub { xpub } => {
            let current = admin::retire_xpub(&cli.home_dir, cli.network, &xpub, SystemClock.now())?;
            println!("Fee xpub replaced, new tickets use key {}", current.id);
        }
    }
    Ok(())
}
