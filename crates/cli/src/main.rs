mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rawether")]
#[command(about = "Send and capture raw Ethernet frames with kernel timestamps")]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file with a [socket] table
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the hardware address of an interface
    Mac(commands::mac::MacArgs),

    /// Send timestamped frames to a destination
    Send(commands::send::SendArgs),

    /// Wait for frames of one EtherType and print them
    Listen(commands::listen::ListenArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Mac(args) => commands::mac::run(args),
        Commands::Send(args) => commands::send::run(args, &config.socket),
        Commands::Listen(args) => commands::listen::run(args, &config.socket),
    }
}
