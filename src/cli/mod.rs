// CLI module for lebrq-offline
// Author: kelexine (https://github.com/kelexine)

use clap::Parser;

/// lebrq-offline - Offline request router for the LebrQ client shell
#[derive(Parser, Debug)]
#[command(name = "lebrq-offline", version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML config file (default: ~/.lebrq-offline/config.toml)
    #[arg(long, short = 'c')]
    pub config: Option<String>,

    /// Upstream origin to front, e.g. https://lebrq.example
    #[arg(long, env = "LEBRQ_OFFLINE_ORIGIN")]
    pub origin: Option<String>,

    /// Cache epoch identifier; changing it drops every older epoch
    #[arg(long)]
    pub epoch: Option<String>,

    /// Port to listen on
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}
