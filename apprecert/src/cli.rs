use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::commands;
use crate::config::Config;
use crate::output;

/// Apprecert - Local development certificates trusted everywhere
#[derive(Parser)]
#[command(name = "apprecert")]
#[command(version, disable_version_flag = true)]
#[command(about = "Apprecert - Local development certificates trusted everywhere")]
#[command(after_help = "Examples:\n  \
    apprecert --install\n  \
    apprecert example.test '*.example.test' localhost 127.0.0.1 ::1\n  \
    apprecert --uninstall")]
#[command(group(ArgGroup::new("mode").args(["install", "uninstall", "hosts"]).multiple(false)))]
pub struct Cli {
    /// Show version
    #[arg(long)]
    pub version: bool,

    /// Show verbose output
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Install the local CA in every trust store found on this machine
    #[arg(long)]
    pub install: bool,

    /// Remove the local CA from every trust store found on this machine
    #[arg(long)]
    pub uninstall: bool,

    /// Directory holding the CA (default: $CAROOT, then the user data directory)
    #[arg(long, value_name = "DIR")]
    pub caroot: Option<PathBuf>,

    /// Issue the certificate with an ECDSA P-256 key instead of RSA-2048
    #[arg(long)]
    pub ecdsa: bool,

    /// Stop propagating trust at the first failed store
    #[arg(long)]
    pub fail_fast: bool,

    /// Host names, IP addresses or e-mail addresses to issue a certificate for
    #[arg(value_name = "HOSTS")]
    pub hosts: Vec<String>,
}

impl Cli {
    pub fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        if self.version {
            println!("{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }

        if !self.install && !self.uninstall && self.hosts.is_empty() {
            output::muted("Nothing to do. Run apprecert --help for usage.");
            return Ok(());
        }

        let config = Config::load(self.caroot)?;

        if self.install {
            commands::trust::install(&config, self.fail_fast)
        } else if self.uninstall {
            commands::trust::uninstall(&config, self.fail_fast)
        } else {
            commands::issue::run(&config, &self.hosts, self.ecdsa)
        }
    }
}
