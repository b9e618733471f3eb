//! Command-line interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use steward_common::StepKind;

#[derive(Parser, Debug)]
#[command(name = "stewardctl")]
#[command(about = "Debian maintenance: upgrades, cleanup and reboot checks", long_about = None)]
#[command(version = env!("STEWARD_VERSION"))]
pub struct Cli {
    /// Config file (default: /etc/steward/config.toml, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the maintenance pipeline
    Run {
        /// Never prompt; answer yes
        #[arg(long)]
        unattended: bool,

        /// Show what would change without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Step to skip (repeatable)
        #[arg(long, value_name = "STEP", value_parser = parse_step)]
        skip: Vec<StepKind>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether the system needs a reboot
    RebootCheck {
        #[arg(long)]
        json: bool,
    },

    /// Show which kernels would be kept and removed
    Kernels {
        /// Override keep_kernels
        #[arg(long, value_name = "N")]
        keep: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show recent run log entries
    Log {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_step(s: &str) -> Result<StepKind, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_with_skips() {
        let cli = Cli::try_parse_from([
            "stewardctl", "run", "--dry-run", "--skip", "snap", "--skip", "firmware",
        ])
        .unwrap();
        match cli.command {
            Command::Run { dry_run, skip, unattended, json } => {
                assert!(dry_run);
                assert!(!unattended);
                assert!(!json);
                assert_eq!(skip, vec![StepKind::SnapUpdate, StepKind::FirmwareCheck]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_step_rejected() {
        assert!(Cli::try_parse_from(["stewardctl", "run", "--skip", "defrag"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "stewardctl", "kernels", "--keep", "2", "--config", "/tmp/s.toml", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.toml")));
        assert!(matches!(cli.command, Command::Kernels { keep: Some(2), json: false }));
    }
}
