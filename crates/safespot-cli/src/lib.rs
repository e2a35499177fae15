//! SafeSpot CLI
//!
//! Command-line front end for the SafeSpot safety monitor. It wires the
//! `safespot-guard` pipeline to the SafeSpot backend, using simulated device
//! sensors so the whole escalation path can be exercised off-device.
//!
//! # Usage
//!
//! ```bash
//! # Monitor until Ctrl-C, alerting through the console
//! safespot run --user-id Swetha_01 --lat 9.94 --lng 78.12
//!
//! # Force an escalation on the first tick (test mode)
//! safespot run --user-id Swetha_01 --force-abnormal --policy immediate
//!
//! # List trusted contacts the dispatcher would alert
//! safespot contacts --user-id Swetha_01
//!
//! # Send one sample to the classifier
//! safespot classify --pattern shaking
//!
//! # Show the SOS message without sending it
//! safespot alert-preview --intensity "Hard Bump" --phone "+91 98765 43210"
//! ```

use clap::{Parser, Subcommand};

pub mod guard;

/// SafeSpot Command Line Interface
#[derive(Parser, Debug)]
#[command(name = "safespot")]
#[command(author, version, about = "Abnormal-movement monitoring and SOS escalation")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start monitoring with simulated sensors until interrupted
    Run(guard::RunArgs),

    /// List the trusted contacts an escalation would reach
    Contacts(guard::ContactsArgs),

    /// Send one motion sample for classification and print the verdict
    Classify(guard::ClassifyArgs),

    /// Print the SOS message and device links without sending anything
    AlertPreview(guard::AlertPreviewArgs),

    /// Display version information
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "safespot",
            "run",
            "--user-id",
            "Swetha_01",
            "--force-abnormal",
            "--policy",
            "immediate",
            "--pattern",
            "shaking",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.backend.user_id.as_deref(), Some("Swetha_01"));
                assert!(args.force_abnormal);
                assert!(matches!(args.policy, Some(guard::PolicyArg::Immediate)));
                assert!(matches!(args.pattern, guard::PatternArg::Shaking));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_alert_preview() {
        let cli = Cli::try_parse_from(["safespot", "alert-preview", "--lat", "9.94", "--lng", "78.12"]).unwrap();
        assert!(matches!(cli.command, Commands::AlertPreview(_)));
    }
}
