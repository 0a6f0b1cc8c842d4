//! CLI module for wahook
//!
//! Provides commands:
//! - `serve`: run the webhook server (default)
//! - `doctor`: configuration and backend diagnostics
//! - `qr`: inspect or clear a session's QR scan counter

use clap::{Parser, Subcommand};

pub mod doctor;
pub mod qr;

/// wahook CLI
#[derive(Parser, Debug)]
#[command(name = "wahook")]
#[command(about = "WhatsApp gateway webhook receiver")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server (default)
    Serve,
    /// Run system diagnostics
    Doctor,
    /// Inspect or clear QR scan counters
    Qr {
        #[command(subcommand)]
        command: qr::QrCommands,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Doctor) => doctor::run().await,
        Some(Commands::Qr { command }) => qr::run(command).await,
        Some(Commands::Serve) | None => crate::server::run().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_serves() {
        let cli = Cli::try_parse_from(["wahook"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_qr_show_parses() {
        let cli = Cli::try_parse_from(["wahook", "qr", "show", "inst-1", "default"]).unwrap();
        match cli.command {
            Some(Commands::Qr {
                command: qr::QrCommands::Show { instance_id, session },
            }) => {
                assert_eq!(instance_id, "inst-1");
                assert_eq!(session, "default");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_qr_reset_requires_session() {
        assert!(Cli::try_parse_from(["wahook", "qr", "reset", "inst-1"]).is_err());
    }
}
