//! `wahook qr` - operate on QR scan counters from the shell

use crate::server::{init_stores, load_config};
use anyhow::{Context, Result};
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum QrCommands {
    /// Print the current scan count of a session
    Show {
        /// Instance identifier
        instance_id: String,
        /// Gateway session name
        session: String,
    },
    /// Clear the scan count of a session
    Reset {
        /// Instance identifier
        instance_id: String,
        /// Gateway session name
        session: String,
    },
}

pub async fn run(command: QrCommands) -> Result<()> {
    let config = load_config().context("Failed to load configuration")?;
    let stores = init_stores(&config)?;
    let tracker = stores.tracker;

    match command {
        QrCommands::Show {
            instance_id,
            session,
        } => {
            let count = tracker
                .current_count(&instance_id, &session)
                .await
                .context("Failed to read QR scan count")?;
            println!(
                "{} {}/{}",
                tracker.counter_key(&instance_id, &session),
                count,
                tracker.config().threshold
            );
        }
        QrCommands::Reset {
            instance_id,
            session,
        } => {
            tracker.reset_scan(&instance_id, &session).await;
            println!("Reset {}", tracker.counter_key(&instance_id, &session));
        }
    }

    Ok(())
}
