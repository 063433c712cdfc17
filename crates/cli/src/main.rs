//! Job Center CLI - operator tools for the admin gate.
//!
//! # Usage
//!
//! ```bash
//! # Classify a backend failure message
//! jc-cli classify "IC0508: Canister gkorp-uqaaa-aaaab-qeptq-cai is stopped"
//!
//! # Print the effective classification rules (optionally from a YAML file)
//! jc-cli rules --rules config/error-rules.yaml
//!
//! # Check that ADMIN_BACKEND_TOKEN identifies an admin
//! jc-cli check-access
//! ```
//!
//! # Commands
//!
//! - `classify` - Show how a failure message would be handled
//! - `rules` - Print the classification table as YAML
//! - `check-access` - Verify the configured identity against the backend

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "jc-cli")]
#[command(author, version, about = "Job Center admin CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a backend failure message
    Classify {
        /// Raw failure message as reported by the backend
        message: String,

        /// YAML rule table replacing the built-in rules
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Service identifier named in stopped-service messages
        #[arg(short, long, default_value = "backend")]
        service: String,
    },
    /// Print the effective classification rules
    Rules {
        /// YAML rule table replacing the built-in rules
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Service identifier named in stopped-service messages
        #[arg(short, long, default_value = "backend")]
        service: String,
    },
    /// Verify the configured identity holds the admin role
    CheckAccess,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Classify {
            message,
            rules,
            service,
        } => commands::classify::classify(&message, rules.as_deref(), &service)?,
        Commands::Rules { rules, service } => {
            commands::classify::rules(rules.as_deref(), &service)?;
        }
        Commands::CheckAccess => commands::access::check().await?,
    }
    Ok(())
}
