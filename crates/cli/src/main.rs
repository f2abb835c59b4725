//! `cplane` CLI — the main entry point.
//!
//! Commands:
//! - `serve`        — Start the credential-management HTTP gateway
//! - `connector`     — Inspect the connector registry
//! - `credential`    — Store/inspect/remove connector credentials
//! - `vault`         — Direct administrative vault access
//! - `doctor`        — Diagnose configuration and pipeline health
//! - `completions`   — Generate shell completions
//! - `version`       — Show detailed version info

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;

mod commands;
mod context;

#[derive(Parser)]
#[command(
    name = "cplane",
    about = "Governed Connector Plane — credential-scoped outbound integrations for agent tool calls",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the service config file (TOML)
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the credential-management HTTP gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the host (e.g. 0.0.0.0 for containers)
        #[arg(long)]
        host: Option<String>,
    },

    /// Inspect the connector registry
    Connector {
        #[command(subcommand)]
        action: ConnectorAction,
    },

    /// Store, inspect, or remove a connector's credentials
    Credential {
        #[command(subcommand)]
        action: CredentialAction,
    },

    /// Direct administrative access to the credential vault
    Vault {
        #[command(subcommand)]
        action: VaultAction,
    },

    /// Diagnose configuration and pipeline health
    Doctor,

    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show detailed version and build info
    Version,
}

#[derive(Subcommand)]
enum ConnectorAction {
    /// List every registered connector and its status
    List,
    /// Show one connector's manifest and credential state
    Status { connector_id: String },
}

#[derive(Subcommand)]
enum CredentialAction {
    /// Store a credential value for a connector's declared vault key
    Store {
        connector_id: String,
        vault_key: String,
        value: String,
        #[arg(long = "type", default_value = "api_key")]
        credential_type: String,
    },
    /// List a connector's declared credentials and whether each is present
    Status { connector_id: String },
    /// Remove a stored credential and revoke the connector's grant
    Delete {
        connector_id: String,
        vault_key: String,
    },
    /// Check whether a connector has everything it needs to run
    Validate { connector_id: String },
}

#[derive(Subcommand)]
enum VaultAction {
    /// Store a value under a vault key, independent of any connector grant
    Store {
        vault_key: String,
        value: String,
        #[arg(long = "type", default_value = "api_key")]
        credential_type: String,
    },
    /// List every vault key
    List,
    /// Delete a vault key
    Delete { vault_key: String },
    /// Show a vault entry's type and timestamps (never its value)
    Describe { vault_key: String },
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port, host } => commands::serve::run(cli.config, port, host).await?,

        Commands::Connector { action } => match action {
            ConnectorAction::List => commands::connector::list(cli.config).await?,
            ConnectorAction::Status { connector_id } => {
                commands::connector::status(cli.config, connector_id).await?
            }
        },

        Commands::Credential { action } => match action {
            CredentialAction::Store {
                connector_id,
                vault_key,
                value,
                credential_type,
            } => commands::credential::store(cli.config, connector_id, vault_key, value, credential_type).await?,
            CredentialAction::Status { connector_id } => {
                commands::credential::status(cli.config, connector_id).await?
            }
            CredentialAction::Delete { connector_id, vault_key } => {
                commands::credential::delete(cli.config, connector_id, vault_key).await?
            }
            CredentialAction::Validate { connector_id } => {
                commands::credential::validate(cli.config, connector_id).await?
            }
        },

        Commands::Vault { action } => match action {
            VaultAction::Store {
                vault_key,
                value,
                credential_type,
            } => commands::vault_cmd::store(cli.config, vault_key, value, credential_type).await?,
            VaultAction::List => commands::vault_cmd::list(cli.config).await?,
            VaultAction::Delete { vault_key } => commands::vault_cmd::delete(cli.config, vault_key).await?,
            VaultAction::Describe { vault_key } => commands::vault_cmd::describe(cli.config, vault_key).await?,
        },

        Commands::Doctor => commands::doctor::run(cli.config).await?,

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "cplane", &mut std::io::stdout());
        }

        Commands::Version => {
            println!("cplane v{}", env!("CARGO_PKG_VERSION"));
            println!("  arch: {}", std::env::consts::ARCH);
            println!("  os:   {}", std::env::consts::OS);
        }
    }

    Ok(())
}
