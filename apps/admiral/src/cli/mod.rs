//! # CLI Module
//!
//! Command-line interface of the `admiral` binary.
//!
//! Resource commands work directly on the registry database; `serve` runs the
//! HTTP server on it and `conform` probes a live server.
//!
//! ```text
//! admiral [--db PATH] [--json] <command>
//!
//!   init [--force]
//!   serve [--addr ..] [--admin-keys ..] [--api-keys ..] [--in-memory]
//!   invite    create|get|list|delete|accept
//!   workspace create|get|list|rename|archive
//!   batch     create|get|list|cancel|delete|results
//!   sweep
//!   conform --base-url ..
//! ```

mod commands;
mod output;

pub use commands::{
    cmd_batch, cmd_conform, cmd_init, cmd_invite, cmd_serve, cmd_sweep, cmd_workspace,
    open_registry,
};
pub use output::Output;

use admiral_core::headers::DEFAULT_VERSION;
use admiral_core::{InviteRole, Timestamp};
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] admiral_core::Error),

    #[error(transparent)]
    Id(#[from] admiral_core::IdError),

    #[error("database '{0}' already exists (use --force to replace it)")]
    AlreadyExists(PathBuf),

    #[error("database '{0}' does not exist (run `admiral init` first)")]
    MissingDatabase(PathBuf),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("invalid batch file '{path}': {source}")]
    BatchFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Probe(#[from] crate::probe::ProbeError),
}

// =============================================================================
// ARGUMENTS
// =============================================================================

/// Reference server, registry tool and conformance probe for the Admiral API.
#[derive(Debug, Parser)]
#[command(name = "admiral", version, about)]
pub struct Cli {
    /// Registry database file
    #[arg(long, global = true, env = "ADMIRAL_DB", default_value = "admiral.redb")]
    pub db: PathBuf,

    /// Print results as pretty JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the registry database
    Init {
        /// Replace an existing database
        #[arg(long)]
        force: bool,
    },
    /// Run the HTTP API server
    Serve(ServeArgs),
    /// Manage organization invites
    #[command(subcommand)]
    Invite(InviteCommand),
    /// Manage workspaces
    #[command(subcommand)]
    Workspace(WorkspaceCommand),
    /// Manage message batches
    #[command(subcommand)]
    Batch(BatchCommand),
    /// Settle canceling and expired message batches
    Sweep,
    /// Probe a live server for conformance
    Conform(ConformArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Listen address
    #[arg(long, env = "ADMIRAL_ADDR", default_value = "127.0.0.1:8080")]
    pub addr: SocketAddr,

    /// Comma-separated admin API keys
    #[arg(long, env = "ADMIRAL_ADMIN_KEYS", default_value = "", hide_env_values = true)]
    pub admin_keys: String,

    /// Comma-separated workspace API keys
    #[arg(long, env = "ADMIRAL_API_KEYS", default_value = "", hide_env_values = true)]
    pub api_keys: String,

    /// Externally visible base URL, used in batch `results_url`s
    #[arg(long, env = "ADMIRAL_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Requests per second across the server (0 disables limiting)
    #[arg(long, env = "ADMIRAL_RATE_LIMIT", default_value_t = 0)]
    pub rate_limit: u32,

    /// Seconds between batch sweeps (0 disables the sweeper)
    #[arg(long, env = "ADMIRAL_SWEEP_SECS", default_value_t = 30)]
    pub sweep_secs: u64,

    /// Keep everything in memory instead of the database file
    #[arg(long)]
    pub in_memory: bool,
}

/// Pagination flags shared by the list commands.
#[derive(Debug, Clone, Default, Args)]
pub struct PageArgs {
    /// Page size
    #[arg(long)]
    pub limit: Option<u32>,
    /// Return items after this id
    #[arg(long, conflicts_with = "before_id")]
    pub after_id: Option<String>,
    /// Return items before this id
    #[arg(long)]
    pub before_id: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum InviteCommand {
    /// Send an invite
    Create {
        #[arg(long)]
        email: String,
        /// user, developer or billing
        #[arg(long, value_parser = parse_role, default_value = "user")]
        role: InviteRole,
    },
    /// Show an invite
    Get { id: String },
    /// List invites
    List(PageArgs),
    /// Delete a pending invite
    Delete { id: String },
    /// Mark a pending invite as accepted
    Accept { id: String },
}

#[derive(Debug, Clone, Subcommand)]
pub enum WorkspaceCommand {
    /// Create a workspace
    Create { name: String },
    /// Show a workspace
    Get { id: String },
    /// List workspaces
    List {
        #[command(flatten)]
        page: PageArgs,
        /// Include archived workspaces
        #[arg(long)]
        include_archived: bool,
    },
    /// Rename a workspace
    Rename { id: String, name: String },
    /// Archive a workspace
    Archive { id: String },
}

#[derive(Debug, Clone, Subcommand)]
pub enum BatchCommand {
    /// Submit a batch from a JSON file of the form {"requests": [...]}
    Create {
        #[arg(long)]
        file: PathBuf,
    },
    /// Show a batch
    Get { id: String },
    /// List batches, newest first
    List(PageArgs),
    /// Begin canceling a batch
    Cancel { id: String },
    /// Delete an ended batch
    Delete { id: String },
    /// Print the results of an ended batch as JSON Lines
    Results { id: String },
}

#[derive(Debug, Clone, Args)]
pub struct ConformArgs {
    /// Base URL of the server under test
    #[arg(long, env = "ADMIRAL_BASE_URL")]
    pub base_url: String,

    /// Admin API key
    #[arg(long, env = "ANTHROPIC_ADMIN_KEY", hide_env_values = true)]
    pub admin_key: Option<String>,

    /// Workspace API key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// anthropic-version to send
    #[arg(long, default_value = DEFAULT_VERSION)]
    pub version: String,

    /// anthropic-beta values (repeatable)
    #[arg(long = "beta")]
    pub betas: Vec<String>,

    /// Invite to fetch
    #[arg(long)]
    pub invite_id: Option<String>,

    /// Name of a workspace to create
    #[arg(long)]
    pub workspace_name: Option<String>,

    /// Ended message batch to delete
    #[arg(long)]
    pub batch_id: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

fn parse_role(value: &str) -> Result<InviteRole, String> {
    InviteRole::from_wire(value).ok_or_else(|| {
        format!("unknown role '{}' (expected user, developer, billing or admin)", value)
    })
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Run a parsed command line and return what it produced.
pub async fn run(cli: Cli) -> Result<Output, CliError> {
    let now = Timestamp::now();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.db, force),
        Command::Serve(args) => cmd_serve(&cli.db, &args).await,
        Command::Invite(command) => cmd_invite(&cli.db, &command, now),
        Command::Workspace(command) => cmd_workspace(&cli.db, &command, now),
        Command::Batch(command) => cmd_batch(&cli.db, &command, now),
        Command::Sweep => cmd_sweep(&cli.db, now),
        Command::Conform(args) => cmd_conform(&args).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_nested_commands() {
        let cli = Cli::try_parse_from([
            "admiral", "--db", "x.redb", "invite", "create", "--email", "a@example.com", "--role",
            "developer",
        ])
        .unwrap();
        assert_eq!(cli.db, PathBuf::from("x.redb"));
        match cli.command {
            Command::Invite(InviteCommand::Create { email, role }) => {
                assert_eq!(email, "a@example.com");
                assert_eq!(role, InviteRole::Developer);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_roles() {
        let parsed = Cli::try_parse_from([
            "admiral", "invite", "create", "--email", "a@example.com", "--role", "owner",
        ]);
        assert!(parsed.is_err());
    }
}
