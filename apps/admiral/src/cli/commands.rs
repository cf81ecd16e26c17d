//! Command implementations.
//!
//! Each `cmd_*` function takes the database path and the parsed arguments and
//! returns an [`Output`]; printing is left to the caller.

use super::{
    BatchCommand, CliError, ConformArgs, InviteCommand, Output, PageArgs, ServeArgs,
    WorkspaceCommand,
};
use crate::api::{self, auth::KeyRing, AppState};
use crate::probe::{self, ProbeConfig};
use admiral_core::{
    CreateBatchRequest, CreateInviteRequest, CreateWorkspaceRequest, InviteId, MessageBatchId,
    PageRequest, Registry, Timestamp, UpdateWorkspaceRequest, WorkspaceId,
};
use std::path::Path;
use std::time::Duration;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open an existing registry database.
pub fn open_registry(db: &Path) -> Result<Registry, CliError> {
    if !db.exists() {
        return Err(CliError::MissingDatabase(db.to_path_buf()));
    }
    Ok(Registry::open(db)?)
}

fn page_request(args: &PageArgs) -> PageRequest {
    PageRequest {
        before_id: args.before_id.clone(),
        after_id: args.after_id.clone(),
        limit: args.limit,
    }
}

// =============================================================================
// DATABASE
// =============================================================================

/// Create the database file, optionally replacing an existing one.
pub fn cmd_init(db: &Path, force: bool) -> Result<Output, CliError> {
    if db.exists() {
        if !force {
            return Err(CliError::AlreadyExists(db.to_path_buf()));
        }
        std::fs::remove_file(db).map_err(|source| CliError::Io {
            path: db.to_path_buf(),
            source,
        })?;
    }
    if let Some(parent) = db.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| CliError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Registry::open(db)?;
    tracing::info!(db = %db.display(), "registry initialised");
    Ok(Output::message(format!("initialised {}", db.display())))
}

/// Settle every due message batch.
pub fn cmd_sweep(db: &Path, now: Timestamp) -> Result<Output, CliError> {
    let registry = open_registry(db)?;
    let ended = registry.sweep(now)?;
    Ok(Output::Swept { ended })
}

// =============================================================================
// RESOURCES
// =============================================================================

pub fn cmd_invite(db: &Path, command: &InviteCommand, now: Timestamp) -> Result<Output, CliError> {
    let registry = open_registry(db)?;
    let output = match command {
        InviteCommand::Create { email, role } => {
            let request = CreateInviteRequest {
                email: email.clone(),
                role: *role,
            };
            Output::Invite(registry.create_invite(&request, now)?)
        }
        InviteCommand::Get { id } => {
            Output::Invite(registry.get_invite(&InviteId::parse(id.as_str())?, now)?)
        }
        InviteCommand::List(page) => {
            Output::Invites(registry.list_invites(&page_request(page), now)?)
        }
        InviteCommand::Delete { id } => {
            Output::InviteDeleted(registry.delete_invite(&InviteId::parse(id.as_str())?, now)?)
        }
        InviteCommand::Accept { id } => {
            Output::Invite(registry.accept_invite(&InviteId::parse(id.as_str())?, now)?)
        }
    };
    Ok(output)
}

pub fn cmd_workspace(
    db: &Path,
    command: &WorkspaceCommand,
    now: Timestamp,
) -> Result<Output, CliError> {
    let registry = open_registry(db)?;
    let output = match command {
        WorkspaceCommand::Create { name } => {
            let request = CreateWorkspaceRequest { name: name.clone() };
            Output::Workspace(registry.create_workspace(&request, now)?)
        }
        WorkspaceCommand::Get { id } => {
            Output::Workspace(registry.get_workspace(&WorkspaceId::parse(id.as_str())?)?)
        }
        WorkspaceCommand::List {
            page,
            include_archived,
        } => Output::Workspaces(registry.list_workspaces(&page_request(page), *include_archived)?),
        WorkspaceCommand::Rename { id, name } => {
            let request = UpdateWorkspaceRequest { name: name.clone() };
            Output::Workspace(
                registry.update_workspace(&WorkspaceId::parse(id.as_str())?, &request)?,
            )
        }
        WorkspaceCommand::Archive { id } => {
            Output::Workspace(registry.archive_workspace(&WorkspaceId::parse(id.as_str())?, now)?)
        }
    };
    Ok(output)
}

pub fn cmd_batch(db: &Path, command: &BatchCommand, now: Timestamp) -> Result<Output, CliError> {
    let registry = open_registry(db)?;
    let output = match command {
        BatchCommand::Create { file } => {
            let text = std::fs::read_to_string(file).map_err(|source| CliError::Io {
                path: file.clone(),
                source,
            })?;
            let request: CreateBatchRequest =
                serde_json::from_str(&text).map_err(|source| CliError::BatchFile {
                    path: file.clone(),
                    source,
                })?;
            Output::Batch(registry.create_batch(&request, now)?)
        }
        BatchCommand::Get { id } => {
            Output::Batch(registry.get_batch(&MessageBatchId::parse(id.as_str())?, now)?)
        }
        BatchCommand::List(page) => {
            Output::Batches(registry.list_batches(&page_request(page), now)?)
        }
        BatchCommand::Cancel { id } => {
            Output::Batch(registry.cancel_batch(&MessageBatchId::parse(id.as_str())?, now)?)
        }
        BatchCommand::Delete { id } => Output::BatchDeleted(
            registry.delete_batch(&MessageBatchId::parse(id.as_str())?, now)?,
        ),
        BatchCommand::Results { id } => {
            Output::Results(registry.batch_results(&MessageBatchId::parse(id.as_str())?, now)?)
        }
    };
    Ok(output)
}

// =============================================================================
// SERVER & PROBE
// =============================================================================

/// Run the API server until Ctrl-C.
pub async fn cmd_serve(db: &Path, args: &ServeArgs) -> Result<Output, CliError> {
    let registry = if args.in_memory {
        Registry::in_memory()?
    } else {
        Registry::open(db)?
    };
    let public_url = args
        .public_url
        .clone()
        .unwrap_or_else(|| format!("http://{}", args.addr));
    let registry = registry.with_public_url(public_url);

    let keys = KeyRing::from_lists(&args.admin_keys, &args.api_keys);
    if keys.is_empty() {
        tracing::warn!("no API keys configured; every request will be rejected");
    }

    let state = AppState::new(registry, keys).with_rate_limit(args.rate_limit);
    let location = if args.in_memory {
        "(memory)".to_string()
    } else {
        db.display().to_string()
    };
    tracing::info!(
        db = %location,
        rate_limit = args.rate_limit,
        sweep_secs = args.sweep_secs,
        "starting server"
    );
    api::serve(state, args.addr, Duration::from_secs(args.sweep_secs))
        .await
        .map_err(CliError::Serve)?;
    Ok(Output::message("server stopped"))
}

/// Probe a live server.
pub async fn cmd_conform(args: &ConformArgs) -> Result<Output, CliError> {
    let mut config = ProbeConfig::new(args.base_url.clone());
    config.admin_key = args.admin_key.clone();
    config.api_key = args.api_key.clone();
    config.version = args.version.clone();
    config.betas = args.betas.clone();
    config.invite_id = args
        .invite_id
        .as_deref()
        .map(InviteId::parse)
        .transpose()?;
    config.workspace_name = args.workspace_name.clone();
    config.batch_id = args
        .batch_id
        .as_deref()
        .map(MessageBatchId::parse)
        .transpose()?;
    config.timeout = Duration::from_secs(args.timeout_secs);

    let outcomes = probe::run_probe(&config).await?;
    Ok(Output::Probe(outcomes))
}
