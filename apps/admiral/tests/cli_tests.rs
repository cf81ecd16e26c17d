//! Integration tests for Admiral CLI commands.
//!
//! Uses tempfile for the registry database.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use admiral::cli::{
    cmd_batch, cmd_init, cmd_invite, cmd_sweep, cmd_workspace, open_registry, BatchCommand,
    CliError, InviteCommand, Output, PageArgs, WorkspaceCommand,
};
use admiral_core::{InviteRole, InviteStatus, ProcessingStatus, Timestamp};
use std::path::PathBuf;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Create a temporary directory for tests.
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Create and initialise a database inside `dir`.
fn init_db(dir: &TempDir) -> PathBuf {
    let db = dir.path().join("admiral.redb");
    cmd_init(&db, false).unwrap();
    db
}

fn t0() -> Timestamp {
    Timestamp::parse("2024-10-30T23:58:27.427722Z").unwrap()
}

/// Create a sample batch file.
fn create_batch_file(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("batch.json");
    let content = r#"{
        "requests": [
            {"custom_id": "my-first-request", "params": {"model": "claude-3-5-sonnet-20240620", "max_tokens": 1024, "messages": [{"role": "user", "content": "Hello, world"}]}},
            {"custom_id": "my-second-request", "params": {"model": "claude-3-5-sonnet-20240620", "max_tokens": 1024, "messages": [{"role": "user", "content": "Hi again, friend"}]}}
        ]
    }"#;
    std::fs::write(&path, content).unwrap();
    path
}

// =============================================================================
// INIT COMMAND TESTS
// =============================================================================

#[test]
fn test_init_creates_database() {
    let temp = create_temp_dir();
    let db = temp.path().join("nested").join("admiral.redb");

    let result = cmd_init(&db, false);
    assert!(result.is_ok());
    assert!(db.exists());
}

#[test]
fn test_init_fails_if_exists_without_force() {
    let temp = create_temp_dir();
    let db = init_db(&temp);

    let result = cmd_init(&db, false);
    assert!(matches!(result, Err(CliError::AlreadyExists(_))));
}

#[test]
fn test_init_with_force_starts_over() {
    let temp = create_temp_dir();
    let db = init_db(&temp);
    cmd_workspace(&db, &WorkspaceCommand::Create { name: "Gone".into() }, t0()).unwrap();

    cmd_init(&db, true).unwrap();
    let listed = cmd_workspace(
        &db,
        &WorkspaceCommand::List {
            page: PageArgs::default(),
            include_archived: true,
        },
        t0(),
    )
    .unwrap();
    let Output::Workspaces(page) = listed else {
        panic!("expected a workspace page");
    };
    assert!(page.data.is_empty());
}

#[test]
fn test_commands_need_an_initialised_database() {
    let temp = create_temp_dir();
    let db = temp.path().join("missing.redb");
    assert!(matches!(open_registry(&db), Err(CliError::MissingDatabase(_))));
    assert!(cmd_sweep(&db, t0()).is_err());
}

// =============================================================================
// INVITE COMMAND TESTS
// =============================================================================

#[test]
fn test_invite_create_accept_and_list() {
    let temp = create_temp_dir();
    let db = init_db(&temp);

    let created = cmd_invite(
        &db,
        &InviteCommand::Create {
            email: "new.hire@example.com".into(),
            role: InviteRole::Developer,
        },
        t0(),
    )
    .unwrap();
    let Output::Invite(invite) = created else {
        panic!("expected an invite");
    };
    assert_eq!(invite.status, InviteStatus::Pending);

    let accepted = cmd_invite(
        &db,
        &InviteCommand::Accept {
            id: invite.id.to_string(),
        },
        t0(),
    )
    .unwrap();
    let Output::Invite(accepted) = accepted else {
        panic!("expected an invite");
    };
    assert_eq!(accepted.status, InviteStatus::Accepted);

    let listed = cmd_invite(&db, &InviteCommand::List(PageArgs::default()), t0()).unwrap();
    assert!(listed.render(false).contains("new.hire@example.com"));
}

#[test]
fn test_invite_get_rejects_foreign_ids() {
    let temp = create_temp_dir();
    let db = init_db(&temp);
    let result = cmd_invite(
        &db,
        &InviteCommand::Get {
            id: "wrkspc_01abc".into(),
        },
        t0(),
    );
    assert!(matches!(result, Err(CliError::Id(_))));
}

// =============================================================================
// WORKSPACE COMMAND TESTS
// =============================================================================

#[test]
fn test_workspace_rename_and_archive() {
    let temp = create_temp_dir();
    let db = init_db(&temp);

    let Output::Workspace(ws) =
        cmd_workspace(&db, &WorkspaceCommand::Create { name: "Before".into() }, t0()).unwrap()
    else {
        panic!("expected a workspace");
    };

    let Output::Workspace(renamed) = cmd_workspace(
        &db,
        &WorkspaceCommand::Rename {
            id: ws.id.to_string(),
            name: "After".into(),
        },
        t0(),
    )
    .unwrap() else {
        panic!("expected a workspace");
    };
    assert_eq!(renamed.name, "After");

    let archived = cmd_workspace(
        &db,
        &WorkspaceCommand::Archive {
            id: ws.id.to_string(),
        },
        t0(),
    )
    .unwrap();
    assert!(archived.render(false).contains("archived"));
}

// =============================================================================
// BATCH COMMAND TESTS
// =============================================================================

#[test]
fn test_batch_cancel_results_delete() {
    let temp = create_temp_dir();
    let db = init_db(&temp);
    let file = create_batch_file(&temp);

    let Output::Batch(batch) = cmd_batch(&db, &BatchCommand::Create { file }, t0()).unwrap() else {
        panic!("expected a batch");
    };
    assert_eq!(batch.request_counts.processing, 2);
    let id = batch.id.to_string();

    cmd_batch(&db, &BatchCommand::Cancel { id: id.clone() }, t0()).unwrap();
    let results = cmd_batch(&db, &BatchCommand::Results { id: id.clone() }, t0()).unwrap();
    let text = results.render(true);
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains(r#"{"custom_id":"my-first-request","result":{"type":"canceled"}}"#));

    let Output::BatchDeleted(receipt) =
        cmd_batch(&db, &BatchCommand::Delete { id: id.clone() }, t0()).unwrap()
    else {
        panic!("expected a deletion receipt");
    };
    assert_eq!(receipt.id, batch.id);
    assert!(cmd_batch(&db, &BatchCommand::Get { id }, t0()).is_err());
}

#[test]
fn test_batch_file_must_be_valid() {
    let temp = create_temp_dir();
    let db = init_db(&temp);
    let file = temp.path().join("broken.json");
    std::fs::write(&file, "{ not json").unwrap();

    let result = cmd_batch(&db, &BatchCommand::Create { file }, t0());
    assert!(matches!(result, Err(CliError::BatchFile { .. })));
}

// =============================================================================
// SWEEP COMMAND TESTS
// =============================================================================

#[test]
fn test_sweep_expires_old_batches() {
    let temp = create_temp_dir();
    let db = init_db(&temp);
    let file = create_batch_file(&temp);
    let Output::Batch(batch) = cmd_batch(&db, &BatchCommand::Create { file }, t0()).unwrap() else {
        panic!("expected a batch");
    };

    let swept = cmd_sweep(&db, t0().plus_hours(1)).unwrap();
    assert!(matches!(swept, Output::Swept { ended: 0 }));

    let swept = cmd_sweep(&db, t0().plus_hours(24)).unwrap();
    assert!(matches!(swept, Output::Swept { ended: 1 }));

    let Output::Batch(ended) = cmd_batch(
        &db,
        &BatchCommand::Get {
            id: batch.id.to_string(),
        },
        t0().plus_hours(25),
    )
    .unwrap() else {
        panic!("expected a batch");
    };
    assert_eq!(ended.processing_status, ProcessingStatus::Ended);
    assert_eq!(ended.request_counts.expired, 2);
}
