//! Workspaces.

use super::object_marker;
use crate::{Timestamp, WorkspaceId};
use serde::{Deserialize, Serialize};

object_marker!(
    /// `"workspace"`
    WorkspaceObject::Workspace = "workspace"
);

/// Colors assigned to new workspaces, in rotation.
pub const DISPLAY_PALETTE: [&str; 8] = [
    "#6C5BB9", "#D97757", "#4A8FCB", "#5C9E6F", "#C7A146", "#B4507A", "#3F8C8C", "#8A6E4B",
];

/// A named grouping of API keys and resources within the organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    #[serde(rename = "type")]
    pub object: WorkspaceObject,
    pub name: String,
    pub created_at: Timestamp,
    pub archived_at: Option<Timestamp>,
    pub display_color: String,
}

impl Workspace {
    /// A new, active workspace.
    #[must_use]
    pub fn new(id: WorkspaceId, name: String, display_color: String, now: Timestamp) -> Self {
        Self {
            id,
            object: WorkspaceObject::Workspace,
            name,
            created_at: now,
            archived_at: None,
            display_color,
        }
    }

    /// Whether the workspace has been archived.
    #[must_use]
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

/// Palette color for the `seq`-th workspace.
#[must_use]
pub fn palette_color(seq: u64) -> &'static str {
    DISPLAY_PALETTE[(seq % DISPLAY_PALETTE.len() as u64) as usize]
}

/// Body of `POST /v1/organizations/workspaces`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateWorkspaceRequest {
    pub name: String,
}

/// Body of `POST /v1/organizations/workspaces/{workspace_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateWorkspaceRequest {
    pub name: String,
}
