//! Workspace operations.

use super::Registry;
use crate::models::{
    paginate, palette_color, CreateWorkspaceRequest, Page, PageRequest, UpdateWorkspaceRequest,
    Workspace, ADMIN_MAX_PAGE_LIMIT,
};
use crate::storage::{Collection, ReadRecords};
use crate::{validate, Error, Result, Timestamp, WorkspaceId};

fn load(tx: &impl ReadRecords, id: &WorkspaceId) -> Result<(u64, Workspace)> {
    tx.get(Collection::Workspaces, id.as_str())?
        .ok_or_else(|| Error::not_found(format!("workspace '{}' not found", id)))
}

fn ensure_active(workspace: &Workspace) -> Result<()> {
    if workspace.is_archived() {
        return Err(Error::invalid(format!(
            "workspace '{}' is archived and cannot be modified",
            workspace.id
        )));
    }
    Ok(())
}

impl Registry {
    /// `POST /v1/organizations/workspaces`.
    pub fn create_workspace(
        &self,
        request: &CreateWorkspaceRequest,
        now: Timestamp,
    ) -> Result<Workspace> {
        validate::workspace_name(&request.name)?;
        self.transact(|tx| {
            let seq = tx.next_sequence(Collection::Workspaces)?;
            let workspace = Workspace::new(
                WorkspaceId::from_sequence(seq),
                request.name.clone(),
                palette_color(seq).to_string(),
                now,
            );
            tx.put(Collection::Workspaces, workspace.id.as_str(), seq, &workspace)?;
            Ok(workspace)
        })
    }

    pub fn get_workspace(&self, id: &WorkspaceId) -> Result<Workspace> {
        self.read(|tx| load(tx, id)).map(|(_, ws)| ws)
    }

    /// Workspaces in creation order. Archived ones only when asked for.
    pub fn list_workspaces(
        &self,
        page: &PageRequest,
        include_archived: bool,
    ) -> Result<Page<Workspace>> {
        let all: Vec<(u64, Workspace)> = self.read(|tx| tx.list(Collection::Workspaces))?;
        let visible: Vec<Workspace> = all
            .into_iter()
            .map(|(_, ws)| ws)
            .filter(|ws| include_archived || !ws.is_archived())
            .collect();
        paginate(visible, page, ADMIN_MAX_PAGE_LIMIT, |ws| ws.id.as_str())
    }

    /// Rename an active workspace.
    pub fn update_workspace(
        &self,
        id: &WorkspaceId,
        request: &UpdateWorkspaceRequest,
    ) -> Result<Workspace> {
        validate::workspace_name(&request.name)?;
        self.transact(|tx| {
            let (seq, mut workspace) = load(tx, id)?;
            ensure_active(&workspace)?;
            workspace.name = request.name.clone();
            tx.put(Collection::Workspaces, id.as_str(), seq, &workspace)?;
            Ok(workspace)
        })
    }

    /// Archive a workspace. Archiving is permanent.
    pub fn archive_workspace(&self, id: &WorkspaceId, now: Timestamp) -> Result<Workspace> {
        self.transact(|tx| {
            let (seq, mut workspace) = load(tx, id)?;
            ensure_active(&workspace)?;
            workspace.archived_at = Some(now);
            tx.put(Collection::Workspaces, id.as_str(), seq, &workspace)?;
            Ok(workspace)
        })
    }
}
