use std::collections::BTreeSet;

use cosmo_migrate_api_schema::{
    organization::find_all::FindAllOrganizationsRequest, workspace::find_all::FindAllWorkspacesRequest,
};
use cosmo_migrate_common::workspace_ref::{WorkspaceRef, WorkspaceRefPattern};
use log::{debug, info};

use crate::backend::WorkspaceDirectory;
use crate::error::MigrateError;

/// Parses every raw reference up front so a typo fails the run before any
/// network call.
pub fn parse_workspace_refs(inputs: &[String]) -> Result<Vec<WorkspaceRefPattern>, MigrateError> {
    inputs
        .iter()
        .map(|input| Ok(WorkspaceRefPattern::parse(input)?))
        .collect()
}

/// Resolves organization-only patterns (or no pattern at all) through the
/// directory. The result is sorted and free of duplicates.
pub fn expand_workspace_refs<D: WorkspaceDirectory>(
    directory: &D,
    patterns: Vec<WorkspaceRefPattern>,
) -> Result<Vec<WorkspaceRef>, MigrateError> {
    let patterns = if patterns.is_empty() {
        directory
            .find_all_organizations(FindAllOrganizationsRequest {})?
            .organizations
            .into_iter()
            .map(|organization| WorkspaceRefPattern::Organization {
                organization_id: organization.id,
            })
            .collect()
    } else {
        patterns
    };

    let mut workspace_refs = BTreeSet::new();
    for pattern in patterns {
        match pattern {
            WorkspaceRefPattern::Organization { organization_id } => {
                let workspaces = directory
                    .find_all_workspaces(FindAllWorkspacesRequest {
                        organization_id: organization_id.clone(),
                    })?
                    .workspaces;
                debug!("{}: {} workspace(s)", organization_id, workspaces.len());
                for workspace in workspaces {
                    workspace_refs.insert(WorkspaceRef::new(organization_id.clone(), workspace.id));
                }
            }
            WorkspaceRefPattern::Workspace(workspace_ref) => {
                workspace_refs.insert(workspace_ref);
            }
        }
    }

    info!("Migrating {} workspace(s)", workspace_refs.len());
    Ok(workspace_refs.into_iter().collect())
}
