use std::fmt;

/// A fully qualified workspace, written `o-###/w-###` on the command line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkspaceRef {
    pub organization_id: String,
    pub workspace_id: String,
}

/// One raw reference as typed by the operator, before any directory lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceRefPattern {
    Organization { organization_id: String },
    Workspace(WorkspaceRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceRefError {
    InvalidWorkspaceRef { input: String },
}

impl WorkspaceRef {
    pub fn new(organization_id: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            workspace_id: workspace_id.into(),
        }
    }

    /// Parses a reference that must name a single workspace.
    pub fn parse(input: &str) -> Result<Self, WorkspaceRefError> {
        match WorkspaceRefPattern::parse(input)? {
            WorkspaceRefPattern::Workspace(workspace_ref) => Ok(workspace_ref),
            WorkspaceRefPattern::Organization { .. } => Err(WorkspaceRefError::InvalidWorkspaceRef {
                input: input.to_string(),
            }),
        }
    }
}

impl WorkspaceRefPattern {
    pub fn parse(input: &str) -> Result<Self, WorkspaceRefError> {
        let ids: Vec<&str> = input.split('/').collect();
        if ids.iter().any(|id| id.is_empty()) {
            return Err(WorkspaceRefError::InvalidWorkspaceRef {
                input: input.to_string(),
            });
        }
        match ids.as_slice() {
            [organization_id] => Ok(WorkspaceRefPattern::Organization {
                organization_id: organization_id.to_string(),
            }),
            [organization_id, workspace_id] => Ok(WorkspaceRefPattern::Workspace(
                WorkspaceRef::new(*organization_id, *workspace_id),
            )),
            _ => Err(WorkspaceRefError::InvalidWorkspaceRef {
                input: input.to_string(),
            }),
        }
    }
}

impl fmt::Display for WorkspaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.organization_id, self.workspace_id)
    }
}

impl fmt::Display for WorkspaceRefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceRefError::InvalidWorkspaceRef { input } => {
                write!(f, "Invalid workspace ref '{}'", input)
            }
        }
    }
}

impl std::error::Error for WorkspaceRefError {}
