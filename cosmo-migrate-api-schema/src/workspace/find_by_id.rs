use serde::{Deserialize, Serialize};

use super::Workspace;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindWorkspaceByIdRequest {
    pub organization_id: String,
    pub workspace_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FindWorkspaceByIdResponse {
    pub workspace: Workspace,
}
