use serde::{Deserialize, Serialize};

use super::Workspace;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindAllWorkspacesRequest {
    pub organization_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FindAllWorkspacesResponse {
    pub workspaces: Vec<Workspace>,
}
