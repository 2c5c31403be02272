use serde::{Deserialize, Serialize};

use super::WorkspaceSecret;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSecretRequest {
    pub organization_id: String,
    pub workspace_id: String,
    pub workspace_secret: WorkspaceSecret,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSecretResponse {}
