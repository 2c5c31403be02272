use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::WorkspaceFile;

/// Sent as `multipart/form-data`; `file` is the local path streamed as the
/// `file` part.
#[derive(Debug, Clone)]
pub struct UploadWorkspaceFileRequest {
    pub organization_id: String,
    pub workspace_id: String,
    pub destination: String,
    pub overwrite: bool,
    pub file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UploadWorkspaceFileResponse {
    Uploaded { file: WorkspaceFile },
    /// The API refused the upload because `destination` is already taken and
    /// `overwrite` was false.
    AlreadyExists { message: String },
}
