use std::fmt;
use std::fs::File;
use std::path::Path;

use cosmo_migrate_api_schema::{
    organization::find_all::{FindAllOrganizationsRequest, FindAllOrganizationsResponse},
    workspace::{
        create_secret::{CreateSecretRequest, CreateSecretResponse},
        find_all::{FindAllWorkspacesRequest, FindAllWorkspacesResponse},
        find_by_id::{FindWorkspaceByIdRequest, FindWorkspaceByIdResponse},
        upload_file::{UploadWorkspaceFileRequest, UploadWorkspaceFileResponse},
        WorkspaceFile,
    },
};
use log::debug;

use crate::multipart::MultipartForm;

pub mod multipart;

/// Blocking client for the Cosmo Tech API, authenticated with a bearer token
/// acquired once by the caller.
#[derive(Debug, Clone)]
pub struct CosmoApiClient {
    pub base_url: String,
    access_token: String,
    agent: ureq::Agent,
}

#[derive(Debug)]
pub enum CosmoApiClientError {
    Ureq(Box<ureq::Error>),
    IO(Box<std::io::Error>),
    /// Error status whose body was already read.
    Rejected {
        status: u16,
        url: String,
        message: String,
    },
}

impl CosmoApiClient {
    pub fn new(base_url: String, access_token: String) -> Self {
        let mut base_url = base_url;
        if base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            access_token,
            agent: ureq::AgentBuilder::new().build(),
        }
    }

    fn get(&self, url: &str) -> ureq::Request {
        self.agent
            .get(url)
            .set("Authorization", &format!("Bearer {}", self.access_token))
            .set("Accept", "application/json")
    }

    fn post(&self, url: &str) -> ureq::Request {
        self.agent
            .post(url)
            .set("Authorization", &format!("Bearer {}", self.access_token))
            .set("Accept", "application/json")
    }

    fn workspace_url(&self, organization_id: &str, workspace_id: &str) -> String {
        format!(
            "{}/organizations/{}/workspaces/{}",
            self.base_url,
            urlencoding::encode(organization_id),
            urlencoding::encode(workspace_id)
        )
    }

    pub fn find_all_organizations(
        &self,
        _request: FindAllOrganizationsRequest,
    ) -> Result<FindAllOrganizationsResponse, CosmoApiClientError> {
        let url = format!("{}/organizations", self.base_url);
        let organizations_res: FindAllOrganizationsResponse = self
            .get(&url)
            .call()
            .map_err(|e| CosmoApiClientError::Ureq(Box::new(e)))?
            .into_json()
            .map_err(|e| CosmoApiClientError::IO(Box::new(e)))?;
        Ok(organizations_res)
    }

    pub fn find_all_workspaces(
        &self,
        request: FindAllWorkspacesRequest,
    ) -> Result<FindAllWorkspacesResponse, CosmoApiClientError> {
        let url = format!(
            "{}/organizations/{}/workspaces",
            self.base_url,
            urlencoding::encode(&request.organization_id)
        );
        let workspaces_res: FindAllWorkspacesResponse = self
            .get(&url)
            .call()
            .map_err(|e| CosmoApiClientError::Ureq(Box::new(e)))?
            .into_json()
            .map_err(|e| CosmoApiClientError::IO(Box::new(e)))?;
        Ok(workspaces_res)
    }

    pub fn find_workspace_by_id(
        &self,
        request: FindWorkspaceByIdRequest,
    ) -> Result<FindWorkspaceByIdResponse, CosmoApiClientError> {
        let url = self.workspace_url(&request.organization_id, &request.workspace_id);
        let workspace_res: FindWorkspaceByIdResponse = self
            .get(&url)
            .call()
            .map_err(|e| CosmoApiClientError::Ureq(Box::new(e)))?
            .into_json()
            .map_err(|e| CosmoApiClientError::IO(Box::new(e)))?;
        Ok(workspace_res)
    }

    /// Streams `request.file` as the `file` part. A 409, or a 400 whose
    /// message says the file already exists, is the API's way of refusing to
    /// overwrite and is returned as [`UploadWorkspaceFileResponse::AlreadyExists`].
    pub fn upload_workspace_file(
        &self,
        request: UploadWorkspaceFileRequest,
    ) -> Result<UploadWorkspaceFileResponse, CosmoApiClientError> {
        let url = format!(
            "{}/files",
            self.workspace_url(&request.organization_id, &request.workspace_id)
        );
        let file = File::open(&request.file).map_err(|e| CosmoApiClientError::IO(Box::new(e)))?;
        let file_len = file
            .metadata()
            .map_err(|e| CosmoApiClientError::IO(Box::new(e)))?
            .len();

        let mut form = MultipartForm::new();
        form.text("overwrite", if request.overwrite { "true" } else { "false" });
        form.text("destination", &request.destination);
        let body = form.finish_with_file("file", file_name(&request.destination), file, file_len);
        debug!(
            "POST {} ({} bytes, destination={})",
            url, body.content_length, request.destination
        );

        let res = self
            .post(&url)
            .set("Content-Type", &body.content_type)
            .set("Content-Length", &body.content_length.to_string())
            .send(body.reader);
        match res {
            Ok(res) => {
                let file: WorkspaceFile = res
                    .into_json()
                    .map_err(|e| CosmoApiClientError::IO(Box::new(e)))?;
                Ok(UploadWorkspaceFileResponse::Uploaded { file })
            }
            Err(ureq::Error::Status(status @ (400 | 409), res)) => {
                let url = res.get_url().to_string();
                let message = res.into_string().unwrap_or_default();
                if status == 409 || is_already_exists(&message) {
                    Ok(UploadWorkspaceFileResponse::AlreadyExists { message })
                } else {
                    Err(CosmoApiClientError::Rejected {
                        status,
                        url,
                        message,
                    })
                }
            }
            Err(e) => Err(CosmoApiClientError::Ureq(Box::new(e))),
        }
    }

    pub fn create_secret(
        &self,
        request: CreateSecretRequest,
    ) -> Result<CreateSecretResponse, CosmoApiClientError> {
        let url = format!(
            "{}/secret",
            self.workspace_url(&request.organization_id, &request.workspace_id)
        );
        // The API answers 201 with an empty body.
        self.post(&url)
            .send_json(&request.workspace_secret)
            .map_err(|e| CosmoApiClientError::Ureq(Box::new(e)))?;
        Ok(CreateSecretResponse {})
    }
}

fn is_already_exists(message: &str) -> bool {
    message.to_lowercase().contains("already exists")
}

fn file_name(destination: &str) -> &str {
    Path::new(destination)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(destination)
}

impl fmt::Display for CosmoApiClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CosmoApiClientError::Ureq(e) => match e.as_ref() {
                ureq::Error::Status(code, res) => {
                    write!(f, "target API returned {} for {}", code, res.get_url())
                }
                ureq::Error::Transport(transport) => {
                    write!(f, "target API request failed: {}", transport)
                }
            },
            CosmoApiClientError::IO(e) => write!(f, "target API I/O error: {}", e),
            CosmoApiClientError::Rejected {
                status,
                url,
                message,
            } => write!(f, "target API returned {} for {}: {}", status, url, message),
        }
    }
}

impl std::error::Error for CosmoApiClientError {}
