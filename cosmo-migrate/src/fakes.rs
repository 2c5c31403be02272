//! In-memory backends for unit tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::PathBuf;

use cosmo_migrate_api_schema::{
    organization::{
        find_all::{FindAllOrganizationsRequest, FindAllOrganizationsResponse},
        Organization,
    },
    workspace::{
        create_secret::{CreateSecretRequest, CreateSecretResponse},
        find_all::{FindAllWorkspacesRequest, FindAllWorkspacesResponse},
        find_by_id::{FindWorkspaceByIdRequest, FindWorkspaceByIdResponse},
        upload_file::{UploadWorkspaceFileRequest, UploadWorkspaceFileResponse},
        Workspace, WorkspaceFile, WorkspaceSecret,
    },
};
use cosmo_migrate_blob_storage::{
    BlobItem, ContainerItem, DownloadBlobRequest, DownloadBlobResponse, ListBlobsRequest,
    ListBlobsResponse, ListContainersRequest, ListContainersResponse,
};
use cosmo_migrate_common::workspace_ref::WorkspaceRef;
use cosmo_migrate_kube::{
    secret::{ObjectMeta, Secret},
    DeleteNamespacedSecretRequest, DeleteNamespacedSecretResponse, ListNamespacedSecretRequest,
    ListNamespacedSecretResponse,
};

use crate::backend::{
    SourceObjectStore, SourceSecretStore, WorkspaceDirectory, WorkspaceFileStore,
    WorkspaceSecretStore,
};
use crate::error::MigrateError;

fn failure(message: &str) -> MigrateError {
    MigrateError::IO(Box::new(std::io::Error::other(message.to_string())))
}

/// Destination API: organizations with their workspaces, stored files and
/// created secrets.
#[derive(Default)]
pub struct FakeApi {
    pub organizations: BTreeMap<String, Vec<Workspace>>,
    pub existing_files: BTreeSet<(WorkspaceRef, String)>,
    pub uploads: RefCell<Vec<(WorkspaceRef, String, Vec<u8>)>>,
    pub uploaded_paths: RefCell<Vec<PathBuf>>,
    pub secrets: RefCell<Vec<(WorkspaceRef, WorkspaceSecret)>>,
    pub calls: RefCell<Vec<String>>,
    pub fail_uploads: bool,
    pub fail_create_secret: bool,
}

impl FakeApi {
    pub fn organization(mut self, organization_id: &str, workspaces: &[(&str, &str)]) -> Self {
        let workspaces = workspaces
            .iter()
            .map(|(id, key)| Workspace {
                id: id.to_string(),
                key: key.to_string(),
                name: None,
            })
            .collect();
        self.organizations
            .insert(organization_id.to_string(), workspaces);
        self
    }
}

impl WorkspaceDirectory for FakeApi {
    fn find_all_organizations(
        &self,
        _request: FindAllOrganizationsRequest,
    ) -> Result<FindAllOrganizationsResponse, MigrateError> {
        self.calls.borrow_mut().push("find_all_organizations".to_string());
        Ok(FindAllOrganizationsResponse {
            organizations: self
                .organizations
                .keys()
                .map(|id| Organization {
                    id: id.clone(),
                    name: None,
                })
                .collect(),
        })
    }

    fn find_all_workspaces(
        &self,
        request: FindAllWorkspacesRequest,
    ) -> Result<FindAllWorkspacesResponse, MigrateError> {
        self.calls
            .borrow_mut()
            .push(format!("find_all_workspaces {}", request.organization_id));
        let workspaces = self
            .organizations
            .get(&request.organization_id)
            .ok_or_else(|| failure("organization not found"))?;
        Ok(FindAllWorkspacesResponse {
            workspaces: workspaces.clone(),
        })
    }
}

impl WorkspaceFileStore for FakeApi {
    fn upload_workspace_file(
        &self,
        request: UploadWorkspaceFileRequest,
    ) -> Result<UploadWorkspaceFileResponse, MigrateError> {
        if self.fail_uploads {
            return Err(failure("upload refused"));
        }
        assert!(!request.overwrite);
        let workspace_ref = WorkspaceRef::new(&request.organization_id, &request.workspace_id);
        if self
            .existing_files
            .contains(&(workspace_ref.clone(), request.destination.clone()))
        {
            return Ok(UploadWorkspaceFileResponse::AlreadyExists {
                message: format!("{} already exists", request.destination),
            });
        }
        let content = std::fs::read(&request.file)?;
        self.uploaded_paths.borrow_mut().push(request.file.clone());
        self.uploads
            .borrow_mut()
            .push((workspace_ref, request.destination.clone(), content));
        Ok(UploadWorkspaceFileResponse::Uploaded {
            file: WorkspaceFile {
                file_name: request.destination,
            },
        })
    }
}

impl WorkspaceSecretStore for FakeApi {
    fn find_workspace_by_id(
        &self,
        request: FindWorkspaceByIdRequest,
    ) -> Result<FindWorkspaceByIdResponse, MigrateError> {
        self.calls
            .borrow_mut()
            .push(format!("find_workspace_by_id {}", request.workspace_id));
        let workspace = self
            .organizations
            .get(&request.organization_id)
            .and_then(|workspaces| workspaces.iter().find(|w| w.id == request.workspace_id))
            .ok_or_else(|| failure("workspace not found"))?;
        Ok(FindWorkspaceByIdResponse {
            workspace: workspace.clone(),
        })
    }

    fn create_secret(
        &self,
        request: CreateSecretRequest,
    ) -> Result<CreateSecretResponse, MigrateError> {
        if self.fail_create_secret {
            return Err(failure("secret refused"));
        }
        self.secrets.borrow_mut().push((
            WorkspaceRef::new(request.organization_id, request.workspace_id),
            request.workspace_secret,
        ));
        Ok(CreateSecretResponse {})
    }
}

/// Source storage: container name to blob name to content.
#[derive(Default)]
pub struct FakeStorage {
    pub containers: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
}

impl FakeStorage {
    pub fn with_blobs(container: &str, blobs: &[(&str, &str)]) -> Self {
        let blobs = blobs
            .iter()
            .map(|(name, content)| (name.to_string(), content.as_bytes().to_vec()))
            .collect();
        Self {
            containers: BTreeMap::from([(container.to_string(), blobs)]),
        }
    }
}

impl SourceObjectStore for FakeStorage {
    fn list_containers(
        &self,
        request: ListContainersRequest,
    ) -> Result<ListContainersResponse, MigrateError> {
        Ok(ListContainersResponse {
            containers: self
                .containers
                .keys()
                .filter(|name| name.starts_with(&request.prefix))
                .map(|name| ContainerItem { name: name.clone() })
                .collect(),
        })
    }

    fn list_blobs(&self, request: ListBlobsRequest) -> Result<ListBlobsResponse, MigrateError> {
        let blobs = self
            .containers
            .get(&request.container)
            .ok_or_else(|| failure("container not found"))?;
        Ok(ListBlobsResponse {
            blobs: blobs
                .iter()
                .filter(|(name, _)| name.starts_with(&request.prefix))
                .map(|(name, content)| BlobItem {
                    name: name.clone(),
                    content_length: Some(content.len() as u64),
                })
                .collect(),
        })
    }

    fn download_blob(
        &self,
        request: DownloadBlobRequest,
        writer: &mut dyn Write,
    ) -> Result<DownloadBlobResponse, MigrateError> {
        let content = self
            .containers
            .get(&request.container)
            .and_then(|blobs| blobs.get(&request.blob_name))
            .ok_or_else(|| failure("blob not found"))?;
        writer.write_all(content)?;
        Ok(DownloadBlobResponse {
            size: content.len() as u64,
        })
    }
}

/// Source cluster: secrets per namespace.
#[derive(Default)]
pub struct FakeCluster {
    pub secrets: RefCell<BTreeMap<(String, String), Secret>>,
    pub deleted: RefCell<Vec<(String, String)>>,
    pub fail_delete: bool,
}

impl FakeCluster {
    pub fn with_secret(namespace: &str, name: &str, data: &[(&str, &str)]) -> Self {
        let cluster = Self::default();
        cluster.secrets.borrow_mut().insert(
            (namespace.to_string(), name.to_string()),
            Secret {
                metadata: ObjectMeta {
                    name: name.to_string(),
                    namespace: Some(namespace.to_string()),
                },
                data: Some(
                    data.iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                ),
            },
        );
        cluster
    }
}

impl SourceSecretStore for FakeCluster {
    fn list_namespaced_secret(
        &self,
        request: ListNamespacedSecretRequest,
    ) -> Result<ListNamespacedSecretResponse, MigrateError> {
        Ok(ListNamespacedSecretResponse {
            items: self
                .secrets
                .borrow()
                .iter()
                .filter(|((namespace, _), _)| *namespace == request.namespace)
                .map(|(_, secret)| secret.clone())
                .collect(),
        })
    }

    fn delete_namespaced_secret(
        &self,
        request: DeleteNamespacedSecretRequest,
    ) -> Result<DeleteNamespacedSecretResponse, MigrateError> {
        if self.fail_delete {
            return Err(failure("delete refused"));
        }
        self.secrets
            .borrow_mut()
            .remove(&(request.namespace.clone(), request.name.clone()))
            .ok_or_else(|| failure("secret not found"))?;
        self.deleted
            .borrow_mut()
            .push((request.namespace, request.name));
        Ok(DeleteNamespacedSecretResponse {})
    }
}
