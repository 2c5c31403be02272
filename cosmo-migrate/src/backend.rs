use std::io::Write;

use cosmo_migrate_api_client::CosmoApiClient;
use cosmo_migrate_api_schema::{
    organization::find_all::{FindAllOrganizationsRequest, FindAllOrganizationsResponse},
    workspace::{
        create_secret::{CreateSecretRequest, CreateSecretResponse},
        find_all::{FindAllWorkspacesRequest, FindAllWorkspacesResponse},
        find_by_id::{FindWorkspaceByIdRequest, FindWorkspaceByIdResponse},
        upload_file::{UploadWorkspaceFileRequest, UploadWorkspaceFileResponse},
    },
};
use cosmo_migrate_blob_storage::{
    BlobServiceClient, DownloadBlobRequest, DownloadBlobResponse, ListBlobsRequest,
    ListBlobsResponse, ListContainersRequest, ListContainersResponse,
};
use cosmo_migrate_kube::{
    DeleteNamespacedSecretRequest, DeleteNamespacedSecretResponse, KubeClient,
    ListNamespacedSecretRequest, ListNamespacedSecretResponse,
};

use crate::error::MigrateError;

/// Organization and workspace listing of the destination API.
pub trait WorkspaceDirectory {
    fn find_all_organizations(
        &self,
        request: FindAllOrganizationsRequest,
    ) -> Result<FindAllOrganizationsResponse, MigrateError>;

    fn find_all_workspaces(
        &self,
        request: FindAllWorkspacesRequest,
    ) -> Result<FindAllWorkspacesResponse, MigrateError>;
}

pub trait WorkspaceFileStore {
    fn upload_workspace_file(
        &self,
        request: UploadWorkspaceFileRequest,
    ) -> Result<UploadWorkspaceFileResponse, MigrateError>;
}

pub trait WorkspaceSecretStore {
    fn find_workspace_by_id(
        &self,
        request: FindWorkspaceByIdRequest,
    ) -> Result<FindWorkspaceByIdResponse, MigrateError>;

    fn create_secret(
        &self,
        request: CreateSecretRequest,
    ) -> Result<CreateSecretResponse, MigrateError>;
}

/// Read-only view of the source object storage.
pub trait SourceObjectStore {
    fn list_containers(
        &self,
        request: ListContainersRequest,
    ) -> Result<ListContainersResponse, MigrateError>;

    fn list_blobs(&self, request: ListBlobsRequest) -> Result<ListBlobsResponse, MigrateError>;

    fn download_blob(
        &self,
        request: DownloadBlobRequest,
        writer: &mut dyn Write,
    ) -> Result<DownloadBlobResponse, MigrateError>;
}

pub trait SourceSecretStore {
    fn list_namespaced_secret(
        &self,
        request: ListNamespacedSecretRequest,
    ) -> Result<ListNamespacedSecretResponse, MigrateError>;

    fn delete_namespaced_secret(
        &self,
        request: DeleteNamespacedSecretRequest,
    ) -> Result<DeleteNamespacedSecretResponse, MigrateError>;
}

impl WorkspaceDirectory for CosmoApiClient {
    fn find_all_organizations(
        &self,
        request: FindAllOrganizationsRequest,
    ) -> Result<FindAllOrganizationsResponse, MigrateError> {
        Ok(CosmoApiClient::find_all_organizations(self, request)?)
    }

    fn find_all_workspaces(
        &self,
        request: FindAllWorkspacesRequest,
    ) -> Result<FindAllWorkspacesResponse, MigrateError> {
        Ok(CosmoApiClient::find_all_workspaces(self, request)?)
    }
}

impl WorkspaceFileStore for CosmoApiClient {
    fn upload_workspace_file(
        &self,
        request: UploadWorkspaceFileRequest,
    ) -> Result<UploadWorkspaceFileResponse, MigrateError> {
        Ok(CosmoApiClient::upload_workspace_file(self, request)?)
    }
}

impl WorkspaceSecretStore for CosmoApiClient {
    fn find_workspace_by_id(
        &self,
        request: FindWorkspaceByIdRequest,
    ) -> Result<FindWorkspaceByIdResponse, MigrateError> {
        Ok(CosmoApiClient::find_workspace_by_id(self, request)?)
    }

    fn create_secret(
        &self,
        request: CreateSecretRequest,
    ) -> Result<CreateSecretResponse, MigrateError> {
        Ok(CosmoApiClient::create_secret(self, request)?)
    }
}

impl SourceObjectStore for BlobServiceClient {
    fn list_containers(
        &self,
        request: ListContainersRequest,
    ) -> Result<ListContainersResponse, MigrateError> {
        Ok(BlobServiceClient::list_containers(self, request)?)
    }

    fn list_blobs(&self, request: ListBlobsRequest) -> Result<ListBlobsResponse, MigrateError> {
        Ok(BlobServiceClient::list_blobs(self, request)?)
    }

    fn download_blob(
        &self,
        request: DownloadBlobRequest,
        writer: &mut dyn Write,
    ) -> Result<DownloadBlobResponse, MigrateError> {
        Ok(BlobServiceClient::download_blob(self, request, writer)?)
    }
}

impl SourceSecretStore for KubeClient {
    fn list_namespaced_secret(
        &self,
        request: ListNamespacedSecretRequest,
    ) -> Result<ListNamespacedSecretResponse, MigrateError> {
        Ok(KubeClient::list_namespaced_secret(self, request)?)
    }

    fn delete_namespaced_secret(
        &self,
        request: DeleteNamespacedSecretRequest,
    ) -> Result<DeleteNamespacedSecretResponse, MigrateError> {
        Ok(KubeClient::delete_namespaced_secret(self, request)?)
    }
}
