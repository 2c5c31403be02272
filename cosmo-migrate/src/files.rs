use std::io::Write;

use cosmo_migrate_api_client::CosmoApiClient;
use cosmo_migrate_api_schema::workspace::upload_file::{
    UploadWorkspaceFileRequest, UploadWorkspaceFileResponse,
};
use cosmo_migrate_azure_identity::{DefaultAzureCredential, TokenCredential};
use cosmo_migrate_blob_storage::{
    BlobServiceClient, DownloadBlobRequest, ListBlobsRequest, ListContainersRequest,
};
use cosmo_migrate_common::workspace_ref::WorkspaceRef;
use log::{debug, info, warn};

use crate::args::MoveWorkspaceFilesArgs;
use crate::backend::{SourceObjectStore, WorkspaceFileStore};
use crate::error::MigrateError;
use crate::expand::{expand_workspace_refs, parse_workspace_refs};

pub const AZURE_STORAGE_CONNECTION_STRING: &str = "AZURE_STORAGE_CONNECTION_STRING";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyFilesReport {
    pub copied: usize,
    pub skipped: usize,
}

/// Copies every blob stored under `<workspace_id>/` in the organization's
/// container to the workspace file store, never overwriting.
pub fn copy_files<S: SourceObjectStore, F: WorkspaceFileStore>(
    source: &S,
    target: &F,
    workspace_ref: &WorkspaceRef,
) -> Result<CopyFilesReport, MigrateError> {
    info!("Migrating {}", workspace_ref);
    let mut report = CopyFilesReport::default();

    // Listing is by prefix; only the container named exactly after the
    // organization belongs to it.
    let container = workspace_ref.organization_id.to_lowercase();
    let found = source
        .list_containers(ListContainersRequest {
            prefix: container.clone(),
        })?
        .containers
        .iter()
        .any(|item| item.name == container);
    if !found {
        info!("No source container {}", container);
        info!(" -> Done {} file(s)", report.copied);
        return Ok(report);
    }

    let workspace_prefix = format!("{}/", workspace_ref.workspace_id);
    let blobs = source
        .list_blobs(ListBlobsRequest {
            container: container.clone(),
            prefix: workspace_prefix.clone(),
        })?
        .blobs;
    for blob in blobs {
        let file_name = match blob.name.strip_prefix(&workspace_prefix) {
            Some(file_name) if !file_name.is_empty() => file_name,
            _ => {
                debug!("ignoring blob {}", blob.name);
                continue;
            }
        };
        debug!(" - {}", file_name);

        let mut blob_data = tempfile::NamedTempFile::new()?;
        source.download_blob(
            DownloadBlobRequest {
                container: container.clone(),
                blob_name: blob.name.clone(),
            },
            blob_data.as_file_mut(),
        )?;
        blob_data.as_file_mut().flush()?;

        let res = target.upload_workspace_file(UploadWorkspaceFileRequest {
            organization_id: workspace_ref.organization_id.clone(),
            workspace_id: workspace_ref.workspace_id.clone(),
            destination: file_name.to_string(),
            overwrite: false,
            file: blob_data.path().to_path_buf(),
        })?;
        match res {
            UploadWorkspaceFileResponse::Uploaded { .. } => report.copied += 1,
            UploadWorkspaceFileResponse::AlreadyExists { message } => {
                warn!("Skipping {}, already exists: {}", file_name, message);
                report.skipped += 1;
            }
        }
    }

    if report.skipped > 0 {
        info!(
            " -> Done {} file(s), skipped {} existing file(s)",
            report.copied, report.skipped
        );
    } else {
        info!(" -> Done {} file(s)", report.copied);
    }
    Ok(report)
}

/// Copies each workspace in turn. The first error aborts the run; workspaces
/// already handled stay migrated.
pub fn copy_all_files<S, T>(
    source: &S,
    target: &T,
    workspace_refs: &[WorkspaceRef],
) -> Result<CopyFilesReport, MigrateError>
where
    S: SourceObjectStore,
    T: WorkspaceFileStore,
{
    let mut total = CopyFilesReport::default();
    for workspace_ref in workspace_refs {
        let report = copy_files(source, target, workspace_ref)?;
        total.copied += report.copied;
        total.skipped += report.skipped;
    }
    Ok(total)
}

/// Entry point of `move-workspace-files`.
pub fn run(args: MoveWorkspaceFilesArgs) -> Result<(), MigrateError> {
    let patterns = parse_workspace_refs(&args.workspace_refs)?;
    let connection_string = std::env::var(AZURE_STORAGE_CONNECTION_STRING)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or(MigrateError::MissingEnvironmentVariable {
            name: AZURE_STORAGE_CONNECTION_STRING,
            purpose: "source storage location",
        })?;
    let storage = BlobServiceClient::from_connection_string(&connection_string)?;
    debug!("Using source storage {}", storage.endpoint_url());

    let token = DefaultAzureCredential::from_env().get_token(args.token_scope())?;
    let api = CosmoApiClient::new(args.target_api_url.clone(), token.token);

    let workspace_refs = expand_workspace_refs(&api, patterns)?;
    copy_all_files(&storage, &api, &workspace_refs)?;
    Ok(())
}
