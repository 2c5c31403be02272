use std::fmt;

use cosmo_migrate_api_client::CosmoApiClientError;
use cosmo_migrate_azure_identity::CredentialError;
use cosmo_migrate_blob_storage::BlobStorageError;
use cosmo_migrate_common::workspace_ref::WorkspaceRefError;
use cosmo_migrate_kube::KubeClientError;

/// Every way a migration run can fail. `main` logs the `Display` form and
/// exits with status 1.
#[derive(Debug)]
pub enum MigrateError {
    WorkspaceRef(WorkspaceRefError),
    MissingEnvironmentVariable {
        name: &'static str,
        purpose: &'static str,
    },
    Credential(Box<CredentialError>),
    Api(Box<CosmoApiClientError>),
    BlobStorage(Box<BlobStorageError>),
    Kube(Box<KubeClientError>),
    IO(Box<std::io::Error>),
    InvalidLegacySecret {
        secret_name: String,
        reason: String,
    },
}

impl From<WorkspaceRefError> for MigrateError {
    fn from(e: WorkspaceRefError) -> Self {
        MigrateError::WorkspaceRef(e)
    }
}

impl From<CredentialError> for MigrateError {
    fn from(e: CredentialError) -> Self {
        MigrateError::Credential(Box::new(e))
    }
}

impl From<CosmoApiClientError> for MigrateError {
    fn from(e: CosmoApiClientError) -> Self {
        MigrateError::Api(Box::new(e))
    }
}

impl From<BlobStorageError> for MigrateError {
    fn from(e: BlobStorageError) -> Self {
        MigrateError::BlobStorage(Box::new(e))
    }
}

impl From<KubeClientError> for MigrateError {
    fn from(e: KubeClientError) -> Self {
        MigrateError::Kube(Box::new(e))
    }
}

impl From<std::io::Error> for MigrateError {
    fn from(e: std::io::Error) -> Self {
        MigrateError::IO(Box::new(e))
    }
}

impl fmt::Display for MigrateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrateError::WorkspaceRef(e) => write!(f, "{}", e),
            MigrateError::MissingEnvironmentVariable { name, purpose } => {
                write!(f, "Missing {} environment variable for {}", name, purpose)
            }
            MigrateError::Credential(e) => write!(f, "{}", e),
            MigrateError::Api(e) => write!(f, "{}", e),
            MigrateError::BlobStorage(e) => write!(f, "{}", e),
            MigrateError::Kube(e) => write!(f, "{}", e),
            MigrateError::IO(e) => write!(f, "I/O error: {}", e),
            MigrateError::InvalidLegacySecret {
                secret_name,
                reason,
            } => write!(f, "Cannot read secret {}: {}", secret_name, reason),
        }
    }
}

impl std::error::Error for MigrateError {}
