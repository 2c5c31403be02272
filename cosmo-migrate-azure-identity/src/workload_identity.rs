use std::path::PathBuf;

use crate::{
    authority_host, non_empty, token_endpoint::request_token, AccessToken, CredentialError,
    TokenCredential, AZURE_CLIENT_ID, AZURE_FEDERATED_TOKEN_FILE, AZURE_TENANT_ID,
};

const NAME: &str = "WorkloadIdentityCredential";
const JWT_BEARER_ASSERTION: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Federated token projected into the pod, exchanged as a client assertion.
#[derive(Debug, Clone)]
pub struct WorkloadIdentityCredential {
    authority_host: String,
    tenant_id: Option<String>,
    client_id: Option<String>,
    token_file: Option<PathBuf>,
}

impl WorkloadIdentityCredential {
    pub fn from_env() -> Self {
        Self::from_lookup(&|name: &str| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        Self {
            authority_host: authority_host(lookup),
            tenant_id: non_empty(lookup, AZURE_TENANT_ID),
            client_id: non_empty(lookup, AZURE_CLIENT_ID),
            token_file: non_empty(lookup, AZURE_FEDERATED_TOKEN_FILE).map(PathBuf::from),
        }
    }
}

impl TokenCredential for WorkloadIdentityCredential {
    fn name(&self) -> &'static str {
        NAME
    }

    fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let (Some(tenant_id), Some(client_id), Some(token_file)) =
            (&self.tenant_id, &self.client_id, &self.token_file)
        else {
            return Err(CredentialError::Unavailable {
                credential: NAME,
                reason: format!(
                    "{}, {} and {} are not all set",
                    AZURE_TENANT_ID, AZURE_CLIENT_ID, AZURE_FEDERATED_TOKEN_FILE
                ),
            });
        };
        // The file is rotated by the kubelet, read it on every request.
        let assertion =
            std::fs::read_to_string(token_file).map_err(|e| CredentialError::IO(Box::new(e)))?;
        request_token(
            NAME,
            &self.authority_host,
            tenant_id,
            &[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_assertion_type", JWT_BEARER_ASSERTION),
                ("client_assertion", assertion.trim()),
                ("scope", scope),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_without_token_file() {
        let lookup = |name: &str| match name {
            AZURE_TENANT_ID | AZURE_CLIENT_ID => Some("x".to_string()),
            _ => None,
        };
        let credential = WorkloadIdentityCredential::from_lookup(&lookup);
        assert!(matches!(
            credential.get_token("scope").unwrap_err(),
            CredentialError::Unavailable { .. }
        ));
    }

    #[test]
    fn test_missing_token_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token").to_string_lossy().to_string();
        let lookup = move |name: &str| match name {
            AZURE_TENANT_ID | AZURE_CLIENT_ID => Some("x".to_string()),
            AZURE_FEDERATED_TOKEN_FILE => Some(path.clone()),
            _ => None,
        };
        let credential = WorkloadIdentityCredential::from_lookup(&lookup);
        assert!(matches!(
            credential.get_token("scope").unwrap_err(),
            CredentialError::IO(_)
        ));
    }
}
