use crate::{
    authority_host, non_empty, token_endpoint::request_token, AccessToken, CredentialError,
    TokenCredential, AZURE_CLIENT_ID, AZURE_CLIENT_SECRET, AZURE_TENANT_ID,
};

const NAME: &str = "EnvironmentCredential";

/// Service principal secret from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and
/// `AZURE_CLIENT_SECRET`.
#[derive(Debug, Clone)]
pub struct EnvironmentCredential {
    authority_host: String,
    tenant_id: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl EnvironmentCredential {
    pub fn from_env() -> Self {
        Self::from_lookup(&|name: &str| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        Self {
            authority_host: authority_host(lookup),
            tenant_id: non_empty(lookup, AZURE_TENANT_ID),
            client_id: non_empty(lookup, AZURE_CLIENT_ID),
            client_secret: non_empty(lookup, AZURE_CLIENT_SECRET),
        }
    }

    pub fn authority_host(&self) -> &str {
        &self.authority_host
    }
}

impl TokenCredential for EnvironmentCredential {
    fn name(&self) -> &'static str {
        NAME
    }

    fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let (Some(tenant_id), Some(client_id), Some(client_secret)) =
            (&self.tenant_id, &self.client_id, &self.client_secret)
        else {
            return Err(CredentialError::Unavailable {
                credential: NAME,
                reason: format!(
                    "{}, {} and {} are not all set",
                    AZURE_TENANT_ID, AZURE_CLIENT_ID, AZURE_CLIENT_SECRET
                ),
            });
        };
        request_token(
            NAME,
            &self.authority_host,
            tenant_id,
            &[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("scope", scope),
            ],
        )
    }
}
