use std::time::Duration;

use crate::{
    non_empty, token_endpoint::TokenResponse, AccessToken, CredentialError, TokenCredential,
    AZURE_CLIENT_ID,
};

const NAME: &str = "ManagedIdentityCredential";
pub const IMDS_TOKEN_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";

/// Instance metadata service token. An unreachable endpoint means we are not
/// running on an Azure host.
#[derive(Debug, Clone)]
pub struct ManagedIdentityCredential {
    endpoint: String,
    client_id: Option<String>,
    agent: ureq::Agent,
}

impl ManagedIdentityCredential {
    pub fn from_env() -> Self {
        Self::from_lookup(&|name: &str| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        Self::with_endpoint(
            IMDS_TOKEN_ENDPOINT.to_string(),
            non_empty(lookup, AZURE_CLIENT_ID),
        )
    }

    pub fn with_endpoint(endpoint: String, client_id: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(1))
            .timeout(Duration::from_secs(10))
            .build();
        Self {
            endpoint,
            client_id,
            agent,
        }
    }
}

/// IMDS speaks v1 resources, not v2 scopes.
pub fn scope_to_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}

impl TokenCredential for ManagedIdentityCredential {
    fn name(&self) -> &'static str {
        NAME
    }

    fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let mut request = self
            .agent
            .get(&self.endpoint)
            .set("Metadata", "true")
            .query("api-version", IMDS_API_VERSION)
            .query("resource", scope_to_resource(scope));
        if let Some(client_id) = &self.client_id {
            request = request.query("client_id", client_id);
        }
        match request.call() {
            Ok(res) => {
                let token: TokenResponse = res
                    .into_json()
                    .map_err(|e| CredentialError::IO(Box::new(e)))?;
                Ok(token.into_access_token())
            }
            Err(ureq::Error::Status(400, res)) => Err(CredentialError::Unavailable {
                credential: NAME,
                reason: format!(
                    "no managed identity assigned: {}",
                    res.into_string().unwrap_or_default()
                ),
            }),
            Err(ureq::Error::Status(code, res)) => Err(CredentialError::Authentication {
                credential: NAME,
                message: format!("{}: {}", code, res.into_string().unwrap_or_default()),
            }),
            Err(ureq::Error::Transport(transport)) => Err(CredentialError::Unavailable {
                credential: NAME,
                reason: format!("instance metadata endpoint unreachable: {}", transport),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_to_resource() {
        assert_eq!(
            scope_to_resource("https://api.example.com/.default"),
            "https://api.example.com"
        );
        assert_eq!(scope_to_resource("https://api.example.com"), "https://api.example.com");
    }

    #[test]
    fn test_unreachable_endpoint_is_unavailable() {
        let credential = ManagedIdentityCredential::with_endpoint(
            "http://127.0.0.1:1/metadata/identity/oauth2/token".to_string(),
            None,
        );
        assert!(matches!(
            credential.get_token("https://api.example.com/.default").unwrap_err(),
            CredentialError::Unavailable { .. }
        ));
    }
}
