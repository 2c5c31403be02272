use log::debug;
use serde::Deserialize;

use crate::{now_unix_seconds, AccessToken, CredentialError};

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    // Number from Azure AD, string from IMDS.
    #[serde(default)]
    pub expires_in: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenResponse {
    pub fn into_access_token(self) -> AccessToken {
        let expires_in = match &self.expires_in {
            Some(serde_json::Value::Number(n)) => n.as_u64(),
            Some(serde_json::Value::String(s)) => s.parse().ok(),
            _ => None,
        };
        AccessToken {
            token: self.access_token,
            expires_on: expires_in.map(|secs| now_unix_seconds() + secs),
        }
    }
}

pub(crate) fn token_url(authority_host: &str, tenant_id: &str) -> String {
    format!(
        "{}/{}/oauth2/v2.0/token",
        authority_host.trim_end_matches('/'),
        urlencoding::encode(tenant_id)
    )
}

/// OAuth2 token request against the Azure AD v2 endpoint.
pub(crate) fn request_token(
    credential: &'static str,
    authority_host: &str,
    tenant_id: &str,
    form: &[(&str, &str)],
) -> Result<AccessToken, CredentialError> {
    let url = token_url(authority_host, tenant_id);
    debug!("{}: requesting token from {}", credential, url);
    match ureq::post(&url).send_form(form) {
        Ok(res) => {
            let token: TokenResponse = res
                .into_json()
                .map_err(|e| CredentialError::IO(Box::new(e)))?;
            Ok(token.into_access_token())
        }
        Err(ureq::Error::Status(_, res)) => {
            let body = res.into_string().unwrap_or_default();
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(e) => match e.error_description {
                    Some(description) => format!("{}: {}", e.error, description),
                    None => e.error,
                },
                Err(_) => body,
            };
            Err(CredentialError::Authentication {
                credential,
                message,
            })
        }
        Err(e) => Err(CredentialError::Ureq(Box::new(e))),
    }
}
