//! Ambient Azure AD credentials, tried in the same order as the Azure SDKs'
//! `DefaultAzureCredential`: environment secret, workload identity, managed
//! identity, Azure CLI.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

pub mod azure_cli;
pub mod default;
pub mod environment;
pub mod managed_identity;
mod token_endpoint;
pub mod workload_identity;

pub use default::DefaultAzureCredential;

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

pub const AZURE_AUTHORITY_HOST: &str = "AZURE_AUTHORITY_HOST";
pub const AZURE_TENANT_ID: &str = "AZURE_TENANT_ID";
pub const AZURE_CLIENT_ID: &str = "AZURE_CLIENT_ID";
pub const AZURE_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
pub const AZURE_FEDERATED_TOKEN_FILE: &str = "AZURE_FEDERATED_TOKEN_FILE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    /// Unix seconds, when the issuer reported it.
    pub expires_on: Option<u64>,
}

pub trait TokenCredential {
    fn name(&self) -> &'static str;

    fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError>;
}

#[derive(Debug)]
pub enum CredentialError {
    /// The credential is not configured in this environment; the next one in
    /// a chain may be tried.
    Unavailable {
        credential: &'static str,
        reason: String,
    },
    Authentication {
        credential: &'static str,
        message: String,
    },
    Ureq(Box<ureq::Error>),
    IO(Box<std::io::Error>),
    NoCredentialAvailable {
        attempts: Vec<String>,
    },
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::Unavailable { credential, reason } => {
                write!(f, "{} unavailable: {}", credential, reason)
            }
            CredentialError::Authentication {
                credential,
                message,
            } => write!(f, "{} authentication failed: {}", credential, message),
            CredentialError::Ureq(e) => write!(f, "token request failed: {}", e),
            CredentialError::IO(e) => write!(f, "token request I/O error: {}", e),
            CredentialError::NoCredentialAvailable { attempts } => {
                write!(f, "no ambient credential available")?;
                for attempt in attempts {
                    write!(f, "\n - {}", attempt)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for CredentialError {}

/// Reads a variable through `lookup`, treating empty values as unset.
pub(crate) fn non_empty(lookup: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|value| !value.is_empty())
}

pub(crate) fn authority_host(lookup: &dyn Fn(&str) -> Option<String>) -> String {
    non_empty(lookup, AZURE_AUTHORITY_HOST).unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string())
}

pub(crate) fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
