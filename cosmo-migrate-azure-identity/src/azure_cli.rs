use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Command;

use serde::Deserialize;

use crate::{
    managed_identity::scope_to_resource, AccessToken, CredentialError, TokenCredential,
};

const NAME: &str = "AzureCliCredential";

/// Token of the account logged in with `az login`.
#[derive(Debug, Clone)]
pub struct AzureCliCredential {
    program: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CliAccessToken {
    #[serde(rename = "accessToken")]
    access_token: String,
    // Only emitted by recent CLI versions.
    #[serde(default)]
    expires_on: Option<u64>,
}

impl AzureCliCredential {
    pub fn new() -> Self {
        let program = if cfg!(windows) { "az.cmd" } else { "az" };
        Self::with_program(PathBuf::from(program))
    }

    pub fn with_program(program: PathBuf) -> Self {
        Self { program }
    }
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCredential for AzureCliCredential {
    fn name(&self) -> &'static str {
        NAME
    }

    fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let output = Command::new(&self.program)
            .args(["account", "get-access-token", "--output", "json"])
            .args(["--resource", scope_to_resource(scope)])
            .output();
        let output = match output {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CredentialError::Unavailable {
                    credential: NAME,
                    reason: format!("{} not found on PATH", self.program.display()),
                })
            }
            Err(e) => return Err(CredentialError::IO(Box::new(e))),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.contains("az login") || stderr.contains("az account set") {
                return Err(CredentialError::Unavailable {
                    credential: NAME,
                    reason: stderr,
                });
            }
            return Err(CredentialError::Authentication {
                credential: NAME,
                message: stderr,
            });
        }

        let token: CliAccessToken = serde_json::from_slice(&output.stdout).map_err(|e| {
            CredentialError::Authentication {
                credential: NAME,
                message: format!("unexpected az output: {}", e),
            }
        })?;
        Ok(AccessToken {
            token: token.access_token,
            expires_on: token.expires_on,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_unavailable() {
        let credential =
            AzureCliCredential::with_program(PathBuf::from("/nonexistent/cosmo-migrate/az"));
        assert!(matches!(
            credential.get_token("scope").unwrap_err(),
            CredentialError::Unavailable { .. }
        ));
    }

    #[cfg(unix)]
    fn write_script(dir: &std::path::Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("az");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_parses_cli_output() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            r#"echo '{"accessToken": "cli-token", "expiresOn": "2030-01-01 00:00:00.000000", "expires_on": 1893456000, "tokenType": "Bearer"}'"#,
        );
        let token = AzureCliCredential::with_program(script)
            .get_token("api://x/.default")
            .unwrap();
        assert_eq!(
            token,
            AccessToken {
                token: "cli-token".to_string(),
                expires_on: Some(1893456000),
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_requests_resource_of_scope() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            r#"printf '{"accessToken": "%s"}' "$*""#,
        );
        let credential = AzureCliCredential::with_program(script);
        let token = credential.get_token("https://api.example.com/v3").unwrap();
        assert_eq!(
            token.token,
            "account get-access-token --output json --resource https://api.example.com/v3"
        );
        let token = credential.get_token("api://cosmo/.default").unwrap();
        assert_eq!(
            token.token,
            "account get-access-token --output json --resource api://cosmo"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_not_logged_in_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "echo \"ERROR: Please run 'az login' to setup account.\" >&2\nexit 1",
        );
        let err = AzureCliCredential::with_program(script)
            .get_token("scope")
            .unwrap_err();
        assert!(matches!(err, CredentialError::Unavailable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_other_failure_is_authentication_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "echo 'AADSTS500011: resource not found' >&2\nexit 1");
        let err = AzureCliCredential::with_program(script)
            .get_token("scope")
            .unwrap_err();
        match err {
            CredentialError::Authentication { message, .. } => {
                assert_eq!(message, "AADSTS500011: resource not found")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
