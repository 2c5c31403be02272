use std::process::{Command, Stdio};

use log::debug;
use serde::Deserialize;

use crate::kubeconfig::ExecConfig;
use crate::KubeClientError;

#[derive(Debug, Deserialize)]
struct ExecCredential {
    #[serde(default)]
    status: Option<ExecCredentialStatus>,
}

#[derive(Debug, Deserialize)]
struct ExecCredentialStatus {
    #[serde(default)]
    token: Option<String>,
}

/// Runs a client-go credential plugin and returns the bearer token it prints.
/// The plugin's stderr goes to ours so device-code prompts stay visible.
pub fn exec_token(config: &ExecConfig) -> Result<String, KubeClientError> {
    let exec_info = serde_json::json!({
        "apiVersion": config.api_version,
        "kind": "ExecCredential",
        "spec": { "interactive": false },
    });
    debug!("running credential plugin {}", config.command);

    let mut command = Command::new(&config.command);
    if let Some(args) = &config.args {
        command.args(args);
    }
    if let Some(env) = &config.env {
        command.envs(env.iter().map(|var| (&var.name, &var.value)));
    }
    let output = command
        .env("KUBERNETES_EXEC_INFO", exec_info.to_string())
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|e| KubeClientError::Exec {
            reason: format!("failed to run '{}': {}", config.command, e),
        })?;
    if !output.status.success() {
        return Err(KubeClientError::Exec {
            reason: format!("'{}' exited with {}", config.command, output.status),
        });
    }

    let credential: ExecCredential =
        serde_json::from_slice(&output.stdout).map_err(|e| KubeClientError::Exec {
            reason: format!("'{}' printed an invalid ExecCredential: {}", config.command, e),
        })?;
    credential
        .status
        .and_then(|status| status.token)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| KubeClientError::Exec {
            reason: format!("'{}' returned no token", config.command),
        })
}
