use std::fmt;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;

use crate::KubeClientError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Kubeconfig {
    #[serde(default)]
    pub clusters: Vec<NamedCluster>,
    #[serde(default)]
    pub contexts: Vec<NamedContext>,
    #[serde(default)]
    pub users: Vec<NamedAuthInfo>,
    #[serde(rename = "current-context", default)]
    pub current_context: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: Cluster,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cluster {
    pub server: String,
    #[serde(rename = "certificate-authority-data", default)]
    pub certificate_authority_data: Option<String>,
    #[serde(rename = "certificate-authority", default)]
    pub certificate_authority: Option<String>,
    #[serde(rename = "insecure-skip-tls-verify", default)]
    pub insecure_skip_tls_verify: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: Context,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Context {
    pub cluster: String,
    pub user: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedAuthInfo {
    pub name: String,
    #[serde(default)]
    pub user: Option<AuthInfo>,
}

#[derive(Clone, Default, Deserialize)]
pub struct AuthInfo {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(rename = "tokenFile", default)]
    pub token_file: Option<String>,
    #[serde(rename = "client-certificate-data", default)]
    pub client_certificate_data: Option<String>,
    #[serde(rename = "client-certificate", default)]
    pub client_certificate: Option<String>,
    #[serde(rename = "client-key-data", default)]
    pub client_key_data: Option<String>,
    #[serde(rename = "client-key", default)]
    pub client_key: Option<String>,
    #[serde(default)]
    pub exec: Option<ExecConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExecConfig {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub command: String,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub env: Option<Vec<ExecEnvVar>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExecEnvVar {
    pub name: String,
    pub value: String,
}

/// Everything needed to talk to one cluster as one user.
#[derive(Debug, Clone)]
pub struct ResolvedContext {
    pub context_name: String,
    pub server: String,
    /// PEM bundle.
    pub certificate_authority: Option<Vec<u8>>,
    pub auth: ClusterAuth,
    pub default_namespace: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub enum ClusterAuth {
    None,
    Token(String),
    ClientCertificate { certificate: Vec<u8>, key: Vec<u8> },
    Exec(ExecConfig),
}

impl fmt::Debug for AuthInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthInfo")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("token_file", &self.token_file)
            .field("client_certificate", &self.client_certificate)
            .field("client_key", &self.client_key)
            .field("exec", &self.exec)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for ClusterAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterAuth::None => write!(f, "None"),
            ClusterAuth::Token(_) => write!(f, "Token(<redacted>)"),
            ClusterAuth::ClientCertificate { .. } => write!(f, "ClientCertificate(<redacted>)"),
            ClusterAuth::Exec(exec) => f.debug_tuple("Exec").field(exec).finish(),
        }
    }
}

impl Kubeconfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, KubeClientError> {
        serde_yaml::from_str(yaml).map_err(|e| KubeClientError::Yaml(Box::new(e)))
    }

    pub fn read_from(path: &Path) -> Result<Self, KubeClientError> {
        let yaml = std::fs::read_to_string(path).map_err(|e| KubeClientError::IO(Box::new(e)))?;
        Self::from_yaml(&yaml)
    }

    /// Entries of `$KUBECONFIG`, else `~/.kube/config`.
    pub fn default_paths() -> Vec<PathBuf> {
        if let Some(paths) = std::env::var_os("KUBECONFIG") {
            let paths: Vec<PathBuf> = std::env::split_paths(&paths)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            if !paths.is_empty() {
                return paths;
            }
        }
        dirs::home_dir()
            .map(|home| vec![home.join(".kube").join("config")])
            .unwrap_or_default()
    }

    /// Reads and merges the files that exist among `paths`, kubectl style:
    /// the first definition of a name wins, and so does the first
    /// `current-context`. Relative file references are anchored to the
    /// directory of the file that holds them. `None` when no file exists.
    pub fn read_merged(paths: &[PathBuf]) -> Result<Option<Self>, KubeClientError> {
        let mut merged: Option<Self> = None;
        for path in paths {
            if !path.is_file() {
                continue;
            }
            let mut config = Self::read_from(path)?;
            config.anchor_relative_paths(path.parent().unwrap_or_else(|| Path::new(".")));
            match &mut merged {
                Some(merged) => merged.merge(config),
                None => merged = Some(config),
            }
        }
        Ok(merged)
    }

    pub fn merge(&mut self, other: Kubeconfig) {
        for cluster in other.clusters {
            if !self.clusters.iter().any(|c| c.name == cluster.name) {
                self.clusters.push(cluster);
            }
        }
        for context in other.contexts {
            if !self.contexts.iter().any(|c| c.name == context.name) {
                self.contexts.push(context);
            }
        }
        for user in other.users {
            if !self.users.iter().any(|u| u.name == user.name) {
                self.users.push(user);
            }
        }
        if self.current_context.is_none() {
            self.current_context = other.current_context;
        }
    }

    fn anchor_relative_paths(&mut self, base_dir: &Path) {
        let anchor = |file: &mut Option<String>| {
            if let Some(file) = file.as_mut().filter(|f| !f.is_empty() && Path::new(f.as_str()).is_relative()) {
                *file = base_dir.join(file.as_str()).to_string_lossy().to_string();
            }
        };
        for cluster in &mut self.clusters {
            anchor(&mut cluster.cluster.certificate_authority);
        }
        for auth_info in self.users.iter_mut().filter_map(|u| u.user.as_mut()) {
            anchor(&mut auth_info.token_file);
            anchor(&mut auth_info.client_certificate);
            anchor(&mut auth_info.client_key);
            if let Some(exec) = &mut auth_info.exec {
                exec.command = exec_command(&exec.command, base_dir);
            }
        }
    }

    /// Relative file references are resolved against `base_dir`, the
    /// directory holding the kubeconfig.
    pub fn resolve(&self, context_name: &str, base_dir: &Path) -> Result<ResolvedContext, KubeClientError> {
        let context = self
            .contexts
            .iter()
            .find(|c| c.name == context_name)
            .ok_or_else(|| KubeClientError::ContextNotFound {
                context: context_name.to_string(),
            })?;
        let cluster = self
            .clusters
            .iter()
            .find(|c| c.name == context.context.cluster)
            .ok_or_else(|| KubeClientError::ClusterNotFound {
                cluster: context.context.cluster.clone(),
            })?;
        let user = self
            .users
            .iter()
            .find(|u| u.name == context.context.user)
            .ok_or_else(|| KubeClientError::UserNotFound {
                user: context.context.user.clone(),
            })?;

        if cluster.cluster.insecure_skip_tls_verify {
            return Err(KubeClientError::InvalidKubeconfig {
                reason: format!(
                    "cluster '{}' sets insecure-skip-tls-verify, refusing to connect",
                    cluster.name
                ),
            });
        }

        let certificate_authority = data_or_file(
            cluster.cluster.certificate_authority_data.as_deref(),
            cluster.cluster.certificate_authority.as_deref(),
            base_dir,
        )?;
        let auth = match &user.user {
            Some(auth_info) => resolve_auth(auth_info, base_dir)?,
            None => ClusterAuth::None,
        };

        Ok(ResolvedContext {
            context_name: context.name.clone(),
            server: cluster.cluster.server.trim_end_matches('/').to_string(),
            certificate_authority,
            auth,
            default_namespace: context.context.namespace.clone(),
        })
    }
}

fn resolve_auth(auth_info: &AuthInfo, base_dir: &Path) -> Result<ClusterAuth, KubeClientError> {
    let certificate = data_or_file(
        auth_info.client_certificate_data.as_deref(),
        auth_info.client_certificate.as_deref(),
        base_dir,
    )?;
    let key = data_or_file(
        auth_info.client_key_data.as_deref(),
        auth_info.client_key.as_deref(),
        base_dir,
    )?;
    match (certificate, key) {
        (Some(certificate), Some(key)) => return Ok(ClusterAuth::ClientCertificate { certificate, key }),
        (None, None) => {}
        _ => {
            return Err(KubeClientError::InvalidKubeconfig {
                reason: "client certificate and client key must be set together".to_string(),
            })
        }
    }

    if let Some(token) = auth_info.token.as_ref().filter(|t| !t.is_empty()) {
        return Ok(ClusterAuth::Token(token.clone()));
    }
    if let Some(token_file) = &auth_info.token_file {
        let token = std::fs::read_to_string(base_dir.join(token_file))
            .map_err(|e| KubeClientError::IO(Box::new(e)))?;
        return Ok(ClusterAuth::Token(token.trim().to_string()));
    }
    if let Some(exec) = &auth_info.exec {
        let mut exec = exec.clone();
        exec.command = exec_command(&exec.command, base_dir);
        return Ok(ClusterAuth::Exec(exec));
    }
    Ok(ClusterAuth::None)
}

/// kubectl semantics: a relative command with a separator is relative to
/// the kubeconfig, a bare name is looked up on PATH.
fn exec_command(command: &str, base_dir: &Path) -> String {
    let path = Path::new(command);
    if path.is_relative() && path.components().count() > 1 {
        base_dir.join(path).to_string_lossy().to_string()
    } else {
        command.to_string()
    }
}

fn data_or_file(
    data: Option<&str>,
    file: Option<&str>,
    base_dir: &Path,
) -> Result<Option<Vec<u8>>, KubeClientError> {
    if let Some(data) = data.filter(|d| !d.is_empty()) {
        let decoded = STANDARD
            .decode(data.trim())
            .map_err(|e| KubeClientError::InvalidKubeconfig {
                reason: format!("invalid base64 data: {}", e),
            })?;
        return Ok(Some(decoded));
    }
    if let Some(file) = file.filter(|f| !f.is_empty()) {
        let content =
            std::fs::read(base_dir.join(file)).map_err(|e| KubeClientError::IO(Box::new(e)))?;
        return Ok(Some(content));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: dev
clusters:
- name: aks-prod
  cluster:
    server: https://aks-prod.hcp.westeurope.azmk8s.io:443/
    certificate-authority-data: LS0tLS1CRUdJTiBDRVJUSUZJQ0FURS0tLS0t
- name: local
  cluster:
    server: http://127.0.0.1:8001
contexts:
- name: prod
  context:
    cluster: aks-prod
    user: clusterUser_prod
    namespace: tenant-a
- name: dev
  context:
    cluster: local
    user: dev-user
- name: broken
  context:
    cluster: missing
    user: dev-user
users:
- name: clusterUser_prod
  user:
    exec:
      apiVersion: client.authentication.k8s.io/v1beta1
      command: kubelogin
      args:
      - get-token
      - --login
      - azurecli
      env: null
- name: dev-user
  user:
    token: dev-token
"#;

    #[test]
    fn test_resolve_exec_context() {
        let config = Kubeconfig::from_yaml(KUBECONFIG).unwrap();
        assert_eq!(config.current_context.as_deref(), Some("dev"));
        let resolved = config.resolve("prod", Path::new("/home/me/.kube")).unwrap();
        assert_eq!(resolved.server, "https://aks-prod.hcp.westeurope.azmk8s.io:443");
        assert_eq!(
            resolved.certificate_authority.as_deref(),
            Some(&b"-----BEGIN CERTIFICATE-----"[..])
        );
        assert_eq!(resolved.default_namespace.as_deref(), Some("tenant-a"));
        assert_eq!(
            resolved.auth,
            ClusterAuth::Exec(ExecConfig {
                api_version: "client.authentication.k8s.io/v1beta1".to_string(),
                command: "kubelogin".to_string(),
                args: Some(vec![
                    "get-token".to_string(),
                    "--login".to_string(),
                    "azurecli".to_string()
                ]),
                env: None,
            })
        );
    }

    #[test]
    fn test_resolve_token_context() {
        let config = Kubeconfig::from_yaml(KUBECONFIG).unwrap();
        let resolved = config.resolve("dev", Path::new("/tmp")).unwrap();
        assert_eq!(resolved.server, "http://127.0.0.1:8001");
        assert_eq!(resolved.certificate_authority, None);
        assert_eq!(resolved.auth, ClusterAuth::Token("dev-token".to_string()));
        assert_eq!(format!("{:?}", resolved.auth), "Token(<redacted>)");
    }

    #[test]
    fn test_resolve_errors() {
        let config = Kubeconfig::from_yaml(KUBECONFIG).unwrap();
        assert!(matches!(
            config.resolve("nope", Path::new("/tmp")),
            Err(KubeClientError::ContextNotFound { .. })
        ));
        assert!(matches!(
            config.resolve("broken", Path::new("/tmp")),
            Err(KubeClientError::ClusterNotFound { .. })
        ));
    }

    #[test]
    fn test_relative_files_and_commands() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ca.pem"), "CA").unwrap();
        std::fs::write(dir.path().join("token"), "file-token\n").unwrap();
        let yaml = r#"
clusters:
- name: c
  cluster:
    server: https://c.example.com
    certificate-authority: ca.pem
contexts:
- name: file-token
  context: {cluster: c, user: file-user}
- name: exec
  context: {cluster: c, user: exec-user}
users:
- name: file-user
  user:
    tokenFile: token
- name: exec-user
  user:
    exec:
      apiVersion: client.authentication.k8s.io/v1
      command: ./bin/get-token
"#;
        let config = Kubeconfig::from_yaml(yaml).unwrap();
        let resolved = config.resolve("file-token", dir.path()).unwrap();
        assert_eq!(resolved.certificate_authority.as_deref(), Some(&b"CA"[..]));
        assert_eq!(resolved.auth, ClusterAuth::Token("file-token".to_string()));

        let resolved = config.resolve("exec", dir.path()).unwrap();
        let ClusterAuth::Exec(exec) = resolved.auth else {
            panic!("expected exec auth");
        };
        assert_eq!(
            PathBuf::from(exec.command),
            dir.path().join("./bin/get-token")
        );
    }

    #[test]
    fn test_read_merged_kubeconfigs() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("token"), "second-token\n").unwrap();
        std::fs::write(
            first.path().join("config"),
            r#"
current-context: dev
clusters:
- name: dev
  cluster: {server: https://dev.example.com}
contexts:
- name: dev
  context: {cluster: dev, user: dev}
users:
- name: dev
  user: {token: first-token}
"#,
        )
        .unwrap();
        std::fs::write(
            second.path().join("config"),
            r#"
current-context: prod
clusters:
- name: dev
  cluster: {server: https://shadowed.example.com}
- name: prod
  cluster: {server: https://prod.example.com}
contexts:
- name: prod
  context: {cluster: prod, user: prod}
users:
- name: prod
  user: {tokenFile: token}
"#,
        )
        .unwrap();

        let paths = vec![
            first.path().join("config"),
            first.path().join("missing"),
            second.path().join("config"),
        ];
        let config = Kubeconfig::read_merged(&paths).unwrap().unwrap();
        assert_eq!(config.current_context.as_deref(), Some("dev"));

        let dev = config.resolve("dev", Path::new("/nonexistent")).unwrap();
        assert_eq!(dev.server, "https://dev.example.com");
        assert_eq!(dev.auth, ClusterAuth::Token("first-token".to_string()));

        // The token file is found next to the file that names it.
        let prod = config.resolve("prod", Path::new("/nonexistent")).unwrap();
        assert_eq!(prod.server, "https://prod.example.com");
        assert_eq!(prod.auth, ClusterAuth::Token("second-token".to_string()));

        assert!(Kubeconfig::read_merged(&[first.path().join("missing")])
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_insecure_cluster_is_refused() {
        let yaml = r#"
clusters:
- name: c
  cluster:
    server: https://c.example.com
    insecure-skip-tls-verify: true
contexts:
- name: ctx
  context: {cluster: c, user: u}
users:
- name: u
  user: {}
"#;
        let config = Kubeconfig::from_yaml(yaml).unwrap();
        assert!(matches!(
            config.resolve("ctx", Path::new("/tmp")),
            Err(KubeClientError::InvalidKubeconfig { .. })
        ));
    }

    #[test]
    fn test_certificate_without_key_is_invalid() {
        let yaml = r#"
clusters:
- name: c
  cluster: {server: "https://c.example.com"}
contexts:
- name: ctx
  context: {cluster: c, user: u}
users:
- name: u
  user:
    client-certificate-data: Q0VSVA==
"#;
        let config = Kubeconfig::from_yaml(yaml).unwrap();
        assert!(matches!(
            config.resolve("ctx", Path::new("/tmp")),
            Err(KubeClientError::InvalidKubeconfig { .. })
        ));
    }
}
