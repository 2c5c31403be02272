use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::exec::exec_token;
use crate::kubeconfig::{ClusterAuth, Kubeconfig, ResolvedContext};
use crate::secret::{Secret, SecretList};
use crate::tls::client_config;

pub mod exec;
pub mod kubeconfig;
pub mod secret;
pub mod tls;

/// Blocking client for the core/v1 secrets API of one cluster context.
#[derive(Clone)]
pub struct KubeClient {
    pub server: String,
    bearer_token: Option<String>,
    agent: ureq::Agent,
}

#[derive(Debug)]
pub enum KubeClientError {
    KubeconfigNotFound,
    ContextNotFound { context: String },
    ClusterNotFound { cluster: String },
    UserNotFound { user: String },
    InvalidKubeconfig { reason: String },
    Exec { reason: String },
    Tls(Box<rustls::Error>),
    Ureq(Box<ureq::Error>),
    IO(Box<std::io::Error>),
    Yaml(Box<serde_yaml::Error>),
}

#[derive(Debug, Clone)]
pub struct ListNamespacedSecretRequest {
    pub namespace: String,
}

#[derive(Debug, Clone)]
pub struct ListNamespacedSecretResponse {
    pub items: Vec<Secret>,
}

#[derive(Debug, Clone)]
pub struct DeleteNamespacedSecretRequest {
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct DeleteNamespacedSecretResponse {}

impl KubeClient {
    /// Uses the kubeconfig found at `$KUBECONFIG` or `~/.kube/config`.
    pub fn from_default_kubeconfig(context: &str) -> Result<Self, KubeClientError> {
        let paths = Kubeconfig::default_paths();
        for path in &paths {
            debug!("loading kubeconfig {}", path.display());
        }
        let config = Kubeconfig::read_merged(&paths)?.ok_or(KubeClientError::KubeconfigNotFound)?;
        Self::from_resolved(config.resolve(context, Path::new("."))?)
    }

    pub fn from_kubeconfig_path(path: &Path, context: &str) -> Result<Self, KubeClientError> {
        debug!("loading kubeconfig {}", path.display());
        let config = Kubeconfig::read_from(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_resolved(config.resolve(context, base_dir)?)
    }

    pub fn from_resolved(resolved: ResolvedContext) -> Result<Self, KubeClientError> {
        let mut agent = ureq::AgentBuilder::new();
        let identity = match &resolved.auth {
            ClusterAuth::ClientCertificate { certificate, key } => {
                Some((certificate.as_slice(), key.as_slice()))
            }
            _ => None,
        };
        match (&resolved.certificate_authority, identity) {
            (Some(ca), identity) => {
                agent = agent.tls_config(Arc::new(client_config(ca, identity)?));
            }
            (None, Some(_)) => {
                return Err(KubeClientError::InvalidKubeconfig {
                    reason: format!(
                        "context '{}' uses a client certificate without a certificate authority",
                        resolved.context_name
                    ),
                })
            }
            (None, None) => {}
        }

        let bearer_token = match &resolved.auth {
            ClusterAuth::Token(token) => Some(token.clone()),
            ClusterAuth::Exec(exec) => Some(exec_token(exec)?),
            ClusterAuth::ClientCertificate { .. } | ClusterAuth::None => None,
        };
        debug!(
            "using context {} against {}",
            resolved.context_name, resolved.server
        );

        Ok(Self {
            server: resolved.server,
            bearer_token,
            agent: agent.build(),
        })
    }

    fn secrets_url(&self, namespace: &str) -> String {
        format!(
            "{}/api/v1/namespaces/{}/secrets",
            self.server,
            urlencoding::encode(namespace)
        )
    }

    fn authorize(&self, request: ureq::Request) -> ureq::Request {
        let request = request.set("Accept", "application/json");
        match &self.bearer_token {
            Some(token) => request.set("Authorization", &format!("Bearer {}", token)),
            None => request,
        }
    }

    pub fn list_namespaced_secret(
        &self,
        request: ListNamespacedSecretRequest,
    ) -> Result<ListNamespacedSecretResponse, KubeClientError> {
        let url = self.secrets_url(&request.namespace);
        debug!("GET {}", url);
        let list: SecretList = self
            .authorize(self.agent.get(&url))
            .call()
            .map_err(|e| KubeClientError::Ureq(Box::new(e)))?
            .into_json()
            .map_err(|e| KubeClientError::IO(Box::new(e)))?;
        Ok(ListNamespacedSecretResponse { items: list.items })
    }

    pub fn delete_namespaced_secret(
        &self,
        request: DeleteNamespacedSecretRequest,
    ) -> Result<DeleteNamespacedSecretResponse, KubeClientError> {
        let url = format!(
            "{}/{}",
            self.secrets_url(&request.namespace),
            urlencoding::encode(&request.name)
        );
        debug!("DELETE {}", url);
        self.authorize(self.agent.delete(&url))
            .call()
            .map_err(|e| KubeClientError::Ureq(Box::new(e)))?;
        Ok(DeleteNamespacedSecretResponse {})
    }
}

impl fmt::Debug for KubeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeClient")
            .field("server", &self.server)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl fmt::Display for KubeClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KubeClientError::KubeconfigNotFound => {
                write!(f, "no kubeconfig found, set KUBECONFIG or create ~/.kube/config")
            }
            KubeClientError::ContextNotFound { context } => {
                write!(f, "context '{}' not found in kubeconfig", context)
            }
            KubeClientError::ClusterNotFound { cluster } => {
                write!(f, "cluster '{}' not found in kubeconfig", cluster)
            }
            KubeClientError::UserNotFound { user } => {
                write!(f, "user '{}' not found in kubeconfig", user)
            }
            KubeClientError::InvalidKubeconfig { reason } => write!(f, "invalid kubeconfig: {}", reason),
            KubeClientError::Exec { reason } => write!(f, "credential plugin failed: {}", reason),
            KubeClientError::Tls(e) => write!(f, "TLS configuration error: {}", e),
            KubeClientError::Ureq(e) => match e.as_ref() {
                ureq::Error::Status(code, res) => {
                    write!(f, "kubernetes API returned {} for {}", code, res.get_url())
                }
                ureq::Error::Transport(transport) => {
                    write!(f, "kubernetes API request failed: {}", transport)
                }
            },
            KubeClientError::IO(e) => write!(f, "kubernetes client I/O error: {}", e),
            KubeClientError::Yaml(e) => write!(f, "cannot parse kubeconfig: {}", e),
        }
    }
}

impl std::error::Error for KubeClientError {}
