use log::{debug, info};

use crate::{
    azure_cli::AzureCliCredential, environment::EnvironmentCredential,
    managed_identity::ManagedIdentityCredential, workload_identity::WorkloadIdentityCredential,
    AccessToken, CredentialError, TokenCredential,
};

/// First credential of the chain that is available in this environment wins.
/// An available credential that fails stops the chain.
pub struct DefaultAzureCredential {
    sources: Vec<Box<dyn TokenCredential>>,
}

impl DefaultAzureCredential {
    pub fn from_env() -> Self {
        Self::from_lookup(&|name: &str| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        Self::with_sources(vec![
            Box::new(EnvironmentCredential::from_lookup(lookup)),
            Box::new(WorkloadIdentityCredential::from_lookup(lookup)),
            Box::new(ManagedIdentityCredential::from_lookup(lookup)),
            Box::new(AzureCliCredential::new()),
        ])
    }

    pub fn with_sources(sources: Vec<Box<dyn TokenCredential>>) -> Self {
        Self { sources }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|source| source.name()).collect()
    }
}

impl TokenCredential for DefaultAzureCredential {
    fn name(&self) -> &'static str {
        "DefaultAzureCredential"
    }

    fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let mut attempts = vec![];
        for source in &self.sources {
            match source.get_token(scope) {
                Ok(token) => {
                    info!("Acquired token for {} with {}", scope, source.name());
                    return Ok(token);
                }
                Err(CredentialError::Unavailable { credential, reason }) => {
                    debug!("{} unavailable: {}", credential, reason);
                    attempts.push(format!("{}: {}", credential, reason));
                }
                Err(e) => return Err(e),
            }
        }
        Err(CredentialError::NoCredentialAvailable { attempts })
    }
}
