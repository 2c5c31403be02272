use clap::Parser;

const MOVE_WORKSPACE_FILES_ABOUT: &str = "\
migrate files of one or more workspaces

workspace references can have the following pattern:
 <no refs>: pass nothing to migrate all workspaces of all organizations
 'o-###': to migrate all workspaces of a specific organization
 'o-###/w-###': to migrate a specific workspace

required environment variables:
 AZURE_STORAGE_CONNECTION_STRING: connection string to the source azure storage container";

const MOVE_WORKSPACE_SECRET_ABOUT: &str = "\
migrate a workspace secret

the source cluster is read from the kubeconfig files listed in KUBECONFIG
(merged, first definition wins) or from ~/.kube/config";

/// Copies workspace files from Azure Blob Storage to the Cosmo Tech API.
#[derive(Parser, Debug)]
#[command(version, about = "migrate files of one or more workspaces", long_about = MOVE_WORKSPACE_FILES_ABOUT)]
pub struct MoveWorkspaceFilesArgs {
    /// enable debug log level
    #[arg(short, long)]
    pub debug: bool,

    /// API URL where to write data
    #[arg(short = 'u', long)]
    pub target_api_url: String,

    /// API URL scope, defaults to the API URL
    #[arg(short = 's', long)]
    pub target_api_scope: Option<String>,

    /// workspace refs to migrate, combination of multiple workspace references or nothing
    pub workspace_refs: Vec<String>,
}

/// Moves one workspace secret from a Kubernetes namespace to the Cosmo Tech API.
#[derive(Parser, Debug)]
#[command(version, about = "migrate a workspace secret", long_about = MOVE_WORKSPACE_SECRET_ABOUT)]
pub struct MoveWorkspaceSecretArgs {
    /// enable debug log level
    #[arg(short, long)]
    pub debug: bool,

    /// Kubernetes source cluster context name, as specified in your local .kube/config
    #[arg(short = 'c', long = "source-k8s-context")]
    pub source_k8s_context: String,

    /// Kubernetes namespace of the source tenant
    #[arg(short = 'n', long = "source-k8s-namespace")]
    pub source_k8s_namespace: String,

    /// API URL where to write data
    #[arg(short = 'u', long)]
    pub target_api_url: String,

    /// API URL scope, defaults to the API URL
    #[arg(short = 's', long)]
    pub target_api_scope: Option<String>,

    /// workspace ref to migrate in the form of 'o-###/w-###'
    pub workspace_ref: String,
}

impl MoveWorkspaceFilesArgs {
    pub fn token_scope(&self) -> &str {
        token_scope(&self.target_api_url, self.target_api_scope.as_deref())
    }
}

impl MoveWorkspaceSecretArgs {
    pub fn token_scope(&self) -> &str {
        token_scope(&self.target_api_url, self.target_api_scope.as_deref())
    }
}

fn token_scope<'a>(target_api_url: &'a str, target_api_scope: Option<&'a str>) -> &'a str {
    match target_api_scope {
        Some(scope) if !scope.is_empty() => scope,
        _ => target_api_url,
    }
}
