use base64::{engine::general_purpose::STANDARD, Engine};
use cosmo_migrate_api_client::CosmoApiClient;
use cosmo_migrate_api_schema::workspace::{
    create_secret::CreateSecretRequest, find_by_id::FindWorkspaceByIdRequest, WorkspaceSecret,
};
use cosmo_migrate_azure_identity::{DefaultAzureCredential, TokenCredential};
use cosmo_migrate_common::workspace_ref::WorkspaceRef;
use cosmo_migrate_kube::{DeleteNamespacedSecretRequest, KubeClient, ListNamespacedSecretRequest};
use log::{debug, info};

use crate::args::MoveWorkspaceSecretArgs;
use crate::backend::{SourceSecretStore, WorkspaceSecretStore};
use crate::error::MigrateError;

/// Field of the legacy secret holding the event hub key.
pub const LEGACY_SECRET_FIELD: &str = "eventHubAccessKey";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveSecretResponse {
    Migrated { secret_name: String },
    NothingToMigrate { secret_name: String },
}

pub fn legacy_secret_name(organization_id: &str, workspace_key: &str) -> String {
    format!("{}-{}", organization_id, workspace_key).to_lowercase()
}

/// The API server returns `data` values base64 encoded, and the stored value
/// is itself base64 text.
pub fn decode_legacy_secret(secret_name: &str, value: &str) -> Result<String, MigrateError> {
    let invalid = |reason: String| MigrateError::InvalidLegacySecret {
        secret_name: secret_name.to_string(),
        reason,
    };
    let inner = STANDARD
        .decode(value.trim())
        .map_err(|e| invalid(format!("{} is not base64: {}", LEGACY_SECRET_FIELD, e)))?;
    let inner: Vec<u8> = inner
        .into_iter()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let plain = STANDARD
        .decode(inner)
        .map_err(|e| invalid(format!("{} is not double base64: {}", LEGACY_SECRET_FIELD, e)))?;
    String::from_utf8(plain).map_err(|_| invalid(format!("{} is not UTF-8 text", LEGACY_SECRET_FIELD)))
}

/// Writes the legacy secret to the destination, then deletes it from the
/// source namespace. A failed delete leaves both copies in place.
pub fn move_secret<T, S>(
    target: &T,
    source: &S,
    namespace: &str,
    workspace_ref: &WorkspaceRef,
) -> Result<MoveSecretResponse, MigrateError>
where
    T: WorkspaceSecretStore,
    S: SourceSecretStore,
{
    let workspace = target
        .find_workspace_by_id(FindWorkspaceByIdRequest {
            organization_id: workspace_ref.organization_id.clone(),
            workspace_id: workspace_ref.workspace_id.clone(),
        })?
        .workspace;
    let secret_name = legacy_secret_name(&workspace_ref.organization_id, &workspace.key);

    let secret = source
        .list_namespaced_secret(ListNamespacedSecretRequest {
            namespace: namespace.to_string(),
        })?
        .items
        .into_iter()
        .find(|secret| secret.metadata.name == secret_name);
    let Some(secret) = secret else {
        info!("No secret to migrate");
        return Ok(MoveSecretResponse::NothingToMigrate { secret_name });
    };
    debug!("Found source secret {}", secret_name);

    let encoded = secret
        .data
        .as_ref()
        .and_then(|data| data.get(LEGACY_SECRET_FIELD))
        .ok_or_else(|| MigrateError::InvalidLegacySecret {
            secret_name: secret_name.clone(),
            reason: format!("missing field {}", LEGACY_SECRET_FIELD),
        })?;
    let value = decode_legacy_secret(&secret_name, encoded)?;

    debug!("Creating new secret");
    target.create_secret(CreateSecretRequest {
        organization_id: workspace_ref.organization_id.clone(),
        workspace_id: workspace_ref.workspace_id.clone(),
        workspace_secret: WorkspaceSecret {
            dedicated_event_hub_key: Some(value),
        },
    })?;

    debug!("Removing old secret");
    source.delete_namespaced_secret(DeleteNamespacedSecretRequest {
        namespace: namespace.to_string(),
        name: secret_name.clone(),
    })?;

    info!("Secret migrated successfully");
    Ok(MoveSecretResponse::Migrated { secret_name })
}

/// Entry point of `move-workspace-secret`.
pub fn run(args: MoveWorkspaceSecretArgs) -> Result<(), MigrateError> {
    let workspace_ref = WorkspaceRef::parse(&args.workspace_ref)?;
    info!("Migrating {}", workspace_ref);

    let token = DefaultAzureCredential::from_env().get_token(args.token_scope())?;
    let api = CosmoApiClient::new(args.target_api_url.clone(), token.token);

    debug!(
        "Using k8s source cluster {} and namespace {}",
        args.source_k8s_context, args.source_k8s_namespace
    );
    let kube = KubeClient::from_default_kubeconfig(&args.source_k8s_context)?;

    move_secret(&api, &kube, &args.source_k8s_namespace, &workspace_ref)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fakes::{FakeApi, FakeCluster};

    fn double_base64(plain: &str) -> String {
        STANDARD.encode(STANDARD.encode(plain))
    }

    fn api() -> FakeApi {
        FakeApi::default().organization("O-1", &[("w-1", "MyKey")])
    }

    #[test]
    fn test_legacy_secret_name() {
        assert_eq!(legacy_secret_name("O-1", "MyKey"), "o-1-mykey");
    }

    #[test]
    fn test_decode_legacy_secret() {
        let plain = "Endpoint=sb://hub.servicebus.windows.net/;SharedAccessKey=é+/=";
        assert_eq!(decode_legacy_secret("s", &double_base64(plain)).unwrap(), plain);

        // Inner payload written with a trailing newline, as `echo | base64` does.
        let with_newline = STANDARD.encode(format!("{}\n", STANDARD.encode("key")));
        assert_eq!(decode_legacy_secret("s", &with_newline).unwrap(), "key");
    }

    #[test]
    fn test_decode_legacy_secret_errors() {
        assert!(matches!(
            decode_legacy_secret("s", "%%%"),
            Err(MigrateError::InvalidLegacySecret { .. })
        ));
        assert!(matches!(
            decode_legacy_secret("s", &STANDARD.encode("not base64!")),
            Err(MigrateError::InvalidLegacySecret { .. })
        ));
        assert!(matches!(
            decode_legacy_secret("s", &STANDARD.encode(STANDARD.encode(b"\xff\xfe"))),
            Err(MigrateError::InvalidLegacySecret { .. })
        ));
    }

    #[test]
    fn test_move_secret() {
        let api = api();
        let cluster = FakeCluster::with_secret(
            "phoenix",
            "o-1-mykey",
            &[(LEGACY_SECRET_FIELD, double_base64("s3cr3t").as_str())],
        );
        let res = move_secret(&api, &cluster, "phoenix", &WorkspaceRef::new("O-1", "w-1")).unwrap();
        assert_eq!(
            res,
            MoveSecretResponse::Migrated {
                secret_name: "o-1-mykey".to_string()
            }
        );
        let secrets = api.secrets.borrow();
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets[0].0, WorkspaceRef::new("O-1", "w-1"));
        insta::assert_snapshot!(
            serde_json::to_string(&secrets[0].1).unwrap(),
            @r#"{"dedicatedEventHubKey":"s3cr3t"}"#
        );
        assert_eq!(
            cluster.deleted.borrow().as_slice(),
            [("phoenix".to_string(), "o-1-mykey".to_string())]
        );
        assert!(cluster.secrets.borrow().is_empty());
    }

    #[test]
    fn test_nothing_to_migrate() {
        let api = api();
        let cluster = FakeCluster::with_secret(
            "other-namespace",
            "o-1-mykey",
            &[(LEGACY_SECRET_FIELD, double_base64("s3cr3t").as_str())],
        );
        let res = move_secret(&api, &cluster, "phoenix", &WorkspaceRef::new("O-1", "w-1")).unwrap();
        assert_eq!(
            res,
            MoveSecretResponse::NothingToMigrate {
                secret_name: "o-1-mykey".to_string()
            }
        );
        assert!(api.secrets.borrow().is_empty());
        assert!(cluster.deleted.borrow().is_empty());
    }

    #[test]
    fn test_missing_field_creates_nothing() {
        let api = api();
        let cluster = FakeCluster::with_secret("phoenix", "o-1-mykey", &[("other", "eA==")]);
        let err = move_secret(&api, &cluster, "phoenix", &WorkspaceRef::new("O-1", "w-1")).unwrap_err();
        assert!(matches!(err, MigrateError::InvalidLegacySecret { .. }));
        assert!(api.secrets.borrow().is_empty());
        assert!(cluster.deleted.borrow().is_empty());
    }

    #[test]
    fn test_failed_create_keeps_legacy_secret() {
        let api = FakeApi {
            fail_create_secret: true,
            ..api()
        };
        let cluster = FakeCluster::with_secret(
            "phoenix",
            "o-1-mykey",
            &[(LEGACY_SECRET_FIELD, double_base64("s3cr3t").as_str())],
        );
        assert!(move_secret(&api, &cluster, "phoenix", &WorkspaceRef::new("O-1", "w-1")).is_err());
        assert!(cluster.deleted.borrow().is_empty());
        assert_eq!(cluster.secrets.borrow().len(), 1);
    }

    #[test]
    fn test_failed_delete_leaves_both_copies() {
        let api = api();
        let cluster = FakeCluster {
            fail_delete: true,
            ..FakeCluster::with_secret(
                "phoenix",
                "o-1-mykey",
                &[(LEGACY_SECRET_FIELD, double_base64("s3cr3t").as_str())],
            )
        };
        assert!(move_secret(&api, &cluster, "phoenix", &WorkspaceRef::new("O-1", "w-1")).is_err());
        assert_eq!(api.secrets.borrow().len(), 1);
        assert_eq!(cluster.secrets.borrow().len(), 1);
    }

    #[test]
    fn test_unknown_workspace_fails_before_listing() {
        let api = api();
        let cluster = FakeCluster::default();
        assert!(move_secret(&api, &cluster, "phoenix", &WorkspaceRef::new("O-1", "w-404")).is_err());
        assert!(api.secrets.borrow().is_empty());
    }
}
