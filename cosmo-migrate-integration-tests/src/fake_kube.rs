use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use actix_web::{web, HttpRequest, HttpResponse};
use cosmo_migrate_kube::secret::{ObjectMeta, Secret, SecretList};
use serde_json::json;

use crate::authorization;

/// core/v1 secrets of a plain-HTTP API server, bearer-token protected.
#[derive(Debug, Default)]
pub struct FakeKubeState {
    pub token: String,
    pub secrets: Mutex<BTreeMap<(String, String), Secret>>,
    pub deleted: Mutex<Vec<(String, String)>>,
}

impl FakeKubeState {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            ..Default::default()
        }
    }

    pub fn add_secret(&self, namespace: &str, name: &str, data: &[(&str, &str)]) {
        if let Ok(mut secrets) = self.secrets.lock() {
            secrets.insert(
                (namespace.to_string(), name.to_string()),
                Secret {
                    metadata: ObjectMeta {
                        name: name.to_string(),
                        namespace: Some(namespace.to_string()),
                    },
                    data: Some(
                        data.iter()
                            .map(|(key, value)| (key.to_string(), value.to_string()))
                            .collect(),
                    ),
                },
            );
        }
    }

    /// Writes a kubeconfig with a single context named `context` and
    /// returns its path.
    pub fn write_kubeconfig(&self, dir: &Path, base_url: &str, context: &str) -> std::io::Result<std::path::PathBuf> {
        let path = dir.join("config");
        let yaml = format!(
            "apiVersion: v1
kind: Config
current-context: {context}
clusters:
- name: fake
  cluster:
    server: {base_url}
contexts:
- name: {context}
  context:
    cluster: fake
    user: fake-user
users:
- name: fake-user
  user:
    token: {token}
",
            context = context,
            base_url = base_url,
            token = self.token
        );
        std::fs::write(&path, yaml)?;
        Ok(path)
    }

    fn authorized(&self, req: &HttpRequest) -> bool {
        authorization(req) == Some(format!("Bearer {}", self.token).as_str())
    }
}

pub fn configure(
    state: Arc<FakeKubeState>,
) -> impl Fn(&mut web::ServiceConfig) + Clone + Send + 'static {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::from(state.clone()))
            .route(
                "/api/v1/namespaces/{namespace}/secrets",
                web::get().to(list_namespaced_secret),
            )
            .route(
                "/api/v1/namespaces/{namespace}/secrets/{name}",
                web::delete().to(delete_namespaced_secret),
            );
    }
}

fn status(code: u16, reason: &str, message: String) -> serde_json::Value {
    let outcome = if code < 400 { "Success" } else { "Failure" };
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": outcome,
        "reason": reason,
        "message": message,
        "code": code,
    })
}

async fn list_namespaced_secret(
    req: HttpRequest,
    state: web::Data<FakeKubeState>,
    path: web::Path<String>,
) -> HttpResponse {
    if !state.authorized(&req) {
        return HttpResponse::Unauthorized().json(status(401, "Unauthorized", "Unauthorized".to_string()));
    }
    let namespace = path.into_inner();
    let Ok(secrets) = state.secrets.lock() else {
        return HttpResponse::InternalServerError().finish();
    };
    let items = secrets
        .iter()
        .filter(|((ns, _), _)| *ns == namespace)
        .map(|(_, secret)| secret.clone())
        .collect();
    HttpResponse::Ok().json(SecretList { items })
}

async fn delete_namespaced_secret(
    req: HttpRequest,
    state: web::Data<FakeKubeState>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    if !state.authorized(&req) {
        return HttpResponse::Unauthorized().json(status(401, "Unauthorized", "Unauthorized".to_string()));
    }
    let (namespace, name) = path.into_inner();
    let Ok(mut secrets) = state.secrets.lock() else {
        return HttpResponse::InternalServerError().finish();
    };
    if secrets.remove(&(namespace.clone(), name.clone())).is_none() {
        return HttpResponse::NotFound().json(status(
            404,
            "NotFound",
            format!("secrets \"{}\" not found", name),
        ));
    }
    if let Ok(mut deleted) = state.deleted.lock() {
        deleted.push((namespace, name.clone()));
    }
    HttpResponse::Ok().json(status(200, "", format!("secret \"{}\" deleted", name)))
}
