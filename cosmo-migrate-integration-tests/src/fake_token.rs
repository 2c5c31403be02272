use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use actix_web::{web, HttpResponse};
use serde_json::json;

/// Azure AD v2 token endpoint accepting one service principal.
#[derive(Debug, Default)]
pub struct FakeTokenState {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub access_token: String,
    /// Scopes of the token requests received so far.
    pub scopes: Mutex<Vec<String>>,
}

impl FakeTokenState {
    pub fn new(tenant_id: &str, client_id: &str, client_secret: &str, access_token: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            access_token: access_token.to_string(),
            scopes: Mutex::new(vec![]),
        }
    }

    /// Environment making `EnvironmentCredential` use this endpoint.
    pub fn environment(&self, base_url: &str) -> Vec<(&'static str, String)> {
        vec![
            ("AZURE_AUTHORITY_HOST", base_url.to_string()),
            ("AZURE_TENANT_ID", self.tenant_id.clone()),
            ("AZURE_CLIENT_ID", self.client_id.clone()),
            ("AZURE_CLIENT_SECRET", self.client_secret.clone()),
        ]
    }
}

pub fn configure(
    state: Arc<FakeTokenState>,
) -> impl Fn(&mut web::ServiceConfig) + Clone + Send + 'static {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::from(state.clone()))
            .route("/{tenant_id}/oauth2/v2.0/token", web::post().to(token));
    }
}

fn token_error(error: &str, description: &str) -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({
        "error": error,
        "error_description": description,
    }))
}

async fn token(
    state: web::Data<FakeTokenState>,
    path: web::Path<String>,
    form: web::Form<BTreeMap<String, String>>,
) -> HttpResponse {
    if path.into_inner() != state.tenant_id {
        return HttpResponse::BadRequest().json(json!({
            "error": "invalid_request",
            "error_description": "AADSTS90002: Tenant not found.",
        }));
    }
    let form = form.into_inner();
    let field = |name: &str| form.get(name).map(String::as_str);
    if field("grant_type") != Some("client_credentials") {
        return HttpResponse::BadRequest().json(json!({
            "error": "unsupported_grant_type",
            "error_description": "only client_credentials is supported",
        }));
    }
    if field("client_id") != Some(state.client_id.as_str())
        || field("client_secret") != Some(state.client_secret.as_str())
    {
        return token_error("invalid_client", "AADSTS7000215: Invalid client secret provided.");
    }
    let scope = field("scope").unwrap_or_default().to_string();
    if let Ok(mut scopes) = state.scopes.lock() {
        scopes.push(scope);
    }
    HttpResponse::Ok().json(json!({
        "token_type": "Bearer",
        "expires_in": 3599,
        "ext_expires_in": 3599,
        "access_token": state.access_token,
    }))
}
