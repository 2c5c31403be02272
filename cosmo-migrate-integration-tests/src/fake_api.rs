use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use actix_web::{
    http::header::CONTENT_TYPE,
    web::{self, Bytes},
    HttpRequest, HttpResponse,
};
use cosmo_migrate_api_schema::{
    organization::Organization,
    workspace::{Workspace, WorkspaceFile, WorkspaceSecret},
};

use crate::authorization;

/// Stored files keyed by (organization, workspace, destination).
pub type StoredFiles = BTreeMap<(String, String, String), Vec<u8>>;

/// Cosmo Tech API subset: directory, workspace files and secrets.
#[derive(Debug, Default)]
pub struct FakeApiState {
    pub access_token: String,
    pub organizations: Mutex<BTreeMap<String, Vec<Workspace>>>,
    pub files: Mutex<StoredFiles>,
    pub secrets: Mutex<Vec<(String, String, WorkspaceSecret)>>,
}

impl FakeApiState {
    pub fn new(access_token: &str) -> Self {
        Self {
            access_token: access_token.to_string(),
            ..Default::default()
        }
    }

    pub fn add_workspace(&self, organization_id: &str, workspace_id: &str, key: &str) {
        if let Ok(mut organizations) = self.organizations.lock() {
            organizations
                .entry(organization_id.to_string())
                .or_default()
                .push(Workspace {
                    id: workspace_id.to_string(),
                    key: key.to_string(),
                    name: None,
                });
        }
    }

    pub fn add_file(&self, organization_id: &str, workspace_id: &str, destination: &str, content: &[u8]) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(
                (
                    organization_id.to_string(),
                    workspace_id.to_string(),
                    destination.to_string(),
                ),
                content.to_vec(),
            );
        }
    }

    fn authorized(&self, req: &HttpRequest) -> bool {
        authorization(req) == Some(format!("Bearer {}", self.access_token).as_str())
    }

    fn workspace_exists(&self, organization_id: &str, workspace_id: &str) -> bool {
        self.organizations.lock().is_ok_and(|organizations| {
            organizations
                .get(organization_id)
                .is_some_and(|workspaces| workspaces.iter().any(|w| w.id == workspace_id))
        })
    }
}

pub fn configure(
    state: Arc<FakeApiState>,
) -> impl Fn(&mut web::ServiceConfig) + Clone + Send + 'static {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::from(state.clone()))
            .route("/organizations", web::get().to(find_all_organizations))
            .route(
                "/organizations/{organization_id}/workspaces",
                web::get().to(find_all_workspaces),
            )
            .route(
                "/organizations/{organization_id}/workspaces/{workspace_id}",
                web::get().to(find_workspace_by_id),
            )
            .route(
                "/organizations/{organization_id}/workspaces/{workspace_id}/files",
                web::post().to(upload_file),
            )
            .route(
                "/organizations/{organization_id}/workspaces/{workspace_id}/secret",
                web::post().to(create_secret),
            );
    }
}

async fn find_all_organizations(req: HttpRequest, state: web::Data<FakeApiState>) -> HttpResponse {
    if !state.authorized(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    let Ok(organizations) = state.organizations.lock() else {
        return HttpResponse::InternalServerError().finish();
    };
    let organizations: Vec<Organization> = organizations
        .keys()
        .map(|id| Organization {
            id: id.clone(),
            name: Some(format!("Organization {}", id)),
        })
        .collect();
    HttpResponse::Ok().json(organizations)
}

async fn find_all_workspaces(
    req: HttpRequest,
    state: web::Data<FakeApiState>,
    path: web::Path<String>,
) -> HttpResponse {
    if !state.authorized(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    let organization_id = path.into_inner();
    let Ok(organizations) = state.organizations.lock() else {
        return HttpResponse::InternalServerError().finish();
    };
    match organizations.get(&organization_id) {
        Some(workspaces) => HttpResponse::Ok().json(workspaces),
        None => HttpResponse::NotFound().finish(),
    }
}

async fn find_workspace_by_id(
    req: HttpRequest,
    state: web::Data<FakeApiState>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    if !state.authorized(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    let (organization_id, workspace_id) = path.into_inner();
    let Ok(organizations) = state.organizations.lock() else {
        return HttpResponse::InternalServerError().finish();
    };
    let workspace = organizations
        .get(&organization_id)
        .and_then(|workspaces| workspaces.iter().find(|w| w.id == workspace_id));
    match workspace {
        Some(workspace) => HttpResponse::Ok().json(workspace),
        None => HttpResponse::NotFound().finish(),
    }
}

async fn upload_file(
    req: HttpRequest,
    state: web::Data<FakeApiState>,
    path: web::Path<(String, String)>,
    body: Bytes,
) -> HttpResponse {
    if !state.authorized(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    let (organization_id, workspace_id) = path.into_inner();
    if !state.workspace_exists(&organization_id, &workspace_id) {
        return HttpResponse::NotFound().finish();
    }

    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let Some(mut fields) = parse_multipart(content_type, &body) else {
        return HttpResponse::BadRequest().body("malformed multipart body");
    };
    let (Some(destination), Some(file)) = (fields.remove("destination"), fields.remove("file")) else {
        return HttpResponse::BadRequest().body("destination and file are required");
    };
    let destination = String::from_utf8_lossy(&destination).to_string();
    if destination.is_empty() || destination.starts_with('/') || destination.split('/').any(|s| s == "..") {
        return HttpResponse::BadRequest().body(format!("Invalid destination '{}'", destination));
    }
    let overwrite = fields.remove("overwrite").is_some_and(|value| value == b"true");

    let Ok(mut files) = state.files.lock() else {
        return HttpResponse::InternalServerError().finish();
    };
    let key = (organization_id, workspace_id, destination.clone());
    if files.contains_key(&key) && !overwrite {
        return HttpResponse::BadRequest().body(format!("File '{}' already exists", destination));
    }
    files.insert(key, file);
    HttpResponse::Created().json(WorkspaceFile {
        file_name: destination,
    })
}

async fn create_secret(
    req: HttpRequest,
    state: web::Data<FakeApiState>,
    path: web::Path<(String, String)>,
    secret: web::Json<WorkspaceSecret>,
) -> HttpResponse {
    if !state.authorized(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    let (organization_id, workspace_id) = path.into_inner();
    if !state.workspace_exists(&organization_id, &workspace_id) {
        return HttpResponse::NotFound().finish();
    }
    let Ok(mut secrets) = state.secrets.lock() else {
        return HttpResponse::InternalServerError().finish();
    };
    secrets.push((organization_id, workspace_id, secret.into_inner()));
    HttpResponse::Created().finish()
}

/// Field name to content for a `multipart/form-data` body.
pub fn parse_multipart(content_type: &str, body: &[u8]) -> Option<BTreeMap<String, Vec<u8>>> {
    let boundary = content_type.split("boundary=").nth(1)?.trim_matches('"');
    let delimiter = format!("--{}", boundary);
    let mut fields = BTreeMap::new();
    for part in split_bytes(body, delimiter.as_bytes()).into_iter().skip(1) {
        if part.starts_with(b"--") {
            break;
        }
        let part = part.strip_prefix(b"\r\n")?;
        let header_end = find_bytes(part, b"\r\n\r\n")?;
        let headers = std::str::from_utf8(&part[..header_end]).ok()?;
        let content = part[header_end + 4..].strip_suffix(b"\r\n")?;
        let name = headers
            .split(';')
            .map(str::trim)
            .find_map(|attr| attr.strip_prefix("name=\""))?
            .split('"')
            .next()?;
        fields.insert(name.to_string(), content.to_vec());
    }
    Some(fields)
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn split_bytes<'a>(mut haystack: &'a [u8], delimiter: &[u8]) -> Vec<&'a [u8]> {
    let mut parts = vec![];
    while let Some(i) = find_bytes(haystack, delimiter) {
        parts.push(&haystack[..i]);
        haystack = &haystack[i + delimiter.len()..];
    }
    parts.push(haystack);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multipart() {
        let body = b"--XYZ\r\nContent-Disposition: form-data; name=\"overwrite\"\r\n\r\nfalse\r\n\
--XYZ\r\nContent-Disposition: form-data; name=\"destination\"\r\n\r\ndir/a.txt\r\n\
--XYZ\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
Content-Type: application/octet-stream\r\n\r\nline1\r\nline2\r\n--XYZ--\r\n";
        let fields = parse_multipart("multipart/form-data; boundary=XYZ", body).unwrap();
        assert_eq!(fields.get("overwrite").map(Vec::as_slice), Some(&b"false"[..]));
        assert_eq!(fields.get("destination").map(Vec::as_slice), Some(&b"dir/a.txt"[..]));
        assert_eq!(fields.get("file").map(Vec::as_slice), Some(&b"line1\r\nline2"[..]));
    }

    #[test]
    fn test_parse_multipart_without_boundary() {
        assert!(parse_multipart("application/json", b"{}").is_none());
    }
}
