use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use actix_web::{web, HttpRequest, HttpResponse};
use base64::{engine::general_purpose::STANDARD, Engine};
use cosmo_migrate_blob_storage::{
    connection_string::{DEVELOPMENT_ACCOUNT_KEY, DEVELOPMENT_ACCOUNT_NAME},
    shared_key::{sign, string_to_sign},
};

use crate::authorization;

/// Blob service of the development account, path-style like Azurite.
/// Every request must carry a valid Shared Key signature.
#[derive(Debug)]
pub struct FakeBlobStorageState {
    pub containers: Mutex<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
    /// Items per listing page; small values exercise `NextMarker`.
    pub page_size: usize,
    pub requests: Mutex<Vec<String>>,
}

impl FakeBlobStorageState {
    pub fn new(page_size: usize) -> Self {
        Self {
            containers: Mutex::new(BTreeMap::new()),
            page_size: page_size.max(1),
            requests: Mutex::new(vec![]),
        }
    }

    pub fn add_blob(&self, container: &str, blob_name: &str, content: &[u8]) {
        if let Ok(mut containers) = self.containers.lock() {
            containers
                .entry(container.to_string())
                .or_default()
                .insert(blob_name.to_string(), content.to_vec());
        }
    }

    /// Connection string pointing at a server started with [`configure`].
    pub fn connection_string(base_url: &str) -> String {
        format!(
            "DefaultEndpointsProtocol=http;AccountName={};AccountKey={};BlobEndpoint={}/{};",
            DEVELOPMENT_ACCOUNT_NAME, DEVELOPMENT_ACCOUNT_KEY, base_url, DEVELOPMENT_ACCOUNT_NAME
        )
    }

    fn record(&self, req: &HttpRequest) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(format!("{} {}", req.method(), req.uri()));
        }
    }
}

pub fn configure(
    state: Arc<FakeBlobStorageState>,
) -> impl Fn(&mut web::ServiceConfig) + Clone + Send + 'static {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::from(state.clone())).service(
            web::scope(&format!("/{}", DEVELOPMENT_ACCOUNT_NAME))
                .route("/", web::get().to(list_containers))
                .route("/{container}", web::get().to(list_blobs))
                .route("/{container}/{blob_name:.*}", web::get().to(download_blob)),
        );
    }
}

fn query_pairs(req: &HttpRequest) -> Vec<(String, String)> {
    web::Query::<Vec<(String, String)>>::from_query(req.query_string())
        .map(|query| query.into_inner())
        .unwrap_or_default()
}

fn query_value<'a>(query: &'a [(String, String)], name: &str) -> Option<&'a str> {
    query
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, value)| value.as_str())
}

/// Recomputes the Shared Key signature of the request.
fn verify_shared_key(req: &HttpRequest, query: &[(String, String)]) -> bool {
    let ms_headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .filter(|(name, _)| name.as_str().starts_with("x-ms-"))
        .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
        .collect();
    let Ok(key) = STANDARD.decode(DEVELOPMENT_ACCOUNT_KEY) else {
        return false;
    };
    let to_sign = string_to_sign(
        req.method().as_str(),
        DEVELOPMENT_ACCOUNT_NAME,
        req.path(),
        query,
        &ms_headers,
    );
    let Ok(signature) = sign(&key, &to_sign) else {
        return false;
    };
    authorization(req) == Some(format!("SharedKey {}:{}", DEVELOPMENT_ACCOUNT_NAME, signature).as_str())
}

fn forbidden() -> HttpResponse {
    HttpResponse::Forbidden()
        .content_type("application/xml")
        .body("<?xml version=\"1.0\" encoding=\"utf-8\"?><Error><Code>AuthenticationFailed</Code></Error>")
}

/// One page of `names` after `marker`, plus the marker of the next page.
fn page<'a>(names: Vec<&'a String>, marker: Option<&str>, page_size: usize) -> (Vec<&'a String>, String) {
    let mut names: Vec<&String> = names
        .into_iter()
        .filter(|name| marker.map_or(true, |marker| name.as_str() >= marker))
        .collect();
    let next_marker = if names.len() > page_size {
        names[page_size].clone()
    } else {
        String::new()
    };
    names.truncate(page_size);
    (names, next_marker)
}

async fn list_containers(req: HttpRequest, state: web::Data<FakeBlobStorageState>) -> HttpResponse {
    state.record(&req);
    let query = query_pairs(&req);
    if !verify_shared_key(&req, &query) {
        return forbidden();
    }
    if query_value(&query, "comp") != Some("list") {
        return HttpResponse::BadRequest().finish();
    }
    let prefix = query_value(&query, "prefix").unwrap_or_default();
    let Ok(containers) = state.containers.lock() else {
        return HttpResponse::InternalServerError().finish();
    };
    let names = containers.keys().filter(|name| name.starts_with(prefix)).collect();
    let (names, next_marker) = page(names, query_value(&query, "marker"), state.page_size);

    let mut xml = String::from("\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?>");
    xml.push_str("<EnumerationResults ServiceEndpoint=\"http://127.0.0.1/devstoreaccount1/\">");
    xml.push_str(&format!("<Prefix>{}</Prefix><Containers>", escape(prefix)));
    for name in names {
        xml.push_str(&format!(
            "<Container><Name>{}</Name><Properties><Etag>\"0x1\"</Etag></Properties></Container>",
            escape(name)
        ));
    }
    xml.push_str(&format!(
        "</Containers><NextMarker>{}</NextMarker></EnumerationResults>",
        escape(&next_marker)
    ));
    HttpResponse::Ok().content_type("application/xml").body(xml)
}

async fn list_blobs(
    req: HttpRequest,
    state: web::Data<FakeBlobStorageState>,
    path: web::Path<String>,
) -> HttpResponse {
    state.record(&req);
    let query = query_pairs(&req);
    if !verify_shared_key(&req, &query) {
        return forbidden();
    }
    if query_value(&query, "restype") != Some("container") || query_value(&query, "comp") != Some("list") {
        return HttpResponse::BadRequest().finish();
    }
    let container = path.into_inner();
    let prefix = query_value(&query, "prefix").unwrap_or_default();
    let Ok(containers) = state.containers.lock() else {
        return HttpResponse::InternalServerError().finish();
    };
    let Some(blobs) = containers.get(&container) else {
        return HttpResponse::NotFound().finish();
    };
    let names = blobs.keys().filter(|name| name.starts_with(prefix)).collect();
    let (names, next_marker) = page(names, query_value(&query, "marker"), state.page_size);

    let mut xml = String::from("\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?>");
    xml.push_str(&format!(
        "<EnumerationResults ServiceEndpoint=\"http://127.0.0.1/devstoreaccount1/\" ContainerName=\"{}\">",
        escape(&container)
    ));
    xml.push_str(&format!("<Prefix>{}</Prefix><Blobs>", escape(prefix)));
    for name in names {
        let size = blobs.get(name).map_or(0, Vec::len);
        xml.push_str(&format!(
            "<Blob><Name>{}</Name><Properties><Content-Length>{}</Content-Length><BlobType>BlockBlob</BlobType></Properties></Blob>",
            escape(name),
            size
        ));
    }
    xml.push_str(&format!(
        "</Blobs><NextMarker>{}</NextMarker></EnumerationResults>",
        escape(&next_marker)
    ));
    HttpResponse::Ok().content_type("application/xml").body(xml)
}

/// Container and blob name of a download path, fully percent-decoded.
/// Route matching keeps `%25` and `%2F` encoded, so the raw path is used.
fn blob_path(path: &str) -> Option<(String, String)> {
    let mut segments = path.splitn(4, '/').skip(2);
    let container = urlencoding::decode(segments.next()?).ok()?.into_owned();
    let blob_name = urlencoding::decode(segments.next()?).ok()?.into_owned();
    Some((container, blob_name))
}

async fn download_blob(req: HttpRequest, state: web::Data<FakeBlobStorageState>) -> HttpResponse {
    state.record(&req);
    let query = query_pairs(&req);
    if !verify_shared_key(&req, &query) {
        return forbidden();
    }
    let Some((container, blob_name)) = blob_path(req.path()) else {
        return HttpResponse::BadRequest().finish();
    };
    let Ok(containers) = state.containers.lock() else {
        return HttpResponse::InternalServerError().finish();
    };
    match containers.get(&container).and_then(|blobs| blobs.get(&blob_name)) {
        Some(content) => HttpResponse::Ok()
            .content_type("application/octet-stream")
            .body(content.clone()),
        None => HttpResponse::NotFound().finish(),
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
