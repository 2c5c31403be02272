use std::fmt;
use std::io::{Read, Write};

use log::debug;

use crate::connection_string::{StorageConnection, StorageCredential};
use crate::shared_key::{format_ms_date, sign, string_to_sign, STORAGE_API_VERSION};
use crate::xml::{continuation, BlobEnumerationResults, ContainerEnumerationResults};

pub mod connection_string;
pub mod shared_key;
mod xml;

/// Read-only client for the Blob service REST API.
#[derive(Debug, Clone)]
pub struct BlobServiceClient {
    connection: StorageConnection,
    agent: ureq::Agent,
}

#[derive(Debug)]
pub enum BlobStorageError {
    InvalidConnectionString { reason: String },
    InvalidAccountKey,
    Ureq(Box<ureq::Error>),
    IO(Box<std::io::Error>),
    Xml(Box<quick_xml::DeError>),
}

#[derive(Debug, Clone)]
pub struct ListContainersRequest {
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerItem {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ListContainersResponse {
    pub containers: Vec<ContainerItem>,
}

#[derive(Debug, Clone)]
pub struct ListBlobsRequest {
    pub container: String,
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    pub name: String,
    pub content_length: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ListBlobsResponse {
    pub blobs: Vec<BlobItem>,
}

#[derive(Debug, Clone)]
pub struct DownloadBlobRequest {
    pub container: String,
    pub blob_name: String,
}

#[derive(Debug, Clone)]
pub struct DownloadBlobResponse {
    pub size: u64,
}

impl BlobServiceClient {
    pub fn new(connection: StorageConnection) -> Self {
        Self {
            connection,
            agent: ureq::AgentBuilder::new().build(),
        }
    }

    pub fn from_connection_string(connection_string: &str) -> Result<Self, BlobStorageError> {
        Ok(Self::new(StorageConnection::parse(connection_string)?))
    }

    pub fn endpoint_url(&self) -> String {
        self.connection.blob_endpoint.url()
    }

    /// All containers whose name starts with `prefix`, across result pages.
    pub fn list_containers(
        &self,
        request: ListContainersRequest,
    ) -> Result<ListContainersResponse, BlobStorageError> {
        let mut containers = vec![];
        let mut marker: Option<String> = None;
        loop {
            let mut query = vec![
                ("comp".to_string(), "list".to_string()),
                ("prefix".to_string(), request.prefix.clone()),
            ];
            if let Some(marker) = &marker {
                query.push(("marker".to_string(), marker.clone()));
            }
            let body = self.get_text("/", query)?;
            let page: ContainerEnumerationResults = xml::parse(&body)?;
            containers.extend(
                page.containers
                    .items
                    .into_iter()
                    .map(|container| ContainerItem {
                        name: container.name,
                    }),
            );
            marker = continuation(page.next_marker);
            if marker.is_none() {
                break;
            }
        }
        Ok(ListContainersResponse { containers })
    }

    /// All blobs of `container` whose name starts with `prefix`, flat
    /// listing across result pages.
    pub fn list_blobs(&self, request: ListBlobsRequest) -> Result<ListBlobsResponse, BlobStorageError> {
        let path = format!("/{}", urlencoding::encode(&request.container));
        let mut blobs = vec![];
        let mut marker: Option<String> = None;
        loop {
            let mut query = vec![
                ("restype".to_string(), "container".to_string()),
                ("comp".to_string(), "list".to_string()),
                ("prefix".to_string(), request.prefix.clone()),
            ];
            if let Some(marker) = &marker {
                query.push(("marker".to_string(), marker.clone()));
            }
            let body = self.get_text(&path, query)?;
            let page: BlobEnumerationResults = xml::parse(&body)?;
            blobs.extend(page.blobs.items.into_iter().map(|blob| BlobItem {
                content_length: blob.properties.and_then(|p| p.content_length),
                name: blob.name,
            }));
            marker = continuation(page.next_marker);
            if marker.is_none() {
                break;
            }
        }
        Ok(ListBlobsResponse { blobs })
    }

    /// Streams the blob content into `writer`.
    pub fn download_blob(
        &self,
        request: DownloadBlobRequest,
        writer: &mut dyn Write,
    ) -> Result<DownloadBlobResponse, BlobStorageError> {
        let path = format!(
            "/{}/{}",
            urlencoding::encode(&request.container),
            encode_blob_name(&request.blob_name)
        );
        let res = self.get(&path, vec![])?;
        let size = std::io::copy(&mut res.into_reader(), writer)
            .map_err(|e| BlobStorageError::IO(Box::new(e)))?;
        Ok(DownloadBlobResponse { size })
    }

    fn get_text(&self, path: &str, query: Vec<(String, String)>) -> Result<String, BlobStorageError> {
        let mut body = String::new();
        self.get(path, query)?
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|e| BlobStorageError::IO(Box::new(e)))?;
        Ok(body)
    }

    fn get(&self, path: &str, query: Vec<(String, String)>) -> Result<ureq::Response, BlobStorageError> {
        let endpoint = &self.connection.blob_endpoint;
        let url_path = format!("{}{}", endpoint.base_path, path);
        let mut url = format!("{}{}", endpoint.origin, url_path);

        let mut pairs: Vec<String> = query
            .iter()
            .map(|(name, value)| format!("{}={}", urlencoding::encode(name), urlencoding::encode(value)))
            .collect();
        if let StorageCredential::SharedAccessSignature { token } = &self.connection.credential {
            pairs.push(token.clone());
        }
        if !pairs.is_empty() {
            url.push('?');
            url.push_str(&pairs.join("&"));
        }
        debug!("GET {}{}", endpoint.origin, url_path);

        let date = format_ms_date(chrono::Utc::now());
        let mut request = self
            .agent
            .get(&url)
            .set("x-ms-date", &date)
            .set("x-ms-version", STORAGE_API_VERSION);
        if let StorageCredential::SharedKey {
            account_name,
            account_key,
        } = &self.connection.credential
        {
            let to_sign = string_to_sign(
                "GET",
                account_name,
                &url_path,
                &query,
                &[
                    ("x-ms-date".to_string(), date.clone()),
                    ("x-ms-version".to_string(), STORAGE_API_VERSION.to_string()),
                ],
            );
            let signature = sign(account_key, &to_sign)?;
            request = request.set(
                "Authorization",
                &format!("SharedKey {}:{}", account_name, signature),
            );
        }
        request
            .call()
            .map_err(|e| BlobStorageError::Ureq(Box::new(e)))
    }
}

/// Blob names keep their `/` separators; every segment is percent-encoded.
pub fn encode_blob_name(blob_name: &str) -> String {
    blob_name
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl fmt::Display for BlobStorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobStorageError::InvalidConnectionString { reason } => {
                write!(f, "invalid storage connection string: {}", reason)
            }
            BlobStorageError::InvalidAccountKey => {
                write!(f, "storage account key is not valid base64")
            }
            BlobStorageError::Ureq(e) => match e.as_ref() {
                ureq::Error::Status(code, res) => {
                    write!(f, "blob storage returned {} for {}", code, res.get_url())
                }
                ureq::Error::Transport(transport) => {
                    write!(f, "blob storage request failed: {}", transport)
                }
            },
            BlobStorageError::IO(e) => write!(f, "blob storage I/O error: {}", e),
            BlobStorageError::Xml(e) => write!(f, "unexpected blob storage listing: {}", e),
        }
    }
}

impl std::error::Error for BlobStorageError {}
