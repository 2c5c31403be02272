use serde::Deserialize;

use crate::BlobStorageError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ContainerEnumerationResults {
    #[serde(default)]
    pub containers: ContainerList,
    #[serde(default)]
    pub next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ContainerList {
    #[serde(rename = "Container", default)]
    pub items: Vec<ContainerXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ContainerXml {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct BlobEnumerationResults {
    #[serde(default)]
    pub blobs: BlobList,
    #[serde(default)]
    pub next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BlobList {
    #[serde(rename = "Blob", default)]
    pub items: Vec<BlobXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct BlobXml {
    pub name: String,
    #[serde(default)]
    pub properties: Option<BlobPropertiesXml>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BlobPropertiesXml {
    #[serde(rename = "Content-Length", default)]
    pub content_length: Option<u64>,
}

pub(crate) fn parse<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, BlobStorageError> {
    // The service prefixes its XML with a UTF-8 BOM.
    let body = body.trim_start_matches('\u{feff}');
    quick_xml::de::from_str(body).map_err(|e| BlobStorageError::Xml(Box::new(e)))
}

/// An empty `<NextMarker />` ends the listing.
pub(crate) fn continuation(next_marker: Option<String>) -> Option<String> {
    next_marker.filter(|marker| !marker.is_empty())
}
