use std::collections::HashMap;
use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::BlobStorageError;

pub const DEVELOPMENT_ACCOUNT_NAME: &str = "devstoreaccount1";
// Published Azurite emulator key.
pub const DEVELOPMENT_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEVELOPMENT_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConnection {
    pub blob_endpoint: BlobEndpoint,
    pub credential: StorageCredential,
}

/// `origin` is `scheme://host[:port]`; `base_path` is empty for the public
/// cloud and `/<account>` for path-style endpoints such as Azurite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEndpoint {
    pub origin: String,
    pub base_path: String,
}

#[derive(Clone, PartialEq, Eq)]
pub enum StorageCredential {
    SharedKey {
        account_name: String,
        account_key: Vec<u8>,
    },
    SharedAccessSignature {
        token: String,
    },
    Anonymous,
}

impl fmt::Debug for StorageCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageCredential::SharedKey { account_name, .. } => f
                .debug_struct("SharedKey")
                .field("account_name", account_name)
                .finish_non_exhaustive(),
            StorageCredential::SharedAccessSignature { .. } => {
                f.debug_struct("SharedAccessSignature").finish_non_exhaustive()
            }
            StorageCredential::Anonymous => write!(f, "Anonymous"),
        }
    }
}

impl BlobEndpoint {
    pub fn parse(url: &str) -> Result<Self, BlobStorageError> {
        let url = url.trim().trim_end_matches('/');
        let Some(scheme_end) = url.find("://") else {
            return Err(BlobStorageError::InvalidConnectionString {
                reason: format!("blob endpoint '{}' has no scheme", url),
            });
        };
        let after_scheme = scheme_end + 3;
        let (origin, base_path) = match url[after_scheme..].find('/') {
            Some(i) => url.split_at(after_scheme + i),
            None => (url, ""),
        };
        if origin.len() == after_scheme {
            return Err(BlobStorageError::InvalidConnectionString {
                reason: format!("blob endpoint '{}' has no host", url),
            });
        }
        Ok(Self {
            origin: origin.to_string(),
            base_path: base_path.to_string(),
        })
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.origin, self.base_path)
    }
}

impl StorageConnection {
    /// Parses an Azure Storage connection string (`Key=Value;...`). Keys are
    /// matched case-insensitively.
    pub fn parse(connection_string: &str) -> Result<Self, BlobStorageError> {
        let mut settings = HashMap::new();
        for part in connection_string.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let Some((key, value)) = part.split_once('=') else {
                return Err(BlobStorageError::InvalidConnectionString {
                    reason: "setting without '='".to_string(),
                });
            };
            settings.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        let use_development_storage = settings
            .get("usedevelopmentstorage")
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));
        if use_development_storage {
            return Ok(Self {
                blob_endpoint: BlobEndpoint::parse(DEVELOPMENT_BLOB_ENDPOINT)?,
                credential: shared_key(DEVELOPMENT_ACCOUNT_NAME, DEVELOPMENT_ACCOUNT_KEY)?,
            });
        }

        let account_name = settings.get("accountname");
        let blob_endpoint = match settings.get("blobendpoint") {
            Some(endpoint) => BlobEndpoint::parse(endpoint)?,
            None => {
                let Some(account_name) = account_name else {
                    return Err(BlobStorageError::InvalidConnectionString {
                        reason: "AccountName or BlobEndpoint is required".to_string(),
                    });
                };
                let protocol = settings
                    .get("defaultendpointsprotocol")
                    .map(String::as_str)
                    .unwrap_or("https");
                let suffix = settings
                    .get("endpointsuffix")
                    .map(String::as_str)
                    .unwrap_or("core.windows.net");
                BlobEndpoint::parse(&format!("{}://{}.blob.{}", protocol, account_name, suffix))?
            }
        };

        let credential = match (
            account_name,
            settings.get("accountkey"),
            settings.get("sharedaccesssignature"),
        ) {
            (Some(account_name), Some(account_key), _) => shared_key(account_name, account_key)?,
            (_, _, Some(token)) => StorageCredential::SharedAccessSignature {
                token: token.trim_start_matches('?').to_string(),
            },
            _ => StorageCredential::Anonymous,
        };

        Ok(Self {
            blob_endpoint,
            credential,
        })
    }
}

fn shared_key(account_name: &str, account_key: &str) -> Result<StorageCredential, BlobStorageError> {
    let account_key = STANDARD
        .decode(account_key)
        .map_err(|_| BlobStorageError::InvalidAccountKey)?;
    Ok(StorageCredential::SharedKey {
        account_name: account_name.to_string(),
        account_key,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_public_cloud() {
        let connection = StorageConnection::parse(
            "DefaultEndpointsProtocol=https;AccountName=myaccount;AccountKey=a2V5;EndpointSuffix=core.windows.net",
        )
        .unwrap();
        assert_eq!(
            connection.blob_endpoint,
            BlobEndpoint {
                origin: "https://myaccount.blob.core.windows.net".to_string(),
                base_path: String::new(),
            }
        );
        assert_eq!(
            connection.credential,
            StorageCredential::SharedKey {
                account_name: "myaccount".to_string(),
                account_key: b"key".to_vec(),
            }
        );
    }

    #[test]
    fn test_parse_defaults_and_case_insensitive_keys() {
        let connection = StorageConnection::parse("accountname=acc;ACCOUNTKEY=a2V5;").unwrap();
        assert_eq!(
            connection.blob_endpoint.url(),
            "https://acc.blob.core.windows.net"
        );
    }

    #[test]
    fn test_parse_development_storage() {
        let connection = StorageConnection::parse("UseDevelopmentStorage=true").unwrap();
        assert_eq!(
            connection.blob_endpoint,
            BlobEndpoint {
                origin: "http://127.0.0.1:10000".to_string(),
                base_path: "/devstoreaccount1".to_string(),
            }
        );
        assert!(matches!(
            connection.credential,
            StorageCredential::SharedKey { ref account_name, .. } if account_name == DEVELOPMENT_ACCOUNT_NAME
        ));
    }

    #[test]
    fn test_parse_explicit_endpoint_with_sas() {
        let connection = StorageConnection::parse(
            "BlobEndpoint=https://acc.blob.core.windows.net/;SharedAccessSignature=?sv=2021-08-06&sig=abc%3D",
        )
        .unwrap();
        assert_eq!(
            connection.blob_endpoint.url(),
            "https://acc.blob.core.windows.net"
        );
        assert_eq!(
            connection.credential,
            StorageCredential::SharedAccessSignature {
                token: "sv=2021-08-06&sig=abc%3D".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            StorageConnection::parse("DefaultEndpointsProtocol=https"),
            Err(BlobStorageError::InvalidConnectionString { .. })
        ));
        assert!(matches!(
            StorageConnection::parse("AccountName=acc;garbage"),
            Err(BlobStorageError::InvalidConnectionString { .. })
        ));
        assert!(matches!(
            StorageConnection::parse("AccountName=acc;AccountKey=not base64!"),
            Err(BlobStorageError::InvalidAccountKey)
        ));
        assert!(matches!(
            BlobEndpoint::parse("no-scheme.example.com"),
            Err(BlobStorageError::InvalidConnectionString { .. })
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let credential = shared_key("acc", "a2V5").unwrap();
        let debug = format!("{:?}", credential);
        assert_eq!(debug, "SharedKey { account_name: \"acc\", .. }");
    }
}
