use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::BlobStorageError;

type HmacSha256 = Hmac<Sha256>;

pub const STORAGE_API_VERSION: &str = "2021-08-06";

/// Header date in the RFC 1123 form required by `x-ms-date`.
pub fn format_ms_date(now: chrono::DateTime<chrono::Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Canonical string for a request without body or conditional headers.
/// `path` is the encoded URL path, `query` holds decoded name/value pairs.
pub fn string_to_sign(
    method: &str,
    account_name: &str,
    path: &str,
    query: &[(String, String)],
    ms_headers: &[(String, String)],
) -> String {
    let mut s = String::new();
    s.push_str(method);
    s.push('\n');
    // Content-Encoding .. Range: eleven standard headers, all empty here.
    for _ in 0..11 {
        s.push('\n');
    }

    let mut headers: Vec<(String, &str)> = ms_headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.trim()))
        .collect();
    headers.sort();
    for (name, value) in headers {
        s.push_str(&name);
        s.push(':');
        s.push_str(value);
        s.push('\n');
    }

    s.push('/');
    s.push_str(account_name);
    if path.is_empty() {
        s.push('/');
    } else {
        s.push_str(path);
    }

    let mut params: Vec<(String, Vec<&str>)> = vec![];
    for (name, value) in query {
        let name = name.to_ascii_lowercase();
        match params.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => values.push(value.as_str()),
            None => params.push((name, vec![value.as_str()])),
        }
    }
    params.sort();
    for (name, mut values) in params {
        values.sort();
        s.push('\n');
        s.push_str(&name);
        s.push(':');
        s.push_str(&values.join(","));
    }
    s
}

pub fn sign(account_key: &[u8], string_to_sign: &str) -> Result<String, BlobStorageError> {
    let mut mac =
        HmacSha256::new_from_slice(account_key).map_err(|_| BlobStorageError::InvalidAccountKey)?;
    mac.update(string_to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
