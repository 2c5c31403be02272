use std::io::{Chain, Cursor, Read};

use rand::{distributions::Alphanumeric, Rng};

/// Streaming `multipart/form-data` body: text fields first, then exactly one
/// file part whose content is read from the caller's reader.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    head: Vec<u8>,
}

pub struct MultipartBody<R: Read> {
    pub content_type: String,
    pub content_length: u64,
    pub reader: Chain<Chain<Cursor<Vec<u8>>, R>, Cursor<Vec<u8>>>,
}

impl MultipartForm {
    pub fn new() -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();
        Self::with_boundary(format!("cosmo-migrate-{}", suffix))
    }

    pub fn with_boundary(boundary: String) -> Self {
        Self {
            boundary,
            head: vec![],
        }
    }

    pub fn text(&mut self, name: &str, value: &str) {
        self.head.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary,
                escape_quoted(name),
                value
            )
            .as_bytes(),
        );
    }

    pub fn finish_with_file<R: Read>(
        mut self,
        name: &str,
        file_name: &str,
        file: R,
        file_len: u64,
    ) -> MultipartBody<R> {
        self.head.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                self.boundary,
                escape_quoted(name),
                escape_quoted(file_name)
            )
            .as_bytes(),
        );
        let tail = format!("\r\n--{}--\r\n", self.boundary).into_bytes();
        let content_length = self.head.len() as u64 + file_len + tail.len() as u64;
        MultipartBody {
            content_type: format!("multipart/form-data; boundary={}", self.boundary),
            content_length,
            reader: Cursor::new(self.head).chain(file).chain(Cursor::new(tail)),
        }
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
