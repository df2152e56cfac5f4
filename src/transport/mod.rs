pub mod http;
#[cfg(test)]
pub(crate) mod mock;

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ApiError, Result};

pub use http::{HttpTransport, DEFAULT_API_URL};

/// The seam between the client and the network.
///
/// Implementations resolve a Bot API method name plus parameters into the raw
/// response body. Decoding is left to [`crate::decode`].
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Call `method` with a JSON body
    async fn send_request(&self, method: &str, params: &Params) -> Result<Vec<u8>>;

    /// Call `method` with a multipart body carrying `file`
    async fn send_multipart(&self, method: &str, params: &Params, file: InputFile)
        -> Result<Vec<u8>>;

    /// Fetch a file by the `file_path` returned from `getFile`
    async fn download(&self, file_path: &str) -> Result<Vec<u8>>;

    /// Static download URL for a `file_path`
    fn file_url(&self, file_path: &str) -> String;
}

/// Request parameters, serialized as a JSON object
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Params(Map<String, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Insert only when `value` is present
    pub fn with_opt<V: Into<Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Plain-text form of each value, as sent in multipart text parts
    pub fn text_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| {
                let text = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), text)
            })
            .collect()
    }
}

/// A file to upload in a multipart request
#[derive(Debug, Clone)]
pub struct InputFile {
    /// Form field the Bot API expects, e.g. `document` or `photo`
    pub field: String,
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InputFile {
    pub async fn from_path(field: &str, path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path).await.map_err(|source| ApiError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("file")
            .to_string();

        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self {
            field: field.to_string(),
            file_name,
            mime_type,
            data,
        })
    }

    pub fn from_bytes(field: &str, file_name: &str, data: Vec<u8>) -> Self {
        Self {
            field: field.to_string(),
            file_name: file_name.to_string(),
            mime_type: mime_guess::from_path(file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
            data,
        }
    }
}

/// `{base_url}/file/bot{token}/{file_path}`
pub fn file_download_url(base_url: &str, token: &str, file_path: &str) -> String {
    format!(
        "{}/file/bot{}/{}",
        base_url.trim_end_matches('/'),
        token,
        file_path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_skip_missing_optionals() {
        let params = Params::new()
            .with("chat_id", 42)
            .with_opt("caption", None::<String>)
            .with_opt("limit", Some(10));
        assert_eq!(params.get("chat_id"), Some(&Value::from(42)));
        assert!(params.get("caption").is_none());
        assert_eq!(
            serde_json::to_string(&params).unwrap(),
            r#"{"chat_id":42,"limit":10}"#
        );
    }

    #[test]
    fn test_text_pairs_unquote_strings() {
        let params = Params::new().with("chat_id", 7).with("caption", "hi");
        let pairs = params.text_pairs();
        assert!(pairs.contains(&("chat_id".to_string(), "7".to_string())));
        assert!(pairs.contains(&("caption".to_string(), "hi".to_string())));
    }

    #[test]
    fn test_file_download_url() {
        assert_eq!(
            file_download_url("https://api.telegram.org/", "123:ABC", "/path/to/file.txt"),
            "https://api.telegram.org/file/bot123:ABC/path/to/file.txt"
        );
    }

    #[test]
    fn test_input_file_mime_from_name() {
        let file = InputFile::from_bytes("photo", "profile.jpg", vec![1, 2, 3]);
        assert_eq!(file.mime_type, "image/jpeg");
        let file = InputFile::from_bytes("document", "blob", vec![]);
        assert_eq!(file.mime_type, "application/octet-stream");
    }
}
