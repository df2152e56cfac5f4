use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use super::{file_download_url, BotApi, InputFile, Params};
use crate::error::{ApiError, Result};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// reqwest-backed Bot API transport scoped to one bot token
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpTransport {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_config(token, DEFAULT_API_URL, Duration::from_secs(60))
    }

    /// `timeout` bounds every request and must outlast the long-poll timeout
    pub fn with_config(token: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::transport("client", e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn read_body(method: &str, response: reqwest::Response) -> Result<Vec<u8>> {
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| request_error(method, e))?;

        if status.is_success() || is_envelope(&body) {
            debug!("{} answered {} ({} bytes)", method, status, body.len());
            return Ok(body.to_vec());
        }

        Err(ApiError::transport(
            method,
            format!("HTTP {}: {}", status, String::from_utf8_lossy(&body)),
        ))
    }
}

/// reqwest errors carry the request URL, which embeds the token
fn request_error(method: &str, e: reqwest::Error) -> ApiError {
    ApiError::transport(method, e.without_url())
}

/// Telegram reports request errors as 4xx with a JSON `ok: false` body
fn is_envelope(body: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(body)
        .map(|v| v.get("ok").is_some())
        .unwrap_or(false)
}

#[async_trait]
impl BotApi for HttpTransport {
    async fn send_request(&self, method: &str, params: &Params) -> Result<Vec<u8>> {
        // The URL embeds the token, so only the method name is logged
        debug!("Sending {} request", method);

        let response = self
            .client
            .post(self.method_url(method))
            .json(params)
            .send()
            .await
            .map_err(|e| request_error(method, e))?;

        Self::read_body(method, response).await
    }

    async fn send_multipart(
        &self,
        method: &str,
        params: &Params,
        file: InputFile,
    ) -> Result<Vec<u8>> {
        debug!(
            "Uploading {} ({} bytes) via {}",
            file.file_name,
            file.data.len(),
            method
        );

        let part = Part::bytes(file.data)
            .file_name(file.file_name)
            .mime_str(&file.mime_type)
            .map_err(|e| request_error(method, e))?;

        let form = params
            .text_pairs()
            .into_iter()
            .fold(Form::new(), |form, (key, value)| form.text(key, value))
            .part(file.field, part);

        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| request_error(method, e))?;

        Self::read_body(method, response).await
    }

    async fn download(&self, file_path: &str) -> Result<Vec<u8>> {
        debug!("Downloading file {}", file_path);

        let response = self
            .client
            .get(self.file_url(file_path))
            .send()
            .await
            .map_err(|e| request_error("download", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::transport(
                "download",
                format!("HTTP {} for {}", status, file_path),
            ));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| request_error("download", e))
    }

    fn file_url(&self, file_path: &str) -> String {
        file_download_url(&self.base_url, &self.token, file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode;
    use mockito::Matcher;
    use serde_json::json;

    const TOKEN: &str = "123:TEST";

    fn transport(server: &mockito::ServerGuard) -> HttpTransport {
        HttpTransport::with_config(TOKEN, &server.url(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_default_base_url() {
        let transport = HttpTransport::new(TOKEN).unwrap();
        assert_eq!(transport.base_url(), "https://api.telegram.org");
        assert_eq!(
            transport.method_url("getMe"),
            "https://api.telegram.org/bot123:TEST/getMe"
        );
    }

    #[tokio::test]
    async fn test_send_request_posts_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:TEST/sendMessage")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({"chat_id": 123456789, "text": "Hello"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": true, "result": {"message_id": 5, "chat": {"id": 123456789, "type": "private"}, "date": 1706529600, "text": "Hello"}}"#)
            .create_async()
            .await;

        let params = Params::new()
            .with("chat_id", 123456789)
            .with("text", "Hello");
        let body = transport(&server)
            .send_request("sendMessage", &params)
            .await
            .unwrap();

        let message = decode::decode_sent("sendMessage", &body).unwrap().unwrap();
        assert_eq!(message.message_id, 5);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_envelope_is_passed_to_decoder() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/bot123:TEST/getChat")
            .with_status(400)
            .with_body(r#"{"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}"#)
            .create_async()
            .await;

        let body = transport(&server)
            .send_request("getChat", &Params::new().with("chat_id", 1))
            .await
            .unwrap();

        let err = decode::decode_entity(&body).unwrap_err();
        assert!(matches!(err, ApiError::Api { code: Some(400), .. }));
    }

    #[tokio::test]
    async fn test_non_envelope_error_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/bot123:TEST/getUpdates")
            .with_status(502)
            .with_body("<html>Bad Gateway</html>")
            .create_async()
            .await;

        let err = transport(&server)
            .send_request("getUpdates", &Params::new())
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let transport =
            HttpTransport::with_config(TOKEN, "http://127.0.0.1:1", Duration::from_secs(2))
                .unwrap();
        let err = transport
            .send_request("getMe", &Params::new())
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_transport_error_hides_token() {
        let transport = HttpTransport::with_config(
            "123:SECRET",
            "http://127.0.0.1:1",
            Duration::from_secs(2),
        )
        .unwrap();

        let err = transport
            .send_request("getUpdates", &Params::new())
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert!(!err.to_string().contains("SECRET"));

        let err = transport.download("photos/a.jpg").await.unwrap_err();
        assert!(!err.to_string().contains("SECRET"));
    }

    #[tokio::test]
    async fn test_send_multipart_carries_file_and_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:TEST/sendDocument")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data; boundary=".to_string()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="chat_id"\r\n\r\n42"#.to_string()),
                Matcher::Regex(r#"name="document"; filename="notes.txt""#.to_string()),
                Matcher::Regex("file contents".to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"ok": true, "result": true}"#)
            .create_async()
            .await;

        let file = InputFile::from_bytes("document", "notes.txt", b"file contents".to_vec());
        let body = transport(&server)
            .send_multipart("sendDocument", &Params::new().with("chat_id", 42), file)
            .await
            .unwrap();

        assert!(decode::decode_ack("sendDocument", &body).is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_download_uses_file_url() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/file/bot123:TEST/path/to/file.txt")
            .with_status(200)
            .with_body("hello file")
            .create_async()
            .await;

        let transport = transport(&server);
        assert_eq!(
            transport.file_url("path/to/file.txt"),
            format!("{}/file/bot123:TEST/path/to/file.txt", server.url())
        );
        let data = transport.download("path/to/file.txt").await.unwrap();
        assert_eq!(data, b"hello file");
    }

    #[tokio::test]
    async fn test_download_missing_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/file/bot123:TEST/missing.bin")
            .with_status(404)
            .create_async()
            .await;

        let err = transport(&server).download("missing.bin").await.unwrap_err();
        assert!(err.is_transport());
    }
}
