use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{file_download_url, BotApi, InputFile, Params, DEFAULT_API_URL};
use crate::error::{ApiError, Result};

#[derive(Clone)]
enum Reply {
    Body(Vec<u8>),
    Failure(String),
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub params: Params,
    /// `(field, file_name)` for multipart calls
    pub file: Option<(String, String)>,
}

/// Canned per-method replies.
///
/// Replies queue up per method; the last one queued keeps answering once the
/// others are used up. A method with nothing queued fails as a transport error.
pub struct MockBotApi {
    token: String,
    latency: Option<Duration>,
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockBotApi {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            latency: None,
            replies: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn push_response(&self, method: &str, body: Value) {
        self.push(method, Reply::Body(body.to_string().into_bytes()));
    }

    pub fn push_raw(&self, method: &str, body: &[u8]) {
        self.push(method, Reply::Body(body.to_vec()));
    }

    pub fn push_failure(&self, method: &str, message: &str) {
        self.push(method, Reply::Failure(message.to_string()));
    }

    fn push(&self, method: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self, method: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn answer(&self, call: RecordedCall) -> Result<Vec<u8>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let method = call.method.clone();
        self.calls.lock().unwrap().push(call);

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(&method) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::Failure(message)) => Err(ApiError::transport(&method, message)),
            None => Err(ApiError::transport(
                &method,
                format!("No mock response found for method {method}"),
            )),
        }
    }
}

#[async_trait]
impl BotApi for MockBotApi {
    async fn send_request(&self, method: &str, params: &Params) -> Result<Vec<u8>> {
        self.answer(RecordedCall {
            method: method.to_string(),
            params: params.clone(),
            file: None,
        })
        .await
    }

    async fn send_multipart(
        &self,
        method: &str,
        params: &Params,
        file: InputFile,
    ) -> Result<Vec<u8>> {
        self.answer(RecordedCall {
            method: method.to_string(),
            params: params.clone(),
            file: Some((file.field, file.file_name)),
        })
        .await
    }

    async fn download(&self, file_path: &str) -> Result<Vec<u8>> {
        self.answer(RecordedCall {
            method: "download".to_string(),
            params: Params::new().with("file_path", file_path),
            file: None,
        })
        .await
    }

    fn file_url(&self, file_path: &str) -> String {
        file_download_url(DEFAULT_API_URL, &self.token, file_path)
    }
}
