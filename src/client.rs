use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::{AppConfig, Config, PollingConfig};
use crate::decode;
use crate::error::{ApiError, Result};
use crate::poller::UpdatePoller;
use crate::transport::{BotApi, HttpTransport, InputFile, Params};
use crate::types::{ChatEntity, File, Message, User};

/// Identity used for app registration and sign-in
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_id: i64,
    pub api_hash: String,
    pub phone_or_token: String,
}

/// Bot API client: one method per operation, all going through a [`BotApi`].
///
/// The only state kept between calls is the phone code hash handed out by
/// `register_app`, which `enter_code` needs for sign-in.
pub struct Client {
    api: Arc<dyn BotApi>,
    credentials: Credentials,
    app: AppConfig,
    phone_code_hash: RwLock<Option<String>>,
}

impl Client {
    pub fn new(credentials: Credentials, api: Arc<dyn BotApi>) -> Self {
        Self {
            api,
            credentials,
            app: AppConfig::default(),
            phone_code_hash: RwLock::new(None),
        }
    }

    pub fn with_app(mut self, app: AppConfig) -> Self {
        self.app = app;
        self
    }

    /// Build a client backed by [`HttpTransport`]
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::with_config(
            &config.telegram.bot_token,
            config.api.effective_base_url(),
            config.api.timeout(),
        )?;

        let credentials = Credentials {
            api_id: config.telegram.api_id,
            api_hash: config.telegram.api_hash.clone(),
            phone_or_token: config.phone_or_token().to_string(),
        };

        Ok(Self::new(credentials, Arc::new(transport)).with_app(config.app.clone()))
    }

    pub fn api(&self) -> Arc<dyn BotApi> {
        self.api.clone()
    }

    /// A poller sharing this client's transport
    pub fn updates(&self, config: PollingConfig) -> UpdatePoller {
        UpdatePoller::new(self.api.clone(), config)
    }

    pub async fn phone_code_hash(&self) -> Option<String> {
        self.phone_code_hash.read().await.clone()
    }

    pub async fn set_phone_code_hash(&self, hash: Option<String>) {
        *self.phone_code_hash.write().await = hash;
    }

    pub async fn get_me(&self) -> Result<User> {
        let body = self.api.send_request("getMe", &Params::new()).await?;
        decode::decode_user(&body)
    }

    /// Register the application and keep the returned phone code hash
    pub async fn register_app(&self) -> Result<String> {
        let params = Params::new()
            .with("api_id", self.credentials.api_id)
            .with("api_hash", self.credentials.api_hash.as_str())
            .with("name", self.app.name.as_str())
            .with("description", self.app.description.as_str())
            .with("url", self.app.url.as_str());

        let body = self.api.send_request("createApplication", &params).await?;
        let hash = decode::decode_phone_code_hash(&body)?;

        info!("App registered, waiting for confirmation code");
        self.set_phone_code_hash(Some(hash.clone())).await;
        Ok(hash)
    }

    /// Read the confirmation code from `input` (one line) and sign in with it
    pub async fn enter_code<R>(&self, input: &mut R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let hash = self
            .phone_code_hash()
            .await
            .ok_or(ApiError::MissingPhoneCodeHash)?;

        let mut line = String::new();
        input
            .read_line(&mut line)
            .await
            .map_err(|source| ApiError::Io {
                path: PathBuf::from("<input>"),
                source,
            })?;

        let code = line.trim();
        if code.is_empty() {
            return Err(ApiError::InvalidCode);
        }

        self.confirm_code(code, &hash).await
    }

    pub async fn confirm_code(&self, code: &str, phone_code_hash: &str) -> Result<()> {
        let params = Params::new()
            .with("phone_number", self.credentials.phone_or_token.as_str())
            .with("phone_code_hash", phone_code_hash)
            .with("code", code);

        let body = self.api.send_request("signIn", &params).await?;
        decode::decode_ack("signIn", &body)?;

        info!("Signed in successfully");
        Ok(())
    }

    /// Returns the sent message when the server echoes one back
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<Option<Message>> {
        let params = Params::new().with("chat_id", chat_id).with("text", text);
        let body = self.api.send_request("sendMessage", &params).await?;
        decode::decode_sent("sendMessage", &body)
    }

    /// Forward the message a `https://t.me/<chat>/<message_id>` link points to
    pub async fn forward_message(
        &self,
        into_chat: i64,
        from_chat: i64,
        message_link: &str,
    ) -> Result<Option<Message>> {
        let message_id = extract_message_id(message_link)
            .ok_or_else(|| ApiError::InvalidMessageLink(message_link.to_string()))?;
        self.forward_message_by_id(into_chat, from_chat, message_id)
            .await
    }

    pub async fn forward_message_by_id(
        &self,
        into_chat: i64,
        from_chat: i64,
        message_id: i64,
    ) -> Result<Option<Message>> {
        let params = Params::new()
            .with("chat_id", into_chat)
            .with("from_chat_id", from_chat)
            .with("message_id", message_id);

        let body = self.api.send_request("forwardMessage", &params).await?;
        decode::decode_sent("forwardMessage", &body)
    }

    /// Look up a chat and classify it as user, group or channel
    pub async fn get_entity(&self, id: i64) -> Result<ChatEntity> {
        let params = Params::new().with("chat_id", id);
        let body = self.api.send_request("getChat", &params).await?;
        decode::decode_entity(&body)
    }

    pub async fn change_avatar(&self, photo_path: &Path) -> Result<()> {
        let photo = InputFile::from_path("photo", photo_path).await?;
        let body = self
            .api
            .send_multipart("setUserProfilePhoto", &Params::new(), photo)
            .await?;
        decode::decode_ack("setUserProfilePhoto", &body)?;

        info!("Profile photo updated");
        Ok(())
    }

    pub async fn change_username(&self, new_username: &str) -> Result<()> {
        let params = Params::new().with("username", new_username);
        let body = self.api.send_request("updateUsername", &params).await?;
        decode::decode_ack("updateUsername", &body)?;

        info!("Username updated to {}", new_username);
        Ok(())
    }

    pub async fn terminate_sessions(&self) -> Result<()> {
        let body = self
            .api
            .send_request("terminateAllSessions", &Params::new())
            .await?;
        decode::decode_ack("terminateAllSessions", &body)?;

        info!("All sessions terminated");
        Ok(())
    }

    /// Upload a local file as a document
    pub async fn send_file(
        &self,
        chat_id: i64,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<Option<Message>> {
        let document = InputFile::from_path("document", path).await?;
        let params = Params::new()
            .with("chat_id", chat_id)
            .with_opt("caption", caption);

        let body = self
            .api
            .send_multipart("sendDocument", &params, document)
            .await?;
        decode::decode_sent("sendDocument", &body)
    }

    /// Messages of a chat, newest first, starting below `offset_id` when given
    pub async fn get_chat_history(
        &self,
        chat_id: i64,
        limit: u32,
        offset_id: Option<i64>,
    ) -> Result<Vec<Message>> {
        let params = Params::new()
            .with("chat_id", chat_id)
            .with("limit", limit)
            .with_opt("offset_id", offset_id);

        let body = self.api.send_request("getChatHistory", &params).await?;
        decode::decode_messages("getChatHistory", &body)
    }

    pub async fn get_file(&self, file_id: &str) -> Result<File> {
        let params = Params::new().with("file_id", file_id);
        let body = self.api.send_request("getFile", &params).await?;
        decode::decode_file(&body)
    }

    /// Resolve `file_id` to its path, then to the static download URL
    pub async fn file_download_url(&self, file_id: &str) -> Result<String> {
        let path = self.resolve_file_path(file_id).await?;
        Ok(self.api.file_url(&path))
    }

    pub async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        let path = self.resolve_file_path(file_id).await?;
        let data = self.api.download(&path).await?;
        debug!("Downloaded {} ({} bytes)", path, data.len());
        Ok(data)
    }

    async fn resolve_file_path(&self, file_id: &str) -> Result<String> {
        self.get_file(file_id)
            .await?
            .file_path
            .ok_or_else(|| ApiError::decode("getFile", "no file_path in response"))
    }
}

/// Message id from a `https://t.me/<chat>/<message_id>` link: its last path segment
fn extract_message_id(message_link: &str) -> Option<i64> {
    message_link
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
}
