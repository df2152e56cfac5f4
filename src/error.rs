use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the Bot API client.
///
/// `Transport` and `Decode` are the two failure kinds of a request:
/// either no usable response came back, or one did but it was not in the
/// expected shape. `Api` is a well-formed `ok: false` answer from Telegram.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Transport error calling {method}: {message}")]
    Transport { method: String, message: String },

    #[error("Failed to decode {context}: {message}")]
    Decode { context: String, message: String },

    #[error("Telegram API error{}: {description}", code_suffix(.code))]
    Api {
        code: Option<i64>,
        description: String,
    },

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid message link: {0}")]
    InvalidMessageLink(String),

    #[error("Phone code hash is missing, register the app first")]
    MissingPhoneCodeHash,

    #[error("Invalid code")]
    InvalidCode,

    #[error("Polling task failed: {0}")]
    Task(String),
}

impl ApiError {
    pub fn transport(method: &str, message: impl ToString) -> Self {
        ApiError::Transport {
            method: method.to_string(),
            message: message.to_string(),
        }
    }

    pub fn decode(context: &str, message: impl ToString) -> Self {
        ApiError::Decode {
            context: context.to_string(),
            message: message.to_string(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, ApiError::Decode { .. })
    }
}

fn code_suffix(code: &Option<i64>) -> String {
    code.map(|c| format!(" ({c})")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, ApiError>;
