//! JSON response bodies → typed records.
//!
//! Every Bot API answer is an envelope `{"ok": bool, "result": ..., "description": ...}`.
//! Bodies without `ok` are accepted too: a `result` key is unwrapped, otherwise
//! the whole body is taken as the payload.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::types::{Chat, ChatEntity, File, Message, Update, User};

/// Parse the body and strip the envelope, returning the `result` payload
pub fn unwrap_result(context: &str, bytes: &[u8]) -> Result<Value> {
    let body: Value =
        serde_json::from_slice(bytes).map_err(|e| ApiError::decode(context, e))?;

    let mut map = match body {
        Value::Object(map) => map,
        other => return Ok(other),
    };

    match map.get("ok").cloned() {
        Some(Value::Bool(true)) => Ok(map.remove("result").unwrap_or(Value::Null)),
        Some(Value::Bool(false)) => Err(ApiError::Api {
            code: map.get("error_code").and_then(Value::as_i64),
            description: map
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        }),
        Some(other) => Err(ApiError::decode(
            context,
            format!("unexpected `ok` value: {other}"),
        )),
        None => match map.remove("result") {
            Some(result) => Ok(result),
            None => Ok(Value::Object(map)),
        },
    }
}

fn decode_result<T: DeserializeOwned>(context: &str, bytes: &[u8]) -> Result<T> {
    let result = unwrap_result(context, bytes)?;
    serde_json::from_value(result).map_err(|e| ApiError::decode(context, e))
}

pub fn decode_updates(bytes: &[u8]) -> Result<Vec<Update>> {
    let result = unwrap_result("getUpdates", bytes)?;
    if result.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(result).map_err(|e| ApiError::decode("getUpdates", e))
}

pub fn decode_entity(bytes: &[u8]) -> Result<ChatEntity> {
    let chat: Chat = decode_result("getChat", bytes)?;
    Ok(ChatEntity::from(chat))
}

/// Result of a send: the sent message, or `None` for a bare acknowledgment
pub fn decode_sent(context: &str, bytes: &[u8]) -> Result<Option<Message>> {
    let result = unwrap_result(context, bytes)?;
    if result.get("message_id").is_none() {
        return Ok(None);
    }
    serde_json::from_value(result)
        .map(Some)
        .map_err(|e| ApiError::decode(context, e))
}

pub fn decode_messages(context: &str, bytes: &[u8]) -> Result<Vec<Message>> {
    decode_result(context, bytes)
}

pub fn decode_file(bytes: &[u8]) -> Result<File> {
    decode_result("getFile", bytes)
}

pub fn decode_user(bytes: &[u8]) -> Result<User> {
    decode_result("getMe", bytes)
}

pub fn decode_phone_code_hash(bytes: &[u8]) -> Result<String> {
    let result = unwrap_result("createApplication", bytes)?;
    result
        .get("phone_code_hash")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::decode("createApplication", "no phone_code_hash in response"))
}

/// Check the envelope of a call whose result is not needed
pub fn decode_ack(context: &str, bytes: &[u8]) -> Result<()> {
    unwrap_result(context, bytes).map(|_| ())
}
