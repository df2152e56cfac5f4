use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One server-pushed event from `getUpdates`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Message {
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    pub chat: Chat,
    /// Unix seconds
    #[serde(default)]
    pub date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
}

impl Message {
    /// Text of the message, or its caption for media messages
    pub fn text_or_caption(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }

    pub fn date_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.date, 0).single()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Document {
    pub file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_unique_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// Result of `getFile`; `file_path` feeds the static download URL
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct File {
    pub file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_unique_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// A chat as seen by `getChat`, classified by its `type`
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEntity {
    User {
        id: i64,
        username: Option<String>,
        first_name: Option<String>,
        last_name: Option<String>,
    },
    Group {
        id: i64,
        title: String,
    },
    Channel {
        id: i64,
        title: String,
        username: Option<String>,
    },
    Unknown {
        id: i64,
    },
}

impl ChatEntity {
    pub fn id(&self) -> i64 {
        match self {
            ChatEntity::User { id, .. }
            | ChatEntity::Group { id, .. }
            | ChatEntity::Channel { id, .. }
            | ChatEntity::Unknown { id } => *id,
        }
    }
}

/// `supergroup` is classified as a group, like `group`
impl From<Chat> for ChatEntity {
    fn from(chat: Chat) -> Self {
        match chat.kind.as_deref() {
            Some("private") => ChatEntity::User {
                id: chat.id,
                username: chat.username,
                first_name: chat.first_name,
                last_name: chat.last_name,
            },
            Some("group") | Some("supergroup") => ChatEntity::Group {
                id: chat.id,
                title: chat.title.unwrap_or_else(|| "Unknown Group".to_string()),
            },
            Some("channel") => ChatEntity::Channel {
                id: chat.id,
                title: chat.title.unwrap_or_else(|| "Unknown Channel".to_string()),
                username: chat.username,
            },
            _ => ChatEntity::Unknown { id: chat.id },
        }
    }
}
