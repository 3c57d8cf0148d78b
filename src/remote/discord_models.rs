use crate::remote::store_client::{ContainerHandle, ObjectHandle};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds between the Unix epoch and the first second of 2015 (Discord epoch).
const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// Channel type for guild text channels.
pub const GUILD_TEXT: u8 = 0;
/// Channel type for categories.
pub const GUILD_CATEGORY: u8 = 4;

/// Channel: a guild channel or category.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: Option<String>,
    pub guild_id: Option<String>,
    pub parent_id: Option<String>,
}

impl Channel {
    pub fn is_text(&self) -> bool {
        self.kind == GUILD_TEXT
    }

    pub fn to_container_handle(&self) -> ContainerHandle {
        ContainerHandle {
            id: self.id.clone(),
            name: self.name.clone().unwrap_or_default(),
            created: snowflake_time(&self.id),
        }
    }
}

/// Message: a posted message; objects are messages carrying one attachment.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub timestamp: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Creation time, preferring the ISO timestamp over the snowflake.
    pub fn created(&self) -> SystemTime {
        self.timestamp
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(|| snowflake_time(&self.id))
    }

    /// The object this message represents, if it carries an attachment.
    pub fn to_object_handle(&self) -> Option<ObjectHandle> {
        let attachment = self.attachments.first()?;
        Some(ObjectHandle {
            id: self.id.clone(),
            container_id: self.channel_id.clone(),
            name: attachment.filename.clone(),
            size: attachment.size,
            created: self.created(),
        })
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    pub url: String,
}

/// JSON error body returned with non-success statuses
#[derive(Debug, Deserialize, Default)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CreateChannelRequest<'a> {
    pub name: &'a str,
    #[serde(rename = "type")]
    pub kind: u8,
    pub parent_id: &'a str,
}

/// `payload_json` part of a multipart message upload.
#[derive(Debug, Serialize)]
pub struct MessagePayload<'a> {
    pub attachments: Vec<AttachmentSlot<'a>>,
}

#[derive(Debug, Serialize)]
pub struct AttachmentSlot<'a> {
    pub id: u32,
    pub filename: &'a str,
}

impl<'a> MessagePayload<'a> {
    pub fn single_file(filename: &'a str) -> Self {
        Self {
            attachments: vec![AttachmentSlot { id: 0, filename }],
        }
    }
}

/// Creation time encoded in a snowflake id.
pub fn snowflake_time(id: &str) -> SystemTime {
    match id.parse::<u64>() {
        Ok(raw) => UNIX_EPOCH + Duration::from_millis((raw >> 22) + DISCORD_EPOCH_MS),
        Err(_) => UNIX_EPOCH,
    }
}

pub fn parse_timestamp(value: &str) -> Option<SystemTime> {
    chrono::DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.into())
}
