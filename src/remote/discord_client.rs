use crate::error::RemoteError;
use crate::remote::discord_models::{
    Channel, CreateChannelRequest, Message, MessagePayload, GUILD_CATEGORY, GUILD_TEXT,
};
use crate::remote::http_client::HttpClient;
use crate::remote::store_client::{
    ContainerHandle, GroupHandle, ObjectHandle, ObjectStoreClient, StoreRoot,
};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::multipart::{Form, Part};

/// Largest page the message history endpoint returns.
const MESSAGE_PAGE_SIZE: usize = 100;

/// Discord REST client: channels are containers, attachment messages are objects.
pub struct DiscordClient {
    http_client: HttpClient,
}

impl DiscordClient {
    pub fn new(bot_token: &str) -> Self {
        Self {
            http_client: HttpClient::new(bot_token),
        }
    }

    async fn get_channel(&self, channel_id: &str) -> Result<Channel, RemoteError> {
        self.http_client
            .get(&format!("/channels/{}", channel_id))
            .await
    }

    async fn get_message(&self, object: &ObjectHandle) -> Result<Message, RemoteError> {
        self.http_client
            .get(&format!(
                "/channels/{}/messages/{}",
                object.container_id, object.id
            ))
            .await
    }
}

#[async_trait]
impl ObjectStoreClient for DiscordClient {
    async fn resolve_root(&self, root_id: &str) -> Result<StoreRoot, RemoteError> {
        let root = self.get_channel(root_id).await?;
        if !root.is_text() {
            return Err(RemoteError::Malformed(format!(
                "channel {} is not a text channel",
                root_id
            )));
        }
        let guild_id = root
            .guild_id
            .clone()
            .ok_or_else(|| RemoteError::Malformed(format!("channel {} has no guild", root_id)))?;
        let category_id = root.parent_id.clone().ok_or_else(|| {
            RemoteError::Malformed(format!("channel {} has no category", root_id))
        })?;

        let category = self.get_channel(&category_id).await?;
        if category.kind != GUILD_CATEGORY {
            return Err(RemoteError::Malformed(format!(
                "parent {} of channel {} is not a category",
                category_id, root_id
            )));
        }

        info!(
            "Resolved root channel {} in category {}",
            root.name.as_deref().unwrap_or("?"),
            category.name.as_deref().unwrap_or("?")
        );
        Ok(StoreRoot {
            group: GroupHandle {
                guild_id,
                category_id,
            },
            home: root.to_container_handle(),
        })
    }

    async fn create_container(
        &self,
        group: &GroupHandle,
        name: &str,
    ) -> Result<ContainerHandle, RemoteError> {
        let body = CreateChannelRequest {
            name,
            kind: GUILD_TEXT,
            parent_id: &group.category_id,
        };
        let channel: Channel = self
            .http_client
            .post(&format!("/guilds/{}/channels", group.guild_id), &body)
            .await?;

        info!("Created channel {} ({})", name, channel.id);
        Ok(channel.to_container_handle())
    }

    async fn delete_container(&self, container: &ContainerHandle) -> Result<(), RemoteError> {
        self.http_client
            .delete(&format!("/channels/{}", container.id))
            .await?;
        info!("Deleted channel {} ({})", container.name, container.id);
        Ok(())
    }

    async fn list_containers(
        &self,
        group: &GroupHandle,
    ) -> Result<Vec<ContainerHandle>, RemoteError> {
        let channels: Vec<Channel> = self
            .http_client
            .get(&format!("/guilds/{}/channels", group.guild_id))
            .await?;

        Ok(channels
            .iter()
            .filter(|c| c.is_text() && c.parent_id.as_deref() == Some(group.category_id.as_str()))
            .map(Channel::to_container_handle)
            .collect())
    }

    async fn send_object(
        &self,
        container: &ContainerHandle,
        name: &str,
        content: Vec<u8>,
    ) -> Result<ObjectHandle, RemoteError> {
        let size = content.len();
        let payload = serde_json::to_string(&MessagePayload::single_file(name))
            .map_err(|e| RemoteError::Malformed(e.to_string()))?;
        let form = Form::new()
            .text("payload_json", payload)
            .part("files[0]", Part::bytes(content).file_name(name.to_string()));

        let message: Message = self
            .http_client
            .post_multipart(&format!("/channels/{}/messages", container.id), form)
            .await?;

        debug!("Sent {} ({} bytes) as message {}", name, size, message.id);
        message.to_object_handle().ok_or_else(|| {
            RemoteError::Malformed(format!("message {} came back without attachment", message.id))
        })
    }

    async fn fetch_object_content(&self, object: &ObjectHandle) -> Result<Vec<u8>, RemoteError> {
        // Attachment URLs are signed and expire, so always take a fresh one.
        let message = self.get_message(object).await?;
        match message.attachments.first() {
            Some(attachment) => {
                let content = self.http_client.download(&attachment.url).await?;
                debug!("Fetched {} bytes of message {}", content.len(), object.id);
                Ok(content)
            }
            None => Ok(Vec::new()),
        }
    }

    async fn delete_object(&self, object: &ObjectHandle) -> Result<(), RemoteError> {
        self.http_client
            .delete(&format!(
                "/channels/{}/messages/{}",
                object.container_id, object.id
            ))
            .await?;
        debug!("Deleted message {} ({})", object.id, object.name);
        Ok(())
    }

    async fn list_objects(
        &self,
        container: &ContainerHandle,
    ) -> Result<Vec<ObjectHandle>, RemoteError> {
        let mut objects = Vec::new();
        let mut before: Option<String> = None;

        loop {
            let url = match &before {
                Some(id) => format!(
                    "/channels/{}/messages?limit={}&before={}",
                    container.id, MESSAGE_PAGE_SIZE, id
                ),
                None => format!(
                    "/channels/{}/messages?limit={}",
                    container.id, MESSAGE_PAGE_SIZE
                ),
            };
            let page: Vec<Message> = self.http_client.get(&url).await?;
            let page_len = page.len();

            before = page.last().map(|m| m.id.clone());
            objects.extend(page.iter().filter_map(Message::to_object_handle));

            if page_len < MESSAGE_PAGE_SIZE {
                break;
            }
        }

        debug!(
            "Listed {} objects in channel {}",
            objects.len(),
            container.name
        );
        Ok(objects)
    }
}
