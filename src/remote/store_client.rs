//! Interface between the filesystem core and a remote object store

use crate::error::RemoteError;
use async_trait::async_trait;
use std::time::SystemTime;

/// The grouping that owns every container of the mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupHandle {
    pub guild_id: String,
    pub category_id: String,
}

/// A remote container (directory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    pub id: String,
    pub name: String,
    pub created: SystemTime,
}

/// A remote object (file). `id` changes on every content mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHandle {
    pub id: String,
    pub container_id: String,
    pub name: String,
    pub size: u64,
    pub created: SystemTime,
}

/// Result of resolving the configured root container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRoot {
    pub group: GroupHandle,
    pub home: ContainerHandle,
}

/// Primitives the filesystem consumes from the remote store
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    /// Resolve the root container and the group it belongs to.
    async fn resolve_root(&self, root_id: &str) -> Result<StoreRoot, RemoteError>;

    async fn create_container(
        &self,
        group: &GroupHandle,
        name: &str,
    ) -> Result<ContainerHandle, RemoteError>;
    async fn delete_container(&self, container: &ContainerHandle) -> Result<(), RemoteError>;
    async fn list_containers(&self, group: &GroupHandle) -> Result<Vec<ContainerHandle>, RemoteError>;

    async fn send_object(
        &self,
        container: &ContainerHandle,
        name: &str,
        content: Vec<u8>,
    ) -> Result<ObjectHandle, RemoteError>;
    async fn fetch_object_content(&self, object: &ObjectHandle) -> Result<Vec<u8>, RemoteError>;
    async fn delete_object(&self, object: &ObjectHandle) -> Result<(), RemoteError>;

    /// Every object in `container`, newest first. Only used while bootstrapping.
    async fn list_objects(&self, container: &ContainerHandle) -> Result<Vec<ObjectHandle>, RemoteError>;
}
