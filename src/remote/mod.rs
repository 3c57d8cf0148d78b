//! Remote object store access
//!
//! `ObjectStoreClient` is the seam the filesystem core consumes; `DiscordClient`
//! implements it over the Discord REST API.

pub mod discord_client;
pub mod discord_models;
pub mod http_client;
pub mod store_client;

pub use discord_client::DiscordClient;
pub use store_client::{ContainerHandle, GroupHandle, ObjectHandle, ObjectStoreClient, StoreRoot};
