//! Discord channels and attachments as a mountable filesystem
//!
//! Text channels under the root channel's category are directories; messages
//! carrying one attachment are files. Files written through the mount are
//! re-sent as new messages and the superseded message is deleted.

pub mod bootstrap;
pub mod bridge;
pub mod config;
pub mod content_cache;
pub mod error;
pub mod fuse;
pub mod index;
pub mod locks;
pub mod log_appender;
pub mod path;
pub mod remote;
pub mod store;

pub use bridge::Bridge;
pub use error::{FsError, FsResult, RemoteError};
pub use path::{Scope, StorePath};
pub use store::ChatStore;
