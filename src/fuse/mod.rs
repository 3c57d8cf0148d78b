//! FUSE front end
//!
//! Translates inode-based kernel requests into path-based `ChatStore` calls.

pub mod attributes;
pub mod filesystem;
pub mod inodes;
pub mod operations;

pub use filesystem::{mount_filesystem, DiscordFuse};
