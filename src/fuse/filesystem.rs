//! Main FUSE filesystem implementation

use crate::error::FsError;
use crate::fuse::attributes::AttributeManager;
use crate::fuse::inodes::InodeTable;
use crate::path::StorePath;
use crate::store::ChatStore;
use anyhow::Result;
use fuser::{FileAttr, MountOption};
use libc::c_int;
use log::{debug, error, info};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

/// Discord FUSE filesystem over a `ChatStore`
pub struct DiscordFuse {
    store: Arc<ChatStore>,
    inodes: InodeTable,
    attributes: AttributeManager,
}

impl DiscordFuse {
    pub fn new(store: Arc<ChatStore>) -> Self {
        Self::with_attributes(store, AttributeManager::for_current_user())
    }

    pub fn with_attributes(store: Arc<ChatStore>, attributes: AttributeManager) -> Self {
        Self {
            store,
            inodes: InodeTable::new(),
            attributes,
        }
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    pub fn inodes_mut(&mut self) -> &mut InodeTable {
        &mut self.inodes
    }

    pub(crate) fn path_of(&self, ino: u64) -> Result<StorePath, c_int> {
        self.inodes.path(ino).cloned().ok_or(libc::ENOENT)
    }

    pub(crate) fn child_path(&self, parent: u64, name: &OsStr) -> Result<StorePath, c_int> {
        let name = name.to_str().ok_or(libc::EINVAL)?;
        self.path_of(parent)?.child(name).map_err(|e| e.errno())
    }

    /// Attributes of `path`, allocating its inode on first sight.
    pub(crate) fn attr_for(&mut self, path: &StorePath) -> Result<FileAttr, FsError> {
        let attributes = self.store.get_attributes(path)?;
        let ino = self.inodes.ino_for(path);
        Ok(self.attributes.to_file_attr(ino, &attributes))
    }
}

/// Log a failed operation and turn it into an errno.
pub(crate) fn errno_of(op: &str, path: &StorePath, err: FsError) -> c_int {
    match err {
        FsError::NotFound | FsError::AlreadyExists | FsError::IsDirectory => {
            debug!("{} {}: {}", op, path, err)
        }
        _ => error!("{} {} failed: {}", op, path, err),
    }
    err.errno()
}

/// Mount the filesystem and serve requests until it is unmounted.
pub fn mount_filesystem(store: Arc<ChatStore>, mountpoint: &Path) -> Result<()> {
    let fs = DiscordFuse::new(store);
    let options = vec![
        MountOption::RW,
        MountOption::FSName("discord-fs".to_string()),
        MountOption::DefaultPermissions,
    ];

    info!("Mounting Discord FUSE filesystem at: {}", mountpoint.display());
    fuser::mount2(fs, mountpoint, &options)
        .map_err(|e| anyhow::anyhow!("Failed to mount filesystem: {}", e))?;
    info!("Filesystem at {} unmounted", mountpoint.display());
    Ok(())
}
