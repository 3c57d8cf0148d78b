//! File attribute conversion for the FUSE filesystem

use crate::store::{Attributes, EntryKind};
use fuser::{FileAttr, FileType};
use std::time::SystemTime;

pub const BLOCK_SIZE: u32 = 512;

impl From<EntryKind> for FileType {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Directory => FileType::Directory,
            EntryKind::File => FileType::RegularFile,
        }
    }
}

/// Attribute manager for the FUSE filesystem
#[derive(Debug, Clone, Copy)]
pub struct AttributeManager {
    uid: u32,
    gid: u32,
}

impl AttributeManager {
    /// Everything in the mount is owned by the mounting user.
    pub fn for_current_user() -> Self {
        // SAFETY: getuid/getgid cannot fail and touch no memory
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
        Self { uid, gid }
    }

    pub fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }

    pub fn to_file_attr(&self, ino: u64, attributes: &Attributes) -> FileAttr {
        let is_dir = attributes.kind == EntryKind::Directory;
        FileAttr {
            ino,
            size: attributes.size,
            blocks: attributes.size.div_ceil(BLOCK_SIZE as u64),
            atime: SystemTime::now(),
            mtime: attributes.modified,
            ctime: attributes.modified,
            crtime: attributes.created,
            kind: attributes.kind.into(),
            perm: if is_dir { 0o755 } else { 0o644 },
            nlink: if is_dir { 2 } else { 1 },
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            flags: 0,
            blksize: BLOCK_SIZE,
        }
    }
}
