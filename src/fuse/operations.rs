//! FUSE filesystem operations implementation

use crate::fuse::filesystem::{errno_of, DiscordFuse};
use crate::fuse::attributes::BLOCK_SIZE;
use crate::path::StorePath;
use fuser::{
    FileType, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry,
    ReplyOpen, ReplyStatfs, ReplyWrite, Request, TimeOrNow,
};
use log::debug;
use std::ffi::OsStr;
use std::time::{Duration, SystemTime};

/// Attribute validity; the index is authoritative so keep it short.
const TTL: Duration = Duration::from_secs(1);

impl DiscordFuse {
    fn reply_entry_for(&mut self, op: &str, path: &StorePath, reply: ReplyEntry) {
        match self.attr_for(path) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(errno_of(op, path, e)),
        }
    }
}

impl fuser::Filesystem for DiscordFuse {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        debug!("LOOKUP: parent={}, name={:?}", parent, name);
        let path = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        self.reply_entry_for("lookup", &path, reply);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        debug!("GETATTR: ino={}", ino);
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        match self.attr_for(&path) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => reply.error(errno_of("getattr", &path, e)),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        debug!("SETATTR: ino={}, size={:?}", ino, size);
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };

        // only the size is backed by the store; other changes are accepted and ignored
        if let Some(size) = size {
            if let Err(e) = self.store().truncate_object(&path, size) {
                return reply.error(errno_of("truncate", &path, e));
            }
        }

        match self.attr_for(&path) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => reply.error(errno_of("setattr", &path, e)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        debug!("READDIR: ino={}, offset={}", ino, offset);
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        let entries = match self.store().list_directory(&path) {
            Ok(entries) => entries,
            Err(e) => return reply.error(errno_of("readdir", &path, e)),
        };

        let parent = path.parent();
        for (i, entry) in entries.iter().enumerate().skip(offset.max(0) as usize) {
            let entry_ino = match entry.name.as_str() {
                "." => ino,
                ".." => self.inodes_mut().ino_for(&parent),
                name => match path.child(name) {
                    Ok(child) => self.inodes_mut().ino_for(&child),
                    Err(_) => continue,
                },
            };
            let kind: FileType = entry.kind.into();
            if reply.add(entry_ino, (i + 1) as i64, kind, &entry.name) {
                break;
            }
        }
        reply.ok();
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        debug!("MKDIR: parent={}, name={:?}", parent, name);
        let path = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        if let Err(e) = self.store().create_container(&path) {
            return reply.error(errno_of("mkdir", &path, e));
        }
        self.reply_entry_for("mkdir", &path, reply);
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        debug!("RMDIR: parent={}, name={:?}", parent, name);
        let path = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        match self.store().remove_container(&path) {
            Ok(()) => {
                self.inodes_mut().forget(&path);
                reply.ok();
            }
            Err(e) => reply.error(errno_of("rmdir", &path, e)),
        }
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        debug!("CREATE: parent={}, name={:?}", parent, name);
        let path = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        if let Err(e) = self.store().create_object(&path) {
            return reply.error(errno_of("create", &path, e));
        }
        match self.attr_for(&path) {
            Ok(attr) => reply.created(&TTL, &attr, 0, 0, 0),
            Err(e) => reply.error(errno_of("create", &path, e)),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        debug!("OPEN: ino={}, flags={:#o}", ino, flags);
        match self.path_of(ino) {
            // stateless: every read and write goes through the path
            Ok(_) => reply.opened(0, 0),
            Err(errno) => reply.error(errno),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        debug!("READ: ino={}, offset={}, size={}", ino, offset, size);
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        if offset < 0 {
            return reply.error(libc::EINVAL);
        }
        match self.store().read_object(&path, offset as u64, size) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(errno_of("read", &path, e)),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        debug!("WRITE: ino={}, offset={}, size={}", ino, offset, data.len());
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        if offset < 0 {
            return reply.error(libc::EINVAL);
        }
        match self.store().write_object(&path, data, offset as u64) {
            Ok(written) => reply.written(written as u32),
            Err(e) => reply.error(errno_of("write", &path, e)),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        debug!("UNLINK: parent={}, name={:?}", parent, name);
        let path = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        match self.store().delete_object(&path) {
            Ok(()) => {
                self.inodes_mut().forget(&path);
                reply.ok();
            }
            Err(e) => reply.error(errno_of("unlink", &path, e)),
        }
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        debug!("STATFS");
        let files = self.store().index().object_count() as u64;

        // the remote store has no meaningful capacity; report dummy values
        reply.statfs(
            1_000_000_000, // Total blocks
            500_000_000,   // Free blocks
            500_000_000,   // Available blocks
            files + 1_000_000,
            1_000_000, // Free files
            BLOCK_SIZE,
            255, // Max filename length
            0,   // Fragment size
        );
    }
}
