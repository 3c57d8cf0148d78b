//! Inode numbers for store paths
//!
//! The kernel addresses everything by inode while the store is path based.
//! Numbers are handed out on first sight and never reused.

use crate::path::StorePath;
use std::collections::HashMap;

pub const ROOT_INO: u64 = 1;

#[derive(Debug)]
pub struct InodeTable {
    paths: HashMap<u64, StorePath>,
    inodes: HashMap<StorePath, u64>,
    next_ino: u64,
}

impl Default for InodeTable {
    fn default() -> Self {
        let mut table = Self {
            paths: HashMap::new(),
            inodes: HashMap::new(),
            next_ino: ROOT_INO + 1,
        };
        table.paths.insert(ROOT_INO, StorePath::Root);
        table.inodes.insert(StorePath::Root, ROOT_INO);
        table
    }
}

impl InodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(&self, ino: u64) -> Option<&StorePath> {
        self.paths.get(&ino)
    }

    /// Inode for `path`, allocating one if the path is new.
    pub fn ino_for(&mut self, path: &StorePath) -> u64 {
        if let Some(ino) = self.inodes.get(path) {
            return *ino;
        }
        let ino = self.next_ino;
        self.next_ino += 1;
        self.paths.insert(ino, path.clone());
        self.inodes.insert(path.clone(), ino);
        ino
    }

    /// Drop `path` and everything below it.
    pub fn forget(&mut self, path: &StorePath) {
        if *path == StorePath::Root {
            return;
        }
        let gone: Vec<StorePath> = self
            .inodes
            .keys()
            .filter(|p| p.starts_with(path))
            .cloned()
            .collect();
        for p in gone {
            if let Some(ino) = self.inodes.remove(&p) {
                self.paths.remove(&ino);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
