//! Filesystem operations over the chat store
//!
//! `ChatStore` composes the namespace index, the bridge and the remote client
//! into path-based file operations. Content is immutable remotely, so every
//! mutation sends a replacement object and then retires the previous one.

use crate::bridge::Bridge;
use crate::config::StoreConfig;
use crate::error::{FsError, FsResult};
use crate::index::{NamespaceIndex, ObjectEntry};
use crate::locks::{PathGuard, PathLocks};
use crate::path::{Scope, StorePath};
use crate::remote::{GroupHandle, ObjectHandle, ObjectStoreClient};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attributes {
    pub kind: EntryKind,
    pub size: u64,
    pub created: SystemTime,
    pub modified: SystemTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Write `data` into `content` at `offset`, zero-filling any gap past the end.
pub fn splice(mut content: Vec<u8>, data: &[u8], offset: usize) -> Vec<u8> {
    let end = offset + data.len();
    if content.len() < end {
        content.resize(end, 0);
    }
    content[offset..end].copy_from_slice(data);
    content
}

fn scope_key(scope: &Scope) -> String {
    match scope {
        Scope::Home => "/".to_string(),
        Scope::Container(name) => format!("/{}", name),
    }
}

/// Locks held for the duration of one object operation, parent first.
struct ObjectLocks<'a> {
    _scope: PathGuard<'a>,
    _object: PathGuard<'a>,
}

pub struct ChatStore {
    client: Arc<dyn ObjectStoreClient>,
    bridge: Bridge,
    index: NamespaceIndex,
    locks: PathLocks,
    group: GroupHandle,
    config: StoreConfig,
    mounted_at: SystemTime,
}

impl ChatStore {
    pub fn new(
        client: Arc<dyn ObjectStoreClient>,
        bridge: Bridge,
        group: GroupHandle,
        index: NamespaceIndex,
        config: StoreConfig,
    ) -> Self {
        info!(
            "Chat store ready: {} containers, {} objects",
            index.container_count(),
            index.object_count()
        );
        index.set_cache_budget(if config.cache_content {
            config.cache_budget
        } else {
            0
        });
        Self {
            client,
            bridge,
            index,
            locks: PathLocks::new(),
            group,
            config,
            mounted_at: SystemTime::now(),
        }
    }

    pub fn index(&self) -> &NamespaceIndex {
        &self.index
    }

    fn lock_object(&self, scope: &Scope, name: &str) -> ObjectLocks<'_> {
        let scope_key = scope_key(scope);
        let object_key = match scope {
            Scope::Home => format!("/{}", name),
            Scope::Container(container) => format!("/{}/{}", container, name),
        };
        ObjectLocks {
            _scope: self.locks.shared(&scope_key),
            _object: self.locks.exclusive(&object_key),
        }
    }

    /// Resolve a path that must name an object.
    fn object_target<'p>(&self, path: &'p StorePath) -> FsResult<(Scope, &'p str)> {
        match path {
            StorePath::Root => Err(FsError::IsDirectory),
            StorePath::TopLevel(name) if self.index.lookup_container(name).is_ok() => {
                Err(FsError::IsDirectory)
            }
            _ => path.as_object().ok_or(FsError::NotFound),
        }
    }

    fn check_size(&self, size: u64) -> FsResult<()> {
        if size > self.config.max_object_size {
            return Err(FsError::TooLarge {
                size,
                limit: self.config.max_object_size,
            });
        }
        Ok(())
    }

    pub fn get_attributes(&self, path: &StorePath) -> FsResult<Attributes> {
        match path {
            StorePath::Root => Ok(Attributes {
                kind: EntryKind::Directory,
                size: 0,
                created: self.mounted_at,
                modified: self.mounted_at,
            }),
            StorePath::TopLevel(name) => match self.index.lookup_container(name) {
                Ok(container) => Ok(Attributes {
                    kind: EntryKind::Directory,
                    size: 0,
                    created: container.created,
                    modified: container.created,
                }),
                Err(_) => self.object_attributes(&Scope::Home, name),
            },
            StorePath::Nested { container, name } => {
                self.object_attributes(&Scope::Container(container.clone()), name)
            }
        }
    }

    fn object_attributes(&self, scope: &Scope, name: &str) -> FsResult<Attributes> {
        let entry = self.index.lookup_object(scope, name)?;
        Ok(Attributes {
            kind: EntryKind::File,
            size: entry.size(),
            created: entry.created,
            modified: entry.modified(),
        })
    }

    pub fn list_directory(&self, path: &StorePath) -> FsResult<Vec<DirEntry>> {
        let mut entries = vec![
            DirEntry::new(".", EntryKind::Directory),
            DirEntry::new("..", EntryKind::Directory),
        ];
        match path {
            StorePath::Root => {
                entries.extend(
                    self.index
                        .list_containers()
                        .into_iter()
                        .map(|name| DirEntry::new(name, EntryKind::Directory)),
                );
                entries.extend(
                    self.index
                        .list_objects(&Scope::Home)?
                        .into_iter()
                        .map(|name| DirEntry::new(name, EntryKind::File)),
                );
            }
            StorePath::TopLevel(container) => {
                entries.extend(
                    self.index
                        .list_objects(&Scope::Container(container.clone()))?
                        .into_iter()
                        .map(|name| DirEntry::new(name, EntryKind::File)),
                );
            }
            StorePath::Nested { .. } => return Err(FsError::NotFound),
        }
        Ok(entries)
    }

    pub fn create_container(&self, path: &StorePath) -> FsResult<()> {
        let name = match path {
            StorePath::TopLevel(name) => name,
            StorePath::Root => return Err(FsError::AlreadyExists),
            StorePath::Nested { .. } => return Err(FsError::NotSupported),
        };
        let _root = self.locks.shared("/");
        let _container = self.locks.exclusive(&format!("/{}", name));

        if self.index.top_level_taken(name) {
            return Err(FsError::AlreadyExists);
        }

        let client = self.client.clone();
        let group = self.group.clone();
        let remote_name = name.clone();
        let handle = self.bridge.submit("create_container", async move {
            client.create_container(&group, &remote_name).await
        })?;

        self.index.insert_container(name, handle)?;
        info!("Created directory {}", path);
        Ok(())
    }

    pub fn remove_container(&self, path: &StorePath) -> FsResult<()> {
        let name = match path {
            StorePath::TopLevel(name) => name,
            StorePath::Root => return Err(FsError::NotSupported),
            StorePath::Nested { .. } => return Err(FsError::NotFound),
        };
        let _root = self.locks.shared("/");
        let _container = self.locks.exclusive(&format!("/{}", name));

        let handle = self.index.lookup_container(name)?;
        let client = self.client.clone();
        let result = self.bridge.submit("delete_container", async move {
            client.delete_container(&handle).await
        });
        match result {
            Ok(()) => {}
            Err(err) if err.is_remote_missing() => {
                warn!("Directory {} was already gone remotely", path);
            }
            Err(err) => return Err(err),
        }

        self.index.remove_container(name)?;
        info!("Removed directory {}", path);
        Ok(())
    }

    pub fn create_object(&self, path: &StorePath) -> FsResult<()> {
        let (scope, name) = path.as_object().ok_or(FsError::AlreadyExists)?;
        let _locks = self.lock_object(&scope, name);

        let container = self.index.container_for(&scope)?;
        let taken = match scope {
            Scope::Home => self.index.top_level_taken(name),
            Scope::Container(_) => self.index.lookup_object(&scope, name).is_ok(),
        };
        if taken {
            return Err(FsError::AlreadyExists);
        }

        let client = self.client.clone();
        let remote_name = name.to_string();
        let handle = self.bridge.submit("send_object", async move {
            client.send_object(&container, &remote_name, Vec::new()).await
        })?;

        let id = handle.id.clone();
        self.index.insert_object(&scope, name, ObjectEntry::new(handle))?;
        if self.config.cache_content {
            self.index.cache_content(&scope, name, &id, Arc::new(Vec::new()));
        }
        debug!("Created file {}", path);
        Ok(())
    }

    pub fn read_object(&self, path: &StorePath, offset: u64, size: u32) -> FsResult<Vec<u8>> {
        let (scope, name) = self.object_target(path)?;
        let _locks = self.lock_object(&scope, name);

        let entry = self.index.lookup_object(&scope, name)?;
        let content = match self.index.cached_content(entry.id()) {
            Some(content) => content,
            None => {
                let content = Arc::new(self.fetch(&entry.handle)?);
                if self.config.cache_content {
                    self.index
                        .cache_content(&scope, name, entry.id(), content.clone());
                }
                content
            }
        };

        let len = content.len() as u64;
        if offset >= len {
            return Ok(Vec::new());
        }
        let end = offset.saturating_add(size as u64).min(len);
        Ok(content[offset as usize..end as usize].to_vec())
    }

    /// Copy-on-write: splice `data` into a fresh copy of the content and replace the object.
    pub fn write_object(&self, path: &StorePath, data: &[u8], offset: u64) -> FsResult<usize> {
        let (scope, name) = self.object_target(path)?;
        let _locks = self.lock_object(&scope, name);

        let entry = self.index.lookup_object(&scope, name)?;
        if data.is_empty() {
            return Ok(0);
        }
        let end = offset + data.len() as u64;
        self.check_size(end.max(entry.size()))?;

        let current = self.fetch(&entry.handle)?;
        let spliced = splice(current, data, offset as usize);
        self.check_size(spliced.len() as u64)?;

        self.commit(&scope, name, &entry, spliced)?;
        debug!("Wrote {} bytes at {} to {}", data.len(), offset, path);
        Ok(data.len())
    }

    /// Cut or zero-extend the content to `size` bytes.
    pub fn truncate_object(&self, path: &StorePath, size: u64) -> FsResult<()> {
        let (scope, name) = self.object_target(path)?;
        let _locks = self.lock_object(&scope, name);

        let entry = self.index.lookup_object(&scope, name)?;
        if entry.size() == size {
            return Ok(());
        }
        self.check_size(size)?;

        let mut content = if size == 0 {
            Vec::new()
        } else {
            self.fetch(&entry.handle)?
        };
        content.resize(size as usize, 0);

        self.commit(&scope, name, &entry, content)?;
        debug!("Truncated {} to {} bytes", path, size);
        Ok(())
    }

    pub fn delete_object(&self, path: &StorePath) -> FsResult<()> {
        let (scope, name) = self.object_target(path)?;
        let _locks = self.lock_object(&scope, name);

        let entry = self.index.lookup_object(&scope, name)?;
        let client = self.client.clone();
        let handle = entry.handle.clone();
        let result = self.bridge.submit("delete_object", async move {
            client.delete_object(&handle).await
        });
        match result {
            Ok(()) => {}
            Err(err) if err.is_remote_missing() => {
                warn!("File {} was already gone remotely", path);
            }
            Err(err) => return Err(err),
        }

        self.index.remove_object(&scope, name)?;
        debug!("Deleted file {}", path);
        Ok(())
    }

    fn fetch(&self, handle: &ObjectHandle) -> FsResult<Vec<u8>> {
        let client = self.client.clone();
        let handle = handle.clone();
        self.bridge.submit("fetch_object_content", async move {
            client.fetch_object_content(&handle).await
        })
    }

    /// Send `content` as the new live object for `name`, then retire `previous`.
    fn commit(
        &self,
        scope: &Scope,
        name: &str,
        previous: &ObjectEntry,
        content: Vec<u8>,
    ) -> FsResult<()> {
        let container = self.index.container_for(scope)?;
        let cached = self.config.cache_content.then(|| Arc::new(content.clone()));

        let client = self.client.clone();
        let remote_name = name.to_string();
        let handle = self.bridge.submit("send_object", async move {
            client.send_object(&container, &remote_name, content).await
        })?;

        let entry = ObjectEntry::superseding(handle.clone(), previous);
        match self.index.replace_object(scope, name, previous.id(), entry) {
            Ok(old) => {
                if let Some(content) = cached {
                    self.index.cache_content(scope, name, &handle.id, content);
                }
                self.retire(&old.handle);
                Ok(())
            }
            Err(err) => {
                warn!(
                    "Live object for {} changed during write ({}); dropping message {}",
                    name, err, handle.id
                );
                self.retire(&handle);
                Err(err)
            }
        }
    }

    /// Best-effort delete of a superseded object.
    fn retire(&self, handle: &ObjectHandle) {
        let client = self.client.clone();
        let target = handle.clone();
        let result = self.bridge.submit("delete_object", async move {
            client.delete_object(&target).await
        });
        match result {
            Ok(()) => debug!("Retired message {} ({})", handle.id, handle.name),
            Err(err) if err.is_remote_missing() => {
                debug!("Message {} was already gone", handle.id)
            }
            Err(err) => warn!(
                "Failed to retire message {} ({}): {}",
                handle.id, handle.name, err
            ),
        }
    }
}
