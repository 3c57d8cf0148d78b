//! In-memory mirror of the remote container/object tree
//!
//! The index answers every existence and uniqueness question without a network
//! round trip. It never performs I/O itself: callers mutate it only after the
//! matching remote call has succeeded, so it reflects the remote state as of the
//! last successful call.
//!
//! Fetched content lives in a byte-bounded [`ContentCache`] keyed by object id.
//! Replacing or removing an object drops its cached bytes.

use crate::content_cache::ContentCache;
use crate::error::{FsError, FsResult};
use crate::path::Scope;
use crate::remote::{ContainerHandle, ObjectHandle};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

/// The live object behind a name.
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub handle: ObjectHandle,
    /// When the name first appeared; survives content replacement.
    pub created: SystemTime,
}

impl ObjectEntry {
    pub fn new(handle: ObjectHandle) -> Self {
        Self {
            created: handle.created,
            handle,
        }
    }

    /// Entry for `handle` replacing `previous` under the same name.
    pub fn superseding(handle: ObjectHandle, previous: &ObjectEntry) -> Self {
        Self {
            created: previous.created,
            handle,
        }
    }

    pub fn id(&self) -> &str {
        &self.handle.id
    }

    pub fn size(&self) -> u64 {
        self.handle.size
    }

    /// Every mutation sends a new object, so its send time is the mtime.
    pub fn modified(&self) -> SystemTime {
        self.handle.created
    }
}

#[derive(Debug)]
struct ContainerSlot {
    handle: ContainerHandle,
    objects: BTreeMap<String, ObjectEntry>,
}

impl ContainerSlot {
    fn new(handle: ContainerHandle) -> Self {
        Self {
            handle,
            objects: BTreeMap::new(),
        }
    }
}

#[derive(Debug)]
struct IndexTree {
    home: ContainerSlot,
    containers: BTreeMap<String, ContainerSlot>,
}

impl IndexTree {
    fn slot(&self, scope: &Scope) -> FsResult<&ContainerSlot> {
        match scope {
            Scope::Home => Ok(&self.home),
            Scope::Container(name) => self.containers.get(name).ok_or(FsError::NotFound),
        }
    }

    fn slot_mut(&mut self, scope: &Scope) -> FsResult<&mut ContainerSlot> {
        match scope {
            Scope::Home => Ok(&mut self.home),
            Scope::Container(name) => self.containers.get_mut(name).ok_or(FsError::NotFound),
        }
    }
}

/// Two-level namespace: containers, then object names within each container.
///
/// Lock order is tree, then cache.
#[derive(Debug)]
pub struct NamespaceIndex {
    tree: RwLock<IndexTree>,
    cache: Mutex<ContentCache>,
}

impl NamespaceIndex {
    /// Content caching stays off until [`set_cache_budget`](Self::set_cache_budget) is called.
    pub fn new(home: ContainerHandle) -> Self {
        Self {
            tree: RwLock::new(IndexTree {
                home: ContainerSlot::new(home),
                containers: BTreeMap::new(),
            }),
            cache: Mutex::new(ContentCache::new(0)),
        }
    }

    pub fn set_cache_budget(&self, budget: u64) {
        self.cache().set_budget(budget);
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexTree> {
        self.tree.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexTree> {
        self.tree.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn cache(&self) -> MutexGuard<'_, ContentCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn list_containers(&self) -> Vec<String> {
        self.read().containers.keys().cloned().collect()
    }

    pub fn list_objects(&self, scope: &Scope) -> FsResult<Vec<String>> {
        Ok(self.read().slot(scope)?.objects.keys().cloned().collect())
    }

    pub fn lookup_container(&self, name: &str) -> FsResult<ContainerHandle> {
        self.read()
            .containers
            .get(name)
            .map(|slot| slot.handle.clone())
            .ok_or(FsError::NotFound)
    }

    /// Handle of the container a scope refers to.
    pub fn container_for(&self, scope: &Scope) -> FsResult<ContainerHandle> {
        Ok(self.read().slot(scope)?.handle.clone())
    }

    pub fn lookup_object(&self, scope: &Scope, name: &str) -> FsResult<ObjectEntry> {
        self.read()
            .slot(scope)?
            .objects
            .get(name)
            .cloned()
            .ok_or(FsError::NotFound)
    }

    /// True if `name` is used at the top of the mount, as a container or a home object.
    pub fn top_level_taken(&self, name: &str) -> bool {
        let tree = self.read();
        tree.containers.contains_key(name) || tree.home.objects.contains_key(name)
    }

    pub fn insert_container(&self, name: &str, handle: ContainerHandle) -> FsResult<()> {
        let mut tree = self.write();
        if tree.containers.contains_key(name) {
            return Err(FsError::AlreadyExists);
        }
        tree.containers
            .insert(name.to_string(), ContainerSlot::new(handle));
        Ok(())
    }

    /// Remove a container together with every object entry it held.
    pub fn remove_container(&self, name: &str) -> FsResult<ContainerHandle> {
        let mut tree = self.write();
        let slot = tree.containers.remove(name).ok_or(FsError::NotFound)?;
        let mut cache = self.cache();
        for entry in slot.objects.values() {
            cache.remove(entry.id());
        }
        Ok(slot.handle)
    }

    pub fn insert_object(&self, scope: &Scope, name: &str, entry: ObjectEntry) -> FsResult<()> {
        let mut tree = self.write();
        let slot = tree.slot_mut(scope)?;
        if slot.objects.contains_key(name) {
            return Err(FsError::AlreadyExists);
        }
        slot.objects.insert(name.to_string(), entry);
        Ok(())
    }

    pub fn remove_object(&self, scope: &Scope, name: &str) -> FsResult<ObjectEntry> {
        let mut tree = self.write();
        let entry = tree
            .slot_mut(scope)?
            .objects
            .remove(name)
            .ok_or(FsError::NotFound)?;
        self.cache().remove(entry.id());
        Ok(entry)
    }

    /// Point `name` at a new live object, returning the superseded entry.
    ///
    /// Fails with `Conflict` when the live identifier is no longer `expected_id`.
    pub fn replace_object(
        &self,
        scope: &Scope,
        name: &str,
        expected_id: &str,
        entry: ObjectEntry,
    ) -> FsResult<ObjectEntry> {
        let mut tree = self.write();
        let live = tree
            .slot_mut(scope)?
            .objects
            .get_mut(name)
            .ok_or(FsError::NotFound)?;
        if live.id() != expected_id {
            return Err(FsError::Conflict);
        }
        let old = std::mem::replace(live, entry);
        self.cache().remove(old.id());
        Ok(old)
    }

    /// Remember fetched content, but only while `id` is still the live identifier.
    ///
    /// Returns false when `id` is no longer live or the content exceeds the budget.
    pub fn cache_content(&self, scope: &Scope, name: &str, id: &str, content: Arc<Vec<u8>>) -> bool {
        let tree = self.read();
        let live = tree.slot(scope).ok().and_then(|slot| slot.objects.get(name));
        match live {
            Some(entry) if entry.id() == id => self.cache().insert(id, content),
            _ => false,
        }
    }

    /// Cached content for object `id`, if it is still held.
    pub fn cached_content(&self, id: &str) -> Option<Arc<Vec<u8>>> {
        self.cache().get(id)
    }

    /// Bytes of content currently cached.
    pub fn cached_bytes(&self) -> u64 {
        self.cache().used()
    }

    pub fn container_count(&self) -> usize {
        self.read().containers.len()
    }

    pub fn object_count(&self) -> usize {
        let tree = self.read();
        tree.home.objects.len()
            + tree
                .containers
                .values()
                .map(|slot| slot.objects.len())
                .sum::<usize>()
    }
}
