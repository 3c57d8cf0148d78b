//! Byte-bounded content cache keyed by object identifier
//!
//! Object contents are immutable per identifier, so an entry never goes stale;
//! it only becomes unreachable once its name points at a newer object. The
//! cache evicts least recently used entries whenever the byte total exceeds the
//! budget.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug)]
struct CachedContent {
    content: Arc<Vec<u8>>,
    stamp: u64,
}

#[derive(Debug, Default)]
pub struct ContentCache {
    budget: u64,
    used: u64,
    clock: u64,
    entries: HashMap<String, CachedContent>,
    recency: BTreeMap<u64, String>,
}

impl ContentCache {
    pub fn new(budget: u64) -> Self {
        Self {
            budget,
            ..Self::default()
        }
    }

    /// Bytes currently held.
    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_budget(&mut self, budget: u64) {
        self.budget = budget;
        self.evict_to_budget();
    }

    /// Content for `id`, marking it most recently used.
    pub fn get(&mut self, id: &str) -> Option<Arc<Vec<u8>>> {
        let stamp = self.tick();
        let entry = self.entries.get_mut(id)?;
        self.recency.remove(&entry.stamp);
        self.recency.insert(stamp, id.to_string());
        entry.stamp = stamp;
        Some(entry.content.clone())
    }

    /// Store `content` for `id`. Returns false when it can never fit the budget.
    pub fn insert(&mut self, id: &str, content: Arc<Vec<u8>>) -> bool {
        let size = content.len() as u64;
        self.remove(id);
        if size > self.budget {
            return false;
        }
        let stamp = self.tick();
        self.recency.insert(stamp, id.to_string());
        self.entries
            .insert(id.to_string(), CachedContent { content, stamp });
        self.used += size;
        self.evict_to_budget();
        true
    }

    pub fn remove(&mut self, id: &str) {
        if let Some(entry) = self.entries.remove(id) {
            self.recency.remove(&entry.stamp);
            self.used -= entry.content.len() as u64;
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_to_budget(&mut self) {
        while self.used > self.budget {
            let Some((_, id)) = self.recency.pop_first() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&id) {
                self.used -= entry.content.len() as u64;
            }
        }
    }
}
