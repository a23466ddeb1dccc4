//! Insertion-ordered set of entries keyed by content hash.
//!
//! Set semantics live on the hash; the insertion order is kept so traversal
//! accumulators and head sets stay deterministic before the total-order sort
//! is applied.

use std::collections::HashMap;

use plait_model::entry::Entry;
use plait_model::types::Multihash;

/// Ordered hash → entry map. Adding an existing hash is a no-op.
#[derive(Debug, Clone, Default)]
pub struct OrderedEntryMap {
    order: Vec<Multihash>,
    entries: HashMap<Multihash, Entry>,
}

impl OrderedEntryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = Entry>,
    {
        let mut map = Self::new();
        for entry in entries {
            map.add(entry);
        }
        map
    }

    /// Insert an entry; returns `false` when the hash was already present.
    pub fn add(&mut self, entry: Entry) -> bool {
        let hash = *entry.hash();
        if self.entries.contains_key(&hash) {
            return false;
        }
        self.order.push(hash);
        self.entries.insert(hash, entry);
        true
    }

    pub fn get(&self, hash: &Multihash) -> Option<&Entry> {
        self.entries.get(hash)
    }

    pub fn contains(&self, hash: &Multihash) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entry at insertion position `index`.
    pub fn at(&self, index: usize) -> Option<&Entry> {
        self.order.get(index).and_then(|h| self.entries.get(h))
    }

    pub fn first(&self) -> Option<&Entry> {
        self.at(0)
    }

    pub fn last(&self) -> Option<&Entry> {
        self.order.last().and_then(|h| self.entries.get(h))
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.order.iter().filter_map(|h| self.entries.get(h))
    }

    /// Hashes in insertion order.
    pub fn keys(&self) -> &[Multihash] {
        &self.order
    }

    /// Owned entries in insertion order.
    pub fn slice(&self) -> Vec<Entry> {
        self.iter().cloned().collect()
    }

    /// Fold another map in, preserving this map's order first.
    pub fn merge(&mut self, other: OrderedEntryMap) {
        let OrderedEntryMap { order, mut entries } = other;
        for hash in order {
            if let Some(entry) = entries.remove(&hash) {
                self.add(entry);
            }
        }
    }

    pub fn remove(&mut self, hash: &Multihash) -> Option<Entry> {
        let entry = self.entries.remove(hash)?;
        self.order.retain(|h| h != hash);
        Some(entry)
    }
}

impl FromIterator<Entry> for OrderedEntryMap {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}
