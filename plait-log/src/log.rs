//! The append-only replicated log.
//!
//! A `Log` owns a set of entries (a content-addressed DAG), its current
//! heads, a Lamport clock and a tiebreaker. It is mutated only by `append`
//! and `join`; `values()` is a pure function of the entry set and the
//! tiebreaker, which is what makes two replicas with the same entries agree
//! on the same sequence.
//!
//! The log is deliberately not thread-safe — callers serialize access.
//! Concurrency lives at the fetch boundary, not in the state machine.

use std::cell::RefCell;
use std::collections::HashSet;

use plait_model::codec::HeadList;
use plait_model::entry::{Entry, EntryError};
use plait_model::types::Multihash;
use plait_model::{LamportClock, OwnedIdentity};
use plait_store::{EntryStore, StoreError};
use tracing::debug;
use uuid::Uuid;

use crate::fetch::{self, FetchOptions};
use crate::ordered_map::OrderedEntryMap;
use crate::sorting::{sort_entries, SortError, Tiebreaker};

/// Log-level failure.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("log id mismatch: expected {expected:?}, got {actual:?}")]
    LogIdMismatch { expected: String, actual: String },

    #[error("cannot serialize an empty log")]
    EmptyLog,

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error(transparent)]
    Sort(#[from] SortError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Entry(#[from] EntryError),
}

/// Construction options for [`Log`].
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Log id. Defaults to the entries' shared id, or a fresh UUID.
    pub id: Option<String>,
    /// Initial entry set.
    pub entries: Vec<Entry>,
    /// Initial heads; derived from `entries` when empty.
    pub heads: Vec<Multihash>,
    /// Clock floor; the log never goes below the entries' max time.
    pub clock: Option<LamportClock>,
    /// Total-order tiebreaker. Part of the replication contract: replicas
    /// must agree on it for `values()` to agree.
    pub tiebreaker: Tiebreaker,
}

/// An append-only, signed, deterministically ordered log.
pub struct Log {
    store: EntryStore,
    identity: OwnedIdentity,
    id: String,
    entries: OrderedEntryMap,
    heads: OrderedEntryMap,
    clock: LamportClock,
    tiebreaker: Tiebreaker,
    values_cache: RefCell<Option<Vec<Entry>>>,
}

impl Log {
    /// Build a log from already-held entries.
    pub fn new(
        store: EntryStore,
        identity: OwnedIdentity,
        opts: LogOptions,
    ) -> Result<Log, LogError> {
        let id = opts
            .id
            .or_else(|| opts.entries.last().map(|e| e.log_id().to_string()))
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        for entry in &opts.entries {
            if entry.log_id() != id {
                return Err(LogError::LogIdMismatch {
                    expected: id.clone(),
                    actual: entry.log_id().to_string(),
                });
            }
        }

        let entries = OrderedEntryMap::from_entries(opts.entries);

        let heads = if opts.heads.is_empty() {
            OrderedEntryMap::from_entries(find_heads(&entries))
        } else {
            let resolved: Vec<Entry> = opts
                .heads
                .iter()
                .filter_map(|h| entries.get(h).cloned())
                .collect();
            if resolved.is_empty() {
                OrderedEntryMap::from_entries(find_heads(&entries))
            } else {
                OrderedEntryMap::from_entries(resolved)
            }
        };

        let max_time = entries.iter().map(|e| e.clock().time).max().unwrap_or(0);
        let time = opts.clock.map(|c| c.time.max(max_time)).unwrap_or(max_time);
        let clock = LamportClock::new(identity.public_key(), time);

        Ok(Log {
            store,
            identity,
            id,
            entries,
            heads,
            clock,
            tiebreaker: opts.tiebreaker,
            values_cache: RefCell::new(None),
        })
    }

    /// Reconstruct a log by fetching from a set of entry hashes.
    ///
    /// The fetch runs with the full `length` budget per starting hash; the
    /// union is sorted and trimmed to the last `length` entries.
    pub async fn from_entry_hash(
        store: EntryStore,
        identity: OwnedIdentity,
        hashes: &[Multihash],
        opts: LogOptions,
        fetch_opts: &FetchOptions,
    ) -> Result<Log, LogError> {
        let result = fetch::fetch_parallel(&store, hashes, fetch_opts).await;
        let mut entries = result.entries.slice();
        sort_entries(&mut entries, &opts.tiebreaker)?;
        if let Some(limit) = fetch_opts.length {
            if entries.len() > limit {
                entries = entries.split_off(entries.len() - limit);
            }
        }
        Log::new(
            store,
            identity,
            LogOptions {
                id: opts.id,
                entries,
                heads: Vec::new(),
                clock: opts.clock,
                tiebreaker: opts.tiebreaker,
            },
        )
    }

    /// Reconstruct a log from a published head-list block.
    pub async fn from_multihash(
        store: EntryStore,
        identity: OwnedIdentity,
        hash: &Multihash,
        opts: LogOptions,
        fetch_opts: &FetchOptions,
    ) -> Result<Log, LogError> {
        let list = store.get_head_list(hash).await?;
        let result = fetch::fetch_all(&store, &list.heads, fetch_opts).await;
        Log::new(
            store,
            identity,
            LogOptions {
                id: opts.id.or(Some(list.id)),
                entries: result.entries.slice(),
                heads: list.heads,
                clock: opts.clock,
                tiebreaker: opts.tiebreaker,
            },
        )
    }

    /// Reconstruct a log from a deserialized head list.
    pub async fn from_json(
        store: EntryStore,
        identity: OwnedIdentity,
        list: HeadList,
        opts: LogOptions,
        fetch_opts: &FetchOptions,
    ) -> Result<Log, LogError> {
        let result = fetch::fetch_parallel(&store, &list.heads, fetch_opts).await;
        Log::new(
            store,
            identity,
            LogOptions {
                id: opts.id.or(Some(list.id)),
                entries: result.entries.slice(),
                heads: list.heads,
                clock: opts.clock,
                tiebreaker: opts.tiebreaker,
            },
        )
    }

    /// Reconstruct a log from held source entries, fetching their ancestry
    /// and keeping the sources in the result even when the length window
    /// would have dropped them.
    pub async fn from_entry(
        store: EntryStore,
        identity: OwnedIdentity,
        sources: &[Entry],
        opts: LogOptions,
        fetch_opts: &FetchOptions,
    ) -> Result<Log, LogError> {
        if sources.is_empty() {
            return Err(LogError::InvalidArgument(
                "from_entry requires at least one source entry",
            ));
        }

        let mut bounded = fetch_opts.clone();
        bounded.length = fetch_opts.length.map(|k| k.max(sources.len()));
        let roots: Vec<Multihash> = sources.iter().map(|e| *e.hash()).collect();
        let result = fetch::fetch_parallel(&store, &roots, &bounded).await;

        let mut combined = OrderedEntryMap::from_entries(sources.iter().cloned());
        combined.merge(result.entries);
        let mut uniques = combined.slice();
        sort_entries(&mut uniques, &opts.tiebreaker)?;

        let mut window = match bounded.length {
            Some(limit) if uniques.len() > limit => uniques.split_off(uniques.len() - limit),
            _ => uniques,
        };

        // Sources that fell outside the window displace its oldest entries.
        let held: HashSet<Multihash> = window.iter().map(|e| *e.hash()).collect();
        let missing: Vec<Entry> = sources
            .iter()
            .filter(|s| !held.contains(s.hash()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            let tail = window.split_off(missing.len());
            window = missing;
            window.extend(tail);
        }

        Log::new(
            store,
            identity,
            LogOptions {
                id: opts.id,
                entries: window,
                heads: Vec::new(),
                clock: opts.clock,
                tiebreaker: opts.tiebreaker,
            },
        )
    }

    /// Append a payload as a new entry referencing the current heads.
    ///
    /// `n_ptr` widens the reference set beyond the heads with a backward
    /// walk of the log tail, up to `max(n_ptr, |heads|)` entries — denser
    /// edges shorten later traversals at the cost of block size.
    pub async fn append(&mut self, payload: &[u8], n_ptr: usize) -> Result<Entry, LogError> {
        let head_max = self.heads.iter().map(|e| e.clock().time).max().unwrap_or(0);
        let time = self.clock.time.max(head_max) + 1;
        self.clock = LamportClock::new(self.identity.public_key(), time);

        let mut parents = self.heads.slice();
        for entry in self.tail_refs(n_ptr.max(self.heads.len()))? {
            if !parents.iter().any(|p| p.hash() == entry.hash()) {
                parents.push(entry);
            }
        }

        let entry = Entry::create(&self.identity, &self.id, payload, &parents, Some(self.clock))?;
        self.store.put_entry(&entry).await?;

        debug!(log_id = %self.id, hash = %entry.hash(), time, "appended entry");
        self.entries.add(entry.clone());
        self.heads = OrderedEntryMap::from_entries([entry.clone()]);
        self.invalidate_values();
        Ok(entry)
    }

    /// Merge another log into this one.
    ///
    /// Every incoming entry is verified; heads are recomputed as the entries
    /// no other entry references; with `size`, the log is clamped to the
    /// last `size` entries of the merged order. Join is idempotent and
    /// commutative.
    pub fn join(&mut self, other: &Log, size: Option<usize>) -> Result<(), LogError> {
        if other.id != self.id {
            return Err(LogError::LogIdMismatch {
                expected: self.id.clone(),
                actual: other.id.clone(),
            });
        }

        let mut added = 0usize;
        for entry in other.entries.iter() {
            if self.entries.contains(entry.hash()) {
                continue;
            }
            if entry.log_id() != self.id {
                return Err(LogError::LogIdMismatch {
                    expected: self.id.clone(),
                    actual: entry.log_id().to_string(),
                });
            }
            entry.verify()?;
            self.entries.add(entry.clone());
            added += 1;
        }

        self.heads = OrderedEntryMap::from_entries(find_heads(&self.entries));
        self.clock.merge(&other.clock);

        if let Some(limit) = size {
            if self.entries.len() > limit {
                let mut values = self.entries.slice();
                sort_entries(&mut values, &self.tiebreaker)?;
                let keep = values.split_off(values.len() - limit);
                self.entries = OrderedEntryMap::from_entries(keep);
                self.heads = OrderedEntryMap::from_entries(find_heads(&self.entries));
            }
        }

        self.invalidate_values();
        debug!(log_id = %self.id, added, total = self.entries.len(), "joined log");
        Ok(())
    }

    /// The entries in their deterministic total order.
    ///
    /// Cached until the next `append` or `join`.
    pub fn values(&self) -> Result<Vec<Entry>, LogError> {
        {
            let cache = self.values_cache.borrow();
            if let Some(values) = cache.as_ref() {
                return Ok(values.clone());
            }
        }
        let mut values = self.entries.slice();
        sort_entries(&mut values, &self.tiebreaker)?;
        *self.values_cache.borrow_mut() = Some(values.clone());
        Ok(values)
    }

    /// The serialized form: id plus head hashes, newest head first.
    pub fn to_head_list(&self) -> Result<HeadList, LogError> {
        let mut heads = self.heads.slice();
        sort_entries(&mut heads, &self.tiebreaker)?;
        heads.reverse();
        Ok(HeadList {
            id: self.id.clone(),
            heads: heads.iter().map(|e| *e.hash()).collect(),
        })
    }

    /// Publish the head list to the block store and return its address.
    pub async fn to_multihash(&self) -> Result<Multihash, LogError> {
        if self.entries.is_empty() {
            return Err(LogError::EmptyLog);
        }
        Ok(self.store.put_head_list(&self.to_head_list()?).await?)
    }

    /// Render the DAG as an indented tree, newest head first. Depth grows
    /// with distance from a head; parents follow `next` order. Debug aid.
    pub fn to_display(
        &self,
        formatter: Option<&dyn Fn(&Entry) -> String>,
    ) -> Result<String, LogError> {
        let mut heads = self.heads.slice();
        sort_entries(&mut heads, &self.tiebreaker)?;
        heads.reverse();

        let mut stack: Vec<(Multihash, usize)> =
            heads.iter().rev().map(|e| (*e.hash(), 0)).collect();
        let mut visited: HashSet<Multihash> = HashSet::new();
        let mut lines: Vec<String> = Vec::new();

        while let Some((hash, depth)) = stack.pop() {
            if !visited.insert(hash) {
                continue;
            }
            let Some(entry) = self.entries.get(&hash) else {
                continue;
            };
            let text = match formatter {
                Some(f) => f(entry),
                None => String::from_utf8_lossy(entry.payload()).into_owned(),
            };
            lines.push(format!("{}{}", "  ".repeat(depth), text));
            for parent in entry.next().iter().rev() {
                stack.push((*parent, depth + 1));
            }
        }
        Ok(lines.join("\n"))
    }

    // --- accessors ---

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn identity(&self) -> &OwnedIdentity {
        &self.identity
    }

    pub fn entries(&self) -> &OrderedEntryMap {
        &self.entries
    }

    pub fn heads(&self) -> &OrderedEntryMap {
        &self.heads
    }

    pub fn clock(&self) -> &LamportClock {
        &self.clock
    }

    pub fn tiebreaker(&self) -> &Tiebreaker {
        &self.tiebreaker
    }

    /// The last `amount` entries of the sorted log, newest first.
    fn tail_refs(&self, amount: usize) -> Result<Vec<Entry>, LogError> {
        let mut values = self.values()?;
        values.reverse();
        values.truncate(amount);
        Ok(values)
    }

    fn invalidate_values(&mut self) {
        *self.values_cache.borrow_mut() = None;
    }
}

impl std::fmt::Debug for Log {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Log")
            .field("id", &self.id)
            .field("entries", &self.entries.len())
            .field("heads", &self.heads.len())
            .field("clock", &self.clock)
            .field("tiebreaker", &self.tiebreaker)
            .finish_non_exhaustive()
    }
}

/// Entries no other entry in the set references through `next`.
pub(crate) fn find_heads(entries: &OrderedEntryMap) -> Vec<Entry> {
    let mut referenced: HashSet<Multihash> = HashSet::new();
    for entry in entries.iter() {
        for parent in entry.next() {
            referenced.insert(*parent);
        }
    }
    entries
        .iter()
        .filter(|e| !referenced.contains(e.hash()))
        .cloned()
        .collect()
}
