//! Bounded, concurrent DAG traversal.
//!
//! [`fetch_all`] walks breadth-first from a head set over one shared FIFO
//! queue and stops once `length` new entries have been fetched.
//! [`fetch_parallel`] runs one such walk per root with the full budget and
//! unites the results in root order. Both keep at most `concurrency` block
//! fetches in flight behind a shared semaphore, and both are deterministic:
//! in-flight results are applied in dequeue order, so concurrency never
//! changes the outcome.
//!
//! Per-edge failures never abort a traversal. A missing or invalid parent
//! prunes that edge; transient store errors are retried a bounded number of
//! times; timeout and cancellation return the entries collected so far.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use plait_model::entry::Entry;
use plait_model::types::Multihash;
use plait_store::{EntryStore, StoreError};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::ordered_map::OrderedEntryMap;

/// Default number of in-flight block fetches.
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Attempts per hash before a transient failure prunes the edge.
const MAX_FETCH_ATTEMPTS: u32 = 3;

/// Predicate deciding whether a hash should be skipped outright.
pub type ExcludePredicate = dyn Fn(&Multihash) -> bool + Send + Sync;

/// Traversal options.
#[derive(Clone)]
pub struct FetchOptions {
    /// Stop after this many newly fetched entries (`None` = everything
    /// reachable). The caller trims to a sorted tail afterwards.
    pub length: Option<usize>,
    /// Entries already held locally: seeded into the result, never
    /// refetched or counted, but their edges extend the traversal.
    pub exclude: Vec<Entry>,
    /// Maximum in-flight block fetches.
    pub concurrency: usize,
    /// Wall-clock budget for the whole traversal.
    pub timeout: Option<Duration>,
    /// Receives every newly fetched entry as it arrives.
    pub progress: Option<mpsc::UnboundedSender<Entry>>,
    /// Cooperative cancellation; a cancelled fetch returns what it has.
    pub cancel: Option<CancellationToken>,
    /// Hashes to prune without fetching.
    pub should_exclude: Option<Arc<ExcludePredicate>>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            length: None,
            exclude: Vec::new(),
            concurrency: DEFAULT_CONCURRENCY,
            timeout: None,
            progress: None,
            cancel: None,
            should_exclude: None,
        }
    }
}

impl FetchOptions {
    /// Options bounded to `length` fetched entries.
    pub fn with_length(length: usize) -> Self {
        Self {
            length: Some(length),
            ..Self::default()
        }
    }
}

impl std::fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOptions")
            .field("length", &self.length)
            .field("exclude", &self.exclude.len())
            .field("concurrency", &self.concurrency)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Outcome of a traversal. A timeout is a soft condition: the entries
/// gathered before the deadline are returned with `timed_out` set.
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    pub entries: OrderedEntryMap,
    pub timed_out: bool,
}

/// Breadth-first traversal from `roots` over one shared FIFO queue.
pub async fn fetch_all(
    store: &EntryStore,
    roots: &[Multihash],
    opts: &FetchOptions,
) -> FetchResult {
    let permits = Arc::new(Semaphore::new(opts.concurrency.max(1)));
    fetch_from(store, roots, opts, permits).await
}

/// One bounded traversal per root, united in root order.
///
/// Each root receives the full `length` budget; the union is a superset of
/// any tail the caller will trim to, which is what reconstructing shared
/// ancestry from several heads requires.
pub async fn fetch_parallel(
    store: &EntryStore,
    roots: &[Multihash],
    opts: &FetchOptions,
) -> FetchResult {
    if roots.len() <= 1 {
        return fetch_all(store, roots, opts).await;
    }

    let permits = Arc::new(Semaphore::new(opts.concurrency.max(1)));
    let mut tasks = JoinSet::new();
    for (index, root) in roots.iter().enumerate() {
        let store = store.clone();
        let opts = opts.clone();
        let permits = permits.clone();
        let root = *root;
        tasks.spawn(async move { (index, fetch_from(&store, &[root], &opts, permits).await) });
    }

    let mut per_root: Vec<Option<FetchResult>> = (0..roots.len()).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => per_root[index] = Some(result),
            Err(err) => warn!("fetch task failed: {err}"),
        }
    }

    let mut entries = OrderedEntryMap::new();
    let mut timed_out = false;
    for result in per_root.into_iter().flatten() {
        timed_out |= result.timed_out;
        entries.merge(result.entries);
    }
    FetchResult { entries, timed_out }
}

async fn fetch_from(
    store: &EntryStore,
    roots: &[Multihash],
    opts: &FetchOptions,
    permits: Arc<Semaphore>,
) -> FetchResult {
    let deadline = opts.timeout.map(|t| Instant::now() + t);
    let wave_width = opts.concurrency.max(1);

    // Result accumulator, pre-seeded with the entries we already hold.
    let mut known = OrderedEntryMap::new();
    for entry in &opts.exclude {
        known.add(entry.clone());
    }

    let mut expanded: HashSet<Multihash> = HashSet::new();
    let mut queued: HashSet<Multihash> = HashSet::new();
    let mut queue: VecDeque<Multihash> = VecDeque::new();
    for hash in roots {
        if queued.insert(*hash) {
            queue.push_back(*hash);
        }
    }

    let mut fetched = 0usize;
    let mut timed_out = false;

    'traversal: while !queue.is_empty() {
        if let Some(token) = &opts.cancel {
            if token.is_cancelled() {
                debug!(fetched, "fetch cancelled, returning partial result");
                break;
            }
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                timed_out = true;
                break;
            }
        }

        let mut wave: Vec<Multihash> = Vec::with_capacity(wave_width);
        while wave.len() < wave_width {
            match queue.pop_front() {
                Some(hash) => wave.push(hash),
                None => break,
            }
        }

        // Fetch the unknown part of the wave concurrently.
        let mut tasks = JoinSet::new();
        for hash in wave.iter().copied() {
            if known.contains(&hash) || should_skip(opts, &hash) {
                continue;
            }
            let store = store.clone();
            let permits = permits.clone();
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.expect("semaphore closed");
                let outcome = fetch_one(&store, &hash, deadline).await;
                (hash, outcome)
            });
        }
        let mut arrived: HashMap<Multihash, Entry> = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((hash, Fetched::Entry(entry))) => {
                    arrived.insert(hash, entry);
                }
                Ok((_, Fetched::Pruned)) => {}
                Ok((_, Fetched::DeadlineHit)) => timed_out = true,
                Err(err) => warn!("fetch task failed: {err}"),
            }
        }

        // Apply in dequeue order so the walk stays deterministic under
        // concurrency; entries past the budget are discarded.
        for hash in wave {
            if should_skip(opts, &hash) {
                continue;
            }
            let entry = if let Some(existing) = known.get(&hash).cloned() {
                existing
            } else if let Some(entry) = arrived.remove(&hash) {
                if let Some(progress) = &opts.progress {
                    let _ = progress.send(entry.clone());
                }
                known.add(entry.clone());
                fetched += 1;
                entry
            } else {
                continue;
            };

            if expanded.insert(hash) {
                for parent in entry.next() {
                    if queued.insert(*parent) {
                        queue.push_back(*parent);
                    }
                }
            }

            if let Some(budget) = opts.length {
                if fetched >= budget {
                    break 'traversal;
                }
            }
        }
    }

    debug!(fetched, total = known.len(), timed_out, "fetch finished");
    FetchResult {
        entries: known,
        timed_out,
    }
}

fn should_skip(opts: &FetchOptions, hash: &Multihash) -> bool {
    opts.should_exclude
        .as_ref()
        .map(|pred| pred(hash))
        .unwrap_or(false)
}

/// Outcome of a single-hash fetch.
enum Fetched {
    Entry(Entry),
    /// Missing, invalid or persistently failing — the edge is dropped.
    Pruned,
    /// The traversal deadline expired while this fetch was in flight.
    DeadlineHit,
}

/// Fetch a single entry, retrying transient store errors a bounded number
/// of times. A pruned edge means the referenced parent is simply absent
/// from the result.
async fn fetch_one(store: &EntryStore, hash: &Multihash, deadline: Option<Instant>) -> Fetched {
    for attempt in 1..=MAX_FETCH_ATTEMPTS {
        let request = store.get_entry(hash);
        let outcome = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, request).await {
                Ok(outcome) => outcome,
                Err(_) => return Fetched::DeadlineHit,
            },
            None => request.await,
        };
        match outcome {
            Ok(entry) => return Fetched::Entry(entry),
            Err(err @ StoreError::Unavailable(_)) if attempt < MAX_FETCH_ATTEMPTS => {
                warn!(%hash, attempt, "transient store error, retrying: {err}");
            }
            Err(err) => {
                warn!(%hash, "pruning edge: {err}");
                return Fetched::Pruned;
            }
        }
    }
    Fetched::Pruned
}
