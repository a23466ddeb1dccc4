//! Plait Log
//!
//! The log engine: an append-only CRDT whose entries form a signed,
//! content-addressed DAG. Logs on disjoint replicas merge deterministically:
//! any two replicas observing the same entries compute the same sequence.
//!
//! - [`Log`]: append, join, materialize, serialize
//! - [`fetch`]: bounded concurrent traversal from a head set
//! - [`sorting`]: the total order and its tiebreakers
//! - [`OrderedEntryMap`]: insertion-ordered entry set keyed by hash

pub mod fetch;
pub mod log;
pub mod ordered_map;
pub mod sorting;

pub use fetch::{fetch_all, fetch_parallel, FetchOptions, FetchResult, DEFAULT_CONCURRENCY};
pub use log::{Log, LogError, LogOptions};
pub use ordered_map::OrderedEntryMap;
pub use sorting::{sort_entries, SortError, Tiebreaker};

pub use plait_model::{
    Entry, HeadList, Identity, LamportClock, Multihash, OwnedIdentity, PubKey,
};
pub use plait_store::{BlockStore, EntryStore, MemoryBlockStore};
