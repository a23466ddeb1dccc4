//! Total ordering over entries.
//!
//! The tiebreaker turns the DAG's partial order into a total order; because
//! it is computed purely from entry fields, replicas holding the same entry
//! set produce identical sequences. Swapping the tiebreaker on one replica
//! changes its `values()` — it is part of the log's configuration contract,
//! not a runtime knob.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use plait_model::entry::Entry;

/// Comparison function signature for custom tiebreakers.
pub type CompareFn = dyn Fn(&Entry, &Entry) -> Ordering + Send + Sync;

/// Strategy for ordering entries with equal DAG rank.
#[derive(Clone, Default)]
pub enum Tiebreaker {
    /// Higher Lamport time wins; ties broken by author key bytes.
    #[default]
    LastWriteWins,
    /// Lower Lamport time wins; ties broken by author key bytes.
    FirstWriteWins,
    /// Caller-supplied comparison. Must never return `Equal` for distinct
    /// entries; violations surface as [`SortError::ComparatorAmbiguous`].
    Custom(Arc<CompareFn>),
}

impl Tiebreaker {
    pub fn compare(&self, a: &Entry, b: &Entry) -> Ordering {
        match self {
            Tiebreaker::LastWriteWins => a.compare(b),
            Tiebreaker::FirstWriteWins => match b.clock().time.cmp(&a.clock().time) {
                Ordering::Equal => a.clock().id.cmp(&b.clock().id),
                other => other,
            },
            Tiebreaker::Custom(f) => f(a, b),
        }
    }

    /// Built-in tiebreakers get a hash fallback for true Lamport ties;
    /// custom ones are required to be total on their own.
    fn has_hash_fallback(&self) -> bool {
        !matches!(self, Tiebreaker::Custom(_))
    }
}

impl fmt::Debug for Tiebreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tiebreaker::LastWriteWins => f.write_str("LastWriteWins"),
            Tiebreaker::FirstWriteWins => f.write_str("FirstWriteWins"),
            Tiebreaker::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Sorting failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SortError {
    #[error("comparator returned equal for distinct entries")]
    ComparatorAmbiguous,
}

/// Stable-sort `entries` into the tiebreaker's total order.
///
/// Runs that compare equal while holding distinct hashes are ordered by hash
/// bytes for the built-in tiebreakers; with a custom comparator they are a
/// caller error.
pub fn sort_entries(entries: &mut [Entry], tiebreaker: &Tiebreaker) -> Result<(), SortError> {
    entries.sort_by(|a, b| tiebreaker.compare(a, b));

    let mut start = 0;
    while start < entries.len() {
        let mut end = start + 1;
        while end < entries.len()
            && tiebreaker.compare(&entries[start], &entries[end]) == Ordering::Equal
        {
            end += 1;
        }
        if end - start > 1 {
            let run = &mut entries[start..end];
            if run.iter().any(|e| e.hash() != run[0].hash()) {
                if !tiebreaker.has_hash_fallback() {
                    return Err(SortError::ComparatorAmbiguous);
                }
                run.sort_by(|a, b| a.hash().as_bytes().cmp(b.hash().as_bytes()));
            }
        }
        start = end;
    }
    Ok(())
}
