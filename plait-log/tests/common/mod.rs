//! Shared fixtures for the log scenario tests.
#![allow(dead_code)]

use std::sync::Arc;

use plait_log::{EntryStore, Log, LogOptions, MemoryBlockStore, OwnedIdentity};
use plait_model::entry::Entry;
use plait_model::keystore::Keystore;
use plait_model::MemoryKeystore;

/// Fresh in-memory entry store.
pub fn memory_store() -> EntryStore {
    EntryStore::new(Arc::new(MemoryBlockStore::new()))
}

/// `count` identities from one seeded keystore, returned in ascending
/// signing-key order.
///
/// Equal Lamport times are broken by author key bytes, so the fixtures
/// assign roles (author A, author B, ...) in key order — that makes the
/// documented interleavings (`A1,B1,A2,B2,...`) hold by construction
/// instead of by luck of key generation.
pub fn sorted_identities(count: usize) -> Vec<OwnedIdentity> {
    let keystore: Arc<dyn Keystore> = Arc::new(MemoryKeystore::with_seed([29u8; 32]));
    let mut identities: Vec<OwnedIdentity> = (0..count)
        .map(|i| OwnedIdentity::create(keystore.clone(), &format!("user{i}")).unwrap())
        .collect();
    identities.sort_by(|a, b| a.public_key().cmp(&b.public_key()));
    identities
}

/// Empty log with id "X".
pub fn new_log(store: &EntryStore, identity: &OwnedIdentity) -> Log {
    Log::new(
        store.clone(),
        identity.clone(),
        LogOptions {
            id: Some("X".to_string()),
            ..Default::default()
        },
    )
    .unwrap()
}

/// Payloads of `entries`, as strings.
pub fn payloads(entries: &[Entry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| String::from_utf8_lossy(e.payload()).into_owned())
        .collect()
}

/// `log.values()` payloads, as strings.
pub fn log_payloads(log: &Log) -> Vec<String> {
    payloads(&log.values().unwrap())
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// The sixteen-entry fixture used across the bounded-fetch scenarios.
///
/// Author A appends A1..A5, author B appends B1..B5; a third log joins
/// both; A appends A6..A10 on its own; the writer joins the merged view,
/// appends `entryC0` (Lamport time 6, tied with A6), then joins A's log.
/// Result: 16 entries, heads `{C0, A10}`.
///
/// `n_ptr` is the next-pointer amount used for every append: 1 gives sparse
/// single-parent chains, 64 gives dense multi-parent edges.
pub async fn partially_joined_log(store: &EntryStore, n_ptr: usize) -> Log {
    let ids = sorted_identities(4);
    let (a, b, writer, observer) = (&ids[0], &ids[1], &ids[2], &ids[3]);

    let mut log_a = new_log(store, a);
    let mut log_b = new_log(store, b);
    let mut merged = new_log(store, observer);
    let mut log = new_log(store, writer);

    for i in 1..=5 {
        log_a
            .append(format!("entryA{i}").as_bytes(), n_ptr)
            .await
            .unwrap();
        log_b
            .append(format!("entryB{i}").as_bytes(), n_ptr)
            .await
            .unwrap();
    }
    merged.join(&log_a, None).unwrap();
    merged.join(&log_b, None).unwrap();

    for i in 6..=10 {
        log_a
            .append(format!("entryA{i}").as_bytes(), n_ptr)
            .await
            .unwrap();
    }

    log.join(&merged, None).unwrap();
    log.append(b"entryC0", n_ptr).await.unwrap();
    log.join(&log_a, None).unwrap();
    log
}

/// The total order of the sixteen-entry fixture.
pub fn expected_sixteen() -> Vec<String> {
    strings(&[
        "entryA1", "entryB1", "entryA2", "entryB2", "entryA3", "entryB3", "entryA4", "entryB4",
        "entryA5", "entryB5", "entryA6", "entryC0", "entryA7", "entryA8", "entryA9", "entryA10",
    ])
}
