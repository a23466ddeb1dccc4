//! Reconstructing logs from published heads: bounded fetch windows,
//! ancestry reconstruction, and deterministic interleaving.

mod common;

use common::*;
use plait_log::{FetchOptions, Log, LogError, LogOptions};
use plait_model::entry::Entry;
use plait_model::LamportClock;

fn bounded(length: usize) -> FetchOptions {
    FetchOptions::with_length(length)
}

// ---------------------------------------------------------------------------
// from_multihash: bounded windows over the sixteen-entry fixture
// ---------------------------------------------------------------------------

#[tokio::test]
async fn from_multihash_windows_single_next_pointer() {
    let store = memory_store();
    let log = partially_joined_log(&store, 1).await;
    let ids = sorted_identities(4);
    let hash = log.to_multihash().await.unwrap();

    let first5 = Log::from_multihash(
        store.clone(),
        ids[2].clone(),
        &hash,
        LogOptions::default(),
        &bounded(5),
    )
    .await
    .unwrap();
    assert_eq!(
        log_payloads(&first5),
        strings(&["entryA5", "entryB5", "entryC0", "entryA9", "entryA10"])
    );

    let first11 = Log::from_multihash(
        store.clone(),
        ids[2].clone(),
        &hash,
        LogOptions::default(),
        &bounded(11),
    )
    .await
    .unwrap();
    assert_eq!(
        log_payloads(&first11),
        strings(&[
            "entryA3", "entryB3", "entryA4", "entryB4", "entryA5", "entryB5", "entryC0",
            "entryA7", "entryA8", "entryA9", "entryA10",
        ])
    );

    // all but one: everything except the deepest B entry
    let first15 = Log::from_multihash(
        store,
        ids[2].clone(),
        &hash,
        LogOptions::default(),
        &bounded(15),
    )
    .await
    .unwrap();
    assert_eq!(
        log_payloads(&first15),
        strings(&[
            "entryA1", "entryA2", "entryB2", "entryA3", "entryB3", "entryA4", "entryB4",
            "entryA5", "entryB5", "entryA6", "entryC0", "entryA7", "entryA8", "entryA9",
            "entryA10",
        ])
    );
}

#[tokio::test]
async fn from_multihash_windows_multiple_next_pointers() {
    let store = memory_store();
    let log = partially_joined_log(&store, 64).await;
    let ids = sorted_identities(4);
    let hash = log.to_multihash().await.unwrap();

    // denser edges reach the newest entries with fewer hops
    let first5 = Log::from_multihash(
        store.clone(),
        ids[2].clone(),
        &hash,
        LogOptions::default(),
        &bounded(5),
    )
    .await
    .unwrap();
    assert_eq!(
        log_payloads(&first5),
        strings(&["entryC0", "entryA7", "entryA8", "entryA9", "entryA10"])
    );

    let first11 = Log::from_multihash(
        store.clone(),
        ids[2].clone(),
        &hash,
        LogOptions::default(),
        &bounded(11),
    )
    .await
    .unwrap();
    assert_eq!(
        log_payloads(&first11),
        strings(&[
            "entryA1", "entryA2", "entryA3", "entryA4", "entryA5", "entryA6", "entryC0",
            "entryA7", "entryA8", "entryA9", "entryA10",
        ])
    );

    let first15 = Log::from_multihash(
        store,
        ids[2].clone(),
        &hash,
        LogOptions::default(),
        &bounded(15),
    )
    .await
    .unwrap();
    assert_eq!(
        log_payloads(&first15),
        strings(&[
            "entryA1", "entryA2", "entryB2", "entryA3", "entryB3", "entryA4", "entryB4",
            "entryA5", "entryB5", "entryA6", "entryC0", "entryA7", "entryA8", "entryA9",
            "entryA10",
        ])
    );
}

#[tokio::test]
async fn from_multihash_unbounded_recovers_everything() {
    let store = memory_store();
    let log = partially_joined_log(&store, 1).await;
    let ids = sorted_identities(4);
    let hash = log.to_multihash().await.unwrap();

    let replica = Log::from_multihash(
        store,
        ids[3].clone(),
        &hash,
        LogOptions::default(),
        &FetchOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(replica.id(), "X");
    assert_eq!(log_payloads(&replica), expected_sixteen());
    assert_eq!(replica.heads().len(), 2);
}

// ---------------------------------------------------------------------------
// from_entry: sources stay in the window
// ---------------------------------------------------------------------------

#[tokio::test]
async fn from_entry_keeps_the_original_heads() {
    let store = memory_store();
    let log = partially_joined_log(&store, 1).await;
    let ids = sorted_identities(4);
    let heads = log.heads().slice();

    let two = Log::from_entry(
        store.clone(),
        ids[0].clone(),
        &heads,
        LogOptions::default(),
        &bounded(heads.len()),
    )
    .await
    .unwrap();
    assert_eq!(log_payloads(&two), strings(&["entryC0", "entryA10"]));

    let four = Log::from_entry(
        store.clone(),
        ids[0].clone(),
        &heads,
        LogOptions::default(),
        &bounded(4),
    )
    .await
    .unwrap();
    assert_eq!(
        log_payloads(&four),
        strings(&["entryC0", "entryA8", "entryA9", "entryA10"])
    );

    let seven = Log::from_entry(
        store,
        ids[0].clone(),
        &heads,
        LogOptions::default(),
        &bounded(7),
    )
    .await
    .unwrap();
    assert_eq!(
        log_payloads(&seven),
        strings(&[
            "entryB5", "entryA6", "entryC0", "entryA7", "entryA8", "entryA9", "entryA10",
        ])
    );
}

#[tokio::test]
async fn from_entry_requires_sources() {
    let store = memory_store();
    let ids = sorted_identities(1);
    let result = Log::from_entry(
        store,
        ids[0].clone(),
        &[],
        LogOptions::default(),
        &FetchOptions::default(),
    )
    .await;
    assert!(matches!(result, Err(LogError::InvalidArgument(_))));
}

// ---------------------------------------------------------------------------
// Three interlinked author chains (A_i ← B_i ← C_i per round)
// ---------------------------------------------------------------------------

struct Chains {
    items1: Vec<Entry>,
    items2: Vec<Entry>,
    items3: Vec<Entry>,
}

/// Build `amount` rounds of three chained authors without clock choreography:
/// every B entry links the round's A entry, every C entry links both.
async fn build_chains(store: &plait_log::EntryStore, amount: usize) -> Chains {
    let ids = sorted_identities(3);
    let (a, b, c) = (&ids[0], &ids[1], &ids[2]);
    let mut chains = Chains {
        items1: Vec::new(),
        items2: Vec::new(),
        items3: Vec::new(),
    };

    for i in 1..=amount {
        let parents1: Vec<Entry> = chains.items1.last().cloned().into_iter().collect();
        let n1 = Entry::create(a, "X", format!("entryA{i}").as_bytes(), &parents1, None).unwrap();

        let mut parents2: Vec<Entry> = chains.items2.last().cloned().into_iter().collect();
        parents2.push(n1.clone());
        let n2 = Entry::create(b, "X", format!("entryB{i}").as_bytes(), &parents2, None).unwrap();

        let mut parents3: Vec<Entry> = chains.items3.last().cloned().into_iter().collect();
        parents3.push(n1.clone());
        parents3.push(n2.clone());
        let n3 = Entry::create(c, "X", format!("entryC{i}").as_bytes(), &parents3, None).unwrap();

        for entry in [&n1, &n2, &n3] {
            store.put_entry(entry).await.unwrap();
        }
        chains.items1.push(n1);
        chains.items2.push(n2);
        chains.items3.push(n3);
    }
    chains
}

#[tokio::test]
async fn from_entry_retrieves_partial_chains() {
    let store = memory_store();
    let chains = build_chains(&store, 100).await;
    let ids = sorted_identities(3);

    let ten = Log::from_entry(
        store.clone(),
        ids[0].clone(),
        std::slice::from_ref(chains.items1.last().unwrap()),
        LogOptions::default(),
        &bounded(10),
    )
    .await
    .unwrap();
    assert_eq!(ten.values().unwrap().len(), 10);

    let fortytwo = Log::from_entry(
        store,
        ids[0].clone(),
        std::slice::from_ref(chains.items1.last().unwrap()),
        LogOptions::default(),
        &bounded(42),
    )
    .await
    .unwrap();
    assert_eq!(fortytwo.values().unwrap().len(), 42);
}

#[tokio::test]
async fn from_entry_retrieves_full_chains() {
    let store = memory_store();
    let amount = 100;
    let chains = build_chains(&store, amount).await;
    let ids = sorted_identities(3);

    let log_a = Log::from_entry(
        store.clone(),
        ids[0].clone(),
        std::slice::from_ref(chains.items1.last().unwrap()),
        LogOptions::default(),
        &bounded(amount),
    )
    .await
    .unwrap();
    assert_eq!(log_a.values().unwrap().len(), amount);

    let log_b = Log::from_entry(
        store.clone(),
        ids[1].clone(),
        std::slice::from_ref(chains.items2.last().unwrap()),
        LogOptions::default(),
        &bounded(amount * 2),
    )
    .await
    .unwrap();
    assert_eq!(log_b.values().unwrap().len(), amount * 2);

    let log_c = Log::from_entry(
        store,
        ids[2].clone(),
        std::slice::from_ref(chains.items3.last().unwrap()),
        LogOptions::default(),
        &bounded(amount * 3),
    )
    .await
    .unwrap();
    assert_eq!(log_c.values().unwrap().len(), amount * 3);
}

#[tokio::test]
async fn from_entry_includes_excluded_entries() {
    let store = memory_store();
    let chains = build_chains(&store, 50).await;
    let ids = sorted_identities(3);

    // excluding already-held entries neither drops them nor blocks traversal
    let mut opts = FetchOptions::default();
    opts.exclude = vec![chains.items1[0].clone()];
    let one = Log::from_entry(
        store.clone(),
        ids[0].clone(),
        std::slice::from_ref(chains.items1.last().unwrap()),
        LogOptions::default(),
        &opts,
    )
    .await
    .unwrap();
    assert_eq!(one.values().unwrap().len(), 50);
    assert_eq!(one.values().unwrap()[0].hash(), chains.items1[0].hash());

    let mut opts = FetchOptions::default();
    opts.exclude = chains.items1.clone();
    let all = Log::from_entry(
        store,
        ids[0].clone(),
        std::slice::from_ref(chains.items1.last().unwrap()),
        LogOptions::default(),
        &opts,
    )
    .await
    .unwrap();
    assert_eq!(all.values().unwrap().len(), 50);
    assert_eq!(all.values().unwrap()[0].hash(), chains.items1[0].hash());
}

// ---------------------------------------------------------------------------
// Clock-choreographed three-party interleave
// ---------------------------------------------------------------------------

/// Build `amount` rounds where all three authors tick before writing and
/// merge everyone's clock after, so round `i` carries Lamport time `i` for
/// A, B and C alike.
async fn build_synced_chains(store: &plait_log::EntryStore, amount: usize) -> Chains {
    let ids = sorted_identities(3);
    let (a, b, c) = (&ids[0], &ids[1], &ids[2]);
    let mut clock1 = LamportClock::new(a.public_key(), 0);
    let mut clock2 = LamportClock::new(b.public_key(), 0);
    let mut clock3 = LamportClock::new(c.public_key(), 0);

    let mut chains = Chains {
        items1: Vec::new(),
        items2: Vec::new(),
        items3: Vec::new(),
    };

    for i in 1..=amount {
        clock1.tick();
        clock2.tick();
        clock3.tick();

        let parents1: Vec<Entry> = chains.items1.last().cloned().into_iter().collect();
        let n1 = Entry::create(
            a,
            "X",
            format!("entryA{i}").as_bytes(),
            &parents1,
            Some(clock1),
        )
        .unwrap();

        let mut parents2: Vec<Entry> = chains.items2.last().cloned().into_iter().collect();
        parents2.push(n1.clone());
        let n2 = Entry::create(
            b,
            "X",
            format!("entryB{i}").as_bytes(),
            &parents2,
            Some(clock2),
        )
        .unwrap();

        let mut parents3: Vec<Entry> = chains.items3.last().cloned().into_iter().collect();
        parents3.push(n1.clone());
        parents3.push(n2.clone());
        let n3 = Entry::create(
            c,
            "X",
            format!("entryC{i}").as_bytes(),
            &parents3,
            Some(clock3),
        )
        .unwrap();

        clock1.merge(&clock2);
        clock1.merge(&clock3);
        clock2.merge(&clock1);
        clock2.merge(&clock3);
        clock3.merge(&clock1);
        clock3.merge(&clock2);

        for entry in [&n1, &n2, &n3] {
            store.put_entry(entry).await.unwrap();
        }
        chains.items1.push(n1);
        chains.items2.push(n2);
        chains.items3.push(n3);
    }
    chains
}

#[tokio::test]
async fn three_party_interleave_is_deterministic() {
    let store = memory_store();
    let amount = 10;
    let chains = build_synced_chains(&store, amount).await;
    let ids = sorted_identities(3);

    let log_a = Log::from_entry(
        store.clone(),
        ids[0].clone(),
        std::slice::from_ref(chains.items1.last().unwrap()),
        LogOptions::default(),
        &bounded(amount),
    )
    .await
    .unwrap();
    assert_eq!(log_a.values().unwrap().len(), amount);

    // B's tail reaches exactly the A/B interleave
    let log_b = Log::from_entry(
        store.clone(),
        ids[1].clone(),
        std::slice::from_ref(chains.items2.last().unwrap()),
        LogOptions::default(),
        &bounded(amount * 2),
    )
    .await
    .unwrap();
    let mut expected_b = Vec::new();
    for i in 1..=amount {
        expected_b.push(format!("entryA{i}"));
        expected_b.push(format!("entryB{i}"));
    }
    assert_eq!(log_payloads(&log_b), expected_b);

    // C's tail reaches everything; appending extends the ordered view
    let mut log_c = Log::from_entry(
        store,
        ids[2].clone(),
        std::slice::from_ref(chains.items3.last().unwrap()),
        LogOptions::default(),
        &bounded(amount * 3),
    )
    .await
    .unwrap();
    log_c.append(b"EOF", 1).await.unwrap();

    let mut expected_c = Vec::new();
    for i in 1..=amount {
        expected_c.push(format!("entryA{i}"));
        expected_c.push(format!("entryB{i}"));
        expected_c.push(format!("entryC{i}"));
    }
    expected_c.push("EOF".to_string());
    assert_eq!(log_payloads(&log_c), expected_c);
}

// ---------------------------------------------------------------------------
// from_entry_hash / from_json
// ---------------------------------------------------------------------------

#[tokio::test]
async fn from_entry_hash_halves_rejoin() {
    let store = memory_store();
    let log = partially_joined_log(&store, 1).await;
    let ids = sorted_identities(4);
    let list = log.to_head_list().unwrap();
    assert_eq!(list.heads.len(), 2);

    let mut half1 = Log::from_entry_hash(
        store.clone(),
        ids[0].clone(),
        &list.heads[..1],
        LogOptions {
            id: Some("X".to_string()),
            ..Default::default()
        },
        &FetchOptions::default(),
    )
    .await
    .unwrap();
    let half2 = Log::from_entry_hash(
        store,
        ids[0].clone(),
        &list.heads[1..],
        LogOptions {
            id: Some("X".to_string()),
            ..Default::default()
        },
        &FetchOptions::default(),
    )
    .await
    .unwrap();

    half1.join(&half2, None).unwrap();
    assert_eq!(half1.values().unwrap().len(), 16);
    assert_eq!(log_payloads(&half1), expected_sixteen());
}

#[tokio::test]
async fn from_json_rebuilds_the_log() {
    let store = memory_store();
    let log = partially_joined_log(&store, 1).await;
    let ids = sorted_identities(4);
    let list = log.to_head_list().unwrap();

    let replica = Log::from_json(
        store,
        ids[0].clone(),
        list,
        LogOptions::default(),
        &FetchOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(replica.id(), "X");
    assert_eq!(log_payloads(&replica), expected_sixteen());
}
