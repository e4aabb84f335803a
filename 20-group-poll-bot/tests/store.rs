use std::{collections::BTreeSet, sync::Arc, thread};

use anyhow::Result;
use group_poll_bot::store::{
    ItemTally, JsonDir, MemorySnapshots, MonitorRef, NO_VOTE, Resource, StoreError, UserId,
    VotingStore,
};

fn memory_store() -> VotingStore {
    VotingStore::open(Box::new(MemorySnapshots::new())).expect("open store")
}

fn voter_ids(tally: &ItemTally) -> Vec<UserId> {
    tally.voters.iter().map(|voter| voter.id).collect()
}

#[test]
fn tally_ranks_items_and_lists_voters() -> Result<()> {
    let store = memory_store();
    for (id, name) in [(1, "U1"), (2, "U2"), (3, "U3")] {
        store.register(id, name, "")?;
    }
    let a = store.add_item(1, "A")?;
    let b = store.add_item(2, "B")?;

    store.vote(1, a)?;
    store.vote(2, b)?;
    store.vote(3, a)?;

    let tally = store.tally(true);
    assert_eq!(tally.len(), 2);
    assert_eq!((tally[0].name.as_str(), tally[0].votes), ("A", 2));
    assert_eq!(voter_ids(&tally[0]), vec![1, 3]);
    assert_eq!((tally[1].name.as_str(), tally[1].votes), ("B", 1));
    assert_eq!(voter_ids(&tally[1]), vec![2]);
    assert_eq!(tally[0].added_by.as_ref().map(|voter| voter.id), Some(1));
    Ok(())
}

#[test]
fn only_the_latest_vote_counts() -> Result<()> {
    let store = memory_store();
    store.register(1, "Ann", "ann")?;
    let a = store.add_item(1, "A")?;
    let b = store.add_item(1, "B")?;

    store.vote(1, a)?;
    store.vote(1, b)?;

    let tally = store.tally(true);
    assert_eq!(tally[0].id, b);
    assert_eq!(voter_ids(&tally[0]), vec![1]);
    assert_eq!(tally[1].votes, 0);
    assert_eq!(store.current_vote(1), b);
    Ok(())
}

#[test]
fn retracting_removes_the_voter() -> Result<()> {
    let store = memory_store();
    store.register(1, "Ann", "")?;
    let a = store.add_item(1, "A")?;

    store.vote(1, a)?;
    store.vote(1, NO_VOTE)?;

    let tally = store.tally(true);
    assert_eq!(tally[0].votes, 0);
    assert!(tally[0].voters.is_empty());
    assert_eq!(store.current_vote(1), NO_VOTE);
    Ok(())
}

#[test]
fn new_item_shows_up_empty() -> Result<()> {
    let store = memory_store();
    let id = store.add_item(5, "Heat")?;

    let tally = store.tally(true);
    assert_eq!(tally.len(), 1);
    assert_eq!(tally[0].id, id);
    assert_eq!(tally[0].votes, 0);
    assert!(tally[0].voters.is_empty());
    // The creator never registered.
    assert!(tally[0].added_by.is_none());
    Ok(())
}

#[test]
fn register_is_idempotent_and_keeps_first_profile() -> Result<()> {
    let store = memory_store();
    assert!(!store.register(1, "Ann", "ann")?);
    assert!(store.register(1, "Annie", "annie")?);

    let user = store.user(1).expect("registered");
    assert_eq!(user.name, "Ann");
    assert_eq!(user.username, "ann");
    Ok(())
}

#[test]
fn remove_drops_every_item_with_the_name() -> Result<()> {
    let store = memory_store();
    store.add_item(1, "X")?;
    store.add_item(1, "X")?;
    store.add_item(1, "Y")?;

    assert!(store.remove_item("X")?);
    let names: Vec<_> = store.tally(false).into_iter().map(|tally| tally.name).collect();
    assert_eq!(names, vec!["Y".to_string()]);

    assert!(!store.remove_item("Z")?);
    assert_eq!(store.tally(false).len(), 1);
    Ok(())
}

#[test]
fn votes_for_unknown_items_or_users_are_rejected() -> Result<()> {
    let store = memory_store();
    store.register(1, "Ann", "")?;
    let a = store.add_item(1, "A")?;

    let err = store.vote(1, a + 40).expect_err("unknown item");
    assert!(matches!(err, StoreError::UnknownItem(_)));
    assert!(err.is_rejection());

    let err = store.vote(99, a).expect_err("unknown user");
    assert!(matches!(err, StoreError::UnknownUser(99)));
    assert_eq!(store.tally(false)[0].votes, 0);
    Ok(())
}

#[test]
fn reset_clears_all_votes() -> Result<()> {
    let store = memory_store();
    let a = store.add_item(1, "A")?;
    for id in 1..=3 {
        store.register(id, "U", "")?;
        store.vote(id, a)?;
    }

    store.reset_votes()?;
    assert_eq!(store.tally(false)[0].votes, 0);
    assert!((1..=3).all(|id| store.current_vote(id) == NO_VOTE));
    Ok(())
}

#[test]
fn ties_are_ordered_by_item_id() -> Result<()> {
    let store = memory_store();
    let first = store.add_item(1, "Zulu")?;
    let second = store.add_item(1, "Alpha")?;

    let ids: Vec<_> = store.tally(false).into_iter().map(|tally| tally.id).collect();
    assert_eq!(ids, vec![first, second]);
    Ok(())
}

#[test]
fn concurrent_votes_are_all_counted() -> Result<()> {
    const VOTERS: UserId = 64;

    let store = Arc::new(memory_store());
    let item = store.add_item(1, "A")?;
    for id in 1..=VOTERS {
        store.register(id, "U", "")?;
    }

    let workers: Vec<_> = (1..=VOTERS)
        .map(|id| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.vote(id, item))
        })
        .collect();
    for worker in workers {
        worker.join().expect("voter thread")?;
    }

    let tally = store.tally(true);
    assert_eq!(tally[0].votes, VOTERS as usize);
    let unique: BTreeSet<_> = voter_ids(&tally[0]).into_iter().collect();
    assert_eq!(unique.len(), VOTERS as usize);
    Ok(())
}

#[test]
fn concurrent_ids_are_distinct_and_contiguous() {
    const CALLERS: u64 = 100;

    let store = Arc::new(memory_store());
    let workers: Vec<_> = (0..CALLERS)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.next_id())
        })
        .collect();

    let ids: BTreeSet<_> = workers
        .into_iter()
        .map(|worker| worker.join().expect("id thread"))
        .collect();
    assert_eq!(ids, (1..=CALLERS).collect::<BTreeSet<_>>());
}

#[test]
fn every_mutation_is_persisted() -> Result<()> {
    let snapshots = Arc::new(MemorySnapshots::new());
    let store = VotingStore::open(Box::new(Arc::clone(&snapshots)))?;

    store.register(1, "Ann", "")?;
    let a = store.add_item(1, "A")?;
    store.vote(1, a)?;
    store.vote(1, NO_VOTE)?;

    let users = snapshots.contents(Resource::Users).expect("users written");
    let users: serde_json::Value = serde_json::from_slice(&users)?;
    assert_eq!(users["1"]["vote"], 0);
    assert!(snapshots.contents(Resource::Items).is_some());
    assert!(snapshots.contents(Resource::Util).is_some());
    Ok(())
}

#[test]
fn state_survives_reopening_a_data_dir() -> Result<()> {
    let dir = tempfile::tempdir()?;

    let monitor = MonitorRef {
        chat_id: -100,
        message_id: 7,
    };
    let (a, b) = {
        let store = VotingStore::open(Box::new(JsonDir::open(dir.path())?))?;
        store.register(1, "Ann", "ann")?;
        let a = store.add_item(1, "A")?;
        let b = store.add_item(1, "B")?;
        store.vote(1, b)?;
        store.set_monitor(monitor)?;
        (a, b)
    };

    let store = VotingStore::open(Box::new(JsonDir::open(dir.path())?))?;
    assert_eq!(store.current_vote(1), b);
    assert_eq!(store.monitor(), Some(monitor));
    assert_eq!(store.tally(false)[0].id, b);
    assert_eq!(store.tally(false)[1].id, a);
    assert_eq!(store.next_id(), b + 1);
    Ok(())
}

#[test]
fn empty_data_dir_starts_empty() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = VotingStore::open(Box::new(JsonDir::open(dir.path().join("fresh"))?))?;

    assert!(store.tally(false).is_empty());
    assert!(store.monitor().is_none());
    assert_eq!(store.next_id(), 1);
    Ok(())
}
