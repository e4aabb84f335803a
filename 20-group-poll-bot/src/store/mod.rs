//! Authoritative poll state: users, items, votes and the monitor slot.
//!
//! Each resource class sits behind its own reader/writer lock and is mirrored
//! to its own snapshot. Locks are always acquired in the order util, items,
//! users; only `vote` holds two at once (items read, then users write).
//!
//! Every successful mutation persists the snapshot of the class it touched
//! while still holding that class's write lock, so snapshots are written in
//! mutation order. A failed write is reported but the in-memory change stays
//! applied until the next successful write of that class.

mod model;
mod persist;

use std::{
    collections::{BTreeMap, HashMap},
    io,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, error};

pub use model::{ItemId, Item, ItemTally, MonitorRef, NO_VOTE, User, UserId, UtilState, Voter};
pub use persist::{JsonDir, MemorySnapshots, Resource, Snapshots};

type Users = BTreeMap<UserId, User>;
type Items = BTreeMap<ItemId, Item>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no registered user with id {0}")]
    UnknownUser(UserId),
    #[error("no item with id {0}")]
    UnknownItem(ItemId),
    #[error("item name cannot be empty")]
    EmptyName,
    #[error("failed to load {resource} snapshot")]
    Load {
        resource: Resource,
        #[source]
        source: io::Error,
    },
    #[error("{resource} snapshot is corrupt")]
    Corrupt {
        resource: Resource,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode {resource} snapshot")]
    Encode {
        resource: Resource,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {resource} snapshot")]
    Persist {
        resource: Resource,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// True for errors raised before any state was touched.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            StoreError::UnknownUser(_) | StoreError::UnknownItem(_) | StoreError::EmptyName
        )
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

pub struct VotingStore {
    users: RwLock<Users>,
    items: RwLock<Items>,
    util: RwLock<UtilState>,
    snapshots: Box<dyn Snapshots>,
}

impl VotingStore {
    /// Loads all three snapshots. A snapshot that was never written starts empty.
    pub fn open(snapshots: Box<dyn Snapshots>) -> Result<Self> {
        let users: Users = load(snapshots.as_ref(), Resource::Users)?;
        let items: Items = load(snapshots.as_ref(), Resource::Items)?;
        let mut util: UtilState = load(snapshots.as_ref(), Resource::Util)?;

        // Never mint an id below one that is already in use.
        if let Some(&max) = items.keys().next_back() {
            util.id_cnt = util.id_cnt.max(max);
        }

        debug!(
            users = users.len(),
            items = items.len(),
            id_cnt = util.id_cnt,
            "voting store loaded"
        );

        Ok(Self {
            users: RwLock::new(users),
            items: RwLock::new(items),
            util: RwLock::new(util),
            snapshots,
        })
    }

    /// Registers a user. Returns `true` when the user already existed, in
    /// which case nothing is changed or written.
    pub fn register(&self, id: UserId, name: &str, username: &str) -> Result<bool> {
        if read(&self.users).contains_key(&id) {
            return Ok(true);
        }

        let mut users = write(&self.users);
        if users.contains_key(&id) {
            return Ok(true);
        }
        users.insert(id, User::new(name, username));
        self.persist(Resource::Users, &*users)?;
        Ok(false)
    }

    /// Adds an item under a freshly minted id.
    pub fn add_item(&self, creator: UserId, name: &str) -> Result<ItemId> {
        if name.trim().is_empty() {
            return Err(StoreError::EmptyName);
        }

        let id = self.next_id();
        let mut items = write(&self.items);
        items.insert(
            id,
            Item {
                name: name.to_string(),
                added_by: creator,
            },
        );
        self.persist(Resource::Items, &*items)?;
        Ok(id)
    }

    /// Removes every item named exactly `name`. Returns whether any matched.
    pub fn remove_item(&self, name: &str) -> Result<bool> {
        let mut items = write(&self.items);
        let before = items.len();
        items.retain(|_, item| item.name != name);
        if items.len() == before {
            return Ok(false);
        }
        self.persist(Resource::Items, &*items)?;
        Ok(true)
    }

    /// Records `user`'s vote, replacing any earlier one. `NO_VOTE` retracts.
    ///
    /// The items lock is held across the user write so a concurrent removal
    /// cannot slip between the existence check and the vote.
    pub fn vote(&self, user: UserId, item: ItemId) -> Result<()> {
        let items = read(&self.items);
        if item != NO_VOTE && !items.contains_key(&item) {
            return Err(StoreError::UnknownItem(item));
        }

        let mut users = write(&self.users);
        let record = users.get_mut(&user).ok_or(StoreError::UnknownUser(user))?;
        record.vote = item;
        self.persist(Resource::Users, &*users)
    }

    /// Clears every user's vote in one pass.
    pub fn reset_votes(&self) -> Result<()> {
        let mut users = write(&self.users);
        for user in users.values_mut() {
            user.vote = NO_VOTE;
        }
        self.persist(Resource::Users, &*users)
    }

    /// Per-item standings, most votes first, ties by item id ascending.
    ///
    /// Items and users are read under separate locks, so a concurrent write
    /// may land between the two passes.
    pub fn tally(&self, with_voters: bool) -> Vec<ItemTally> {
        let (mut tallies, creators): (Vec<ItemTally>, Vec<UserId>) = read(&self.items)
            .iter()
            .map(|(&id, item)| {
                let tally = ItemTally {
                    id,
                    name: item.name.clone(),
                    votes: 0,
                    voters: Vec::new(),
                    added_by: None,
                };
                (tally, item.added_by)
            })
            .unzip();

        if tallies.is_empty() {
            return tallies;
        }

        let index: HashMap<ItemId, usize> = tallies
            .iter()
            .enumerate()
            .map(|(position, tally)| (tally.id, position))
            .collect();

        {
            let users = read(&self.users);
            for (&user_id, user) in users.iter() {
                let Some(&position) = index.get(&user.vote) else {
                    continue;
                };
                let tally = &mut tallies[position];
                tally.votes += 1;
                if with_voters {
                    tally.voters.push(Voter::from_user(user_id, user));
                }
            }

            if with_voters {
                for (tally, creator) in tallies.iter_mut().zip(&creators) {
                    tally.added_by = users.get(creator).map(|user| Voter::from_user(*creator, user));
                }
            }
        }

        tallies.sort_by(|a, b| b.votes.cmp(&a.votes));
        tallies
    }

    pub fn user(&self, id: UserId) -> Option<User> {
        read(&self.users).get(&id).cloned()
    }

    /// Current vote of `user`, `NO_VOTE` when absent or unregistered.
    pub fn current_vote(&self, user: UserId) -> ItemId {
        read(&self.users).get(&user).map_or(NO_VOTE, |user| user.vote)
    }

    pub fn set_monitor(&self, monitor: MonitorRef) -> Result<()> {
        debug!(chat_id = monitor.chat_id, message_id = monitor.message_id, "set monitor");
        let mut util = write(&self.util);
        util.monitor = Some(monitor);
        self.persist(Resource::Util, &*util)
    }

    pub fn monitor(&self) -> Option<MonitorRef> {
        read(&self.util).monitor
    }

    /// Mints the next item id. The increment is never lost: a failed write
    /// is logged and the in-memory counter keeps advancing.
    pub fn next_id(&self) -> ItemId {
        let mut util = write(&self.util);
        util.id_cnt += 1;
        let id = util.id_cnt;
        if let Err(err) = self.persist(Resource::Util, &*util) {
            error!(error = ?err, id, "sequence counter not persisted");
        }
        id
    }

    fn persist<T: Serialize>(&self, resource: Resource, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|source| StoreError::Encode { resource, source })?;
        self.snapshots
            .save(resource, &bytes)
            .map_err(|source| StoreError::Persist { resource, source })
    }
}

fn load<T: DeserializeOwned + Default>(snapshots: &dyn Snapshots, resource: Resource) -> Result<T> {
    let bytes = snapshots
        .load(resource)
        .map_err(|source| StoreError::Load { resource, source })?;
    match bytes {
        Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => serde_json::from_slice(&bytes)
            .map_err(|source| StoreError::Corrupt { resource, source }),
        _ => Ok(T::default()),
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
