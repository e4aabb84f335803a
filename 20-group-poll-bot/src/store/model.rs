use serde::{Deserialize, Serialize};

/// Upstream user identity.
pub type UserId = i64;

/// Item identity minted by the store's sequence counter.
pub type ItemId = u64;

/// Sentinel vote meaning "no vote". Never minted as an item id.
pub const NO_VOTE: ItemId = 0;

/// A registered poll member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub vote: ItemId,
}

impl User {
    pub fn new(name: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            username: username.into(),
            vote: NO_VOTE,
        }
    }
}

/// A proposed item members can vote for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub added_by: UserId,
}

/// Pinned status message kept in sync with the live tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorRef {
    pub chat_id: i64,
    pub message_id: i64,
}

/// Sequence counter and monitor slot, persisted together as one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilState {
    #[serde(default)]
    pub id_cnt: ItemId,
    #[serde(default)]
    pub monitor: Option<MonitorRef>,
}

/// A user as listed in a tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voter {
    pub id: UserId,
    pub name: String,
    pub username: String,
}

impl Voter {
    pub(crate) fn from_user(id: UserId, user: &User) -> Self {
        Self {
            id,
            name: user.name.clone(),
            username: user.username.clone(),
        }
    }
}

/// Derived per-item standing. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTally {
    pub id: ItemId,
    pub name: String,
    pub votes: usize,
    /// Empty unless the tally was requested with voters.
    pub voters: Vec<Voter>,
    /// Creator record, resolved only when voters were requested and the creator is registered.
    pub added_by: Option<Voter>,
}
