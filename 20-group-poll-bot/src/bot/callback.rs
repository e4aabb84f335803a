use crate::store::ItemId;

const VOTE_PREFIX: &str = "vote:";

/// Button payload for voting on `item`; `NO_VOTE` encodes a retraction.
pub fn vote_payload(item: ItemId) -> String {
    format!("{VOTE_PREFIX}{item}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Vote(ItemId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallbackError {
    #[error("unrecognised callback payload {0:?}")]
    Unknown(String),
    #[error("invalid item id in callback payload {0:?}")]
    BadItem(String),
}

pub fn parse(data: &str) -> Result<CallbackAction, CallbackError> {
    let Some(raw) = data.strip_prefix(VOTE_PREFIX) else {
        return Err(CallbackError::Unknown(data.to_string()));
    };
    raw.parse::<ItemId>()
        .map(CallbackAction::Vote)
        .map_err(|_| CallbackError::BadItem(data.to_string()))
}
