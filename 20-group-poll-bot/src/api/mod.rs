//! Capability the bot needs from the upstream messaging service.

mod telegram;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use telegram::TelegramClient;
pub use types::{
    BotCommand, CallbackQuery, Chat, ChatKind, ChatTarget, CommandScope, InlineButton,
    InlineKeyboard, Message, MessageEntity, Update, User,
};

use crate::store::UserId;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("api error {code}: {description}")]
    Api { code: i64, description: String },
    #[error("{method} answered ok without a result")]
    MissingResult { method: &'static str },
}

/// Remote calls the core depends on. Every call is fallible and carries its
/// own timeout; callers decide whether to retry.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Next batch of updates starting at `offset`, oldest first.
    async fn updates(&self, limit: u32, offset: i64) -> Result<Vec<Update>, ApiError>;

    async fn send_message(
        &self,
        target: ChatTarget,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<Message, ApiError>;

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), ApiError>;

    async fn chat_admins(&self, chat_id: i64) -> Result<Vec<UserId>, ApiError>;

    async fn set_commands(
        &self,
        scope: CommandScope,
        commands: &[BotCommand],
    ) -> Result<(), ApiError>;
}
