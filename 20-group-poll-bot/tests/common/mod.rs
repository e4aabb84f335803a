#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicI64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use group_poll_bot::{
    api::{
        ApiError, BotCommand, CallbackQuery, Chat, ChatApi, ChatKind, ChatTarget, CommandScope,
        InlineKeyboard, Message, MessageEntity, Update, User, types::ENTITY_BOT_COMMAND,
    },
    store::UserId,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub target: ChatTarget,
    pub text: String,
    pub keyboard: Option<InlineKeyboard>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edit {
    pub chat_id: i64,
    pub message_id: i64,
    pub text: String,
    pub keyboard: Option<InlineKeyboard>,
}

/// In-process stand-in for the upstream service. Update batches are served
/// in order, everything sent is recorded.
#[derive(Default)]
pub struct FakeApi {
    batches: Mutex<VecDeque<Vec<Update>>>,
    fail_fetch: AtomicBool,
    offsets: Mutex<Vec<i64>>,
    sent: Mutex<Vec<Sent>>,
    edits: Mutex<Vec<Edit>>,
    admins: Mutex<Vec<UserId>>,
    menus: Mutex<Vec<CommandScope>>,
    next_message_id: AtomicI64,
    on_batch: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_admins(admins: &[UserId]) -> Self {
        let api = Self::default();
        *api.admins.lock().unwrap() = admins.to_vec();
        api
    }

    pub fn push_batch(&self, batch: Vec<Update>) {
        self.batches.lock().unwrap().push_back(batch);
    }

    /// Runs `hook` every time a non-empty batch is handed out.
    pub fn on_batch(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_batch.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Offsets every fetch was made with, in call order.
    pub fn offsets(&self) -> Vec<i64> {
        self.offsets.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|sent| sent.text).collect()
    }

    pub fn edits(&self) -> Vec<Edit> {
        self.edits.lock().unwrap().clone()
    }

    pub fn menus(&self) -> Vec<CommandScope> {
        self.menus.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatApi for FakeApi {
    async fn updates(&self, _limit: u32, offset: i64) -> Result<Vec<Update>, ApiError> {
        self.offsets.lock().unwrap().push(offset);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ApiError::Api {
                code: 502,
                description: "Bad Gateway".into(),
            });
        }
        let batch = self.batches.lock().unwrap().pop_front().unwrap_or_default();
        if !batch.is_empty() {
            if let Some(hook) = self.on_batch.lock().unwrap().as_ref() {
                hook();
            }
        }
        Ok(batch)
    }

    async fn send_message(
        &self,
        target: ChatTarget,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<Message, ApiError> {
        self.sent.lock().unwrap().push(Sent {
            target,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1000;
        Ok(Message {
            message_id,
            from: None,
            chat: chat(target.chat_id),
            date: 0,
            message_thread_id: target.thread_id,
            text: Some(text.to_string()),
            entities: Vec::new(),
        })
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), ApiError> {
        self.edits.lock().unwrap().push(Edit {
            chat_id,
            message_id,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }

    async fn chat_admins(&self, _chat_id: i64) -> Result<Vec<UserId>, ApiError> {
        Ok(self.admins.lock().unwrap().clone())
    }

    async fn set_commands(
        &self,
        scope: CommandScope,
        _commands: &[BotCommand],
    ) -> Result<(), ApiError> {
        self.menus.lock().unwrap().push(scope);
        Ok(())
    }
}

/// Positive ids are private chats, negative ones groups.
pub fn chat(id: i64) -> Chat {
    Chat {
        id,
        kind: if id > 0 { ChatKind::Private } else { ChatKind::Group },
    }
}

pub fn user(id: UserId, name: &str) -> User {
    User {
        id,
        first_name: name.to_string(),
        username: Some(name.to_lowercase()),
    }
}

/// A message in `chat_id` whose leading `/word` is marked as a command.
pub fn command(update_id: i64, from: &User, chat_id: i64, text: &str) -> Update {
    let length = text
        .split_whitespace()
        .next()
        .map(|token| token.encode_utf16().count())
        .unwrap_or_default();
    Update {
        update_id,
        message: Some(Message {
            message_id: update_id,
            from: Some(from.clone()),
            chat: chat(chat_id),
            date: 1_700_000_000,
            message_thread_id: None,
            text: Some(text.to_string()),
            entities: vec![MessageEntity {
                kind: ENTITY_BOT_COMMAND.to_string(),
                offset: 0,
                length,
            }],
        }),
        callback_query: None,
    }
}

/// A button press on message `message_id` in `from`'s private chat.
pub fn press(update_id: i64, from: &User, message_id: i64, data: &str) -> Update {
    Update {
        update_id,
        message: None,
        callback_query: Some(CallbackQuery {
            id: format!("cb-{update_id}"),
            from: from.clone(),
            data: Some(data.to_string()),
            message: Some(Message {
                message_id,
                from: None,
                chat: chat(from.id),
                date: 0,
                message_thread_id: None,
                text: None,
                entities: Vec::new(),
            }),
        }),
    }
}

/// An update the bot has no handler for.
pub fn bare(update_id: i64) -> Update {
    Update {
        update_id,
        message: None,
        callback_query: None,
    }
}

/// Polls `condition` until it holds or `limit` elapses.
pub async fn eventually(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
