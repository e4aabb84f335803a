use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    ApiError, ChatApi,
    types::{
        ApiResponse, BotCommand, ChatMember, ChatTarget, CommandScope, EditMessageText,
        GetChatAdministrators, GetUpdates, InlineKeyboard, Message, SendMessage, SetMyCommands,
        Update,
    },
};
use crate::store::UserId;

const PARSE_MODE: &str = "HTML";

const METHOD_GET_UPDATES: &str = "getUpdates";
const METHOD_SEND_MESSAGE: &str = "sendMessage";
const METHOD_EDIT_MESSAGE_TEXT: &str = "editMessageText";
const METHOD_SET_MY_COMMANDS: &str = "setMyCommands";
const METHOD_GET_CHAT_ADMINS: &str = "getChatAdministrators";

/// Bot API client over HTTPS with JSON bodies.
pub struct TelegramClient {
    client: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    /// `timeout` bounds every request, including long responses.
    pub fn new(api_url: &str, token: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: bot_base_url(api_url, token),
        })
    }

    async fn call<P, T>(&self, method: &'static str, params: &P) -> Result<T, ApiError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, method);
        let response: ApiResponse<T> = self
            .client
            .post(url)
            .json(params)
            .send()
            .await?
            .json()
            .await?;
        into_result(method, response)
    }
}

#[async_trait]
impl ChatApi for TelegramClient {
    async fn updates(&self, limit: u32, offset: i64) -> Result<Vec<Update>, ApiError> {
        let params = GetUpdates {
            offset: (offset != 0).then_some(offset),
            limit,
        };
        let raw: Vec<Value> = self.call(METHOD_GET_UPDATES, &params).await?;
        Ok(decode_updates(raw))
    }

    async fn send_message(
        &self,
        target: ChatTarget,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<Message, ApiError> {
        let params = SendMessage {
            chat_id: target.chat_id,
            message_thread_id: target.thread_id,
            text,
            parse_mode: PARSE_MODE,
            reply_markup: keyboard,
        };
        self.call(METHOD_SEND_MESSAGE, &params).await
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), ApiError> {
        let params = EditMessageText {
            chat_id,
            message_id,
            text,
            parse_mode: PARSE_MODE,
            reply_markup: keyboard,
        };
        // Answers with the edited message or `true`; neither is needed.
        let _: Value = self.call(METHOD_EDIT_MESSAGE_TEXT, &params).await?;
        Ok(())
    }

    async fn chat_admins(&self, chat_id: i64) -> Result<Vec<UserId>, ApiError> {
        let members: Vec<ChatMember> = self
            .call(METHOD_GET_CHAT_ADMINS, &GetChatAdministrators { chat_id })
            .await?;
        Ok(members.into_iter().map(|member| member.user.id).collect())
    }

    async fn set_commands(
        &self,
        scope: CommandScope,
        commands: &[BotCommand],
    ) -> Result<(), ApiError> {
        debug!(?scope, count = commands.len(), "registering command menu");
        let _: bool = self
            .call(METHOD_SET_MY_COMMANDS, &SetMyCommands { commands, scope })
            .await?;
        Ok(())
    }
}

fn bot_base_url(api_url: &str, token: &str) -> String {
    format!("{}/bot{}", api_url.trim_end_matches('/'), token)
}

/// Decodes each update on its own. An entry that does not match the known
/// shape keeps only its id, so it is still dispatched and the cursor moves
/// past it. Entries without a readable id are dropped.
fn decode_updates(raw: Vec<Value>) -> Vec<Update> {
    raw.into_iter()
        .filter_map(|value| match Update::deserialize(&value) {
            Ok(update) => Some(update),
            Err(err) => {
                let update_id = value.get("update_id").and_then(Value::as_i64);
                warn!(error = %err, ?update_id, "malformed update");
                update_id.map(|update_id| Update {
                    update_id,
                    message: None,
                    callback_query: None,
                })
            }
        })
        .collect()
}

fn into_result<T>(method: &'static str, response: ApiResponse<T>) -> Result<T, ApiError> {
    if !response.ok {
        return Err(ApiError::Api {
            code: response.error_code.unwrap_or_default(),
            description: response.description.unwrap_or_default(),
        });
    }
    response.result.ok_or(ApiError::MissingResult { method })
}
