use tracing::{debug, error, info, warn};

use super::{
    Bot,
    callback::{self, CallbackAction},
    command::{self, Command, Invocation},
};
use crate::{
    api::{CallbackQuery, ChatKind, ChatTarget, InlineButton, InlineKeyboard, Message, User},
    render,
    store::{self, MonitorRef, NO_VOTE},
};

impl Bot {
    pub(super) async fn on_message(&self, message: Message) {
        let Some(Invocation { command, args }) = command::parse(&message) else {
            debug!(message_id = message.message_id, "not a command");
            return;
        };
        let Some(from) = message.from.clone() else {
            warn!(message_id = message.message_id, "command without sender");
            return;
        };

        if command.is_admin_only() && !self.is_admin(from.id) {
            info!(user = from.id, command = command.token(), "admin command refused");
            self.reply(&message, render::NOT_ADMIN).await;
            return;
        }

        match command {
            Command::Start => self.start(&message, &from).await,
            Command::Help => {
                let text = render::help(self.is_admin(from.id));
                self.reply(&message, &text).await;
            }
            Command::Add => self.add(&message, &from, &args).await,
            Command::Status => self.status(&message, &from).await,
            Command::StatusFull => {
                let text = render::status_full(&self.store.tally(true));
                self.reply(&message, &text).await;
            }
            Command::Vote => self.vote_menu(&message, &from).await,
            Command::Monitor => self.monitor(&message).await,
            Command::Reboot => self.reboot(&message).await,
            Command::Remove => self.remove(&message, &args).await,
            Command::Reset => self.reset(&message).await,
        }
    }

    pub(super) async fn on_callback(&self, query: CallbackQuery) {
        let data = query.data.as_deref().unwrap_or_default();
        let item = match callback::parse(data) {
            Ok(CallbackAction::Vote(item)) => item,
            Err(err) => {
                warn!(error = %err, user = query.from.id, "ignoring callback");
                return;
            }
        };

        let result = self.store.vote(query.from.id, item);
        let text = match &result {
            Ok(()) => {
                info!(user = query.from.id, item, "vote recorded");
                render::vote_accepted()
            }
            Err(err) => {
                error!(error = %err, user = query.from.id, item, "vote failed");
                render::FAILED.to_string()
            }
        };
        self.changed(&result);

        let Some(message) = query.message else {
            debug!(user = query.from.id, "callback without message, nothing to edit");
            return;
        };
        if let Err(err) = self
            .api
            .edit_message(
                message.chat.id,
                message.message_id,
                &text,
                Some(&InlineKeyboard::empty()),
            )
            .await
        {
            error!(error = %err, chat_id = message.chat.id, "failed to answer vote");
        }
    }

    async fn start(&self, message: &Message, from: &User) {
        let text = match self.store.register(from.id, &from.first_name, from.handle()) {
            Ok(false) => {
                info!(user = from.id, name = %from.first_name, "user registered");
                render::WELCOME
            }
            Ok(true) => render::ALREADY_REGISTERED,
            Err(err) => {
                error!(error = %err, user = from.id, "failed to register user");
                render::FAILED
            }
        };
        self.reply(message, text).await;
    }

    async fn add(&self, message: &Message, from: &User, name: &str) {
        if name.is_empty() {
            self.reply(message, render::ADD_USAGE).await;
            return;
        }

        let result = self.store.add_item(from.id, name);
        self.changed(&result);
        match result {
            Ok(id) => {
                info!(id, name, user = from.id, "item added");
                self.reply(message, &render::item_added(name)).await;
            }
            Err(err) => {
                error!(error = %err, name, "failed to add item");
                self.reply(message, render::FAILED).await;
            }
        }
    }

    async fn status(&self, message: &Message, from: &User) {
        // Marking the caller's own vote would leak it in a group.
        let own_vote = if message.chat.kind == ChatKind::Private {
            self.store.current_vote(from.id)
        } else {
            NO_VOTE
        };
        let text = render::status(&self.store.tally(false), own_vote);
        self.reply(message, &text).await;
    }

    async fn vote_menu(&self, message: &Message, from: &User) {
        if self.store.user(from.id).is_none() {
            self.reply(message, render::NOT_REGISTERED).await;
            return;
        }

        let tallies = self.store.tally(false);
        if tallies.is_empty() {
            self.reply(message, render::NO_ITEMS).await;
            return;
        }

        let buttons = tallies
            .iter()
            .map(|tally| InlineButton {
                text: tally.name.clone(),
                callback_data: callback::vote_payload(tally.id),
            })
            .chain(std::iter::once(InlineButton {
                text: render::RETRACT_BUTTON.to_string(),
                callback_data: callback::vote_payload(NO_VOTE),
            }));
        let keyboard = InlineKeyboard::column(buttons);

        if let Err(err) = self
            .api
            .send_message(ChatTarget::chat(from.id), render::VOTE_PROMPT, Some(&keyboard))
            .await
        {
            error!(error = %err, user = from.id, "failed to send vote menu");
        }
    }

    async fn monitor(&self, message: &Message) {
        let text = render::status(&self.store.tally(false), NO_VOTE);
        let Some(sent) = self.reply(message, &text).await else {
            return;
        };

        let monitor = MonitorRef {
            chat_id: sent.chat.id,
            message_id: sent.message_id,
        };
        if let Err(err) = self.store.set_monitor(monitor) {
            error!(error = %err, "failed to save monitor");
        }
    }

    async fn reboot(&self, message: &Message) {
        if self.uptime() <= self.reboot_grace {
            self.reply(message, render::REBOOT_TOO_EARLY).await;
            return;
        }
        info!(uptime = ?self.uptime(), "reboot requested");
        self.reply(message, render::REBOOTING).await;
        self.shutdown.cancel();
    }

    async fn remove(&self, message: &Message, name: &str) {
        if name.is_empty() {
            self.reply(message, render::REMOVE_USAGE).await;
            return;
        }

        let result = self.store.remove_item(name);
        if !matches!(result, Ok(false)) {
            self.changed(&result);
        }
        let text = match result {
            Ok(true) => {
                info!(name, "item removed");
                render::item_removed(name)
            }
            Ok(false) => render::item_not_found(name),
            Err(err) => {
                error!(error = %err, name, "failed to remove item");
                render::FAILED.to_string()
            }
        };
        self.reply(message, &text).await;
    }

    async fn reset(&self, message: &Message) {
        let result = self.store.reset_votes();
        self.changed(&result);
        let text = match result {
            Ok(()) => {
                info!("votes reset");
                render::VOTES_RESET
            }
            Err(err) => {
                error!(error = %err, "failed to reset votes");
                render::FAILED
            }
        };
        self.reply(message, text).await;
    }

    /// Raises the monitor signal unless the store refused the mutation
    /// outright. A failed write still leaves the change applied in memory.
    fn changed<T>(&self, result: &store::Result<T>) {
        match result {
            Err(err) if err.is_rejection() => {}
            _ => self.monitor.raise(),
        }
    }

    /// Replies in the chat and thread of `message`. Send failures are logged.
    async fn reply(&self, message: &Message, text: &str) -> Option<Message> {
        match self
            .api
            .send_message(ChatTarget::reply_to(message), text, None)
            .await
        {
            Ok(sent) => Some(sent),
            Err(err) => {
                error!(error = %err, chat_id = message.chat.id, "failed to send message");
                None
            }
        }
    }
}
