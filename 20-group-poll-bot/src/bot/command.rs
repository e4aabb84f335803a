use crate::api::{BotCommand, CommandScope, Message, types::ENTITY_BOT_COMMAND};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Add,
    Status,
    StatusFull,
    Vote,
    Monitor,
    Reboot,
    Remove,
    Reset,
}

impl Command {
    pub fn from_token(token: &str) -> Option<Self> {
        let command = match token {
            "start" => Command::Start,
            "help" => Command::Help,
            "add" => Command::Add,
            "status" => Command::Status,
            "status_full" => Command::StatusFull,
            "vote" => Command::Vote,
            "monitor" => Command::Monitor,
            "reboot" => Command::Reboot,
            "remove" => Command::Remove,
            "reset" => Command::Reset,
            _ => return None,
        };
        Some(command)
    }

    pub fn token(self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::Add => "add",
            Command::Status => "status",
            Command::StatusFull => "status_full",
            Command::Vote => "vote",
            Command::Monitor => "monitor",
            Command::Reboot => "reboot",
            Command::Remove => "remove",
            Command::Reset => "reset",
        }
    }

    pub fn is_admin_only(self) -> bool {
        matches!(
            self,
            Command::Monitor | Command::Reboot | Command::Remove | Command::Reset
        )
    }

    fn description(self) -> &'static str {
        match self {
            Command::Start => "Register",
            Command::Help => "Help",
            Command::Add => "Add an item to the list",
            Command::Status => "Show the list of items",
            Command::StatusFull => "Show items with voters",
            Command::Vote => "Vote for an item",
            Command::Monitor => "😈 Live-updating /status message",
            Command::Reboot => "😈 Restart the bot",
            Command::Remove => "😈 Remove an item from the list",
            Command::Reset => "😈 Reset ALL votes",
        }
    }
}

/// A recognised command and the trimmed text following it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    pub args: String,
}

/// Extracts the first command entity of `message`. Unknown commands,
/// plain text and entities pointing outside the text yield `None`.
pub fn parse(message: &Message) -> Option<Invocation> {
    let text = message.text.as_deref()?;
    let entity = message
        .entities
        .iter()
        .find(|entity| entity.kind == ENTITY_BOT_COMMAND && entity.length > 0)?;

    // Entity offsets count UTF-16 code units.
    let units: Vec<u16> = text.encode_utf16().collect();
    let end = entity.offset.checked_add(entity.length)?;
    let raw = units.get(entity.offset..end)?;
    let rest = units.get(end..)?;

    let raw = String::from_utf16_lossy(raw);
    let token = raw.strip_prefix('/').unwrap_or(&raw);
    let token = token.split('@').next().unwrap_or_default();

    Some(Invocation {
        command: Command::from_token(token)?,
        args: String::from_utf16_lossy(rest).trim().to_string(),
    })
}

/// Command menus registered per scope at startup.
pub fn menus() -> Vec<(CommandScope, Vec<BotCommand>)> {
    use Command::*;

    let menu = |commands: &[Command]| -> Vec<BotCommand> {
        commands
            .iter()
            .map(|command| BotCommand {
                command: command.token().to_string(),
                description: command.description().to_string(),
            })
            .collect()
    };

    vec![
        (
            CommandScope::AllPrivateChats,
            menu(&[Status, Vote, Add, StatusFull, Help]),
        ),
        (
            CommandScope::AllGroupChats,
            menu(&[Status, Add, StatusFull, Help]),
        ),
        (
            CommandScope::AllChatAdministrators,
            menu(&[Status, Add, StatusFull, Help, Remove, Reset, Monitor]),
        ),
    ]
}
