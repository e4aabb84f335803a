//! HTML message bodies for status views and replies.

use std::fmt::Write as _;

use rand::seq::SliceRandom;

use crate::store::{ItemId, ItemTally, Voter};

pub const NO_ITEMS: &str = "No items yet 💀";
pub const WELCOME: &str = "<b>Welcome to the club, buddy</b> 🍑👋";
pub const ALREADY_REGISTERED: &str = "You are already registered.";
pub const NOT_REGISTERED: &str = "Send /start first to register.";
pub const ADD_USAGE: &str =
    "Invalid item name 🤡\n<span class=\"tg-spoiler\">Usage: /add The Green Elephant 2</span>";
pub const REMOVE_USAGE: &str = "Usage: /remove The Green Elephant 2";
pub const NOT_ADMIN: &str = "Shoo 😡";
pub const VOTES_RESET: &str = "All votes have been reset.";
pub const VOTE_PROMPT: &str = "🤔🤔🤔🤔";
pub const FAILED: &str = "Something went wrong";
pub const REBOOTING: &str = "Restarting…";
pub const REBOOT_TOO_EARLY: &str = "Just started, try again in a few seconds.";
pub const RETRACT_BUTTON: &str = "❌";

pub const HELP: &str = "<b>I am the poll bot.</b>

/status - list items and votes
/vote - vote for an item (in private chat)
/add The Green Elephant 2 - add an item
/status_full - list items with voters

/start - register (required once!)
/help - this help";

pub const ADMIN_HELP: &str = "

<b>Admin commands</b> 😈:
/remove The Green Elephant 2 - remove an item
/monitor - live-updating status message (only the latest one is kept)
/reset - reset ALL votes
/reboot - restart the bot";

const MARKER_OWN_VOTE: &str = " 💋";
const VOTE_EMOJIS: &[&str] = &["🫡", "🤯", "💩", "🤡", "👍", "👎", "😡", "🤓", "🌚", "🔥"];

pub fn help(is_admin: bool) -> String {
    if is_admin {
        format!("{HELP}{ADMIN_HELP}")
    } else {
        HELP.to_string()
    }
}

pub fn item_added(name: &str) -> String {
    format!("\"{}\" added to the list 📋✍️", escape(name))
}

pub fn item_removed(name: &str) -> String {
    format!("\"{}\" removed", escape(name))
}

pub fn item_not_found(name: &str) -> String {
    format!("\"{}\" wasn't found", escape(name))
}

pub fn vote_accepted() -> String {
    let emoji = VOTE_EMOJIS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or_default();
    format!("Great choice {emoji}")
}

/// Compact ranking, one line per item. `own_vote` gets a marker when non-zero.
pub fn status(tallies: &[ItemTally], own_vote: ItemId) -> String {
    if tallies.is_empty() {
        return NO_ITEMS.to_string();
    }

    let podium = Podium::of(tallies);
    let mut text = String::new();
    for (rank, tally) in tallies.iter().enumerate() {
        let marker = if own_vote != 0 && tally.id == own_vote {
            MARKER_OWN_VOTE
        } else {
            ""
        };
        let _ = writeln!(
            text,
            "{}<b>{}</b>: {}{}",
            podium.medal(rank),
            escape(&tally.name),
            tally.votes,
            marker
        );
    }
    text
}

/// Ranking with creator and voter names, expects tallies built with voters.
pub fn status_full(tallies: &[ItemTally]) -> String {
    if tallies.is_empty() {
        return NO_ITEMS.to_string();
    }

    let mut text = String::new();
    for tally in tallies {
        let creator = tally
            .added_by
            .as_ref()
            .map_or_else(|| "someone".to_string(), profile_link);
        let _ = writeln!(
            text,
            "🔸 <b>{}</b> by {} - {}:",
            escape(&tally.name),
            creator,
            tally.votes
        );
        for voter in &tally.voters {
            let _ = writeln!(text, "{}", profile_link(voter));
        }
    }
    text
}

fn profile_link(voter: &Voter) -> String {
    if voter.username.is_empty() {
        escape(&voter.name)
    } else {
        format!(
            "<a href=\"https://t.me/{}\">{}</a>",
            escape(&voter.username),
            escape(&voter.name)
        )
    }
}

/// Escapes text for HTML parse mode.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// How many leading entries share first and second place in a sorted tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Podium {
    first: usize,
    second: usize,
}

impl Podium {
    const MAX_SHARED: usize = 3;

    fn of(tallies: &[ItemTally]) -> Self {
        let Some(top) = tallies.first().map(|tally| tally.votes).filter(|&votes| votes > 0) else {
            return Self { first: 0, second: 0 };
        };

        let first = tallies.iter().take_while(|tally| tally.votes == top).count();
        let second = match tallies.get(first).map(|tally| tally.votes) {
            Some(runner_up) if runner_up > 0 => tallies[first..]
                .iter()
                .take_while(|tally| tally.votes == runner_up)
                .count(),
            _ => 0,
        };
        Self { first, second }
    }

    fn medal(&self, rank: usize) -> &'static str {
        if self.first > Self::MAX_SHARED {
            return "";
        }
        if rank < self.first {
            return if self.first == 1 { "🏆 " } else { "🥇 " };
        }
        if rank < self.first + self.second && self.second <= Self::MAX_SHARED {
            return "🥈 ";
        }
        ""
    }
}
