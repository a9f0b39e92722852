use chrono::{DateTime, Utc};

/// Someone acting in the chat session. `account` is only known when the
/// server tags messages with the sender's account.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Actor {
    pub nick: String,
    pub account: Option<String>,
}

impl Actor {
    pub fn new(nick: &str, account: Option<&str>) -> Self {
        Self {
            nick: nick.to_owned(),
            account: account.map(ToOwned::to_owned),
        }
    }
}

/// Event delivered by the chat session. `time` is set when the server
/// asserted one.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub time: Option<DateTime<Utc>>,
    pub kind: EventKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EventKind {
    /// We finished joining `channel`; `channels` is our membership afterwards.
    JoinComplete { channel: String, channels: Vec<String> },
    /// We left or were removed from `channel`.
    PartComplete { channel: String, channels: Vec<String> },
    ChannelMessage { channel: String, actor: Actor, text: String },
    PrivateMessage { actor: Actor, text: String },
    ChannelAction { channel: String, nick: String, text: String },
    Join { channel: String, nick: String },
    Part { channel: String, nick: String, reason: String },
    Kick { channel: String, nick: String, by: String, reason: String },
    /// `channels` are the channels we shared with the user.
    Quit { nick: String, reason: String, channels: Vec<String> },
    NickChange { old: String, new: String, channels: Vec<String> },
    Mode { channel: String, actor: String, modes: String },
    Topic { channel: String, setter: Option<String>, topic: Option<String> },
}

impl Event {
    pub fn new(time: Option<DateTime<Utc>>, kind: EventKind) -> Self {
        Self { time, kind }
    }

    /// Text that may carry an administrative command, with who said it and
    /// the channel it was said in (`None` for a private message).
    pub fn command_input(&self) -> Option<(&Actor, Option<&str>, &str)> {
        match &self.kind {
            EventKind::ChannelMessage { channel, actor, text } => Some((actor, Some(channel), text)),
            EventKind::PrivateMessage { actor, text } => Some((actor, None, text)),
            _ => None,
        }
    }
}
