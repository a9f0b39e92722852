use chrono::{DateTime, Utc};

use crate::event::{Event, EventKind};
use crate::message::Message;

const JOIN: &str = "-->";
const LEAVE: &str = "<--";
const INFO: &str = "---";
const ACTION: &str = "*";

/// Translates one chat-session event into the messages it produces, in
/// delivery order. `now` stands in when the event carries no time.
pub fn translate(event: &Event, now: DateTime<Utc>) -> Vec<Message> {
    let time = event.time.unwrap_or(now);

    match &event.kind {
        EventKind::JoinComplete { channels, .. } | EventKind::PartComplete { channels, .. } => {
            vec![Message::channel_list(channels.iter().cloned())]
        }
        EventKind::ChannelMessage { channel, actor, text } => {
            vec![Message::event(time, channel, &actor.nick, text.clone())]
        }
        EventKind::PrivateMessage { .. } => Vec::new(),
        EventKind::ChannelAction { channel, nick, text } => {
            vec![Message::event(time, channel, ACTION, format!("{} {}", nick, text))]
        }
        EventKind::Join { channel, nick } => {
            vec![Message::event(time, channel, JOIN, format!("{} has joined", nick))]
        }
        EventKind::Part { channel, nick, reason } => {
            vec![Message::event(time, channel, LEAVE, format!("{} has left ({})", nick, reason))]
        }
        EventKind::Kick {
            channel,
            nick,
            by,
            reason,
        } => vec![Message::event(
            time,
            channel,
            LEAVE,
            format!("{} was kicked by {} ({})", nick, by, reason),
        )],
        EventKind::Quit { nick, reason, channels } => channels
            .iter()
            .map(|channel| Message::event(time, channel, LEAVE, format!("{} has quit ({})", nick, reason)))
            .collect(),
        EventKind::NickChange { old, new, channels } => channels
            .iter()
            .map(|channel| Message::event(time, channel, INFO, format!("{} is now known as {}", old, new)))
            .collect(),
        EventKind::Mode { channel, actor, modes } => {
            vec![Message::event(time, channel, INFO, format!("{} set mode {}", actor, modes))]
        }
        EventKind::Topic { channel, setter, topic } => vec![Message::event(
            time,
            channel,
            INFO,
            format!(
                "{} set topic to '{}'",
                setter.as_deref().unwrap_or("??"),
                topic.as_deref().unwrap_or("<none>")
            ),
        )],
    }
}
