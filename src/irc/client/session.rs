use chrono::{DateTime, Utc};
use log::{info, trace, warn};
use tokio::sync::Mutex;

use super::state::State;
use crate::error::{Error, Result};
use crate::event::{Actor, Event, EventKind};
use crate::irc::{
    message::{Message, Reply},
    transport::Transport,
};

const ACTION: &str = "\u{1}ACTION ";

pub fn is_channel(target: &str) -> bool {
    target.starts_with(|x| matches!(x, '#' | '&' | '+' | '!'))
}

fn arg(message: &Message, index: usize) -> Result<&str> {
    message
        .args
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| Error::Irc(format!("{} is missing argument {}", message.command, index)))
}

fn sender(message: &Message) -> Result<&str> {
    message
        .nick()
        .ok_or_else(|| Error::Irc(format!("{} has no prefix", message.command)))
}

/// Connection-level protocol handling: replies the server expects and the
/// bookkeeping behind the events.
pub struct Session {
    transport: Transport,
    state: Mutex<State>,
    channel: Option<String>,
}

impl Session {
    pub fn new(transport: Transport, nick: &str, channel: Option<String>) -> Self {
        Self {
            transport,
            state: Mutex::new(State::new(nick)),
            channel,
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub async fn channels(&self) -> Vec<String> {
        self.state.lock().await.channels()
    }

    pub async fn send(&self, command: &str, args: Vec<&str>) -> Result<()> {
        self.transport.send_message(&Message::new(None, command, args)).await
    }

    pub async fn register(&self, username: &str, password: Option<&str>) -> Result<()> {
        let nick = self.state.lock().await.nick().to_owned();

        self.send("CAP", vec!["REQ", "server-time account-tag"]).await?;
        if let Some(password) = password {
            self.send("PASS", vec![password]).await?;
        }
        self.send("NICK", vec![nick.as_str()]).await?;
        self.send("USER", vec![username, "0", "*", nick.as_str()]).await?;

        Ok(())
    }

    pub async fn handle_message(&self, message: &Message) -> Result<Vec<Event>> {
        let time = message
            .tag("time")
            .and_then(|x| DateTime::parse_from_rfc3339(x).ok())
            .map(|x| x.with_timezone(&Utc));
        let event = |kind: EventKind| Event::new(time, kind);

        let mut state = self.state.lock().await;

        Ok(match message.command.as_str() {
            "PING" => {
                drop(state);
                self.send("PONG", vec![message.args.first().map_or("", String::as_str)]).await?;

                Vec::new()
            }
            "CAP" => {
                drop(state);
                if matches!(arg(message, 1)?, "ACK" | "NAK") {
                    self.send("CAP", vec!["END"]).await?;
                }

                Vec::new()
            }
            Reply::RPL_WELCOME => {
                let nick = arg(message, 0)?;
                info!("Registered as {}", nick);
                state.set_nick(nick);

                Vec::new()
            }
            Reply::ERR_NICKNAMEINUSE => {
                let nick = format!("{}_", state.nick());
                warn!("Nick {} is taken, trying {}", state.nick(), nick);
                state.set_nick(&nick);
                drop(state);
                self.send("NICK", vec![nick.as_str()]).await?;

                Vec::new()
            }
            Reply::RPL_ENDOFMOTD | Reply::ERR_NOMOTD => {
                drop(state);
                if let Some(channel) = &self.channel {
                    self.send("JOIN", vec![channel.as_str()]).await?;
                }

                Vec::new()
            }
            Reply::RPL_NAMREPLY => {
                state.add_names(arg(message, 2)?, arg(message, 3)?);

                Vec::new()
            }
            "JOIN" => {
                let (nick, channel) = (sender(message)?, arg(message, 0)?);
                let join = event(EventKind::Join {
                    channel: channel.to_owned(),
                    nick: nick.to_owned(),
                });

                if state.is_me(nick) {
                    info!("Joined {}", channel);
                    state.joined(channel);
                    state.add_member(channel, nick);

                    vec![
                        join,
                        event(EventKind::JoinComplete {
                            channel: channel.to_owned(),
                            channels: state.channels(),
                        }),
                    ]
                } else {
                    state.add_member(channel, nick);

                    vec![join]
                }
            }
            "PART" => {
                let (nick, channel) = (sender(message)?, arg(message, 0)?);
                let part = event(EventKind::Part {
                    channel: channel.to_owned(),
                    nick: nick.to_owned(),
                    reason: message.args.get(1).cloned().unwrap_or_default(),
                });

                if state.is_me(nick) {
                    info!("Parted {}", channel);
                    state.parted(channel);

                    vec![
                        part,
                        event(EventKind::PartComplete {
                            channel: channel.to_owned(),
                            channels: state.channels(),
                        }),
                    ]
                } else {
                    state.remove_member(channel, nick);

                    vec![part]
                }
            }
            "KICK" => {
                let (by, channel, nick) = (sender(message)?, arg(message, 0)?, arg(message, 1)?);
                let kick = event(EventKind::Kick {
                    channel: channel.to_owned(),
                    nick: nick.to_owned(),
                    by: by.to_owned(),
                    reason: message.args.get(2).cloned().unwrap_or_default(),
                });

                if state.is_me(nick) {
                    warn!("Kicked from {} by {}", channel, by);
                    state.parted(channel);

                    vec![
                        kick,
                        event(EventKind::PartComplete {
                            channel: channel.to_owned(),
                            channels: state.channels(),
                        }),
                    ]
                } else {
                    state.remove_member(channel, nick);

                    vec![kick]
                }
            }
            "QUIT" => {
                let nick = sender(message)?;
                let channels = state.quit(nick);
                if channels.is_empty() {
                    return Ok(Vec::new());
                }

                vec![event(EventKind::Quit {
                    nick: nick.to_owned(),
                    reason: message.args.first().cloned().unwrap_or_default(),
                    channels,
                })]
            }
            "NICK" => {
                let (old, new) = (sender(message)?, arg(message, 0)?);
                let channels = state.rename(old, new);
                if channels.is_empty() {
                    return Ok(Vec::new());
                }

                vec![event(EventKind::NickChange {
                    old: old.to_owned(),
                    new: new.to_owned(),
                    channels,
                })]
            }
            "PRIVMSG" => {
                let (nick, target, text) = (sender(message)?, arg(message, 0)?, arg(message, 1)?);

                if let Some(action) = text.strip_prefix(ACTION) {
                    if !is_channel(target) {
                        return Ok(Vec::new());
                    }

                    vec![event(EventKind::ChannelAction {
                        channel: target.to_owned(),
                        nick: nick.to_owned(),
                        text: action.trim_end_matches('\u{1}').to_owned(),
                    })]
                } else if text.starts_with('\u{1}') {
                    trace!("Ignoring CTCP from {}", nick);

                    Vec::new()
                } else {
                    let actor = Actor::new(nick, message.tag("account"));

                    if is_channel(target) {
                        vec![event(EventKind::ChannelMessage {
                            channel: target.to_owned(),
                            actor,
                            text: text.to_owned(),
                        })]
                    } else {
                        vec![event(EventKind::PrivateMessage {
                            actor,
                            text: text.to_owned(),
                        })]
                    }
                }
            }
            "MODE" => {
                let (nick, target) = (sender(message)?, arg(message, 0)?);
                if !is_channel(target) {
                    return Ok(Vec::new());
                }

                vec![event(EventKind::Mode {
                    channel: target.to_owned(),
                    actor: nick.to_owned(),
                    modes: message.args[1..].join(" "),
                })]
            }
            "TOPIC" => {
                let channel = arg(message, 0)?;
                let topic = message.args.get(1).filter(|x| !x.is_empty()).cloned();

                vec![event(EventKind::Topic {
                    channel: channel.to_owned(),
                    setter: message.nick().map(ToOwned::to_owned),
                    topic,
                })]
            }
            _ => {
                trace!("Unhandled {}", message.command);

                Vec::new()
            }
        })
    }
}
