use std::collections::{BTreeMap, HashSet};

// mode prefixes a names reply puts in front of a nick
const MEMBER_PREFIXES: &[char] = &['~', '&', '@', '%', '+'];

/// What the session knows about itself: current nick, joined channels and
/// who else is in them.
pub struct State {
    nick: String,
    channels: BTreeMap<String, HashSet<String>>,
}

impl State {
    pub fn new(nick: &str) -> Self {
        Self {
            nick: nick.to_owned(),
            channels: BTreeMap::new(),
        }
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn set_nick(&mut self, nick: &str) {
        self.nick = nick.to_owned();
    }

    pub fn is_me(&self, nick: &str) -> bool {
        self.nick == nick
    }

    pub fn channels(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    pub fn joined(&mut self, channel: &str) {
        self.channels.entry(channel.to_owned()).or_default();
    }

    pub fn parted(&mut self, channel: &str) {
        self.channels.remove(channel);
    }

    pub fn add_member(&mut self, channel: &str, nick: &str) {
        if let Some(members) = self.channels.get_mut(channel) {
            members.insert(nick.to_owned());
        }
    }

    pub fn remove_member(&mut self, channel: &str, nick: &str) {
        if let Some(members) = self.channels.get_mut(channel) {
            members.remove(nick);
        }
    }

    pub fn add_names(&mut self, channel: &str, names: &str) {
        if let Some(members) = self.channels.get_mut(channel) {
            members.extend(
                names
                    .split(' ')
                    .map(|x| x.trim_start_matches(MEMBER_PREFIXES))
                    .filter(|x| !x.is_empty())
                    .map(ToOwned::to_owned),
            );
        }
    }

    /// Drops `nick` everywhere and returns the channels it was in.
    pub fn quit(&mut self, nick: &str) -> Vec<String> {
        self.channels
            .iter_mut()
            .filter_map(|(channel, members)| if members.remove(nick) { Some(channel.clone()) } else { None })
            .collect()
    }

    /// Renames `old` everywhere and returns the channels it was in.
    pub fn rename(&mut self, old: &str, new: &str) -> Vec<String> {
        if self.is_me(old) {
            self.set_nick(new);
        }

        self.channels
            .iter_mut()
            .filter_map(|(channel, members)| {
                if members.remove(old) {
                    members.insert(new.to_owned());
                    Some(channel.clone())
                } else {
                    None
                }
            })
            .collect()
    }
}
