use std::fmt;

use crate::error::{Error, Result};

// works as string enum
#[allow(non_camel_case_types)]
#[allow(non_snake_case)]
pub mod Reply {
    pub const RPL_WELCOME: &str = "001";
    pub const RPL_NAMREPLY: &str = "353";
    pub const RPL_ENDOFMOTD: &str = "376";
    pub const ERR_NOMOTD: &str = "422";
    pub const ERR_NICKNAMEINUSE: &str = "433";
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub enum Prefix {
    Server(String),
    User(String),
}

impl Prefix {
    pub fn from_raw(raw: String) -> Self {
        if raw.contains('.') && !(raw.contains('!') && raw.contains('@')) {
            Self::Server(raw)
        } else {
            Self::User(raw)
        }
    }

    pub fn raw(&self) -> &str {
        match self {
            Self::Server(x) => x,
            Self::User(x) => x,
        }
    }

    /// Nick for a user prefix, the whole name for a server.
    pub fn name(&self) -> &str {
        match self {
            Self::Server(x) => x,
            Self::User(x) => x.split('!').next().unwrap_or(x),
        }
    }
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub struct Message {
    pub tags: Vec<(String, Option<String>)>,
    pub prefix: Option<Prefix>,
    pub command: String,
    pub args: Vec<String>,
}

impl Message {
    pub fn new(prefix: Option<Prefix>, command: &str, args: Vec<&str>) -> Self {
        let command = command.to_owned();
        let args = args.into_iter().map(|x| x.to_owned()).collect::<Vec<_>>();

        Self {
            tags: Vec::new(),
            prefix,
            command,
            args,
        }
    }

    pub fn from_raw(raw: &str) -> Result<Self> {
        let mut rest = raw.trim_end_matches(|x| x == '\r' || x == '\n');

        let tags = match rest.strip_prefix('@') {
            Some(x) => {
                let (tags, remaining) = split_word(x);
                rest = remaining;
                parse_tags(tags)
            }
            None => Vec::new(),
        };

        let prefix = match rest.strip_prefix(':') {
            Some(x) => {
                let (prefix, remaining) = split_word(x);
                rest = remaining;
                Some(Prefix::from_raw(prefix.into()))
            }
            None => None,
        };

        let (command, mut rest) = split_word(rest);
        if command.is_empty() {
            return Err(Error::Irc(format!("no command in '{}'", raw.trim_end())));
        }

        let mut args = Vec::new();
        while !rest.is_empty() {
            if let Some(trailing) = rest.strip_prefix(':') {
                args.push(trailing.to_owned());
                break;
            }

            let (arg, remaining) = split_word(rest);
            args.push(arg.to_owned());
            rest = remaining;
        }

        Ok(Self {
            tags,
            prefix,
            command: command.to_owned(),
            args,
        })
    }

    pub fn raw(&self) -> String {
        let mut line = String::new();

        if let Some(x) = &self.prefix {
            line.push(':');
            line.push_str(x.raw());
            line.push(' ');
        }
        line.push_str(&self.command);

        let last = self.args.len().saturating_sub(1);
        for (i, arg) in self.args.iter().enumerate() {
            line.push(' ');
            if i == last && (arg.is_empty() || arg.contains(' ') || arg.starts_with(':')) {
                line.push(':');
            }
            line.push_str(arg);
        }
        line.push_str("\r\n");

        line
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn nick(&self) -> Option<&str> {
        self.prefix.as_ref().map(Prefix::name)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw().trim_matches(|x: char| x.is_control()))
    }
}

fn split_word(raw: &str) -> (&str, &str) {
    let raw = raw.trim_start_matches(' ');

    match raw.split_once(' ') {
        Some((word, rest)) => (word, rest.trim_start_matches(' ')),
        None => (raw, ""),
    }
}

fn parse_tags(raw: &str) -> Vec<(String, Option<String>)> {
    raw.split(';')
        .filter(|x| !x.is_empty())
        .map(|item| match item.split_once('=') {
            Some((key, value)) => (key.to_owned(), Some(unescape_tag(value))),
            None => (item.to_owned(), None),
        })
        .collect()
}

fn unescape_tag(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => result.push(';'),
            Some('s') => result.push(' '),
            Some('r') => result.push('\r'),
            Some('n') => result.push('\n'),
            Some(x) => result.push(x),
            None => {}
        }
    }

    result
}
