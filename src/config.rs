use std::{collections::HashSet, path::PathBuf, str::FromStr};

use clap::{App, Arg, ArgMatches};

use crate::error::{Error, Result};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IrcConfig {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub nick: String,
    pub username: String,
    pub password: Option<String>,
    pub channel: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub ws_port: u16,
    pub ws_tls: bool,
    pub keystore: PathBuf,
    pub irc: IrcConfig,
    pub accounts: HashSet<String>,
    pub command_prefix: char,
    pub debug: bool,
}

pub fn app<'a, 'b>() -> App<'a, 'b> {
    App::new("ircsockets")
        .version("0.1")
        .about("Relays IRC channel events to WebSocket subscribers")
        .arg(Arg::with_name("ws-port").long("ws-port").takes_value(true).default_value("8043"))
        .arg(Arg::with_name("irc-port").long("irc-port").takes_value(true).default_value("6667"))
        .arg(Arg::with_name("host").long("host").takes_value(true).required(true))
        .arg(Arg::with_name("username").long("username").takes_value(true))
        .arg(Arg::with_name("password").long("password").takes_value(true))
        .arg(Arg::with_name("nick").long("nick").takes_value(true).default_value("ircsockets"))
        .arg(Arg::with_name("debug").long("debug").short("d"))
        .arg(Arg::with_name("no-ws-ssl").long("no-ws-ssl"))
        .arg(Arg::with_name("no-irc-ssl").long("no-irc-ssl"))
        .arg(Arg::with_name("channel").long("channel").short("c").takes_value(true))
        .arg(
            Arg::with_name("user-account")
                .long("user-account")
                .short("u")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1),
        )
        .arg(Arg::with_name("keystore").long("keystore").takes_value(true).default_value("server.pem"))
        .arg(
            Arg::with_name("command-prefix")
                .long("command-prefix")
                .takes_value(true)
                .default_value("!"),
        )
}

fn parse<T: FromStr>(matches: &ArgMatches<'_>, name: &str) -> Result<T> {
    let value = matches.value_of(name).unwrap_or_default();

    value
        .parse()
        .map_err(|_| Error::Config(format!("invalid value '{}' for --{}", value, name)))
}

impl Config {
    pub fn from_matches(matches: &ArgMatches<'_>) -> Result<Self> {
        let nick = matches.value_of("nick").unwrap_or("ircsockets").to_owned();

        let irc = IrcConfig {
            host: matches
                .value_of("host")
                .ok_or_else(|| Error::Config("--host is required".into()))?
                .to_owned(),
            port: parse(matches, "irc-port")?,
            tls: !matches.is_present("no-irc-ssl"),
            username: matches.value_of("username").unwrap_or(&nick).to_owned(),
            password: matches.value_of("password").map(ToOwned::to_owned),
            channel: matches.value_of("channel").map(ToOwned::to_owned),
            nick,
        };

        let command_prefix = matches.value_of("command-prefix").unwrap_or("!");
        let mut chars = command_prefix.chars();
        let command_prefix = match (chars.next(), chars.next()) {
            (Some(x), None) => x,
            _ => return Err(Error::Config(format!("command prefix '{}' must be one character", command_prefix))),
        };

        Ok(Self {
            ws_port: parse(matches, "ws-port")?,
            ws_tls: !matches.is_present("no-ws-ssl"),
            keystore: PathBuf::from(matches.value_of("keystore").unwrap_or("server.pem")),
            irc,
            accounts: matches
                .values_of("user-account")
                .map(|values| values.map(ToOwned::to_owned).collect())
                .unwrap_or_default(),
            command_prefix,
            debug: matches.is_present("debug"),
        })
    }
}
