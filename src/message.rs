use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;

const TYPE_KEY: &str = "_type";
const STATUS_KEY: &str = "_status";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kind {
    ChannelList,
    Event,
    Error,
}

impl Kind {
    // error replies go out as "unknown", clients key on _status instead
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChannelList => "channel_list",
            Self::Event => "event",
            Self::Error => "unknown",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    Ok,
    Error,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// Outgoing relay message. Immutable once built; every variant serializes
/// through the same envelope so routing never needs to know the kind.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    ChannelList {
        channels: Vec<String>,
    },
    Event {
        time: DateTime<Local>,
        channel: String,
        prefix: String,
        message: String,
    },
    Error {
        message: String,
    },
}

#[derive(Serialize)]
struct ChannelListPayload<'a> {
    channels: &'a [String],
}

#[derive(Serialize)]
struct EventPayload<'a> {
    time: String,
    channel: &'a str,
    prefix: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorPayload<'a> {
    error_msg: &'a str,
}

impl Message {
    pub fn channel_list<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ChannelList {
            channels: channels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn event(time: DateTime<Utc>, channel: &str, prefix: &str, message: String) -> Self {
        Self::Event {
            time: time.with_timezone(&Local),
            channel: channel.to_owned(),
            prefix: prefix.to_owned(),
            message,
        }
    }

    pub fn error(message: &str) -> Self {
        Self::Error { message: message.to_owned() }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Self::ChannelList { .. } => Kind::ChannelList,
            Self::Event { .. } => Kind::Event,
            Self::Error { .. } => Kind::Error,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Error { .. } => Status::Error,
            _ => Status::Ok,
        }
    }

    /// Channel this message is scoped to. `None` means broadcast.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Event { channel, .. } => Some(channel),
            _ => None,
        }
    }

    /// The kind-specific fields, without the envelope keys.
    pub fn render(&self) -> Result<Map<String, Value>> {
        let value = match self {
            Self::ChannelList { channels } => serde_json::to_value(ChannelListPayload { channels })?,
            Self::Event {
                time,
                channel,
                prefix,
                message,
            } => serde_json::to_value(EventPayload {
                time: time.format("%H:%M:%S%.f").to_string(),
                channel,
                prefix,
                message,
            })?,
            Self::Error { message } => serde_json::to_value(ErrorPayload { error_msg: message })?,
        };

        Ok(match value {
            Value::Object(map) => map,
            _ => unreachable!("message payloads are structs"),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        let object = envelope(self.kind(), self.status(), self.render()?);

        Ok(serde_json::to_string(&object)?)
    }
}

fn envelope(kind: Kind, status: Status, mut payload: Map<String, Value>) -> Map<String, Value> {
    assert!(!payload.contains_key(TYPE_KEY), "{:?} payload uses reserved key {}", kind, TYPE_KEY);
    assert!(!payload.contains_key(STATUS_KEY), "{:?} payload uses reserved key {}", kind, STATUS_KEY);

    payload.insert(TYPE_KEY.into(), kind.as_str().into());
    payload.insert(STATUS_KEY.into(), status.as_str().into());

    payload
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn parse(message: &Message) -> Value {
        serde_json::from_str(&message.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_channel_list_json() {
        let message = Message::channel_list(vec!["#az", "#foo"]);

        assert_eq!(
            parse(&message),
            json!({"_type": "channel_list", "_status": "ok", "channels": ["#az", "#foo"]})
        );
        assert_eq!(message.target(), None);
    }

    #[test]
    fn test_channel_list_empty() {
        let message = Message::channel_list(Vec::<String>::new());

        assert_eq!(parse(&message)["channels"], json!([]));
    }

    #[test]
    fn test_event_json() {
        let time = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();
        let message = Message::event(time, "#az", "-->", "bob has joined".into());
        let value = parse(&message);

        let local = time.with_timezone(&Local).format("%H:%M:%S").to_string();
        assert_eq!(value["time"], json!(local));
        assert_eq!(value["_type"], "event");
        assert_eq!(value["_status"], "ok");
        assert_eq!(value["channel"], "#az");
        assert_eq!(value["prefix"], "-->");
        assert_eq!(value["message"], "bob has joined");
        assert_eq!(value.as_object().unwrap().len(), 6);
        assert_eq!(message.target(), Some("#az"));
    }

    #[test]
    fn test_event_time_keeps_fraction() {
        let time = Utc.timestamp_millis_opt(1_614_834_367_250).unwrap();
        let message = Message::event(time, "#az", "*", "x".into());

        assert!(parse(&message)["time"].as_str().unwrap().ends_with(".250"));
    }

    #[test]
    fn test_error_json() {
        let message = Message::error("Invalid json string");

        assert_eq!(
            parse(&message),
            json!({"_type": "unknown", "_status": "error", "errorMsg": "Invalid json string"})
        );
        assert_eq!(message.status(), Status::Error);
        assert_eq!(message.target(), None);
    }

    #[test]
    #[should_panic(expected = "reserved key _type")]
    fn test_envelope_rejects_reserved_type() {
        let mut payload = Map::new();
        payload.insert("_type".into(), "sneaky".into());

        envelope(Kind::Event, Status::Ok, payload);
    }

    #[test]
    #[should_panic(expected = "reserved key _status")]
    fn test_envelope_rejects_reserved_status() {
        let mut payload = Map::new();
        payload.insert("_status".into(), "ok".into());

        envelope(Kind::Event, Status::Ok, payload);
    }
}
