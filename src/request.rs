use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;

/// Request sent by a subscriber connection.
#[derive(Debug, Eq, PartialEq)]
pub enum Request {
    Listen { channels: Vec<String> },
    Unhandled { kind: String },
}

#[derive(Deserialize)]
struct ListenRequest {
    channels: Vec<String>,
}

impl Request {
    /// Fails only when `raw` is not valid JSON. Anything that parses but is not
    /// a well-formed request comes back as `Unhandled`.
    pub fn decode(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;

        let kind = match value.get("_type").and_then(Value::as_str) {
            Some(kind) => kind.to_owned(),
            None => return Ok(Self::Unhandled { kind: "<missing>".into() }),
        };

        Ok(match kind.as_ref() {
            "listen_request" => match ListenRequest::deserialize(value) {
                Ok(request) => Self::Listen {
                    channels: request.channels,
                },
                Err(_) => Self::Unhandled { kind },
            },
            _ => Self::Unhandled { kind },
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_listen() {
        let request = Request::decode(r##"{"_type":"listen_request","channels":["#az","#foo"]}"##).unwrap();

        assert_eq!(
            request,
            Request::Listen {
                channels: vec!["#az".into(), "#foo".into()]
            }
        );
    }

    #[test]
    fn test_decode_listen_empty() {
        let request = Request::decode(r#"{"_type":"listen_request","channels":[]}"#).unwrap();

        assert_eq!(request, Request::Listen { channels: vec![] });
    }

    #[test]
    fn test_decode_invalid_json() {
        assert!(Request::decode("not json").is_err());
    }

    #[test]
    fn test_decode_unknown_type() {
        let request = Request::decode(r#"{"_type":"history_request"}"#).unwrap();

        assert_eq!(request, Request::Unhandled { kind: "history_request".into() });
    }

    #[test]
    fn test_decode_missing_type() {
        assert!(matches!(Request::decode("[1, 2]").unwrap(), Request::Unhandled { .. }));
    }

    #[test]
    fn test_decode_listen_without_channels() {
        let request = Request::decode(r##"{"_type":"listen_request","channels":"#az"}"##).unwrap();

        assert_eq!(request, Request::Unhandled { kind: "listen_request".into() });
    }
}
