use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tls setup failed: {0}")]
    Tls(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("connection {0} is closed")]
    ConnectionClosed(u64),

    #[error("irc protocol error: {0}")]
    Irc(String),
}

impl From<tokio_rustls::rustls::Error> for Error {
    fn from(e: tokio_rustls::rustls::Error) -> Self {
        Error::Tls(e.to_string())
    }
}

impl From<tokio_rustls::rustls::pki_types::pem::Error> for Error {
    fn from(e: tokio_rustls::rustls::pki_types::pem::Error) -> Self {
        Error::Tls(e.to_string())
    }
}
