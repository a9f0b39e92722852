mod session;
mod state;

use std::sync::Arc;

use async_trait::async_trait;
use futures::{
    stream::{self, BoxStream},
    StreamExt,
};
use log::{error, info, trace, warn};
use tokio::sync::{
    mpsc::{self, UnboundedReceiver, UnboundedSender},
    Mutex,
};
use tokio_stream::wrappers::UnboundedReceiverStream;

use self::session::Session;
use super::transport::Transport;
use crate::config::IrcConfig;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::source::Source;

pub struct Client {
    session: Arc<Session>,
    events: Mutex<Option<UnboundedReceiver<Event>>>,
}

impl Client {
    pub async fn connect(config: &IrcConfig) -> Result<Self> {
        let transport = Transport::connect(&config.host, config.port, config.tls).await?;

        Self::start(transport, config).await
    }

    /// Registers over `transport` and starts reading from it.
    pub async fn start(transport: Transport, config: &IrcConfig) -> Result<Self> {
        let session = Arc::new(Session::new(transport, &config.nick, config.channel.clone()));
        session.register(&config.username, config.password.as_deref()).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(read_loop(session.clone(), tx));

        Ok(Self {
            session,
            events: Mutex::new(Some(rx)),
        })
    }
}

async fn read_loop(session: Arc<Session>, tx: UnboundedSender<Event>) {
    let mut messages = match session.transport().stream().await {
        Some(x) => x,
        None => return,
    };

    while let Some(message) = messages.next().await {
        let message = match message {
            Ok(x) => x,
            Err(Error::Irc(e)) => {
                warn!("Skipping line: {}", e);
                continue;
            }
            Err(e) => {
                error!("Chat connection failed: {}", e);
                break;
            }
        };

        match session.handle_message(&message).await {
            Ok(events) => {
                for event in events {
                    if tx.send(event).is_err() {
                        trace!("No one is reading events");
                    }
                }
            }
            Err(e) => warn!("Cannot handle '{}': {}", message, e),
        }
    }

    info!("Chat connection closed");
}

#[async_trait]
impl Source for Client {
    async fn stream(&self) -> BoxStream<'static, Event> {
        match self.events.lock().await.take() {
            Some(rx) => UnboundedReceiverStream::new(rx).boxed(),
            None => stream::empty().boxed(),
        }
    }

    async fn channels(&self) -> Vec<String> {
        self.session.channels().await
    }

    async fn join(&self, channel: &str) -> Result<()> {
        self.session.send("JOIN", vec![channel]).await
    }

    async fn part(&self, channel: &str) -> Result<()> {
        self.session.send("PART", vec![channel]).await
    }

    async fn send_text(&self, target: &str, text: &str) -> Result<()> {
        for line in text.lines() {
            self.session.send("PRIVMSG", vec![target, line]).await?;
        }

        Ok(())
    }

    async fn quit(&self, reason: &str) -> Result<()> {
        self.session.send("QUIT", vec![reason]).await
    }
}
