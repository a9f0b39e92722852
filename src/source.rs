use std::boxed::Box;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::event::Event;

/// The chat session the relay reads events from and acts on.
#[async_trait]
pub trait Source: Sync + Send {
    /// Event stream of the session. Only the first call gets the events;
    /// later calls get an empty stream.
    async fn stream(&self) -> BoxStream<'static, Event>;

    /// Channels currently joined, sorted.
    async fn channels(&self) -> Vec<String>;

    async fn join(&self, channel: &str) -> Result<()>;
    async fn part(&self, channel: &str) -> Result<()>;
    async fn send_text(&self, target: &str, text: &str) -> Result<()>;
    async fn quit(&self, reason: &str) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod test {
    use std::collections::BTreeSet;

    use futures::{stream, StreamExt};
    use tokio::sync::{
        mpsc::{self, UnboundedReceiver, UnboundedSender},
        Mutex,
    };
    use tokio_stream::wrappers::UnboundedReceiverStream;

    use super::*;

    #[derive(Clone, Debug, Eq, PartialEq)]
    pub(crate) enum Action {
        Join(String),
        Part(String),
        Send(String, String),
        Quit,
    }

    /// In-memory session that records what it is asked to do.
    pub(crate) struct FakeSource {
        channels: Mutex<BTreeSet<String>>,
        actions: Mutex<Vec<Action>>,
        events: Mutex<Option<UnboundedReceiver<Event>>>,
    }

    impl FakeSource {
        pub(crate) fn new(channels: &[&str]) -> (Self, UnboundedSender<Event>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let source = Self {
                channels: Mutex::new(channels.iter().map(|x| (*x).to_owned()).collect()),
                actions: Mutex::new(Vec::new()),
                events: Mutex::new(Some(rx)),
            };

            (source, tx)
        }

        pub(crate) async fn actions(&self) -> Vec<Action> {
            self.actions.lock().await.clone()
        }
    }

    #[async_trait]
    impl Source for FakeSource {
        async fn stream(&self) -> BoxStream<'static, Event> {
            match self.events.lock().await.take() {
                Some(rx) => UnboundedReceiverStream::new(rx).boxed(),
                None => stream::empty().boxed(),
            }
        }

        async fn channels(&self) -> Vec<String> {
            self.channels.lock().await.iter().cloned().collect()
        }

        async fn join(&self, channel: &str) -> Result<()> {
            self.channels.lock().await.insert(channel.to_owned());
            self.actions.lock().await.push(Action::Join(channel.to_owned()));

            Ok(())
        }

        async fn part(&self, channel: &str) -> Result<()> {
            self.channels.lock().await.remove(channel);
            self.actions.lock().await.push(Action::Part(channel.to_owned()));

            Ok(())
        }

        async fn send_text(&self, target: &str, text: &str) -> Result<()> {
            self.actions
                .lock()
                .await
                .push(Action::Send(target.to_owned(), text.to_owned()));

            Ok(())
        }

        async fn quit(&self, _: &str) -> Result<()> {
            self.actions.lock().await.push(Action::Quit);

            Ok(())
        }
    }
}
