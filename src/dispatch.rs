use std::sync::Arc;

use log::{debug, error, trace, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::message::Message;
use crate::server::{Connections, Registry};

/// Producer side of the outgoing queue. Pushing never blocks.
#[derive(Clone)]
pub struct Queue {
    tx: UnboundedSender<Message>,
}

impl Queue {
    pub fn push(&self, message: Message) {
        if self.tx.send(message).is_err() {
            debug!("Dispatcher is gone, dropping message");
        }
    }
}

/// The only consumer of the queue and the only path that delivers to
/// subscribers, so every subscriber sees messages in queue order.
pub struct Dispatcher {
    rx: UnboundedReceiver<Message>,
    connections: Arc<Connections>,
    registry: Arc<Registry>,
    stop: CancellationToken,
}

pub fn channel(connections: Arc<Connections>, registry: Arc<Registry>) -> (Queue, Dispatcher) {
    let (tx, rx) = mpsc::unbounded_channel();

    let dispatcher = Dispatcher {
        rx,
        connections,
        registry,
        stop: CancellationToken::new(),
    };

    (Queue { tx }, dispatcher)
}

impl Dispatcher {
    /// Cancelling this token ends `run`. Messages still queued at that point
    /// are discarded, not drained.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    pub async fn run(mut self) {
        loop {
            let message = tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                message = self.rx.recv() => match message {
                    Some(x) => x,
                    None => break,
                },
            };

            self.dispatch(&message).await;
        }

        debug!("Dispatcher stopped");
    }

    async fn dispatch(&self, message: &Message) {
        let json: Arc<str> = match message.to_json() {
            Ok(x) => x.into(),
            Err(e) => {
                error!("Cannot serialize {:?}: {}", message.kind(), e);
                return;
            }
        };

        let recipients = match message.target() {
            Some(target) => {
                let ids = self.registry.subscribers_of(target).await;
                if ids.is_empty() {
                    trace!("Nobody listens to {}, dropping", target);
                    return;
                }

                self.connections.select(&ids).await
            }
            None => self.connections.all().await,
        };

        for connection in recipients {
            if let Err(e) = connection.send(json.clone()) {
                warn!("Delivery to {} failed: {}", connection, e);
            }
        }
    }
}
