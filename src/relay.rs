use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use log::{debug, error};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::command::Commands;
use crate::dispatch::{self, Dispatcher, Queue};
use crate::error::Result;
use crate::event::Event;
use crate::ingest;
use crate::server::Server;
use crate::source::Source;

/// Handles shared by everything that acts on the relay.
pub struct Context {
    pub source: Arc<dyn Source>,
    pub server: Arc<Server>,
    pub queue: Queue,
    /// Cancelled once to start shutdown.
    pub shutdown: CancellationToken,
}

impl Context {
    pub fn new(source: Arc<dyn Source>, server: Arc<Server>, queue: Queue) -> Self {
        Self {
            source,
            server,
            queue,
            shutdown: CancellationToken::new(),
        }
    }
}

pub struct Relay {
    context: Context,
    commands: Commands,
    dispatcher: Dispatcher,
}

impl Relay {
    pub fn new(source: Arc<dyn Source>, server: Arc<Server>, commands: Commands) -> Self {
        let (queue, dispatcher) = dispatch::channel(server.connections().clone(), server.registry().clone());

        Self {
            context: Context::new(source, server, queue),
            commands,
            dispatcher,
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.context.shutdown.clone()
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            context,
            commands,
            dispatcher,
        } = self;

        let stop_dispatcher = dispatcher.stop_token();
        let dispatcher = tokio::spawn(dispatcher.run());

        let mut events = context.source.stream().await;
        loop {
            tokio::select! {
                _ = context.shutdown.cancelled() => break,
                event = events.next() => match event {
                    Some(event) => handle_event(&context, &commands, event).await,
                    None => {
                        error!("Chat session ended, waiting for shutdown");
                        context.shutdown.cancelled().await;
                        break;
                    }
                },
            }
        }

        shutdown(&context, stop_dispatcher, dispatcher).await
    }
}

async fn handle_event(context: &Context, commands: &Commands, event: Event) {
    for message in ingest::translate(&event, Utc::now()) {
        context.queue.push(message);
    }

    if let Some((actor, channel, text)) = event.command_input() {
        if let Err(e) = commands.handle(context, actor, channel, text).await {
            error!("Command from {} failed: {}", actor.nick, e);
        }
    }
}

async fn shutdown(context: &Context, stop_dispatcher: CancellationToken, dispatcher: JoinHandle<()>) -> Result<()> {
    debug!("Shutting down");
    context.server.stop_accepting();

    debug!("Joining dispatcher");
    stop_dispatcher.cancel();
    if let Err(e) = dispatcher.await {
        error!("Dispatcher panicked: {}", e);
    }

    debug!("Stopping server");
    context.server.stop().await;

    debug!("Quitting chat session");
    context.source.quit("Shutting down").await?;

    debug!("Stopped");

    Ok(())
}
