mod connection;
mod connections;
mod registry;

use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};

use futures::{Sink, SinkExt, Stream, StreamExt};
use log::{debug, error, info, warn};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc::{self, UnboundedReceiver},
    task::JoinHandle,
};
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_util::sync::CancellationToken;

pub use connection::{Connection, ConnectionId, Outgoing};
pub use connections::Connections;
pub use registry::Registry;

use crate::error::Result;
use crate::message::Message;
use crate::request::Request;
use crate::source::Source;
use crate::tls::BoxedIo;

/// Subscriber-facing WebSocket listener. Owns every live connection from
/// accept to teardown and keeps the registry in step with it.
pub struct Server {
    source: Arc<dyn Source>,
    connections: Arc<Connections>,
    registry: Arc<Registry>,
    tls: Option<TlsAcceptor>,
    stopped: CancellationToken,
}

impl Server {
    pub fn new(source: Arc<dyn Source>, tls: Option<TlsAcceptor>) -> Self {
        Self {
            source,
            connections: Arc::new(Connections::new()),
            registry: Arc::new(Registry::new()),
            tls,
            stopped: CancellationToken::new(),
        }
    }

    pub fn connections(&self) -> &Arc<Connections> {
        &self.connections
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub async fn listen(self: &Arc<Self>, port: u16) -> Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
        let addr = listener.local_addr()?;
        info!("Listening on {} (tls: {})", addr, self.tls.is_some());

        let server = self.clone();
        let handle = tokio::spawn(async move { server.accept_loop(listener).await });

        Ok((addr, handle))
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        loop {
            let (stream, addr) = tokio::select! {
                _ = self.stopped.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok(x) => x,
                    Err(e) => {
                        warn!("Accept failed: {}", e);
                        continue;
                    }
                },
            };

            if !self.connections.is_accepting() {
                debug!("Refusing {}, shutting down", addr);
                continue;
            }

            let server = self.clone();
            tokio::spawn(async move {
                if let Err(e) = server.serve(stream, addr).await {
                    warn!("Connection from {} failed: {}", addr, e);
                }
            });
        }

        debug!("Listener stopped");
    }

    async fn serve(&self, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        let io: BoxedIo = match &self.tls {
            Some(acceptor) => Box::new(acceptor.accept(stream).await?),
            None => Box::new(stream),
        };
        let ws = tokio_tungstenite::accept_async(io).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let connection = Arc::new(Connection::new(addr, tx));
        if !self.open(connection.clone()).await {
            return Ok(());
        }

        let (sink, stream) = ws.split();
        let writer = tokio::spawn(write_loop(sink, rx, connection.id()));

        if let Err(e) = self.read_loop(&connection, stream).await {
            error!("Connection {} errored: {}", connection, e);
        }
        self.close(&connection).await;

        let _ = writer.await;

        Ok(())
    }

    /// Registers a freshly accepted connection and sends it the current
    /// channel list. Returns false when the server is shutting down.
    pub async fn open(&self, connection: Arc<Connection>) -> bool {
        if !self.connections.insert(connection.clone()).await {
            debug!("Rejected {}, not accepting connections", connection);
            return false;
        }
        info!("New connection {} ({} live)", connection, self.connections.len().await);

        // live before the snapshot is queued, so a broadcast racing the open
        // may reach this connection ahead of its channel list
        let channels = self.source.channels().await;
        self.reply(&connection, &Message::channel_list(channels));

        true
    }

    /// Tears `connection` down; only the first call for a connection does
    /// anything.
    pub async fn close(&self, connection: &Connection) {
        if !connection.mark_closed() {
            return;
        }
        info!("Closing connection {}", connection);

        self.connections.remove(connection.id()).await;
        self.registry.remove_connection(connection.id()).await;
        connection.close();
    }

    pub async fn close_all(&self) {
        for connection in self.connections.all().await {
            self.close(&connection).await;
        }
    }

    pub fn stop_accepting(&self) {
        self.connections.stop_accepting();
    }

    pub async fn stop(&self) {
        self.stop_accepting();
        self.stopped.cancel();
        self.close_all().await;
    }

    async fn read_loop<S>(&self, connection: &Connection, mut stream: S) -> Result<()>
    where
        S: Stream<Item = std::result::Result<WsMessage, WsError>> + Unpin,
    {
        while let Some(frame) = stream.next().await {
            match frame? {
                WsMessage::Text(text) => self.handle_text(connection, text.as_str()).await,
                WsMessage::Close(_) => break,
                WsMessage::Binary(_) => debug!("Ignoring binary frame from {}", connection),
                _ => {}
            }
        }

        Ok(())
    }

    pub async fn handle_text(&self, connection: &Connection, text: &str) {
        match Request::decode(text) {
            Ok(Request::Listen { channels }) => {
                if connection.is_closed() {
                    debug!("Ignoring listen request from closed {}", connection);
                    return;
                }
                debug!("{} listens to {:?}", connection, channels);
                self.registry.replace_subscriptions(connection.id(), channels).await;

                // close marks the flag before deregistering, so a close that
                // overlapped the replace is seen here
                if connection.is_closed() {
                    self.registry.remove_connection(connection.id()).await;
                }
            }
            Ok(Request::Unhandled { kind }) => warn!("Unhandled _type {} from {}", kind, connection),
            Err(e) => {
                debug!("Invalid request from {}: {}", connection, e);
                self.reply(connection, &Message::error("Invalid json string"));
            }
        }
    }

    fn reply(&self, connection: &Connection, message: &Message) {
        let result = message.to_json().and_then(|json| connection.send(json.into()));

        if let Err(e) = result {
            warn!("Reply to {} failed: {}", connection, e);
        }
    }
}

async fn write_loop<S>(mut sink: S, mut rx: UnboundedReceiver<Outgoing>, id: ConnectionId)
where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    while let Some(outgoing) = rx.recv().await {
        let frame = match outgoing {
            Outgoing::Text(text) => WsMessage::text(text.to_string()),
            Outgoing::Close => {
                let _ = sink.send(WsMessage::Close(None)).await;
                break;
            }
        };

        if let Err(e) = sink.send(frame).await {
            debug!("Write to {} failed: {}", id, e);
            break;
        }
    }

    let _ = sink.close().await;
}
