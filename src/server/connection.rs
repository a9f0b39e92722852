use std::{
    fmt,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use tokio::sync::mpsc::UnboundedSender;

use crate::error::{Error, Result};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Frames queued for a connection's writer task.
#[derive(Debug, PartialEq)]
pub enum Outgoing {
    Text(Arc<str>),
    Close,
}

/// Handle to one live subscriber. Writes go through the writer task, so
/// sending never blocks the caller.
pub struct Connection {
    id: ConnectionId,
    addr: SocketAddr,
    tx: UnboundedSender<Outgoing>,
    closed: AtomicBool,
}

impl Connection {
    pub fn new(addr: SocketAddr, tx: UnboundedSender<Outgoing>) -> Self {
        Self {
            id: ConnectionId::next(),
            addr,
            tx,
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn send(&self, text: Arc<str>) -> Result<()> {
        self.tx
            .send(Outgoing::Text(text))
            .map_err(|_| Error::ConnectionClosed(self.id.0))
    }

    /// Asks the writer task to send a close frame. Closing twice is harmless.
    pub fn close(&self) {
        let _ = self.tx.send(Outgoing::Close);
    }

    /// Returns true exactly once, for whichever caller tears the connection
    /// down first.
    pub fn mark_closed(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.addr)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use super::*;

    pub(crate) fn connection() -> (Arc<Connection>, UnboundedReceiver<Outgoing>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let addr = "127.0.0.1:4000".parse().unwrap();

        (Arc::new(Connection::new(addr, tx)), rx)
    }

    #[test]
    fn test_ids_are_unique() {
        let (a, _ra) = connection();
        let (b, _rb) = connection();

        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_send_queues_text() {
        let (conn, mut rx) = connection();

        conn.send("hello".into()).unwrap();

        assert_eq!(rx.recv().await, Some(Outgoing::Text("hello".into())));
    }

    #[test]
    fn test_send_after_writer_gone() {
        let (conn, rx) = connection();
        drop(rx);

        assert!(matches!(conn.send("hello".into()), Err(Error::ConnectionClosed(_))));
    }

    #[test]
    fn test_mark_closed_once() {
        let (conn, _rx) = connection();

        assert!(!conn.is_closed());
        assert!(conn.mark_closed());
        assert!(!conn.mark_closed());
        assert!(conn.is_closed());
    }
}
