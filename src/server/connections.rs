use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tokio::sync::RwLock;

use super::connection::{Connection, ConnectionId};

/// Live subscriber connections, gated by the accepting flag.
pub struct Connections {
    data: RwLock<HashMap<ConnectionId, Arc<Connection>>>,
    accepting: AtomicBool,
}

impl Connections {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            accepting: AtomicBool::new(true),
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// One-way: once stopped, `insert` refuses everything.
    pub fn stop_accepting(&self) {
        self.accepting.store(false, Ordering::Release);
    }

    pub async fn insert(&self, connection: Arc<Connection>) -> bool {
        let mut data = self.data.write().await;
        // checked under the lock so nothing slips in after stop_accepting returns
        if !self.is_accepting() {
            return false;
        }

        data.insert(connection.id(), connection);

        true
    }

    pub async fn remove(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.data.write().await.remove(&id)
    }

    pub async fn all(&self) -> Vec<Arc<Connection>> {
        self.data.read().await.values().cloned().collect()
    }

    pub async fn select(&self, ids: &HashSet<ConnectionId>) -> Vec<Arc<Connection>> {
        let data = self.data.read().await;

        ids.iter().filter_map(|id| data.get(id).cloned()).collect()
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }
}

impl Default for Connections {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::super::connection::test::connection;
    use super::*;

    #[tokio::test]
    async fn test_insert_remove() {
        let connections = Connections::new();
        let (conn, _rx) = connection();

        assert!(connections.insert(conn.clone()).await);
        assert_eq!(connections.len().await, 1);

        assert!(connections.remove(conn.id()).await.is_some());
        assert!(connections.remove(conn.id()).await.is_none());
        assert_eq!(connections.len().await, 0);
    }

    #[tokio::test]
    async fn test_stop_accepting() {
        let connections = Connections::new();
        let (conn, _rx) = connection();

        connections.stop_accepting();

        assert!(!connections.is_accepting());
        assert!(!connections.insert(conn).await);
        assert_eq!(connections.len().await, 0);
    }

    #[tokio::test]
    async fn test_select_skips_unknown() {
        let connections = Connections::new();
        let (a, _ra) = connection();
        let (b, _rb) = connection();
        connections.insert(a.clone()).await;

        let selected = connections.select(&[a.id(), b.id()].iter().copied().collect()).await;

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id(), a.id());
    }
}
