use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use super::connection::ConnectionId;

#[derive(Default)]
struct Subscriptions {
    by_channel: HashMap<String, HashSet<ConnectionId>>,
    by_connection: HashMap<ConnectionId, HashSet<String>>,
}

impl Subscriptions {
    fn remove(&mut self, id: ConnectionId) {
        let channels = match self.by_connection.remove(&id) {
            Some(x) => x,
            None => return,
        };

        for channel in channels {
            if let Some(set) = self.by_channel.get_mut(&channel) {
                set.remove(&id);
                if set.is_empty() {
                    self.by_channel.remove(&channel);
                }
            }
        }
    }
}

/// Channel name to listening connections. Both indexes sit behind one lock
/// so a replace is never observed half-done.
#[derive(Default)]
pub struct Registry {
    inner: RwLock<Subscriptions>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every prior subscription of `id` and subscribes it to exactly
    /// `channels`.
    pub async fn replace_subscriptions<I>(&self, id: ConnectionId, channels: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut inner = self.inner.write().await;

        inner.remove(id);

        let channels = channels.into_iter().collect::<HashSet<_>>();
        if channels.is_empty() {
            return;
        }

        for channel in &channels {
            inner.by_channel.entry(channel.clone()).or_default().insert(id);
        }
        inner.by_connection.insert(id, channels);
    }

    pub async fn remove_connection(&self, id: ConnectionId) {
        self.inner.write().await.remove(id);
    }

    /// Snapshot of the listeners of `channel`; empty when nobody listens.
    pub async fn subscribers_of(&self, channel: &str) -> HashSet<ConnectionId> {
        self.inner.read().await.by_channel.get(channel).cloned().unwrap_or_default()
    }

    #[cfg(test)]
    pub async fn channels_of(&self, id: ConnectionId) -> HashSet<String> {
        self.inner.read().await.by_connection.get(&id).cloned().unwrap_or_default()
    }
}
