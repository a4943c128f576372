//! Live connections, keyed by user id then connection id.

use std::collections::HashMap;
use std::sync::Mutex;

use collabrix_types::ServerEvent;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

type Outbox = UnboundedSender<ServerEvent>;

/// Who is online and how to reach each of their connections.
///
/// The lock is never held across an `.await`.
pub struct ConnectionRegistry {
    users: Mutex<HashMap<String, HashMap<Uuid, Outbox>>>,
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConnectionRegistry({} connections)", self.connection_count())
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self { users: Mutex::new(HashMap::new()) }
    }

    pub fn register(&self, user_id: &str, connection_id: Uuid, outbox: Outbox) {
        if let Ok(mut users) = self.users.lock() {
            users
                .entry(user_id.to_owned())
                .or_default()
                .insert(connection_id, outbox);
        }
    }

    /// Remove one connection. The user's other connections stay registered.
    /// Returns `true` if the connection was found.
    pub fn unregister(&self, user_id: &str, connection_id: Uuid) -> bool {
        let Ok(mut users) = self.users.lock() else {
            return false;
        };
        let Some(connections) = users.get_mut(user_id) else {
            return false;
        };
        let removed = connections.remove(&connection_id).is_some();
        if connections.is_empty() {
            users.remove(user_id);
        }
        removed
    }

    /// Push `event` to every live connection of `user_id`.
    /// Returns how many connections accepted it.
    pub fn deliver_to_user(&self, user_id: &str, event: &ServerEvent) -> usize {
        let Ok(users) = self.users.lock() else {
            return 0;
        };
        users
            .get(user_id)
            .map(|connections| {
                connections
                    .values()
                    .filter(|outbox| outbox.send(event.clone()).is_ok())
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.users
            .lock()
            .map(|users| users.contains_key(user_id))
            .unwrap_or(false)
    }

    pub fn connection_count(&self) -> usize {
        self.users
            .lock()
            .map(|users| users.values().map(HashMap::len).sum())
            .unwrap_or(0)
    }

    /// Drop every record; used on shutdown.
    pub fn clear(&self) {
        if let Ok(mut users) = self.users.lock() {
            users.clear();
        }
    }
}
