//! Connection roster for the authoritative server
//!
//! Each UDP peer that completes the `Connect` handshake becomes a `Client`
//! owning exactly one player entity. The manager handles:
//! - Capacity limits and client id allocation
//! - Entity ownership, used to route unicast envelopes to the owner's address
//! - Team assignment for new players
//! - Activity tracking and timeout detection

use log::info;
use shared::{ClientId, EntityId, TeamId};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Represents a connected client and the entity it controls
#[derive(Debug, Clone)]
pub struct Client {
    /// Unique client identifier assigned by the server
    pub id: ClientId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Player entity this client owns and predicts
    pub entity_id: EntityId,
    pub team: TeamId,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
}

impl Client {
    pub fn new(id: ClientId, addr: SocketAddr, entity_id: EntityId, team: TeamId) -> Self {
        Self {
            id,
            addr,
            entity_id,
            team,
            last_seen: Instant::now(),
        }
    }

    /// Checks if the client has exceeded the connection timeout
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected clients
///
/// Client ids and entity ids both start at 1 and are never reused within a
/// session. Teams alternate by join order: the first connection gets team 0,
/// the next team 1, then 0 again, and so on.
pub struct ClientManager {
    clients: HashMap<ClientId, Client>,
    next_client_id: ClientId,
    next_entity_id: EntityId,
    joined: u32,
    max_clients: usize,
    timeout: Duration,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self::with_timeout(max_clients, Duration::from_secs(5))
    }

    pub fn with_timeout(max_clients: usize, timeout: Duration) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            next_entity_id: 1,
            joined: 0,
            max_clients,
            timeout,
        }
    }

    /// Attempts to add a new client connection
    ///
    /// Returns the registered client, or None if the server is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<Client> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;
        let entity_id = self.next_entity_id;
        self.next_entity_id += 1;
        let team = self.joined % 2;
        self.joined += 1;

        let client = Client::new(client_id, addr, entity_id, team);
        info!(
            "Client {} connected from {} (entity {}, team {})",
            client_id, addr, entity_id, team
        );
        self.clients.insert(client_id, client.clone());

        Some(client)
    }

    /// Removes a client, returning it if it was connected
    pub fn remove_client(&mut self, client_id: ClientId) -> Option<Client> {
        let removed = self.clients.remove(&client_id);
        if let Some(client) = &removed {
            info!("Client {} disconnected", client.id);
        }
        removed
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<&Client> {
        self.clients.values().find(|client| client.addr == addr)
    }

    /// Address of the client owning `entity`, for unicast routing
    pub fn addr_of_entity(&self, entity: EntityId) -> Option<SocketAddr> {
        self.clients
            .values()
            .find(|client| client.entity_id == entity)
            .map(|client| client.addr)
    }

    /// Marks the client at `addr` as active
    pub fn touch(&mut self, addr: SocketAddr) {
        if let Some(client) = self.clients.values_mut().find(|client| client.addr == addr) {
            client.last_seen = Instant::now();
        }
    }

    /// Removes clients that have been silent longer than the timeout
    ///
    /// Returns the removed clients so their entities can be despawned.
    pub fn check_timeouts(&mut self) -> Vec<Client> {
        let timed_out: Vec<ClientId> = self
            .clients
            .values()
            .filter(|client| client.is_timed_out(self.timeout))
            .map(|client| client.id)
            .collect();

        timed_out
            .into_iter()
            .filter_map(|client_id| self.remove_client(client_id))
            .collect()
    }

    /// All client addresses, for broadcasting
    pub fn get_client_addrs(&self) -> Vec<(ClientId, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_add_client_assigns_entity_and_team() {
        let mut manager = ClientManager::new(4);
        let first = manager.add_client(addr(9001)).unwrap();
        let second = manager.add_client(addr(9002)).unwrap();
        let third = manager.add_client(addr(9003)).unwrap();

        assert_eq!((first.id, first.entity_id, first.team), (1, 1, 0));
        assert_eq!((second.id, second.entity_id, second.team), (2, 2, 1));
        assert_eq!(third.team, 0);
        assert_eq!(manager.len(), 3);
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut manager = ClientManager::new(1);
        assert!(manager.add_client(addr(9001)).is_some());
        assert!(manager.add_client(addr(9002)).is_none());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut manager = ClientManager::new(2);
        let first = manager.add_client(addr(9001)).unwrap();
        manager.remove_client(first.id);
        let second = manager.add_client(addr(9001)).unwrap();
        assert_ne!(first.id, second.id);
        assert_ne!(first.entity_id, second.entity_id);
    }

    #[test]
    fn test_lookup_by_addr_and_entity() {
        let mut manager = ClientManager::new(2);
        let client = manager.add_client(addr(9001)).unwrap();
        manager.add_client(addr(9002));

        assert_eq!(manager.find_client_by_addr(addr(9001)).unwrap().id, client.id);
        assert_eq!(manager.addr_of_entity(client.entity_id), Some(addr(9001)));
        assert!(manager.addr_of_entity(77).is_none());
        assert!(manager.find_client_by_addr(addr(9999)).is_none());
    }

    #[test]
    fn test_remove_missing_client() {
        let mut manager = ClientManager::new(2);
        assert!(manager.remove_client(999).is_none());
        assert!(manager.is_empty());
    }

    #[test]
    fn test_timeouts_remove_silent_clients() {
        let mut manager = ClientManager::with_timeout(2, Duration::from_millis(50));
        let quiet = manager.add_client(addr(9001)).unwrap();
        manager.add_client(addr(9002));

        if let Some(client) = manager.clients.get_mut(&quiet.id) {
            client.last_seen = Instant::now() - Duration::from_secs(1);
        }

        let removed = manager.check_timeouts();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].entity_id, quiet.entity_id);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_touch_refreshes_activity() {
        let mut manager = ClientManager::with_timeout(1, Duration::from_millis(50));
        let client = manager.add_client(addr(9001)).unwrap();
        if let Some(entry) = manager.clients.get_mut(&client.id) {
            entry.last_seen = Instant::now() - Duration::from_secs(1);
        }
        manager.touch(addr(9001));
        assert!(manager.check_timeouts().is_empty());
    }
}
