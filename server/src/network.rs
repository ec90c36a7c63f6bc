//! Server network layer handling UDP communications and game loop coordination

use crate::client_manager::ClientManager;
use crate::game::ServerGame;
use log::{debug, error, info, warn};
use shared::bus::{Envelope, Recipient};
use shared::protocol::{timestamp_millis, MAX_DATAGRAM_SIZE, PROTOCOL_VERSION};
use shared::{CombatGate, NetcodeConfig, NetcodeResult, Outbox, Packet, Role, World};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { entity_id: u32 },
    Shutdown,
}

/// Main server coordinating networking and game simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    game: ServerGame,
    tick_duration: Duration,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    envelope_rx: Option<mpsc::UnboundedReceiver<Envelope>>,
}

impl Server {
    pub async fn new(
        addr: &str,
        config: NetcodeConfig,
        world: World,
        gate: Arc<dyn CombatGate>,
        max_clients: usize,
    ) -> NetcodeResult<Self> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (outbox, envelope_rx) = Outbox::channel(Role::Server);
        let tick_duration = Duration::from_secs_f32(config.fixed_delta());

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            game: ServerGame::new(config, world, gate, outbox),
            tick_duration,
            server_tx,
            server_rx,
            envelope_rx: Some(envelope_rx),
        })
    }

    pub fn local_addr(&self) -> NetcodeResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Handle for stopping the main loop from another task
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; MAX_DATAGRAM_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match Packet::decode(&buffer[..len]) {
                        Ok(packet) => {
                            if let Err(e) = server_tx.send(ServerMessage::PacketReceived { packet, addr }) {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        }
                        Err(e) => warn!("Failed to decode packet from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that routes envelopes posted by the simulation
    fn spawn_network_sender(&mut self) {
        let Some(mut envelope_rx) = self.envelope_rx.take() else {
            return;
        };
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);

        tokio::spawn(async move {
            while let Some(envelope) = envelope_rx.recv().await {
                let targets: Vec<SocketAddr> = {
                    let clients = clients.read().await;
                    match envelope.recipient {
                        Recipient::Owner(entity) => clients.addr_of_entity(entity).into_iter().collect(),
                        Recipient::All => clients.get_client_addrs().into_iter().map(|(_, addr)| addr).collect(),
                        Recipient::Server => {
                            warn!("Server posted a {} packet addressed to itself", envelope.packet.kind());
                            Vec::new()
                        }
                    }
                };

                let data = match envelope.packet.encode() {
                    Ok(data) => data,
                    Err(e) => {
                        error!("Failed to encode {} packet: {}", envelope.packet.kind(), e);
                        continue;
                    }
                };

                for addr in targets {
                    if let Err(e) = socket.send_to(&data, addr).await {
                        error!("Failed to send to {}: {}", addr, e);
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients = clients.write().await;
                    clients.check_timeouts()
                };

                for client in timed_out {
                    let message = ServerMessage::ClientTimeout {
                        entity_id: client.entity_id,
                    };
                    if let Err(e) = server_tx.send(message) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    async fn send_direct(&self, packet: &Packet, addr: SocketAddr) {
        let result: NetcodeResult<()> = match packet.encode() {
            Ok(data) => self.socket.send_to(&data, addr).await.map(|_| ()).map_err(Into::into),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!("Failed to send {} to {}: {}", packet.kind(), addr, e);
        }
    }

    /// Processes one incoming packet
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        self.clients.write().await.touch(addr);

        match packet {
            Packet::Connect { client_version } => {
                info!("Client connecting from {} (version: {})", addr, client_version);

                if client_version != PROTOCOL_VERSION {
                    let reason = format!("Protocol version {} required", PROTOCOL_VERSION);
                    self.send_direct(&Packet::Disconnected { reason }, addr).await;
                    return;
                }

                // A reconnect from the same address replaces the old session.
                let existing = self.clients.read().await.find_client_by_addr(addr).cloned();
                if let Some(existing) = existing {
                    info!("Removing existing client {} from {}", existing.id, addr);
                    self.clients.write().await.remove_client(existing.id);
                    self.game.remove_player(existing.entity_id);
                }

                let added = self.clients.write().await.add_client(addr);
                match added {
                    Some(client) => {
                        let spawn = self.game.spawn_player(client.entity_id, client.team);
                        let response = Packet::Connected {
                            client_id: client.id,
                            entity_id: client.entity_id,
                            team: client.team,
                            spawn,
                            tick: self.game.tick(),
                        };
                        self.send_direct(&response, addr).await;
                        let round = Packet::RoundState {
                            active: self.game.round_active(),
                        };
                        self.send_direct(&round, addr).await;
                    }
                    None => {
                        let response = Packet::Disconnected {
                            reason: "Server full".to_string(),
                        };
                        self.send_direct(&response, addr).await;
                    }
                }
            }

            Packet::Input(sample) => {
                if self.owns(addr, sample.entity_id).await {
                    self.game.receive_input(sample);
                } else {
                    warn!("Input for entity {} from non-owner {}", sample.entity_id, addr);
                }
            }

            Packet::Shot(shot) => {
                if self.owns(addr, shot.shooter_id).await {
                    self.game.receive_shot(shot);
                } else {
                    warn!("Shot for entity {} from non-owner {}", shot.shooter_id, addr);
                }
            }

            Packet::Disconnect => {
                let client = self.clients.read().await.find_client_by_addr(addr).cloned();
                if let Some(client) = client {
                    self.clients.write().await.remove_client(client.id);
                    self.game.remove_player(client.entity_id);
                }
            }

            other => {
                warn!("Unexpected {} packet from {}", other.kind(), addr);
            }
        }
    }

    async fn owns(&self, addr: SocketAddr, entity: u32) -> bool {
        self.clients
            .read()
            .await
            .find_client_by_addr(addr)
            .map_or(false, |client| client.entity_id == entity)
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> NetcodeResult<()> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        let mut tick_interval = interval(self.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_frame = Instant::now();

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        }
                        Some(ServerMessage::ClientTimeout { entity_id }) => {
                            debug!("Entity {} timed out", entity_id);
                            self.game.remove_player(entity_id);
                        }
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_frame).as_secs_f32();
                    last_frame = now;
                    self.game.frame(dt, timestamp_millis());
                },
            }
        }

        Ok(())
    }
}
