//! UDP transport for the client.
//!
//! The render loop is synchronous, so the socket lives on a background thread
//! running its own tokio runtime. The game posts envelopes to an `Outbox`; the
//! transport sends the ones addressed to the server and hands decoded packets
//! back through a channel the render loop drains once per frame.

use log::{debug, error, info, warn};
use rand::Rng;
use shared::bus::{Envelope, Recipient};
use shared::protocol::MAX_DATAGRAM_SIZE;
use shared::{NetcodeError, NetcodeResult, Outbox, Packet, Role};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::sleep;

/// Artificial network conditions applied to both directions
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NetworkConditions {
    /// Simulated round trip in milliseconds, split evenly between directions
    pub fake_ping_ms: u64,
    /// Probability in [0, 1] that any single datagram is dropped
    pub packet_loss: f32,
}

impl NetworkConditions {
    pub fn one_way_delay(&self) -> Duration {
        Duration::from_millis(self.fake_ping_ms / 2)
    }

    fn should_drop(&self) -> bool {
        self.packet_loss > 0.0 && rand::thread_rng().gen::<f32>() < self.packet_loss
    }
}

/// Sends `data` to `addr`, after the simulated delay if there is one
async fn delayed_send(socket: Arc<UdpSocket>, data: Vec<u8>, addr: SocketAddr, delay: Duration) {
    if !delay.is_zero() {
        sleep(delay).await;
    }
    if let Err(e) = socket.send_to(&data, addr).await {
        error!("Failed to send to {}: {}", addr, e);
    }
}

/// Pumps packets between the socket and the game until the outgoing channel closes.
pub async fn run_transport(
    socket: UdpSocket,
    server_addr: SocketAddr,
    conditions: NetworkConditions,
    mut outgoing: UnboundedReceiver<Envelope>,
    incoming: UnboundedSender<Packet>,
) -> NetcodeResult<()> {
    let socket = Arc::new(socket);
    let delay = conditions.one_way_delay();
    let mut buffer = [0u8; MAX_DATAGRAM_SIZE];

    loop {
        tokio::select! {
            envelope = outgoing.recv() => {
                let Some(envelope) = envelope else {
                    break;
                };
                if envelope.recipient != Recipient::Server {
                    warn!("Client cannot route {} to {:?}", envelope.packet.kind(), envelope.recipient);
                    continue;
                }
                if conditions.should_drop() {
                    debug!("Dropped outgoing {}", envelope.packet.kind());
                    continue;
                }
                let data = envelope.packet.encode()?;
                if delay.is_zero() {
                    delayed_send(Arc::clone(&socket), data, server_addr, delay).await;
                } else {
                    tokio::spawn(delayed_send(Arc::clone(&socket), data, server_addr, delay));
                }
            },

            result = socket.recv_from(&mut buffer) => {
                let (len, addr) = match result {
                    Ok(received) => received,
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        continue;
                    }
                };
                if addr != server_addr {
                    warn!("Ignoring datagram from {}", addr);
                    continue;
                }
                let packet = match Packet::decode(&buffer[..len]) {
                    Ok(packet) => packet,
                    Err(e) => {
                        warn!("Failed to decode packet: {}", e);
                        continue;
                    }
                };
                if conditions.should_drop() {
                    debug!("Dropped incoming {}", packet.kind());
                    continue;
                }

                if delay.is_zero() {
                    if incoming.send(packet).is_err() {
                        break;
                    }
                } else {
                    let incoming = incoming.clone();
                    tokio::spawn(async move {
                        sleep(delay).await;
                        // The game may have shut down while this packet was in flight.
                        let _ = incoming.send(packet);
                    });
                }
            },
        }
    }

    Ok(())
}

const SHUTDOWN_POLLS: u32 = 20;
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Background transport owned by the render loop
pub struct Transport {
    outbox: Outbox,
    incoming: UnboundedReceiver<Packet>,
    handle: Option<JoinHandle<()>>,
}

impl Transport {
    /// Binds a local socket and starts the transport thread.
    pub fn start(server: &str, conditions: NetworkConditions) -> NetcodeResult<Self> {
        let server_addr: SocketAddr = server
            .parse()
            .map_err(|e| NetcodeError::Io(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let socket = runtime.block_on(UdpSocket::bind("0.0.0.0:0"))?;
        info!("Bound {} for server {}", socket.local_addr()?, server_addr);

        let (outbox, outgoing) = Outbox::channel(Role::Client(0));
        let (incoming_tx, incoming) = mpsc::unbounded_channel();

        let handle = std::thread::spawn(move || {
            let result = runtime.block_on(run_transport(
                socket,
                server_addr,
                conditions,
                outgoing,
                incoming_tx,
            ));
            if let Err(e) = result {
                error!("Transport stopped: {}", e);
            }
        });

        Ok(Self {
            outbox,
            incoming,
            handle: Some(handle),
        })
    }

    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    /// Every packet received since the last poll.
    pub fn poll(&mut self) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Ok(packet) = self.incoming.try_recv() {
            packets.push(packet);
        }
        packets
    }

    /// Stops the transport thread and returns whether it was joined.
    ///
    /// The thread ends once every outbox clone is gone and queued packets
    /// like Disconnect have been sent. If the game still holds a clone, the
    /// thread is detached and left to end with the process.
    pub fn shutdown(mut self) -> bool {
        drop(self.outbox);
        let Some(handle) = self.handle.take() else {
            return true;
        };
        for _ in 0..SHUTDOWN_POLLS {
            if handle.is_finished() {
                if handle.join().is_err() {
                    error!("Transport thread panicked");
                }
                return true;
            }
            std::thread::sleep(SHUTDOWN_POLL_INTERVAL);
        }
        debug!(
            "Transport thread still running after {:?}, detaching it",
            SHUTDOWN_POLL_INTERVAL * SHUTDOWN_POLLS
        );
        false
    }
}
