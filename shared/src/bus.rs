//! Typed message bus between the simulation and the transport.
//!
//! Simulation code never talks to sockets directly. It posts `Envelope`s that
//! name their recipient explicitly (the server, the owner of one entity, or
//! every client) and the transport task routes them.

use crate::error::{NetcodeError, NetcodeResult};
use crate::protocol::{EntityId, Packet};
use log::error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Server,
    /// Unicast to the client that owns this entity.
    Owner(EntityId),
    /// Broadcast to every connected client.
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub sender: Role,
    pub recipient: Recipient,
    pub packet: Packet,
}

impl Envelope {
    /// True if a client owning `entity` should receive this envelope.
    pub fn reaches(&self, entity: EntityId) -> bool {
        match self.recipient {
            Recipient::All => true,
            Recipient::Owner(owner) => owner == entity,
            Recipient::Server => false,
        }
    }
}

/// Sending half of the bus, stamped with the sender's role.
#[derive(Debug, Clone)]
pub struct Outbox {
    role: Role,
    tx: UnboundedSender<Envelope>,
}

impl Outbox {
    pub fn channel(role: Role) -> (Outbox, UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Outbox { role, tx }, rx)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Same channel, stamped with a different sender role.
    pub fn with_role(&self, role: Role) -> Outbox {
        Outbox {
            role,
            tx: self.tx.clone(),
        }
    }

    pub fn send(&self, recipient: Recipient, packet: Packet) -> NetcodeResult<()> {
        self.tx
            .send(Envelope {
                sender: self.role,
                recipient,
                packet,
            })
            .map_err(|_| NetcodeError::ChannelClosed)
    }

    pub fn to_server(&self, packet: Packet) {
        self.post(Recipient::Server, packet);
    }

    pub fn unicast(&self, owner: EntityId, packet: Packet) {
        self.post(Recipient::Owner(owner), packet);
    }

    pub fn broadcast(&self, packet: Packet) {
        self.post(Recipient::All, packet);
    }

    fn post(&self, recipient: Recipient, packet: Packet) {
        let kind = packet.kind();
        if let Err(e) = self.send(recipient, packet) {
            error!("Failed to queue {} packet for {:?}: {}", kind, recipient, e);
        }
    }
}

/// Collects everything currently queued without waiting.
pub fn drain(rx: &mut UnboundedReceiver<Envelope>) -> Vec<Envelope> {
    let mut envelopes = Vec::new();
    while let Ok(envelope) = rx.try_recv() {
        envelopes.push(envelope);
    }
    envelopes
}
