use crate::protocol::EntityId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetcodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Packet codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Unknown entity {0}")]
    UnknownEntity(EntityId),

    #[error("Message channel closed")]
    ChannelClosed,
}

pub type NetcodeResult<T> = Result<T, NetcodeError>;
