use std::io;

/// Errors raised while setting up a raw Ethernet socket or querying an interface.
///
/// Per-frame operations (send, receive, wait) report plain [`io::Error`]s instead.
#[derive(Debug, thiserror::Error)]
pub enum EthernetError {
    #[error("failed to create raw socket: {0}")]
    SocketCreate(#[source] io::Error),

    #[error("invalid interface name: {0:?}")]
    InvalidInterfaceName(String),

    #[error("interface '{name}' not found: {source}")]
    InterfaceNotFound {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to update flags of interface '{name}': {source}")]
    InterfaceFlags {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read hardware address of interface '{name}': {source}")]
    HardwareAddress {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid MAC address: {0:?}")]
    InvalidMacAddress(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, EthernetError>;
