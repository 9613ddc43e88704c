//! Raw Ethernet sockets for Linux.
//!
//! Sends and receives whole frames on one interface, filtered by EtherType,
//! and reports the kernel's software transmit and receive timestamps.
//! [`HandleSet`] waits for readability across several sockets.
//!
//! ```rust,no_run
//! use rawether::{EthernetSocket, HandleSet, MacAddress, mac_address};
//!
//! # fn example() -> rawether::Result<()> {
//! let peer: MacAddress = "01:0c:cd:01:00:01".parse()?;
//!
//! let mut tx = EthernetSocket::open("eth0", Some(peer))?;
//! tx.set_protocol_filter(0x88b8);
//!
//! let mut rx = EthernetSocket::open("eth0", None)?;
//! rx.set_protocol_filter(0x88b8);
//!
//! let mut frame = [0u8; 60];
//! frame[..6].copy_from_slice(&peer.octets());
//! frame[6..12].copy_from_slice(&mac_address("eth0")?.octets());
//! frame[12..14].copy_from_slice(&0x88b8u16.to_be_bytes());
//! let sent_at = tx.send(&frame)?;
//!
//! let mut set = HandleSet::new();
//! set.add(&rx);
//! if set.wait_ready(100)? > 0 {
//!     let mut buf = [0u8; 1518];
//!     let received = rx.receive(&mut buf)?;
//!     println!("{} bytes, tx {:?}, rx {:?}", received.len, sent_at, received.timestamp);
//! }
//! # Ok(())
//! # }
//! ```

#[cfg(not(target_os = "linux"))]
compile_error!("rawether only supports Linux AF_PACKET sockets");

mod config;
mod error;
mod handle_set;
pub mod interface;
mod link;
mod mac;
mod socket;
mod timestamp;

pub use config::{
    DEFAULT_TX_TIMESTAMP_TIMEOUT_MS, MAX_FRAME_LEN, SocketConfig, SocketConfigBuilder,
};
pub use error::{EthernetError, Result};
pub use handle_set::HandleSet;
pub use interface::{PromiscuousMode, enable_promiscuous, interface_index, mac_address};
pub use link::{
    DEFAULT_ETHER_TYPE, ErrorQueueEntry, LinkAddress, LinkIo, SystemLink, UNBOUND_PROTOCOL,
};
pub use mac::{ETH_ALEN, MacAddress};
pub use socket::{EthernetSocket, Received, Role, descriptor_of};
pub use timestamp::Timestamp;
