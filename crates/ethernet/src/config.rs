use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest untagged Ethernet frame including the header and FCS.
pub const MAX_FRAME_LEN: usize = 1518;

/// Default ceiling on waiting for a transmit timestamp after a send.
pub const DEFAULT_TX_TIMESTAMP_TIMEOUT_MS: u64 = 500;

/// Options applied when opening an [`EthernetSocket`](crate::EthernetSocket).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    /// Put the interface into promiscuous mode on open.
    /// Default: true
    pub promiscuous: bool,
    /// Ask for promiscuous mode to be cleared when the socket is dropped.
    /// The flag goes once no socket in the process holds it, and only if
    /// this process set it.
    /// Default: false
    pub restore_promiscuous: bool,
    /// How long `send` waits for the kernel's transmit timestamp.
    /// Default: 500
    pub tx_timestamp_timeout_ms: u64,
    /// Scratch buffer size used when draining queued frames before a send.
    /// Values below `MAX_FRAME_LEN` are raised to it.
    /// Default: 1518
    pub drain_buffer_len: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            promiscuous: true,
            restore_promiscuous: false,
            tx_timestamp_timeout_ms: DEFAULT_TX_TIMESTAMP_TIMEOUT_MS,
            drain_buffer_len: MAX_FRAME_LEN,
        }
    }
}

impl SocketConfig {
    pub fn builder() -> SocketConfigBuilder {
        SocketConfigBuilder::default()
    }

    pub fn tx_timestamp_timeout(&self) -> Duration {
        Duration::from_millis(self.tx_timestamp_timeout_ms)
    }
}

/// Builder for SocketConfig.
#[derive(Debug, Clone, Default)]
pub struct SocketConfigBuilder {
    config: SocketConfig,
}

impl SocketConfigBuilder {
    pub fn promiscuous(mut self, enabled: bool) -> Self {
        self.config.promiscuous = enabled;
        self
    }

    pub fn restore_promiscuous(mut self, restore: bool) -> Self {
        self.config.restore_promiscuous = restore;
        self
    }

    pub fn tx_timestamp_timeout(mut self, timeout: Duration) -> Self {
        self.config.tx_timestamp_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn drain_buffer_len(mut self, len: usize) -> Self {
        self.config.drain_buffer_len = len;
        self
    }

    pub fn build(self) -> SocketConfig {
        self.config
    }
}
