use crate::config::{MAX_FRAME_LEN, SocketConfig};
use crate::error::Result;
use crate::interface::{self, PromiscuousMode};
use crate::link::{ErrorQueueEntry, LinkAddress, LinkIo, SystemLink};
use crate::mac::MacAddress;
use crate::timestamp::Timestamp;
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::thread;
use std::time::{Duration, Instant};

/// Pause before polling again when POLLERR fired but the error queue was
/// empty.
const ERROR_QUEUE_BACKOFF: Duration = Duration::from_millis(1);

/// Direction a socket is set up for, decided by whether a destination was
/// given at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Transmitter,
    Receiver,
}

/// Outcome of a non-blocking receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Received {
    /// Bytes written into the caller's buffer; zero when nothing was queued.
    pub len: usize,
    /// Kernel software receive timestamp, if one accompanied the frame.
    pub timestamp: Option<Timestamp>,
}

impl Received {
    pub const EMPTY: Received = Received {
        len: 0,
        timestamp: None,
    };

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A raw Ethernet socket bound to one interface and EtherType.
///
/// Frames are sent to the destination given at open time and received
/// without blocking. The kernel's software timestamps are surfaced for both
/// directions when available; their absence is never reported as an error.
///
/// Operations on one socket must not run concurrently. Distinct sockets may
/// be used from different threads.
pub struct EthernetSocket<L: LinkIo = SystemLink> {
    link: L,
    address: LinkAddress,
    role: Role,
    bound: bool,
    tx_timestamps: bool,
    config: SocketConfig,
    scratch: Vec<u8>,
    promiscuous: Option<PromiscuousMode>,
}

impl EthernetSocket<SystemLink> {
    /// Open a raw socket on `interface` with the default configuration.
    ///
    /// A `destination` makes this a transmitter; without one the socket is
    /// a receiver.
    pub fn open(interface: &str, destination: Option<MacAddress>) -> Result<Self> {
        Self::with_config(interface, destination, &SocketConfig::default())
    }

    pub fn with_config(
        interface: &str,
        destination: Option<MacAddress>,
        config: &SocketConfig,
    ) -> Result<Self> {
        let link = SystemLink::open()?;
        let index = interface::interface_index(interface)?;

        let promiscuous = if config.promiscuous {
            Some(interface::enable_promiscuous(interface)?)
        } else {
            None
        };

        let mut socket = Self::from_link(link, index, destination, config.clone());
        socket.promiscuous = promiscuous;

        tracing::debug!(
            "Opened raw socket fd={} on {} (index {}) as {:?}",
            socket.descriptor(),
            interface,
            index,
            socket.role
        );
        Ok(socket)
    }
}

impl<L: LinkIo> EthernetSocket<L> {
    /// Wrap an already-open link. Requests timestamping for the role's
    /// direction; failure to do so only disables timestamps.
    pub fn from_link(
        mut link: L,
        interface_index: u32,
        destination: Option<MacAddress>,
        config: SocketConfig,
    ) -> Self {
        let role = if destination.is_some() {
            Role::Transmitter
        } else {
            Role::Receiver
        };

        let tx_timestamps = match link.enable_timestamping(role) {
            Ok(()) => role == Role::Transmitter,
            Err(e) => {
                tracing::warn!("Failed to enable SO_TIMESTAMPING: {}", e);
                false
            }
        };

        Self {
            link,
            address: LinkAddress::new(interface_index, destination),
            role,
            bound: false,
            tx_timestamps,
            // A buffer shorter than a frame reads a queued frame as length 0,
            // which drain would take for an empty queue.
            scratch: vec![0u8; config.drain_buffer_len.max(MAX_FRAME_LEN)],
            config,
            promiscuous: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn address(&self) -> &LinkAddress {
        &self.address
    }

    pub fn destination(&self) -> Option<MacAddress> {
        match self.role {
            Role::Transmitter => Some(self.address.destination),
            Role::Receiver => None,
        }
    }

    /// EtherType currently stored in the address record.
    pub fn ether_type(&self) -> u16 {
        self.address.ether_type
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    /// Promiscuous mode this socket enabled, if any.
    pub fn promiscuous(&self) -> Option<&PromiscuousMode> {
        self.promiscuous.as_ref()
    }

    /// Set the EtherType filter.
    ///
    /// The first call binds the socket. Later calls only update the stored
    /// EtherType, which still applies to outgoing frames; the kernel-side
    /// filter keeps the first value. A failed bind is logged and leaves the
    /// socket unbound.
    pub fn set_protocol_filter(&mut self, ether_type: u16) {
        self.address.ether_type = ether_type;

        if self.bound {
            return;
        }

        match self.link.bind(&self.address) {
            Ok(()) => {
                self.bound = true;
                tracing::debug!(
                    "Bound fd={} to ethertype {:#06x}",
                    self.descriptor(),
                    ether_type
                );
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to bind raw socket to ethertype {:#06x}: {}",
                    ether_type,
                    e
                );
            }
        }
    }

    /// Receive one frame without blocking.
    ///
    /// Returns [`Received::EMPTY`] when nothing is queued. Frames longer than
    /// `buf` are truncated.
    pub fn receive(&mut self, buf: &mut [u8]) -> io::Result<Received> {
        self.link.recv(buf)
    }

    /// Discard everything queued for receive. Returns the number of frames
    /// dropped. Errors end the drain early and are only logged.
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        loop {
            match self.link.recv(&mut self.scratch) {
                Ok(received) if received.is_empty() => break,
                Ok(_) => drained += 1,
                Err(e) => {
                    tracing::debug!("Drain stopped on fd={}: {}", self.descriptor(), e);
                    break;
                }
            }
        }
        if drained > 0 {
            tracing::trace!("Drained {} queued frames before send", drained);
        }
        drained
    }

    /// Discard every message waiting on the error queue. Returns how many
    /// were dropped.
    ///
    /// Each frame sent with transmit timestamping enabled leaves a stamp
    /// there; stamps nobody waited for would otherwise be returned for a
    /// later frame.
    pub fn flush_tx_timestamps(&mut self) -> usize {
        let mut flushed = 0;
        loop {
            match self.link.recv_error_queue() {
                Ok(ErrorQueueEntry::Empty) => break,
                Ok(ErrorQueueEntry::Message(_)) => flushed += 1,
                Err(e) => {
                    tracing::debug!("Error queue flush stopped on fd={}: {}", self.descriptor(), e);
                    break;
                }
            }
        }
        if flushed > 0 {
            tracing::trace!("Discarded {} unclaimed transmit timestamps", flushed);
        }
        flushed
    }

    /// Drain the receive queue and hand `frame` to the kernel.
    ///
    /// Draining first keeps a bidirectional socket from reading back the
    /// frame it is about to send. Unclaimed transmit timestamps are dropped
    /// too, so the next one queued belongs to `frame`. Does not wait for a
    /// timestamp.
    pub fn transmit(&mut self, frame: &[u8]) -> io::Result<usize> {
        self.drain();
        if self.tx_timestamps {
            self.flush_tx_timestamps();
        }
        let n = self.link.send_to(frame, &self.address)?;
        if n != frame.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "incomplete frame send",
            ));
        }
        Ok(n)
    }

    /// Wait up to `timeout` for the oldest queued transmit timestamp, which
    /// after [`transmit`](Self::transmit) is the one for the frame it sent.
    ///
    /// Returns `Ok(None)` on timeout or when the kernel delivered no
    /// software stamp. A pending socket error is returned as `Err`.
    pub fn await_tx_timestamp(&mut self, timeout: Duration) -> io::Result<Option<Timestamp>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.link.wait_error_queue(remaining) {
                Ok(false) => return Ok(None),
                Ok(true) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }

            match self.link.recv_error_queue()? {
                ErrorQueueEntry::Message(Some(ts)) => return Ok(Some(ts)),
                ErrorQueueEntry::Message(None) => {}
                ErrorQueueEntry::Empty => thread::sleep(ERROR_QUEUE_BACKOFF.min(remaining)),
            }

            if remaining.is_zero() {
                return Ok(None);
            }
        }
    }

    /// Transmit `frame` and wait for its transmit timestamp.
    ///
    /// The frame counts as sent once the kernel accepted it; a missing
    /// timestamp yields `Ok(None)` and is never retried. Sockets without
    /// transmit timestamping return immediately.
    pub fn send(&mut self, frame: &[u8]) -> io::Result<Option<Timestamp>> {
        self.transmit(frame)?;

        if !self.tx_timestamps {
            return Ok(None);
        }

        match self.await_tx_timestamp(self.config.tx_timestamp_timeout()) {
            Ok(Some(ts)) => Ok(Some(ts)),
            Ok(None) => {
                tracing::trace!(
                    "No transmit timestamp within {}ms",
                    self.config.tx_timestamp_timeout_ms
                );
                Ok(None)
            }
            Err(e) => {
                tracing::debug!("Transmit timestamp read failed: {}", e);
                Ok(None)
            }
        }
    }

    /// Native descriptor, for registering with an external event loop.
    pub fn descriptor(&self) -> RawFd {
        self.link.descriptor()
    }

    /// Close the socket. Equivalent to dropping it.
    pub fn close(self) {}
}

impl<L: LinkIo> AsRawFd for EthernetSocket<L> {
    fn as_raw_fd(&self) -> RawFd {
        self.descriptor()
    }
}

impl<L: LinkIo> Drop for EthernetSocket<L> {
    fn drop(&mut self) {
        let Some(mode) = self.promiscuous.take() else {
            return;
        };
        if !self.config.restore_promiscuous {
            return;
        }
        let name = mode.interface().to_string();
        if let Err(e) = mode.restore() {
            tracing::warn!("Failed to restore promiscuous mode on {}: {}", name, e);
        }
    }
}

/// Descriptor of an optional socket, or -1 when there is none.
pub fn descriptor_of<L: LinkIo>(socket: Option<&EthernetSocket<L>>) -> RawFd {
    socket.map_or(-1, |s| s.descriptor())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Calls observed by a [`ScriptedLink`], in order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Bind(u16),
        EnableTimestamping(Role),
        Recv,
        SendTo(Vec<u8>, MacAddress),
        WaitErrorQueue,
        RecvErrorQueue,
    }

    #[derive(Default)]
    struct Script {
        pub calls: Vec<Call>,
        pub inbound: VecDeque<io::Result<(Vec<u8>, Option<Timestamp>)>>,
        pub bind_results: VecDeque<io::Result<()>>,
        pub timestamping_fails: bool,
        pub error_queue: VecDeque<Option<Timestamp>>,
        /// Stamps queued on the error queue by successive `send_to` calls.
        pub send_stamps: VecDeque<Timestamp>,
        /// Socket error reported by POLLERR once the error queue is empty.
        pub pending_error: Option<i32>,
        /// POLLERR stays raised with nothing to read.
        pub spurious_pollerr: bool,
        pub open_handles: usize,
    }

    /// In-memory link that records calls and replays scripted results.
    struct ScriptedLink {
        pub fd: RawFd,
        pub script: Rc<RefCell<Script>>,
    }

    impl ScriptedLink {
        pub fn new(fd: RawFd) -> (Self, Rc<RefCell<Script>>) {
            let script = Rc::new(RefCell::new(Script::default()));
            script.borrow_mut().open_handles += 1;
            (
                Self {
                    fd,
                    script: script.clone(),
                },
                script,
            )
        }
    }

    impl Drop for ScriptedLink {
        fn drop(&mut self) {
            self.script.borrow_mut().open_handles -= 1;
        }
    }

    impl LinkIo for ScriptedLink {
        fn bind(&mut self, addr: &LinkAddress) -> io::Result<()> {
            let mut script = self.script.borrow_mut();
            script.calls.push(Call::Bind(addr.ether_type));
            script.bind_results.pop_front().unwrap_or(Ok(()))
        }

        fn enable_timestamping(&mut self, role: Role) -> io::Result<()> {
            let mut script = self.script.borrow_mut();
            script.calls.push(Call::EnableTimestamping(role));
            if script.timestamping_fails {
                Err(io::Error::from_raw_os_error(libc::ENOPROTOOPT))
            } else {
                Ok(())
            }
        }

        fn recv(&mut self, buf: &mut [u8]) -> io::Result<Received> {
            let mut script = self.script.borrow_mut();
            script.calls.push(Call::Recv);
            match script.inbound.pop_front() {
                None => Ok(Received::EMPTY),
                Some(Err(e)) => Err(e),
                Some(Ok((frame, timestamp))) => {
                    let len = frame.len().min(buf.len());
                    buf[..len].copy_from_slice(&frame[..len]);
                    Ok(Received { len, timestamp })
                }
            }
        }

        fn send_to(&mut self, frame: &[u8], addr: &LinkAddress) -> io::Result<usize> {
            let mut script = self.script.borrow_mut();
            script
                .calls
                .push(Call::SendTo(frame.to_vec(), addr.destination));
            if let Some(stamp) = script.send_stamps.pop_front() {
                script.error_queue.push_back(Some(stamp));
            }
            Ok(frame.len())
        }

        fn wait_error_queue(&mut self, _timeout: Duration) -> io::Result<bool> {
            let mut script = self.script.borrow_mut();
            script.calls.push(Call::WaitErrorQueue);
            Ok(!script.error_queue.is_empty()
                || script.pending_error.is_some()
                || script.spurious_pollerr)
        }

        fn recv_error_queue(&mut self) -> io::Result<ErrorQueueEntry> {
            let mut script = self.script.borrow_mut();
            script.calls.push(Call::RecvErrorQueue);
            if let Some(entry) = script.error_queue.pop_front() {
                return Ok(ErrorQueueEntry::Message(entry));
            }
            match script.pending_error.take() {
                Some(errno) => Err(io::Error::from_raw_os_error(errno)),
                None => Ok(ErrorQueueEntry::Empty),
            }
        }

        fn descriptor(&self) -> RawFd {
            self.fd
        }
    }

    const DEST: MacAddress = MacAddress([0x01, 0x0c, 0xcd, 0x01, 0x00, 0x01]);

    fn transmitter() -> (EthernetSocket<ScriptedLink>, Rc<RefCell<Script>>) {
        let (link, script) = ScriptedLink::new(42);
        let socket = EthernetSocket::from_link(link, 2, Some(DEST), SocketConfig::default());
        (socket, script)
    }

    fn receiver() -> (EthernetSocket<ScriptedLink>, Rc<RefCell<Script>>) {
        let (link, script) = ScriptedLink::new(43);
        let socket = EthernetSocket::from_link(link, 2, None, SocketConfig::default());
        (socket, script)
    }

    #[test]
    fn destination_selects_role_and_timestamp_direction() {
        let (tx, tx_script) = transmitter();
        assert_eq!(tx.role(), Role::Transmitter);
        assert_eq!(tx.destination(), Some(DEST));
        assert_eq!(
            tx_script.borrow().calls,
            vec![Call::EnableTimestamping(Role::Transmitter)]
        );

        let (rx, rx_script) = receiver();
        assert_eq!(rx.role(), Role::Receiver);
        assert_eq!(rx.destination(), None);
        assert_eq!(rx.address().destination, MacAddress::ZERO);
        assert_eq!(
            rx_script.borrow().calls,
            vec![Call::EnableTimestamping(Role::Receiver)]
        );
    }

    #[test]
    fn first_filter_binds_and_later_filters_only_update() {
        let (mut socket, script) = transmitter();
        script
            .borrow_mut()
            .bind_results
            .extend([Ok(()), Err(io::Error::from_raw_os_error(libc::EINVAL))]);

        socket.set_protocol_filter(0x88b8);
        assert!(socket.is_bound());

        socket.set_protocol_filter(0x88ba);
        assert!(socket.is_bound());
        assert_eq!(socket.ether_type(), 0x88ba);

        let binds: Vec<_> = script
            .borrow()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Bind(_)))
            .cloned()
            .collect();
        assert_eq!(binds, vec![Call::Bind(0x88b8)]);
    }

    #[test]
    fn failed_bind_leaves_socket_unbound_and_retries_next_time() {
        let (mut socket, script) = receiver();
        script
            .borrow_mut()
            .bind_results
            .push_back(Err(io::Error::from_raw_os_error(libc::ENODEV)));

        socket.set_protocol_filter(0x88b8);
        assert!(!socket.is_bound());
        assert_eq!(socket.ether_type(), 0x88b8);

        socket.set_protocol_filter(0x88b8);
        assert!(socket.is_bound());
    }

    #[test]
    fn receive_reports_length_and_timestamp() {
        let (mut socket, script) = receiver();
        let stamp = Timestamp::from_nanos(1_234);
        script
            .borrow_mut()
            .inbound
            .push_back(Ok((vec![0xab; 60], Some(stamp))));

        let mut buf = [0u8; 1518];
        let received = socket.receive(&mut buf).unwrap();
        assert_eq!(received.len, 60);
        assert_eq!(received.timestamp, Some(stamp));
        assert!(buf[..60].iter().all(|b| *b == 0xab));
    }

    #[test]
    fn receive_with_nothing_queued_is_empty_not_error() {
        let (mut socket, _script) = receiver();
        let mut buf = [0u8; 64];
        let received = socket.receive(&mut buf).unwrap();
        assert!(received.is_empty());
        assert_eq!(received.timestamp, None);
    }

    #[test]
    fn receive_without_timestamp_is_absent_not_zero() {
        let (mut socket, script) = receiver();
        script.borrow_mut().inbound.push_back(Ok((vec![1; 14], None)));
        let mut buf = [0u8; 64];
        let received = socket.receive(&mut buf).unwrap();
        assert_eq!(received.len, 14);
        assert_eq!(received.timestamp, None);
    }

    #[test]
    fn receive_surfaces_os_errors() {
        let (mut socket, script) = receiver();
        script
            .borrow_mut()
            .inbound
            .push_back(Err(io::Error::from_raw_os_error(libc::ENETDOWN)));
        let mut buf = [0u8; 64];
        assert!(socket.receive(&mut buf).is_err());
    }

    #[test]
    fn send_drains_then_transmits_then_awaits_timestamp() {
        let (mut socket, script) = transmitter();
        let stamp = Timestamp::from_nanos(99);
        {
            let mut s = script.borrow_mut();
            s.inbound.push_back(Ok((vec![9; 60], None)));
            s.inbound.push_back(Ok((vec![8; 60], None)));
            s.send_stamps.push_back(stamp);
            s.calls.clear();
        }

        let frame = vec![0x5a; 60];
        assert_eq!(socket.send(&frame).unwrap(), Some(stamp));

        assert_eq!(
            script.borrow().calls,
            vec![
                Call::Recv,
                Call::Recv,
                Call::Recv,
                Call::RecvErrorQueue,
                Call::SendTo(frame, DEST),
                Call::WaitErrorQueue,
                Call::RecvErrorQueue,
            ]
        );
    }

    #[test]
    fn send_returns_its_own_stamp_after_unawaited_transmits() {
        let (mut socket, script) = transmitter();
        script.borrow_mut().send_stamps.extend([
            Timestamp::from_nanos(100),
            Timestamp::from_nanos(200),
            Timestamp::from_nanos(300),
        ]);

        socket.transmit(&[0u8; 60]).unwrap();
        socket.transmit(&[0u8; 60]).unwrap();
        assert_eq!(
            socket.send(&[0u8; 60]).unwrap(),
            Some(Timestamp::from_nanos(300))
        );
        assert!(script.borrow().error_queue.is_empty());
    }

    #[test]
    fn flush_discards_every_queued_stamp() {
        let (mut socket, script) = transmitter();
        script
            .borrow_mut()
            .error_queue
            .extend([Some(Timestamp::from_nanos(1)), None, Some(Timestamp::from_nanos(2))]);

        assert_eq!(socket.flush_tx_timestamps(), 3);
        assert_eq!(socket.flush_tx_timestamps(), 0);
    }

    #[test]
    fn await_backs_off_when_pollerr_has_nothing_queued() {
        let (mut socket, script) = transmitter();
        script.borrow_mut().spurious_pollerr = true;

        let start = Instant::now();
        let ts = socket
            .await_tx_timestamp(Duration::from_millis(30))
            .unwrap();
        assert_eq!(ts, None);
        assert!(start.elapsed() >= Duration::from_millis(30));

        let waits = script
            .borrow()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::WaitErrorQueue))
            .count();
        assert!(waits < 50, "polled {waits} times in 30ms");
    }

    #[test]
    fn pending_socket_error_ends_wait_early() {
        let (mut socket, script) = transmitter();
        script.borrow_mut().pending_error = Some(libc::ENETDOWN);

        let start = Instant::now();
        let err = socket
            .await_tx_timestamp(Duration::from_millis(500))
            .unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENETDOWN));
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn send_without_timestamp_still_succeeds() {
        let config = SocketConfig::builder()
            .tx_timestamp_timeout(Duration::from_millis(5))
            .build();
        let (link, script) = ScriptedLink::new(42);
        let mut socket = EthernetSocket::from_link(link, 2, Some(DEST), config);

        assert_eq!(socket.send(&[0u8; 60]).unwrap(), None);
        assert!(
            script
                .borrow()
                .calls
                .iter()
                .any(|c| matches!(c, Call::SendTo(..)))
        );
    }

    #[test]
    fn send_skips_wait_when_timestamping_could_not_be_enabled() {
        let (link, script) = ScriptedLink::new(42);
        script.borrow_mut().timestamping_fails = true;
        let mut socket = EthernetSocket::from_link(link, 2, Some(DEST), SocketConfig::default());
        script.borrow_mut().error_queue.push_back(Some(Timestamp::from_nanos(1)));

        let start = Instant::now();
        assert_eq!(socket.send(&[0u8; 60]).unwrap(), None);
        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(
            !script
                .borrow()
                .calls
                .iter()
                .any(|c| matches!(c, Call::WaitErrorQueue))
        );
    }

    #[test]
    fn await_skips_error_messages_without_stamp() {
        let (mut socket, script) = transmitter();
        let stamp = Timestamp::from_nanos(7);
        script.borrow_mut().error_queue.extend([None, Some(stamp)]);

        let ts = socket
            .await_tx_timestamp(Duration::from_millis(100))
            .unwrap();
        assert_eq!(ts, Some(stamp));
    }

    #[test]
    fn transmit_does_not_wait_for_timestamp() {
        let (mut socket, script) = transmitter();
        script.borrow_mut().calls.clear();

        assert_eq!(socket.transmit(&[1, 2, 3]).unwrap(), 3);
        assert_eq!(
            script.borrow().calls,
            vec![
                Call::Recv,
                Call::RecvErrorQueue,
                Call::SendTo(vec![1, 2, 3], DEST),
            ]
        );
    }

    #[test]
    fn receiver_transmit_leaves_error_queue_alone() {
        let (mut socket, script) = receiver();
        script.borrow_mut().calls.clear();

        socket.transmit(&[1, 2, 3]).unwrap();
        assert!(
            !script
                .borrow()
                .calls
                .iter()
                .any(|c| matches!(c, Call::RecvErrorQueue))
        );
    }

    #[test]
    fn drain_stops_on_error() {
        let (mut socket, script) = receiver();
        {
            let mut s = script.borrow_mut();
            s.inbound.push_back(Ok((vec![1; 60], None)));
            s.inbound
                .push_back(Err(io::Error::from_raw_os_error(libc::ENETDOWN)));
            s.inbound.push_back(Ok((vec![2; 60], None)));
        }
        assert_eq!(socket.drain(), 1);
        assert_eq!(script.borrow().inbound.len(), 1);
    }

    #[test]
    fn zero_drain_buffer_still_empties_queue() {
        let config = SocketConfig::builder().drain_buffer_len(0).build();
        let (link, script) = ScriptedLink::new(43);
        let mut socket = EthernetSocket::from_link(link, 2, None, config);
        script
            .borrow_mut()
            .inbound
            .extend((0..3).map(|i| Ok((vec![i; 60], None))));

        assert_eq!(socket.drain(), 3);
        assert!(script.borrow().inbound.is_empty());
    }

    #[test]
    fn close_releases_native_handle() {
        let (socket, script) = transmitter();
        assert_eq!(script.borrow().open_handles, 1);
        socket.close();
        assert_eq!(script.borrow().open_handles, 0);
    }

    #[test]
    fn descriptor_of_absent_socket_is_minus_one() {
        let (socket, _script) = transmitter();
        assert_eq!(descriptor_of(Some(&socket)), 42);
        assert_eq!(socket.as_raw_fd(), 42);
        assert_eq!(descriptor_of::<ScriptedLink>(None), -1);
    }

    #[test]
    fn open_on_unknown_interface_is_recoverable() {
        match EthernetSocket::open("rawether-nope0", None) {
            Err(crate::EthernetError::InterfaceNotFound { name, .. }) => {
                assert_eq!(name, "rawether-nope0")
            }
            Err(crate::EthernetError::SocketCreate(e)) => {
                eprintln!("Skipping: raw sockets unavailable: {e}");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("opened a socket on a nonexistent interface"),
        }
    }
}
