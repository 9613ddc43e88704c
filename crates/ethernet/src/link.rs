//! OS calls issued by an [`EthernetSocket`](crate::EthernetSocket).
//!
//! [`LinkIo`] is the seam between the socket's frame logic and the kernel.
//! [`SystemLink`] is the `AF_PACKET` implementation; tests substitute a
//! scripted one.

use crate::error::{EthernetError, Result};
use crate::mac::{ETH_ALEN, MacAddress};
use crate::socket::{Received, Role};
use crate::timestamp::Timestamp;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, RawFd};
use std::ptr;
use std::time::Duration;

/// Protocol the raw socket is opened with. No frame carries this EtherType,
/// so nothing is queued until a protocol filter binds the socket.
pub const UNBOUND_PROTOCOL: u16 = 0xffff;

/// Protocol stored in the address record until a filter is applied.
pub const DEFAULT_ETHER_TYPE: u16 = libc::ETH_P_IP as u16;

/// Room for one `scm_timestamping` message plus the extended error record
/// that accompanies looped-back transmit timestamps.
const CONTROL_LEN: usize = 512;

/// Result of one non-blocking read from the socket's error queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorQueueEntry {
    /// Nothing was queued.
    Empty,
    /// One message was dequeued, with the software transmit stamp it
    /// carried, if any.
    Message(Option<Timestamp>),
}

/// Link-layer address record (`sockaddr_ll`) used to bind and to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkAddress {
    /// EtherType in host byte order.
    pub ether_type: u16,
    pub interface_index: u32,
    pub packet_type: u8,
    /// Destination for outgoing frames; all-zero for receivers.
    pub destination: MacAddress,
}

impl LinkAddress {
    pub fn new(interface_index: u32, destination: Option<MacAddress>) -> Self {
        Self {
            ether_type: DEFAULT_ETHER_TYPE,
            interface_index,
            packet_type: libc::PACKET_OTHERHOST,
            destination: destination.unwrap_or(MacAddress::ZERO),
        }
    }

    pub fn to_sockaddr(&self) -> libc::sockaddr_ll {
        let mut sll_addr = [0u8; 8];
        sll_addr[..ETH_ALEN].copy_from_slice(&self.destination.octets());

        libc::sockaddr_ll {
            sll_family: libc::AF_PACKET as u16,
            sll_protocol: self.ether_type.to_be(),
            sll_ifindex: self.interface_index as i32,
            sll_hatype: libc::ARPHRD_ETHER,
            sll_pkttype: self.packet_type,
            sll_halen: ETH_ALEN as u8,
            sll_addr,
        }
    }
}

/// The kernel operations a raw Ethernet socket needs.
pub trait LinkIo {
    /// Bind to the protocol and interface in `addr`.
    fn bind(&mut self, addr: &LinkAddress) -> io::Result<()>;

    /// Request software timestamps for the direction `role` uses.
    fn enable_timestamping(&mut self, role: Role) -> io::Result<()>;

    /// Non-blocking receive. A zero length means nothing is queued.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<Received>;

    /// Hand one frame to the kernel, returning the bytes accepted.
    fn send_to(&mut self, frame: &[u8], addr: &LinkAddress) -> io::Result<usize>;

    /// Block until the socket raises POLLERR or `timeout` elapses. POLLERR
    /// means a queued message or a pending socket error. Returns false on
    /// timeout.
    fn wait_error_queue(&mut self, timeout: Duration) -> io::Result<bool>;

    /// Non-blocking read of one error-queue message. A pending socket error
    /// with nothing queued is returned as `Err`, which also clears it.
    fn recv_error_queue(&mut self) -> io::Result<ErrorQueueEntry>;

    /// Native descriptor, for external event loops.
    fn descriptor(&self) -> RawFd;
}

/// `AF_PACKET`/`SOCK_RAW` socket owned by this process.
#[derive(Debug)]
pub struct SystemLink {
    socket: Socket,
}

impl SystemLink {
    /// Open a raw packet socket.
    ///
    /// Needs `CAP_NET_RAW`; otherwise the kernel refuses with `EPERM`.
    pub fn open() -> Result<Self> {
        let protocol = Protocol::from(UNBOUND_PROTOCOL.to_be() as libc::c_int);
        let socket = Socket::new(Domain::PACKET, Type::RAW, Some(protocol))
            .map_err(EthernetError::SocketCreate)?;
        Ok(Self { socket })
    }

    fn fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

impl LinkIo for SystemLink {
    fn bind(&mut self, addr: &LinkAddress) -> io::Result<()> {
        let sll = addr.to_sockaddr();
        // SAFETY: `sll` is a valid sockaddr_ll for the duration of the call.
        let ret = unsafe {
            libc::bind(
                self.fd(),
                ptr::addr_of!(sll).cast::<libc::sockaddr>(),
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn enable_timestamping(&mut self, role: Role) -> io::Result<()> {
        let flags: libc::c_uint = match role {
            Role::Transmitter => {
                libc::SOF_TIMESTAMPING_TX_SOFTWARE | libc::SOF_TIMESTAMPING_SOFTWARE
            }
            Role::Receiver => libc::SOF_TIMESTAMPING_RX_SOFTWARE | libc::SOF_TIMESTAMPING_SOFTWARE,
        };
        let flags = flags as libc::c_int;
        // SAFETY: SO_TIMESTAMPING takes an int-sized flag set.
        let ret = unsafe {
            libc::setsockopt(
                self.fd(),
                libc::SOL_SOCKET,
                libc::SO_TIMESTAMPING,
                ptr::addr_of!(flags).cast::<libc::c_void>(),
                mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<Received> {
        match recv_msg(self.fd(), buf, libc::MSG_DONTWAIT) {
            Ok((len, timestamp)) => Ok(Received { len, timestamp }),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(Received::EMPTY),
            Err(e) => Err(e),
        }
    }

    fn send_to(&mut self, frame: &[u8], addr: &LinkAddress) -> io::Result<usize> {
        let sll = addr.to_sockaddr();
        // SAFETY: `frame` and `sll` outlive the call.
        let n = unsafe {
            libc::sendto(
                self.fd(),
                frame.as_ptr().cast::<libc::c_void>(),
                frame.len(),
                0,
                ptr::addr_of!(sll).cast::<libc::sockaddr>(),
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    fn wait_error_queue(&mut self, timeout: Duration) -> io::Result<bool> {
        // POLLERR is reported regardless of the requested events, so asking
        // for none keeps ordinary inbound frames from waking us.
        let mut pfd = libc::pollfd {
            fd: self.fd(),
            events: 0,
            revents: 0,
        };
        let timeout_ms = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
        // SAFETY: one valid pollfd.
        let ret = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(ret > 0)
    }

    fn recv_error_queue(&mut self) -> io::Result<ErrorQueueEntry> {
        let mut echo = [0u8; 64];
        match recv_msg(self.fd(), &mut echo, libc::MSG_ERRQUEUE | libc::MSG_DONTWAIT) {
            Ok((_, timestamp)) => Ok(ErrorQueueEntry::Message(timestamp)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                // POLLERR also fires for a pending sk_err; reading SO_ERROR
                // clears it so the next poll does not wake straight away.
                match self.socket.take_error()? {
                    Some(pending) => Err(pending),
                    None => Ok(ErrorQueueEntry::Empty),
                }
            }
            Err(e) => Err(e),
        }
    }

    fn descriptor(&self) -> RawFd {
        self.fd()
    }
}

/// Control buffer aligned for `cmsghdr`.
#[repr(C, align(8))]
struct ControlBuffer([u8; CONTROL_LEN]);

fn recv_msg(fd: RawFd, buf: &mut [u8], flags: libc::c_int) -> io::Result<(usize, Option<Timestamp>)> {
    let mut iov = libc::iovec {
        iov_base: buf.as_mut_ptr().cast::<libc::c_void>(),
        iov_len: buf.len(),
    };
    let mut control = ControlBuffer([0; CONTROL_LEN]);

    // SAFETY: msghdr is plain old data; all-zero is a valid value.
    let mut msg: libc::msghdr = unsafe { mem::zeroed() };
    msg.msg_iov = &mut iov;
    msg.msg_iovlen = 1;
    msg.msg_control = control.0.as_mut_ptr().cast::<libc::c_void>();
    msg.msg_controllen = CONTROL_LEN as _;

    // SAFETY: iov and control point at buffers that live across the call.
    let n = unsafe { libc::recvmsg(fd, &mut msg, flags) };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: recvmsg filled msg_control/msg_controllen.
    let timestamp = unsafe { software_timestamp(&msg) };
    Ok((n as usize, timestamp))
}

/// Find the software stamp in an `SCM_TIMESTAMPING` control message.
///
/// # Safety
///
/// `msg` must have been filled in by a successful `recvmsg`.
unsafe fn software_timestamp(msg: &libc::msghdr) -> Option<Timestamp> {
    // SAFETY: the caller guarantees a kernel-populated control buffer; the
    // CMSG_* walkers never step past msg_controllen.
    unsafe {
        let mut cmsg = libc::CMSG_FIRSTHDR(msg);
        while !cmsg.is_null() {
            if (*cmsg).cmsg_level == libc::SOL_SOCKET && (*cmsg).cmsg_type == libc::SO_TIMESTAMPING
            {
                // scm_timestamping: ts[0] is the software stamp.
                let ts = ptr::read_unaligned(libc::CMSG_DATA(cmsg).cast::<libc::timespec>());
                if ts.tv_sec == 0 && ts.tv_nsec == 0 {
                    return None;
                }
                return Some(Timestamp::from_timespec(&ts));
            }
            cmsg = libc::CMSG_NXTHDR(msg, cmsg);
        }
    }
    None
}
