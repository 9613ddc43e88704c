//! Interface queries and interface-wide mode changes.
//!
//! Every call here opens a short-lived `AF_INET` datagram socket purely as an
//! ioctl handle and closes it before returning. Resolving an index never
//! touches interface state; promiscuous mode is a separate, explicit action
//! because it is host-wide and outlives any socket that enabled it.
//!
//! Promiscuous mode is reference counted per interface across the process.
//! The flag is cleared only once the last holder is gone, and only if this
//! process set it and a holder asked for it to be restored.

use crate::error::{EthernetError, Result};
use crate::mac::{ETH_ALEN, MacAddress};
use socket2::{Domain, Socket, Type};
use std::collections::HashMap;
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, RawFd};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

/// Global registry of promiscuous-mode holders.
static HOLDERS: OnceLock<Mutex<HolderTable>> = OnceLock::new();

fn holder_table() -> MutexGuard<'static, HolderTable> {
    HOLDERS
        .get_or_init(|| Mutex::new(HolderTable::default()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct Holders {
    count: usize,
    /// The flag was clear until the first holder set it.
    set_here: bool,
    restore_requested: bool,
}

/// Live [`PromiscuousMode`] records, keyed by interface name.
#[derive(Debug, Default)]
struct HolderTable {
    interfaces: HashMap<String, Holders>,
}

impl HolderTable {
    fn is_held(&self, name: &str) -> bool {
        self.interfaces.contains_key(name)
    }

    /// Add a holder. `set_here` only counts for the first one.
    fn acquire(&mut self, name: &str, set_here: bool) {
        let holders = self.interfaces.entry(name.to_string()).or_default();
        if holders.count == 0 {
            holders.set_here = set_here;
        }
        holders.count += 1;
    }

    /// Remove a holder. Returns true when it was the last one and the flag
    /// should now be cleared.
    fn release(&mut self, name: &str, restore: bool) -> bool {
        let Some(holders) = self.interfaces.get_mut(name) else {
            return false;
        };
        holders.restore_requested |= restore;
        holders.count = holders.count.saturating_sub(1);
        if holders.count > 0 {
            return false;
        }
        match self.interfaces.remove(name) {
            Some(holders) => holders.set_here && holders.restore_requested,
            None => false,
        }
    }
}

/// Throwaway socket used to issue interface ioctls.
struct ControlSocket {
    socket: Socket,
}

impl ControlSocket {
    fn open() -> Result<Self> {
        let socket =
            Socket::new(Domain::IPV4, Type::DGRAM, None).map_err(EthernetError::SocketCreate)?;
        Ok(Self { socket })
    }

    fn fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

fn ifreq_for(name: &str) -> Result<libc::ifreq> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() >= libc::IFNAMSIZ || bytes.contains(&0) {
        return Err(EthernetError::InvalidInterfaceName(name.to_string()));
    }

    // SAFETY: ifreq is plain old data; all-zero is a valid value.
    let mut ifr: libc::ifreq = unsafe { mem::zeroed() };
    for (dst, src) in ifr.ifr_name.iter_mut().zip(bytes) {
        *dst = *src as libc::c_char;
    }
    Ok(ifr)
}

fn check(ret: libc::c_int) -> io::Result<()> {
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn read_flags(control: &ControlSocket, name: &str) -> Result<libc::c_short> {
    let mut ifr = ifreq_for(name)?;
    // SAFETY: SIOCGIFFLAGS writes ifru_flags of the ifreq we own.
    check(unsafe { libc::ioctl(control.fd(), libc::SIOCGIFFLAGS, &mut ifr) }).map_err(
        |source| EthernetError::InterfaceFlags {
            name: name.to_string(),
            source,
        },
    )?;
    // SAFETY: the kernel filled the flags member.
    Ok(unsafe { ifr.ifr_ifru.ifru_flags })
}

fn write_flags(control: &ControlSocket, name: &str, flags: libc::c_short) -> Result<()> {
    let mut ifr = ifreq_for(name)?;
    ifr.ifr_ifru.ifru_flags = flags;
    // SAFETY: SIOCSIFFLAGS only reads the ifreq we own.
    check(unsafe { libc::ioctl(control.fd(), libc::SIOCSIFFLAGS, &mut ifr) }).map_err(|source| {
        EthernetError::InterfaceFlags {
            name: name.to_string(),
            source,
        }
    })
}

fn set_promiscuous(name: &str, enable: bool) -> Result<bool> {
    let control = ControlSocket::open()?;
    let flags = read_flags(&control, name)?;
    let promisc = libc::IFF_PROMISC as libc::c_short;
    let was_enabled = flags & promisc != 0;

    if was_enabled != enable {
        let flags = if enable { flags | promisc } else { flags & !promisc };
        write_flags(&control, name, flags)?;
    }

    Ok(was_enabled)
}

/// Resolve an interface name to its kernel index.
pub fn interface_index(name: &str) -> Result<u32> {
    let control = ControlSocket::open()?;
    let mut ifr = ifreq_for(name)?;

    // SAFETY: SIOCGIFINDEX writes ifru_ifindex of the ifreq we own.
    check(unsafe { libc::ioctl(control.fd(), libc::SIOCGIFINDEX, &mut ifr) }).map_err(
        |source| EthernetError::InterfaceNotFound {
            name: name.to_string(),
            source,
        },
    )?;

    // SAFETY: the kernel filled the index member.
    let index = unsafe { ifr.ifr_ifru.ifru_ifindex };
    tracing::debug!("Resolved interface {} to index {}", name, index);
    Ok(index as u32)
}

/// Put an interface into promiscuous mode.
///
/// Each returned record holds the mode until it is dropped or
/// [`restore`](PromiscuousMode::restore)d. When the last holder on the
/// interface goes away, the flag is cleared if this process set it and any
/// holder called `restore`.
pub fn enable_promiscuous(name: &str) -> Result<PromiscuousMode> {
    let mut holders = holder_table();
    let was_enabled = if holders.is_held(name) {
        true
    } else {
        set_promiscuous(name, true)?
    };
    holders.acquire(name, !was_enabled);

    if was_enabled {
        tracing::debug!("Interface {} already in promiscuous mode", name);
    } else {
        tracing::debug!("Enabled promiscuous mode on {}", name);
    }

    Ok(PromiscuousMode {
        interface: name.to_string(),
        was_enabled,
        held: true,
    })
}

/// Read the hardware address of an interface.
pub fn mac_address(name: &str) -> Result<MacAddress> {
    let control = ControlSocket::open()?;
    let mut ifr = ifreq_for(name)?;

    // SAFETY: SIOCGIFHWADDR writes ifru_hwaddr of the ifreq we own.
    check(unsafe { libc::ioctl(control.fd(), libc::SIOCGIFHWADDR, &mut ifr) }).map_err(
        |source| EthernetError::HardwareAddress {
            name: name.to_string(),
            source,
        },
    )?;

    // SAFETY: the kernel filled the hardware address member.
    let data = unsafe { ifr.ifr_ifru.ifru_hwaddr.sa_data };
    let mut mac = [0u8; ETH_ALEN];
    for (dst, src) in mac.iter_mut().zip(data.iter()) {
        *dst = *src as u8;
    }
    Ok(MacAddress(mac))
}

/// Hold on promiscuous mode taken by [`enable_promiscuous`].
#[derive(Debug)]
pub struct PromiscuousMode {
    interface: String,
    was_enabled: bool,
    held: bool,
}

impl PromiscuousMode {
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Whether the interface was already promiscuous before we touched it.
    pub fn was_already_enabled(&self) -> bool {
        self.was_enabled
    }

    /// Release this hold and ask for the flag to be cleared.
    ///
    /// The flag is left set while other holders on the interface remain, and
    /// for good if it was already set before this process enabled it.
    pub fn restore(mut self) -> Result<()> {
        self.release(true)
    }

    fn release(&mut self, restore: bool) -> Result<()> {
        if !self.held {
            return Ok(());
        }
        self.held = false;

        let mut holders = holder_table();
        if holders.release(&self.interface, restore) {
            set_promiscuous(&self.interface, false)?;
            tracing::debug!("Restored promiscuous mode on {}", self.interface);
        }
        Ok(())
    }
}

impl Drop for PromiscuousMode {
    fn drop(&mut self) {
        if let Err(e) = self.release(false) {
            tracing::warn!(
                "Failed to restore promiscuous mode on {}: {}",
                self.interface,
                e
            );
        }
    }
}
