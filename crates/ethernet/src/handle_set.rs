//! Readiness multiplexing over several raw sockets.

use std::fmt;
use std::io;
use std::os::fd::{AsRawFd, RawFd};

/// A set of descriptors watched for readability with `poll(2)`.
///
/// Members are kept in insertion order. Adding the same socket twice adds
/// it twice; callers are expected not to.
#[derive(Default)]
pub struct HandleSet {
    handles: Vec<libc::pollfd>,
}

impl HandleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            handles: Vec::with_capacity(capacity),
        }
    }

    /// Watch `socket` for readability.
    pub fn add<S: AsRawFd + ?Sized>(&mut self, socket: &S) {
        self.add_fd(socket.as_raw_fd());
    }

    pub fn add_fd(&mut self, fd: RawFd) {
        self.handles.push(libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        });
    }

    /// Stop watching `socket`. Does nothing if it is not a member.
    pub fn remove<S: AsRawFd + ?Sized>(&mut self, socket: &S) {
        self.remove_fd(socket.as_raw_fd());
    }

    pub fn remove_fd(&mut self, fd: RawFd) {
        if let Some(pos) = self.handles.iter().position(|h| h.fd == fd) {
            self.handles.remove(pos);
        }
    }

    pub fn contains_fd(&self, fd: RawFd) -> bool {
        self.handles.iter().any(|h| h.fd == fd)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Descriptors in insertion order.
    pub fn fds(&self) -> impl Iterator<Item = RawFd> + '_ {
        self.handles.iter().map(|h| h.fd)
    }

    /// Wait up to `timeout_ms` for any member to become readable and return
    /// how many are. Zero polls once without blocking; a timeout yields 0.
    pub fn wait_ready(&mut self, timeout_ms: u32) -> io::Result<usize> {
        let timeout = timeout_ms.min(libc::c_int::MAX as u32) as libc::c_int;
        self.poll(timeout)
    }

    /// Like [`wait_ready`](Self::wait_ready), but returns the readable
    /// descriptors themselves, in insertion order.
    pub fn ready(&mut self, timeout_ms: u32) -> io::Result<Vec<RawFd>> {
        let count = self.wait_ready(timeout_ms)?;
        let mut ready = Vec::with_capacity(count);
        ready.extend(
            self.handles
                .iter()
                .filter(|h| h.revents & (libc::POLLIN | libc::POLLERR | libc::POLLHUP) != 0)
                .map(|h| h.fd),
        );
        Ok(ready)
    }

    fn poll(&mut self, timeout: libc::c_int) -> io::Result<usize> {
        for h in &mut self.handles {
            h.revents = 0;
        }
        // SAFETY: the pointer and length describe our own pollfd buffer.
        let ret = unsafe {
            libc::poll(
                self.handles.as_mut_ptr(),
                self.handles.len() as libc::nfds_t,
                timeout,
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(ret as usize)
    }
}

impl fmt::Debug for HandleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.fds()).finish()
    }
}
