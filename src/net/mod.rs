//! Sending and receiving datagrams.
//!
//! The resolver context doesn’t perform any I/O of its own. Instead, it
//! asks a [`Transport`] for datagram sockets whenever it needs one and
//! then uses these through the [`DgramSocket`] trait. All operations are
//! expected to be non-blocking: a socket that has nothing to read returns
//! an error of kind [`io::ErrorKind::WouldBlock`].
//!
//! Two implementations are provided. [`udp::UdpTransport`] uses
//! non-blocking standard library sockets and is suitable for hosts that
//! run their own event loop. With the `tokio` feature,
//! [`driver::TokioTransport`] registers the sockets with a Tokio runtime
//! and [`driver::run`] drives a context to completion.

use core::task::{Context, Poll};
use std::boxed::Box;
use std::io;
use std::net::SocketAddr;

pub mod udp;

#[cfg(feature = "tokio")]
pub mod driver;

//------------ Family --------------------------------------------------------

/// The address family of a socket.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Family {
    /// IPv4.
    V4,

    /// IPv6.
    V6,
}

impl Family {
    /// Returns the family of a socket address.
    pub fn of(addr: &SocketAddr) -> Self {
        if addr.is_ipv4() {
            Family::V4
        } else {
            Family::V6
        }
    }

    /// Returns the wildcard address with port 0 for the family.
    pub fn unspecified(self) -> SocketAddr {
        match self {
            Family::V4 => ([0u8; 4], 0).into(),
            Family::V6 => ([0u16; 8], 0).into(),
        }
    }
}

//------------ Transport -----------------------------------------------------

/// A factory for datagram sockets.
pub trait Transport {
    /// Binds a new socket of the given family to a random local port.
    ///
    /// If `buffer_size` is given, it is used for both the send and the
    /// receive buffer of the socket.
    fn bind(
        &mut self,
        family: Family,
        buffer_size: Option<usize>,
    ) -> io::Result<Box<dyn DgramSocket>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn bind(
        &mut self,
        family: Family,
        buffer_size: Option<usize>,
    ) -> io::Result<Box<dyn DgramSocket>> {
        (**self).bind(family, buffer_size)
    }
}

//------------ DgramSocket ---------------------------------------------------

/// A bound, non-blocking datagram socket.
///
/// The socket is closed when the value is dropped.
pub trait DgramSocket {
    /// Sends a datagram to the given address.
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;

    /// Receives a datagram if one is available.
    ///
    /// Returns an error of kind [`io::ErrorKind::WouldBlock`] if there is
    /// nothing to receive right now.
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// Polls the socket for read readiness.
    ///
    /// Sockets that can’t register with a reactor return
    /// `Poll::Pending` without arranging for a wake up. Hosts using such
    /// sockets need to determine readiness by other means.
    fn poll_recv_ready(&self, cx: &mut Context) -> Poll<io::Result<()>> {
        let _ = cx;
        Poll::Pending
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn family() {
        let v4: SocketAddr = "192.0.2.1:53".parse().unwrap();
        let v6: SocketAddr = "[2001:db8::1]:53".parse().unwrap();
        assert_eq!(Family::of(&v4), Family::V4);
        assert_eq!(Family::of(&v6), Family::V6);
        assert!(Family::V4.unspecified().is_ipv4());
        assert_eq!(Family::V6.unspecified().port(), 0);
    }
}
