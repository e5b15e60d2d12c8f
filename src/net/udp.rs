//! Non-blocking UDP sockets from the standard library.

use super::{DgramSocket, Family, Transport};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::boxed::Box;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use tracing::trace;

/// How many times do we try a new random port if we get ‘address in use.’
const RETRY_RANDOM_PORT: usize = 10;

//------------ UdpTransport --------------------------------------------------

/// A transport creating non-blocking UDP sockets.
#[derive(Clone, Copy, Debug, Default)]
pub struct UdpTransport;

impl UdpTransport {
    /// Creates a new transport.
    pub fn new() -> Self {
        UdpTransport
    }

    /// Binds a non-blocking socket to a random port.
    pub(crate) fn bind_std(
        family: Family,
        buffer_size: Option<usize>,
    ) -> io::Result<UdpSocket> {
        let domain = match family {
            Family::V4 => Domain::IPV4,
            Family::V6 => Domain::IPV6,
        };
        let local = SockAddr::from(family.unspecified());
        let mut i = 0;
        loop {
            let socket =
                Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
            if let Some(size) = buffer_size {
                socket.set_recv_buffer_size(size)?;
                socket.set_send_buffer_size(size)?;
            }
            socket.set_nonblocking(true)?;
            match socket.bind(&local) {
                Ok(()) => {
                    let socket = UdpSocket::from(socket);
                    trace!(
                        "bound UDP socket to {:?}",
                        socket.local_addr().ok()
                    );
                    return Ok(socket);
                }
                Err(err) => {
                    if i == RETRY_RANDOM_PORT {
                        return Err(err);
                    } else {
                        i += 1
                    }
                }
            }
        }
    }
}

impl Transport for UdpTransport {
    fn bind(
        &mut self,
        family: Family,
        buffer_size: Option<usize>,
    ) -> io::Result<Box<dyn DgramSocket>> {
        Ok(Box::new(Self::bind_std(family, buffer_size)?))
    }
}

//------------ DgramSocket for UdpSocket -------------------------------------

impl DgramSocket for UdpSocket {
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, target)
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf)
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn loopback() {
        let mut transport = UdpTransport::new();
        let sock = transport.bind(Family::V4, Some(65536)).unwrap();
        let server = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let server_addr = server.local_addr().unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(
            sock.recv_from(&mut buf).unwrap_err().kind(),
            io::ErrorKind::WouldBlock
        );

        sock.send_to(b"hello", server_addr).unwrap();
        let (len, from) = server.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"hello");

        server.send_to(b"back", from).unwrap();
        let mut received = None;
        for _ in 0..100 {
            match sock.recv_from(&mut buf) {
                Ok(res) => {
                    received = Some(res);
                    break;
                }
                Err(_) => {
                    std::thread::sleep(std::time::Duration::from_millis(10))
                }
            }
        }
        let (len, from) = received.unwrap();
        assert_eq!(&buf[..len], b"back");
        assert_eq!(from, server_addr);
    }
}
