//! Running a context on Tokio.
//!
//! The [`TokioTransport`] creates UDP sockets registered with the Tokio
//! reactor so that the context learns about incoming datagrams without
//! polling. The [`run`] function drives a context until all its operations
//! are done.
//!
//! ```no_run
//! use dnsctx::base::Rtype;
//! use dnsctx::net::driver::{run, TokioTransport};
//! use dnsctx::resolv::{Callbacks, Context, ResolvConf};
//!
//! # async fn lookup() {
//! let mut ctx = Context::from_conf(TokioTransport::new(), &ResolvConf::system());
//! ctx.query(
//!     "www.example.com",
//!     Rtype::AAAA,
//!     Callbacks::new(
//!         |_, _, response| {
//!             for addr in response.addresses() {
//!                 println!("{}", addr);
//!             }
//!         },
//!         |_, _, failure| eprintln!("{}", failure),
//!     ),
//! )
//! .unwrap();
//! run(&mut ctx).await;
//! # }
//! ```

use super::udp::UdpTransport;
use super::{DgramSocket, Family, Transport};
use crate::resolv::Context;
use core::task;
use futures_util::future::poll_fn;
use std::boxed::Box;
use std::io;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::time::{sleep_until, Instant};
use tracing::trace;

//------------ TokioTransport ------------------------------------------------

/// A transport creating UDP sockets for the Tokio runtime.
///
/// Sockets can only be bound from within a runtime.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioTransport;

impl TokioTransport {
    /// Creates a new transport.
    pub fn new() -> Self {
        TokioTransport
    }
}

impl Transport for TokioTransport {
    fn bind(
        &mut self,
        family: Family,
        buffer_size: Option<usize>,
    ) -> io::Result<Box<dyn DgramSocket>> {
        let sock = UdpTransport::bind_std(family, buffer_size)?;
        Ok(Box::new(UdpSocket::from_std(sock)?))
    }
}

//------------ DgramSocket for UdpSocket -------------------------------------

impl DgramSocket for UdpSocket {
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.try_send_to(buf, target)
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.try_recv_from(buf)
    }

    fn poll_recv_ready(
        &self,
        cx: &mut task::Context,
    ) -> task::Poll<io::Result<()>> {
        UdpSocket::poll_recv_ready(self, cx)
    }
}

//------------ run -----------------------------------------------------------

/// Drives a context until it is idle.
///
/// Each round performs one scheduling pass and then waits until either a
/// socket becomes readable or the next timer is due. The context has to
/// use sockets that can register with the reactor, such as those created
/// by [`TokioTransport`].
pub async fn run(ctx: &mut Context) {
    loop {
        ctx.process();
        if ctx.is_idle() {
            break;
        }
        let deadline = ctx.next_timeout();
        let readable = poll_fn(|cx| ctx.poll_readable(cx));
        match deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = sleep_until(Instant::from_std(deadline)) => {
                        trace!("timer due");
                    }
                    _ = readable => {
                        trace!("socket readable");
                    }
                }
            }
            None => readable.await,
        }
    }
}
