//! A simulated network for testing resolver contexts.
#![allow(dead_code)]

use bytes::Bytes;
use dnsctx::base::{Name, Rcode, Record, RecordData, Request, Response};
use dnsctx::net::{DgramSocket, Family, Transport};
use dnsctx::resolv::{Context, Failure, Handle, Handler};
use dnsctx::utils::clock::FakeClock;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::rc::Rc;
use std::str::FromStr;

//------------ Sent ----------------------------------------------------------

/// A datagram sent by the context.
#[derive(Clone, Debug)]
pub struct Sent {
    pub socket: usize,
    pub to: SocketAddr,
    pub data: Bytes,
}

impl Sent {
    pub fn request(&self) -> Request {
        Request::parse(&self.data).unwrap()
    }

    pub fn qname(&self) -> String {
        self.request().question().qname().to_string()
    }
}

//------------ MockNet -------------------------------------------------------

#[derive(Default)]
struct State {
    next_socket: usize,
    sent: Vec<Sent>,
    inbox: HashMap<usize, VecDeque<(Bytes, SocketAddr)>>,
    unreachable: HashSet<SocketAddr>,
    open: HashSet<usize>,
    bound: usize,
    closed: usize,
}

/// The network shared between the test and the context’s sockets.
#[derive(Clone, Default)]
pub struct MockNet(Rc<RefCell<State>>);

impl MockNet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transport(&self) -> MockTransport {
        MockTransport(self.clone())
    }

    /// Returns and forgets all datagrams sent so far.
    pub fn take_sent(&self) -> Vec<Sent> {
        std::mem::take(&mut self.0.borrow_mut().sent)
    }

    /// Lets datagrams to `addr` fail with ‘connection refused.’
    pub fn set_unreachable(&self, addr: SocketAddr) {
        self.0.borrow_mut().unreachable.insert(addr);
    }

    /// Queues a datagram for the socket a request was sent on.
    pub fn inject(&self, sent: &Sent, data: Bytes, from: SocketAddr) {
        self.0
            .borrow_mut()
            .inbox
            .entry(sent.socket)
            .or_default()
            .push_back((data, from));
    }

    /// Answers a request from the server it was sent to.
    pub fn respond(&self, sent: &Sent, rcode: Rcode, answer: &[Record]) {
        let data = sent.request().reply(rcode, answer);
        self.inject(sent, data, sent.to);
    }

    /// Answers a request with a single A record.
    pub fn respond_a(&self, sent: &Sent, addr: Ipv4Addr) {
        let record = Record::new(
            sent.request().question().qname().clone(),
            3600,
            RecordData::A(addr),
        );
        self.respond(sent, Rcode::NOERROR, &[record]);
    }

    pub fn bound(&self) -> usize {
        self.0.borrow().bound
    }

    pub fn closed(&self) -> usize {
        self.0.borrow().closed
    }

    pub fn open(&self) -> usize {
        self.0.borrow().open.len()
    }
}

//------------ MockTransport and MockSocket ----------------------------------

pub struct MockTransport(MockNet);

impl Transport for MockTransport {
    fn bind(
        &mut self,
        _family: Family,
        _buffer_size: Option<usize>,
    ) -> io::Result<Box<dyn DgramSocket>> {
        let mut state = self.0 .0.borrow_mut();
        let id = state.next_socket;
        state.next_socket += 1;
        state.bound += 1;
        state.open.insert(id);
        Ok(Box::new(MockSocket {
            id,
            net: self.0.clone(),
        }))
    }
}

struct MockSocket {
    id: usize,
    net: MockNet,
}

impl DgramSocket for MockSocket {
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        let mut state = self.net.0.borrow_mut();
        if state.unreachable.contains(&target) {
            return Err(io::ErrorKind::ConnectionRefused.into());
        }
        state.sent.push(Sent {
            socket: self.id,
            to: target,
            data: Bytes::copy_from_slice(buf),
        });
        Ok(buf.len())
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let mut state = self.net.0.borrow_mut();
        match state.inbox.get_mut(&self.id).and_then(VecDeque::pop_front) {
            Some((data, from)) => {
                buf[..data.len()].copy_from_slice(&data);
                Ok((data.len(), from))
            }
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }
}

impl Drop for MockSocket {
    fn drop(&mut self) {
        let mut state = self.net.0.borrow_mut();
        state.closed += 1;
        state.open.remove(&self.id);
    }
}

//------------ Recorder ------------------------------------------------------

/// What a handler received.
#[derive(Debug)]
pub enum Outcome {
    Resolved(Response),
    Failed(Failure),
}

impl Outcome {
    pub fn response(&self) -> &Response {
        match self {
            Outcome::Resolved(response) => response,
            Outcome::Failed(failure) => panic!("unexpected failure {}", failure),
        }
    }

    pub fn failure(&self) -> &Failure {
        match self {
            Outcome::Resolved(_) => panic!("unexpected success"),
            Outcome::Failed(failure) => failure,
        }
    }
}

/// Collects the results delivered to handlers in delivery order.
#[derive(Clone, Default)]
pub struct Results(Rc<RefCell<Vec<(Handle, Outcome)>>>);

impl Results {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(&self) -> Recorder {
        Recorder(self.clone())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn handles(&self) -> Vec<Handle> {
        self.0.borrow().iter().map(|(handle, _)| *handle).collect()
    }

    pub fn take(&self) -> Vec<(Handle, Outcome)> {
        std::mem::take(&mut self.0.borrow_mut())
    }

    fn push(&self, handle: Handle, outcome: Outcome) {
        self.0.borrow_mut().push((handle, outcome))
    }
}

pub struct Recorder(Results);

impl Handler for Recorder {
    fn on_resolved(
        self: Box<Self>,
        _ctx: &mut Context,
        op: Handle,
        response: Response,
    ) {
        self.0.push(op, Outcome::Resolved(response))
    }

    fn on_failure(self: Box<Self>, _ctx: &mut Context, op: Handle, failure: Failure) {
        self.0.push(op, Outcome::Failed(failure))
    }
}

//------------ Helpers -------------------------------------------------------

pub fn server(n: u8) -> SocketAddr {
    SocketAddr::new([192, 0, 2, n].into(), 53)
}

pub fn name(s: &str) -> Name {
    Name::from_str(s).unwrap()
}

/// Creates a context on a fresh simulated network with a fake clock.
pub fn setup(servers: &[SocketAddr]) -> (Context, MockNet, FakeClock) {
    let net = MockNet::new();
    let clock = FakeClock::new();
    let mut ctx = Context::with_clock(net.transport(), clock.clone());
    for addr in servers {
        ctx.nameserver_addr(*addr);
    }
    (ctx, net, clock)
}

/// Installs a log subscriber honouring `RUST_LOG`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
