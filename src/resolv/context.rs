//! The resolver context.
//!
//! A [`Context`] owns everything needed to run queries: the settings, the
//! nameservers and search list, a pool of sockets, and all operations
//! currently in progress. It doesn’t run on its own. Instead, the host
//! calls [`Context::process`] whenever a socket became readable or the
//! time returned by [`Context::next_timeout`] has come.
//!
//! Each call to `process` is one scheduling pass. It reads responses from
//! the sockets, fires due timers, tidies up the socket pool, delivers up to
//! `maxcalls` results to their handlers, and finally admits queued
//! operations for as long as there is capacity.

use super::arena::{Arena, Handle};
use super::conf::{ResolvConf, Settings};
use super::error::Error;
use super::handler::Handler;
use super::operation::{Operation, Outcome, Phase};
use super::search::{Candidates, SearchList};
use super::servers::ServerList;
use super::sockets::SocketPool;
use crate::base::{Bits, Name, Response, Rtype};
use crate::net::Transport;
use crate::utils::clock::{Clock, SystemClock};
use core::fmt;
use core::str::FromStr;
use core::task;
use std::boxed::Box;
use std::collections::{BTreeSet, VecDeque};
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

//------------ Context -------------------------------------------------------

/// An asynchronous DNS resolver context.
///
/// A context is meant to live on a single thread, the one running the
/// host’s event loop. Queries are started via [`query`][Self::query] and
/// friends, which return a [`Handle`] for the new operation right away.
/// The result is later delivered to the operation’s [`Handler`] from within
/// [`process`][Self::process].
///
/// Handlers are given mutable access to the context and can start or
/// cancel queries. They may even call `process` again, in which case the
/// nested pass does everything but deliver results.
pub struct Context {
    settings: Settings,
    servers: ServerList,
    search: SearchList,
    clock: Box<dyn Clock>,
    pool: SocketPool,
    operations: Arena<Operation>,

    /// Operations waiting for admission.
    queue: VecDeque<Handle>,

    /// Operations waiting for their timer.
    timers: BTreeSet<(Instant, Handle)>,

    /// Operations waiting for delivery in completion order.
    pending: VecDeque<Handle>,

    /// The number of admitted operations that aren’t done yet.
    running: usize,

    /// Whether results are currently being delivered.
    delivering: bool,
}

/// # Creation and Configuration
///
impl Context {
    /// Creates a new context using the given transport.
    ///
    /// The context starts with default settings, no nameservers, and an
    /// empty search list.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_clock(transport, SystemClock)
    }

    /// Creates a new context with the given transport and clock.
    pub fn with_clock(
        transport: impl Transport + 'static,
        clock: impl Clock + 'static,
    ) -> Self {
        Context {
            settings: Settings::new(),
            servers: ServerList::new(),
            search: SearchList::new(),
            clock: Box::new(clock),
            pool: SocketPool::new(Box::new(transport)),
            operations: Arena::new(),
            queue: VecDeque::new(),
            timers: BTreeSet::new(),
            pending: VecDeque::new(),
            running: 0,
            delivering: false,
        }
    }

    /// Creates a new context configured from a resolver configuration.
    pub fn from_conf(transport: impl Transport + 'static, conf: &ResolvConf) -> Self {
        let mut res = Self::new(transport);
        res.apply_conf(conf);
        res
    }

    /// Applies a resolver configuration.
    ///
    /// The nameservers and search list are replaced by those of the
    /// configuration. The `ndots`, `timeout`, `attempts`, and `rotate`
    /// settings are taken over.
    pub fn apply_conf(&mut self, conf: &ResolvConf) {
        self.servers.clear();
        for addr in &conf.servers {
            self.servers.push(*addr);
        }
        self.search.clear();
        for name in &conf.search {
            self.search.push(name.clone());
        }
        self.settings.set_ndots(conf.ndots);
        self.settings.set_timeout(conf.timeout);
        self.settings.set_attempts(conf.attempts);
        self.settings.set_rotate(conf.rotate);
    }

    /// Adds a nameserver listening on port 53.
    pub fn nameserver(&mut self, addr: IpAddr) {
        self.nameserver_addr(SocketAddr::new(addr, 53))
    }

    /// Adds a nameserver with an explicit port.
    pub fn nameserver_addr(&mut self, addr: SocketAddr) {
        self.servers.push(addr)
    }

    /// Removes all nameservers.
    ///
    /// Operations that have already been created keep using the servers
    /// they started out with.
    pub fn clear(&mut self) {
        self.servers.clear()
    }

    /// Returns the current nameservers.
    pub fn nameservers(&self) -> &[SocketAddr] {
        &self.servers
    }

    /// Appends a suffix to the search list.
    pub fn search(&mut self, suffix: Name) {
        self.search.push(suffix)
    }

    /// Empties the search list.
    pub fn clear_search(&mut self) {
        self.search.clear()
    }

    /// Returns the search list.
    pub fn search_list(&self) -> &[Name] {
        self.search.as_slice()
    }

    /// Returns the current settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replaces all settings at once.
    ///
    /// The values are clamped and the socket count is never lowered.
    pub fn set_settings(&mut self, settings: Settings) {
        let sockets = self.settings.sockets();
        self.settings = settings.clamped();
        self.settings.set_sockets(sockets);
    }

    /// Sets the time to wait for a response after the last send.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.settings.set_timeout(timeout)
    }

    /// Sets the time between retransmissions to the same server.
    pub fn set_interval(&mut self, interval: Duration) {
        self.settings.set_interval(interval)
    }

    /// Sets how often a request is sent to the same server.
    pub fn set_attempts(&mut self, attempts: usize) {
        self.settings.set_attempts(attempts)
    }

    /// Sets the maximum number of operations in flight.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.settings.set_capacity(capacity)
    }

    /// Sets the maximum number of results delivered per pass.
    pub fn set_maxcalls(&mut self, maxcalls: usize) {
        self.settings.set_maxcalls(maxcalls)
    }

    /// Sets the number of dots that make a name be tried as is first.
    pub fn set_ndots(&mut self, ndots: usize) {
        self.settings.set_ndots(ndots)
    }

    /// Sets whether the start server rotates between operations.
    pub fn set_rotate(&mut self, rotate: bool) {
        self.settings.set_rotate(rotate)
    }

    /// Sets the default flags for queries.
    pub fn set_bits(&mut self, bits: Bits) {
        self.settings.set_bits(bits)
    }

    /// Raises the number of sockets per address family.
    pub fn set_sockets(&mut self, sockets: usize) {
        self.settings.set_sockets(sockets)
    }

    /// Sets the buffer size for new sockets.
    pub fn set_buffer_size(&mut self, size: Option<usize>) {
        self.settings.set_buffer_size(size)
    }

    /// Returns the longest time a single server may occupy an operation.
    pub fn expire(&self) -> Duration {
        self.settings.expire()
    }
}

/// # Queries
///
impl Context {
    /// Starts a query for a name and record type.
    ///
    /// The name is expanded through the search list. The query uses the
    /// default flags from the settings.
    pub fn query(
        &mut self,
        name: &str,
        rtype: Rtype,
        handler: impl Handler + 'static,
    ) -> Result<Handle, Error> {
        let bits = self.settings.bits();
        self.query_with_bits(name, rtype, bits, handler)
    }

    /// Starts a query with explicit flags.
    pub fn query_with_bits(
        &mut self,
        name: &str,
        rtype: Rtype,
        bits: Bits,
        handler: impl Handler + 'static,
    ) -> Result<Handle, Error> {
        let qname = Name::from_str(name)?;
        self.check(rtype)?;
        let candidates = if IpAddr::from_str(name).is_ok() {
            let mut res = Candidates::new();
            res.push(qname.into_absolute());
            res
        } else {
            self.search.expand(qname, self.settings.ndots())
        };
        Ok(self.create(candidates, rtype, bits, Box::new(handler)))
    }

    /// Starts a reverse lookup for an address.
    pub fn query_addr(
        &mut self,
        addr: IpAddr,
        handler: impl Handler + 'static,
    ) -> Result<Handle, Error> {
        let bits = self.settings.bits();
        self.query_addr_with_bits(addr, bits, handler)
    }

    /// Starts a reverse lookup for an address with explicit flags.
    pub fn query_addr_with_bits(
        &mut self,
        addr: IpAddr,
        bits: Bits,
        handler: impl Handler + 'static,
    ) -> Result<Handle, Error> {
        self.check(Rtype::PTR)?;
        let mut candidates = Candidates::new();
        candidates.push(Name::reverse(addr));
        Ok(self.create(candidates, Rtype::PTR, bits, Box::new(handler)))
    }

    /// Cancels an operation.
    ///
    /// Returns whether the operation was cancelled. Its handler will not
    /// be called. Operations whose result is already waiting for delivery
    /// or has been delivered can’t be cancelled.
    pub fn cancel(&mut self, handle: Handle) -> bool {
        match self.phase(handle) {
            Some(Phase::Queued) => {
                self.queue.retain(|item| *item != handle);
                self.operations.remove(handle);
                debug!("cancelled queued {:?}", handle);
                true
            }
            Some(Phase::Waiting) => {
                if let Some(mut op) = self.operations.remove(handle) {
                    if let Some(deadline) = op.deadline() {
                        self.timers.remove(&(deadline, handle));
                    }
                    op.cancel(&mut self.pool);
                }
                self.running -= 1;
                debug!("cancelled {:?}", handle);
                let now = self.clock.now();
                self.admit(now);
                true
            }
            _ => false,
        }
    }

    /// Returns the phase of an operation.
    ///
    /// Returns `None` if the operation is done.
    pub fn phase(&self, handle: Handle) -> Option<Phase> {
        self.operations.get(handle).map(Operation::phase)
    }

    /// Returns the names an operation tries in order.
    pub fn candidates(&self, handle: Handle) -> Option<&[Name]> {
        self.operations.get(handle).map(Operation::candidates)
    }

    /// Returns how many datagrams an operation has sent so far.
    pub fn sends(&self, handle: Handle) -> Option<usize> {
        self.operations.get(handle).map(Operation::sends)
    }

    fn check(&self, rtype: Rtype) -> Result<(), Error> {
        if !rtype.is_queryable() {
            return Err(Error::UnsupportedType(rtype));
        }
        if self.servers.is_empty() {
            return Err(Error::NoNameservers);
        }
        Ok(())
    }

    fn create(
        &mut self,
        candidates: Candidates,
        rtype: Rtype,
        bits: Bits,
        handler: Box<dyn Handler>,
    ) -> Handle {
        let now = self.clock.now();
        let op = Operation::new(
            candidates,
            rtype,
            bits,
            self.settings,
            self.servers.snapshot(),
            handler,
            now,
        );
        let handle = self.operations.insert(op);
        if self.running < self.settings.capacity() && self.queue.is_empty() {
            self.launch(handle, now);
        } else {
            trace!("queueing {:?}", handle);
            self.queue.push_back(handle);
        }
        handle
    }
}

/// # Driving the Context
///
impl Context {
    /// Performs one scheduling pass.
    pub fn process(&mut self) {
        let now = self.clock.now();
        self.receive(now);
        self.expire_timers(now);
        self.pool.maintain(now);
        if !self.delivering {
            self.deliver();
        }
        self.admit(now);
    }

    /// Returns when [`process`][Self::process] needs to be called next.
    ///
    /// Returns `None` if there are no timers, in which case only incoming
    /// datagrams can move things along. If there are results waiting for
    /// delivery, the current time is returned.
    pub fn next_timeout(&self) -> Option<Instant> {
        if !self.pending.is_empty() {
            return Some(self.clock.now());
        }
        self.timers.first().map(|(deadline, _)| *deadline)
    }

    /// Polls the sockets for read readiness.
    ///
    /// Returns `Poll::Ready(())` if any socket may have something to read.
    pub fn poll_readable(&self, cx: &mut task::Context) -> task::Poll<()> {
        self.pool.poll_recv_ready(cx)
    }

    /// Returns whether there are no operations at all.
    pub fn is_idle(&self) -> bool {
        self.operations.is_empty()
    }

    /// Returns the number of admitted operations that aren’t done yet.
    pub fn running(&self) -> usize {
        self.running
    }

    /// Returns the number of operations waiting for admission.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Returns the number of results waiting for delivery.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn receive(&mut self, now: Instant) {
        for datagram in self.pool.recv() {
            let response = match Response::parse(&datagram.data) {
                Ok(response) => response,
                Err(err) => {
                    trace!("dropping malformed response: {}", err);
                    continue;
                }
            };
            match self.pool.lookup(datagram.socket, response.id()) {
                Some(handle) => self.drive(
                    handle,
                    Event::Response(response, datagram.source),
                    now,
                ),
                None => {
                    trace!(
                        "dropping unexpected response with ID {}",
                        response.id()
                    );
                }
            }
        }
    }

    fn expire_timers(&mut self, now: Instant) {
        while let Some(&(deadline, handle)) = self.timers.first() {
            if deadline > now {
                break;
            }
            self.timers.remove(&(deadline, handle));
            self.drive(handle, Event::Timer, now);
        }
    }

    fn deliver(&mut self) {
        self.delivering = true;
        let mut budget = self.settings.maxcalls();
        while budget > 0 {
            let handle = match self.pending.pop_front() {
                Some(handle) => handle,
                None => break,
            };
            let op = match self.operations.remove(handle) {
                Some(op) => op,
                None => continue,
            };
            self.running -= 1;
            budget -= 1;
            if let Some((handler, outcome)) = op.finish() {
                match outcome {
                    Outcome::Resolved(response) => {
                        handler.on_resolved(self, handle, response)
                    }
                    Outcome::Failed(failure) => {
                        handler.on_failure(self, handle, failure)
                    }
                }
            }
        }
        self.delivering = false;
    }

    fn admit(&mut self, now: Instant) {
        while self.running < self.settings.capacity() {
            match self.queue.pop_front() {
                Some(handle) => self.launch(handle, now),
                None => break,
            }
        }
    }

    fn launch(&mut self, handle: Handle, now: Instant) {
        let op = match self.operations.get_mut(handle) {
            Some(op) => op,
            None => return,
        };
        let start = self.servers.next_start(op.settings().rotate());
        self.running += 1;
        op.launch(handle, start, &mut self.pool, now);
        self.settle(handle, None, Phase::Queued);
    }

    fn drive(&mut self, handle: Handle, event: Event, now: Instant) {
        let op = match self.operations.get_mut(handle) {
            Some(op) => op,
            None => return,
        };
        let old = op.deadline();
        let phase = op.phase();
        match event {
            Event::Timer => op.timer(handle, &mut self.pool, now),
            Event::Response(response, source) => {
                op.response(handle, response, source, &mut self.pool, now)
            }
        }
        self.settle(handle, old, phase);
    }

    /// Updates timers and pending results after an operation has moved.
    ///
    /// `old` and `was` are the deadline and phase before the move.
    fn settle(&mut self, handle: Handle, old: Option<Instant>, was: Phase) {
        let op = match self.operations.get(handle) {
            Some(op) => op,
            None => return,
        };
        let new = op.deadline();
        let phase = op.phase();
        if old != new {
            if let Some(old) = old {
                self.timers.remove(&(old, handle));
            }
            if let Some(new) = new {
                self.timers.insert((new, handle));
            }
        }
        if phase == Phase::Delivering && was != Phase::Delivering {
            trace!("{:?} ready for delivery", handle);
            self.pending.push_back(handle);
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Context")
            .field("settings", &self.settings)
            .field("servers", &self.servers)
            .field("search", &self.search)
            .field("pool", &self.pool)
            .field("operations", &self.operations.len())
            .field("running", &self.running)
            .field("queued", &self.queue.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

//------------ Event ---------------------------------------------------------

/// Something that happened to an operation.
enum Event {
    /// The operation’s timer fired.
    Timer,

    /// A response arrived for the operation.
    Response(Response, SocketAddr),
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::NameError;
    use crate::net::{DgramSocket, Family};
    use crate::resolv::error::Failure;
    use crate::resolv::handler::Callbacks;
    use std::io;

    struct Silent;

    struct SilentSocket;

    impl Transport for Silent {
        fn bind(
            &mut self,
            _: Family,
            _: Option<usize>,
        ) -> io::Result<Box<dyn DgramSocket>> {
            Ok(Box::new(SilentSocket))
        }
    }

    impl DgramSocket for SilentSocket {
        fn send_to(&self, buf: &[u8], _: SocketAddr) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn recv_from(&self, _: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
            Err(io::ErrorKind::WouldBlock.into())
        }
    }

    fn ignore() -> Callbacks<
        impl FnOnce(&mut Context, Handle, Response),
        impl FnOnce(&mut Context, Handle, Failure),
    > {
        Callbacks::new(|_, _, _| {}, |_, _, _| {})
    }

    #[test]
    fn rejects_invalid_input() {
        let mut ctx = Context::new(Silent);
        assert_eq!(
            ctx.query("example.com", Rtype::A, ignore()).unwrap_err(),
            Error::NoNameservers
        );
        ctx.nameserver([192, 0, 2, 1].into());
        assert_eq!(
            ctx.query("bad..name", Rtype::A, ignore()).unwrap_err(),
            Error::InvalidName(NameError::EmptyLabel)
        );
        assert_eq!(
            ctx.query("", Rtype::A, ignore()).unwrap_err(),
            Error::InvalidName(NameError::Empty)
        );
        for rtype in [Rtype::AXFR, Rtype::IXFR, Rtype::OPT, Rtype::TSIG] {
            assert_eq!(
                ctx.query("example.com", rtype, ignore()).unwrap_err(),
                Error::UnsupportedType(rtype)
            );
        }
        assert!(ctx.is_idle());
    }

    #[test]
    fn literal_not_expanded() {
        let mut ctx = Context::new(Silent);
        ctx.nameserver([192, 0, 2, 1].into());
        ctx.search(Name::from_str("example.com").unwrap());
        let op = ctx.query("192.0.2.7", Rtype::A, ignore()).unwrap();
        assert_eq!(ctx.candidates(op).unwrap().len(), 1);
        let op = ctx.query("host", Rtype::A, ignore()).unwrap();
        assert_eq!(ctx.candidates(op).unwrap().len(), 2);
        let op = ctx.query_addr([192, 0, 2, 7].into(), ignore()).unwrap();
        assert_eq!(
            ctx.candidates(op).unwrap(),
            [Name::from_str("7.2.0.192.in-addr.arpa.").unwrap()]
        );
    }

    #[test]
    fn launch_and_cancel() {
        let mut ctx = Context::new(Silent);
        ctx.nameserver([192, 0, 2, 1].into());
        ctx.set_capacity(1);
        let first = ctx.query("example.com", Rtype::A, ignore()).unwrap();
        let second = ctx.query("example.net", Rtype::A, ignore()).unwrap();
        assert_eq!(ctx.phase(first), Some(Phase::Waiting));
        assert_eq!(ctx.phase(second), Some(Phase::Queued));
        assert_eq!(ctx.sends(first), Some(1));
        assert!(ctx.next_timeout().is_some());

        assert!(ctx.cancel(first));
        assert!(!ctx.cancel(first));
        assert_eq!(ctx.phase(first), None);
        assert_eq!(ctx.phase(second), Some(Phase::Waiting));
        assert_eq!(ctx.running(), 1);
        assert_eq!(ctx.queued(), 0);

        assert!(ctx.cancel(second));
        assert!(ctx.is_idle());
        assert_eq!(ctx.running(), 0);
        assert!(ctx.next_timeout().is_none());
    }

    #[test]
    fn apply_conf() {
        let mut conf = ResolvConf::new();
        conf.servers.push("192.0.2.1:53".parse().unwrap());
        conf.servers.push("192.0.2.2:5353".parse().unwrap());
        conf.search.push(Name::from_str("example.com").unwrap());
        conf.ndots = 2;
        conf.attempts = 0;
        conf.rotate = true;
        let ctx = Context::from_conf(Silent, &conf);
        assert_eq!(ctx.nameservers(), &conf.servers[..]);
        assert_eq!(ctx.search_list(), &conf.search[..]);
        assert_eq!(ctx.settings().ndots(), 2);
        assert_eq!(ctx.settings().attempts(), 1);
        assert!(ctx.settings().rotate());
    }
}
