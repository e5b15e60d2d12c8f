//! The pool of datagram sockets.
//!
//! All operations of a context share a small number of sockets per address
//! family. Each attempt series of an operation picks a socket from the pool
//! and reserves a transaction ID on it. Responses arriving on the socket
//! are matched to the operation through this ID.
//!
//! Sockets are retired after they have been around for a while or have
//! sent a certain number of datagrams. A retired socket doesn’t get new
//! attempt series but is kept open until its last outstanding request has
//! been released. Replacements are opened lazily when the next attempt
//! series needs a socket.

use super::arena::Handle;
use crate::net::{DgramSocket, Family, Transport};
use bytes::Bytes;
use core::fmt;
use core::task::{Context, Poll};
use rand::Rng;
use std::boxed::Box;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use std::vec::Vec;
use tracing::{debug, trace, warn};

//------------ Configuration Constants ---------------------------------------

/// How long a socket is used for new attempt series.
pub(crate) const SOCKET_LIFETIME: Duration = Duration::from_secs(30);

/// How many datagrams a socket sends before it is retired.
pub(crate) const SOCKET_MAX_SENDS: u64 = 4096;

/// How many datagrams are read from a socket in one pass.
pub(crate) const RECV_BUDGET: usize = 64;

/// The size of the receive buffer.
///
/// This is the largest possible UDP payload.
const RECV_SIZE: usize = 65535;

/// How many random transaction IDs to try before searching for a free one.
const RANDOM_ID_TRIES: usize = 16;

//------------ SocketId ------------------------------------------------------

/// The identifier of a socket in the pool.
///
/// Identifiers are never reused during the lifetime of a pool.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct SocketId(u64);

//------------ Datagram ------------------------------------------------------

/// A datagram received on a socket of the pool.
#[derive(Clone, Debug)]
pub(crate) struct Datagram {
    pub socket: SocketId,
    pub source: SocketAddr,
    pub data: Bytes,
}

//------------ Entry ---------------------------------------------------------

struct Entry {
    id: SocketId,
    family: Family,
    socket: Box<dyn DgramSocket>,
    created: Instant,
    sends: u64,

    /// The operations waiting for a response by transaction ID.
    inflight: HashMap<u16, Handle>,

    /// Whether the socket has been retired.
    retiring: bool,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.sends >= SOCKET_MAX_SENDS
            || now.saturating_duration_since(self.created) >= SOCKET_LIFETIME
    }
}

//------------ SocketPool ----------------------------------------------------

/// The sockets of a context.
pub(crate) struct SocketPool {
    transport: Box<dyn Transport>,
    entries: Vec<Entry>,
    next_id: u64,

    /// The round-robin position for IPv4 and IPv6.
    cursor: [usize; 2],

    /// The buffer for receiving datagrams.
    buf: Vec<u8>,
}

impl SocketPool {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        SocketPool {
            transport,
            entries: Vec::new(),
            next_id: 0,
            cursor: [0; 2],
            buf: Vec::new(),
        }
    }

    /// Returns the number of open sockets of the given family.
    pub fn open(&self, family: Family) -> usize {
        self.entries.iter().filter(|e| e.family == family).count()
    }

    /// Returns whether a socket is still open.
    pub fn contains(&self, socket: SocketId) -> bool {
        self.entry(socket).is_some()
    }

    /// Picks a socket for a new attempt series.
    ///
    /// Sockets are picked round-robin among the live sockets of the family.
    /// A new socket is opened if the family has fewer than `limit` open
    /// sockets and all live ones have outstanding requests. Retired sockets
    /// count toward the limit until their last request is released, so
    /// their replacement is deferred until then. If there is no live
    /// socket, the least busy retired one is used.
    pub fn acquire(
        &mut self,
        family: Family,
        limit: usize,
        buffer_size: Option<usize>,
        now: Instant,
    ) -> io::Result<SocketId> {
        self.maintain(now);

        let live: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.family == family && !e.retiring)
            .map(|(idx, _)| idx)
            .collect();
        let all_busy = live
            .iter()
            .all(|&idx| !self.entries[idx].inflight.is_empty());

        let mut bind_err = None;
        if self.open(family) < limit && all_busy {
            match self.transport.bind(family, buffer_size) {
                Ok(socket) => {
                    let id = SocketId(self.next_id);
                    self.next_id += 1;
                    debug!("opened socket {:?} for {:?}", id, family);
                    self.entries.push(Entry {
                        id,
                        family,
                        socket,
                        created: now,
                        sends: 0,
                        inflight: HashMap::new(),
                        retiring: false,
                    });
                    return Ok(id);
                }
                Err(err) => {
                    warn!("failed to bind {:?} socket: {}", family, err);
                    bind_err = Some(err);
                }
            }
        }

        if !live.is_empty() {
            let cursor = &mut self.cursor[family_index(family)];
            let idx = live[*cursor % live.len()];
            *cursor = cursor.wrapping_add(1);
            return Ok(self.entries[idx].id);
        }

        let fallback = self
            .entries
            .iter()
            .filter(|e| e.family == family)
            .min_by_key(|e| e.inflight.len());
        match (fallback, bind_err) {
            (Some(entry), _) => Ok(entry.id),
            (None, Some(err)) => Err(err),
            (None, None) => {
                Err(io::Error::new(io::ErrorKind::Other, "no socket available"))
            }
        }
    }

    /// Reserves a random transaction ID on a socket for an operation.
    ///
    /// Returns `None` if the socket is gone or all IDs are taken.
    pub fn reserve_id(&mut self, socket: SocketId, op: Handle) -> Option<u16> {
        let entry = self.entry_mut(socket)?;
        let mut rng = rand::thread_rng();
        let mut id = rng.gen::<u16>();
        let mut tries = 0;
        while entry.inflight.contains_key(&id) {
            tries += 1;
            if tries > RANDOM_ID_TRIES + usize::from(u16::MAX) {
                return None;
            }
            id = if tries < RANDOM_ID_TRIES {
                rng.gen()
            } else {
                id.wrapping_add(1)
            };
        }
        entry.inflight.insert(id, op);
        Some(id)
    }

    /// Releases a transaction ID.
    pub fn release(&mut self, socket: SocketId, id: u16) {
        if let Some(entry) = self.entry_mut(socket) {
            entry.inflight.remove(&id);
        }
    }

    /// Returns the operation waiting for a transaction ID on a socket.
    pub fn lookup(&self, socket: SocketId, id: u16) -> Option<Handle> {
        self.entry(socket)?.inflight.get(&id).copied()
    }

    /// Sends a datagram on a socket.
    pub fn send(
        &mut self,
        socket: SocketId,
        data: &[u8],
        target: SocketAddr,
    ) -> io::Result<()> {
        let entry = self.entry_mut(socket).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "socket closed")
        })?;
        entry.sends += 1;
        let sent = entry.socket.send_to(data, target)?;
        trace!("sent {} octets to {} on {:?}", sent, target, socket);
        if sent != data.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "short datagram send",
            ));
        }
        Ok(())
    }

    /// Reads whatever datagrams have arrived.
    ///
    /// At most [`RECV_BUDGET`] datagrams are read from each socket.
    pub fn recv(&mut self) -> Vec<Datagram> {
        if self.buf.len() < RECV_SIZE {
            self.buf.resize(RECV_SIZE, 0);
        }
        let mut res = Vec::new();
        for entry in &self.entries {
            for _ in 0..RECV_BUDGET {
                match entry.socket.recv_from(&mut self.buf) {
                    Ok((len, source)) => {
                        trace!(
                            "received {} octets from {} on {:?}",
                            len,
                            source,
                            entry.id
                        );
                        res.push(Datagram {
                            socket: entry.id,
                            source,
                            data: Bytes::copy_from_slice(&self.buf[..len]),
                        });
                    }
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                        break
                    }
                    Err(err) => {
                        warn!("receive error on {:?}: {}", entry.id, err);
                        break;
                    }
                }
            }
        }
        res
    }

    /// Retires expired sockets and closes retired sockets no longer used.
    pub fn maintain(&mut self, now: Instant) {
        self.retire_expired(now);
        self.entries.retain(|entry| {
            let keep = !entry.retiring || !entry.inflight.is_empty();
            if !keep {
                debug!("closing socket {:?}", entry.id);
            }
            keep
        });
    }

    /// Checks whether any socket has become readable.
    pub fn poll_recv_ready(&self, cx: &mut Context) -> Poll<()> {
        let mut res = Poll::Pending;
        for entry in &self.entries {
            if entry.socket.poll_recv_ready(cx).is_ready() {
                res = Poll::Ready(())
            }
        }
        res
    }

    fn retire_expired(&mut self, now: Instant) {
        for entry in &mut self.entries {
            if !entry.retiring && entry.is_expired(now) {
                debug!(
                    "retiring socket {:?} after {} sends",
                    entry.id, entry.sends
                );
                entry.retiring = true;
            }
        }
    }

    fn entry(&self, socket: SocketId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == socket)
    }

    fn entry_mut(&mut self, socket: SocketId) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.id == socket)
    }
}

impl fmt::Debug for SocketPool {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SocketPool")
            .field("open", &self.entries.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

fn family_index(family: Family) -> usize {
    match family {
        Family::V4 => 0,
        Family::V6 => 1,
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::resolv::arena::Arena;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Counts {
        bound: Cell<usize>,
        closed: Cell<usize>,
    }

    struct MockTransport(Rc<Counts>);

    struct MockSocket(Rc<Counts>);

    impl Transport for MockTransport {
        fn bind(
            &mut self,
            _family: Family,
            _buffer_size: Option<usize>,
        ) -> io::Result<Box<dyn DgramSocket>> {
            self.0.bound.set(self.0.bound.get() + 1);
            Ok(Box::new(MockSocket(self.0.clone())))
        }
    }

    impl DgramSocket for MockSocket {
        fn send_to(&self, buf: &[u8], _: SocketAddr) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn recv_from(&self, _: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
            Err(io::ErrorKind::WouldBlock.into())
        }
    }

    impl Drop for MockSocket {
        fn drop(&mut self) {
            self.0.closed.set(self.0.closed.get() + 1);
        }
    }

    fn pool() -> (SocketPool, Rc<Counts>) {
        let counts = Rc::new(Counts::default());
        (
            SocketPool::new(Box::new(MockTransport(counts.clone()))),
            counts,
        )
    }

    fn handles(n: usize) -> Vec<Handle> {
        let mut arena = Arena::new();
        (0..n).map(|i| arena.insert(i)).collect()
    }

    #[test]
    fn opens_only_when_busy() {
        let (mut pool, counts) = pool();
        let now = Instant::now();
        let ops = handles(3);

        let first = pool.acquire(Family::V4, 2, None, now).unwrap();
        assert_eq!(pool.acquire(Family::V4, 2, None, now).unwrap(), first);
        pool.reserve_id(first, ops[0]).unwrap();

        let second = pool.acquire(Family::V4, 2, None, now).unwrap();
        assert_ne!(first, second);
        pool.reserve_id(second, ops[1]).unwrap();

        // At the limit now, so round-robin between the two.
        let a = pool.acquire(Family::V4, 2, None, now).unwrap();
        let b = pool.acquire(Family::V4, 2, None, now).unwrap();
        assert_ne!(a, b);
        assert_eq!(counts.bound.get(), 2);
        assert_eq!(pool.open(Family::V4), 2);
        assert_eq!(pool.open(Family::V6), 0);
    }

    #[test]
    fn ids_are_unique_per_socket() {
        let (mut pool, _) = pool();
        let now = Instant::now();
        let ops = handles(200);
        let socket = pool.acquire(Family::V6, 1, None, now).unwrap();
        let mut ids = std::collections::HashSet::new();
        for op in &ops {
            let id = pool.reserve_id(socket, *op).unwrap();
            assert!(ids.insert(id));
            assert_eq!(pool.lookup(socket, id), Some(*op));
        }
        let id = *ids.iter().next().unwrap();
        pool.release(socket, id);
        assert_eq!(pool.lookup(socket, id), None);
    }

    #[test]
    fn retired_socket_closes_when_drained() {
        let (mut pool, counts) = pool();
        let start = Instant::now();
        let ops = handles(2);

        let old = pool.acquire(Family::V4, 1, None, start).unwrap();
        let id = pool.reserve_id(old, ops[0]).unwrap();

        let later = start + SOCKET_LIFETIME;
        pool.maintain(later);
        assert!(pool.contains(old));
        assert_eq!(counts.closed.get(), 0);

        // The retired socket still occupies the only slot.
        assert_eq!(pool.acquire(Family::V4, 1, None, later).unwrap(), old);
        let second = pool.reserve_id(old, ops[1]).unwrap();
        assert_eq!(pool.open(Family::V4), 1);
        assert_eq!(counts.bound.get(), 1);

        pool.release(old, id);
        pool.maintain(later);
        assert!(pool.contains(old));
        pool.release(old, second);
        pool.maintain(later);
        assert!(!pool.contains(old));
        assert_eq!(counts.closed.get(), 1);

        let new = pool.acquire(Family::V4, 1, None, later).unwrap();
        assert_ne!(old, new);
        assert_eq!(pool.open(Family::V4), 1);
        assert_eq!(counts.bound.get(), 2);
    }

    #[test]
    fn retired_socket_counts_toward_limit() {
        let (mut pool, counts) = pool();
        let start = Instant::now();
        let ops = handles(3);

        let old = pool.acquire(Family::V4, 2, None, start).unwrap();
        pool.reserve_id(old, ops[0]).unwrap();

        let later = start + SOCKET_LIFETIME;
        let new = pool.acquire(Family::V4, 2, None, later).unwrap();
        assert_ne!(old, new);
        pool.reserve_id(new, ops[1]).unwrap();

        // Both slots are taken, one by the draining socket.
        assert_eq!(pool.acquire(Family::V4, 2, None, later).unwrap(), new);
        assert_eq!(pool.open(Family::V4), 2);
        assert_eq!(counts.bound.get(), 2);
    }

    #[test]
    fn retires_after_max_sends() {
        let (mut pool, _) = pool();
        let now = Instant::now();
        let target: SocketAddr = "192.0.2.1:53".parse().unwrap();
        let socket = pool.acquire(Family::V4, 1, None, now).unwrap();
        for _ in 0..SOCKET_MAX_SENDS {
            pool.send(socket, b"x", target).unwrap();
        }
        pool.maintain(now);
        assert!(!pool.contains(socket));
        let socket2 = pool.acquire(Family::V4, 1, None, now).unwrap();
        assert_ne!(socket, socket2);
    }
}
