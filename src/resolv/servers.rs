//! The set of nameservers.
//!
//! The list of servers is kept behind a reference counted slice. Each
//! operation receives a [`ServerListCounter`] that holds on to the list as
//! it was when the operation was created. Changing the list of the context
//! creates a new slice and leaves the counters of earlier operations alone.

use core::ops;
use std::net::SocketAddr;
use std::rc::Rc;
use std::vec::Vec;

//------------ ServerList ----------------------------------------------------

/// The nameservers of a context.
#[derive(Clone, Debug)]
pub(crate) struct ServerList {
    /// The actual list of servers.
    servers: Rc<[SocketAddr]>,

    /// Where to start accessing the list in rotate mode.
    ///
    /// This value will always keep growing and will have to be used modulo
    /// `servers`’s length.
    start: usize,
}

impl ServerList {
    pub fn new() -> Self {
        ServerList {
            servers: Rc::from(Vec::new()),
            start: 0,
        }
    }

    /// Appends a server to the list.
    pub fn push(&mut self, addr: SocketAddr) {
        let mut servers = self.servers.to_vec();
        servers.push(addr);
        self.servers = servers.into();
    }

    /// Removes all servers.
    pub fn clear(&mut self) {
        self.servers = Rc::from(Vec::new());
        self.start = 0;
    }

    /// Returns a counter over a snapshot of the current list.
    pub fn snapshot(&self) -> ServerListCounter {
        ServerListCounter::new(self.servers.clone(), 0)
    }

    /// Returns the start index for an operation being launched.
    ///
    /// If `rotate` is true, this is the current rotation offset which is
    /// then advanced for the next operation. Otherwise, operations always
    /// start with the first server.
    pub fn next_start(&mut self, rotate: bool) -> usize {
        if !rotate {
            return 0;
        }
        let res = self.start;
        self.start = self.start.wrapping_add(1);
        res
    }
}

impl ops::Deref for ServerList {
    type Target = [SocketAddr];

    fn deref(&self) -> &Self::Target {
        self.servers.as_ref()
    }
}

impl Default for ServerList {
    fn default() -> Self {
        Self::new()
    }
}

//------------ ServerListCounter ---------------------------------------------

/// The position of an operation in its snapshot of the server list.
///
/// The counter walks once around the list beginning at the start server.
/// It can be restarted to walk around again for the next candidate name.
#[derive(Clone, Debug)]
pub(crate) struct ServerListCounter {
    servers: Rc<[SocketAddr]>,
    start: usize,
    cur: usize,
}

impl ServerListCounter {
    fn new(servers: Rc<[SocketAddr]>, start: usize) -> Self {
        ServerListCounter {
            servers,
            start,
            cur: start,
        }
    }

    /// Returns the number of servers in the snapshot.
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Returns the index of the first server in the snapshot.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Sets the index of the first server and goes there.
    ///
    /// The index is taken modulo the length of the list.
    pub fn set_start(&mut self, start: usize) {
        self.start = if self.servers.is_empty() {
            0
        } else {
            start % self.servers.len()
        };
        self.cur = self.start;
    }

    /// Returns the address of the current server.
    pub fn addr(&self) -> Option<SocketAddr> {
        if self.cur >= self.start + self.servers.len() {
            None
        } else {
            Some(self.servers[self.cur % self.servers.len()])
        }
    }

    /// Moves on to the next server.
    ///
    /// Returns whether there is such a server.
    pub fn next(&mut self) -> bool {
        if self.cur < self.start + self.servers.len() {
            self.cur += 1
        }
        self.addr().is_some()
    }

    /// Goes back to the start server.
    pub fn restart(&mut self) {
        self.cur = self.start
    }
}

//============ Testing =======================================================
