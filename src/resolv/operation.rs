//! The state machine of a single query.
//!
//! An operation tries its candidate names one after another. For each
//! name, it walks around its snapshot of the server list beginning at the
//! start server. For each pair of name and server, it runs an *attempt
//! series*: the request is sent up to `attempts` times spaced by `interval`
//! using the same socket and transaction ID, and after the last send it
//! waits for `timeout` before giving up on the server.
//!
//! A successful response finishes the operation right away. A negative
//! response moves on to the next name. Any other response moves on to the
//! next server. Once all pairs are used up, the operation fails with the
//! most informative failure it has seen.
//!
//! The operation never performs any delivery itself. When it reaches a
//! result, it enters the delivering phase and waits for the context to
//! hand the result to its handler.

use super::error::Failure;
use super::handler::Handler;
use super::arena::Handle;
use super::conf::Settings;
use super::search::Candidates;
use super::servers::ServerListCounter;
use super::sockets::{SocketId, SocketPool};
use crate::base::{compose_query, Bits, Name, Question, Rcode, Response, Rtype};
use crate::net::Family;
use bytes::Bytes;
use core::fmt;
use std::boxed::Box;
use std::io;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{debug, trace};

//------------ Phase ---------------------------------------------------------

/// The phase an operation is in.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Phase {
    /// The operation waits for a free slot.
    Queued,

    /// The operation waits for a response or its next timer.
    Waiting,

    /// The operation has a result that waits for delivery.
    Delivering,
}

//------------ Outcome -------------------------------------------------------

/// The result of an operation.
#[derive(Debug)]
pub(crate) enum Outcome {
    Resolved(Response),
    Failed(Failure),
}

//------------ Attempt -------------------------------------------------------

/// An attempt series in progress.
#[derive(Debug)]
struct Attempt {
    socket: SocketId,
    server: SocketAddr,
    id: u16,
    question: Question,
    message: Bytes,

    /// How many times the message has been sent in this series.
    sends: usize,

    /// When the timer of the series fires next.
    next: Instant,
}

//------------ State ---------------------------------------------------------

#[derive(Debug)]
enum State {
    Queued,
    Waiting(Attempt),
    Delivering(Outcome),
}

//------------ Sent ----------------------------------------------------------

/// What happened when sending a datagram.
enum Sent {
    /// The datagram is on its way, or may yet be retransmitted.
    Pending,

    /// The server can’t be reached through this socket.
    Unreachable,
}

//------------ Operation -----------------------------------------------------

/// A query in a resolver context.
pub(crate) struct Operation {
    settings: Settings,
    candidates: Candidates,
    candidate: usize,
    rtype: Rtype,
    bits: Bits,
    created: Instant,

    /// The servers to try.
    servers: ServerListCounter,

    handler: Box<dyn Handler>,
    state: State,

    /// The most informative failure so far.
    failure: Option<Failure>,

    /// The total number of datagrams sent.
    sends: usize,
}

impl Operation {
    pub fn new(
        candidates: Candidates,
        rtype: Rtype,
        bits: Bits,
        settings: Settings,
        servers: ServerListCounter,
        handler: Box<dyn Handler>,
        now: Instant,
    ) -> Self {
        Operation {
            settings,
            candidates,
            candidate: 0,
            rtype,
            bits,
            created: now,
            servers,
            handler,
            state: State::Queued,
            failure: None,
            sends: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Queued => Phase::Queued,
            State::Waiting(_) => Phase::Waiting,
            State::Delivering(_) => Phase::Delivering,
        }
    }

    /// Returns when the operation needs to be woken up by the timer.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            State::Waiting(ref attempt) => Some(attempt.next),
            _ => None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn candidates(&self) -> &[Name] {
        &self.candidates
    }

    pub fn sends(&self) -> usize {
        self.sends
    }

    /// Starts the operation beginning with the server at index `start`.
    pub fn launch(
        &mut self,
        handle: Handle,
        start: usize,
        pool: &mut SocketPool,
        now: Instant,
    ) {
        self.servers.set_start(start);
        debug!(
            "launching {:?}: {} {} with {} candidates, {} servers",
            handle,
            self.candidates[0],
            self.rtype,
            self.candidates.len(),
            self.servers.len()
        );
        self.start_series(handle, pool, now)
    }

    /// Processes the timer of the current attempt series.
    pub fn timer(&mut self, handle: Handle, pool: &mut SocketPool, now: Instant) {
        let sends = match self.state {
            State::Waiting(ref attempt) => attempt.sends,
            _ => return,
        };
        if sends < self.settings.attempts() {
            trace!("{:?}: retransmitting", handle);
            if let Sent::Unreachable = self.send(pool, now) {
                self.next_server(handle, pool, now);
            }
        } else {
            debug!("{:?}: server timed out", handle);
            self.record(Failure::Timeout);
            self.next_server(handle, pool, now);
        }
    }

    /// Processes a response received for the current attempt series.
    ///
    /// Responses that don’t come from the current server or don’t answer
    /// the current question are ignored.
    pub fn response(
        &mut self,
        handle: Handle,
        response: Response,
        source: SocketAddr,
        pool: &mut SocketPool,
        now: Instant,
    ) {
        let attempt = match self.state {
            State::Waiting(ref attempt) => attempt,
            _ => return,
        };
        if source != attempt.server {
            trace!("{:?}: response from wrong source {}", handle, source);
            return;
        }
        if !response.is_answer_to(attempt.id, &attempt.question) {
            trace!("{:?}: response doesn’t match question", handle);
            return;
        }

        let rcode = response.rcode();
        debug!("{:?}: {} from {}", handle, rcode, source);
        if rcode == Rcode::NOERROR {
            self.release(pool);
            self.state = State::Delivering(Outcome::Resolved(response));
        } else if rcode == Rcode::NXDOMAIN {
            self.record(Failure::NotFound(response));
            self.next_candidate(handle, pool, now);
        } else {
            self.record(Failure::ServerFailure(response));
            self.next_server(handle, pool, now);
        }
    }

    /// Releases all resources held by the operation.
    pub fn cancel(&mut self, pool: &mut SocketPool) {
        self.release(pool);
    }

    /// Takes the handler and outcome for delivery.
    pub fn finish(self) -> Option<(Box<dyn Handler>, Outcome)> {
        match self.state {
            State::Delivering(outcome) => Some((self.handler, outcome)),
            _ => None,
        }
    }

    /// Starts an attempt series for the current candidate and server.
    ///
    /// Moves on to further servers and candidates until a series could be
    /// started or there is nothing left to try.
    fn start_series(&mut self, handle: Handle, pool: &mut SocketPool, now: Instant) {
        loop {
            let server = match self.servers.addr() {
                Some(server) => server,
                None => {
                    if self.advance_candidate() {
                        continue;
                    }
                    return self.fail(handle, now);
                }
            };
            let question =
                Question::new(self.candidates[self.candidate].clone(), self.rtype);
            let family = Family::of(&server);
            let socket = match pool.acquire(
                family,
                self.settings.sockets(),
                self.settings.buffer_size(),
                now,
            ) {
                Ok(socket) => socket,
                Err(_) => {
                    self.advance_server();
                    continue;
                }
            };
            let id = match pool.reserve_id(socket, handle) {
                Some(id) => id,
                None => {
                    self.advance_server();
                    continue;
                }
            };
            trace!(
                "{:?}: asking {} for {} with ID {} on {:?}",
                handle,
                server,
                question,
                id,
                socket
            );
            let message = compose_query(id, &question, self.bits);
            self.state = State::Waiting(Attempt {
                socket,
                server,
                id,
                question,
                message,
                sends: 0,
                next: now,
            });
            match self.send(pool, now) {
                Sent::Pending => return,
                Sent::Unreachable => {
                    self.release(pool);
                    self.advance_server();
                }
            }
        }
    }

    /// Sends the message of the current series.
    fn send(&mut self, pool: &mut SocketPool, now: Instant) -> Sent {
        let attempt = match self.state {
            State::Waiting(ref mut attempt) => attempt,
            _ => return Sent::Unreachable,
        };
        attempt.sends += 1;
        self.sends += 1;
        attempt.next = if attempt.sends < self.settings.attempts() {
            now + self.settings.interval()
        } else {
            now + self.settings.timeout()
        };
        match pool.send(attempt.socket, &attempt.message, attempt.server) {
            Ok(()) => Sent::Pending,
            Err(err) if is_unreachable(&err) => {
                debug!("cannot reach {}: {}", attempt.server, err);
                Sent::Unreachable
            }
            Err(err) => {
                debug!("sending to {} failed: {}", attempt.server, err);
                Sent::Pending
            }
        }
    }

    /// Ends the current series and starts one with the next server.
    fn next_server(&mut self, handle: Handle, pool: &mut SocketPool, now: Instant) {
        self.release(pool);
        self.advance_server();
        self.start_series(handle, pool, now)
    }

    /// Ends the current series and starts one with the next candidate.
    ///
    /// If this was the last candidate, the operation fails.
    fn next_candidate(&mut self, handle: Handle, pool: &mut SocketPool, now: Instant) {
        self.release(pool);
        if self.advance_candidate() {
            self.start_series(handle, pool, now)
        } else {
            self.fail(handle, now)
        }
    }

    fn advance_server(&mut self) {
        self.servers.next();
    }

    /// Moves to the next candidate starting over with the start server.
    ///
    /// Returns whether there was another candidate.
    fn advance_candidate(&mut self) -> bool {
        if self.candidate + 1 >= self.candidates.len() {
            return false;
        }
        self.candidate += 1;
        self.servers.restart();
        trace!("trying next candidate {}", self.candidates[self.candidate]);
        true
    }

    fn fail(&mut self, handle: Handle, now: Instant) {
        let failure = self.failure.take().unwrap_or(Failure::Timeout);
        debug!(
            "{:?}: failed after {:?}: {}",
            handle,
            now.saturating_duration_since(self.created),
            failure
        );
        self.state = State::Delivering(Outcome::Failed(failure));
    }

    fn record(&mut self, failure: Failure) {
        self.failure = Some(match self.failure.take() {
            Some(old) => old.merge(failure),
            None => failure,
        });
    }

    /// Releases the socket and transaction ID of the current series.
    fn release(&mut self, pool: &mut SocketPool) {
        if let State::Waiting(ref attempt) = self.state {
            pool.release(attempt.socket, attempt.id);
            self.state = State::Queued;
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Operation")
            .field("candidates", &self.candidates)
            .field("candidate", &self.candidate)
            .field("rtype", &self.rtype)
            .field("state", &self.state)
            .field("sends", &self.sends)
            .finish()
    }
}

/// Returns whether a send error means the server can’t be reached.
fn is_unreachable(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::AddrNotAvailable
    )
}
