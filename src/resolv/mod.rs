//! An asynchronous stub resolver context.
//!
//! The [`Context`] sends queries to a set of nameservers over UDP, retries
//! them on timeout, moves on to other servers when they fail to answer,
//! and expands relative names through a search list. The results are
//! handed to a [`Handler`] given with each query.
//!
//! The context performs no I/O on its own. It is driven by the host
//! application through [`Context::process`] and tells the host when it
//! needs attention next through [`Context::next_timeout`]. Sockets are
//! created through a [`Transport`][crate::net::Transport].

pub use self::arena::Handle;
pub use self::conf::{ResolvConf, Settings};
pub use self::context::Context;
pub use self::error::{Error, Failure};
pub use self::handler::{Callbacks, Handler};
pub use self::operation::Phase;

pub mod conf;
pub mod error;
pub mod handler;

mod arena;
mod context;
mod operation;
mod search;
mod servers;
mod sockets;
