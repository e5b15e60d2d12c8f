//! An asynchronous DNS resolver context.
//!
//! This crate provides a stub resolver meant to be embedded into the event
//! loop of a host application. Queries are started on a
//! [`Context`][resolv::Context] and their results are delivered to a
//! [`Handler`][resolv::Handler] later on when the host lets the context
//! process what has happened in the meantime.
//!
//! The context sends queries to its nameservers over UDP, retransmits
//! them, moves on to the next nameserver when one doesn’t respond, and
//! tries the names produced by its search list one after another. It limits
//! the number of queries in flight and the number of results delivered in
//! one go, so that a busy resolver can’t starve the host.
//!
//! # Modules
//!
//! * [base] contains the DNS data types: domain names, the IANA
//!   registries, and composing and parsing of messages,
//! * [net] contains the datagram socket abstraction the context uses and
//!   its implementations, and
//! * [resolv] contains the resolver context itself along with its
//!   configuration.
//!
//! # Reference of Feature Flags
//!
//! * `serde`: Enables serde serialization for the settings and a number
//!   of basic types.
//! * `tokio`: Enables the Tokio based transport and driver in
//!   `net::driver`. This feature is enabled by default.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod base;
pub mod net;
pub mod resolv;
pub mod utils;
