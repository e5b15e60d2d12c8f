//! Basics.
//!
//! This module provides the DNS data types the resolver needs to talk to
//! nameservers: validated domain names, the IANA registries for record
//! types, classes, and response codes, and the means to compose queries
//! and take apart the responses to them.
//!
//! In order to easily distinguish the process of creating and disecting
//! wire-format messages, we use the term *parsing* for extracting data
//! from a wire-format representation and *composing* for producing such a
//! representation.
//!
//! Both happen on buffers holding a complete DNS message. A query is
//! created in one go by [`compose_query`]. A response is parsed into a
//! [`Response`] which owns all its records, so it can be handed to result
//! handlers without any lifetimes attached.

pub use self::bits::Bits;
pub use self::header::Header;
pub use self::iana::{Class, Rcode, Rtype};
pub use self::message::{
    compose_query, ParseError, Question, Record, RecordData, Request,
    Response, Soa,
};
pub use self::name::{Name, NameError};

pub mod bits;
pub mod header;
pub mod iana;
pub mod message;
pub mod name;
