//! IANA Definitions for DNS.
//!
//! This module contains types for parameters defined in IANA registries
//! that are relevant for a stub resolver.
//!
//! All types defined hereunder follow the same basic structure. They are
//! newtypes around the raw integer value with associated constants for all
//! well-defined values. There are two methods `from_int()` and `to_int()`
//! to convert from and to raw integer values as well as implementations of
//! the `From` trait for these. `FromStr` and `Display` are implemented to
//! convert from the mnemonics to the values and back.

use core::fmt;

#[macro_use]
mod macros;

mod class;
mod rcode;
mod rtype;

pub use self::class::Class;
pub use self::rcode::Rcode;
pub use self::rtype::Rtype;

//------------ FromStrError --------------------------------------------------

/// An error happened while converting a mnemonic into an IANA value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FromStrError;

impl fmt::Display for FromStrError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("unknown mnemonic")
    }
}

impl std::error::Error for FromStrError {}
