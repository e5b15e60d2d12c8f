//! Errors and failures.
//!
//! There are two kinds of things that can go wrong with a query. If the
//! query can’t even be started, the query methods of the context return an
//! [`Error`] right away. If a started query fails to produce an answer,
//! its handler receives a [`Failure`].

use crate::base::{NameError, Rcode, Response, Rtype};
use core::fmt;

//------------ Error ---------------------------------------------------------

/// A query could not be started.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// The name to look up is not a valid domain name.
    InvalidName(NameError),

    /// Queries for this record type can’t be sent by a stub resolver.
    UnsupportedType(Rtype),

    /// There are no nameservers to ask.
    NoNameservers,
}

impl From<NameError> for Error {
    fn from(err: NameError) -> Self {
        Error::InvalidName(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::InvalidName(ref err) => {
                write!(f, "invalid name: {}", err)
            }
            Error::UnsupportedType(rtype) => {
                write!(f, "unsupported query type {}", rtype)
            }
            Error::NoNameservers => f.write_str("no nameservers configured"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::InvalidName(ref err) => Some(err),
            _ => None,
        }
    }
}

//------------ Failure -------------------------------------------------------

/// A query did not produce an answer.
///
/// If several servers and names have been tried, the failure reports the
/// most informative outcome: a negative answer beats a server failure
/// which beats a timeout.
#[derive(Clone, Debug)]
pub enum Failure {
    /// No server responded in time.
    Timeout,

    /// The name does not exist.
    ///
    /// Contains the NXDOMAIN response received for the last name tried.
    NotFound(Response),

    /// Servers responded with an error.
    ///
    /// Contains the last such response.
    ServerFailure(Response),
}

impl Failure {
    /// Returns the response code of the response that caused the failure.
    pub fn rcode(&self) -> Option<Rcode> {
        self.response().map(Response::rcode)
    }

    /// Returns the response that caused the failure if there is one.
    pub fn response(&self) -> Option<&Response> {
        match *self {
            Failure::Timeout => None,
            Failure::NotFound(ref response)
            | Failure::ServerFailure(ref response) => Some(response),
        }
    }

    /// Returns whether this failure is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(*self, Failure::Timeout)
    }

    /// Returns the rank of the failure for picking the best one.
    fn rank(&self) -> u8 {
        match *self {
            Failure::Timeout => 0,
            Failure::ServerFailure(_) => 1,
            Failure::NotFound(_) => 2,
        }
    }

    /// Keeps whichever of the two failures is more informative.
    ///
    /// On a tie, the newer failure wins.
    pub(crate) fn merge(self, other: Failure) -> Failure {
        if other.rank() >= self.rank() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Failure::Timeout => f.write_str("query timed out"),
            Failure::NotFound(_) => f.write_str("name does not exist"),
            Failure::ServerFailure(ref response) => {
                write!(f, "server responded with {}", response.rcode())
            }
        }
    }
}

impl std::error::Error for Failure {}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    fn response(rcode: Rcode) -> Response {
        let mut msg = [0x12, 0x34, 0x81, 0x80, 0, 0, 0, 0, 0, 0, 0, 0];
        msg[3] |= rcode.to_int();
        Response::parse(&msg).unwrap()
    }

    #[test]
    fn merge_prefers_informative() {
        let failure = Failure::Timeout
            .merge(Failure::ServerFailure(response(Rcode::SERVFAIL)));
        assert_eq!(failure.rcode(), Some(Rcode::SERVFAIL));
        let failure = failure.merge(Failure::Timeout);
        assert_eq!(failure.rcode(), Some(Rcode::SERVFAIL));
        let failure =
            failure.merge(Failure::NotFound(response(Rcode::NXDOMAIN)));
        assert_eq!(failure.rcode(), Some(Rcode::NXDOMAIN));
        let failure =
            failure.merge(Failure::ServerFailure(response(Rcode::REFUSED)));
        assert_eq!(failure.rcode(), Some(Rcode::NXDOMAIN));
        assert!(Failure::Timeout.is_timeout());
        assert!(Failure::Timeout.response().is_none());
    }

    #[test]
    fn display() {
        assert_eq!(
            Error::UnsupportedType(Rtype::AXFR).to_string(),
            "unsupported query type AXFR"
        );
        assert_eq!(
            Failure::ServerFailure(response(Rcode::REFUSED)).to_string(),
            "server responded with REFUSED"
        );
    }
}
