//! DNS response codes.

//------------ Rcode --------------------------------------------------------

int_enum! {
    /// DNS Response Codes.
    ///
    /// The response code of a response indicates what happend on the server
    /// when trying to answer the query. The code is a 4 bit value and part
    /// of the header of a DNS message.
    ///
    /// Only the header part is represented here. Extended response codes
    /// carried in the OPT record are not considered by the resolver.
    =>
    Rcode, u8, "RCODE";

    /// No error condition.
    ///
    /// (Otherwise known as success.)
    (NOERROR => 0, "NOERROR")

    /// Format error.
    ///
    /// The name server was unable to interpret the query.
    (FORMERR => 1, "FORMERR")

    /// Server failure.
    ///
    /// The name server was unable to process this query due to a problem
    /// with the name server.
    (SERVFAIL => 2, "SERVFAIL")

    /// Name error.
    ///
    /// The domain name given in the query does not exist at the name
    /// server.
    (NXDOMAIN => 3, "NXDOMAIN")

    /// Not implemented.
    ///
    /// The name server does not support the requested kind of query.
    (NOTIMP => 4, "NOTIMP")

    /// Query refused.
    ///
    /// The name server refused to perform the operation requested by the
    /// query for policy reasons.
    (REFUSED => 5, "REFUSED")

    /// Name exists when it should not.
    (YXDOMAIN => 6, "YXDOMAIN")

    /// RR set exists when it should not.
    (YXRRSET => 7, "YXRRSET")

    /// RR set that should exist does not.
    (NXRRSET => 8, "NXRRSET")

    /// Server not authoritative for zone or client not authorized.
    (NOTAUTH => 9, "NOTAUTH")

    /// Name not contained in zone.
    (NOTZONE => 10, "NOTZONE")
}

impl Rcode {
    /// Returns whether the code is a conclusive answer to a query.
    ///
    /// Only `NOERROR` and `NXDOMAIN` say something about the queried name.
    /// Every other code says something about the server instead.
    pub fn is_conclusive(self) -> bool {
        self == Rcode::NOERROR || self == Rcode::NXDOMAIN
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn conclusive() {
        assert!(Rcode::NOERROR.is_conclusive());
        assert!(Rcode::NXDOMAIN.is_conclusive());
        assert!(!Rcode::SERVFAIL.is_conclusive());
        assert!(!Rcode::REFUSED.is_conclusive());
    }

    #[test]
    fn from_str() {
        assert_eq!("nxdomain".parse::<Rcode>(), Ok(Rcode::NXDOMAIN));
        assert_eq!("RCODE12".parse::<Rcode>(), Ok(Rcode::from_int(12)));
        assert!("bogus".parse::<Rcode>().is_err());
    }
}
