//! Resource Record (RR) TYPEs

//------------ Rtype ---------------------------------------------------------

int_enum! {
    /// Resource Record Types.
    ///
    /// Each resource records has a 16 bit type value indicating what kind of
    /// information is represented by the record. Normal query includes the
    /// type of record information is requested for. A few aditional types,
    /// called query types, are defined as well and can only be used in
    /// questions.
    ///
    /// Only the types a stub resolver is likely to encounter carry a
    /// mnemonic here. Everything else is displayed in the generic `TYPEnnn`
    /// form.
    =>
    Rtype, u16, "TYPE";

    /// A host address.
    (A => 1, "A")

    /// An authoritative name server.
    (NS => 2, "NS")

    /// The canonical name for an alias.
    (CNAME => 5, "CNAME")

    /// Marks the start of a zone of authority.
    (SOA => 6, "SOA")

    /// A domain name pointer.
    (PTR => 12, "PTR")

    /// Host information.
    (HINFO => 13, "HINFO")

    /// Mail exchange.
    (MX => 15, "MX")

    /// Text strings.
    (TXT => 16, "TXT")

    /// IPv6 address.
    (AAAA => 28, "AAAA")

    /// Server selection.
    (SRV => 33, "SRV")

    /// Naming authority pointer.
    (NAPTR => 35, "NAPTR")

    /// OPT pseudo-record.
    (OPT => 41, "OPT")

    /// Delegation signer.
    (DS => 43, "DS")

    /// SSH key fingerprint.
    (SSHFP => 44, "SSHFP")

    /// RRSIG.
    (RRSIG => 46, "RRSIG")

    /// DNSKEY.
    (DNSKEY => 48, "DNSKEY")

    /// TLSA.
    (TLSA => 52, "TLSA")

    /// General purpose service binding.
    (SVCB => 64, "SVCB")

    /// Service binding type for use with HTTPS.
    (HTTPS => 65, "HTTPS")

    /// Transaction key.
    (TKEY => 249, "TKEY")

    /// Transaction signature.
    (TSIG => 250, "TSIG")

    /// Incremental transfer.
    (IXFR => 251, "IXFR")

    /// Transfer of entire zone.
    (AXFR => 252, "AXFR")

    /// Mailbox-related RRs (MB, MG, or MR).
    (MAILB => 253, "MAILB")

    /// Mail agent RRs.
    (MAILA => 254, "MAILA")

    /// A request for all records the server/cache has available.
    (ANY => 255, "ANY")

    /// Certification Authority Restriction.
    (CAA => 257, "CAA")
}

impl Rtype {
    /// Returns whether a query for this type can be sent by the resolver.
    ///
    /// Type zero, meta types that only make sense inside a message (OPT,
    /// TKEY, TSIG), zone transfers that require a stream transport, and the
    /// obsolete mail query types are rejected.
    pub fn is_queryable(self) -> bool {
        !matches!(
            self,
            Rtype(0)
                | Rtype::OPT
                | Rtype::TKEY
                | Rtype::TSIG
                | Rtype::IXFR
                | Rtype::AXFR
                | Rtype::MAILB
                | Rtype::MAILA
        )
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn queryable() {
        assert!(Rtype::A.is_queryable());
        assert!(Rtype::ANY.is_queryable());
        assert!(Rtype::from_int(65280).is_queryable());
        assert!(!Rtype::from_int(0).is_queryable());
        assert!(!Rtype::AXFR.is_queryable());
        assert!(!Rtype::OPT.is_queryable());
    }

    #[test]
    fn mnemonics() {
        assert_eq!(Rtype::AAAA.to_string(), "AAAA");
        assert_eq!(Rtype::from_int(1234).to_string(), "TYPE1234");
        assert_eq!("aaaa".parse::<Rtype>(), Ok(Rtype::AAAA));
        assert_eq!("TYPE1234".parse::<Rtype>(), Ok(Rtype::from_int(1234)));
        assert_eq!(format!("{:?}", Rtype::MX), "Rtype::MX");
    }
}
