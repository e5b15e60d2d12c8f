//! Flags to include in a query.

use super::header::Header;

//------------ Bits ----------------------------------------------------------

/// The flags the resolver sets in the queries it sends.
///
/// Three of the flags live in the message header. The DNSSEC OK flag is
/// part of the OPT record in the additional section that every query
/// carries.
///
/// By default only the recursion desired flag is set.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bits {
    /// Recursion desired.
    rd: bool,

    /// Authentic data, i.e., ask for the AD bit in the response.
    ad: bool,

    /// Checking disabled.
    cd: bool,

    /// DNSSEC OK.
    dnssec_ok: bool,
}

impl Bits {
    /// Creates a value with no flags set at all.
    pub const fn none() -> Self {
        Bits {
            rd: false,
            ad: false,
            cd: false,
            dnssec_ok: false,
        }
    }

    /// Returns whether the recursion desired flag is set.
    pub fn rd(self) -> bool {
        self.rd
    }

    /// Sets the recursion desired flag.
    pub fn set_rd(&mut self, set: bool) {
        self.rd = set
    }

    /// Returns whether the authentic data flag is set.
    pub fn ad(self) -> bool {
        self.ad
    }

    /// Sets the authentic data flag.
    pub fn set_ad(&mut self, set: bool) {
        self.ad = set
    }

    /// Returns whether the checking disabled flag is set.
    pub fn cd(self) -> bool {
        self.cd
    }

    /// Sets the checking disabled flag.
    pub fn set_cd(&mut self, set: bool) {
        self.cd = set
    }

    /// Returns whether the DNSSEC OK flag is set.
    pub fn dnssec_ok(self) -> bool {
        self.dnssec_ok
    }

    /// Sets the DNSSEC OK flag.
    pub fn set_dnssec_ok(&mut self, set: bool) {
        self.dnssec_ok = set
    }

    /// Applies the header flags to a header.
    pub(crate) fn apply(self, header: &mut Header) {
        header.set_rd(self.rd);
        header.set_ad(self.ad);
        header.set_cd(self.cd);
    }
}

impl Default for Bits {
    fn default() -> Self {
        Bits {
            rd: true,
            ..Self::none()
        }
    }
}
