//! The header of a DNS message.
//!
//! Each DNS message starts with a twelve octet long header section
//! containing some general information related to the message as well as
//! the number of records in each of the four sections that follow the
//! header. Its content and format are defined in section 4.1.1 of
//! [RFC 1035].
//!
//! [RFC 1035]: https://tools.ietf.org/html/rfc1035

use super::iana::Rcode;
use super::message::ParseError;
use bytes::BufMut;

//------------ Header --------------------------------------------------------

/// The header section of a DNS message.
///
/// The data is layed out like this:
///
/// ```text
///                                 1  1  1  1  1  1
///   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      ID                       |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |QR|   Opcode  |AA|TC|RD|RA|Z |AD|CD|   RCODE   |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    QDCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    ANCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    NSCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    ARCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Header {
    /// The message ID.
    pub id: u16,

    /// The two flag octets including opcode and rcode.
    flags: [u8; 2],

    /// The number of entries in the question section.
    pub qdcount: u16,

    /// The number of records in the answer section.
    pub ancount: u16,

    /// The number of records in the authority section.
    pub nscount: u16,

    /// The number of records in the additional section.
    pub arcount: u16,
}

/// # Field Access
///
impl Header {
    /// The length of the header in octets.
    pub const LEN: usize = 12;

    /// Creates a header with the given ID and everything else zeroed.
    pub fn new(id: u16) -> Self {
        Header {
            id,
            ..Default::default()
        }
    }

    /// Returns whether the QR bit is set, i.e., this is a response.
    pub fn qr(&self) -> bool {
        self.get_bit(0, 7)
    }

    /// Sets the value of the QR bit.
    pub fn set_qr(&mut self, set: bool) {
        self.set_bit(0, 7, set)
    }

    /// Returns the opcode.
    pub fn opcode(&self) -> u8 {
        (self.flags[0] >> 3) & 0x0F
    }

    /// Returns whether the AA bit is set.
    pub fn aa(&self) -> bool {
        self.get_bit(0, 2)
    }

    /// Sets the value of the AA bit.
    pub fn set_aa(&mut self, set: bool) {
        self.set_bit(0, 2, set)
    }

    /// Returns whether the TC bit is set.
    pub fn tc(&self) -> bool {
        self.get_bit(0, 1)
    }

    /// Sets the value of the TC bit.
    pub fn set_tc(&mut self, set: bool) {
        self.set_bit(0, 1, set)
    }

    /// Returns whether the RD bit is set.
    pub fn rd(&self) -> bool {
        self.get_bit(0, 0)
    }

    /// Sets the value of the RD bit.
    pub fn set_rd(&mut self, set: bool) {
        self.set_bit(0, 0, set)
    }

    /// Returns whether the RA bit is set.
    pub fn ra(&self) -> bool {
        self.get_bit(1, 7)
    }

    /// Sets the value of the RA bit.
    pub fn set_ra(&mut self, set: bool) {
        self.set_bit(1, 7, set)
    }

    /// Returns whether the AD bit is set.
    pub fn ad(&self) -> bool {
        self.get_bit(1, 5)
    }

    /// Sets the value of the AD bit.
    pub fn set_ad(&mut self, set: bool) {
        self.set_bit(1, 5, set)
    }

    /// Returns whether the CD bit is set.
    pub fn cd(&self) -> bool {
        self.get_bit(1, 4)
    }

    /// Sets the value of the CD bit.
    pub fn set_cd(&mut self, set: bool) {
        self.set_bit(1, 4, set)
    }

    /// Returns the response code.
    pub fn rcode(&self) -> Rcode {
        Rcode::from_int(self.flags[1] & 0x0F)
    }

    /// Sets the response code.
    pub fn set_rcode(&mut self, rcode: Rcode) {
        self.flags[1] = (self.flags[1] & 0xF0) | (rcode.to_int() & 0x0F)
    }

    fn get_bit(&self, offset: usize, bit: usize) -> bool {
        self.flags[offset] & (1 << bit) != 0
    }

    fn set_bit(&mut self, offset: usize, bit: usize, set: bool) {
        if set {
            self.flags[offset] |= 1 << bit
        } else {
            self.flags[offset] &= !(1 << bit)
        }
    }
}

/// # Parsing and Composing
///
impl Header {
    /// Parses a header from the start of a message.
    pub fn parse(octets: &[u8]) -> Result<Self, ParseError> {
        if octets.len() < Self::LEN {
            return Err(ParseError::ShortInput);
        }
        let u16_at = |pos: usize| u16::from_be_bytes([octets[pos], octets[pos + 1]]);
        Ok(Header {
            id: u16_at(0),
            flags: [octets[2], octets[3]],
            qdcount: u16_at(4),
            ancount: u16_at(6),
            nscount: u16_at(8),
            arcount: u16_at(10),
        })
    }

    /// Appends the wire format of the header to `target`.
    pub fn compose(&self, target: &mut impl BufMut) {
        target.put_u16(self.id);
        target.put_slice(&self.flags);
        target.put_u16(self.qdcount);
        target.put_u16(self.ancount);
        target.put_u16(self.nscount);
        target.put_u16(self.arcount);
    }
}

//============ Testing =======================================================
