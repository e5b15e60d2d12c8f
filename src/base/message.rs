//! Composing queries and parsing responses.
//!
//! The resolver only ever sends one kind of message: a query with a single
//! question and an OPT record. This module provides [`compose_query`] for
//! creating these and the [`Response`] type for taking apart whatever comes
//! back. For the benefit of test servers and other responders, the
//! [`Request`] type does the reverse.
//!
//! Record data is decoded for the types a stub resolver typically deals
//! with. All other record data is kept as raw octets.

use super::bits::Bits;
use super::header::Header;
use super::iana::{Class, Rcode, Rtype};
use super::name::Name;
use bytes::{BufMut, Bytes, BytesMut};
use core::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::vec::Vec;

//------------ Module Configuration ------------------------------------------

/// The UDP payload size announced in the OPT record of a query.
///
/// See draft-ietf-dnsop-avoid-fragmentation for a discussion.
pub const DEF_UDP_PAYLOAD_SIZE: u16 = 1232;

/// The maximum number of compression pointers followed in a single name.
const MAX_POINTERS: usize = 64;

/// The DO bit in the TTL field of an OPT record.
const DNSSEC_OK: u32 = 0x8000;

//------------ compose_query -------------------------------------------------

/// Creates the wire format of a query.
///
/// The message has the given `id`, a single `question`, and the header
/// flags from `bits`. An OPT record announcing [`DEF_UDP_PAYLOAD_SIZE`] and
/// carrying the DO flag from `bits` is added to the additional section.
pub fn compose_query(id: u16, question: &Question, bits: Bits) -> Bytes {
    let mut header = Header::new(id);
    header.qdcount = 1;
    header.arcount = 1;
    bits.apply(&mut header);

    let mut target = BytesMut::with_capacity(
        Header::LEN + question.qname.wire_len() + 4 + 11,
    );
    header.compose(&mut target);
    question.compose(&mut target);

    // OPT: root owner, class is the payload size, TTL holds the flags.
    target.put_u8(0);
    target.put_u16(Rtype::OPT.to_int());
    target.put_u16(DEF_UDP_PAYLOAD_SIZE);
    target.put_u32(if bits.dnssec_ok() { DNSSEC_OK } else { 0 });
    target.put_u16(0);
    target.freeze()
}

//------------ Question ------------------------------------------------------

/// A question: a name and record type in class IN.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Question {
    qname: Name,
    qtype: Rtype,
    qclass: Class,
}

impl Question {
    /// Creates a new question for class IN.
    pub fn new(qname: Name, qtype: Rtype) -> Self {
        Question {
            qname,
            qtype,
            qclass: Class::IN,
        }
    }

    /// Returns the name asked for.
    pub fn qname(&self) -> &Name {
        &self.qname
    }

    /// Returns the record type asked for.
    pub fn qtype(&self) -> Rtype {
        self.qtype
    }

    /// Returns the class asked for.
    pub fn qclass(&self) -> Class {
        self.qclass
    }

    fn parse(parser: &mut Parser) -> Result<Self, ParseError> {
        Ok(Question {
            qname: parser.parse_name()?,
            qtype: Rtype::from_int(parser.parse_u16()?),
            qclass: Class::from_int(parser.parse_u16()?),
        })
    }

    fn compose(&self, target: &mut impl BufMut) {
        self.qname.compose(target);
        target.put_u16(self.qtype.to_int());
        target.put_u16(self.qclass.to_int());
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.qname, self.qclass, self.qtype)
    }
}

//------------ Record --------------------------------------------------------

/// A resource record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    owner: Name,
    class: Class,
    ttl: u32,
    data: RecordData,
}

impl Record {
    /// Creates a new record of class IN.
    pub fn new(owner: Name, ttl: u32, data: RecordData) -> Self {
        Record {
            owner,
            class: Class::IN,
            ttl,
            data,
        }
    }

    /// Returns the owner name of the record.
    pub fn owner(&self) -> &Name {
        &self.owner
    }

    /// Returns the record type.
    pub fn rtype(&self) -> Rtype {
        self.data.rtype()
    }

    /// Returns the class of the record.
    pub fn class(&self) -> Class {
        self.class
    }

    /// Returns the TTL of the record in seconds.
    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Returns the record data.
    pub fn data(&self) -> &RecordData {
        &self.data
    }

    fn parse(parser: &mut Parser) -> Result<Self, ParseError> {
        let owner = parser.parse_name()?;
        let rtype = Rtype::from_int(parser.parse_u16()?);
        let class = Class::from_int(parser.parse_u16()?);
        let ttl = parser.parse_u32()?;
        let rdlen = usize::from(parser.parse_u16()?);
        let end = parser.pos + rdlen;
        if end > parser.octets.len() {
            return Err(ParseError::ShortInput);
        }
        let data = RecordData::parse(rtype, parser, end)?;
        if parser.pos != end {
            return Err(ParseError::BadRecordData);
        }
        Ok(Record {
            owner,
            class,
            ttl,
            data,
        })
    }

    fn compose(&self, target: &mut BytesMut) {
        self.owner.compose(target);
        target.put_u16(self.rtype().to_int());
        target.put_u16(self.class.to_int());
        target.put_u32(self.ttl);
        let len_pos = target.len();
        target.put_u16(0);
        self.data.compose(target);
        let rdlen = (target.len() - len_pos - 2) as u16;
        target[len_pos..len_pos + 2].copy_from_slice(&rdlen.to_be_bytes());
    }
}

//------------ RecordData ----------------------------------------------------

/// The data of a resource record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RecordData {
    /// An IPv4 host address.
    A(Ipv4Addr),

    /// An IPv6 host address.
    Aaaa(Ipv6Addr),

    /// An authoritative name server.
    Ns(Name),

    /// The canonical name of an alias.
    Cname(Name),

    /// A domain name pointer.
    Ptr(Name),

    /// A mail exchange.
    Mx {
        /// The preference of this exchange over others.
        preference: u16,

        /// The name of the exchange host.
        exchange: Name,
    },

    /// Text strings.
    Txt(Vec<Bytes>),

    /// The start of a zone of authority.
    Soa(Soa),

    /// Data of any other type, kept in wire format.
    Other(Rtype, Bytes),
}

impl RecordData {
    /// Returns the record type of the data.
    pub fn rtype(&self) -> Rtype {
        match *self {
            RecordData::A(_) => Rtype::A,
            RecordData::Aaaa(_) => Rtype::AAAA,
            RecordData::Ns(_) => Rtype::NS,
            RecordData::Cname(_) => Rtype::CNAME,
            RecordData::Ptr(_) => Rtype::PTR,
            RecordData::Mx { .. } => Rtype::MX,
            RecordData::Txt(_) => Rtype::TXT,
            RecordData::Soa(_) => Rtype::SOA,
            RecordData::Other(rtype, _) => rtype,
        }
    }

    fn parse(
        rtype: Rtype,
        parser: &mut Parser,
        end: usize,
    ) -> Result<Self, ParseError> {
        let res = match rtype {
            Rtype::A => {
                let octets: [u8; 4] = parser
                    .parse_slice(end - parser.pos)?
                    .try_into()
                    .map_err(|_| ParseError::BadRecordData)?;
                RecordData::A(octets.into())
            }
            Rtype::AAAA => {
                let octets: [u8; 16] = parser
                    .parse_slice(end - parser.pos)?
                    .try_into()
                    .map_err(|_| ParseError::BadRecordData)?;
                RecordData::Aaaa(octets.into())
            }
            Rtype::NS => RecordData::Ns(parser.parse_name()?),
            Rtype::CNAME => RecordData::Cname(parser.parse_name()?),
            Rtype::PTR => RecordData::Ptr(parser.parse_name()?),
            Rtype::MX => RecordData::Mx {
                preference: parser.parse_u16()?,
                exchange: parser.parse_name()?,
            },
            Rtype::TXT => {
                let mut strings = Vec::new();
                while parser.pos < end {
                    let len = usize::from(parser.parse_u8()?);
                    strings.push(Bytes::copy_from_slice(
                        parser.parse_slice(len)?,
                    ));
                }
                RecordData::Txt(strings)
            }
            Rtype::SOA => RecordData::Soa(Soa {
                mname: parser.parse_name()?,
                rname: parser.parse_name()?,
                serial: parser.parse_u32()?,
                refresh: parser.parse_u32()?,
                retry: parser.parse_u32()?,
                expire: parser.parse_u32()?,
                minimum: parser.parse_u32()?,
            }),
            _ => RecordData::Other(
                rtype,
                Bytes::copy_from_slice(parser.parse_slice(end - parser.pos)?),
            ),
        };
        Ok(res)
    }

    fn compose(&self, target: &mut BytesMut) {
        match *self {
            RecordData::A(addr) => target.put_slice(&addr.octets()),
            RecordData::Aaaa(addr) => target.put_slice(&addr.octets()),
            RecordData::Ns(ref name)
            | RecordData::Cname(ref name)
            | RecordData::Ptr(ref name) => name.compose(target),
            RecordData::Mx {
                preference,
                ref exchange,
            } => {
                target.put_u16(preference);
                exchange.compose(target);
            }
            RecordData::Txt(ref strings) => {
                for item in strings {
                    let len = item.len().min(255);
                    target.put_u8(len as u8);
                    target.put_slice(&item[..len]);
                }
            }
            RecordData::Soa(ref soa) => {
                soa.mname.compose(target);
                soa.rname.compose(target);
                target.put_u32(soa.serial);
                target.put_u32(soa.refresh);
                target.put_u32(soa.retry);
                target.put_u32(soa.expire);
                target.put_u32(soa.minimum);
            }
            RecordData::Other(_, ref data) => target.put_slice(data),
        }
    }
}

//------------ Soa -----------------------------------------------------------

/// The data of an SOA record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Soa {
    /// The primary name server of the zone.
    pub mname: Name,

    /// The mailbox of the person responsible for the zone.
    pub rname: Name,

    /// The serial number of the zone.
    pub serial: u32,

    /// The refresh interval in seconds.
    pub refresh: u32,

    /// The retry interval in seconds.
    pub retry: u32,

    /// The expire limit in seconds.
    pub expire: u32,

    /// The TTL for negative answers in seconds.
    pub minimum: u32,
}

//------------ Response ------------------------------------------------------

/// A parsed response message.
#[derive(Clone, Debug)]
pub struct Response {
    header: Header,
    question: Option<Question>,
    answer: Vec<Record>,
    authority: Vec<Record>,
    additional: Vec<Record>,
}

impl Response {
    /// Parses a response from its wire format.
    ///
    /// Fails if the message is not a response, i.e., doesn’t have the QR
    /// bit set, or if any of its parts is malformed.
    pub fn parse(octets: &[u8]) -> Result<Self, ParseError> {
        let header = Header::parse(octets)?;
        if !header.qr() {
            return Err(ParseError::NotResponse);
        }
        let mut parser = Parser {
            octets,
            pos: Header::LEN,
        };
        let mut question = None;
        for _ in 0..header.qdcount {
            let item = Question::parse(&mut parser)?;
            if question.is_none() {
                question = Some(item)
            }
        }
        let answer = parser.parse_records(header.ancount)?;
        let authority = parser.parse_records(header.nscount)?;
        let additional = parser.parse_records(header.arcount)?;
        Ok(Response {
            header,
            question,
            answer,
            authority,
            additional,
        })
    }

    /// Returns the header of the response.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the message ID.
    pub fn id(&self) -> u16 {
        self.header.id
    }

    /// Returns the response code.
    pub fn rcode(&self) -> Rcode {
        self.header.rcode()
    }

    /// Returns whether the response was truncated.
    ///
    /// A truncated response didn’t fit into a datagram. The complete
    /// answer can only be retrieved over a stream transport.
    pub fn is_truncated(&self) -> bool {
        self.header.tc()
    }

    /// Returns whether the response is authoritative.
    pub fn is_authoritative(&self) -> bool {
        self.header.aa()
    }

    /// Returns the first entry of the question section, if any.
    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    /// Returns the records of the answer section.
    pub fn answer(&self) -> &[Record] {
        &self.answer
    }

    /// Returns the records of the authority section.
    pub fn authority(&self) -> &[Record] {
        &self.authority
    }

    /// Returns the records of the additional section.
    pub fn additional(&self) -> &[Record] {
        &self.additional
    }

    /// Returns an iterator over all addresses in the answer section.
    pub fn addresses(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.answer.iter().filter_map(|record| match *record.data() {
            RecordData::A(addr) => Some(addr.into()),
            RecordData::Aaaa(addr) => Some(addr.into()),
            _ => None,
        })
    }

    /// Returns an iterator over the names of PTR records in the answer.
    pub fn ptr_names(&self) -> impl Iterator<Item = &Name> + '_ {
        self.answer.iter().filter_map(|record| match *record.data() {
            RecordData::Ptr(ref name) => Some(name),
            _ => None,
        })
    }

    /// Checks whether this is a valid reply for a query.
    ///
    /// The ID has to match and the question section has to be the same as
    /// in the query. Allow the question section to be empty if there is an
    /// error or if the reply is truncated. In that case we require all
    /// other sections to be empty as well.
    pub fn is_answer_to(&self, id: u16, question: &Question) -> bool {
        if self.header.id != id {
            return false;
        }
        if (self.header.tc() || self.header.rcode() != Rcode::NOERROR)
            && self.header.qdcount == 0
            && self.header.ancount == 0
            && self.header.nscount == 0
            && self.header.arcount == 0
        {
            return true;
        }
        self.header.qdcount == 1 && self.question.as_ref() == Some(question)
    }
}

//------------ Request -------------------------------------------------------

/// A parsed query as seen by a responder.
#[derive(Clone, Debug)]
pub struct Request {
    header: Header,
    question: Question,
    dnssec_ok: bool,
}

impl Request {
    /// Parses a query with exactly one question.
    pub fn parse(octets: &[u8]) -> Result<Self, ParseError> {
        let header = Header::parse(octets)?;
        if header.qr() || header.qdcount != 1 {
            return Err(ParseError::NotQuery);
        }
        let mut parser = Parser {
            octets,
            pos: Header::LEN,
        };
        let question = Question::parse(&mut parser)?;
        parser.parse_records(header.ancount)?;
        parser.parse_records(header.nscount)?;
        let dnssec_ok = parser
            .parse_records(header.arcount)?
            .iter()
            .any(|record| {
                record.rtype() == Rtype::OPT && record.ttl() & DNSSEC_OK != 0
            });
        Ok(Request {
            header,
            question,
            dnssec_ok,
        })
    }

    /// Returns the message ID.
    pub fn id(&self) -> u16 {
        self.header.id
    }

    /// Returns the question.
    pub fn question(&self) -> &Question {
        &self.question
    }

    /// Returns the flags set in the query.
    pub fn bits(&self) -> Bits {
        let mut res = Bits::none();
        res.set_rd(self.header.rd());
        res.set_ad(self.header.ad());
        res.set_cd(self.header.cd());
        res.set_dnssec_ok(self.dnssec_ok);
        res
    }

    /// Creates the wire format of a reply to this query.
    ///
    /// The reply echoes ID and question, copies the RD flag, claims
    /// recursion to be available, and carries `answer` in its answer
    /// section.
    pub fn reply(&self, rcode: Rcode, answer: &[Record]) -> Bytes {
        let mut header = Header::new(self.header.id);
        header.qdcount = 1;
        header.ancount = answer.len() as u16;
        header.set_qr(true);
        header.set_rd(self.header.rd());
        header.set_ra(true);
        header.set_rcode(rcode);

        let mut target = BytesMut::with_capacity(512);
        header.compose(&mut target);
        self.question.compose(&mut target);
        for record in answer {
            record.compose(&mut target);
        }
        target.freeze()
    }
}

//------------ Parser --------------------------------------------------------

/// A position within a message.
struct Parser<'a> {
    octets: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse_slice(&mut self, len: usize) -> Result<&'a [u8], ParseError> {
        let res = self
            .octets
            .get(self.pos..self.pos + len)
            .ok_or(ParseError::ShortInput)?;
        self.pos += len;
        Ok(res)
    }

    fn parse_u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.parse_slice(1)?[0])
    }

    fn parse_u16(&mut self) -> Result<u16, ParseError> {
        let slice = self.parse_slice(2)?;
        Ok(u16::from_be_bytes([slice[0], slice[1]]))
    }

    fn parse_u32(&mut self) -> Result<u32, ParseError> {
        let slice = self.parse_slice(4)?;
        Ok(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
    }

    /// Parses a possibly compressed domain name.
    fn parse_name(&mut self) -> Result<Name, ParseError> {
        let mut labels = Vec::new();
        let mut pos = self.pos;
        let mut jumped = false;
        let mut pointers = 0;
        loop {
            let len = *self.octets.get(pos).ok_or(ParseError::ShortInput)?;
            match len & 0xC0 {
                0x00 if len == 0 => {
                    if !jumped {
                        self.pos = pos + 1;
                    }
                    break;
                }
                0x00 => {
                    let start = pos + 1;
                    let end = start + usize::from(len);
                    labels.push(
                        self.octets
                            .get(start..end)
                            .ok_or(ParseError::ShortInput)?,
                    );
                    pos = end;
                }
                0xC0 => {
                    let low = *self
                        .octets
                        .get(pos + 1)
                        .ok_or(ParseError::ShortInput)?;
                    if !jumped {
                        self.pos = pos + 2;
                        jumped = true;
                    }
                    pointers += 1;
                    if pointers > MAX_POINTERS {
                        return Err(ParseError::BadName);
                    }
                    pos = (usize::from(len & 0x3F) << 8) | usize::from(low);
                }
                _ => return Err(ParseError::BadName),
            }
        }
        Name::from_labels(labels).map_err(|_| ParseError::BadName)
    }

    fn parse_records(&mut self, count: u16) -> Result<Vec<Record>, ParseError> {
        let mut res = Vec::with_capacity(usize::from(count).min(64));
        for _ in 0..count {
            res.push(Record::parse(self)?);
        }
        Ok(res)
    }
}

//------------ ParseError ----------------------------------------------------

/// A message could not be parsed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// The message ended before it was supposed to.
    ShortInput,

    /// A domain name was malformed.
    BadName,

    /// The data of a record did not match its type.
    BadRecordData,

    /// A message expected to be a response is not one.
    NotResponse,

    /// A message expected to be a query with one question is not one.
    NotQuery,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            ParseError::ShortInput => "unexpected end of message",
            ParseError::BadName => "malformed domain name",
            ParseError::BadRecordData => "malformed record data",
            ParseError::NotResponse => "message is not a response",
            ParseError::NotQuery => "message is not a query",
        })
    }
}

impl std::error::Error for ParseError {}

//============ Testing =======================================================
