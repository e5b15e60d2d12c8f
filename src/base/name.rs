//! Domain names.
//!
//! A [`Name`] keeps a domain name in uncompressed wire format, i.e., as a
//! sequence of length-prefixed labels ending in the empty root label. Names
//! created from user input via [`FromStr`] are checked for the syntax a
//! resolver is willing to send: labels of one to 63 printable ASCII
//! characters and at most 255 octets in total. Names parsed from a response
//! accept any label content and escape it when displayed.

use bytes::BufMut;
use core::{fmt, hash};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::vec::Vec;

//------------ Module Configuration ------------------------------------------

/// The maximum length of a label in octets.
pub const MAX_LABEL_LEN: usize = 63;

/// The maximum length of a name in wire format in octets.
pub const MAX_NAME_LEN: usize = 255;

//------------ Name ----------------------------------------------------------

/// A domain name.
///
/// Comparison and hashing ignore ASCII case as well as whether the name was
/// given in absolute form.
#[derive(Clone)]
pub struct Name {
    /// The name in uncompressed wire format, including the root label.
    octets: Vec<u8>,

    /// Whether the name was given with a trailing dot.
    absolute: bool,
}

impl Name {
    /// Returns the root name.
    pub fn root() -> Self {
        Name {
            octets: vec![0],
            absolute: true,
        }
    }

    /// Creates the name used for reverse lookups of an address.
    ///
    /// IPv4 addresses map into `in-addr.arpa`, IPv6 addresses into the
    /// nibble format under `ip6.arpa`.
    pub fn reverse(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(addr) => Self::reverse_v4(addr),
            IpAddr::V6(addr) => Self::reverse_v6(addr),
        }
    }

    fn reverse_v4(addr: Ipv4Addr) -> Self {
        let mut res = Builder::default();
        for item in addr.octets().iter().rev() {
            res.push(item.to_string().as_bytes());
        }
        res.push(b"in-addr");
        res.push(b"arpa");
        res.finish(true)
    }

    fn reverse_v6(addr: Ipv6Addr) -> Self {
        let mut res = Builder::default();
        for &item in addr.octets().iter().rev() {
            res.push(&[hexdigit(item & 0x0F)]);
            res.push(&[hexdigit(item >> 4)]);
        }
        res.push(b"ip6");
        res.push(b"arpa");
        res.finish(true)
    }

    /// Creates a name from a sequence of labels.
    ///
    /// The labels are not checked for their content, only for their length.
    pub(crate) fn from_labels<'a>(
        labels: impl IntoIterator<Item = &'a [u8]>,
    ) -> Result<Self, NameError> {
        let mut res = Builder::default();
        for label in labels {
            if label.is_empty() {
                return Err(NameError::EmptyLabel);
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(NameError::LongLabel);
            }
            res.push(label);
        }
        if res.octets.len() + 1 > MAX_NAME_LEN {
            return Err(NameError::LongName);
        }
        Ok(res.finish(true))
    }

    /// Returns whether this is the root name.
    pub fn is_root(&self) -> bool {
        self.octets.len() == 1
    }

    /// Returns whether the name was given in absolute form.
    ///
    /// Absolute names end in a dot and are never extended with search
    /// suffixes.
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Returns the name in absolute form.
    pub fn into_absolute(mut self) -> Self {
        self.absolute = true;
        self
    }

    /// Returns the number of non-root labels.
    pub fn label_count(&self) -> usize {
        self.labels().count()
    }

    /// Returns the number of dots separating the non-root labels.
    ///
    /// This is the number compared against the `ndots` option when
    /// deciding on the search order.
    pub fn dots(&self) -> usize {
        self.label_count().saturating_sub(1)
    }

    /// Returns an iterator over the non-root labels.
    pub fn labels(&self) -> Labels<'_> {
        Labels {
            octets: &self.octets,
        }
    }

    /// Returns the length of the name in wire format.
    pub fn wire_len(&self) -> usize {
        self.octets.len()
    }

    /// Returns the wire format of the name.
    pub fn as_wire(&self) -> &[u8] {
        &self.octets
    }

    /// Appends `suffix` to this name.
    ///
    /// The result is an absolute name. It fails if the result would be
    /// longer than 255 octets.
    pub fn chain(&self, suffix: &Name) -> Result<Self, NameError> {
        let len = self.octets.len() - 1 + suffix.octets.len();
        if len > MAX_NAME_LEN {
            return Err(NameError::LongName);
        }
        let mut octets = Vec::with_capacity(len);
        octets.extend_from_slice(&self.octets[..self.octets.len() - 1]);
        octets.extend_from_slice(&suffix.octets);
        Ok(Name {
            octets,
            absolute: true,
        })
    }

    /// Returns whether `self` ends in `suffix`.
    pub fn ends_with(&self, suffix: &Name) -> bool {
        let mut labels = self.labels().collect::<Vec<_>>();
        let suffix = suffix.labels().collect::<Vec<_>>();
        if suffix.len() > labels.len() {
            return false;
        }
        let tail = labels.split_off(labels.len() - suffix.len());
        tail.iter()
            .zip(suffix.iter())
            .all(|(left, right)| left.eq_ignore_ascii_case(right))
    }

    /// Appends the wire format of the name to `target`.
    pub fn compose(&self, target: &mut impl BufMut) {
        target.put_slice(&self.octets)
    }
}

//--- FromStr

impl FromStr for Name {
    type Err = NameError;

    /// Parses a name from its presentation format.
    ///
    /// Escape sequences are not supported and a single dot denotes the
    /// root name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(NameError::Empty);
        }
        if s == "." {
            return Ok(Self::root());
        }
        let (s, absolute) = match s.strip_suffix('.') {
            Some(s) => (s, true),
            None => (s, false),
        };
        let mut res = Builder::default();
        for label in s.split('.') {
            if label.is_empty() {
                return Err(NameError::EmptyLabel);
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(NameError::LongLabel);
            }
            if !label.bytes().all(is_label_char) {
                return Err(NameError::IllegalCharacter);
            }
            res.push(label.as_bytes());
            if res.octets.len() + 1 > MAX_NAME_LEN {
                return Err(NameError::LongName);
            }
        }
        Ok(res.finish(absolute))
    }
}

//--- PartialEq, Eq, and Hash

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.octets.eq_ignore_ascii_case(&other.octets)
    }
}

impl Eq for Name {}

impl hash::Hash for Name {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        for ch in &self.octets {
            state.write_u8(ch.to_ascii_lowercase())
        }
    }
}

//--- Display and Debug

impl fmt::Display for Name {
    /// Formats the name without a trailing dot, except for the root.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_root() {
            return f.write_str(".");
        }
        for (idx, label) in self.labels().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            for &ch in label {
                if ch == b'.' || ch == b'\\' {
                    write!(f, "\\{}", ch as char)?;
                } else if ch.is_ascii_graphic() {
                    write!(f, "{}", ch as char)?;
                } else {
                    write!(f, "\\{:03}", ch)?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Name({})", self)
    }
}

//------------ Labels --------------------------------------------------------

/// An iterator over the non-root labels of a name.
#[derive(Clone, Debug)]
pub struct Labels<'a> {
    octets: &'a [u8],
}

impl<'a> Iterator for Labels<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let (&len, tail) = self.octets.split_first()?;
        let len = usize::from(len);
        if len == 0 || tail.len() < len {
            return None;
        }
        let (label, tail) = tail.split_at(len);
        self.octets = tail;
        Some(label)
    }
}

//------------ Builder -------------------------------------------------------

/// Collects labels into the octets of a name.
#[derive(Default)]
struct Builder {
    octets: Vec<u8>,
}

impl Builder {
    /// Appends a label. The caller has checked its length.
    fn push(&mut self, label: &[u8]) {
        self.octets.push(label.len() as u8);
        self.octets.extend_from_slice(label);
    }

    fn finish(mut self, absolute: bool) -> Name {
        self.octets.push(0);
        Name {
            octets: self.octets,
            absolute,
        }
    }
}

//------------ Helper Functions ----------------------------------------------

/// Returns whether a character is allowed in a label of a name from input.
fn is_label_char(ch: u8) -> bool {
    ch.is_ascii_graphic() && ch != b'\\'
}

fn hexdigit(nibble: u8) -> u8 {
    match nibble {
        0..=9 => nibble + b'0',
        _ => nibble - 10 + b'a',
    }
}

//------------ NameError -----------------------------------------------------

/// A domain name could not be created.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NameError {
    /// The input was empty.
    Empty,

    /// The name contains an empty label.
    EmptyLabel,

    /// A label is longer than 63 octets.
    LongLabel,

    /// The name is longer than 255 octets.
    LongName,

    /// A label contains a character that is not allowed.
    IllegalCharacter,
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            NameError::Empty => "empty domain name",
            NameError::EmptyLabel => "empty label in domain name",
            NameError::LongLabel => "label exceeds 63 octets",
            NameError::LongName => "domain name exceeds 255 octets",
            NameError::IllegalCharacter => "illegal character in label",
        })
    }
}

impl std::error::Error for NameError {}

//============ Testing =======================================================
