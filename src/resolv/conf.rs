//! Resolver configuration
//!
//! There are two parts to this module: the [`Settings`] that control how
//! a resolver context schedules and retries its queries, and the system
//! resolver configuration [`ResolvConf`] (normally read from the system’s
//! `/etc/resolv.conf`) that contains things like the name servers to query
//! and the search list.
//!
//! Both parts are modeled along the lines of glibc’s resolver.

use crate::base::{Bits, Name};
use crate::utils::config::DefMinMax;
use core::fmt;
use core::str::{FromStr, SplitWhitespace};
use std::fs;
use std::io::{self, BufRead, Read};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use std::vec::Vec;
use tracing::debug;

//------------ Configuration Constants ---------------------------------------

/// How long to wait for a response after the last send to a server.
pub(crate) const TIMEOUT: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(5),
    Duration::from_millis(100),
    Duration::from_secs(3600),
);

/// How long to wait between retransmissions to the same server.
pub(crate) const INTERVAL: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(2),
    Duration::from_millis(100),
    Duration::from_secs(3600),
);

/// How many times a request is sent to the same server.
pub(crate) const ATTEMPTS: DefMinMax<usize> = DefMinMax::new(2, 1, 255);

/// How many operations may be in flight at the same time.
pub(crate) const CAPACITY: DefMinMax<usize> = DefMinMax::new(100, 1, 65536);

/// How many results are delivered in one scheduling pass.
pub(crate) const MAXCALLS: DefMinMax<usize> = DefMinMax::new(64, 1, 65536);

/// How many dots make a name be tried as given first.
pub(crate) const NDOTS: DefMinMax<usize> = DefMinMax::new(1, 0, 15);

/// How many sockets per address family may be open at the same time.
pub(crate) const SOCKETS: DefMinMax<usize> = DefMinMax::new(1, 1, 1024);

//------------ Settings ------------------------------------------------------

/// The settings of a resolver context.
///
/// Each operation takes a copy of the settings when it is created. Changing
/// the settings of a context therefore only affects operations created
/// afterwards.
///
/// All setters clamp their argument into the range of sensible values.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Settings {
    timeout: Duration,
    interval: Duration,
    attempts: usize,
    capacity: usize,
    maxcalls: usize,
    ndots: usize,
    rotate: bool,
    bits: Bits,
    sockets: usize,
    buffer_size: Option<usize>,
}

impl Settings {
    /// Creates the default settings.
    pub fn new() -> Self {
        Settings {
            timeout: TIMEOUT.default(),
            interval: INTERVAL.default(),
            attempts: ATTEMPTS.default(),
            capacity: CAPACITY.default(),
            maxcalls: MAXCALLS.default(),
            ndots: NDOTS.default(),
            rotate: false,
            bits: Bits::default(),
            sockets: SOCKETS.default(),
            buffer_size: None,
        }
    }

    /// Returns a copy with all values clamped into their valid ranges.
    ///
    /// This is only necessary for values that didn’t go through the
    /// setters, such as deserialized ones.
    pub fn clamped(mut self) -> Self {
        self.timeout = TIMEOUT.limit(self.timeout);
        self.interval = INTERVAL.limit(self.interval);
        self.attempts = ATTEMPTS.limit(self.attempts);
        self.capacity = CAPACITY.limit(self.capacity);
        self.maxcalls = MAXCALLS.limit(self.maxcalls);
        self.ndots = NDOTS.limit(self.ndots);
        self.sockets = SOCKETS.limit(self.sockets);
        self
    }

    /// Returns the time to wait for a response after the last send.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sets the time to wait for a response after the last send.
    pub fn set_timeout(&mut self, value: Duration) {
        self.timeout = TIMEOUT.limit(value)
    }

    /// Returns the time between retransmissions to the same server.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sets the time between retransmissions to the same server.
    pub fn set_interval(&mut self, value: Duration) {
        self.interval = INTERVAL.limit(value)
    }

    /// Returns how often a request is sent to the same server.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Sets how often a request is sent to the same server.
    pub fn set_attempts(&mut self, value: usize) {
        self.attempts = ATTEMPTS.limit(value)
    }

    /// Returns the maximum number of operations in flight.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sets the maximum number of operations in flight.
    pub fn set_capacity(&mut self, value: usize) {
        self.capacity = CAPACITY.limit(value)
    }

    /// Returns the maximum number of results delivered per pass.
    pub fn maxcalls(&self) -> usize {
        self.maxcalls
    }

    /// Sets the maximum number of results delivered per pass.
    pub fn set_maxcalls(&mut self, value: usize) {
        self.maxcalls = MAXCALLS.limit(value)
    }

    /// Returns the number of dots that make a name be tried as is first.
    pub fn ndots(&self) -> usize {
        self.ndots
    }

    /// Sets the number of dots that make a name be tried as is first.
    pub fn set_ndots(&mut self, value: usize) {
        self.ndots = NDOTS.limit(value)
    }

    /// Returns whether the start server rotates between operations.
    pub fn rotate(&self) -> bool {
        self.rotate
    }

    /// Sets whether the start server rotates between operations.
    pub fn set_rotate(&mut self, value: bool) {
        self.rotate = value
    }

    /// Returns the default flags for queries.
    pub fn bits(&self) -> Bits {
        self.bits
    }

    /// Sets the default flags for queries.
    pub fn set_bits(&mut self, value: Bits) {
        self.bits = value
    }

    /// Returns the number of sockets per address family.
    pub fn sockets(&self) -> usize {
        self.sockets
    }

    /// Raises the number of sockets per address family.
    ///
    /// The number can only ever grow. Smaller values are ignored.
    pub fn set_sockets(&mut self, value: usize) {
        self.sockets = self.sockets.max(SOCKETS.limit(value))
    }

    /// Returns the buffer size requested for new sockets.
    pub fn buffer_size(&self) -> Option<usize> {
        self.buffer_size
    }

    /// Sets the buffer size requested for new sockets.
    ///
    /// Existing sockets keep their buffers.
    pub fn set_buffer_size(&mut self, value: Option<usize>) {
        self.buffer_size = value
    }

    /// Returns the longest time a single server may occupy an operation.
    ///
    /// This is the time from the first send of a request to a server
    /// until that server is given up if it never answers.
    pub fn expire(&self) -> Duration {
        let retries =
            u32::try_from(self.attempts.saturating_sub(1)).unwrap_or(u32::MAX);
        self.interval
            .saturating_mul(retries)
            .saturating_add(self.timeout)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

//------------ ResolvConf ----------------------------------------------------

/// Resolver configuration.
///
/// This type collects all information from a glibc-style configuration
/// file, commonly known as `/etc/resolv.conf`, that a resolver context
/// understands. A value can be created from scratch via
/// [`new`][Self::new] and then filled via [`parse`][Self::parse] or
/// [`parse_file`][Self::parse_file].
///
/// The easiest way to get the system resolver configuration is through
/// [`system`][Self::system]. This will parse the configuration file and
/// fall back to defaults if that fails.
#[derive(Clone, Debug)]
pub struct ResolvConf {
    /// Addresses of servers to query.
    pub servers: Vec<SocketAddr>,

    /// Search list for host-name lookup.
    pub search: Vec<Name>,

    /// Number of dots before an initial absolute query is made.
    pub ndots: usize,

    /// Timeout to wait for a response.
    pub timeout: Duration,

    /// Number of times a request is sent to a server.
    pub attempts: usize,

    /// Use round-robin selection of name servers.
    pub rotate: bool,
}

/// # Management
///
impl ResolvConf {
    /// Creates a new, empty configuration.
    pub fn new() -> Self {
        ResolvConf {
            servers: Vec::new(),
            search: Vec::new(),
            ndots: NDOTS.default(),
            timeout: TIMEOUT.default(),
            attempts: ATTEMPTS.default(),
            rotate: false,
        }
    }

    /// Finalizes the configuration for actual use.
    ///
    /// If `servers` is empty, adds `127.0.0.1:53`. This is exactly what
    /// glibc does.
    pub fn finalize(&mut self) {
        if self.servers.is_empty() {
            self.servers.push(SocketAddr::new(
                IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
                53,
            ));
        }
    }

    /// Creates the configuration for this system.
    ///
    /// This currently only works for Unix-y systems.
    pub fn system() -> Self {
        let mut res = ResolvConf::new();
        if let Err(err) = res.parse_file("/etc/resolv.conf") {
            debug!("cannot read /etc/resolv.conf: {}", err);
        }
        res.finalize();
        res
    }
}

/// # Parsing Configuration File
///
impl ResolvConf {
    /// Parses the configuration from a file.
    pub fn parse_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        let mut file = fs::File::open(path)?;
        self.parse(&mut file)
    }

    /// Parses the configuration from a reader.
    ///
    /// The format is that of the /etc/resolv.conf file. Unknown keywords
    /// and options are ignored.
    pub fn parse<R: Read>(&mut self, reader: &mut R) -> Result<(), Error> {
        for (idx, line) in io::BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let line = line.trim_end();

            if line.is_empty()
                || line.starts_with(';')
                || line.starts_with('#')
            {
                continue;
            }

            let mut words = line.split_whitespace();
            let res = match words.next() {
                Some("nameserver") => self.parse_nameserver(words),
                Some("domain") => self.parse_domain(words),
                Some("search") => self.parse_search(words),
                Some("sortlist") => Ok(()),
                Some("options") => self.parse_options(words),
                _ => Ok(()),
            };
            if res.is_err() {
                return Err(Error::Parse(idx + 1));
            }
        }
        Ok(())
    }

    fn parse_nameserver(&mut self, mut words: SplitWhitespace) -> Result<(), ()> {
        let word = next_word(&mut words)?;
        let addr = match IpAddr::from_str(word) {
            Ok(addr) => SocketAddr::new(addr, 53),
            Err(_) => SocketAddr::from_str(word).map_err(|_| ())?,
        };
        self.servers.push(addr);
        no_more_words(words)
    }

    fn parse_domain(&mut self, mut words: SplitWhitespace) -> Result<(), ()> {
        let domain = Name::from_str(next_word(&mut words)?).map_err(|_| ())?;
        self.search = Vec::new();
        self.search.push(domain);
        no_more_words(words)
    }

    fn parse_search(&mut self, words: SplitWhitespace) -> Result<(), ()> {
        let mut search = Vec::new();
        for word in words {
            search.push(Name::from_str(word).map_err(|_| ())?)
        }
        self.search = search;
        Ok(())
    }

    fn parse_options(&mut self, words: SplitWhitespace) -> Result<(), ()> {
        for word in words {
            match split_arg(word) {
                ("ndots", Some(n)) => self.ndots = n,
                ("timeout", Some(n)) => {
                    self.timeout = Duration::from_secs(n as u64)
                }
                ("attempts", Some(n)) => self.attempts = n,
                ("rotate", None) => self.rotate = true,
                // Ignore unknown or misformated options.
                _ => {}
            }
        }
        Ok(())
    }
}

//--- Default

impl Default for ResolvConf {
    fn default() -> Self {
        Self::new()
    }
}

//--- Display

impl fmt::Display for ResolvConf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for server in self.servers.iter() {
            if server.port() == 53 {
                writeln!(f, "nameserver {}", server.ip())?;
            } else {
                writeln!(f, "nameserver {}", server)?;
            }
        }
        if self.search.len() == 1 {
            writeln!(f, "domain {}", self.search[0])?;
        } else if self.search.len() > 1 {
            f.write_str("search")?;
            for name in self.search.iter() {
                write!(f, " {}", name)?;
            }
            f.write_str("\n")?;
        }

        // Collect options so we only print them if there are any non-default
        // ones.
        let mut options = Vec::new();

        if self.ndots != NDOTS.default() {
            options.push(format!("ndots:{}", self.ndots));
        }
        if self.timeout != TIMEOUT.default() {
            options.push(format!("timeout:{}", self.timeout.as_secs()));
        }
        if self.attempts != ATTEMPTS.default() {
            options.push(format!("attempts:{}", self.attempts));
        }
        if self.rotate {
            options.push("rotate".into())
        }

        if !options.is_empty() {
            f.write_str("options")?;
            for option in options {
                write!(f, " {}", option)?;
            }
            f.write_str("\n")?;
        }

        Ok(())
    }
}

//------------ Private Helpers -----------------------------------------------

/// Returns a reference to the next word or an error.
fn next_word<'a>(words: &mut SplitWhitespace<'a>) -> Result<&'a str, ()> {
    words.next().ok_or(())
}

/// Returns nothing but errors out if there are words left.
fn no_more_words(mut words: SplitWhitespace) -> Result<(), ()> {
    match words.next() {
        Some(..) => Err(()),
        None => Ok(()),
    }
}

/// Splits the name and argument from an option with arguments.
///
/// These options consist of a name followed by a colon followed by a
/// value, which so far is only `usize`. A value that isn’t a number makes
/// the whole option unknown.
fn split_arg(s: &str) -> (&str, Option<usize>) {
    match s.split_once(':') {
        Some((left, right)) => match usize::from_str(right) {
            Ok(value) => (left, Some(value)),
            Err(_) => ("", None),
        },
        None => (s, None),
    }
}

//------------ Error ---------------------------------------------------------

/// The error that can happen when parsing `resolv.conf`.
#[derive(Debug)]
pub enum Error {
    /// The given line is malformed.
    Parse(usize),

    /// Something happend while reading.
    Io(io::Error),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::Parse(_) => None,
            Error::Io(ref err) => Some(err),
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Error {
        Error::Io(error)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Parse(line) => {
                write!(f, "error parsing configuration in line {}", line)
            }
            Error::Io(ref err) => err.fmt(f),
        }
    }
}

//============ Testing =======================================================
