//! Expanding names through the search list.
//!
//! A relative name given to a query is tried with each suffix of the
//! search list appended. Whether the name is tried as given before or after
//! the suffixed names depends on how many dots it contains compared to the
//! `ndots` setting.
//!
//! All names to be tried are determined when the operation is created and
//! kept in a flat list of candidates.

use crate::base::Name;
use smallvec::SmallVec;
use std::vec::Vec;
use tracing::trace;

/// The names an operation tries in order.
pub(crate) type Candidates = SmallVec<[Name; 4]>;

//------------ SearchList ----------------------------------------------------

/// The search list of a context.
#[derive(Clone, Debug, Default)]
pub(crate) struct SearchList {
    suffixes: Vec<Name>,
}

impl SearchList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a suffix.
    pub fn push(&mut self, suffix: Name) {
        self.suffixes.push(suffix.into_absolute())
    }

    /// Removes all suffixes.
    pub fn clear(&mut self) {
        self.suffixes.clear()
    }

    /// Returns the suffixes.
    pub fn as_slice(&self) -> &[Name] {
        &self.suffixes
    }

    /// Returns the list of names to try for `name`.
    ///
    /// If `name` is absolute or the search list is empty, only `name`
    /// itself is tried. Otherwise, if it has at least `ndots` dots, it is
    /// tried first and then with each suffix appended. If it has fewer
    /// dots, it is tried with each suffix appended first and then as is.
    ///
    /// Suffixed names that would be too long are skipped. The list is never
    /// empty.
    pub fn expand(&self, name: Name, ndots: usize) -> Candidates {
        let mut res = Candidates::new();
        if name.is_absolute() || self.suffixes.is_empty() {
            res.push(name.into_absolute());
            return res;
        }
        let as_is_first = name.dots() >= ndots;
        if as_is_first {
            res.push(name.clone().into_absolute());
        }
        for suffix in &self.suffixes {
            match name.chain(suffix) {
                Ok(candidate) => {
                    if !res.contains(&candidate) {
                        res.push(candidate)
                    }
                }
                Err(_) => {
                    trace!("skipping search suffix {} for {}", suffix, name);
                }
            }
        }
        if !as_is_first {
            let name = name.into_absolute();
            if !res.contains(&name) {
                res.push(name);
            }
        }
        res
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use core::str::FromStr;

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    fn list(suffixes: &[&str]) -> SearchList {
        let mut res = SearchList::new();
        for suffix in suffixes {
            res.push(name(suffix));
        }
        res
    }

    fn expand(search: &SearchList, qname: &str, ndots: usize) -> Vec<String> {
        search
            .expand(name(qname), ndots)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn few_dots_search_first() {
        let search = list(&["example.com", "example.net"]);
        assert_eq!(
            expand(&search, "www", 1),
            ["www.example.com", "www.example.net", "www"]
        );
    }

    #[test]
    fn enough_dots_as_is_first() {
        let search = list(&["example.com", "example.net"]);
        assert_eq!(
            expand(&search, "www.example", 1),
            ["www.example", "www.example.example.com", "www.example.example.net"]
        );
        assert_eq!(
            expand(&search, "www.example", 2),
            ["www.example.example.com", "www.example.example.net", "www.example"]
        );
    }

    #[test]
    fn ndots_zero() {
        let search = list(&["example.com"]);
        assert_eq!(expand(&search, "www", 0), ["www", "www.example.com"]);
    }

    #[test]
    fn absolute_not_expanded() {
        let search = list(&["example.com"]);
        assert_eq!(expand(&search, "www.", 1), ["www"]);
        assert!(search.expand(name("www."), 1)[0].is_absolute());
    }

    #[test]
    fn empty_search_list() {
        let search = SearchList::new();
        let res = search.expand(name("www"), 1);
        assert_eq!(res.len(), 1);
        assert!(res[0].is_absolute());
    }

    #[test]
    fn long_candidates_skipped() {
        let long = ["a".repeat(63), "b".repeat(63), "c".repeat(63)].join(".");
        let search = list(&[&long, "example.com"]);
        let qname = "d".repeat(63);
        assert_eq!(
            expand(&search, &qname, 1),
            [format!("{}.example.com", qname), qname.clone()]
        );
    }

    #[test]
    fn duplicates_removed() {
        let search = list(&["example.com", "example.com"]);
        assert_eq!(expand(&search, "www", 1), ["www.example.com", "www"]);
    }
}
