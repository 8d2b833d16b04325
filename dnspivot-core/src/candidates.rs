// Candidate hostname generation from a wordlist and a base domain

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Numeric suffixes tried after each plain word (`www0` .. `www9`).
const SUFFIXES: u8 = 10;

/// How a candidate entered the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    /// Emitted by the generator.
    Root,
    /// Produced by a reverse lookup of `via`, an address of `parent`.
    Derived { parent: String, via: IpAddr },
}

/// A hostname to probe. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub hostname: String,
    pub origin: Origin,
}

impl Candidate {
    pub fn root(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            origin: Origin::Root,
        }
    }

    pub fn derived(hostname: impl Into<String>, parent: impl Into<String>, via: IpAddr) -> Self {
        Self {
            hostname: hostname.into(),
            origin: Origin::Derived {
                parent: parent.into(),
                via,
            },
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self.origin, Origin::Root)
    }

    pub fn parent(&self) -> Option<&str> {
        match &self.origin {
            Origin::Root => None,
            Origin::Derived { parent, .. } => Some(parent),
        }
    }
}

/// Lazily expands every word into `w.<domain>` followed by `w0.<domain>`
/// through `w9.<domain>`.
///
/// Words are used as given; validating them is the caller's job.
pub struct CandidateGenerator<I> {
    domain: String,
    words: I,
    current: Option<String>,
    // None: the plain candidate for `current` is next.
    next_suffix: Option<u8>,
    suffixes: bool,
}

impl<I> CandidateGenerator<I>
where
    I: Iterator<Item = String>,
{
    pub fn new<W>(domain: &str, words: W) -> Self
    where
        W: IntoIterator<Item = String, IntoIter = I>,
    {
        Self {
            domain: domain.trim().trim_end_matches('.').to_string(),
            words: words.into_iter(),
            current: None,
            next_suffix: None,
            suffixes: true,
        }
    }

    /// Emit only the plain `w.<domain>` candidates.
    pub fn with_suffixes(mut self, suffixes: bool) -> Self {
        self.suffixes = suffixes;
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    fn per_word(&self) -> usize {
        if self.suffixes {
            1 + SUFFIXES as usize
        } else {
            1
        }
    }
}

impl<I> Iterator for CandidateGenerator<I>
where
    I: Iterator<Item = String>,
{
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        loop {
            if let Some(word) = &self.current {
                match self.next_suffix {
                    None => {
                        let hostname = format!("{}.{}", word, self.domain);
                        if self.suffixes {
                            self.next_suffix = Some(0);
                        } else {
                            self.current = None;
                        }
                        return Some(Candidate::root(hostname));
                    }
                    Some(suffix) if suffix < SUFFIXES => {
                        let hostname = format!("{}{}.{}", word, suffix, self.domain);
                        self.next_suffix = Some(suffix + 1);
                        return Some(Candidate::root(hostname));
                    }
                    Some(_) => {
                        self.current = None;
                    }
                }
            }

            let word = self.words.next()?;
            self.current = Some(word);
            self.next_suffix = None;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let in_flight = match (&self.current, self.next_suffix) {
            (None, _) => 0,
            (Some(_), None) => self.per_word(),
            (Some(_), Some(suffix)) => (SUFFIXES - suffix.min(SUFFIXES)) as usize,
        };
        let (lower, upper) = self.words.size_hint();
        let per_word = self.per_word();
        (
            in_flight + lower * per_word,
            upper.map(|upper| in_flight + upper * per_word),
        )
    }
}

/// Number of root candidates `words` expands into.
pub fn candidate_count(words: usize, suffixes: bool) -> usize {
    if suffixes {
        words * (1 + SUFFIXES as usize)
    } else {
        words
    }
}
