//! Identifier-shaped keys for human-readable labels.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\s]").expect("static regex"));
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));
static UNDERSCORES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_+").expect("static regex"));

/// Turns an arbitrary label into an identifier-shaped key.
///
/// Anything that is not an ASCII letter, digit or whitespace becomes `_`,
/// whitespace runs become a single `_`, `_` runs collapse, and the result is
/// trimmed of `_`. A result that is empty or does not start with a letter is
/// prefixed with `X`.
///
/// ```
/// assert_eq!(imfdata::sanitize("GDP (current US$)"), "GDP_current_US");
/// assert_eq!(imfdata::sanitize("1Y"), "X1Y");
/// ```
pub fn sanitize(label: impl fmt::Display) -> String {
    let label = label.to_string();
    let s = NON_WORD_RE.replace_all(&label, "_");
    let s = SPACE_RE.replace_all(&s, "_");
    let s = UNDERSCORES_RE.replace_all(&s, "_");
    let s = s.trim_matches('_');
    match s.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => s.to_string(),
        _ => format!("X{s}"),
    }
}

/// Which code wins when two labels sanitize to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeepPolicy {
    #[default]
    First,
    Last,
}

/// Immutable mapping from sanitized label to code.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct LookupEnv {
    entries: BTreeMap<String, String>,
}

impl LookupEnv {
    /// Builds an environment from `(label, code)` pairs in input order.
    ///
    /// Pairs whose code is absent or empty are dropped.
    pub fn build<I, L, C>(pairs: I, keep: KeepPolicy) -> Self
    where
        I: IntoIterator<Item = (L, Option<C>)>,
        L: fmt::Display,
        C: Into<String>,
    {
        let mut entries = BTreeMap::new();
        for (label, code) in pairs {
            let code: String = match code {
                Some(c) => c.into(),
                None => continue,
            };
            if code.is_empty() {
                continue;
            }
            let key = sanitize(label);
            if key.is_empty() {
                continue;
            }
            match keep {
                KeepPolicy::First => {
                    entries.entry(key).or_insert(code);
                }
                KeepPolicy::Last => {
                    entries.insert(key, code);
                }
            }
        }
        Self { entries }
    }

    /// Looks up the code registered under `key`.
    pub fn get(&self, key: &str) -> Result<&str> {
        self.entries
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| Error::not_found("lookup key", key))
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for LookupEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LookupEnv(")?;
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v:?}")?;
        }
        write!(f, ")")
    }
}
