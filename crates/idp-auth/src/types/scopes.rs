//! Space-delimited scope sets.

use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// An ordered, de-duplicated set of scope values.
///
/// Insertion order is kept so the `scope` string echoed back to clients
/// matches what they sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scopes(IndexSet<String>);

impl Scopes {
    /// Parses a space-delimited `scope` parameter.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        Self(
            value
                .split_whitespace()
                .map(ToString::to_string)
                .collect(),
        )
    }

    /// Returns `true` if the set contains `scope`.
    #[must_use]
    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    /// Returns `true` if the set contains `openid`.
    #[must_use]
    pub fn has_openid(&self) -> bool {
        self.contains("openid")
    }

    /// Returns `true` if any scope is in `candidates`.
    #[must_use]
    pub fn contains_any<S: AsRef<str>>(&self, candidates: &[S]) -> bool {
        candidates.iter().any(|c| self.contains(c.as_ref()))
    }

    /// Keeps the scopes accepted by `predicate`.
    #[must_use]
    pub fn filter(&self, predicate: impl Fn(&str) -> bool) -> Self {
        Self(self.0.iter().filter(|s| predicate(s)).cloned().collect())
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of scopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates the scopes in request order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Adds every scope of `other`.
    pub fn extend(&mut self, other: &Scopes) {
        self.0.extend(other.0.iter().cloned());
    }
}

impl fmt::Display for Scopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        f.write_str(&joined.join(" "))
    }
}

impl<S: Into<String>> FromIterator<S> for Scopes {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
