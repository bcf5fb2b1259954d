//! Identifier normalization
//!
//! Callers name entities with strings or integers, one at a time or as a list.
//! Everything is normalized into [`Identifiers`] before dispatch so the rest of
//! the pipeline only sees non-blank strings.

use crate::SintaError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque, non-blank identifier for one entity in the directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Creates an identifier, trimming surrounding whitespace
    ///
    /// # Returns
    ///
    /// * `Ok(Identifier)` - The trimmed identifier
    /// * `Err(SintaError::EmptyIdentifier)` - The input was blank
    pub fn new(raw: impl AsRef<str>) -> Result<Self, SintaError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(SintaError::EmptyIdentifier);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Identifier {
    type Error = SintaError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for Identifier {
    type Error = SintaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<u64> for Identifier {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<u32> for Identifier {
    fn from(value: u32) -> Self {
        Self(value.to_string())
    }
}

/// An ordered batch of identifiers; duplicates are kept
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identifiers(Vec<Identifier>);

impl Identifiers {
    /// Normalizes any iterable of raw values into identifiers
    ///
    /// A single value becomes a one-element batch. Fails on the first blank value.
    pub fn parse<I, S>(values: I) -> Result<Self, SintaError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        values
            .into_iter()
            .map(Identifier::new)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn single(id: Identifier) -> Self {
        Self(vec![id])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Identifier> {
        self.0.iter()
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.0.iter().any(|id| id.as_str() == candidate)
    }

    pub fn into_vec(self) -> Vec<Identifier> {
        self.0
    }

    /// Returns the identifiers as plain strings, for error reporting
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl From<Identifier> for Identifiers {
    fn from(id: Identifier) -> Self {
        Self::single(id)
    }
}

impl From<Vec<Identifier>> for Identifiers {
    fn from(ids: Vec<Identifier>) -> Self {
        Self(ids)
    }
}

impl From<Vec<u64>> for Identifiers {
    fn from(ids: Vec<u64>) -> Self {
        Self(ids.into_iter().map(Identifier::from).collect())
    }
}

impl From<u64> for Identifiers {
    fn from(id: u64) -> Self {
        Self::single(Identifier::from(id))
    }
}

impl IntoIterator for Identifiers {
    type Item = Identifier;
    type IntoIter = std::vec::IntoIter<Identifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Identifiers {
    type Item = &'a Identifier;
    type IntoIter = std::slice::Iter<'a, Identifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
