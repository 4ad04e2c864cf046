//! Bitmask-backed grouping keys.

use serde::{Deserialize, Serialize};

use super::KeyError;

/// A non-empty subset of an attribute universe.
///
/// Bit `i` is set when the attribute at universe position `i` is part of the
/// grouping. Equality is set equality; the canonical code is produced by
/// [`AttributeUniverse::code`](super::AttributeUniverse::code).
///
/// Serializes as its raw bits; deserializing zero is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct GroupingKey(u32);

impl GroupingKey {
    /// Create a key from raw bits. Returns `None` for the empty set.
    pub fn from_bits(bits: u32) -> Option<Self> {
        (bits != 0).then_some(Self(bits))
    }

    /// Create a key from universe positions.
    ///
    /// Returns `None` for an empty set or any position past bit 31.
    pub fn from_positions<I: IntoIterator<Item = usize>>(positions: I) -> Option<Self> {
        let bits = positions
            .into_iter()
            .try_fold(0u32, |acc, p| (p < 32).then(|| acc | (1 << p)))?;
        Self::from_bits(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Number of attributes in the grouping.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, position: usize) -> bool {
        position < 32 && self.0 & (1 << position) != 0
    }

    /// True when every attribute of `self` is also in `other`.
    pub fn is_subset_of(&self, other: &GroupingKey) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn is_superset_of(&self, other: &GroupingKey) -> bool {
        other.is_subset_of(self)
    }

    /// Universe positions in ascending order.
    pub fn positions(self) -> impl Iterator<Item = usize> {
        (0..32).filter(move |&p| self.contains(p))
    }

    /// Highest universe position referenced, used to check universe bounds.
    pub fn highest_position(&self) -> usize {
        31 - self.0.leading_zeros() as usize
    }
}

impl TryFrom<u32> for GroupingKey {
    type Error = KeyError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        Self::from_bits(bits).ok_or(KeyError::Empty)
    }
}

impl From<GroupingKey> for u32 {
    fn from(key: GroupingKey) -> Self {
        key.0
    }
}
