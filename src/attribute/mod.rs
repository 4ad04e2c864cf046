//! Attribute universes and grouping keys.
//!
//! A universe is the fixed, ordered set of attributes a dataset can be
//! grouped by. Every grouping is a [`GroupingKey`] over that universe, and
//! its canonical code concatenates the member symbols in universe order:
//!
//! ```text
//! universe: A B C D
//! {A, C}    -> 0b0101 -> "AC"
//! {D, B}    -> 0b1010 -> "BD"
//! ```
//!
//! Symbols are single characters, so the code is injective.

mod key;

pub use key::GroupingKey;

use serde::{Deserialize, Serialize};

/// Largest supported universe. Catalog enumeration is exponential in this.
pub const MAX_ATTRIBUTES: usize = 20;

/// Errors raised while building universes or resolving keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("grouping key is empty")]
    Empty,

    #[error("unknown attribute '{symbol}' in key \"{code}\"")]
    UnknownAttribute { symbol: char, code: String },

    #[error("attribute '{symbol}' repeated in key \"{code}\"")]
    DuplicateAttribute { symbol: char, code: String },

    #[error("key references position {position} outside a universe of {size} attributes")]
    OutOfUniverse { position: usize, size: usize },

    #[error("invalid universe: {0}")]
    InvalidUniverse(String),
}

pub type KeyResult<T> = Result<T, KeyError>;

/// A single groupable attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Identifier used in canonical codes.
    pub symbol: char,
    /// Column name in the underlying dataset.
    pub column: String,
}

impl Attribute {
    pub fn new(symbol: char, column: impl Into<String>) -> Self {
        Self {
            symbol,
            column: column.into(),
        }
    }

    /// An attribute whose column is named after its symbol.
    pub fn named(symbol: char) -> Self {
        Self::new(symbol, symbol.to_string())
    }
}

/// Fixed ordered set of attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeUniverse {
    attributes: Vec<Attribute>,
}

impl AttributeUniverse {
    /// Build a universe, validating symbol uniqueness and size.
    pub fn new(attributes: Vec<Attribute>) -> KeyResult<Self> {
        if attributes.is_empty() {
            return Err(KeyError::InvalidUniverse(
                "at least one attribute is required".to_string(),
            ));
        }
        if attributes.len() > MAX_ATTRIBUTES {
            return Err(KeyError::InvalidUniverse(format!(
                "{} attributes exceeds the maximum of {}",
                attributes.len(),
                MAX_ATTRIBUTES
            )));
        }

        for (i, attr) in attributes.iter().enumerate() {
            if !attr.symbol.is_ascii_alphanumeric() {
                return Err(KeyError::InvalidUniverse(format!(
                    "symbol '{}' must be an ASCII letter or digit",
                    attr.symbol
                )));
            }
            if attr.column.is_empty() {
                return Err(KeyError::InvalidUniverse(format!(
                    "attribute '{}' has an empty column name",
                    attr.symbol
                )));
            }
            if attributes[..i].iter().any(|a| a.symbol == attr.symbol) {
                return Err(KeyError::InvalidUniverse(format!(
                    "symbol '{}' is defined twice",
                    attr.symbol
                )));
            }
        }

        Ok(Self { attributes })
    }

    /// Universe whose columns share the symbol names, e.g. `"ABCD"`.
    pub fn from_symbols(symbols: &str) -> KeyResult<Self> {
        Self::new(symbols.chars().map(Attribute::named).collect())
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Position of a symbol in universe order.
    pub fn position(&self, symbol: char) -> Option<usize> {
        self.attributes.iter().position(|a| a.symbol == symbol)
    }

    /// Bitmask covering the whole universe.
    pub fn mask(&self) -> u32 {
        if self.len() == 32 {
            u32::MAX
        } else {
            (1u32 << self.len()) - 1
        }
    }

    /// Key containing every attribute.
    pub fn full_key(&self) -> GroupingKey {
        // Universes are never empty, so the mask is never zero.
        GroupingKey::from_bits(self.mask()).unwrap_or_else(|| unreachable!())
    }

    /// Check a key only references positions inside this universe.
    pub fn check(&self, key: &GroupingKey) -> KeyResult<()> {
        if key.bits() & !self.mask() != 0 {
            return Err(KeyError::OutOfUniverse {
                position: key.highest_position(),
                size: self.len(),
            });
        }
        Ok(())
    }

    /// Parse a code such as `"AC"` or `"CA"` into a key.
    ///
    /// Symbol order does not matter; repeated or unknown symbols are errors.
    pub fn parse(&self, code: &str) -> KeyResult<GroupingKey> {
        let mut bits = 0u32;
        for symbol in code.trim().chars() {
            let position = self
                .position(symbol)
                .ok_or_else(|| KeyError::UnknownAttribute {
                    symbol,
                    code: code.to_string(),
                })?;
            let bit = 1u32 << position;
            if bits & bit != 0 {
                return Err(KeyError::DuplicateAttribute {
                    symbol,
                    code: code.to_string(),
                });
            }
            bits |= bit;
        }
        GroupingKey::from_bits(bits).ok_or(KeyError::Empty)
    }

    /// Canonical code of a key: member symbols in universe order.
    pub fn code(&self, key: &GroupingKey) -> String {
        self.members(key).map(|a| a.symbol).collect()
    }

    /// Column names of a key, in universe order.
    pub fn columns(&self, key: &GroupingKey) -> Vec<&str> {
        self.members(key).map(|a| a.column.as_str()).collect()
    }

    fn members<'a>(&'a self, key: &GroupingKey) -> impl Iterator<Item = &'a Attribute> + 'a {
        key.positions().filter_map(move |p| self.attributes.get(p))
    }

    /// Every non-empty subset, ordered by size and then lexicographically in
    /// universe order (`A, B, C, AB, AC, BC, ABC`).
    pub fn all_keys(&self) -> Vec<GroupingKey> {
        let mut keys: Vec<GroupingKey> = (1..=self.mask())
            .filter_map(GroupingKey::from_bits)
            .collect();
        keys.sort_by_key(|k| (k.len(), k.positions().collect::<Vec<_>>()));
        keys
    }
}
