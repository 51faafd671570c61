// src/models/slot.rs

//! Dataset slot identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two interchangeable dataset copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    /// The other slot.
    pub fn complement(self) -> Self {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    /// Value persisted in the control row.
    pub fn as_i64(self) -> i64 {
        match self {
            Slot::A => 1,
            Slot::B => 2,
        }
    }

    /// Parse the persisted control value.
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(Slot::A),
            2 => Some(Slot::B),
            _ => None,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::A => f.write_str("A"),
            Slot::B => f.write_str("B"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complement_is_involution() {
        assert_eq!(Slot::A.complement(), Slot::B);
        assert_eq!(Slot::B.complement().complement(), Slot::B);
    }

    #[test]
    fn test_control_value_mapping() {
        assert_eq!(Slot::from_i64(Slot::A.as_i64()), Some(Slot::A));
        assert_eq!(Slot::from_i64(2), Some(Slot::B));
        assert_eq!(Slot::from_i64(0), None);
    }
}
