//! Portability normalization flags and per-row transforms.
//!
//! Backends disagree on trivia: some right-pad CHAR columns, some return
//! uppercase column names, Oracle cannot tell an empty string from NULL.
//! Each quirk gets an independently toggleable flag; rows are normalized
//! after fetch and before they reach the caller.

use std::ops::{BitAnd, BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Bitmask of portability normalization flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Portability(u32);

impl Portability {
    /// No normalization at all.
    pub const NONE: Portability = Portability(0);
    /// Lowercase column and table names.
    pub const LOWERCASE: Portability = Portability(1);
    /// Right-trim string values.
    pub const RTRIM: Portability = Portability(2);
    /// Force row counts from unconditional DELETE statements.
    pub const DELETE_COUNT: Portability = Portability(4);
    /// Enable row-count emulation on backends without native counts.
    pub const NUMROWS: Portability = Portability(8);
    /// Remap backend-specific error kinds to their common equivalents.
    pub const ERRORS: Portability = Portability(16);
    /// Convert NULL values to empty strings.
    pub const NULL_TO_EMPTY: Portability = Portability(32);
    /// All of the above.
    pub const ALL: Portability = Portability(63);

    pub fn contains(self, other: Portability) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn from_bits(bits: u32) -> Portability {
        Portability(bits & Portability::ALL.0)
    }
}

impl BitOr for Portability {
    type Output = Portability;

    fn bitor(self, rhs: Portability) -> Portability {
        Portability(self.0 | rhs.0)
    }
}

impl BitOrAssign for Portability {
    fn bitor_assign(&mut self, rhs: Portability) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Portability {
    type Output = Portability;

    fn bitand(self, rhs: Portability) -> Portability {
        Portability(self.0 & rhs.0)
    }
}

/// Normalize fetched values in place per the active flags.
pub fn normalize_values(values: &mut [Option<String>], flags: Portability) {
    if flags.contains(Portability::RTRIM) {
        for value in values.iter_mut() {
            if let Some(s) = value {
                let trimmed = s.trim_end();
                if trimmed.len() != s.len() {
                    *value = Some(trimmed.to_string());
                }
            }
        }
    }
    if flags.contains(Portability::NULL_TO_EMPTY) {
        for value in values.iter_mut() {
            if value.is_none() {
                *value = Some(String::new());
            }
        }
    }
}

/// Normalize column names in place per the active flags.
pub fn normalize_names(names: &mut [String], flags: Portability) {
    if flags.contains(Portability::LOWERCASE) {
        for name in names.iter_mut() {
            if name.chars().any(|c| c.is_ascii_uppercase()) {
                *name = name.to_lowercase();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_compose_with_bitor() {
        let flags = Portability::LOWERCASE | Portability::RTRIM;
        assert!(flags.contains(Portability::LOWERCASE));
        assert!(flags.contains(Portability::RTRIM));
        assert!(!flags.contains(Portability::NULL_TO_EMPTY));
        assert_eq!(Portability::from_bits(63), Portability::ALL);
    }

    #[test]
    fn rtrim_only_touches_trailing_whitespace() {
        let mut row = vec![Some("abc   ".to_string()), Some("  abc".to_string()), None];
        normalize_values(&mut row, Portability::RTRIM);
        assert_eq!(row[0].as_deref(), Some("abc"));
        assert_eq!(row[1].as_deref(), Some("  abc"));
        assert_eq!(row[2], None);
    }

    #[test]
    fn null_to_empty_is_independent_of_rtrim() {
        let mut row = vec![None, Some("x ".to_string())];
        normalize_values(&mut row, Portability::NULL_TO_EMPTY);
        assert_eq!(row[0].as_deref(), Some(""));
        assert_eq!(row[1].as_deref(), Some("x "));

        let mut row = vec![None, Some("x ".to_string())];
        normalize_values(&mut row, Portability::NULL_TO_EMPTY | Portability::RTRIM);
        assert_eq!(row[0].as_deref(), Some(""));
        assert_eq!(row[1].as_deref(), Some("x"));
    }

    #[test]
    fn lowercase_normalizes_names() {
        let mut names = vec!["ID".to_string(), "UserName".to_string(), "ok".to_string()];
        normalize_names(&mut names, Portability::LOWERCASE);
        assert_eq!(names, vec!["id", "username", "ok"]);
    }
}
