//! Unicode text value
//!
//! A [`UnicodeString`] keeps the UTF-8 form and the decoded codepoint
//! sequence side by side. Both are built once and never mutated; case
//! transformations return a new value. Length and equality are defined over
//! codepoints.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::SimilarityError;

/// Immutable UTF-8 / UTF-32 text pair
#[derive(Clone, Default)]
pub struct UnicodeString {
    utf8: String,
    chars: Vec<char>,
}

impl UnicodeString {
    pub fn new(s: &str) -> Self {
        Self {
            utf8: s.to_owned(),
            chars: s.chars().collect(),
        }
    }

    /// Decode UTF-8 bytes; malformed sequences are rejected.
    pub fn from_utf8(bytes: &[u8]) -> Result<Self, SimilarityError> {
        let s = std::str::from_utf8(bytes).map_err(|e| {
            SimilarityError::UnicodeConversion(format!(
                "invalid UTF-8 at byte {}",
                e.valid_up_to()
            ))
        })?;
        Ok(Self::new(s))
    }

    /// Decode UTF-8 bytes, replacing malformed sequences with U+FFFD.
    pub fn from_utf8_lossy(bytes: &[u8]) -> Self {
        Self::new(&String::from_utf8_lossy(bytes))
    }

    /// Build from UTF-32 codepoints. Surrogates and values above U+10FFFF
    /// are rejected.
    pub fn from_codepoints(codepoints: &[u32]) -> Result<Self, SimilarityError> {
        let chars = codepoints
            .iter()
            .map(|&cp| {
                char::from_u32(cp).ok_or_else(|| {
                    SimilarityError::UnicodeConversion(format!("invalid codepoint U+{cp:04X}"))
                })
            })
            .collect::<Result<Vec<char>, _>>()?;
        Ok(Self::from_chars(chars))
    }

    fn from_chars(chars: Vec<char>) -> Self {
        Self {
            utf8: chars.iter().collect(),
            chars,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.utf8
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.utf8.as_bytes()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn codepoints(&self) -> impl Iterator<Item = u32> + '_ {
        self.chars.iter().map(|&c| c as u32)
    }

    /// Number of codepoints
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn byte_len(&self) -> usize {
        self.utf8.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn is_ascii(&self) -> bool {
        self.utf8.is_ascii()
    }

    pub fn to_lower(&self) -> Self {
        if self.is_ascii() {
            return Self {
                utf8: self.utf8.to_ascii_lowercase(),
                chars: self.chars.iter().map(|c| c.to_ascii_lowercase()).collect(),
            };
        }
        Self::from_chars(self.chars.iter().map(|&c| fold_lower(c)).collect())
    }

    pub fn to_upper(&self) -> Self {
        if self.is_ascii() {
            return Self {
                utf8: self.utf8.to_ascii_uppercase(),
                chars: self.chars.iter().map(|c| c.to_ascii_uppercase()).collect(),
            };
        }
        Self::from_chars(self.chars.iter().map(|&c| fold_upper(c)).collect())
    }

    /// Codepoint-wise comparison after lowering both sides.
    pub fn eq_ignore_case(&self, other: &Self) -> bool {
        self.chars.len() == other.chars.len()
            && self
                .chars
                .iter()
                .zip(&other.chars)
                .all(|(&a, &b)| a == b || fold_lower(a) == fold_lower(b))
    }
}

/// Lowercase one codepoint using the engine's fold table.
///
/// Covers ASCII, Latin-1 Supplement, Greek (including accented capitals and
/// final sigma) and basic Cyrillic. Anything else passes through.
pub fn fold_lower(c: char) -> char {
    let cp = c as u32;
    let lowered = match cp {
        0x41..=0x5A => cp + 0x20,
        0xC0..=0xDE if cp != 0xD7 => cp + 0x20,
        0x391..=0x3A9 if cp != 0x3A2 => cp + 0x20,
        0x386 => 0x3AC,
        0x388 => 0x3AD,
        0x389 => 0x3AE,
        0x38A => 0x3AF,
        0x38C => 0x3CC,
        0x38E => 0x3CD,
        0x38F => 0x3CE,
        0x3C2 => 0x3C3,
        0x410..=0x42F => cp + 0x20,
        _ => cp,
    };
    char::from_u32(lowered).unwrap_or(c)
}

/// Inverse of [`fold_lower`]. Final sigma has no uppercase mapping here.
pub fn fold_upper(c: char) -> char {
    let cp = c as u32;
    let raised = match cp {
        0x61..=0x7A => cp - 0x20,
        0xE0..=0xFE if cp != 0xF7 => cp - 0x20,
        0x3B1..=0x3C9 if cp != 0x3C2 => cp - 0x20,
        0x3AC => 0x386,
        0x3AD => 0x388,
        0x3AE => 0x389,
        0x3AF => 0x38A,
        0x3CC => 0x38C,
        0x3CD => 0x38E,
        0x3CE => 0x38F,
        0x430..=0x44F => cp - 0x20,
        _ => cp,
    };
    char::from_u32(raised).unwrap_or(c)
}

impl PartialEq for UnicodeString {
    fn eq(&self, other: &Self) -> bool {
        self.chars == other.chars
    }
}

impl Eq for UnicodeString {}

impl Hash for UnicodeString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chars.hash(state);
    }
}

impl From<&str> for UnicodeString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for UnicodeString {
    fn from(utf8: String) -> Self {
        let chars = utf8.chars().collect();
        Self { utf8, chars }
    }
}

impl fmt::Display for UnicodeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.utf8)
    }
}

impl fmt::Debug for UnicodeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnicodeString({:?})", self.utf8)
    }
}
