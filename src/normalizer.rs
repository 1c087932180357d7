// 🔤 MAC Normalizer
// Turns whatever the user typed into the 6-hex-digit key the store is indexed by.

use crate::error::{MacvenError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters a canonical prefix is made of
pub const PREFIX_LEN: usize = 6;

/// Formats accepted on input, shown to the user on InvalidInput
pub const ACCEPTED_FORMATS: &[&str] = &[
    "MM:MM:MM:SS:SS:SS",
    "MM-MM-MM-SS-SS-SS",
    "MMM.MMM.SSS.SSS",
    "MMMMMMSSSSSS",
];

// ============================================================================
// SEPARATOR TABLE
// ============================================================================

/// How a separated MAC string is grouped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupLayout {
    /// One group per byte: `AC:DE:48:11:22:33`
    PerByte,
    /// Multi-digit groups: `ACD.E48.112.233` or `ACDE.4811.2233`
    Dotted,
}

impl GroupLayout {
    /// How many leading groups cover the OUI
    pub fn prefix_groups(&self) -> usize {
        match self {
            GroupLayout::PerByte => 3,
            GroupLayout::Dotted => 2,
        }
    }
}

const SEPARATORS: &[(char, GroupLayout)] = &[
    (':', GroupLayout::PerByte),
    ('-', GroupLayout::PerByte),
    ('.', GroupLayout::Dotted),
];

// ============================================================================
// CANONICAL PREFIX
// ============================================================================

/// Uppercase, separator-free, exactly six hex digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OuiPrefix(String);

impl OuiPrefix {
    /// Normalize a user-supplied MAC address (full or just the first bytes)
    ///
    /// # Examples:
    /// ```
    /// # use macven::OuiPrefix;
    /// assert_eq!(OuiPrefix::normalize("ac:de:48:11:22:33").unwrap().as_str(), "ACDE48");
    /// assert_eq!(OuiPrefix::normalize("ACD.E48.112.233").unwrap().as_str(), "ACDE48");
    /// assert!(OuiPrefix::normalize("ZZ").is_err());
    /// ```
    pub fn normalize(input: &str) -> Result<OuiPrefix> {
        let trimmed = input.trim();

        let mut found = SEPARATORS
            .iter()
            .filter(|(sep, _)| trimmed.contains(*sep));
        let separator = found.next();
        if found.next().is_some() {
            return Err(MacvenError::invalid_input(input, "mixed separators"));
        }

        let joined: String = match separator {
            Some((sep, layout)) => trimmed
                .split(*sep)
                .take(layout.prefix_groups())
                .collect(),
            None => trimmed.to_string(),
        };

        let candidate: String = joined.chars().take(PREFIX_LEN).collect();
        if candidate.chars().count() < PREFIX_LEN {
            return Err(MacvenError::invalid_input(
                input,
                format!("fewer than {} hex digits", PREFIX_LEN),
            ));
        }

        Self::from_hex(&candidate).ok_or_else(|| {
            MacvenError::invalid_input(input, "prefix contains non-hex characters")
        })
    }

    /// Build from six hex digits, any case, no separators
    pub fn from_hex(hex: &str) -> Option<OuiPrefix> {
        if hex.len() == PREFIX_LEN && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(OuiPrefix(hex.to_ascii_uppercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The four display forms of this prefix, in table order
    pub fn variants(&self) -> [MacVariant; 4] {
        let p = &self.0;
        [
            MacVariant::new(VariantStyle::Plain, p.clone()),
            MacVariant::new(
                VariantStyle::Colon,
                format!("{}:{}:{}", &p[0..2], &p[2..4], &p[4..6]),
            ),
            MacVariant::new(
                VariantStyle::Hyphen,
                format!("{}-{}-{}", &p[0..2], &p[2..4], &p[4..6]),
            ),
            MacVariant::new(VariantStyle::Dotted, format!("{}.{}", &p[0..3], &p[3..6])),
        ]
    }
}

impl fmt::Display for OuiPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OuiPrefix {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        OuiPrefix::from_hex(&value).ok_or_else(|| format!("'{}' is not a 6-digit hex prefix", value))
    }
}

impl From<OuiPrefix> for String {
    fn from(prefix: OuiPrefix) -> String {
        prefix.0
    }
}

// ============================================================================
// DISPLAY VARIANTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantStyle {
    Plain,
    Colon,
    Hyphen,
    Dotted,
}

impl VariantStyle {
    pub fn name(&self) -> &str {
        match self {
            VariantStyle::Plain => "plain",
            VariantStyle::Colon => "colon",
            VariantStyle::Hyphen => "hyphen",
            VariantStyle::Dotted => "dotted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacVariant {
    pub style: VariantStyle,
    pub text: String,
}

impl MacVariant {
    fn new(style: VariantStyle, text: String) -> Self {
        MacVariant { style, text }
    }
}
