//! Built-in format patterns.
//!
//! The formats that recur across criteria are compiled once. Rule sets refer
//! to them by name (`email`, `phone`, `uuid`, `currency`, `lei`); any other
//! pattern string is compiled as a custom regex.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    /// local@domain.tld, requiring a dot-separated TLD of two or more letters
    static ref EMAIL: Regex =
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").unwrap();

    /// Optional leading +, then 7 to 20 digits, spaces, dashes, dots, or parentheses
    static ref PHONE: Regex = Regex::new(r"^\+?[0-9][0-9 ().-]{5,18}[0-9]$").unwrap();

    /// Canonical 8-4-4-4-12 hex UUID
    static ref UUID: Regex = Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$"
    ).unwrap();

    /// ISO 4217 alphabetic code
    static ref CURRENCY: Regex = Regex::new(r"^[A-Z]{3}$").unwrap();

    /// ISO 17442 Legal Entity Identifier: 18 alphanumerics and 2 check digits
    static ref LEI: Regex = Regex::new(r"^[A-Z0-9]{18}[0-9]{2}$").unwrap();
}

/// Named built-in pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamedPattern {
    Email,
    Phone,
    Uuid,
    Currency,
    Lei,
}

impl NamedPattern {
    pub const ALL: [NamedPattern; 5] = [
        NamedPattern::Email,
        NamedPattern::Phone,
        NamedPattern::Uuid,
        NamedPattern::Currency,
        NamedPattern::Lei,
    ];

    pub fn regex(&self) -> &'static Regex {
        match self {
            NamedPattern::Email => &EMAIL,
            NamedPattern::Phone => &PHONE,
            NamedPattern::Uuid => &UUID,
            NamedPattern::Currency => &CURRENCY,
            NamedPattern::Lei => &LEI,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NamedPattern::Email => "email",
            NamedPattern::Phone => "phone",
            NamedPattern::Uuid => "uuid",
            NamedPattern::Currency => "currency",
            NamedPattern::Lei => "lei",
        }
    }

    /// Look up a built-in pattern by name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name.trim()))
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex().is_match(candidate)
    }
}

impl fmt::Display for NamedPattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A compiled pattern with the label used in failure messages
#[derive(Debug, Clone)]
pub struct Pattern {
    pub label: String,
    pub regex: Regex,
}

impl Pattern {
    pub fn named(pattern: NamedPattern) -> Self {
        Self {
            label: pattern.name().to_string(),
            regex: pattern.regex().clone(),
        }
    }

    /// Compile a custom regex; the label is the source text
    pub fn custom(source: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            label: source.to_string(),
            regex: Regex::new(source)?,
        })
    }

    /// Resolve a built-in name, or compile `source` as a regex
    pub fn parse(source: &str) -> Result<Self, regex::Error> {
        match NamedPattern::from_name(source) {
            Some(named) => Ok(Self::named(named)),
            None => Self::custom(source),
        }
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }
}
