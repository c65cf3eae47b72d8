use std::fmt;

use fancy_regex::Regex;

use crate::Result;
use crate::picker::PickError;

/// Characters listed to the user when a candidate is rejected. Upper case is
/// accepted as well but not advertised.
pub const ALLOWED_CHARACTERS: [&str; 7] = ["a-z", "0-9", ".", "_", "-", "/", "="];

const DISALLOWED_PATTERN: &str = r"[^a-zA-Z0-9._=/\-]";

/// A candidate that passed the allow-list check, unchanged from the input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub(crate) fn to_lowercase(&self) -> Self {
        Self(self.0.to_ascii_lowercase())
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct Sanitizer {
    disallowed: Regex,
    check_characters: bool,
}

impl Sanitizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            disallowed: Regex::new(DISALLOWED_PATTERN)?,
            check_characters: true,
        })
    }

    /// A sanitizer that only rejects empty input.
    pub fn empty_check_only() -> Result<Self> {
        Ok(Self {
            check_characters: false,
            ..Self::new()?
        })
    }

    /// Emptiness is checked first, so `""` is always `EmptyInput`.
    pub fn validate(&self, candidate: &str) -> std::result::Result<Username, PickError> {
        if candidate.is_empty() {
            return Err(PickError::EmptyInput);
        }
        if self.check_characters && self.has_disallowed(candidate) {
            return Err(PickError::InvalidCharacter);
        }
        Ok(Username(candidate.to_string()))
    }

    fn has_disallowed(&self, candidate: &str) -> bool {
        // a lone character class cannot hit the backtrack limit; fail closed if it does
        self.disallowed.is_match(candidate).unwrap_or(true)
    }
}
