use std::fmt;

use crate::sanitizer::ALLOWED_CHARACTERS;

pub(crate) const EMPTY_INPUT: &str = "Please enter a username.";
pub(crate) const INVALID_PREFIX: &str =
    "Invalid username. Only the following characters are allowed: ";
pub(crate) const UNAVAILABLE: &str = "This username is not available, please choose another.";
pub(crate) const SUCCESS: &str = "Success. Please wait a moment for your browser to redirect.";
pub(crate) const TRANSPORT_PREFIX: &str = "Unable to check username availability: ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePart {
    Text(String),
    /// Rendered inside a `<code>` element.
    Code(String),
}

/// Status text shown in the message area. Parts become DOM nodes, never
/// markup, so text from the backend cannot inject elements.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    parts: Vec<MessagePart>,
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![MessagePart::Text(text.into())],
        }
    }

    pub fn push_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(MessagePart::Text(text.into()));
        self
    }

    pub fn push_code(mut self, code: impl Into<String>) -> Self {
        self.parts.push(MessagePart::Code(code.into()));
        self
    }

    pub fn parts(&self) -> &[MessagePart] {
        &self.parts
    }

    pub(crate) fn invalid_characters() -> Self {
        let mut message = Self::text(INVALID_PREFIX);
        for (idx, allowed) in ALLOWED_CHARACTERS.iter().enumerate() {
            if idx > 0 {
                message = message.push_text(", ");
            }
            message = message.push_code(*allowed);
        }
        message
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                MessagePart::Text(text) | MessagePart::Code(text) => f.write_str(text)?,
            }
        }
        Ok(())
    }
}
