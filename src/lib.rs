//! Deterministic username-availability picker.
//!
//! A [`Page`] parses the registration page template, binds the username
//! field, the submit control and the message area, and drives the
//! submit/validate/respond cycle against an injected [`AvailabilityChecker`].
//! Time is virtual: checker replies sit on the page's timer queue until the
//! caller advances the clock.

use thiserror::Error;

mod checker;
mod config;
mod dom;
mod html;
mod message;
mod page;
mod picker;
mod sanitizer;
mod scheduler;
mod url;

pub use checker::{AlwaysAvailable, Alternating, AvailabilityChecker, CheckReply, ReplayChecker};
pub use config::{ElementIds, EnterKeyEvent, Labels, PickerConfig, SuccessAction};
pub use message::{Message, MessagePart};
pub use page::{FormSubmission, Page};
pub use picker::{PickError, SubmissionState};
pub use sanitizer::{ALLOWED_CHARACTERS, Sanitizer, Username};
pub use scheduler::PendingTimer;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),

    /// A handle the picker binds at load time is absent from the template.
    #[error("missing element: #{0}")]
    MissingElement(String),

    #[error("selector not found: {0}")]
    SelectorNotFound(String),

    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),

    #[error("type mismatch for {selector}: expected {expected}, actual {actual}")]
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },

    #[error(
        "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
    )]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },

    #[error("timer error: {0}")]
    Timer(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("malformed url: {0}")]
    Url(String),

    #[error(transparent)]
    Pattern(#[from] fancy_regex::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
