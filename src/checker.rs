use std::collections::VecDeque;

use serde::Deserialize;

use crate::sanitizer::Username;

/// What the backend said about one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckReply {
    Available,
    Unavailable,
    /// Transport or backend validation failure with a display reason.
    Failed(String),
}

#[derive(Debug, Deserialize)]
struct WireReply {
    available: Option<bool>,
    error: Option<String>,
}

impl CheckReply {
    /// Decodes a reply body in the backend's wire shape: `{"available": bool}`
    /// or `{"error": "..."}`. An `error` field wins over `available`.
    pub fn from_json(body: &str) -> crate::Result<Self> {
        let wire: WireReply = serde_json::from_str(body)?;
        Ok(match (wire.error, wire.available) {
            (Some(error), _) => Self::Failed(error),
            (None, Some(true)) => Self::Available,
            (None, Some(false)) => Self::Unavailable,
            (None, None) => Self::Failed("reply carried no availability".into()),
        })
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Answers availability queries for accepted usernames. The page calls
/// `check` once per accepted submission and delivers the reply after the
/// configured delay.
pub trait AvailabilityChecker {
    fn check(&mut self, username: &Username) -> CheckReply;
}

impl<F> AvailabilityChecker for F
where
    F: FnMut(&Username) -> CheckReply,
{
    fn check(&mut self, username: &Username) -> CheckReply {
        self(username)
    }
}

/// Available, unavailable, available, ... starting with available.
#[derive(Debug, Clone, Default)]
pub struct Alternating {
    next_unavailable: bool,
}

impl Alternating {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AvailabilityChecker for Alternating {
    fn check(&mut self, _username: &Username) -> CheckReply {
        let reply = if self.next_unavailable {
            CheckReply::Unavailable
        } else {
            CheckReply::Available
        };
        self.next_unavailable = !self.next_unavailable;
        reply
    }
}

/// Every candidate is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAvailable;

impl AvailabilityChecker for AlwaysAvailable {
    fn check(&mut self, _username: &Username) -> CheckReply {
        CheckReply::Available
    }
}

/// Replays recorded backend bodies in order, one per check.
#[derive(Debug, Clone, Default)]
pub struct ReplayChecker {
    replies: VecDeque<String>,
}

impl ReplayChecker {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
        }
    }

    pub fn push(&mut self, body: impl Into<String>) {
        self.replies.push_back(body.into());
    }

    pub fn remaining(&self) -> usize {
        self.replies.len()
    }
}

impl AvailabilityChecker for ReplayChecker {
    fn check(&mut self, username: &Username) -> CheckReply {
        let Some(body) = self.replies.pop_front() else {
            return CheckReply::Failed("no reply from server".into());
        };
        CheckReply::from_json(&body).unwrap_or_else(|err| {
            tracing::warn!(%username, error = %err, "unparsable availability reply");
            CheckReply::Failed("malformed reply from server".into())
        })
    }
}
