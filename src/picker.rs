use std::collections::HashMap;

use crate::checker::CheckReply;
use crate::config::{PickerConfig, SuccessAction};
use crate::dom::{Dom, NodeId};
use crate::message::{self, Message, MessagePart};
use crate::page::{FormSubmission, Page};
use crate::sanitizer::Username;
use crate::{Error, Result};

const HAS_CONTENTS_CLASS: &str = "has-contents";
const DISABLED_CLASS: &str = "button--disabled";
const HIDDEN_CLASS: &str = "hidden";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    Checking,
    /// Terminal: the form was hidden or submitted.
    Succeeded,
    /// The last attempt was rejected; a new submit is accepted.
    Failed,
}

impl SubmissionState {
    pub fn accepts_submit(self) -> bool {
        matches!(self, Self::Idle | Self::Failed)
    }
}

/// Why a submission did not succeed. Every variant is rendered in the
/// message area and returns the control to an enabled state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PickError {
    #[error("no username entered")]
    EmptyInput,
    #[error("username contains a disallowed character")]
    InvalidCharacter,
    #[error("username is not available")]
    Unavailable,
    #[error("availability check failed: {0}")]
    TransportFailure(String),
}

impl PickError {
    pub fn message(&self) -> Message {
        match self {
            Self::EmptyInput => Message::text(message::EMPTY_INPUT),
            Self::InvalidCharacter => Message::invalid_characters(),
            Self::Unavailable => Message::text(message::UNAVAILABLE),
            Self::TransportFailure(reason) => {
                Message::text(message::TRANSPORT_PREFIX).push_text(reason.clone())
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Handles {
    pub(crate) input: NodeId,
    pub(crate) submit: NodeId,
    pub(crate) message: NodeId,
    pub(crate) form: NodeId,
    pub(crate) session_field: Option<NodeId>,
}

impl Handles {
    pub(crate) fn bind(dom: &Dom, config: &PickerConfig) -> Result<Self> {
        let required = |id: &str| {
            dom.by_id(id)
                .ok_or_else(|| Error::MissingElement(id.to_string()))
        };
        let ids = &config.ids;
        let session_field = match config.on_success {
            SuccessAction::SubmitForm => Some(required(&ids.session_field)?),
            SuccessAction::HideForm => None,
        };
        Ok(Self {
            input: required(&ids.input)?,
            submit: required(&ids.submit)?,
            message: required(&ids.message)?,
            form: required(&ids.form)?,
            session_field,
        })
    }
}

impl Page {
    /// Routes a dispatched event to the picker. Returns whether the default
    /// action was prevented.
    pub(crate) fn handle_event(
        &mut self,
        target: NodeId,
        event_type: &str,
        key: Option<&str>,
    ) -> Result<bool> {
        if target == self.handles.submit && event_type == "click" {
            self.click_submit()?;
            return Ok(false);
        }
        if target != self.handles.input {
            return Ok(false);
        }

        match event_type {
            "input" | "change" => {
                self.switch_class()?;
                Ok(false)
            }
            kind if kind == self.config.enter_key_event.event_type() => {
                if key == Some("Enter") {
                    self.click_submit()?;
                    return Ok(true);
                }
                self.switch_class()?;
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    fn switch_class(&mut self) -> Result<()> {
        let input = self.handles.input;
        let has_contents = !self.dom.value(input)?.is_empty();
        if has_contents {
            self.dom.class_add(input, HAS_CONTENTS_CLASS);
        } else {
            self.dom.class_remove(input, HAS_CONTENTS_CLASS);
        }
        tracing::debug!(has_contents, "username field changed");
        Ok(())
    }

    /// Entry point for both the submit click and Enter in the field.
    pub(crate) fn click_submit(&mut self) -> Result<()> {
        if !self.state.accepts_submit() {
            self.trace_line(format!("[picker] submit ignored state={:?}", self.state));
            tracing::debug!(state = ?self.state, "submit ignored");
            return Ok(());
        }

        let submit = self.handles.submit;
        self.state = SubmissionState::Checking;
        self.dom.class_add(submit, DISABLED_CLASS);
        let checking = self.config.labels.checking.clone();
        self.set_control_label(submit, &checking)?;

        let raw = self.dom.value(self.handles.input)?;
        self.submit_username(&raw)
    }

    fn submit_username(&mut self, raw: &str) -> Result<()> {
        let username = match self.sanitizer.validate(raw) {
            Ok(username) => username,
            Err(reason) => {
                self.trace_line(format!("[picker] rejected reason={reason}"));
                tracing::info!(%reason, "username rejected before check");
                return self.on_response(Err(reason));
            }
        };

        let username = if self.config.lowercase_before_check {
            username.to_lowercase()
        } else {
            username
        };

        self.checker_calls += 1;
        let reply = self.checker.check(&username);
        let timer_id =
            self.scheduler
                .schedule(self.config.check_delay_ms, username.clone(), reply);
        self.trace_line(format!(
            "[picker] check username={username} timer={timer_id} delay_ms={}",
            self.config.check_delay_ms
        ));
        tracing::info!(%username, timer_id, "checking username availability");
        Ok(())
    }

    pub(crate) fn deliver_reply(&mut self, username: Username, reply: CheckReply) -> Result<()> {
        let outcome = match reply {
            CheckReply::Available => Ok(()),
            CheckReply::Unavailable => Err(PickError::Unavailable),
            CheckReply::Failed(reason) => {
                tracing::warn!(%username, %reason, "availability check failed");
                Err(PickError::TransportFailure(reason))
            }
        };
        self.trace_line(format!(
            "[picker] reply username={username} available={}",
            outcome.is_ok()
        ));
        self.on_response(outcome)
    }

    fn on_response(&mut self, outcome: std::result::Result<(), PickError>) -> Result<()> {
        match outcome {
            Ok(()) => {
                self.show_message(&Message::text(message::SUCCESS));
                self.state = SubmissionState::Succeeded;
                match self.config.on_success {
                    SuccessAction::HideForm => {
                        self.dom.class_add(self.handles.form, HIDDEN_CLASS);
                        tracing::info!("username accepted, form hidden pending redirect");
                    }
                    SuccessAction::SubmitForm => self.submit_form(),
                }
                Ok(())
            }
            Err(reason) => {
                self.show_message(&reason.message());
                let submit = self.handles.submit;
                self.dom.class_remove(submit, DISABLED_CLASS);
                let label = self.config.labels.submit.clone();
                self.set_control_label(submit, &label)?;
                self.state = SubmissionState::Failed;
                Ok(())
            }
        }
    }

    fn show_message(&mut self, message: &Message) {
        let target = self.handles.message;
        self.dom.class_remove(target, HIDDEN_CLASS);
        self.dom.clear_children(target);
        for part in message.parts() {
            match part {
                MessagePart::Text(text) => {
                    self.dom.create_text(target, text.clone());
                }
                MessagePart::Code(code) => {
                    let node = self
                        .dom
                        .create_element(target, "code".into(), HashMap::new());
                    self.dom.create_text(node, code.clone());
                }
            }
        }
    }

    /// `<input>` controls show their value; anything else its text.
    fn set_control_label(&mut self, control: NodeId, label: &str) -> Result<()> {
        if self
            .dom
            .tag_name(control)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("input"))
        {
            return self.dom.set_value(control, label);
        }
        self.dom.clear_children(control);
        self.dom.create_text(control, label.to_string());
        Ok(())
    }

    fn submit_form(&mut self) {
        let form = self.handles.form;
        let action = self.dom.attr(form, "action").unwrap_or_default();
        let method = self
            .dom
            .attr(form, "method")
            .map(|method| method.to_ascii_lowercase())
            .unwrap_or_else(|| "get".into());
        let fields = self.dom.form_fields(form);
        tracing::info!(%action, %method, fields = fields.len(), "submitting username form");
        self.trace_line(format!(
            "[picker] submit form action={action} method={method}"
        ));
        self.submissions.push(FormSubmission {
            action,
            method,
            fields,
        });
    }
}
