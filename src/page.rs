use std::collections::VecDeque;
use std::fmt;

use crate::checker::AvailabilityChecker;
use crate::config::{PickerConfig, SuccessAction};
use crate::dom::{Dom, NodeId};
use crate::html::parse_html;
use crate::picker::{Handles, SubmissionState};
use crate::sanitizer::Sanitizer;
use crate::scheduler::SchedulerState;
use crate::url::{encode_form_urlencoded_component, query_param};
use crate::{Error, Result};

const SESSION_QUERY_PARAM: &str = "session_id";

/// A form the picker submitted programmatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    pub action: String,
    pub method: String,
    pub fields: Vec<(String, String)>,
}

impl FormSubmission {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// `application/x-www-form-urlencoded` body of the submission.
    pub fn encoded_body(&self) -> String {
        self.fields
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    encode_form_urlencoded_component(name),
                    encode_form_urlencoded_component(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[derive(Debug)]
pub(crate) struct TraceState {
    pub(crate) enabled: bool,
    pub(crate) logs: VecDeque<String>,
    pub(crate) log_limit: usize,
}

impl Default for TraceState {
    fn default() -> Self {
        Self {
            enabled: false,
            logs: VecDeque::new(),
            log_limit: 10_000,
        }
    }
}

/// One loaded registration page with the picker bound to it.
pub struct Page {
    pub(crate) dom: Dom,
    pub(crate) url: String,
    pub(crate) config: PickerConfig,
    pub(crate) sanitizer: Sanitizer,
    pub(crate) checker: Box<dyn AvailabilityChecker>,
    pub(crate) handles: Handles,
    pub(crate) state: SubmissionState,
    pub(crate) session_id: Option<String>,
    pub(crate) scheduler: SchedulerState,
    pub(crate) submissions: Vec<FormSubmission>,
    pub(crate) checker_calls: usize,
    pub(crate) trace: TraceState,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("url", &self.url)
            .field("state", &self.state)
            .field("session_id", &self.session_id)
            .field("now_ms", &self.scheduler.now_ms)
            .field("pending_timers", &self.scheduler.task_queue.len())
            .field("submissions", &self.submissions.len())
            .field("checker_calls", &self.checker_calls)
            .finish_non_exhaustive()
    }
}

impl Page {
    /// Parses `html`, binds the picker handles and captures the session id
    /// from `url`. Fails if a required element is missing from the template.
    pub fn load(
        url: &str,
        html: &str,
        config: PickerConfig,
        checker: impl AvailabilityChecker + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let dom = parse_html(html)?;
        let handles = Handles::bind(&dom, &config)?;
        let sanitizer = if config.validate_characters {
            Sanitizer::new()?
        } else {
            Sanitizer::empty_check_only()?
        };
        let session_id = query_param(url, SESSION_QUERY_PARAM)?;

        let mut page = Self {
            dom,
            url: url.to_string(),
            config,
            sanitizer,
            checker: Box::new(checker),
            handles,
            state: SubmissionState::Idle,
            session_id,
            scheduler: SchedulerState::default(),
            submissions: Vec::new(),
            checker_calls: 0,
            trace: TraceState::default(),
        };

        if page.config.on_success == SuccessAction::SubmitForm {
            if let Some(field) = page.handles.session_field {
                let value = page.session_id.clone().unwrap_or_default();
                page.dom.set_value(field, &value)?;
            }
        }

        tracing::info!(
            url = %page.url,
            on_success = ?page.config.on_success,
            has_session = page.session_id.is_some(),
            "username picker bound"
        );
        Ok(page)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn config(&self) -> &PickerConfig {
        &self.config
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    /// Decoded `session_id` query parameter captured at load.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn submissions(&self) -> &[FormSubmission] {
        &self.submissions
    }

    /// Number of times the availability checker has been consulted.
    pub fn checker_calls(&self) -> usize {
        self.checker_calls
    }

    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let tag = self
            .dom
            .tag_name(target)
            .unwrap_or_default()
            .to_ascii_lowercase();
        if tag != "input" && tag != "textarea" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".into(),
                actual: tag,
            });
        }
        self.dom.set_value(target, text)?;
        self.dispatch_event(target, "input", None)?;
        Ok(())
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dispatch_event(target, "click", None)?;
        Ok(())
    }

    /// Fires `keydown`, `keypress` and `keyup` for `key` on the target.
    /// Returns whether any handler prevented the default action.
    pub fn press_key(&mut self, selector: &str, key: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        let mut prevented = false;
        for event_type in ["keydown", "keypress", "keyup"] {
            prevented |= self.dispatch_event(target, event_type, Some(key))?;
        }
        Ok(prevented)
    }

    /// Fires a single key event. Returns whether it was default-prevented.
    pub fn dispatch_key(&mut self, selector: &str, event_type: &str, key: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        self.dispatch_event(target, event_type, Some(key))
    }

    pub fn press_enter(&mut self, selector: &str) -> Result<()> {
        self.press_key(selector, "Enter")?;
        Ok(())
    }

    pub fn dispatch(&mut self, selector: &str, event_type: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dispatch_event(target, event_type, None)?;
        Ok(())
    }

    fn dispatch_event(&mut self, target: NodeId, event_type: &str, key: Option<&str>) -> Result<bool> {
        let label = self
            .dom
            .attr(target, "id")
            .map(|id| format!("#{id}"))
            .unwrap_or_else(|| self.dom.tag_name(target).unwrap_or("node").to_string());
        match key {
            Some(key) => self.trace_line(format!("[event] {event_type} target={label} key={key}")),
            None => self.trace_line(format!("[event] {event_type} target={label}")),
        }
        self.handle_event(target, event_type, key)
    }

    pub fn value(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        self.dom.value(target)
    }

    pub fn has_class(&self, selector: &str, class_name: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        Ok(self.dom.class_contains(target, class_name))
    }

    /// Serialized children of the target, text escaped.
    pub fn inner_html(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.inner_html(target))
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.value(target)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_class(&self, selector: &str, class_name: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.class_contains(target, class_name);
        if actual != expected {
            let describe = |present: bool| {
                if present {
                    format!("class {class_name}")
                } else {
                    format!("no class {class_name}")
                }
            };
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: describe(expected),
                actual: describe(actual),
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        self.select_one(selector).map(|_| ())
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace.enabled = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Config("trace log limit must be at least 1".into()));
        }
        self.trace.log_limit = max_entries;
        while self.trace.logs.len() > max_entries {
            self.trace.logs.pop_front();
        }
        Ok(())
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace.logs.drain(..).collect()
    }

    pub(crate) fn trace_line(&mut self, line: String) {
        tracing::trace!("{line}");
        if self.trace.enabled {
            if self.trace.logs.len() >= self.trace.log_limit {
                self.trace.logs.pop_front();
            }
            self.trace.logs.push_back(line);
        }
    }

    pub(crate) fn select_one(&self, selector: &str) -> Result<NodeId> {
        let selector = selector.trim();
        let Some(id) = selector.strip_prefix('#') else {
            return Err(Error::UnsupportedSelector(selector.to_string()));
        };
        if id.is_empty() || id.contains(|c: char| c.is_whitespace() || ".#[:>".contains(c)) {
            return Err(Error::UnsupportedSelector(selector.to_string()));
        }
        self.dom
            .by_id(id)
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn node_snippet(&self, node_id: NodeId) -> String {
        truncate_chars(&self.dom.dump_node(node_id), 200)
    }
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    let mut it = value.chars();
    let mut out = String::new();
    for _ in 0..max_chars {
        let Some(ch) = it.next() else {
            return out;
        };
        out.push(ch);
    }
    if it.next().is_some() {
        out.push_str("...");
    }
    out
}
