use std::path::Path;

use serde::Deserialize;

use crate::{Error, Result};

/// What a successful check does to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuccessAction {
    /// Hide the form and wait for the host to redirect.
    #[default]
    HideForm,
    /// Submit the form, including the captured session id field.
    SubmitForm,
}

/// Key event that carries Enter detection on the username field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnterKeyEvent {
    #[default]
    Keyup,
    Keypress,
}

impl EnterKeyEvent {
    pub fn event_type(self) -> &'static str {
        match self {
            Self::Keyup => "keyup",
            Self::Keypress => "keypress",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ElementIds {
    pub input: String,
    pub submit: String,
    pub message: String,
    pub form: String,
    pub session_field: String,
}

impl Default for ElementIds {
    fn default() -> Self {
        Self {
            input: "field-username".into(),
            submit: "submit".into(),
            message: "message".into(),
            form: "form".into(),
            session_field: "session_id".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Labels {
    pub submit: String,
    pub checking: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            submit: "Submit".into(),
            checking: "Checking...".into(),
        }
    }
}

/// Per-deployment picker settings. Every field has a default, so an empty
/// TOML document is a valid configuration.
///
/// ```toml
/// on-success = "submit-form"
/// enter-key-event = "keypress"
/// validate-characters = true
/// check-delay-ms = 750
///
/// [ids]
/// input = "field-username"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct PickerConfig {
    pub on_success: SuccessAction,
    pub enter_key_event: EnterKeyEvent,
    pub validate_characters: bool,
    pub lowercase_before_check: bool,
    pub check_delay_ms: i64,
    pub ids: ElementIds,
    pub labels: Labels,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            on_success: SuccessAction::HideForm,
            enter_key_event: EnterKeyEvent::Keyup,
            validate_characters: true,
            lowercase_before_check: false,
            check_delay_ms: 750,
            ids: ElementIds::default(),
            labels: Labels::default(),
        }
    }
}

impl PickerConfig {
    pub fn hide_form() -> Self {
        Self::default()
    }

    pub fn submit_form() -> Self {
        Self {
            on_success: SuccessAction::SubmitForm,
            ..Self::default()
        }
    }

    pub fn from_toml_str(src: &str) -> Result<Self> {
        let config: Self = toml::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&src)?;
        tracing::debug!(path = %path.display(), ?config, "loaded picker config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.check_delay_ms < 0 {
            return Err(Error::Config(format!(
                "check-delay-ms must be non-negative (got {})",
                self.check_delay_ms
            )));
        }
        let ids = [
            ("input", &self.ids.input),
            ("submit", &self.ids.submit),
            ("message", &self.ids.message),
            ("form", &self.ids.form),
            ("session-field", &self.ids.session_field),
        ];
        if let Some((name, _)) = ids.iter().find(|(_, id)| id.trim().is_empty()) {
            return Err(Error::Config(format!("ids.{name} must not be empty")));
        }
        Ok(())
    }
}
