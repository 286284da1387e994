use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{PushError, Result};

/// Priority values accepted by APNS: immediate delivery or power-conserving.
const VALID_PRIORITIES: [u8; 2] = [5, 10];

/// Content of an APNS message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ApnsMessage {
    /// Message text of an alert
    pub alert: Option<String>,
    /// Number to display as the badge of the application icon
    pub badge: Option<u32>,
    /// Name of a sound file in the application bundle
    pub sound: Option<String>,
    /// Category for custom notification actions
    pub category: Option<String>,
    /// Arguments for Safari push URLs
    pub url_args: Vec<String>,
    /// Signal that new content is available (background fetch)
    pub content_available: bool,
    /// Allow a notification service extension to modify the content
    pub mutable_content: bool,
    /// 10 sends immediately, 5 conserves power on the device.
    /// Validated and accepted for compatibility; the command-1 frame has no
    /// priority field, so it never reaches the wire.
    pub priority: Option<u8>,
    /// Custom top-level payload keys, merged next to `aps`
    pub custom_payload_data: Map<String, Value>,
}

impl ApnsMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alert(mut self, alert: impl Into<String>) -> Self {
        self.alert = Some(alert.into());
        self
    }

    pub fn badge(mut self, badge: u32) -> Self {
        self.badge = Some(badge);
        self
    }

    pub fn sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = Some(sound.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn url_args(mut self, args: Vec<String>) -> Self {
        self.url_args = args;
        self
    }

    pub fn content_available(mut self, available: bool) -> Self {
        self.content_available = available;
        self
    }

    pub fn mutable_content(mut self, mutable: bool) -> Self {
        self.mutable_content = mutable;
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Add a custom top-level payload key.
    pub fn custom(mut self, key: impl Into<String>, value: Value) -> Self {
        self.custom_payload_data.insert(key.into(), value);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(priority) = self.priority {
            if !VALID_PRIORITIES.contains(&priority) {
                return Err(PushError::invalid_argument(format!(
                    "APNS priority must be 5 or 10, got {}",
                    priority
                )));
            }
        }
        if self.custom_payload_data.contains_key("aps") {
            return Err(PushError::invalid_argument(
                "Custom payload data must not redefine the 'aps' key",
            ));
        }
        Ok(())
    }
}
