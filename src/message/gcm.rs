use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PushError, Result};

/// Collapse key, numeric or textual as the caller supplied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollapseKey {
    Numeric(u64),
    Text(String),
}

impl From<u64> for CollapseKey {
    fn from(value: u64) -> Self {
        CollapseKey::Numeric(value)
    }
}

impl From<&str> for CollapseKey {
    fn from(value: &str) -> Self {
        CollapseKey::Text(value.to_string())
    }
}

impl From<String> for CollapseKey {
    fn from(value: String) -> Self {
        CollapseKey::Text(value)
    }
}

/// Content of a GCM message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct GcmMessage {
    /// Messages with the same key replace each other while waiting for delivery
    pub collapse_key: Option<CollapseKey>,
    /// Hold the message until the device becomes active
    pub delay_while_idle: bool,
    /// Validate the request without delivering it
    pub dry_run: bool,
    /// Opaque data block delivered to the application
    pub payload_data: Option<Value>,
    /// Package name of the receiving application
    pub package_name: Option<String>,
}

impl GcmMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collapse_key(mut self, key: impl Into<CollapseKey>) -> Self {
        self.collapse_key = Some(key.into());
        self
    }

    pub fn delay_while_idle(mut self, delay: bool) -> Self {
        self.delay_while_idle = delay;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn payload_data(mut self, data: Value) -> Self {
        self.payload_data = Some(data);
        self
    }

    pub fn package_name(mut self, name: impl Into<String>) -> Self {
        self.package_name = Some(name.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match &self.payload_data {
            Some(data) if !data.is_object() => Err(PushError::invalid_argument(
                "GCM payload data must be a JSON object",
            )),
            _ => Ok(()),
        }
    }
}
