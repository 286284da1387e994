use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{PushError, Result};

/// MPNS notification sub-type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpnsKind {
    Tile,
    Toast,
    Raw,
}

impl MpnsKind {
    /// Value of the `X-WindowsPhone-Target` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            MpnsKind::Tile => "tile",
            MpnsKind::Toast => "toast",
            MpnsKind::Raw => "raw",
        }
    }

    fn base_class(&self) -> u8 {
        match self {
            MpnsKind::Tile => 1,
            MpnsKind::Toast => 2,
            MpnsKind::Raw => 3,
        }
    }
}

/// How soon MPNS should deliver the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum DeliveryInterval {
    #[default]
    #[serde(rename = "immediate")]
    Immediate,
    #[serde(rename = "450")]
    Within450Seconds,
    #[serde(rename = "900")]
    Within900Seconds,
}

impl DeliveryInterval {
    fn class_offset(&self) -> u8 {
        match self {
            DeliveryInterval::Immediate => 0,
            DeliveryInterval::Within450Seconds => 10,
            DeliveryInterval::Within900Seconds => 20,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct MpnsTile {
    pub title: Option<String>,
    pub background_image: Option<String>,
    pub count: Option<u32>,
    pub back_title: Option<String>,
    pub back_background_image: Option<String>,
    pub back_content: Option<String>,
}

impl MpnsTile {
    /// Element names and values, in document order.
    pub(crate) fn properties(&self) -> [(&'static str, Option<String>); 6] {
        [
            ("Title", self.title.clone()),
            ("BackgroundImage", self.background_image.clone()),
            ("Count", self.count.map(|count| count.to_string())),
            ("BackTitle", self.back_title.clone()),
            ("BackBackgroundImage", self.back_background_image.clone()),
            ("BackContent", self.back_content.clone()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct MpnsToast {
    pub text1: Option<String>,
    pub text2: Option<String>,
    pub param: Option<String>,
}

impl MpnsToast {
    /// Element names and values, in document order.
    pub(crate) fn properties(&self) -> [(&'static str, Option<String>); 3] {
        [
            ("Text1", self.text1.clone()),
            ("Text2", self.text2.clone()),
            ("Param", self.param.clone()),
        ]
    }
}

/// Arbitrary key/value payload of a raw notification.
///
/// Values are HTML-escaped when assigned, keys become element names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct MpnsRaw {
    entries: Vec<(String, String)>,
}

impl MpnsRaw {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a payload parameter, replacing an existing one with the same name.
    pub fn set(&mut self, name: impl Into<String>, value: &str) -> Result<()> {
        let name = name.into();
        if !is_xml_name(&name) {
            return Err(PushError::invalid_argument(format!(
                "Payload parameter name '{}' is not a valid element name",
                name
            )));
        }

        let escaped = html_escape(value);
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = escaped,
            None => self.entries.push((name, escaped)),
        }
        Ok(())
    }

    pub fn with(mut self, name: impl Into<String>, value: &str) -> Result<Self> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Escaped value of a payload parameter.
    pub fn get(&self, name: &str) -> Result<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .ok_or_else(|| {
                PushError::invalid_argument(format!("Payload parameter '{}' is not defined", name))
            })
    }

    pub(crate) fn entries(&self) -> &[(String, String)] {
        &self.entries
    }
}

impl TryFrom<Map<String, Value>> for MpnsRaw {
    type Error = PushError;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        let mut raw = MpnsRaw::new();
        for (key, value) in map {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(PushError::invalid_argument(format!(
                        "Payload parameter '{}' must be a scalar, got {}",
                        key, other
                    )))
                }
            };
            raw.set(key, &text)?;
        }
        Ok(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MpnsBody {
    Tile(MpnsTile),
    Toast(MpnsToast),
    Raw(MpnsRaw),
}

/// Content of an MPNS message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MpnsMessage {
    #[serde(default)]
    pub delivery_interval: DeliveryInterval,
    pub body: MpnsBody,
}

impl MpnsMessage {
    pub fn tile(tile: MpnsTile) -> Self {
        Self {
            delivery_interval: DeliveryInterval::default(),
            body: MpnsBody::Tile(tile),
        }
    }

    pub fn toast(toast: MpnsToast) -> Self {
        Self {
            delivery_interval: DeliveryInterval::default(),
            body: MpnsBody::Toast(toast),
        }
    }

    pub fn raw(raw: MpnsRaw) -> Self {
        Self {
            delivery_interval: DeliveryInterval::default(),
            body: MpnsBody::Raw(raw),
        }
    }

    pub fn delivery_interval(mut self, interval: DeliveryInterval) -> Self {
        self.delivery_interval = interval;
        self
    }

    pub fn kind(&self) -> MpnsKind {
        match self.body {
            MpnsBody::Tile(_) => MpnsKind::Tile,
            MpnsBody::Toast(_) => MpnsKind::Toast,
            MpnsBody::Raw(_) => MpnsKind::Raw,
        }
    }

    /// Value of the `X-NotificationClass` header.
    pub fn delivery_class(&self) -> u8 {
        self.kind().base_class() + self.delivery_interval.class_offset()
    }
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn html_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_delivery_class_codes() {
        let tile = MpnsMessage::tile(MpnsTile::default());
        assert_eq!(tile.delivery_class(), 1);
        let toast = MpnsMessage::toast(MpnsToast::default())
            .delivery_interval(DeliveryInterval::Within450Seconds);
        assert_eq!(toast.delivery_class(), 12);
        let raw = MpnsMessage::raw(MpnsRaw::new())
            .delivery_interval(DeliveryInterval::Within900Seconds);
        assert_eq!(raw.delivery_class(), 23);
        assert_eq!(raw.kind().as_str(), "raw");
    }

    #[test]
    fn test_raw_values_escaped_on_assignment() {
        let raw = MpnsRaw::new().with("note", "<b>Tom & Jerry</b>").unwrap();
        assert_eq!(raw.get("note").unwrap(), "&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;");
        assert!(raw.get("missing").is_err());
    }

    #[test]
    fn test_raw_rejects_invalid_element_name() {
        let mut raw = MpnsRaw::new();
        assert!(raw.set("1abc", "x").is_err());
        assert!(raw.set("has space", "x").is_err());
        assert!(raw.set("valid_name", "x").is_ok());
    }

    #[test]
    fn test_raw_set_replaces_existing() {
        let mut raw = MpnsRaw::new();
        raw.set("a", "1").unwrap();
        raw.set("b", "2").unwrap();
        raw.set("a", "3").unwrap();
        assert_eq!(
            raw.entries(),
            &[("a".to_string(), "3".to_string()), ("b".to_string(), "2".to_string())]
        );
    }

    #[test]
    fn test_deserialize_message() {
        let message: MpnsMessage = serde_json::from_value(json!({
            "deliveryInterval": "450",
            "body": {"toast": {"text1": "Hello", "param": "/Page.xaml"}}
        }))
        .unwrap();
        assert_eq!(message.kind(), MpnsKind::Toast);
        assert_eq!(message.delivery_class(), 12);

        let raw: MpnsMessage = serde_json::from_value(json!({
            "body": {"raw": {"score": 10, "player": "A&B"}}
        }))
        .unwrap();
        match raw.body {
            MpnsBody::Raw(raw) => assert_eq!(raw.get("player").unwrap(), "A&amp;B"),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_tile_property_order() {
        let tile = MpnsTile {
            title: Some("Title".into()),
            count: Some(3),
            ..Default::default()
        };
        let names: Vec<&str> = tile.properties().iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec![
                "Title",
                "BackgroundImage",
                "Count",
                "BackTitle",
                "BackBackgroundImage",
                "BackContent"
            ]
        );
    }
}
