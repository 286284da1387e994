use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{PushError, Result};
use crate::message::Message;
use crate::provider::Provider;

/// Ordered set of messages handed to `Dispatcher::dispatch_all`.
#[derive(Debug, Clone, Default)]
pub struct MessageCollection {
    messages: Vec<Message>,
}

impl MessageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON array of message documents, each tagged with a `provider` key.
    pub fn from_json(documents: Value) -> Result<Self> {
        let Value::Array(items) = documents else {
            return Err(PushError::invalid_argument(
                "Message collection must be a JSON array",
            ));
        };

        let mut collection = Self::new();
        for item in items {
            let Value::Object(mut fields) = item else {
                return Err(PushError::invalid_argument("Message document must be an object"));
            };
            let provider = match fields.remove("provider") {
                Some(Value::String(name)) => name.parse::<Provider>()?,
                _ => {
                    return Err(PushError::invalid_argument(
                        "Message document requires a string 'provider' field",
                    ))
                }
            };
            collection.push(Message::from_json(provider, Value::Object(fields))?);
        }
        Ok(collection)
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Messages grouped by provider, keeping their relative order.
    pub fn by_provider(&self) -> BTreeMap<Provider, Vec<&Message>> {
        let mut groups: BTreeMap<Provider, Vec<&Message>> = BTreeMap::new();
        for message in &self.messages {
            groups.entry(message.provider()).or_default().push(message);
        }
        groups
    }
}

impl FromIterator<Message> for MessageCollection {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

impl Extend<Message> for MessageCollection {
    fn extend<I: IntoIterator<Item = Message>>(&mut self, iter: I) {
        self.messages.extend(iter);
    }
}

impl<'a> IntoIterator for &'a MessageCollection {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

impl IntoIterator for MessageCollection {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}
