// src/services/schema.rs
//! Typed reply shapes and the structured-output schema handed to the provider.
//!
//! A reply is exactly one [`ResponseVariant`]. Raw provider output is only
//! turned into a variant through [`ResponseSchema`], which checks the tag,
//! the required fields of that tag, and the per-variant invariants
//! (non-empty `options`, `range_low < range_high`).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::ChatError;

/// Name used for the structured-output schema unless a caller picks another.
pub const DEFAULT_SCHEMA_NAME: &str = "ChatResponse";

/// Wrapper property the provider puts the chosen variant under.
const ENVELOPE_FIELD: &str = "message";
const TAG_FIELD: &str = "type";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiSelectMessage {
    pub text: String,
    pub options: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickerMessage {
    pub text: String,
    pub options: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingMessage {
    pub text: String,
    pub range_low: i64,
    pub range_high: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YesNoMessage {
    pub text: String,
}

/// The five reply kinds, without payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Text,
    MultiSelect,
    Picker,
    Rating,
    YesNo,
}

impl MessageKind {
    pub const ALL: [MessageKind; 5] = [
        MessageKind::Text,
        MessageKind::MultiSelect,
        MessageKind::Picker,
        MessageKind::Rating,
        MessageKind::YesNo,
    ];

    /// Literal tag used on the wire and in the HTTP envelope.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Text => "TextMessage",
            MessageKind::MultiSelect => "MultiSelectMessage",
            MessageKind::Picker => "PickerMessage",
            MessageKind::Rating => "RatingMessage",
            MessageKind::YesNo => "YesNoMessage",
        }
    }

    fn json_schema(self) -> Value {
        let mut properties = Map::new();
        properties.insert(
            TAG_FIELD.to_string(),
            json!({ "type": "string", "enum": [self.as_str()] }),
        );
        properties.insert("text".to_string(), json!({ "type": "string" }));
        match self {
            MessageKind::MultiSelect | MessageKind::Picker => {
                properties.insert(
                    "options".to_string(),
                    json!({ "type": "array", "items": { "type": "string" } }),
                );
            }
            MessageKind::Rating => {
                properties.insert("range_low".to_string(), json!({ "type": "integer" }));
                properties.insert("range_high".to_string(), json!({ "type": "integer" }));
            }
            MessageKind::Text | MessageKind::YesNo => {}
        }
        let required: Vec<Value> = properties.keys().cloned().map(Value::String).collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated reply. Serialized with a `type` tag carrying the kind name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResponseVariant {
    #[serde(rename = "TextMessage")]
    Text(TextMessage),
    #[serde(rename = "MultiSelectMessage")]
    MultiSelect(MultiSelectMessage),
    #[serde(rename = "PickerMessage")]
    Picker(PickerMessage),
    #[serde(rename = "RatingMessage")]
    Rating(RatingMessage),
    #[serde(rename = "YesNoMessage")]
    YesNo(YesNoMessage),
}

impl ResponseVariant {
    pub fn kind(&self) -> MessageKind {
        match self {
            ResponseVariant::Text(_) => MessageKind::Text,
            ResponseVariant::MultiSelect(_) => MessageKind::MultiSelect,
            ResponseVariant::Picker(_) => MessageKind::Picker,
            ResponseVariant::Rating(_) => MessageKind::Rating,
            ResponseVariant::YesNo(_) => MessageKind::YesNo,
        }
    }

    pub fn message_type(&self) -> &'static str {
        self.kind().as_str()
    }

    pub fn text(&self) -> &str {
        match self {
            ResponseVariant::Text(m) => &m.text,
            ResponseVariant::MultiSelect(m) => &m.text,
            ResponseVariant::Picker(m) => &m.text,
            ResponseVariant::Rating(m) => &m.text,
            ResponseVariant::YesNo(m) => &m.text,
        }
    }

    fn check_invariants(&self) -> Result<(), String> {
        match self {
            ResponseVariant::MultiSelect(MultiSelectMessage { options, .. })
            | ResponseVariant::Picker(PickerMessage { options, .. })
                if options.is_empty() =>
            {
                Err(format!("`options` of {} must not be empty", self.kind()))
            }
            ResponseVariant::Rating(RatingMessage { range_low, range_high, .. })
                if range_low >= range_high =>
            {
                Err(format!(
                    "`range_low` ({range_low}) must be less than `range_high` ({range_high})"
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Tagged JSON form, as recorded in conversation memory.
impl fmt::Display for ResponseVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Provider output that does not describe exactly one permitted variant.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("response does not match schema: {reason}")]
pub struct SchemaValidationError {
    pub reason: String,
    /// The offending payload, verbatim.
    pub raw: String,
}

impl SchemaValidationError {
    fn new(reason: impl Into<String>, raw: &Value) -> Self {
        Self {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }
}

/// Schema descriptor: a name, the permitted reply kinds, and the JSON Schema
/// document sent to the provider in structured-output mode.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseSchema {
    name: String,
    kinds: Vec<MessageKind>,
    document: Value,
}

impl ResponseSchema {
    /// All five reply kinds under [`DEFAULT_SCHEMA_NAME`].
    pub fn chat_response() -> Self {
        Self::build(DEFAULT_SCHEMA_NAME.to_string(), MessageKind::ALL.to_vec())
    }

    /// A schema limited to `kinds`. The name must be non-empty and made of
    /// ASCII letters, digits, `_` or `-`.
    pub fn new(name: impl Into<String>, kinds: &[MessageKind]) -> Result<Self, ChatError> {
        let name = name.into();
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ChatError::Configuration(format!(
                "invalid response schema name `{name}`"
            )));
        }
        let mut unique = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if !unique.contains(kind) {
                unique.push(*kind);
            }
        }
        if unique.is_empty() {
            return Err(ChatError::Configuration(format!(
                "response schema `{name}` permits no message kinds"
            )));
        }
        Ok(Self::build(name, unique))
    }

    fn build(name: String, kinds: Vec<MessageKind>) -> Self {
        let variants: Vec<Value> = kinds.iter().map(|k| k.json_schema()).collect();
        let document = json!({
            "type": "object",
            "properties": { ENVELOPE_FIELD: { "anyOf": variants } },
            "required": [ENVELOPE_FIELD],
            "additionalProperties": false,
        });
        Self { name, kinds, document }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kinds(&self) -> &[MessageKind] {
        &self.kinds
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Validate one tagged variant object.
    pub fn validate(&self, raw: &Value) -> Result<ResponseVariant, SchemaValidationError> {
        if !raw.is_object() {
            return Err(SchemaValidationError::new("expected a JSON object", raw));
        }
        let variant = ResponseVariant::deserialize(raw)
            .map_err(|e| SchemaValidationError::new(e.to_string(), raw))?;
        if !self.kinds.contains(&variant.kind()) {
            return Err(SchemaValidationError::new(
                format!("{} is not permitted by schema `{}`", variant.kind(), self.name),
                raw,
            ));
        }
        variant
            .check_invariants()
            .map_err(|reason| SchemaValidationError::new(reason, raw))?;
        Ok(variant)
    }

    /// Validate the `{ "message": { ... } }` wrapper produced in structured-output mode.
    pub fn validate_envelope(&self, raw: &Value) -> Result<ResponseVariant, SchemaValidationError> {
        match raw.get(ENVELOPE_FIELD) {
            Some(inner) => self.validate(inner),
            None => Err(SchemaValidationError::new(
                format!("missing field `{ENVELOPE_FIELD}`"),
                raw,
            )),
        }
    }

    /// Parse raw provider text, wrapped or bare.
    pub fn parse(&self, raw: &str) -> Result<ResponseVariant, SchemaValidationError> {
        let value: Value = serde_json::from_str(raw).map_err(|e| SchemaValidationError {
            reason: format!("not valid JSON: {e}"),
            raw: raw.to_string(),
        })?;
        if value.get(TAG_FIELD).is_none() && value.get(ENVELOPE_FIELD).is_some() {
            self.validate_envelope(&value)
        } else {
            self.validate(&value)
        }
    }
}

impl Default for ResponseSchema {
    fn default() -> Self {
        Self::chat_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ResponseSchema {
        ResponseSchema::chat_response()
    }

    #[test]
    fn accepts_every_canonical_shape() {
        let payloads = [
            json!({ "type": "TextMessage", "text": "hi" }),
            json!({ "type": "MultiSelectMessage", "text": "pick some", "options": ["a", "b"] }),
            json!({ "type": "PickerMessage", "text": "pick one", "options": ["a"] }),
            json!({ "type": "RatingMessage", "text": "rate", "range_low": 1, "range_high": 10 }),
            json!({ "type": "YesNoMessage", "text": "ok?" }),
        ];
        let kinds: Vec<MessageKind> = payloads
            .iter()
            .map(|p| schema().validate(p).unwrap().kind())
            .collect();
        assert_eq!(kinds, MessageKind::ALL.to_vec());
    }

    #[test]
    fn rejects_missing_required_field() {
        let raw = json!({ "type": "PickerMessage", "text": "choose" });
        let err = schema().validate(&raw).unwrap_err();
        assert!(err.reason.contains("options"), "{}", err.reason);
        assert_eq!(err.raw, raw.to_string());

        let raw = json!({ "type": "RatingMessage", "text": "rate", "range_low": 1 });
        assert!(schema().validate(&raw).unwrap_err().reason.contains("range_high"));
    }

    #[test]
    fn rejects_unknown_or_missing_tag() {
        assert!(schema().validate(&json!({ "type": "SliderMessage", "text": "x" })).is_err());
        assert!(schema().validate(&json!({ "text": "x" })).is_err());
        assert!(schema().validate(&json!("TextMessage")).is_err());
    }

    #[test]
    fn rejects_empty_options() {
        let raw = json!({ "type": "MultiSelectMessage", "text": "pick", "options": [] });
        let err = schema().validate(&raw).unwrap_err();
        assert!(err.reason.contains("must not be empty"));
    }

    #[test]
    fn rating_range_must_be_increasing() {
        let equal = json!({ "type": "RatingMessage", "text": "r", "range_low": 5, "range_high": 5 });
        let inverted = json!({ "type": "RatingMessage", "text": "r", "range_low": 9, "range_high": 2 });
        let valid = json!({ "type": "RatingMessage", "text": "r", "range_low": 1, "range_high": 10 });
        assert!(schema().validate(&equal).is_err());
        assert!(schema().validate(&inverted).is_err());
        assert_eq!(
            schema().validate(&valid).unwrap(),
            ResponseVariant::Rating(RatingMessage {
                text: "r".into(),
                range_low: 1,
                range_high: 10,
            })
        );
    }

    #[test]
    fn no_coercion_of_field_types() {
        let raw = json!({ "type": "RatingMessage", "text": "r", "range_low": "1", "range_high": 10 });
        assert!(schema().validate(&raw).is_err());
        let raw = json!({ "type": "RatingMessage", "text": "r", "range_low": 1.5, "range_high": 10 });
        assert!(schema().validate(&raw).is_err());
        let raw = json!({ "type": "PickerMessage", "text": "p", "options": ["a", 2] });
        assert!(schema().validate(&raw).is_err());
    }

    #[test]
    fn parse_handles_wrapped_bare_and_garbage() {
        let wrapped = r#"{"message":{"type":"YesNoMessage","text":"sure?"}}"#;
        let bare = r#"{"type":"YesNoMessage","text":"sure?"}"#;
        assert_eq!(schema().parse(wrapped).unwrap(), schema().parse(bare).unwrap());

        let err = schema().parse("definitely not json").unwrap_err();
        assert!(err.reason.starts_with("not valid JSON"));
        assert_eq!(err.raw, "definitely not json");
    }

    #[test]
    fn restricted_schema_rejects_other_kinds() {
        let text_only = ResponseSchema::new("TextResponse", &[MessageKind::Text]).unwrap();
        assert!(text_only.validate(&json!({ "type": "TextMessage", "text": "a" })).is_ok());
        let err = text_only
            .validate(&json!({ "type": "YesNoMessage", "text": "a" }))
            .unwrap_err();
        assert!(err.reason.contains("not permitted"));
    }

    #[test]
    fn schema_descriptor_configuration_errors() {
        assert!(matches!(
            ResponseSchema::new("", &[MessageKind::Text]),
            Err(ChatError::Configuration(_))
        ));
        assert!(matches!(
            ResponseSchema::new("has space", &[MessageKind::Text]),
            Err(ChatError::Configuration(_))
        ));
        assert!(matches!(
            ResponseSchema::new("Empty", &[]),
            Err(ChatError::Configuration(_))
        ));
    }

    #[test]
    fn document_lists_one_branch_per_kind() {
        let doc = schema().document().clone();
        let branches = doc["properties"]["message"]["anyOf"].as_array().unwrap();
        assert_eq!(branches.len(), 5);
        let picker = &branches[2];
        assert_eq!(picker["properties"]["type"]["enum"][0], "PickerMessage");
        assert_eq!(picker["additionalProperties"], false);
        let required: Vec<&str> = picker["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(required.contains(&"options"));
        assert!(required.contains(&"text"));
    }

    #[test]
    fn display_is_tagged_json() {
        let reply = ResponseVariant::Text(TextMessage { text: "hello".into() });
        assert_eq!(reply.to_string(), r#"{"type":"TextMessage","text":"hello"}"#);
        assert_eq!(reply.text(), "hello");
        assert_eq!(reply.message_type(), "TextMessage");
    }
}
