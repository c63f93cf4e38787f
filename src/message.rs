// src/message.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FieldError;
use crate::services::schema::ResponseVariant;

/// Inbound chat message. `id` and `isUser` are client display metadata.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatRequest {
    pub text: String,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, rename = "isUser")]
    pub is_user: Option<bool>,
}

impl ChatRequest {
    /// Check a decoded body field by field. Unknown fields are ignored.
    pub fn validate(body: &Value) -> Result<Self, Vec<FieldError>> {
        let Some(object) = body.as_object() else {
            return Err(vec![FieldError::new(
                &["body"],
                "Input should be a valid dictionary",
                "dict_type",
            )]);
        };

        let mut errors = Vec::new();
        let text = match object.get("text") {
            Some(Value::String(text)) => Some(text.clone()),
            Some(_) => {
                errors.push(FieldError::body_field("text", "Input should be a valid string", "string_type"));
                None
            }
            None => {
                errors.push(FieldError::body_field("text", "Field required", "missing"));
                None
            }
        };
        let id = match object.get("id") {
            None | Some(Value::Null) => None,
            Some(value) => {
                if value.as_i64().is_none() {
                    errors.push(FieldError::body_field("id", "Input should be a valid integer", "int_type"));
                }
                value.as_i64()
            }
        };
        let is_user = match object.get("isUser") {
            None | Some(Value::Null) => None,
            Some(value) => {
                if value.as_bool().is_none() {
                    errors.push(FieldError::body_field("isUser", "Input should be a valid boolean", "bool_type"));
                }
                value.as_bool()
            }
        };

        match text {
            Some(text) if errors.is_empty() => Ok(Self { text, id, is_user }),
            _ => Err(errors),
        }
    }
}

/// Transport envelope: the reply kind plus its fields as a JSON string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericMessage {
    pub message_type: String,
    pub json_content: String,
}

impl TryFrom<&ResponseVariant> for GenericMessage {
    type Error = serde_json::Error;

    fn try_from(response: &ResponseVariant) -> Result<Self, Self::Error> {
        let json_content = match response {
            ResponseVariant::Text(m) => serde_json::to_string(m)?,
            ResponseVariant::MultiSelect(m) => serde_json::to_string(m)?,
            ResponseVariant::Picker(m) => serde_json::to_string(m)?,
            ResponseVariant::Rating(m) => serde_json::to_string(m)?,
            ResponseVariant::YesNo(m) => serde_json::to_string(m)?,
        };
        Ok(Self {
            message_type: response.message_type().to_string(),
            json_content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::schema::RatingMessage;
    use serde_json::json;

    #[test]
    fn validate_accepts_metadata_and_ignores_extras() {
        let body = json!({ "text": "hi", "id": 3, "isUser": true, "color": "blue" });
        let request = ChatRequest::validate(&body).unwrap();
        assert_eq!(request.text, "hi");
        assert_eq!(request.id, Some(3));
        assert_eq!(request.is_user, Some(true));
    }

    #[test]
    fn validate_reports_each_bad_field() {
        let errors = ChatRequest::validate(&json!({ "text": 7, "id": "x" })).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.loc[1].as_str()).collect();
        assert_eq!(fields, vec!["text", "id"]);
        assert_eq!(errors[0].kind, "string_type");

        let errors = ChatRequest::validate(&json!({})).unwrap_err();
        assert_eq!(errors, vec![FieldError::body_field("text", "Field required", "missing")]);

        let errors = ChatRequest::validate(&json!(["text"])).unwrap_err();
        assert_eq!(errors[0].loc, vec!["body".to_string()]);
    }

    #[test]
    fn envelope_carries_untagged_payload() {
        let reply = ResponseVariant::Rating(RatingMessage {
            text: "How was it?".into(),
            range_low: 1,
            range_high: 5,
        });
        let envelope = GenericMessage::try_from(&reply).unwrap();
        assert_eq!(envelope.message_type, "RatingMessage");
        assert_eq!(
            envelope.json_content,
            r#"{"text":"How was it?","range_low":1,"range_high":5}"#
        );
    }
}
