//! Payload resolution: raw JSONB → typed send request.
//!
//! The action string is resolved once, at intake, into a tagged variant;
//! downstream code matches exhaustively instead of string-comparing.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    #[serde(rename = "whatsapp")]
    WhatsApp,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::WhatsApp => "whatsapp",
        }
    }

    /// Canonical action string for payloads this service writes itself.
    pub fn action(&self) -> &'static str {
        match self {
            Channel::Email => "send_email",
            Channel::WhatsApp => "send_whatsapp",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job's action, resolved from the payload's action string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Email,
    WhatsApp,
    Unsupported(String),
}

impl Action {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "send_email" | "email" => Action::Email,
            "send_whatsapp" | "whatsapp" => Action::WhatsApp,
            other => Action::Unsupported(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("payload has no action")]
    MissingAction,
    #[error("unsupported action {0}")]
    UnsupportedAction(String),
    #[error("payload has no recipient for {0} channel")]
    MissingRecipient(Channel),
}

/// One resolved, channel-tagged send.
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub channel: Channel,
    pub to: String,
    pub subject: Option<String>,
    pub body: String,
    pub template_id: Option<String>,
    pub template_params: Option<Value>,
}

/// Resolve a raw job payload into a [`SendRequest`].
///
/// Accepts the recipient under `to` or the channel-specific key the event
/// triggers use (`email` / `phone`), and the body under `body` or `message`.
/// The body may be empty when the send is template-driven.
pub fn resolve_payload(payload: &Value) -> Result<SendRequest, PayloadError> {
    let obj = payload.as_object().ok_or(PayloadError::NotAnObject)?;
    let action = obj
        .get("action")
        .and_then(Value::as_str)
        .ok_or(PayloadError::MissingAction)?;

    let channel = match Action::parse(action) {
        Action::Email => Channel::Email,
        Action::WhatsApp => Channel::WhatsApp,
        Action::Unsupported(other) => return Err(PayloadError::UnsupportedAction(other)),
    };

    let recipient_alias = match channel {
        Channel::Email => "email",
        Channel::WhatsApp => "phone",
    };
    let to = obj
        .get("to")
        .or_else(|| obj.get(recipient_alias))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(PayloadError::MissingRecipient(channel))?
        .to_string();

    let body = obj
        .get("body")
        .or_else(|| obj.get("message"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(SendRequest {
        channel,
        to,
        subject: obj
            .get("subject")
            .and_then(Value::as_str)
            .map(str::to_string),
        body,
        template_id: obj
            .get("template_id")
            .and_then(Value::as_str)
            .map(str::to_string),
        template_params: obj
            .get("template_params")
            .filter(|v| !v.is_null())
            .cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_aliases_resolve_identically() {
        assert_eq!(Action::parse("send_email"), Action::Email);
        assert_eq!(Action::parse("email"), Action::Email);
        assert_eq!(Action::parse("send_whatsapp"), Action::WhatsApp);
        assert_eq!(Action::parse("whatsapp"), Action::WhatsApp);
    }

    #[test]
    fn unknown_action_is_unsupported() {
        assert_eq!(Action::parse("fax"), Action::Unsupported("fax".to_string()));
    }

    #[test]
    fn resolves_email_payload() {
        let request = resolve_payload(&json!({
            "action": "send_email",
            "to": "a@b.com",
            "subject": "S",
            "body": "B"
        }))
        .unwrap();
        assert_eq!(request.channel, Channel::Email);
        assert_eq!(request.to, "a@b.com");
        assert_eq!(request.subject.as_deref(), Some("S"));
        assert_eq!(request.body, "B");
    }

    #[test]
    fn resolves_whatsapp_payload_with_aliases() {
        let request = resolve_payload(&json!({
            "action": "whatsapp",
            "phone": "+15551234567",
            "message": "hello"
        }))
        .unwrap();
        assert_eq!(request.channel, Channel::WhatsApp);
        assert_eq!(request.to, "+15551234567");
        assert_eq!(request.body, "hello");
    }

    #[test]
    fn unsupported_action_error_names_the_action() {
        let err = resolve_payload(&json!({"action": "fax", "to": "x"})).unwrap_err();
        assert_eq!(err, PayloadError::UnsupportedAction("fax".to_string()));
        assert_eq!(err.to_string(), "unsupported action fax");
    }

    #[test]
    fn missing_recipient_is_rejected() {
        let err = resolve_payload(&json!({"action": "send_email", "body": "B"})).unwrap_err();
        assert_eq!(err, PayloadError::MissingRecipient(Channel::Email));
    }

    #[test]
    fn blank_recipient_is_rejected() {
        let err = resolve_payload(&json!({"action": "send_email", "to": "  "})).unwrap_err();
        assert_eq!(err, PayloadError::MissingRecipient(Channel::Email));
    }

    #[test]
    fn missing_action_is_rejected() {
        assert_eq!(
            resolve_payload(&json!({"to": "a@b.com"})).unwrap_err(),
            PayloadError::MissingAction
        );
        assert_eq!(
            resolve_payload(&json!("nope")).unwrap_err(),
            PayloadError::NotAnObject
        );
    }

    #[test]
    fn body_defaults_to_empty_for_template_sends() {
        let request = resolve_payload(&json!({
            "action": "send_email",
            "to": "a@b.com",
            "template_id": "welcome",
            "template_params": {"name": "Ada"}
        }))
        .unwrap();
        assert_eq!(request.body, "");
        assert_eq!(request.template_id.as_deref(), Some("welcome"));
        assert!(request.template_params.is_some());
    }
}
