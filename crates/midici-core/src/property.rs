//! Property exchange subscription headers and reply results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Reply status for a successful request.
pub const STATUS_OK: u16 = 200;
/// Reply status asking the initiator to retry later.
pub const STATUS_RETRY: u16 = 343;
/// Reply status terminating the request.
pub const STATUS_NOTIFY: u16 = 144;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertySubscriptionCommand {
    #[default]
    Start,
    Partial,
    Full,
    Notify,
    End,
}

impl PropertySubscriptionCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Partial => "partial",
            Self::Full => "full",
            Self::Notify => "notify",
            Self::End => "end",
        }
    }
}

impl fmt::Display for PropertySubscriptionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertySubscriptionCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "start" => Ok(Self::Start),
            "partial" => Ok(Self::Partial),
            "full" => Ok(Self::Full),
            "notify" => Ok(Self::Notify),
            "end" => Ok(Self::End),
            other => Err(Error::UnknownCommand(other.to_string())),
        }
    }
}

/// Header of a subscription request, as carried in the JSON request header.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySubscriptionHeader {
    pub command: PropertySubscriptionCommand,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource: String,
    #[serde(rename = "resId", default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribe_id: Option<String>,
}

impl PropertySubscriptionHeader {
    pub fn start(resource: impl Into<String>) -> Self {
        Self {
            command: PropertySubscriptionCommand::Start,
            resource: resource.into(),
            ..Self::default()
        }
    }

    pub fn end(resource: impl Into<String>, subscribe_id: impl Into<String>) -> Self {
        Self {
            command: PropertySubscriptionCommand::End,
            resource: resource.into(),
            subscribe_id: Some(subscribe_id.into()),
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Transport-level failures of a property exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyExchangeError {
    /// Only some chunks of the reply arrived.
    Partial,
    /// The responder terminated the request.
    Notify,
    /// The responder had no free request slots; the request may be retried.
    TooManyTransactions,
    Malformed,
    DecodeFailed,
}

impl fmt::Display for PropertyExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Partial => "partial reply",
            Self::Notify => "terminated by responder",
            Self::TooManyTransactions => "too many transactions",
            Self::Malformed => "malformed reply",
            Self::DecodeFailed => "reply decode failed",
        };
        f.write_str(text)
    }
}

/// Fields of a reply header relevant to subscriptions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplyHeader {
    pub status: Option<u16>,
    pub message: Option<String>,
    pub subscribe_id: Option<String>,
}

impl ReplyHeader {
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(200..=299))
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Outcome {
    Reply { header: Value, body: Vec<u8> },
    Failed(PropertyExchangeError),
}

/// Outcome of a property exchange request, delivered once per accepted request.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyExchangeResult {
    outcome: Outcome,
}

impl PropertyExchangeResult {
    pub fn from_error(error: PropertyExchangeError) -> Self {
        Self {
            outcome: Outcome::Failed(error),
        }
    }

    pub fn from_reply(header: Value, body: Vec<u8>) -> Self {
        Self {
            outcome: Outcome::Reply { header, body },
        }
    }

    /// Parse the JSON header bytes of a reply.
    pub fn from_header_json(header: &[u8], body: Vec<u8>) -> Result<Self> {
        let header = serde_json::from_slice(header)?;
        Ok(Self::from_reply(header, body))
    }

    /// A successful subscription reply carrying `subscribe_id`.
    pub fn subscribed(subscribe_id: &str) -> Self {
        Self::from_reply(
            serde_json::json!({ "status": STATUS_OK, "subscribeId": subscribe_id }),
            Vec::new(),
        )
    }

    /// A reply with only a status code.
    pub fn with_status(status: u16) -> Self {
        Self::from_reply(serde_json::json!({ "status": status }), Vec::new())
    }

    /// Transport error, or the error implied by a retry/notify status code.
    pub fn error(&self) -> Option<PropertyExchangeError> {
        match &self.outcome {
            Outcome::Failed(error) => Some(*error),
            Outcome::Reply { .. } => match self.status() {
                Some(STATUS_RETRY) => Some(PropertyExchangeError::TooManyTransactions),
                Some(STATUS_NOTIFY) => Some(PropertyExchangeError::Notify),
                _ => None,
            },
        }
    }

    pub fn header(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Reply { header, .. } => Some(header),
            Outcome::Failed(_) => None,
        }
    }

    pub fn body(&self) -> &[u8] {
        match &self.outcome {
            Outcome::Reply { body, .. } => body,
            Outcome::Failed(_) => &[],
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.header()?
            .get("status")?
            .as_u64()
            .and_then(|status| u16::try_from(status).ok())
    }

    /// Decode the reply header, or `None` for transport errors and non-object headers.
    pub fn reply_header(&self) -> Option<ReplyHeader> {
        serde_json::from_value(self.header()?.clone()).ok()
    }
}

impl From<PropertyExchangeError> for PropertyExchangeResult {
    fn from(error: PropertyExchangeError) -> Self {
        Self::from_error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_strings() {
        for command in [
            PropertySubscriptionCommand::Start,
            PropertySubscriptionCommand::Partial,
            PropertySubscriptionCommand::Full,
            PropertySubscriptionCommand::Notify,
            PropertySubscriptionCommand::End,
        ] {
            assert_eq!(command.as_str().parse::<PropertySubscriptionCommand>().unwrap(), command);
        }
        assert!(matches!(
            "stop".parse::<PropertySubscriptionCommand>(),
            Err(Error::UnknownCommand(s)) if s == "stop"
        ));
    }

    #[test]
    fn test_start_header_json() {
        let header = PropertySubscriptionHeader::start("X-CustomProp");
        assert_eq!(
            header.to_json().unwrap(),
            r#"{"command":"start","resource":"X-CustomProp"}"#
        );
    }

    #[test]
    fn test_end_header_json() {
        let header = PropertySubscriptionHeader::end("ProgramList", "sub-1");
        assert_eq!(
            header.to_json().unwrap(),
            r#"{"command":"end","resource":"ProgramList","subscribeId":"sub-1"}"#
        );
    }

    #[test]
    fn test_header_from_json_with_res_id() {
        let header = PropertySubscriptionHeader::from_json(
            r#"{"command":"full","resource":"CHCtrlList","resId":"x1","subscribeId":"7"}"#,
        )
        .unwrap();
        assert_eq!(header.command, PropertySubscriptionCommand::Full);
        assert_eq!(header.resource_id.as_deref(), Some("x1"));
        assert_eq!(header.subscribe_id.as_deref(), Some("7"));
    }

    #[test]
    fn test_header_from_json_rejects_garbage() {
        assert!(matches!(
            PropertySubscriptionHeader::from_json("{not json"),
            Err(Error::MalformedHeader(_))
        ));
        assert!(PropertySubscriptionHeader::from_json(r#"{"command":"stop"}"#).is_err());
    }

    #[test]
    fn test_subscribed_reply() {
        let result = PropertyExchangeResult::subscribed("anId");
        assert_eq!(result.error(), None);
        assert_eq!(result.status(), Some(200));

        let header = result.reply_header().unwrap();
        assert!(header.is_success());
        assert_eq!(header.subscribe_id.as_deref(), Some("anId"));
    }

    #[test]
    fn test_status_codes_map_to_errors() {
        assert_eq!(
            PropertyExchangeResult::with_status(STATUS_RETRY).error(),
            Some(PropertyExchangeError::TooManyTransactions)
        );
        assert_eq!(
            PropertyExchangeResult::with_status(STATUS_NOTIFY).error(),
            Some(PropertyExchangeError::Notify)
        );
        assert_eq!(PropertyExchangeResult::with_status(404).error(), None);
    }

    #[test]
    fn test_transport_error_has_no_header() {
        let result = PropertyExchangeResult::from(PropertyExchangeError::Malformed);
        assert_eq!(result.error(), Some(PropertyExchangeError::Malformed));
        assert!(result.header().is_none());
        assert!(result.reply_header().is_none());
        assert!(result.body().is_empty());
    }

    #[test]
    fn test_from_header_json() {
        let result = PropertyExchangeResult::from_header_json(
            br#"{"status":200,"subscribeId":"s9","message":"ok"}"#,
            vec![1, 2, 3],
        )
        .unwrap();
        let header = result.reply_header().unwrap();
        assert_eq!(header.subscribe_id.as_deref(), Some("s9"));
        assert_eq!(header.message.as_deref(), Some("ok"));
        assert_eq!(result.body(), &[1, 2, 3]);

        assert!(PropertyExchangeResult::from_header_json(b"]", Vec::new()).is_err());
    }
}
