// message.rs
use crate::error::{InvocationError, MessageError};
use chrono::{DateTime, Utc};
use colored::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Content that ends a group chat when an agent sends it as its whole reply.
pub const TERMINATE: &str = "[GROUPCHAT_TERMINATE]";

/// Prefix of the content recorded when a function invocation fails.
pub const FUNCTION_ERROR: &str = "[FUNCTION_ERROR]";

/// Metadata flag equivalent to sending [`TERMINATE`].
pub const META_IS_TERMINATE: &str = "is_terminate";
/// Metadata flag set on messages that report a failed invocation.
pub const META_INVOCATION_ERROR: &str = "invocation_error";
/// Metadata key an admin uses to name the next speaker.
pub const META_NEXT_SPEAKER: &str = "next_speaker";

/// A request from an agent to run one of its registered functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Raw argument text, usually a JSON object.
    pub arguments: String,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// One conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn blank(from: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from: from.into(),
            content: None,
            function_call: None,
            metadata: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// A plain text message.
    pub fn text(from: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::blank(from)
        }
    }

    /// A message asking the manager to run `call` on the sender's behalf.
    pub fn function_call(from: impl Into<String>, call: FunctionCall) -> Self {
        Self {
            function_call: Some(call),
            ..Self::blank(from)
        }
    }

    /// The terminate sentinel sent by `from`.
    pub fn terminate(from: impl Into<String>) -> Self {
        Self::text(from, TERMINATE)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Checks the message invariant: a sender and at least one of
    /// content or function call.
    pub fn validate(&self) -> Result<(), MessageError> {
        if self.from.trim().is_empty() {
            return Err(MessageError::MissingSender);
        }
        if self.content.is_none() && self.function_call.is_none() {
            return Err(MessageError::Empty(self.from.clone()));
        }
        Ok(())
    }

    /// Whether this message ends the conversation.
    pub fn is_terminate(&self) -> bool {
        let by_content = self
            .content
            .as_deref()
            .is_some_and(|content| content.trim() == TERMINATE);
        let by_flag = self
            .metadata
            .get(META_IS_TERMINATE)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        by_content || by_flag
    }

    /// Whether this message reports a failed function invocation.
    pub fn is_invocation_error(&self) -> bool {
        self.metadata
            .get(META_INVOCATION_ERROR)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Name of the participant an admin asked to speak next, if any.
    pub fn next_speaker(&self) -> Option<&str> {
        self.metadata.get(META_NEXT_SPEAKER).and_then(Value::as_str)
    }

    pub fn content_contains(&self, needle: &str) -> bool {
        self.content.as_deref().is_some_and(|c| c.contains(needle))
    }

    /// Replaces the content with the result of the message's own function call.
    pub(crate) fn with_function_result(mut self, result: String) -> Self {
        self.content = Some(result);
        self
    }

    /// Turns a reply whose function call failed into the message recorded
    /// for the turn. The reply's call and metadata are kept.
    pub(crate) fn into_invocation_failure(mut self, error: &InvocationError) -> Self {
        let name = self
            .function_call
            .as_ref()
            .map(|call| call.name.as_str())
            .unwrap_or_default();
        self.content = Some(format!("{} {}: {}", FUNCTION_ERROR, name, error));
        self.with_metadata(META_INVOCATION_ERROR, true)
    }

    /// Renders the message for a terminal transcript.
    pub fn format(&self) -> String {
        let mut out = format!("{} {}\n", "Message from".dimmed(), self.from.bold().cyan());
        out.push_str("--------------------\n");
        if let Some(content) = &self.content {
            out.push_str(content);
            out.push('\n');
        }
        if let Some(call) = &self.function_call {
            out.push_str(&format!(
                "{} {}({})\n",
                "function:".yellow(),
                call.name,
                call.arguments
            ));
        }
        out.push_str("--------------------");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_message() {
        let message = Message::text("Teacher", "2 + 2 = ?");
        assert_eq!(message.from, "Teacher");
        assert_eq!(message.content.as_deref(), Some("2 + 2 = ?"));
        assert!(message.function_call.is_none());
        assert!(message.validate().is_ok());
        assert!(!message.is_terminate());
    }

    #[test]
    fn test_validate_rejects_empty_messages() {
        let mut message = Message::text("Student", "4");
        message.content = None;
        assert_eq!(
            message.validate(),
            Err(MessageError::Empty("Student".to_string()))
        );

        let anonymous = Message::text("  ", "hi");
        assert_eq!(anonymous.validate(), Err(MessageError::MissingSender));
    }

    #[test]
    fn test_function_call_only_message_is_valid() {
        let message = Message::function_call("Student", FunctionCall::new("answer_question", "{}"));
        assert!(message.validate().is_ok());
    }

    #[test]
    fn test_terminate_by_content_and_flag() {
        assert!(Message::terminate("Admin").is_terminate());
        assert!(Message::text("Admin", format!("  {}\n", TERMINATE)).is_terminate());
        assert!(!Message::text("Admin", format!("done {}", TERMINATE)).is_terminate());

        let flagged = Message::text("Admin", "bye").with_metadata(META_IS_TERMINATE, true);
        assert!(flagged.is_terminate());
    }

    #[test]
    fn test_invocation_failure_message() {
        let call = FunctionCall::new("answer", "");
        let message = Message::function_call("Student", call.clone())
            .with_metadata(META_NEXT_SPEAKER, "Teacher")
            .into_invocation_failure(&InvocationError::failed("empty answer"));
        assert!(message.is_invocation_error());
        assert_eq!(message.from, "Student");
        assert_eq!(message.next_speaker(), Some("Teacher"));
        assert_eq!(
            message.content.as_deref(),
            Some("[FUNCTION_ERROR] answer: empty answer")
        );
        assert_eq!(message.function_call, Some(call));
    }

    #[test]
    fn test_format_includes_sender_and_content() {
        let formatted = Message::text("Teacher", "Question #1").format();
        assert!(formatted.contains("Teacher"));
        assert!(formatted.contains("Question #1"));
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let message = Message::text("Admin", "welcome");
        let json = serde_json::to_value(&message).unwrap();
        assert!(json.get("function_call").is_none());
        assert!(json.get("metadata").is_none());
        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, message);
    }
}
