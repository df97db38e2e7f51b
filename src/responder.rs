// responder.rs
//
// Reply strategies: scripted, closure-backed and Ollama-backed.

use crate::agent::{ReplyContext, ReplyStrategy};
use crate::error::ReplyError;
use crate::message::{FunctionCall, Message, META_NEXT_SPEAKER};
use crate::prompt::Prompt;
use async_trait::async_trait;
use cli_log::debug;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::Ollama;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One pre-written reply of a [`ScriptedResponder`].
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedReply {
    Text(String),
    Call(FunctionCall),
    Terminate,
    /// Makes the reply computation itself fail.
    Fail(String),
}

impl ScriptedReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self::Call(FunctionCall::new(name, arguments))
    }
}

/// Replays a fixed list of replies, one per turn.
#[derive(Debug)]
pub struct ScriptedResponder {
    script: Vec<ScriptedReply>,
    cursor: AtomicUsize,
}

impl ScriptedResponder {
    pub fn new(script: Vec<ScriptedReply>) -> Self {
        Self {
            script,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Number of replies already handed out.
    pub fn replies_given(&self) -> usize {
        self.cursor.load(Ordering::SeqCst).min(self.script.len())
    }
}

#[async_trait]
impl ReplyStrategy for ScriptedResponder {
    async fn reply(&self, ctx: &ReplyContext<'_>) -> Result<Message, ReplyError> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .get(index)
            .ok_or(ReplyError::ScriptExhausted(self.script.len()))?;
        match step {
            ScriptedReply::Text(content) => Ok(Message::text(ctx.agent, content.clone())),
            ScriptedReply::Call(call) => Ok(Message::function_call(ctx.agent, call.clone())),
            ScriptedReply::Terminate => Ok(Message::terminate(ctx.agent)),
            ScriptedReply::Fail(reason) => Err(ReplyError::failed(reason.clone())),
        }
    }
}

type ReplyFn = dyn Fn(&ReplyContext<'_>) -> Result<Message, ReplyError> + Send + Sync;

/// Computes each reply with a closure over the reply context.
pub struct FnResponder {
    f: Box<ReplyFn>,
}

impl FnResponder {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ReplyContext<'_>) -> Result<Message, ReplyError> + Send + Sync + 'static,
    {
        Self { f: Box::new(f) }
    }
}

#[async_trait]
impl ReplyStrategy for FnResponder {
    async fn reply(&self, ctx: &ReplyContext<'_>) -> Result<Message, ReplyError> {
        (self.f)(ctx)
    }
}

/// Model-backed replies from a local Ollama server.
pub struct ModelResponder {
    client: Ollama,
    model: String,
}

impl ModelResponder {
    /// Uses the default Ollama endpoint (localhost:11434).
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_client(Ollama::default(), model)
    }

    pub fn with_client(client: Ollama, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Turns raw model output into a message.
    ///
    /// A JSON object, optionally inside a code fence, may carry a
    /// `function_call` (`{"name": .., "arguments": ..}`) or a `content` string,
    /// plus a `next_speaker` name. Anything else is text.
    pub fn parse_reply(agent: &str, output: &str) -> Message {
        let raw = output.trim();
        let Ok(Value::Object(reply)) = serde_json::from_str::<Value>(strip_code_fence(raw)) else {
            return Message::text(agent, raw);
        };

        let message = if let Some(call) = reply.get("function_call").and_then(parse_function_call) {
            Message::function_call(agent, call)
        } else if let Some(content) = reply.get("content").and_then(Value::as_str) {
            Message::text(agent, content)
        } else {
            Message::text(agent, raw)
        };
        match reply.get("next_speaker").and_then(Value::as_str) {
            Some(next) => message.with_metadata(META_NEXT_SPEAKER, next),
            None => message,
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_function_call(call: &Value) -> Option<FunctionCall> {
    let name = call.get("name")?.as_str()?;
    let arguments = match call.get("arguments") {
        Some(Value::String(raw)) => raw.clone(),
        Some(Value::Null) | None => "{}".to_string(),
        Some(other) => other.to_string(),
    };
    Some(FunctionCall::new(name, arguments))
}

#[async_trait]
impl ReplyStrategy for ModelResponder {
    async fn reply(&self, ctx: &ReplyContext<'_>) -> Result<Message, ReplyError> {
        let prompt = Prompt::render(ctx);
        let request = GenerationRequest::new(self.model.clone(), prompt);
        let response = self
            .client
            .generate(request)
            .await
            .map_err(|e| ReplyError::Model(e.to_string()))?;
        debug!("{} ({}) replied: {}", ctx.agent, self.model, response.response);
        Ok(Self::parse_reply(ctx.agent, &response.response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionRegistry;

    fn ctx<'a>(functions: &'a FunctionRegistry, history: &'a [Message]) -> ReplyContext<'a> {
        ReplyContext {
            agent: "Student",
            system_context: "",
            functions,
            history,
            participants: &[],
            admin: None,
        }
    }

    #[tokio::test]
    async fn test_scripted_responder_replays_in_order() {
        let functions = FunctionRegistry::new();
        let responder = ScriptedResponder::new(vec![
            ScriptedReply::text("hi"),
            ScriptedReply::call("answer_question", r#"{"answer":"2"}"#),
            ScriptedReply::Terminate,
        ]);
        let ctx = ctx(&functions, &[]);

        let first = responder.reply(&ctx).await.unwrap();
        assert_eq!(first.content.as_deref(), Some("hi"));
        let second = responder.reply(&ctx).await.unwrap();
        assert_eq!(second.function_call.unwrap().name, "answer_question");
        assert!(responder.reply(&ctx).await.unwrap().is_terminate());
        assert_eq!(responder.replies_given(), 3);

        let err = responder.reply(&ctx).await.unwrap_err();
        assert!(matches!(err, ReplyError::ScriptExhausted(3)));
        assert_eq!(responder.replies_given(), 3);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let functions = FunctionRegistry::new();
        let responder = ScriptedResponder::new(vec![ScriptedReply::Fail("offline".to_string())]);
        let err = responder.reply(&ctx(&functions, &[])).await.unwrap_err();
        assert_eq!(err.to_string(), "offline");
    }

    #[tokio::test]
    async fn test_fn_responder_reads_context() {
        let functions = FunctionRegistry::new();
        let history = vec![Message::text("Student", "a"), Message::text("Teacher", "b")];
        let responder = FnResponder::new(|ctx| {
            Ok(Message::text(ctx.agent, ctx.own_messages().count().to_string()))
        });
        let reply = responder.reply(&ctx(&functions, &history)).await.unwrap();
        assert_eq!(reply.content.as_deref(), Some("1"));
    }

    #[test]
    fn test_parse_reply_text() {
        let message = ModelResponder::parse_reply("Student", "  The answer is 4. ");
        assert_eq!(message.content.as_deref(), Some("The answer is 4."));
        assert!(message.function_call.is_none());
    }

    #[test]
    fn test_parse_reply_function_call() {
        let output = r#"{"function_call": {"name": "answer_question", "arguments": {"answer": "4"}}}"#;
        let message = ModelResponder::parse_reply("Student", output);
        let call = message.function_call.unwrap();
        assert_eq!(call.name, "answer_question");
        assert_eq!(call.arguments, r#"{"answer":"4"}"#);
        assert!(message.content.is_none());
    }

    #[test]
    fn test_parse_reply_fenced_call_with_string_arguments() {
        let output = "```json\n{\"function_call\": {\"name\": \"update_progress\", \"arguments\": \"{\\\"correct_answer_count\\\": 2}\"}}\n```";
        let call = ModelResponder::parse_reply("Admin", output).function_call.unwrap();
        assert_eq!(call.name, "update_progress");
        assert_eq!(call.arguments, r#"{"correct_answer_count": 2}"#);
    }

    #[test]
    fn test_parse_reply_json_without_call_is_text() {
        let message = ModelResponder::parse_reply("Student", r#"{"answer": 4}"#);
        assert!(message.function_call.is_none());
        assert_eq!(message.content.as_deref(), Some(r#"{"answer": 4}"#));
        assert!(message.next_speaker().is_none());
    }

    #[test]
    fn test_parse_reply_next_speaker_with_content() {
        let output = r#"{"content": "Student, your turn.", "next_speaker": "Student"}"#;
        let message = ModelResponder::parse_reply("Admin", output);
        assert_eq!(message.content.as_deref(), Some("Student, your turn."));
        assert_eq!(message.next_speaker(), Some("Student"));
    }

    #[test]
    fn test_parse_reply_next_speaker_with_function_call() {
        let output = "```json\n{\"function_call\": {\"name\": \"update_progress\", \"arguments\": {\"correct_answer_count\": 1}}, \"next_speaker\": \"Teacher\"}\n```";
        let message = ModelResponder::parse_reply("Admin", output);
        assert_eq!(message.function_call.as_ref().unwrap().name, "update_progress");
        assert_eq!(message.next_speaker(), Some("Teacher"));
    }
}
