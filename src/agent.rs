// agent.rs
use crate::error::{InvocationError, ReplyError, SetupError};
use crate::function::{FunctionDefinition, FunctionRegistry};
use crate::group_chat::GroupChat;
use crate::message::Message;
use async_trait::async_trait;
use std::fmt;

/// What a reply strategy sees when its agent is asked to speak.
#[derive(Debug, Clone, Copy)]
pub struct ReplyContext<'a> {
    /// Name of the agent asked to speak.
    pub agent: &'a str,
    pub system_context: &'a str,
    pub functions: &'a FunctionRegistry,
    /// Full conversation so far, oldest first.
    pub history: &'a [Message],
    /// Everyone in the chat, in speaking order. Empty outside a chat.
    pub participants: &'a [&'a str],
    /// The chat's admin, if it has one.
    pub admin: Option<&'a str>,
}

impl<'a> ReplyContext<'a> {
    /// Messages sent by the speaking agent itself.
    pub fn own_messages(&self) -> impl Iterator<Item = &'a Message> + 'a {
        let agent = self.agent;
        self.history.iter().filter(move |m| m.from == agent)
    }

    pub fn last_message(&self) -> Option<&'a Message> {
        self.history.last()
    }

    pub fn function_definitions(&self) -> Vec<&'a FunctionDefinition> {
        self.functions.definitions()
    }

    /// Whether the speaking agent leads the chat.
    pub fn is_admin(&self) -> bool {
        self.admin == Some(self.agent)
    }
}

/// How an agent computes its next message.
///
/// A strategy decides what to say or which function to call; it never runs
/// the function itself.
#[async_trait]
pub trait ReplyStrategy: Send + Sync {
    async fn reply(&self, ctx: &ReplyContext<'_>) -> Result<Message, ReplyError>;
}

/// A conversational participant.
pub struct Agent {
    name: String,
    system_context: String,
    functions: FunctionRegistry,
    strategy: Box<dyn ReplyStrategy>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Creates an agent from its configuration.
    ///
    /// # Arguments
    /// * `name` - Identifier, unique within a group chat.
    /// * `system_context` - Persona instructions handed to the strategy.
    /// * `functions` - Functions the manager may run on the agent's behalf.
    /// * `strategy` - How replies are computed.
    pub fn new(
        name: impl Into<String>,
        system_context: impl Into<String>,
        functions: FunctionRegistry,
        strategy: impl ReplyStrategy + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            system_context: system_context.into(),
            functions,
            strategy: Box::new(strategy),
        }
    }

    /// An agent without functions.
    pub fn with_strategy(
        name: impl Into<String>,
        system_context: impl Into<String>,
        strategy: impl ReplyStrategy + 'static,
    ) -> Self {
        Self::new(name, system_context, FunctionRegistry::new(), strategy)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn system_context(&self) -> &str {
        &self.system_context
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn register_function<F>(
        &mut self,
        definition: FunctionDefinition,
        handler: F,
    ) -> Result<(), SetupError>
    where
        F: Fn(&str) -> Result<String, InvocationError> + Send + Sync + 'static,
    {
        self.functions.register(definition, handler)
    }

    /// Asks the agent for exactly one message given the history so far.
    ///
    /// The reply must satisfy the message invariant and be sent under the
    /// agent's own name.
    pub async fn produce_reply(&self, history: &[Message]) -> Result<Message, ReplyError> {
        self.reply_with(history, &[], None).await
    }

    /// Like [`Agent::produce_reply`], but lets the strategy see who else
    /// takes part in `chat` and who leads it.
    pub async fn produce_reply_in(&self, chat: &GroupChat) -> Result<Message, ReplyError> {
        let participants: Vec<&str> = chat.participants().iter().map(|a| a.name()).collect();
        self.reply_with(chat.history(), &participants, chat.admin()).await
    }

    async fn reply_with(
        &self,
        history: &[Message],
        participants: &[&str],
        admin: Option<&str>,
    ) -> Result<Message, ReplyError> {
        let ctx = ReplyContext {
            agent: &self.name,
            system_context: &self.system_context,
            functions: &self.functions,
            history,
            participants,
            admin,
        };
        let reply = self.strategy.reply(&ctx).await?;
        reply.validate()?;
        if reply.from != self.name {
            return Err(ReplyError::WrongSender {
                expected: self.name.clone(),
                actual: reply.from,
            });
        }
        Ok(reply)
    }
}
