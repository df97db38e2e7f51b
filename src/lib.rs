// lib.rs

pub mod agent;
pub mod classroom;
pub mod config;
pub mod driver;
pub mod error;
pub mod function;
pub mod group_chat;
pub mod group_chat_manager;
pub mod message;
pub mod prompt;
pub mod responder;
pub mod selector;
pub mod state;

pub use agent::{Agent, ReplyContext, ReplyStrategy};
pub use driver::{initiate_chat, ChatDriver, Transcript};
pub use error::{
    AgentReplyError, ChatAborted, ChatError, ConfigError, InvocationError, MessageError,
    ReplyError, SetupError,
};
pub use function::{Arguments, FunctionDefinition, FunctionRegistry, ParameterKind};
pub use group_chat::GroupChat;
pub use group_chat_manager::GroupChatManager;
pub use message::{FunctionCall, Message, TERMINATE};
pub use responder::{FnResponder, ModelResponder, ScriptedReply, ScriptedResponder};
pub use selector::{AdminDirected, RoundRobin, SpeakerSelector};
pub use state::{ChatState, TerminationReason};
