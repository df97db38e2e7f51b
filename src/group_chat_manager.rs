// group_chat_manager.rs

use crate::agent::Agent;
use crate::error::{AgentReplyError, ChatAborted, SetupError};
use crate::group_chat::GroupChat;
use crate::message::Message;
use crate::selector::{RoundRobin, SpeakerSelector};
use crate::state::{ChatState, TerminationReason};
use cli_log::{debug, info, warn};
use std::sync::Arc;

/// Drives one conversation: selects a speaker, takes its turn, appends the
/// result and checks for termination, until a terminal state is reached.
///
/// Owns the chat for the duration of the run and is the only writer of its
/// history.
pub struct GroupChatManager {
    chat: GroupChat,
    max_round: u32,
    round_count: u32,
    state: ChatState,
    selector: Box<dyn SpeakerSelector>,
    /// Extra attempts a speaker gets, within one turn, after a failed function call.
    invocation_retries: u32,
}

impl GroupChatManager {
    /// Creates a manager that stops after at most `max_round` turns.
    ///
    /// # Returns
    /// * `Err(SetupError::InvalidMaxRound)` when `max_round` is zero.
    pub fn new(chat: GroupChat, max_round: u32) -> Result<Self, SetupError> {
        if max_round == 0 {
            return Err(SetupError::InvalidMaxRound);
        }
        Ok(Self {
            chat,
            max_round,
            round_count: 0,
            state: ChatState::Running,
            selector: Box::new(RoundRobin::new()),
            invocation_retries: 0,
        })
    }

    pub fn with_selector(mut self, selector: impl SpeakerSelector + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    pub fn with_invocation_retries(mut self, retries: u32) -> Self {
        self.invocation_retries = retries;
        self
    }

    pub fn chat(&self) -> &GroupChat {
        &self.chat
    }

    pub fn history(&self) -> &[Message] {
        self.chat.history()
    }

    pub fn round_count(&self) -> u32 {
        self.round_count
    }

    pub fn max_round(&self) -> u32 {
        self.max_round
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn into_chat(self) -> GroupChat {
        self.chat
    }

    /// Runs turns until the conversation terminates.
    ///
    /// An agent failing to reply aborts the run; the history up to that point
    /// stays available through [`GroupChatManager::history`].
    pub async fn run(&mut self) -> Result<TerminationReason, AgentReplyError> {
        info!(
            "group chat started with {} participants, max_round {}",
            self.chat.participants().len(),
            self.max_round
        );
        loop {
            if let ChatState::Terminated(reason) = self.step().await? {
                info!("group chat finished after {} rounds: {}", self.round_count, reason);
                return Ok(reason);
            }
        }
    }

    /// Takes exactly one turn, unless the chat has already terminated.
    pub async fn step(&mut self) -> Result<ChatState, AgentReplyError> {
        if self.state.is_terminated() {
            return Ok(self.state);
        }

        let len = self.chat.participants().len();
        let index = self.selector.select(&self.chat) % len;
        let speaker = Arc::clone(&self.chat.participants()[index]);
        let round = self.round_count + 1;
        debug!("round {}: {} speaks", round, speaker.name());

        let message = self.take_turn(&speaker, round).await?;
        self.chat.append(message);
        self.round_count = round;
        self.state = self.check_termination();
        Ok(self.state)
    }

    /// Asks `speaker` for a reply and resolves any function call it makes.
    async fn take_turn(&self, speaker: &Agent, round: u32) -> Result<Message, AgentReplyError> {
        let mut attempt = 0;
        loop {
            let reply = speaker
                .produce_reply_in(&self.chat)
                .await
                .map_err(|source| AgentReplyError {
                    agent: speaker.name().to_string(),
                    round,
                    source,
                })?;

            let Some(call) = reply.function_call.clone() else {
                return Ok(reply);
            };

            debug!("{} calls {}({})", speaker.name(), call.name, call.arguments);
            match speaker.functions().invoke(&call) {
                Ok(result) => return Ok(reply.with_function_result(result)),
                Err(e) if attempt < self.invocation_retries => {
                    attempt += 1;
                    warn!(
                        "{} failed on round {} ({}), retry {}/{}",
                        call.name, round, e, attempt, self.invocation_retries
                    );
                }
                Err(e) => {
                    warn!("{} failed on round {}: {}", call.name, round, e);
                    return Ok(reply.into_invocation_failure(&e));
                }
            }
        }
    }

    /// An explicit terminate signal wins over the round cap when both apply.
    fn check_termination(&self) -> ChatState {
        let terminated = self
            .chat
            .history()
            .last()
            .is_some_and(Message::is_terminate);
        if terminated {
            ChatState::Terminated(TerminationReason::ExplicitTerminate)
        } else if self.round_count >= self.max_round {
            ChatState::Terminated(TerminationReason::RoundLimitReached)
        } else {
            ChatState::Running
        }
    }

    /// Wraps a reply failure together with the history recorded so far.
    pub(crate) fn abort(self, error: AgentReplyError) -> ChatAborted {
        let round_count = self.round_count;
        ChatAborted {
            error,
            history: self.chat.into_history(),
            round_count,
        }
    }
}
