// driver.rs

use crate::error::{ChatError, ConfigError};
use crate::group_chat::GroupChat;
use crate::group_chat_manager::GroupChatManager;
use crate::message::Message;
use crate::selector::{RoundRobin, SpeakerSelector};
use crate::state::TerminationReason;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// The full record of a finished conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub messages: Vec<Message>,
    pub reason: TerminationReason,
    pub round_count: u32,
    /// How many leading messages were seeded before the first turn.
    pub seed_count: usize,
}

impl Transcript {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages produced by turns, without the seeds.
    pub fn turns(&self) -> &[Message] {
        &self.messages[self.seed_count.min(self.messages.len())..]
    }

    pub fn messages_from<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Message> + 'a {
        self.messages.iter().filter(move |m| m.from == name)
    }

    /// Renders every message for a terminal.
    pub fn format(&self) -> String {
        let mut out: Vec<String> = self.messages.iter().map(Message::format).collect();
        out.push(format!("{} rounds, {}", self.round_count, self.reason));
        out.join("\n")
    }

    /// Writes the transcript as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

/// Seeds a group chat, runs it to a terminal state and hands back the transcript.
pub struct ChatDriver {
    chat: GroupChat,
    seeds: Vec<Message>,
    max_round: u32,
    selector: Box<dyn SpeakerSelector>,
    invocation_retries: u32,
}

impl ChatDriver {
    pub const DEFAULT_MAX_ROUND: u32 = 10;

    pub fn new(chat: GroupChat) -> Self {
        Self {
            chat,
            seeds: Vec::new(),
            max_round: Self::DEFAULT_MAX_ROUND,
            selector: Box::new(RoundRobin::new()),
            invocation_retries: 0,
        }
    }

    /// Appends one seed message; seeds keep the order they are given in.
    pub fn seed(mut self, message: Message) -> Self {
        self.seeds.push(message);
        self
    }

    pub fn seeds(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.seeds.extend(messages);
        self
    }

    pub fn max_round(mut self, max_round: u32) -> Self {
        self.max_round = max_round;
        self
    }

    pub fn selector(mut self, selector: impl SpeakerSelector + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    pub fn invocation_retries(mut self, retries: u32) -> Self {
        self.invocation_retries = retries;
        self
    }

    pub async fn run(self) -> Result<Transcript, ChatError> {
        let ChatDriver {
            mut chat,
            seeds,
            max_round,
            selector,
            invocation_retries,
        } = self;

        for message in seeds {
            chat.add_initialize_message(message)?;
        }
        let seed_count = chat.history().len();

        let mut manager = GroupChatManager::new(chat, max_round)?
            .with_selector(selector)
            .with_invocation_retries(invocation_retries);

        match manager.run().await {
            Ok(reason) => {
                let round_count = manager.round_count();
                Ok(Transcript {
                    messages: manager.into_chat().into_history(),
                    reason,
                    round_count,
                    seed_count,
                })
            }
            Err(e) => Err(manager.abort(e).into()),
        }
    }
}

/// Seeds `chat`, runs it for at most `max_round` turns and returns the transcript.
pub async fn initiate_chat(
    chat: GroupChat,
    seeds: Vec<Message>,
    max_round: u32,
) -> Result<Transcript, ChatError> {
    ChatDriver::new(chat).seeds(seeds).max_round(max_round).run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::error::SetupError;
    use crate::responder::{ScriptedReply, ScriptedResponder};
    use std::sync::Arc;

    fn scripted(name: &str, script: Vec<ScriptedReply>) -> Arc<Agent> {
        Arc::new(Agent::with_strategy(name, "", ScriptedResponder::new(script)))
    }

    fn seeds() -> Vec<Message> {
        vec![
            Message::text("Admin", "Welcome to the group chat! I'm admin"),
            Message::text("Student", "Hey I'm Student"),
            Message::text("Admin", "Student, please answer."),
        ]
    }

    #[tokio::test]
    async fn test_initiate_chat_returns_seeds_then_turns() {
        let chat = GroupChat::new(vec![
            scripted("Admin", vec![ScriptedReply::text("1 + 1?"), ScriptedReply::Terminate]),
            scripted("Student", vec![ScriptedReply::text("2")]),
        ])
        .unwrap();

        let transcript = initiate_chat(chat, seeds(), 50).await.unwrap();
        assert_eq!(transcript.reason, TerminationReason::ExplicitTerminate);
        assert_eq!(transcript.round_count, 3);
        assert_eq!(transcript.seed_count, 3);
        assert_eq!(transcript.len(), transcript.seed_count + transcript.round_count as usize);
        assert_eq!(
            transcript.messages[1].content.as_deref(),
            Some("Hey I'm Student")
        );
        let turns: Vec<_> = transcript.turns().iter().map(|m| m.from.as_str()).collect();
        assert_eq!(turns, vec!["Admin", "Student", "Admin"]);
        assert_eq!(transcript.messages_from("Student").count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_setup_never_starts() {
        let chat = GroupChat::new(vec![scripted("Admin", Vec::new())]).unwrap();
        let err = initiate_chat(chat, seeds(), 0).await.unwrap_err();
        assert!(matches!(err, ChatError::Setup(SetupError::InvalidMaxRound)));
        assert!(err.partial_history().is_none());
    }

    #[tokio::test]
    async fn test_aborted_run_exposes_partial_history() {
        let chat = GroupChat::new(vec![
            scripted("Admin", vec![ScriptedReply::text("1 + 1?")]),
            scripted("Student", Vec::new()),
        ])
        .unwrap();

        let err = initiate_chat(chat, seeds(), 5).await.unwrap_err();
        let ChatError::Aborted(aborted) = err else {
            panic!("expected an aborted chat");
        };
        assert_eq!(aborted.error.agent, "Student");
        assert_eq!(aborted.round_count, 1);
        assert_eq!(aborted.history.len(), 3 + 1);
    }

    #[tokio::test]
    async fn test_transcript_save_writes_json() {
        let chat = GroupChat::new(vec![scripted("Admin", vec![ScriptedReply::Terminate])]).unwrap();
        let transcript = ChatDriver::new(chat).run().await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.json");
        transcript.save(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let loaded: Transcript = serde_json::from_str(&contents).unwrap();

        assert_eq!(loaded, transcript);
        assert!(transcript.format().contains("terminated by an agent"));
    }
}
