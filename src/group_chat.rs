// group_chat.rs

use crate::agent::Agent;
use crate::error::SetupError;
use crate::message::Message;
use std::collections::HashSet;
use std::sync::Arc;

/// Shared state of one conversation: who takes part and what was said.
#[derive(Debug)]
pub struct GroupChat {
    /// Participants in registration order; fixed once the chat exists.
    participants: Vec<Arc<Agent>>,

    /// Participant allowed to direct speaker selection.
    admin: Option<String>,

    /// Every message so far, oldest first. Never reordered or truncated.
    history: Vec<Message>,
}

impl GroupChat {
    /// Creates a chat with the given participants.
    ///
    /// # Arguments
    /// * `participants` - Agents in speaking order. Names must be distinct.
    ///
    /// # Returns
    /// * `Err(SetupError::DuplicateParticipant)` naming the first repeated name.
    /// * `Err(SetupError::NoParticipants)` for an empty list.
    /// * `Err(SetupError::UnnamedParticipant)` if a name is blank.
    pub fn new(participants: Vec<Arc<Agent>>) -> Result<Self, SetupError> {
        if participants.is_empty() {
            return Err(SetupError::NoParticipants);
        }
        let mut seen = HashSet::new();
        for agent in &participants {
            if agent.name().trim().is_empty() {
                return Err(SetupError::UnnamedParticipant);
            }
            if !seen.insert(agent.name()) {
                return Err(SetupError::DuplicateParticipant(agent.name().to_string()));
            }
        }
        Ok(Self {
            participants,
            admin: None,
            history: Vec::new(),
        })
    }

    /// Creates a chat led by `admin`, who speaks first, followed by `members`.
    pub fn with_admin(admin: Arc<Agent>, members: Vec<Arc<Agent>>) -> Result<Self, SetupError> {
        let admin_name = admin.name().to_string();
        let mut participants = Vec::with_capacity(members.len() + 1);
        participants.push(admin);
        participants.extend(members);
        let mut chat = Self::new(participants)?;
        chat.admin = Some(admin_name);
        Ok(chat)
    }

    /// Designates an existing participant as admin.
    pub fn set_admin(&mut self, name: &str) -> Result<(), SetupError> {
        if self.participant(name).is_none() {
            return Err(SetupError::UnknownAdmin(name.to_string()));
        }
        self.admin = Some(name.to_string());
        Ok(())
    }

    pub fn admin(&self) -> Option<&str> {
        self.admin.as_deref()
    }

    pub fn participants(&self) -> &[Arc<Agent>] {
        &self.participants
    }

    pub fn participant(&self, name: &str) -> Option<&Arc<Agent>> {
        self.participants.iter().find(|agent| agent.name() == name)
    }

    /// Position of `name` in speaking order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.participants.iter().position(|agent| agent.name() == name)
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Adds an announcement or instruction before the conversation starts.
    ///
    /// Once a manager owns the chat, only the manager appends.
    pub fn add_initialize_message(&mut self, message: Message) -> Result<(), SetupError> {
        message.validate()?;
        self.history.push(message);
        Ok(())
    }

    pub(crate) fn append(&mut self, message: Message) {
        self.history.push(message);
    }

    pub fn into_history(self) -> Vec<Message> {
        self.history
    }
}
