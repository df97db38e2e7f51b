// selector.rs
use crate::group_chat::GroupChat;

/// Picks who speaks next.
///
/// Implementations must be deterministic for a given chat state so that
/// identical replies always produce identical conversations.
pub trait SpeakerSelector: Send {
    /// Index into `chat.participants()` of the next speaker.
    fn select(&mut self, chat: &GroupChat) -> usize;
}

impl<S: SpeakerSelector + ?Sized> SpeakerSelector for Box<S> {
    fn select(&mut self, chat: &GroupChat) -> usize {
        (**self).select(chat)
    }
}

/// Registration order, wrapping around, starting with the first participant.
#[derive(Debug, Default, Clone)]
pub struct RoundRobin {
    next: usize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue the rotation right after `index`.
    fn resume_after(&mut self, index: usize, len: usize) {
        self.next = (index + 1) % len;
    }
}

impl SpeakerSelector for RoundRobin {
    fn select(&mut self, chat: &GroupChat) -> usize {
        let len = chat.participants().len();
        let index = self.next % len;
        self.resume_after(index, len);
        index
    }
}

/// Lets the chat's admin name the next speaker.
///
/// When the latest message comes from the admin and carries a
/// `next_speaker` naming a participant, that participant speaks and the
/// rotation resumes after them. Otherwise falls back to round-robin.
#[derive(Debug, Default, Clone)]
pub struct AdminDirected {
    rotation: RoundRobin,
}

impl AdminDirected {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpeakerSelector for AdminDirected {
    fn select(&mut self, chat: &GroupChat) -> usize {
        let directed = chat.admin().and_then(|admin| {
            let last = chat.history().last()?;
            if last.from != admin {
                return None;
            }
            chat.position(last.next_speaker()?)
        });
        match directed {
            Some(index) => {
                self.rotation.resume_after(index, chat.participants().len());
                index
            }
            None => self.rotation.select(chat),
        }
    }
}
