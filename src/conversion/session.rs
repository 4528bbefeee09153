//! Per-chat conversion sessions.
//!
//! A session records that a chat has sent a photo and has not picked a
//! target format yet. At most one exists per chat.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use teloxide::types::ChatId;

use super::AssetRef;

/// Per-chat dialogue state, derived from the session map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    AwaitingFormatChoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The chat already has a photo waiting for a format choice
    AlreadyPending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    Accepted,
    Rejected(RejectReason),
}

/// In-memory chat id -> pending photo map.
///
/// Backed by a sharded [`DashMap`], so events for different chats never wait
/// on one another. Process lifetime only.
#[derive(Debug, Default)]
pub struct ConversionSessions {
    pending: DashMap<ChatId, AssetRef>,
}

impl ConversionSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session unless one is already pending; an existing session is
    /// never overwritten.
    pub fn begin(&self, chat_id: ChatId, asset: AssetRef) -> BeginOutcome {
        match self.pending.entry(chat_id) {
            Entry::Occupied(_) => BeginOutcome::Rejected(RejectReason::AlreadyPending),
            Entry::Vacant(vacant) => {
                vacant.insert(asset);
                BeginOutcome::Accepted
            }
        }
    }

    /// Takes the pending asset out of the map. Exactly one of any number of
    /// concurrent callers for the same chat gets `Some`.
    pub fn resolve(&self, chat_id: ChatId) -> Option<AssetRef> {
        self.pending.remove(&chat_id).map(|(_, asset)| asset)
    }

    pub fn has_session(&self, chat_id: ChatId) -> bool {
        self.pending.contains_key(&chat_id)
    }

    /// Read-only view of the pending asset.
    pub fn pending(&self, chat_id: ChatId) -> Option<AssetRef> {
        self.pending.get(&chat_id).map(|entry| entry.value().clone())
    }

    pub fn state(&self, chat_id: ChatId) -> ChatState {
        if self.has_session(chat_id) {
            ChatState::AwaitingFormatChoice
        } else {
            ChatState::Idle
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const CHAT: ChatId = ChatId(100);

    #[test]
    fn test_begin_then_resolve() {
        let sessions = ConversionSessions::new();
        assert_eq!(sessions.state(CHAT), ChatState::Idle);

        assert_eq!(sessions.begin(CHAT, AssetRef::new("A1")), BeginOutcome::Accepted);
        assert_eq!(sessions.state(CHAT), ChatState::AwaitingFormatChoice);

        assert_eq!(sessions.resolve(CHAT), Some(AssetRef::new("A1")));
        assert_eq!(sessions.state(CHAT), ChatState::Idle);
        assert_eq!(sessions.resolve(CHAT), None);
    }

    #[test]
    fn test_second_photo_is_rejected_and_keeps_first() {
        let sessions = ConversionSessions::new();
        sessions.begin(CHAT, AssetRef::new("A1"));

        let outcome = sessions.begin(CHAT, AssetRef::new("A2"));

        assert_eq!(outcome, BeginOutcome::Rejected(RejectReason::AlreadyPending));
        assert_eq!(sessions.pending(CHAT), Some(AssetRef::new("A1")));
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn test_chats_are_independent() {
        let sessions = ConversionSessions::new();
        let other = ChatId(200);

        assert_eq!(sessions.begin(CHAT, AssetRef::new("A1")), BeginOutcome::Accepted);
        assert_eq!(sessions.begin(other, AssetRef::new("B1")), BeginOutcome::Accepted);

        assert_eq!(sessions.resolve(other), Some(AssetRef::new("B1")));
        assert!(sessions.has_session(CHAT));
        assert!(!sessions.has_session(other));
    }

    #[test]
    fn test_resolve_is_exactly_once_across_threads() {
        for round in 0..50 {
            let sessions = Arc::new(ConversionSessions::new());
            sessions.begin(CHAT, AssetRef::new(format!("A{}", round)));

            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let sessions = Arc::clone(&sessions);
                    std::thread::spawn(move || sessions.resolve(CHAT))
                })
                .collect();

            let results: Vec<Option<AssetRef>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            let winners = results.iter().filter(|r| r.is_some()).count();
            assert_eq!(winners, 1, "round {} produced {:?}", round, results);
            assert!(sessions.is_empty());
        }
    }

    #[test]
    fn test_concurrent_begin_admits_one() {
        let sessions = Arc::new(ConversionSessions::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sessions = Arc::clone(&sessions);
                std::thread::spawn(move || sessions.begin(CHAT, AssetRef::new(format!("P{}", i))))
            })
            .collect();

        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|outcome| *outcome == BeginOutcome::Accepted)
            .count();
        assert_eq!(accepted, 1);
    }
}
