//! In-memory conversation registry ordered by recency.
//!
//! Records live in an arena addressed through an id -> slot map. Recency is a
//! doubly linked list threaded through the slots (most recent first), so moving
//! or dropping a record relinks its neighbours without scanning.

use std::collections::HashMap;

use history_store::StoredConversation;
use time::OffsetDateTime;

use crate::error::ChatError;
use crate::provider::{Message, Role};

/// Reserved id of the provisional, not yet named conversation.
pub const NEW_CONVERSATION_ID: &str = "new_chat";

/// Assistant message every fresh conversation starts with.
pub const GREETING: &str = "How can I help you today?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRecord {
    id: String,
    messages: Vec<Message>,
    created_at: OffsetDateTime,
}

impl ConversationRecord {
    /// A fresh record holding only the seeded greeting.
    #[must_use]
    pub fn seeded(id: impl Into<String>, created_at: OffsetDateTime) -> Self {
        Self {
            id: id.into(),
            messages: vec![Message::assistant(GREETING)],
            created_at,
        }
    }

    #[must_use]
    pub fn from_parts(
        id: impl Into<String>,
        messages: Vec<Message>,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            messages,
            created_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

}

impl From<StoredConversation> for ConversationRecord {
    fn from(stored: StoredConversation) -> Self {
        Self::from_parts(stored.id, stored.messages, stored.created_at)
    }
}

#[derive(Debug)]
struct Slot {
    record: ConversationRecord,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug, Default)]
pub struct ConversationRegistry {
    slots: Vec<Option<Slot>>,
    free_slots: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl ConversationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from store contents, keeping the store's newest-first order.
    #[must_use]
    pub fn from_stored(conversations: Vec<StoredConversation>) -> Self {
        let mut registry = Self::new();
        for conversation in conversations {
            registry.insert_loaded(conversation.into());
        }
        registry
    }

    /// Inserts a freshly seeded record under `id`, first in recency order,
    /// replacing any record with the same id.
    pub fn add_new(&mut self, id: &str) -> &ConversationRecord {
        self.add_new_at(id, OffsetDateTime::now_utc())
    }

    /// [`Self::add_new`] for the sentinel id.
    pub fn add_new_conversation(&mut self) -> &ConversationRecord {
        self.add_new(NEW_CONVERSATION_ID)
    }

    pub(crate) fn add_new_at(&mut self, id: &str, created_at: OffsetDateTime) -> &ConversationRecord {
        self.remove(id);
        let slot = self.allocate(ConversationRecord::seeded(id, created_at));
        self.index.insert(id.to_string(), slot);
        self.link_front(slot);
        self.slot(slot)
    }

    /// Appends a loaded record at the back of recency order. A record already
    /// registered under the same id is replaced in place.
    pub fn insert_loaded(&mut self, record: ConversationRecord) {
        if let Some(&slot) = self.index.get(record.id()) {
            if let Some(entry) = self.slots[slot].as_mut() {
                entry.record = record;
            }
            return;
        }

        let id = record.id().to_string();
        let slot = self.allocate(record);
        self.index.insert(id, slot);
        self.link_back(slot);
    }

    pub fn get(&self, id: &str) -> Result<&ConversationRecord, ChatError> {
        self.index
            .get(id)
            .and_then(|&slot| self.slots[slot].as_ref())
            .map(|entry| &entry.record)
            .ok_or_else(|| ChatError::not_found(id))
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Appends one turn. Both messages are appended or, when `id` is unknown, neither.
    pub fn append_turn(
        &mut self,
        id: &str,
        question: Message,
        answer: Message,
    ) -> Result<&ConversationRecord, ChatError> {
        debug_assert_eq!(question.role, Role::User);
        debug_assert_eq!(answer.role, Role::Assistant);

        let slot = *self.index.get(id).ok_or_else(|| ChatError::not_found(id))?;
        let entry = self.slots[slot]
            .as_mut()
            .ok_or_else(|| ChatError::not_found(id))?;
        entry.record.messages.push(question);
        entry.record.messages.push(answer);
        Ok(&entry.record)
    }

    /// Moves the record stored under `old_id` to `new_id`, first in recency order.
    ///
    /// Messages and creation time are preserved. Returns `false` (and changes
    /// nothing) when `old_id` is unknown; a record already stored under
    /// `new_id` is replaced.
    pub fn rename(&mut self, old_id: &str, new_id: &str) -> bool {
        let Some(slot) = self.index.remove(old_id) else {
            return false;
        };
        self.unlink(slot);

        if old_id != new_id {
            self.remove(new_id);
        }

        if let Some(entry) = self.slots[slot].as_mut() {
            entry.record.id = new_id.to_string();
        }
        self.index.insert(new_id.to_string(), slot);
        self.link_front(slot);
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<ConversationRecord> {
        let slot = self.index.remove(id)?;
        self.unlink(slot);
        self.free_slots.push(slot);
        self.slots[slot].take().map(|entry| entry.record)
    }

    /// Recency-ordered snapshot of ids, most recent first.
    #[must_use]
    pub fn list_ids(&self) -> Vec<String> {
        self.iter().map(|record| record.id.clone()).collect()
    }

    /// Records in recency order.
    pub fn iter(&self) -> impl Iterator<Item = &ConversationRecord> {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let entry = self.slots.get(cursor?)?.as_ref()?;
            cursor = entry.next;
            Some(&entry.record)
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn allocate(&mut self, record: ConversationRecord) -> usize {
        let entry = Some(Slot {
            record,
            prev: None,
            next: None,
        });
        if let Some(slot) = self.free_slots.pop() {
            self.slots[slot] = entry;
            slot
        } else {
            self.slots.push(entry);
            self.slots.len() - 1
        }
    }

    fn slot(&self, slot: usize) -> &ConversationRecord {
        self.slots[slot]
            .as_ref()
            .map(|entry| &entry.record)
            .expect("indexed registry slot must be occupied")
    }

    fn link_front(&mut self, slot: usize) {
        let old_head = self.head;
        if let Some(entry) = self.slots[slot].as_mut() {
            entry.prev = None;
            entry.next = old_head;
        }
        match old_head.and_then(|head| self.slots[head].as_mut()) {
            Some(head) => head.prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
    }

    fn link_back(&mut self, slot: usize) {
        let old_tail = self.tail;
        if let Some(entry) = self.slots[slot].as_mut() {
            entry.prev = old_tail;
            entry.next = None;
        }
        match old_tail.and_then(|tail| self.slots[tail].as_mut()) {
            Some(tail) => tail.next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
    }

    fn unlink(&mut self, slot: usize) {
        let Some((prev, next)) = self.slots[slot]
            .as_mut()
            .map(|entry| (entry.prev.take(), entry.next.take()))
        else {
            return;
        };

        match prev.and_then(|prev| self.slots[prev].as_mut()) {
            Some(entry) => entry.next = next,
            None => self.head = next,
        }
        match next.and_then(|next| self.slots[next].as_mut()) {
            Some(entry) => entry.prev = prev,
            None => self.tail = prev,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use time::macros::datetime;

    use super::*;

    fn record(id: &str) -> ConversationRecord {
        ConversationRecord::from_parts(
            id,
            vec![Message::assistant(GREETING), Message::user(format!("about {id}"))],
            datetime!(2024-07-01 12:00 UTC),
        )
    }

    #[test]
    fn add_new_places_seeded_record_first() {
        let mut registry = ConversationRegistry::new();
        registry.insert_loaded(record("older"));

        let added = registry.add_new_conversation();
        assert_eq!(added.id(), NEW_CONVERSATION_ID);
        assert_eq!(added.messages(), &[Message::assistant(GREETING)]);

        assert_eq!(registry.list_ids(), vec![NEW_CONVERSATION_ID, "older"]);
    }

    #[test]
    fn add_new_replaces_existing_record_with_same_id() {
        let mut registry = ConversationRegistry::new();
        registry.add_new_conversation();
        registry
            .append_turn(
                NEW_CONVERSATION_ID,
                Message::user("foo"),
                Message::assistant("bar"),
            )
            .expect("sentinel exists");
        registry.insert_loaded(record("older"));

        registry.add_new_conversation();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry
                .get(NEW_CONVERSATION_ID)
                .expect("sentinel exists")
                .messages()
                .len(),
            1
        );
        assert_eq!(registry.list_ids(), vec![NEW_CONVERSATION_ID, "older"]);
    }

    #[test]
    fn insert_loaded_keeps_store_order() {
        let registry = ConversationRegistry::from_stored(vec![
            StoredConversation {
                id: "newest".to_string(),
                messages: vec![Message::assistant(GREETING)],
                created_at: datetime!(2024-07-03 00:00 UTC),
            },
            StoredConversation {
                id: "oldest".to_string(),
                messages: vec![Message::assistant(GREETING)],
                created_at: datetime!(2024-07-01 00:00 UTC),
            },
        ]);

        assert_eq!(registry.list_ids(), vec!["newest", "oldest"]);
        assert_eq!(
            registry.get("oldest").expect("loaded").created_at(),
            datetime!(2024-07-01 00:00 UTC)
        );
    }

    #[test]
    fn get_reports_unknown_ids() {
        let registry = ConversationRegistry::new();
        let error = registry.get("missing").expect_err("unknown id must fail");
        assert!(matches!(error, ChatError::NotFound { id } if id == "missing"));
    }

    #[test]
    fn rename_moves_record_first_and_preserves_messages() {
        let mut registry = ConversationRegistry::new();
        registry.insert_loaded(record("a"));
        registry.insert_loaded(record("b"));
        let before = registry.get("b").expect("b exists").clone();

        assert!(registry.rename("b", "Renamed b"));

        assert_eq!(registry.list_ids(), vec!["Renamed b", "a"]);
        assert!(!registry.contains("b"));
        let renamed = registry.get("Renamed b").expect("renamed exists");
        assert_eq!(renamed.messages(), before.messages());
        assert_eq!(renamed.created_at(), before.created_at());
    }

    #[test]
    fn rename_of_unknown_id_is_a_noop() {
        let mut registry = ConversationRegistry::new();
        registry.insert_loaded(record("a"));

        assert!(!registry.rename("missing", "other"));
        assert_eq!(registry.list_ids(), vec!["a"]);
    }

    #[test]
    fn rename_onto_existing_id_replaces_target() {
        let mut registry = ConversationRegistry::new();
        registry.insert_loaded(record("a"));
        registry.insert_loaded(record("b"));

        assert!(registry.rename("b", "a"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list_ids(), vec!["a"]);
        assert_eq!(
            registry.get("a").expect("a exists").messages()[1].content,
            "about b"
        );
    }

    #[test]
    fn append_turn_requires_known_id() {
        let mut registry = ConversationRegistry::new();
        let error = registry
            .append_turn("missing", Message::user("q"), Message::assistant("a"))
            .expect_err("unknown id must fail");
        assert!(matches!(error, ChatError::NotFound { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn removed_slots_are_reused() {
        let mut registry = ConversationRegistry::new();
        registry.insert_loaded(record("a"));
        registry.insert_loaded(record("b"));

        let removed = registry.remove("a").expect("a exists");
        assert_eq!(removed.id(), "a");
        registry.add_new("c");

        assert_eq!(registry.slots.len(), 2);
        assert_eq!(registry.list_ids(), vec!["c", "b"]);
        let ids: Vec<&str> = registry.iter().map(ConversationRecord::id).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn recency_links_survive_head_middle_and_tail_updates() {
        let mut registry = ConversationRegistry::new();
        for id in ["a", "b", "c", "d"] {
            registry.insert_loaded(record(id));
        }

        assert!(registry.rename("b", "B"));
        assert_eq!(registry.list_ids(), vec!["B", "a", "c", "d"]);

        registry.remove("d");
        registry.remove("B");
        assert_eq!(registry.list_ids(), vec!["a", "c"]);

        registry.add_new("e");
        registry.insert_loaded(record("f"));
        assert!(registry.rename("f", "F"));
        assert_eq!(registry.list_ids(), vec!["F", "e", "a", "c"]);

        registry.remove("c");
        registry.insert_loaded(record("g"));
        assert_eq!(registry.list_ids(), vec!["F", "e", "a", "g"]);
        assert_eq!(registry.iter().count(), registry.len());
    }
}
