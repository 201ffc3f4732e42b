//! Turn orchestration over one active conversation.
//!
//! The controller owns the registry and the active id behind a single mutex.
//! Model calls run outside that lock on a worker thread; a per-conversation
//! claim keeps turns of the same conversation strictly sequential.
//!
//! Lock order: `in_flight` before `state`. Neither is held across a model call.

use std::collections::HashSet;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;

use history_store::{HistoryStore, SaveOutcome};
use time::OffsetDateTime;

use crate::compiler::compile;
use crate::config::SessionConfig;
use crate::error::ChatError;
use crate::instructions::{Instruction, InstructionSet};
use crate::provider::{ChatProvider, Message, ProviderProfile};
use crate::registry::{ConversationRecord, ConversationRegistry, NEW_CONVERSATION_ID};
use crate::time_separator::time_separator;
use crate::title::resolve_title;

/// Naming state of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    /// Provisional conversation under the sentinel id.
    New,
    /// Conversation with a stable, model-generated id.
    Named,
}

impl ConversationState {
    #[must_use]
    pub fn of(id: &str) -> Self {
        if id == NEW_CONVERSATION_ID {
            Self::New
        } else {
            Self::Named
        }
    }
}

/// One row of the history picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPickerEntry {
    pub id: String,
    /// Time bucket label; `None` for the active conversation and the newest entry.
    pub separator: Option<String>,
    pub active: bool,
}

struct SessionState {
    registry: ConversationRegistry,
    active_id: Option<String>,
    instruction: Instruction,
}

pub struct SessionController {
    config: SessionConfig,
    provider: RwLock<Arc<dyn ChatProvider>>,
    instructions: InstructionSet,
    store: HistoryStore,
    state: Mutex<SessionState>,
    in_flight: Mutex<HashSet<String>>,
}

impl SessionController {
    /// Creates a controller over an existing registry. No conversation is active yet.
    pub fn new(
        config: SessionConfig,
        provider: Arc<dyn ChatProvider>,
        instructions: InstructionSet,
        store: HistoryStore,
        registry: ConversationRegistry,
    ) -> Result<Self, ChatError> {
        let instruction = instructions.get(&config.instruction)?;

        Ok(Self {
            config,
            provider: RwLock::new(provider),
            instructions,
            store,
            state: Mutex::new(SessionState {
                registry,
                active_id: None,
                instruction,
            }),
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    /// Loads the store into a registry and activates the provisional conversation.
    ///
    /// A provisional conversation saved by an earlier session is resumed as is;
    /// otherwise a fresh one is opened.
    pub fn start(
        config: SessionConfig,
        provider: Arc<dyn ChatProvider>,
        instructions: InstructionSet,
        store: HistoryStore,
    ) -> Result<Self, ChatError> {
        let registry = ConversationRegistry::from_stored(store.load()?);
        tracing::info!(
            root = %store.root().display(),
            conversations = registry.len(),
            "loaded conversation registry"
        );

        let controller = Self::new(config, provider, instructions, store, registry)?;
        if controller.lock_state().registry.contains(NEW_CONVERSATION_ID) {
            controller.switch_active(NEW_CONVERSATION_ID)?;
            tracing::info!("resumed provisional conversation");
        } else {
            controller.new_conversation()?;
        }
        Ok(controller)
    }

    /// Runs one turn against the active conversation and returns the reply text.
    ///
    /// `history_size` overrides [`SessionConfig::history_size`] for this turn.
    /// On failure nothing is appended.
    pub fn chat(&self, user_input: &str, history_size: Option<usize>) -> Result<String, ChatError> {
        let id = self.active_id().ok_or(ChatError::NoActiveConversation)?;
        let _claim = self.claim_turn(&id)?;

        let question = Message::user(user_input);
        let (prompt, state) = {
            let state = self.lock_state();
            let record = state.registry.get(&id)?;
            let history_size = history_size.or(self.config.history_size);
            let prompt = compile(&state.instruction, record.messages(), &question, history_size);
            (prompt, ConversationState::of(record.id()))
        };

        tracing::debug!(id = %id, prompt_messages = prompt.len(), "submitting turn");
        let answer = Message::assistant(self.call_model(prompt)?.content);
        let answer_text = answer.content.clone();

        let messages = {
            let mut state = self.lock_state();
            state
                .registry
                .append_turn(&id, question.clone(), answer)?
                .messages()
                .to_vec()
        };
        tracing::debug!(id = %id, messages = messages.len(), "turn committed");

        if self.config.auto_save {
            self.save_quietly(&id, &messages);
        }

        if state == ConversationState::New {
            self.name_conversation(&id, &question);
        }

        Ok(answer_text)
    }

    /// Opens a fresh provisional conversation and makes it active.
    pub fn new_conversation(&self) -> Result<String, ChatError> {
        let in_flight = lock_unpoisoned(&self.in_flight);
        if in_flight.contains(NEW_CONVERSATION_ID) {
            return Err(ChatError::TurnInProgress {
                id: NEW_CONVERSATION_ID.to_string(),
            });
        }

        let mut state = self.lock_state();
        state.registry.add_new_conversation();
        state.active_id = Some(NEW_CONVERSATION_ID.to_string());
        tracing::debug!("opened new conversation");
        Ok(NEW_CONVERSATION_ID.to_string())
    }

    pub fn switch_active(&self, id: &str) -> Result<(), ChatError> {
        let mut state = self.lock_state();
        state.registry.get(id)?;
        state.active_id = Some(id.to_string());
        tracing::debug!(id, "switched active conversation");
        Ok(())
    }

    pub fn save_active(&self) -> Result<SaveOutcome, ChatError> {
        let id = self.active_id().ok_or(ChatError::NoActiveConversation)?;
        self.save_conversation(&id)
    }

    pub fn save_conversation(&self, id: &str) -> Result<SaveOutcome, ChatError> {
        let messages = self.conversation(id)?.messages().to_vec();
        Ok(self.store.save(id, &messages)?)
    }

    /// Removes `id` from the registry and deletes its file.
    ///
    /// Deleting the active conversation leaves none active; the caller opens or
    /// switches to another one afterwards.
    pub fn delete_conversation(&self, id: &str) -> Result<(), ChatError> {
        {
            let in_flight = lock_unpoisoned(&self.in_flight);
            if in_flight.contains(id) {
                return Err(ChatError::TurnInProgress { id: id.to_string() });
            }

            let mut state = self.lock_state();
            if state.registry.remove(id).is_none() {
                return Err(ChatError::not_found(id));
            }
            if state.active_id.as_deref() == Some(id) {
                state.active_id = None;
            }
        }

        match self.store.delete(id) {
            Ok(()) => {}
            Err(error) if error.is_not_found() => {
                tracing::debug!(id, "deleted conversation had no history file");
            }
            Err(error) => return Err(error.into()),
        }

        tracing::info!(id, "deleted conversation");
        Ok(())
    }

    /// Selects the instruction used for subsequent turns.
    pub fn select_instruction(&self, name: &str) -> Result<(), ChatError> {
        let instruction = self.instructions.get(name)?;
        self.lock_state().instruction = instruction;
        tracing::debug!(name, "selected instruction");
        Ok(())
    }

    #[must_use]
    pub fn instruction_name(&self) -> String {
        self.lock_state().instruction.name().to_string()
    }

    #[must_use]
    pub fn active_id(&self) -> Option<String> {
        self.lock_state().active_id.clone()
    }

    /// Naming state of the active conversation.
    #[must_use]
    pub fn state(&self) -> Option<ConversationState> {
        self.active_id().map(|id| ConversationState::of(&id))
    }

    pub fn conversation(&self, id: &str) -> Result<ConversationRecord, ChatError> {
        self.lock_state().registry.get(id).cloned()
    }

    pub fn active_messages(&self) -> Result<Vec<Message>, ChatError> {
        let state = self.lock_state();
        let id = state
            .active_id
            .as_deref()
            .ok_or(ChatError::NoActiveConversation)?;
        Ok(state.registry.get(id)?.messages().to_vec())
    }

    #[must_use]
    pub fn list_ids(&self) -> Vec<String> {
        self.lock_state().registry.list_ids()
    }

    /// Recency-ordered ids with time bucket labels relative to `now`.
    #[must_use]
    pub fn history_picker(&self, now: OffsetDateTime) -> Vec<HistoryPickerEntry> {
        let state = self.lock_state();
        let active_id = state.active_id.as_deref();

        state
            .registry
            .iter()
            .enumerate()
            .map(|(position, record)| {
                let active = active_id == Some(record.id());
                let separator = if active || position == 0 {
                    None
                } else {
                    Some(time_separator(record.created_at(), now))
                };
                HistoryPickerEntry {
                    id: record.id().to_string(),
                    separator,
                    active,
                }
            })
            .collect()
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn instructions(&self) -> &InstructionSet {
        &self.instructions
    }

    #[must_use]
    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    #[must_use]
    pub fn provider_profile(&self) -> ProviderProfile {
        self.current_provider().profile()
    }

    /// Replaces the model-call collaborator. Turns already in flight finish
    /// against the provider they started with.
    pub fn set_provider(&self, provider: Arc<dyn ChatProvider>) {
        let profile = provider.profile();
        *write_unpoisoned(&self.provider) = provider;
        tracing::info!(
            provider = %profile.provider_id,
            model = %profile.model_id,
            "switched provider"
        );
    }

    fn name_conversation(&self, old_id: &str, question: &Message) -> Option<String> {
        let prompt = compile(&Instruction::title(), &[], question, Some(0));
        let reply = match self.call_model(prompt) {
            Ok(reply) => reply,
            Err(error) => {
                tracing::warn!(id = old_id, %error, "title request failed; conversation stays provisional");
                return None;
            }
        };

        let (new_id, messages, _claim) =
            self.commit_title(old_id, &reply.content, OffsetDateTime::now_utc())?;

        tracing::info!(from = old_id, to = %new_id, "named conversation");

        if self.config.auto_save {
            self.save_quietly(&new_id, &messages);
            match self.store.delete(old_id) {
                Ok(()) => {}
                Err(error) if error.is_not_found() => {}
                Err(error) => {
                    tracing::warn!(id = old_id, %error, "failed to remove provisional history file");
                }
            }
        }

        Some(new_id)
    }

    /// Renames `old_id` after the title reply and claims the new id, so the
    /// caller's save for it cannot be overtaken by a turn on the new id.
    fn commit_title(
        &self,
        old_id: &str,
        title: &str,
        now: OffsetDateTime,
    ) -> Option<(String, Vec<Message>, TurnClaim<'_>)> {
        let mut in_flight = lock_unpoisoned(&self.in_flight);
        let mut state = self.lock_state();
        if !state.registry.contains(old_id) {
            tracing::warn!(id = old_id, "conversation disappeared before it could be named");
            return None;
        }

        let new_id = resolve_title(title, now, |candidate| {
            in_flight.contains(candidate)
                || state.registry.contains(candidate)
                || self.store.exists(candidate)
        });
        state.registry.rename(old_id, &new_id);
        if state.active_id.as_deref() == Some(old_id) {
            state.active_id = Some(new_id.clone());
        }
        if self.config.keep_new_conversation {
            state.registry.add_new_conversation();
        }

        let messages = state
            .registry
            .get(&new_id)
            .map(|record| record.messages().to_vec())
            .unwrap_or_default();
        in_flight.insert(new_id.clone());

        let claim = TurnClaim {
            in_flight: &self.in_flight,
            id: new_id.clone(),
        };
        Some((new_id, messages, claim))
    }

    fn call_model(&self, prompt: Vec<Message>) -> Result<Message, ChatError> {
        let provider = self.current_provider();
        let (sender, receiver) = mpsc::channel();

        thread::Builder::new()
            .name("termchat-model-call".to_string())
            .spawn(move || {
                let _ = sender.send(provider.complete(&prompt));
            })
            .map_err(|error| ChatError::Upstream(format!("failed to spawn model call: {error}")))?;

        match receiver.recv_timeout(self.config.request_timeout) {
            Ok(result) => result.map_err(ChatError::from),
            Err(RecvTimeoutError::Timeout) => Err(ChatError::Upstream(format!(
                "model call timed out after {:.1}s",
                self.config.request_timeout.as_secs_f64()
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(ChatError::Upstream(
                "model call ended without a reply".to_string(),
            )),
        }
    }

    fn save_quietly(&self, id: &str, messages: &[Message]) {
        if let Err(error) = self.store.save(id, messages) {
            tracing::warn!(id, %error, "failed to save conversation");
        }
    }

    fn claim_turn(&self, id: &str) -> Result<TurnClaim<'_>, ChatError> {
        let mut in_flight = lock_unpoisoned(&self.in_flight);
        if !in_flight.insert(id.to_string()) {
            return Err(ChatError::TurnInProgress { id: id.to_string() });
        }

        Ok(TurnClaim {
            in_flight: &self.in_flight,
            id: id.to_string(),
        })
    }

    fn current_provider(&self) -> Arc<dyn ChatProvider> {
        Arc::clone(&read_unpoisoned(&self.provider))
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        lock_unpoisoned(&self.state)
    }
}

/// Releases a conversation's turn slot when dropped.
struct TurnClaim<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    id: String,
}

impl Drop for TurnClaim<'_> {
    fn drop(&mut self) {
        lock_unpoisoned(self.in_flight).remove(&self.id);
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn read_unpoisoned<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_unpoisoned<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
