//! Conversation state and prompt compilation for a terminal chat client.
//!
//! Invariant: every compiled prompt is `[instruction] + history window + [question]`,
//! and a turn is committed to its conversation only after the model replied.
//!
//! # Public API Overview
//! - Drive turns through [`SessionController`], built from an explicit [`SessionConfig`].
//! - Keep conversations in recency order with [`ConversationRegistry`].
//! - Build prompts with [`compile`]; label history entries with [`time_separator`].
//! - Persist conversations through [`history_store::HistoryStore`].

pub mod compiler;
pub mod config;
pub mod controller;
pub mod error;
pub mod instructions;
pub mod provider;
pub mod registry;
pub mod time_separator;
pub mod title;

pub use crate::compiler::compile;
pub use crate::config::{SessionConfig, DEFAULT_INSTRUCTION_NAME, DEFAULT_REQUEST_TIMEOUT};
pub use crate::controller::{ConversationState, HistoryPickerEntry, SessionController};
pub use crate::error::ChatError;
pub use crate::instructions::{Instruction, InstructionSet};
pub use crate::provider::{ChatProvider, Message, ProviderError, ProviderProfile, Role};
pub use crate::registry::{
    ConversationRecord, ConversationRegistry, GREETING, NEW_CONVERSATION_ID,
};
pub use crate::time_separator::time_separator;
pub use crate::title::{resolve_title, sanitize_title};

pub use history_store::{HistoryStore, HistoryStoreError, SaveOutcome};
