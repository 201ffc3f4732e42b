//! File-backed persistence for named conversations.
//!
//! Each conversation lives in its own `<id>.json` file under one root
//! directory. The file's modification time, kept stable across saves, dates
//! the conversation; the record itself stores only the ordered messages.

mod error;
mod paths;
mod schema;
mod store;

pub use error::HistoryStoreError;
pub use paths::{conversation_id_from_path, history_file_name, HISTORY_FILE_EXTENSION};
pub use schema::{SaveOutcome, StoredConversation};
pub use store::HistoryStore;
