use std::path::Path;

use crate::error::HistoryStoreError;

pub const HISTORY_FILE_EXTENSION: &str = "json";

#[must_use]
pub fn history_file_name(conversation_id: &str) -> String {
    format!("{conversation_id}.{HISTORY_FILE_EXTENSION}")
}

/// Derives the conversation id from a history file path, or `None` for files
/// that are not history files.
#[must_use]
pub fn conversation_id_from_path(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?;
    if extension != HISTORY_FILE_EXTENSION {
        return None;
    }

    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() || stem.starts_with('.') {
        return None;
    }

    Some(stem.to_string())
}

pub(crate) fn validate_conversation_id(id: &str) -> Result<(), HistoryStoreError> {
    let reason = if id.trim().is_empty() {
        Some("id must not be blank")
    } else if id == "." || id == ".." {
        Some("id must not be a relative path component")
    } else if id.starts_with('.') {
        Some("id must not start with '.'")
    } else if id.contains(['/', '\\', '\0']) {
        Some("id must not contain path separators")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(HistoryStoreError::InvalidId {
            id: id.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
