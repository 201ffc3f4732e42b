use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use chat_provider::Message;
use time::OffsetDateTime;

use crate::error::HistoryStoreError;
use crate::paths::{conversation_id_from_path, history_file_name, validate_conversation_id};
use crate::schema::{decode_messages, encode_messages, SaveOutcome, StoredConversation};

/// Directory of conversation files, one `<id>.json` per conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStore {
    root: PathBuf,
}

impl HistoryStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file backing `id`, whether or not it exists yet.
    pub fn path_for(&self, id: &str) -> Result<PathBuf, HistoryStoreError> {
        validate_conversation_id(id)?;
        Ok(self.root.join(history_file_name(id)))
    }

    #[must_use]
    pub fn exists(&self, id: &str) -> bool {
        self.path_for(id).is_ok_and(|path| path.is_file())
    }

    /// Reads every conversation under the root, newest first.
    ///
    /// Unreadable or malformed files are skipped. A missing root is an empty store.
    pub fn load(&self) -> Result<Vec<StoredConversation>, HistoryStoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(source) if source.kind() == ErrorKind::NotFound => {
                tracing::debug!(root = %self.root.display(), "history directory does not exist yet");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(HistoryStoreError::io(
                    "reading history directory",
                    &self.root,
                    source,
                ));
            }
        };

        let mut conversations = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(error) => {
                    tracing::warn!(root = %self.root.display(), %error, "skipping unreadable directory entry");
                    continue;
                }
            };

            if !path.is_file() {
                continue;
            }

            let Some(id) = conversation_id_from_path(&path) else {
                tracing::debug!(path = %path.display(), "ignoring non-history file");
                continue;
            };

            match read_conversation(&path, id) {
                Ok(conversation) => conversations.push(conversation),
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "skipping unreadable history file");
                }
            }
        }

        conversations.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| left.id.cmp(&right.id))
        });

        tracing::debug!(
            root = %self.root.display(),
            count = conversations.len(),
            "loaded conversation history"
        );
        Ok(conversations)
    }

    /// Reads a single conversation by id.
    pub fn load_one(&self, id: &str) -> Result<StoredConversation, HistoryStoreError> {
        let path = self.path_for(id)?;
        if !path.is_file() {
            return Err(HistoryStoreError::NotFound {
                id: id.to_string(),
                path,
            });
        }

        read_conversation(&path, id.to_string())
    }

    /// Writes `messages` to the file named after `id`.
    ///
    /// The transcript goes to a temporary file in the same directory that is
    /// synced and then renamed over the target, so a reader sees either the
    /// old or the new transcript. The replacement keeps the modification time
    /// of the first write, which dates the conversation.
    pub fn save(&self, id: &str, messages: &[Message]) -> Result<SaveOutcome, HistoryStoreError> {
        let path = self.path_for(id)?;

        if messages.is_empty() {
            tracing::info!(id, "not saving conversation without messages");
            return Ok(SaveOutcome::SkippedEmpty);
        }

        let encoded = encode_messages(id, messages)?;

        fs::create_dir_all(&self.root).map_err(|source| {
            HistoryStoreError::io("creating history directory", &self.root, source)
        })?;

        let dated = fs::metadata(&path).and_then(|metadata| metadata.modified()).ok();
        let temp_path = self.temp_path_for(id);
        if let Err(error) = write_synced(&temp_path, encoded.as_bytes(), dated) {
            let _ = fs::remove_file(&temp_path);
            return Err(error);
        }

        if let Err(source) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(HistoryStoreError::io("replacing history file", &path, source));
        }

        tracing::debug!(id, path = %path.display(), count = messages.len(), "saved conversation");
        Ok(SaveOutcome::Written)
    }

    /// Removes the file backing `id`.
    pub fn delete(&self, id: &str) -> Result<(), HistoryStoreError> {
        let path = self.path_for(id)?;

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(id, path = %path.display(), "deleted conversation file");
                Ok(())
            }
            Err(source) if source.kind() == ErrorKind::NotFound => Err(HistoryStoreError::NotFound {
                id: id.to_string(),
                path,
            }),
            Err(source) => Err(HistoryStoreError::io(
                "removing history file",
                &path,
                source,
            )),
        }
    }
}

impl HistoryStore {
    // Dot-prefixed, so `load` never mistakes it for a conversation.
    fn temp_path_for(&self, id: &str) -> PathBuf {
        let sequence = TEMP_FILE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        self.root.join(format!(
            ".{}.{}.{sequence}.tmp",
            history_file_name(id),
            process::id()
        ))
    }
}

static TEMP_FILE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn write_synced(
    path: &Path,
    contents: &[u8],
    modified: Option<SystemTime>,
) -> Result<(), HistoryStoreError> {
    let mut file = File::create(path)
        .map_err(|source| HistoryStoreError::io("creating temporary history file", path, source))?;
    file.write_all(contents)
        .map_err(|source| HistoryStoreError::io("writing temporary history file", path, source))?;
    if let Some(modified) = modified {
        file.set_modified(modified).map_err(|source| {
            HistoryStoreError::io("dating temporary history file", path, source)
        })?;
    }
    file.sync_all()
        .map_err(|source| HistoryStoreError::io("flushing temporary history file", path, source))
}

fn read_conversation(path: &Path, id: String) -> Result<StoredConversation, HistoryStoreError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| HistoryStoreError::io("reading history file", path, source))?;
    let messages = decode_messages(path, &raw)?;
    let created_at = file_created_at(path)?;

    Ok(StoredConversation {
        id,
        messages,
        created_at,
    })
}

fn file_created_at(path: &Path) -> Result<OffsetDateTime, HistoryStoreError> {
    let modified = fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|source| HistoryStoreError::io("reading history file timestamps", path, source))?;

    Ok(OffsetDateTime::from(modified))
}
