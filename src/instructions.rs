//! Named system instructions ("bots") loaded from a directory of text files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::DEFAULT_INSTRUCTION_NAME;
use crate::error::ChatError;
use crate::provider::Message;

pub const INSTRUCTION_FILE_EXTENSION: &str = "txt";
pub const DEFAULT_INSTRUCTION_TEXT: &str =
    "You are a helpful assistant. Answer clearly and concisely.";

/// Instruction used for the internal request that names a new conversation.
pub const TITLE_INSTRUCTION_TEXT: &str = "Produce a short title, at most six words, that summarizes the user's question. Reply with the title only, without quotes or punctuation.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    name: String,
    text: String,
}

impl Instruction {
    #[must_use]
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// The internal "name this conversation" instruction.
    #[must_use]
    pub fn title() -> Self {
        Self::new("title", TITLE_INSTRUCTION_TEXT)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn to_message(&self) -> Message {
        Message::system(self.text.clone())
    }
}

/// Read-only name -> text mapping, loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionSet {
    entries: BTreeMap<String, String>,
}

impl InstructionSet {
    /// A set containing only the built-in default instruction.
    #[must_use]
    pub fn with_default() -> Self {
        let mut set = Self::default();
        set.insert(DEFAULT_INSTRUCTION_NAME, DEFAULT_INSTRUCTION_TEXT);
        set
    }

    /// Loads every `<name>.txt` file in `dir`. The built-in default is kept
    /// unless a file overrides it.
    pub fn load_dir(dir: &Path) -> Result<Self, ChatError> {
        let entries = fs::read_dir(dir)
            .map_err(|source| ChatError::io("reading instruction directory", dir, source))?;

        let mut set = Self::with_default();
        for entry in entries {
            let entry = entry
                .map_err(|source| ChatError::io("reading instruction directory", dir, source))?;
            let path = entry.path();

            if !path.is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some(INSTRUCTION_FILE_EXTENSION)
            {
                continue;
            }

            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            match fs::read_to_string(&path) {
                Ok(text) => set.insert(name, text),
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "skipping unreadable instruction file");
                }
            }
        }

        tracing::debug!(dir = %dir.display(), count = set.len(), "loaded instructions");
        Ok(set)
    }

    /// Inserts or replaces an instruction. Blank text falls back to the default text.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        let text = text.into();
        let trimmed = text.trim();
        let text = if trimmed.is_empty() {
            DEFAULT_INSTRUCTION_TEXT.to_string()
        } else {
            trimmed.to_string()
        };
        self.entries.insert(name.into(), text);
    }

    pub fn get(&self, name: &str) -> Result<Instruction, ChatError> {
        self.entries
            .get(name)
            .map(|text| Instruction::new(name, text.clone()))
            .ok_or_else(|| ChatError::UnknownInstruction {
                name: name.to_string(),
            })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Instruction names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
