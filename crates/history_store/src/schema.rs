use std::path::Path;

use chat_provider::Message;
use time::OffsetDateTime;

use crate::error::HistoryStoreError;

/// One conversation read back from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredConversation {
    pub id: String,
    pub messages: Vec<Message>,
    /// Modification time of the file, which saves carry over from the first write.
    pub created_at: OffsetDateTime,
}

/// Result of a save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    SkippedEmpty,
}

// On-disk layout: a JSON array of `{"role", "content"}` objects in transcript order.
pub(crate) fn encode_messages(id: &str, messages: &[Message]) -> Result<String, HistoryStoreError> {
    let mut encoded = serde_json::to_string_pretty(messages)
        .map_err(|source| HistoryStoreError::serialize(id, source))?;
    encoded.push('\n');
    Ok(encoded)
}

pub(crate) fn decode_messages(path: &Path, raw: &str) -> Result<Vec<Message>, HistoryStoreError> {
    serde_json::from_str::<Vec<Message>>(raw).map_err(|source| HistoryStoreError::parse(path, source))
}

#[cfg(test)]
mod tests {
    use chat_provider::Role;

    use super::*;

    #[test]
    fn decode_reads_role_content_arrays() {
        let raw = r#"[
            {"role": "assistant", "content": "How can I help you today?"},
            {"role": "user", "content": "foo"}
        ]"#;
        let messages =
            decode_messages(Path::new("fixture.json"), raw).expect("fixture should decode");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[1].content, "foo");
    }

    #[test]
    fn decode_rejects_non_array_documents() {
        let error = decode_messages(Path::new("fixture.json"), r#"{"role": "user"}"#)
            .expect_err("object document must fail");
        assert!(matches!(error, HistoryStoreError::Parse { .. }));
    }

    #[test]
    fn encode_ends_with_newline() {
        let encoded =
            encode_messages("x", &[Message::user("hi")]).expect("encoding should succeed");
        assert!(encoded.ends_with("]\n"));
    }
}
