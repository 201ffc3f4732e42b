//! Session configuration passed explicitly into the controller.

use std::time::Duration;

pub const DEFAULT_INSTRUCTION_NAME: &str = "default";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Name of the instruction prepended to every prompt.
    pub instruction: String,
    /// Default history window; `None` keeps everything, `Some(0)` drops history.
    pub history_size: Option<usize>,
    /// Save the active conversation after every completed turn.
    pub auto_save: bool,
    /// Re-open a fresh "new conversation" entry after a provisional one is named.
    pub keep_new_conversation: bool,
    /// Upper bound on one model call before it is reported as an upstream error.
    pub request_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            instruction: DEFAULT_INSTRUCTION_NAME.to_string(),
            history_size: None,
            auto_save: false,
            keep_new_conversation: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    #[must_use]
    pub fn with_history_size(mut self, history_size: Option<usize>) -> Self {
        self.history_size = history_size;
        self
    }

    #[must_use]
    pub fn with_auto_save(mut self, auto_save: bool) -> Self {
        self.auto_save = auto_save;
        self
    }

    #[must_use]
    pub fn with_keep_new_conversation(mut self, keep: bool) -> Self {
        self.keep_new_conversation = keep;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
