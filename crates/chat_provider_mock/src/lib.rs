//! Deterministic mock implementation of the shared `chat_provider` contract.
//!
//! This crate contains no transport/protocol logic and is intended for local
//! development (no API tokens are spent) and for engine-level tests.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chat_provider::{ChatProvider, Message, ProviderError, ProviderProfile};

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_PROVIDER_ID: &str = "mock";

/// Model identifier reported by the mock profile.
pub const MOCK_MODEL_ID: &str = "mock-model";

/// Reply returned by [`MockProvider::default`].
pub const MOCK_REPLY: &str = "This is just a mock reply";

/// Deterministic mock provider used by tests and local runs.
#[derive(Debug)]
pub struct MockProvider {
    model: String,
    reply: String,
    delay: Option<Duration>,
    scripted_failures: Mutex<VecDeque<ProviderError>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl MockProvider {
    /// Creates a mock provider that answers every call with `reply`.
    #[must_use]
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            model: MOCK_MODEL_ID.to_string(),
            reply: reply.into(),
            delay: None,
            scripted_failures: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Reports `model` in the profile instead of [`MOCK_MODEL_ID`].
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sleeps for `delay` before answering each call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queues errors returned by the next calls, in order, before replies resume.
    #[must_use]
    pub fn with_failures(self, failures: impl IntoIterator<Item = ProviderError>) -> Self {
        lock_unpoisoned(&self.scripted_failures).extend(failures);
        self
    }

    /// Queues one more failure for a future call.
    pub fn fail_next(&self, error: ProviderError) {
        lock_unpoisoned(&self.scripted_failures).push_back(error);
    }

    /// Returns every message sequence received so far, oldest call first.
    #[must_use]
    pub fn requests(&self) -> Vec<Vec<Message>> {
        lock_unpoisoned(&self.requests).clone()
    }

    /// Returns the number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        lock_unpoisoned(&self.requests).len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(MOCK_REPLY)
    }
}

impl ChatProvider for MockProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            model_id: self.model.clone(),
        }
    }

    fn complete(&self, messages: &[Message]) -> Result<Message, ProviderError> {
        lock_unpoisoned(&self.requests).push(messages.to_vec());

        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }

        if let Some(error) = lock_unpoisoned(&self.scripted_failures).pop_front() {
            return Err(error);
        }

        Ok(Message::assistant(self.reply.clone()))
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use chat_provider::Role;

    use super::*;

    #[test]
    fn profile_exposes_explicit_mock_provider_identity() {
        let profile = MockProvider::default().profile();

        assert_eq!(profile.provider_id, MOCK_PROVIDER_ID);
        assert_eq!(profile.model_id, MOCK_MODEL_ID);
    }

    #[test]
    fn profile_reports_configured_model() {
        let profile = MockProvider::default().with_model("gpt-4o").profile();
        assert_eq!(profile.model_id, "gpt-4o");
    }

    #[test]
    fn complete_returns_fixed_assistant_reply() {
        let provider = MockProvider::default();
        let reply = provider
            .complete(&[Message::user("foo")])
            .expect("mock call should succeed");

        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, MOCK_REPLY);
    }

    #[test]
    fn complete_records_each_request_in_order() {
        let provider = MockProvider::new("ok");
        provider
            .complete(&[Message::system("sys"), Message::user("first")])
            .expect("first call should succeed");
        provider
            .complete(&[Message::user("second")])
            .expect("second call should succeed");

        let requests = provider.requests();
        assert_eq!(provider.call_count(), 2);
        assert_eq!(requests[0].len(), 2);
        assert_eq!(requests[1], vec![Message::user("second")]);
    }

    #[test]
    fn scripted_failures_are_returned_before_replies_resume() {
        let provider = MockProvider::new("ok").with_failures([ProviderError::upstream("boom")]);
        provider.fail_next(ProviderError::auth("bad key"));

        assert_eq!(
            provider.complete(&[Message::user("a")]),
            Err(ProviderError::upstream("boom"))
        );
        assert_eq!(
            provider.complete(&[Message::user("b")]),
            Err(ProviderError::auth("bad key"))
        );
        assert_eq!(
            provider.complete(&[Message::user("c")]),
            Ok(Message::assistant("ok"))
        );
    }

    #[test]
    fn delay_is_applied_before_replying() {
        let provider = MockProvider::default().with_delay(Duration::from_millis(30));
        let started = Instant::now();
        provider
            .complete(&[Message::user("slow")])
            .expect("delayed call should succeed");

        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
