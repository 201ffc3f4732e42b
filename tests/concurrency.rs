use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use termchat::{
    ChatError, ChatProvider, ConversationRecord, ConversationRegistry, HistoryStore,
    InstructionSet, Message, ProviderError, ProviderProfile, SessionConfig, SessionController,
    GREETING, NEW_CONVERSATION_ID,
};
use time::macros::datetime;

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Blocks every question containing "wait" until released.
#[derive(Default)]
struct GatedProvider {
    released: Mutex<bool>,
    condvar: Condvar,
    blocked: AtomicUsize,
}

impl GatedProvider {
    fn release(&self) {
        *self.released.lock().expect("gate lock should not be poisoned") = true;
        self.condvar.notify_all();
    }

    fn wait_until_blocked(&self) {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while self.blocked.load(Ordering::SeqCst) == 0 {
            assert!(Instant::now() < deadline, "provider call never started");
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl ChatProvider for GatedProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: "gated".to_string(),
            model_id: "gated-model".to_string(),
        }
    }

    fn complete(&self, messages: &[Message]) -> Result<Message, ProviderError> {
        let question = messages.last().map(|message| message.content.as_str());
        if question.is_some_and(|question| question.contains("wait")) {
            self.blocked.fetch_add(1, Ordering::SeqCst);
            let mut released = self.released.lock().expect("gate lock should not be poisoned");
            while !*released {
                released = self
                    .condvar
                    .wait(released)
                    .expect("gate lock should not be poisoned");
            }
        }
        Ok(Message::assistant("gated reply"))
    }
}

fn controller_with_existing(provider: Arc<GatedProvider>) -> (tempfile::TempDir, Arc<SessionController>) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let mut registry = ConversationRegistry::new();
    registry.insert_loaded(ConversationRecord::from_parts(
        "Existing chat",
        vec![Message::assistant(GREETING)],
        datetime!(2024-07-01 12:00 UTC),
    ));
    let controller = SessionController::new(
        SessionConfig::default(),
        provider,
        InstructionSet::with_default(),
        HistoryStore::new(dir.path()),
        registry,
    )
    .expect("controller should build");
    controller.new_conversation().expect("new conversation");
    (dir, Arc::new(controller))
}

#[test]
fn overlapping_turns_on_one_conversation_are_rejected() {
    let provider = Arc::new(GatedProvider::default());
    let (_dir, controller) = controller_with_existing(provider.clone());

    let worker = {
        let controller = Arc::clone(&controller);
        thread::spawn(move || controller.chat("please wait", None))
    };
    provider.wait_until_blocked();

    assert_matches!(
        controller.chat("impatient", None),
        Err(ChatError::TurnInProgress { id }) if id == NEW_CONVERSATION_ID
    );
    assert_matches!(
        controller.delete_conversation(NEW_CONVERSATION_ID),
        Err(ChatError::TurnInProgress { .. })
    );
    assert_matches!(
        controller.new_conversation(),
        Err(ChatError::TurnInProgress { .. })
    );

    provider.release();
    let reply = worker
        .join()
        .expect("worker should not panic")
        .expect("blocked turn should complete");
    assert_eq!(reply, "gated reply");

    let messages = controller.active_messages().expect("active conversation exists");
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1], Message::user("please wait"));
}

#[test]
fn turns_of_different_conversations_run_concurrently() {
    let provider = Arc::new(GatedProvider::default());
    let (_dir, controller) = controller_with_existing(provider.clone());

    let worker = {
        let controller = Arc::clone(&controller);
        thread::spawn(move || controller.chat("please wait", None))
    };
    provider.wait_until_blocked();

    controller
        .switch_active("Existing chat")
        .expect("existing chat is listed");
    let reply = controller
        .chat("quick question", None)
        .expect("other conversation is not blocked");
    assert_eq!(reply, "gated reply");
    assert_eq!(
        controller
            .conversation("Existing chat")
            .expect("existing chat is listed")
            .messages()
            .len(),
        3
    );

    provider.release();
    worker
        .join()
        .expect("worker should not panic")
        .expect("blocked turn should complete");

    // the renamed conversation does not steal focus from the one switched to
    assert_eq!(controller.active_id().as_deref(), Some("Existing chat"));
    assert!(controller.list_ids().contains(&"gated reply".to_string()));
}

#[test]
fn controller_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SessionController>();
}
