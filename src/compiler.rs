//! Prompt assembly: `[instruction] + history window + [question]`.

use crate::instructions::Instruction;
use crate::provider::Message;

/// Builds the exact message sequence submitted to the model for one turn.
///
/// `history_size` selects the history window: `None` keeps the full history,
/// `Some(0)` drops it (single-turn mode) and `Some(n)` keeps the `n` most
/// recent messages in their original order.
#[must_use]
pub fn compile(
    instruction: &Instruction,
    history: &[Message],
    question: &Message,
    history_size: Option<usize>,
) -> Vec<Message> {
    let window = history_window(history, history_size);

    let mut messages = Vec::with_capacity(window.len() + 2);
    messages.push(instruction.to_message());
    messages.extend_from_slice(window);
    messages.push(question.clone());
    messages
}

fn history_window(history: &[Message], history_size: Option<usize>) -> &[Message] {
    match history_size {
        None => history,
        Some(size) => &history[history.len().saturating_sub(size)..],
    }
}
