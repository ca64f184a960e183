//! Prompt composition.

use crate::envelope::{ChatTurn, ContextBundle};
use std::fmt::Write;

/// Builds the generation prompt for `current` from the memory context.
///
/// Sections appear in a fixed order: relevant memories, recent conversation,
/// then the current user message. Empty sections are omitted.
///
/// # Examples
///
/// ```
/// use courier::envelope::{ChatTurn, ContextBundle};
/// use courier::orchestrator::compose_prompt;
///
/// let context = ContextBundle {
///     recent_messages: vec![ChatTurn::user("hi")],
///     relevant_memories: Vec::new(),
/// };
/// assert_eq!(
///     compose_prompt(&context, "how are you?"),
///     "Recent conversation:\n- user: hi\n\nCurrent user message:\n- user: how are you?"
/// );
/// ```
#[must_use]
pub fn compose_prompt(context: &ContextBundle, current: &str) -> String {
    let mut prompt = String::new();
    push_section(&mut prompt, "Relevant previous messages:", &context.relevant_memories);
    push_section(&mut prompt, "Recent conversation:", &context.recent_messages);
    prompt.push_str("Current user message:\n- user: ");
    prompt.push_str(current);
    prompt
}

fn push_section(prompt: &mut String, heading: &str, turns: &[ChatTurn]) {
    if turns.is_empty() {
        return;
    }
    prompt.push_str(heading);
    prompt.push('\n');
    for turn in turns {
        // Writing into a String cannot fail.
        writeln!(prompt, "- {}: {}", turn.role, turn.content).ok();
    }
    prompt.push('\n');
}
