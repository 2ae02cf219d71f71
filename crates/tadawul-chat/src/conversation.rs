//! Conversation window trimming
//!
//! The caller owns the history; before each inference call it is capped to
//! the most recent entries and blank turns are repaired away.

use crate::models::ChatMessage;

/// Maximum number of messages sent for inference
pub const MAX_HISTORY: usize = 50;

/// Bound and sanitize a conversation before inference
///
/// Keeps the last `max_history` messages, then walks them in order. A blank
/// message is dropped and also removes the last message accepted before it.
pub fn trim_history(messages: &[ChatMessage], max_history: usize) -> Vec<ChatMessage> {
    let window = &messages[messages.len().saturating_sub(max_history)..];

    let mut kept: Vec<ChatMessage> = Vec::with_capacity(window.len());
    for message in window {
        if message.is_blank() {
            kept.pop();
        } else {
            kept.push(message.clone());
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(messages: &[ChatMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn test_blank_pops_previous() {
        let input = vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant(""),
            ChatMessage::user("bye"),
        ];
        assert_eq!(contents(&trim_history(&input, MAX_HISTORY)), ["bye"]);
    }

    #[test]
    fn test_blank_first_message() {
        let input = vec![ChatMessage::user("   "), ChatMessage::user("hello")];
        assert_eq!(contents(&trim_history(&input, MAX_HISTORY)), ["hello"]);
    }

    #[test]
    fn test_consecutive_blanks_pop_repeatedly() {
        let input = vec![
            ChatMessage::user("a"),
            ChatMessage::assistant("b"),
            ChatMessage::user("c"),
            ChatMessage::assistant(""),
            ChatMessage::user("\t"),
            ChatMessage::user("d"),
        ];
        assert_eq!(contents(&trim_history(&input, MAX_HISTORY)), ["a", "d"]);
    }

    #[test]
    fn test_window_is_suffix() {
        let input: Vec<ChatMessage> = (0..120)
            .map(|i| ChatMessage::user(format!("m{i}")))
            .collect();

        let trimmed = trim_history(&input, MAX_HISTORY);
        assert_eq!(trimmed.len(), MAX_HISTORY);
        assert_eq!(trimmed.as_slice(), &input[input.len() - MAX_HISTORY..]);
    }

    #[test]
    fn test_cap_applies_before_repair() {
        // The blank at index 0 of the window has nothing before it to pop
        let mut input = vec![ChatMessage::user("old")];
        input.push(ChatMessage::assistant(""));
        input.extend((0..3).map(|i| ChatMessage::user(format!("n{i}"))));

        assert_eq!(contents(&trim_history(&input, 4)), ["n0", "n1", "n2"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(trim_history(&[], MAX_HISTORY).is_empty());
    }

    #[test]
    fn test_no_blank_in_output() {
        let input = vec![
            ChatMessage::user(""),
            ChatMessage::user("x"),
            ChatMessage::assistant(" "),
            ChatMessage::user("y"),
            ChatMessage::assistant("z"),
        ];
        let trimmed = trim_history(&input, MAX_HISTORY);
        assert!(trimmed.iter().all(|m| !m.is_blank()));
        assert_eq!(contents(&trimmed), ["y", "z"]);
    }
}
