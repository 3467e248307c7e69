//! Token estimates for telemetry.
//!
//! These are `characters / 4` approximations, not tokenizer output. The
//! numbers feed the debug window only; nothing is enforced against them.

use crate::chat::models::ChatMessage;

const CHARS_PER_TOKEN: f64 = 4.0;

/// Character count of every message in the conversation.
pub fn conversation_chars(messages: &[ChatMessage]) -> usize {
    messages.iter().map(|m| m.content.chars().count()).sum()
}

/// Rounded `chars / 4`.
pub fn estimate_tokens(chars: usize) -> u32 {
    (chars as f64 / CHARS_PER_TOKEN).round() as u32
}

pub fn estimate_conversation_tokens(messages: &[ChatMessage]) -> u32 {
    estimate_tokens(conversation_chars(messages))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_rounds_to_nearest() {
        assert_eq!(estimate_tokens(0), 0);
        assert_eq!(estimate_tokens(1), 0);
        assert_eq!(estimate_tokens(2), 1);
        assert_eq!(estimate_tokens(4), 1);
        assert_eq!(estimate_tokens(10), 3);
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        let messages = vec![ChatMessage::user("££££")];
        assert_eq!(conversation_chars(&messages), 4);
    }

    #[test]
    fn test_doubling_content_never_decreases_estimate() {
        let mut content = String::from("What did you do at HSBC?");
        let mut previous = 0;
        for _ in 0..8 {
            let estimate = estimate_conversation_tokens(&[ChatMessage::user(content.clone())]);
            assert!(estimate >= previous);
            previous = estimate;
            content = content.repeat(2);
        }
    }

    #[test]
    fn test_sums_across_messages() {
        let messages = vec![
            ChatMessage::system("a".repeat(40)),
            ChatMessage::user("b".repeat(40)),
        ];
        assert_eq!(estimate_conversation_tokens(&messages), 20);
    }
}
