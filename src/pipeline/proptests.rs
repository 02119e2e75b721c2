//! Property-based tests for the pipeline's pure parts
//!
//! - Question normalization is idempotent and always ends in `?`
//! - The context window holds exactly the most recent messages
//! - Classification and outcome parsing follow their fallback policy

use super::classifier::parse_classification;
use super::context::{build_prompt, CONTEXT_WINDOW_MESSAGES};
use super::verifier::{decide_outcome, CONFIRMATION_PHRASES};
use super::*;
use crate::conversation::{Conversation, Correction, Message};
use proptest::prelude::*;

fn default_phrases() -> Vec<String> {
    CONFIRMATION_PHRASES.iter().map(ToString::to_string).collect()
}

fn arb_history() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-zA-Z0-9 ,.]{1,30}", 0..12)
}

proptest! {
    #[test]
    fn normalize_is_idempotent(text in "\\PC{0,60}") {
        if let Some(once) = normalize_question(&text) {
            prop_assert!(once.ends_with('?'));
            prop_assert_eq!(normalize_question(&once), Some(once.clone()));
            prop_assert_eq!(once.trim(), once.as_str());
        } else {
            prop_assert!(text.trim().is_empty());
        }
    }

    #[test]
    fn context_holds_most_recent_messages(texts in arb_history(), input in "[a-z ]{1,20}\\?") {
        let mut conv = Conversation::new();
        for (i, text) in texts.iter().enumerate() {
            if i % 2 == 0 {
                conv.push_user(text.as_str());
            } else {
                conv.push_bot(text.as_str(), Correction::None);
            }
        }

        let prompt = build_prompt(&conv, &input, true);
        let keep = texts.len().min(CONTEXT_WINDOW_MESSAGES);
        let expected = texts[texts.len() - keep..].join("\n\n");

        prop_assert_eq!(
            prompt,
            format!("Previous conversation:\n{expected}\n\nCurrent question: {input}")
        );
        prop_assert_eq!(build_prompt(&conv, &input, false), input);
    }

    #[test]
    fn message_ids_strictly_increase(count in 1usize..40) {
        let mut conv = Conversation::new();
        for i in 0..count {
            match i % 3 {
                0 => { conv.push_user("q?"); }
                1 => { conv.push_bot("a", Correction::None); }
                _ => { conv.push_error("sorry"); }
            }
        }
        let ids: Vec<u64> = conv.messages().iter().map(Message::id).collect();
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn any_reply_mentioning_fact_is_fact(prefix in "[a-z ]{0,10}", suffix in "[a-z ]{0,10}") {
        let reply = format!("{prefix}fact{suffix}");
        prop_assert_eq!(parse_classification(&reply), Classification::Fact);
    }

    #[test]
    fn replies_without_fact_are_opinions(reply in "[b-df-z ]{0,30}") {
        // Alphabet excludes 'a' and 'e', so "fact" can never appear
        prop_assert_eq!(parse_classification(&reply), Classification::Opinion);
    }

    #[test]
    fn confirmation_phrase_anywhere_confirms(prefix in "[A-Za-z ]{0,20}", suffix in "[A-Za-z .]{0,20}") {
        let answer = format!("{prefix}The statement is CORRECT{suffix}");
        prop_assert_eq!(
            decide_outcome(&answer, &default_phrases()),
            VerificationOutcome::NoCorrectionNeeded
        );
    }

    #[test]
    fn other_answers_are_corrections(answer in "[0-9 ,.]{1,40}") {
        prop_assert_eq!(
            decide_outcome(&answer, &default_phrases()),
            VerificationOutcome::Correction(answer.clone())
        );
    }
}
