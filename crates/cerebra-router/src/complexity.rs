//! Complexity assessment: scores input text into a coarse tier hint.

use cerebra_core::ModelTier;

const COMPLEX_INTENT_PHRASES: &[&str] = &[
    "analyze",
    "compare",
    "evaluate",
    "synthesize",
    "critique",
    "implement",
    "debug",
    "refactor",
    "architect",
    "translate",
    "summarize the following",
    "explain in detail",
    "step by step",
    "reasoning",
    "proof",
    "mathematical",
];

const TRIVIAL_WORDS: &[&str] = &["hello", "hi", "thanks", "yes", "no", "define", "list", "name"];
const TRIVIAL_PHRASES: &[&str] = &["what is"];

/// Coarse complexity bucket, mapped 1:1 to a minimum [`ModelTier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    /// Short, simple requests.
    Low,
    /// Everyday requests.
    Medium,
    /// Long or explicitly demanding requests.
    High,
}

impl Complexity {
    /// The minimum tier this complexity bucket requires.
    #[must_use]
    pub const fn minimum_tier(self) -> ModelTier {
        match self {
            Self::Low => ModelTier::Economy,
            Self::Medium => ModelTier::Standard,
            Self::High => ModelTier::Premium,
        }
    }
}

/// Score `input_text` and map it to a [`Complexity`] bucket.
///
/// The token estimate is `len(chars) / 4`. See module docs in the router
/// algorithm for the exact factor table.
#[must_use]
pub fn assess(input_text: &str, has_system_prompt: bool) -> Complexity {
    let lower = input_text.to_lowercase();
    let estimate = lower.chars().count() / 4;

    let mut score: i32 = if estimate > 4000 {
        3
    } else if estimate > 1000 {
        2
    } else {
        1
    };

    if has_system_prompt {
        score += 1;
    }

    if COMPLEX_INTENT_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        score += 1;
    }

    if estimate < 200 && is_trivial(&lower) {
        score -= 1;
    }

    match score {
        s if s <= 2 => Complexity::Low,
        s if s <= 4 => Complexity::Medium,
        _ => Complexity::High,
    }
}

fn is_trivial(lower: &str) -> bool {
    if TRIVIAL_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        return true;
    }
    let words: std::collections::HashSet<&str> =
        lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect();
    TRIVIAL_WORDS.iter().any(|word| words.contains(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_greeting_is_low() {
        assert_eq!(assess("hello", false), Complexity::Low);
    }

    #[test]
    fn complex_keyword_alone_stays_low() {
        // short text +1, keyword +1 => score 2, still low.
        assert_eq!(assess("please analyze this dataset for anomalies", false), Complexity::Low);
    }

    #[test]
    fn long_input_is_high() {
        let text = "a".repeat(20_000);
        assert_eq!(assess(&text, false), Complexity::High);
    }

    #[test]
    fn system_prompt_and_keyword_push_to_medium() {
        assert_eq!(
            assess("please implement a refactor of this step by step", true),
            Complexity::Medium
        );
    }

    #[test]
    fn trivial_word_inside_longer_word_does_not_match() {
        // "no" must not match inside "nothing" and drag the score back down.
        assert_eq!(assess("analyze nothing in detail", true), Complexity::Medium);
    }
}
