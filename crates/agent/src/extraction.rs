//! Field extraction from visitor messages
//!
//! The stage engine never parses text itself; it asks an [`Extractor`].
//! `KeywordExtractor` is the heuristic used today: fixed word lists,
//! substring matching and a couple of regexes. A model-backed classifier
//! can replace it without touching the engine.

use once_cell::sync::Lazy;
use regex::Regex;

use lead_agent_core::UserNeed;
use lead_agent_tools::extract_contact_info;

static DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());
static HEADCOUNT_MENTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\d+)\s*(?:people|persons|person|guests|employees|attendees|staff|folks|ppl|pax|heads)\b",
    )
    .unwrap()
});

/// Pulls structured fields out of free text
pub trait Extractor: Send + Sync {
    /// Kind of catering need; never fails, defaults to exploring
    fn need_type(&self, text: &str) -> UserNeed;

    /// Whether the visitor agreed to continue
    fn is_affirmative(&self, text: &str) -> bool;

    /// Headcount from a direct answer to "how many people"
    fn headcount(&self, text: &str) -> Option<u32>;

    /// Headcount mentioned in passing ("lunch for 30 people")
    fn headcount_mention(&self, text: &str) -> Option<u32>;

    /// Email address given in answer to "what's your email"
    fn email(&self, text: &str) -> Option<String>;

    fn phone(&self, text: &str) -> Option<String>;

    /// Entries of `vocabulary` named in the text, in vocabulary order
    fn tags(&self, text: &str, vocabulary: &[String]) -> Vec<String>;
}

/// Word-list and regex heuristics
#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    one_time_words: Vec<String>,
    recurring_words: Vec<String>,
    affirmative_words: Vec<String>,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self {
            one_time_words: words(&["meeting", "event", "one-time", "once"]),
            recurring_words: words(&["recurring", "daily", "weekly", "program", "regular"]),
            affirmative_words: words(&["yes", "sure", "please"]),
        }
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

fn contains_any(text: &str, words: &[String]) -> bool {
    words.iter().any(|w| text.contains(w.as_str()))
}

fn positive(digits: &str) -> Option<u32> {
    digits.parse::<u32>().ok().filter(|n| *n > 0)
}

impl KeywordExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_affirmative_words(mut self, words: &[&str]) -> Self {
        self.affirmative_words = self::words(words);
        self
    }
}

impl Extractor for KeywordExtractor {
    fn need_type(&self, text: &str) -> UserNeed {
        let text = text.to_lowercase();
        // One-time words are checked first: "weekly meeting" is one-time
        if contains_any(&text, &self.one_time_words) {
            UserNeed::OneTime
        } else if contains_any(&text, &self.recurring_words) {
            UserNeed::Recurring
        } else {
            UserNeed::Exploring
        }
    }

    fn is_affirmative(&self, text: &str) -> bool {
        contains_any(&text.to_lowercase(), &self.affirmative_words)
    }

    fn headcount(&self, text: &str) -> Option<u32> {
        DIGITS_RE.find(text).and_then(|m| m.as_str().parse::<u32>().ok())
    }

    fn headcount_mention(&self, text: &str) -> Option<u32> {
        HEADCOUNT_MENTION_RE
            .captures(text)
            .and_then(|c| positive(&c[1]))
    }

    fn email(&self, text: &str) -> Option<String> {
        if let Some(email) = extract_contact_info(text).email {
            return Some(email);
        }
        let raw = text.trim();
        (!raw.is_empty()).then(|| raw.to_string())
    }

    fn phone(&self, text: &str) -> Option<String> {
        extract_contact_info(text).phone
    }

    fn tags(&self, text: &str, vocabulary: &[String]) -> Vec<String> {
        let text = text.to_lowercase();
        vocabulary
            .iter()
            .filter(|tag| {
                let tag = tag.trim().to_lowercase();
                !tag.is_empty() && text.contains(&tag)
            })
            .cloned()
            .collect()
    }
}
