//! Keyword Emotion Classifier (fallback tier)
//!
//! Last-resort text classifier used when the text-emotion worker is
//! unavailable. Scans the lowercased input for per-language keyword lists.
//!
//! # Rules
//! - Categories are checked in a fixed order: stress, sadness, anger, joy,
//!   fear, surprise. The first category with any matching keyword wins.
//! - Matching is substring containment, so inflections ("stressed",
//!   "worrying") match their stems.
//! - Confidence is 0.7 on a match, 0.5 (neutral) otherwise.
//! - Context: matched keywords of the winning category, then the first few
//!   content words (more than 3 characters), deduplicated in order.
//!
//! Unsupported language tags fall back to the English lists.

use crate::types::{Language, NEUTRAL};

/// Confidence reported when a keyword category matches
pub const KEYWORD_MATCH_CONFIDENCE: f64 = 0.7;

/// Confidence reported when nothing matches
pub const NO_MATCH_CONFIDENCE: f64 = 0.5;

/// Maximum number of content words appended to the context
pub const CONTEXT_WORD_LIMIT: usize = 3;

type KeywordTable = &'static [(&'static str, &'static [&'static str])];

const EN_KEYWORDS: KeywordTable = &[
    (
        "stress",
        &[
            "stress", "anxious", "anxiety", "overwhelm", "pressure", "tense", "worried",
            "worry", "nervous", "panic", "burnout",
        ],
    ),
    (
        "sadness",
        &[
            "sad", "unhappy", "depressed", "depression", "lonely", "crying", "cried",
            "hopeless", "miserable", "grief", "heartbroken", "empty inside",
        ],
    ),
    (
        "anger",
        &[
            "angry", "anger", "furious", "annoyed", "irritated", "frustrated", "hate",
            "rage", "pissed",
        ],
    ),
    (
        "joy",
        &[
            "happy", "joy", "glad", "excited", "wonderful", "delighted", "grateful",
            "thankful", "great", "amazing day",
        ],
    ),
    (
        "fear",
        &["afraid", "scared", "fear", "terrified", "frightened", "petrified"],
    ),
    (
        "surprise",
        &["surprised", "surprising", "shocked", "unexpected", "astonished", "can't believe"],
    ),
];

const UR_KEYWORDS: KeywordTable = &[
    (
        "stress",
        &[
            "پریشان", "تناؤ", "دباؤ", "فکر", "گھبراہٹ", "بے چین", "pareshan", "tension",
            "fikar", "ghabrahat",
        ],
    ),
    (
        "sadness",
        &["اداس", "غمگین", "دکھ", "رونا", "udaas", "udas", "dukhi", "gham"],
    ),
    (
        "anger",
        &["غصہ", "ناراض", "چڑچڑا", "ghussa", "gussa", "naraz"],
    ),
    (
        "joy",
        &["خوش", "خوشی", "مزہ", "khush", "khushi"],
    ),
    (
        "fear",
        &["خوف", "ڈر لگ", "ڈرا", "khauf", "dar lag"],
    ),
    (
        "surprise",
        &["حیران", "حیرت", "hairan", "hairat"],
    ),
];

/// Outcome of a keyword scan
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordMatch {
    pub emotion: String,
    pub confidence: f64,
    pub context: Vec<String>,
    /// Whether any category matched
    pub matched: bool,
}

/// Keyword classifier over fixed per-language tables
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify `text` using the keyword lists for `language`
    pub fn classify(&self, text: &str, language: Language) -> KeywordMatch {
        let lowered = text.to_lowercase();

        let hit = table(language).iter().find_map(|(category, keywords)| {
            let found: Vec<&str> = keywords
                .iter()
                .copied()
                .filter(|kw| lowered.contains(kw))
                .collect();
            (!found.is_empty()).then_some((*category, found))
        });

        let mut context: Vec<String> = Vec::new();
        let mut push_unique = |term: &str| {
            if !context.iter().any(|c| c == term) {
                context.push(term.to_string());
            }
        };

        let (emotion, confidence, matched) = match &hit {
            Some((category, found)) => {
                for kw in found {
                    push_unique(kw);
                }
                (*category, KEYWORD_MATCH_CONFIDENCE, true)
            }
            None => (NEUTRAL, NO_MATCH_CONFIDENCE, false),
        };

        for word in content_words(&lowered).take(CONTEXT_WORD_LIMIT) {
            push_unique(word);
        }

        KeywordMatch {
            emotion: emotion.to_string(),
            confidence,
            context,
            matched,
        }
    }
}

fn table(language: Language) -> KeywordTable {
    match language {
        Language::En => EN_KEYWORDS,
        Language::Ur => UR_KEYWORDS,
    }
}

/// Words longer than 3 characters, punctuation trimmed, in input order
fn content_words(lowered: &str) -> impl Iterator<Item = &str> {
    lowered
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > 3)
}
