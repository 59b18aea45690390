// Conflict Table - semantically opposing emotion labels
//
// Labels are compared case-insensitively by substring containment in either
// direction, so "sadness" and "very sad" both count as "sad".

/// Opposing label pairs (order within a pair is irrelevant)
pub const CONFLICTING_PAIRS: &[(&str, &str)] = &[
    ("happy", "sad"),
    ("joy", "sadness"),
    ("excitement", "fear"),
    ("calm", "angry"),
    ("approval", "disapproval"),
];

/// Whether two labels form a conflicting pair
///
/// Empty labels and labels equal ignoring case never conflict.
pub fn is_conflicting_pair(text_emotion: &str, speech_emotion: &str) -> bool {
    let text = text_emotion.trim().to_lowercase();
    let speech = speech_emotion.trim().to_lowercase();

    if text.is_empty() || speech.is_empty() || text == speech {
        return false;
    }

    CONFLICTING_PAIRS.iter().any(|(a, b)| {
        (related(&text, a) && related(&speech, b)) || (related(&text, b) && related(&speech, a))
    })
}

fn related(label: &str, term: &str) -> bool {
    label.contains(term) || term.contains(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_conflict_both_directions() {
        for (a, b) in CONFLICTING_PAIRS {
            assert!(is_conflicting_pair(a, b), "{} vs {}", a, b);
            assert!(is_conflicting_pair(b, a), "{} vs {}", b, a);
        }
    }

    #[test]
    fn test_containment_and_case() {
        assert!(is_conflicting_pair("Happy", "SAD"));
        assert!(is_conflicting_pair("very happy", "sad"));
        assert!(is_conflicting_pair("joyful", "sadness"));
    }

    #[test]
    fn test_non_conflicts() {
        assert!(!is_conflicting_pair("happy", "neutral"));
        assert!(!is_conflicting_pair("sadness", "sad"));
        assert!(!is_conflicting_pair("approval", "approval"));
        assert!(!is_conflicting_pair("", "sad"));
        assert!(!is_conflicting_pair("fear", "   "));
    }
}
