//! Question similarity strategies

/// Decides whether two questions ask about the same thing
pub trait SimilarityStrategy: Send + Sync {
    fn is_similar(&self, q1: &str, q2: &str) -> bool;
}

/// Marker phrases grouped by topic
const TOPIC_GROUPS: &[&[&str]] = &[
    &["what type", "which type", "what kind"],
    &["budget", "price", "cost"],
    &["use case", "how will you use", "what will you use"],
];

fn normalize(question: &str) -> String {
    question
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .to_lowercase()
}

/// Two questions are similar when they match after normalisation or both
/// mention a marker from the same topic
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordSimilarity;

impl SimilarityStrategy for KeywordSimilarity {
    fn is_similar(&self, q1: &str, q2: &str) -> bool {
        let q1 = normalize(q1);
        let q2 = normalize(q2);
        if q1 == q2 {
            return true;
        }
        TOPIC_GROUPS.iter().any(|group| {
            group.iter().any(|m| q1.contains(m)) && group.iter().any(|m| q2.contains(m))
        })
    }
}
