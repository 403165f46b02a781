//! Importance / read-status / category assignment.
//!
//! The dashboard's importance score, read flag, and category labels are
//! placeholders with no real semantics yet. They sit behind a trait so a
//! real scorer can slot in without touching the record shape or the
//! session code.

use rand::Rng;

/// Attributes attached to a finished record.
#[derive(Debug, Clone)]
pub struct Score {
    /// 0-100.
    pub importance: u8,
    pub read_status: bool,
    pub categories: Vec<String>,
}

/// Scores one message from its parsed header fields and preview.
pub trait ScoringStrategy: Send + Sync {
    fn score(&self, from: &str, subject: &str, preview: &str) -> Score;
}

/// Placeholder scoring: importance uniform in 0..100, read with
/// probability 0.6, every message categorized `Inbox`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomScoring;

impl ScoringStrategy for RandomScoring {
    fn score(&self, _from: &str, _subject: &str, _preview: &str) -> Score {
        let mut rng = rand::thread_rng();
        Score {
            importance: rng.gen_range(0..100),
            read_status: rng.gen_bool(0.6),
            categories: vec!["Inbox".to_string()],
        }
    }
}
