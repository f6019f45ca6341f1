//! Built-in heuristic scoring capabilities.
//!
//! These run locally and answer in microseconds, so a coordinator always has a
//! working capability pool even when no remote scorers are configured. Each
//! one looks at a different feature of the content so their scores are not
//! simply copies of each other.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use memco_core::{MemoryType, MAX_IMPORTANCE, MIN_IMPORTANCE};

use super::capability::{CapabilityScore, Classification, ScoringCapability, ScoringRequest};
use crate::error::CapabilityError;

/// Words too common to signal relevance.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "are", "was", "were", "you", "your",
    "have", "has", "had", "but", "not", "into", "about", "what", "when", "where", "which", "will",
    "would", "there", "their", "then", "than", "them", "they", "can", "our", "out", "all", "any",
    "how", "its", "also", "should", "could", "does", "did", "just", "some", "more", "very",
];

/// Phrases that mark content as durable knowledge.
const STRONG_SIGNALS: &[&str] = &[
    "always", "never", "must", "important", "gotcha", "caveat", "warning", "decided",
    "decision", "convention", "requires", "breaks", "root cause", "workaround", "fixed",
    "don't", "do not", "prefer",
];

/// Phrases that mark content as chatter.
const NOISE_SIGNALS: &[&str] = &[
    "maybe", "probably", "i think", "hmm", "lol", "thanks", "thank you", "ok ", "okay",
    "trying", "not sure",
];

/// Markers of concrete, technical content.
const CODE_MARKERS: &[&str] = &["`", "::", "->", "--", "()", "=", "/", "$ "];

/// Significant terms of a text: lowercase words of three or more characters.
pub fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
        .map(|word| word.trim_matches('-').to_lowercase())
        .filter(|word| word.chars().count() >= 3 && !STOPWORDS.contains(&word.as_str()))
        .collect()
}

/// Share of the context's terms that also occur in the content, in [0, 1].
pub fn term_overlap(context: &str, content: &str) -> f64 {
    let wanted = terms(context);
    if wanted.is_empty() {
        return 0.0;
    }
    let have = terms(content);
    let hits = wanted.iter().filter(|term| have.contains(*term)).count();
    hits as f64 / wanted.len() as f64
}

fn clamp_score(raw: i32) -> u8 {
    raw.clamp(MIN_IMPORTANCE as i32, MAX_IMPORTANCE as i32) as u8
}

/// Map an overlap ratio onto the 1..=10 scale and apply a bias.
fn overlap_score(overlap: f64, bias: i32) -> u8 {
    clamp_score(1 + (overlap * 9.0).round() as i32 + bias)
}

fn count_matches(haystack: &str, needles: &[&str]) -> i32 {
    needles.iter().filter(|needle| haystack.contains(*needle)).count() as i32
}

fn has_code(content: &str) -> bool {
    CODE_MARKERS.iter().any(|marker| content.contains(marker))
}

// ─────────────────────────────────────────────────────────────────────────────
// Specificity
// ─────────────────────────────────────────────────────────────────────────────

/// Scores concrete, detailed content above vague one-liners.
#[derive(Debug, Default)]
pub struct SpecificityScorer;

#[async_trait]
impl ScoringCapability for SpecificityScorer {
    fn id(&self) -> &str {
        "specificity"
    }

    async fn score(&self, request: &ScoringRequest) -> Result<CapabilityScore, CapabilityError> {
        let content = request.content.as_str();
        let code = has_code(content);

        match &request.classification {
            Classification::Importance { .. } => {
                let len = content.trim().chars().count();
                let distinct = terms(content).len();
                let mut raw = 3;
                if len < 15 {
                    raw -= 2;
                }
                if len >= 40 {
                    raw += 2;
                }
                if len >= 120 {
                    raw += 1;
                }
                if content.chars().any(|c| c.is_ascii_digit()) {
                    raw += 1;
                }
                if code {
                    raw += 2;
                }
                if distinct >= 8 {
                    raw += 1;
                }
                Ok(CapabilityScore::new(
                    clamp_score(raw),
                    format!("{len} chars, {distinct} distinct terms, code: {code}"),
                ))
            }
            Classification::Relevance { context, .. } => {
                let overlap = term_overlap(context, content);
                let bias = i32::from(code && overlap >= 0.5);
                Ok(CapabilityScore::new(
                    overlap_score(overlap, bias),
                    format!("{:.0}% of context terms present", overlap * 100.0),
                ))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Signal keywords
// ─────────────────────────────────────────────────────────────────────────────

/// Scores on wording that marks durable knowledge or idle chatter.
#[derive(Debug, Default)]
pub struct SignalKeywordScorer;

#[async_trait]
impl ScoringCapability for SignalKeywordScorer {
    fn id(&self) -> &str {
        "signal-keywords"
    }

    async fn score(&self, request: &ScoringRequest) -> Result<CapabilityScore, CapabilityError> {
        let lower = format!("{} ", request.content.to_lowercase());
        let strong = count_matches(&lower, STRONG_SIGNALS);
        let noise = count_matches(&lower, NOISE_SIGNALS);

        match &request.classification {
            Classification::Importance { .. } => Ok(CapabilityScore::new(
                clamp_score(4 + strong.min(4) - noise.min(3)),
                format!("{strong} strong signals, {noise} noise signals"),
            )),
            Classification::Relevance { context, .. } => {
                let overlap = term_overlap(context, &request.content);
                let bias = i32::from(strong > 0 && overlap > 0.0) - i32::from(noise > 0);
                Ok(CapabilityScore::new(
                    overlap_score(overlap, bias),
                    format!("overlap {overlap:.2}, {strong} strong signals"),
                ))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Type prior
// ─────────────────────────────────────────────────────────────────────────────

/// Scores from how valuable each memory type tends to be.
#[derive(Debug, Default)]
pub struct TypePriorScorer;

impl TypePriorScorer {
    fn prior(memory_type: MemoryType) -> i32 {
        match memory_type {
            MemoryType::Semantic | MemoryType::Procedural => 6,
            MemoryType::Prospective | MemoryType::Working => 5,
            MemoryType::Episodic => 4,
        }
    }
}

#[async_trait]
impl ScoringCapability for TypePriorScorer {
    fn id(&self) -> &str {
        "type-prior"
    }

    async fn score(&self, request: &ScoringRequest) -> Result<CapabilityScore, CapabilityError> {
        let memory_type = request.classification.memory_type();

        match &request.classification {
            Classification::Importance { .. } => {
                let len = request.content.trim().chars().count();
                let mut raw = Self::prior(memory_type);
                if len < 20 {
                    raw -= 1;
                }
                if len > 200 {
                    raw += 1;
                }
                Ok(CapabilityScore::new(
                    clamp_score(raw),
                    format!("{memory_type} prior"),
                ))
            }
            Classification::Relevance { context, .. } => {
                let overlap = term_overlap(context, &request.content);
                let bias = match memory_type {
                    MemoryType::Working => 1,
                    MemoryType::Episodic => -1,
                    _ => 0,
                };
                Ok(CapabilityScore::new(
                    overlap_score(overlap, bias),
                    format!("{memory_type} entry, overlap {overlap:.2}"),
                ))
            }
        }
    }
}

/// The three built-in capabilities.
pub fn builtin_capabilities() -> Vec<Arc<dyn ScoringCapability>> {
    vec![
        Arc::new(SpecificityScorer),
        Arc::new(SignalKeywordScorer),
        Arc::new(TypePriorScorer),
    ]
}
