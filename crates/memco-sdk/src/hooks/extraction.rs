//! Knowledge extraction from transcripts and task summaries.
//!
//! Splits text into paragraphs and bullet items and classifies each one by
//! keywords: how-to material becomes PROCEDURAL, facts, conventions and
//! decisions become SEMANTIC, everything else is ignored. Candidates still
//! go through the storage review, so the classifier can afford to be generous.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use memco_core::{MemoryType, ValidationError};

use crate::error::Result;

/// A candidate entry produced by extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeCandidate {
    pub memory_type: MemoryType,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

/// Turns free text into storage candidates.
pub trait KnowledgeExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Vec<KnowledgeCandidate>;
}

/// Configuration for heuristic extraction.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Maximum candidates returned per text.
    pub max_candidates: usize,
    /// Segments shorter than this are ignored.
    pub min_content_length: usize,
    /// Segments longer than this are cut.
    pub max_content_length: usize,
    /// Title length limit in characters.
    pub max_title_length: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_candidates: 10,
            min_content_length: 20,
            max_content_length: 2000,
            max_title_length: 80,
        }
    }
}

/// Keywords that suggest each type.
struct ExtractionKeywords {
    procedural: Vec<&'static str>,
    semantic: Vec<&'static str>,
}

impl Default for ExtractionKeywords {
    fn default() -> Self {
        Self {
            procedural: vec![
                "how to", "step", "run ", "to fix", "to build", "to deploy", "to install",
                "first,", "then ", "finally", "command", "execute", "cargo ", "npm ", "git ",
                "make ", "docker ", "```",
            ],
            semantic: vec![
                "always", "never", "convention", "decided", "decision", "prefer", "must",
                "uses", "is configured", "requires", "learned", "gotcha", "important",
                "note:", "because", "the reason", "avoid", "don't", "do not",
            ],
        }
    }
}

/// Keyword-based extractor.
#[derive(Default)]
pub struct HeuristicExtractor {
    config: ExtractionConfig,
    keywords: ExtractionKeywords,
}

impl HeuristicExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            config,
            keywords: ExtractionKeywords::default(),
        }
    }

    fn classify(&self, segment: &str) -> Option<MemoryType> {
        let lower = segment.to_lowercase();
        let procedural = self.keywords.procedural.iter().filter(|k| lower.contains(*k)).count();
        let semantic = self.keywords.semantic.iter().filter(|k| lower.contains(*k)).count();
        let numbered = segment
            .lines()
            .filter(|line| is_numbered_item(line.trim_start()))
            .count();

        let procedural = procedural + numbered;
        if procedural == 0 && semantic == 0 {
            None
        } else if procedural >= semantic {
            Some(MemoryType::Procedural)
        } else {
            Some(MemoryType::Semantic)
        }
    }

    fn title_for(&self, segment: &str) -> String {
        let first = segment.lines().next().unwrap_or_default();
        let first = first
            .trim()
            .trim_start_matches(['#', '-', '*', '>', ' '])
            .trim();
        truncate_chars(first, self.config.max_title_length)
    }
}

impl KnowledgeExtractor for HeuristicExtractor {
    fn extract(&self, text: &str) -> Vec<KnowledgeCandidate> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for segment in segments(text) {
            if candidates.len() >= self.config.max_candidates {
                break;
            }
            if segment.chars().count() < self.config.min_content_length {
                continue;
            }
            let Some(memory_type) = self.classify(&segment) else {
                continue;
            };
            if !seen.insert(segment.to_lowercase()) {
                continue;
            }

            candidates.push(KnowledgeCandidate {
                memory_type,
                title: self.title_for(&segment),
                content: truncate_chars(&segment, self.config.max_content_length),
                tags: vec!["extracted".into(), memory_type.as_str().into()],
            });
        }

        candidates
    }
}

/// Paragraphs, with top-level bullet items split into their own segments.
fn segments(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        let lines: Vec<&str> = paragraph.lines().collect();
        let all_bullets = lines.len() > 1
            && lines
                .iter()
                .all(|line| matches!(line.trim_start().chars().next(), Some('-' | '*')));
        if all_bullets {
            out.extend(
                lines
                    .iter()
                    .map(|line| line.trim_start().trim_start_matches(['-', '*']).trim().to_string()),
            );
        } else {
            out.push(paragraph.to_string());
        }
    }
    out
}

fn is_numbered_item(line: &str) -> bool {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && matches!(line[digits..].chars().next(), Some('.' | ')'))
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transcript Sources
// ─────────────────────────────────────────────────────────────────────────────

/// Where session transcripts come from.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Load the transcript for a session, `None` if there is none.
    async fn load(&self, session_id: &str) -> Result<Option<String>>;
}

/// No transcripts available.
pub struct NoTranscripts;

#[async_trait]
impl TranscriptSource for NoTranscripts {
    async fn load(&self, _session_id: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Transcripts stored as `<dir>/<session_id>.{md,txt,jsonl}`.
pub struct FileTranscripts {
    dir: PathBuf,
}

impl FileTranscripts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl TranscriptSource for FileTranscripts {
    async fn load(&self, session_id: &str) -> Result<Option<String>> {
        if session_id.is_empty()
            || session_id.contains(['/', '\\'])
            || session_id.contains("..")
        {
            return Err(ValidationError::InvalidFormat(format!("session id '{session_id}'")).into());
        }

        for ext in ["md", "txt", "jsonl"] {
            let path = self.dir.join(format!("{session_id}.{ext}"));
            let raw = match tokio::fs::read_to_string(&path).await {
                Ok(raw) => raw,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            let text = if ext == "jsonl" { jsonl_text(&raw) } else { raw };
            return Ok(Some(text));
        }
        Ok(None)
    }
}

/// Text of a JSONL transcript: each line's `content` or `text` field.
fn jsonl_text(raw: &str) -> String {
    raw.lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .filter_map(|value| {
            let message = value.get("message").unwrap_or(&value);
            message
                .get("content")
                .or_else(|| message.get("text"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
