// src/extractors/section.rs

// --- Imports ---
use crate::extractors::cleaning::clean_section;
use crate::extractors::patterns::{Occurrence, PatternTable, SectionKind, SectionRule, DEFAULT_TABLE_VERSION};
use crate::utils::error::{ExtractError, StorageError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

// --- Constants ---
/// Sections shorter than this after cleaning are treated as absent.
pub const DEFAULT_MIN_SECTION_CHARS: usize = 100;

/// Separator between the three fields of a processed artifact.
pub const SECTION_DELIMITER: &str = "\n\n";

// The primary submission sits inside <TEXT>...</TEXT>; full archives may hold several.
static TEXT_BODY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<TEXT>(.*?)</TEXT>").expect("Failed to compile TEXT_BODY_RE")
});

static DEFAULT_RULES: Lazy<Vec<SectionRule>> = Lazy::new(|| {
    PatternTable::default()
        .compile()
        .expect("Default pattern table must compile")
});

// --- Data Structures ---

/// Which `<TEXT>` block counts as the filing body when there are several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPolicy {
    /// First block in the archive; the 10-K document itself precedes exhibits.
    #[default]
    First,
    /// Longest block; earliest wins a tie.
    Largest,
    Last,
}

impl FromStr for BodyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(BodyPolicy::First),
            "largest" => Ok(BodyPolicy::Largest),
            "last" => Ok(BodyPolicy::Last),
            other => Err(format!("unknown body policy '{}' (expected first, largest or last)", other)),
        }
    }
}

impl fmt::Display for BodyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BodyPolicy::First => "first",
            BodyPolicy::Largest => "largest",
            BodyPolicy::Last => "last",
        })
    }
}

/// Byte offsets of one located section inside a text body.
/// `start..header_end` is the matched header, `header_end..end` the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpan {
    pub section: SectionKind,
    pub start: usize,
    pub header_end: usize,
    pub end: usize,
}

impl SectionSpan {
    pub fn content<'a>(&self, body: &'a str) -> &'a str {
        &body[self.header_end..self.end]
    }
}

/// The cleaned output of one filing. `None` marks an absent section;
/// a present one is always at least the configured minimum length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub item1_business: Option<String>,
    pub item1a_risk_factors: Option<String>,
    pub item7_mda: Option<String>,
}

impl ProcessedDocument {
    pub fn section(&self, kind: SectionKind) -> Option<&str> {
        match kind {
            SectionKind::Business => self.item1_business.as_deref(),
            SectionKind::RiskFactors => self.item1a_risk_factors.as_deref(),
            SectionKind::Mda => self.item7_mda.as_deref(),
        }
    }

    fn slot(&mut self, kind: SectionKind) -> &mut Option<String> {
        match kind {
            SectionKind::Business => &mut self.item1_business,
            SectionKind::RiskFactors => &mut self.item1a_risk_factors,
            SectionKind::Mda => &mut self.item7_mda,
        }
    }

    pub fn is_present(&self, kind: SectionKind) -> bool {
        self.section(kind).is_some()
    }

    pub fn present_count(&self) -> usize {
        SectionKind::ALL.iter().filter(|k| self.is_present(**k)).count()
    }

    /// Three fields in document order joined by a blank line. An absent
    /// section leaves an empty field so positional splitting stays stable.
    pub fn to_artifact(&self) -> String {
        SectionKind::ALL
            .iter()
            .map(|kind| self.section(*kind).unwrap_or(""))
            .collect::<Vec<_>>()
            .join(SECTION_DELIMITER)
    }

    /// Reads an artifact written by `to_artifact`. Empty fields come back as `None`.
    pub fn from_artifact(artifact: &str) -> Result<Self, StorageError> {
        let fields: Vec<&str> = artifact.split(SECTION_DELIMITER).collect();
        if fields.len() != SectionKind::ALL.len() {
            return Err(StorageError::MalformedArtifact(format!(
                "expected {} fields, found {}",
                SectionKind::ALL.len(),
                fields.len()
            )));
        }

        let mut doc = ProcessedDocument::default();
        for (kind, field) in SectionKind::ALL.iter().zip(fields) {
            let field = field.trim();
            if !field.is_empty() {
                *doc.slot(*kind) = Some(field.to_string());
            }
        }
        Ok(doc)
    }
}

/// Finds the span of one section in `text_body`.
///
/// Start matches are collected in document order and `occurrence` picks one.
/// The section ends at the first `end` match after the chosen header, or at
/// the end of the body when there is none.
pub fn locate_section(
    text_body: &str,
    section: SectionKind,
    start: &Regex,
    end: &Regex,
    occurrence: Occurrence,
) -> Result<SectionSpan, ExtractError> {
    let starts: Vec<(usize, usize)> = start.find_iter(text_body).map(|m| (m.start(), m.end())).collect();
    if starts.is_empty() {
        return Err(ExtractError::SectionNotFound {
            section: section.to_string(),
            reason: "start header not present".to_string(),
        });
    }

    let (start_pos, header_end) = occurrence.select(&starts).ok_or_else(|| ExtractError::SectionNotFound {
        section: section.to_string(),
        reason: format!("{} requested but only {} header match(es)", occurrence, starts.len()),
    })?;

    let end_pos = end
        .find_at(text_body, header_end)
        .map(|m| m.start())
        .unwrap_or(text_body.len());

    if end_pos < header_end {
        return Err(ExtractError::SectionNotFound {
            section: section.to_string(),
            reason: format!("end {} precedes start {}", end_pos, header_end),
        });
    }

    tracing::debug!(
        "Located {} at {}..{} ({} of {} header matches)",
        section,
        start_pos,
        end_pos,
        occurrence,
        starts.len()
    );

    Ok(SectionSpan {
        section,
        start: start_pos,
        header_end,
        end: end_pos,
    })
}

// --- Main Extractor Structure ---

/// Turns one raw filing into a `ProcessedDocument`.
///
/// Holds only immutable configuration, so a single instance can be shared
/// across threads and reused for every filing in a batch.
#[derive(Debug, Clone)]
pub struct SectionExtractor {
    rules: Vec<SectionRule>,
    table_version: String,
    body_policy: BodyPolicy,
    min_section_chars: usize,
}

impl Default for SectionExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionExtractor {
    pub fn new() -> Self {
        Self {
            rules: DEFAULT_RULES.clone(),
            table_version: DEFAULT_TABLE_VERSION.to_string(),
            body_policy: BodyPolicy::default(),
            min_section_chars: DEFAULT_MIN_SECTION_CHARS,
        }
    }

    pub fn from_table(table: &PatternTable) -> Result<Self, ExtractError> {
        Ok(Self {
            rules: table.compile()?,
            table_version: table.version.clone(),
            ..Self::new()
        })
    }

    pub fn with_body_policy(mut self, policy: BodyPolicy) -> Self {
        self.body_policy = policy;
        self
    }

    pub fn with_min_section_chars(mut self, min: usize) -> Self {
        self.min_section_chars = min;
        self
    }

    pub fn rules(&self) -> &[SectionRule] {
        &self.rules
    }

    pub fn table_version(&self) -> &str {
        &self.table_version
    }

    pub fn body_policy(&self) -> BodyPolicy {
        self.body_policy
    }

    /// Returns the content of the `<TEXT>` block chosen by the body policy.
    pub fn locate_text_body<'a>(&self, raw_document: &'a str) -> Result<&'a str, ExtractError> {
        let mut bodies = TEXT_BODY_RE
            .captures_iter(raw_document)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str());

        let body = match self.body_policy {
            BodyPolicy::First => bodies.next(),
            BodyPolicy::Last => bodies.last(),
            BodyPolicy::Largest => bodies
                .enumerate()
                .max_by_key(|(idx, body)| (body.len(), Reverse(*idx)))
                .map(|(_, body)| body),
        };

        let body = body.ok_or(ExtractError::BodyNotFound)?;
        tracing::debug!("Selected {} <TEXT> body ({} bytes)", self.body_policy, body.len());
        Ok(body)
    }

    /// Span lookup using the configured rule for `section`.
    pub fn locate(&self, text_body: &str, section: SectionKind) -> Result<SectionSpan, ExtractError> {
        let rule = self
            .rules
            .iter()
            .find(|r| r.section == section)
            .ok_or_else(|| ExtractError::SectionNotFound {
                section: section.to_string(),
                reason: "no pattern configured".to_string(),
            })?;
        locate_section(text_body, section, &rule.start, &rule.end, rule.occurrence)
    }

    /// Locates and cleans one section, enforcing the minimum length.
    pub fn extract_section(&self, text_body: &str, section: SectionKind) -> Result<String, ExtractError> {
        let span = self.locate(text_body, section)?;
        tracing::trace!("Cleaning {} from {}..{}", span.section, span.start, span.end);
        let cleaned = clean_section(span.content(text_body));
        let chars = cleaned.chars().count();
        if chars < self.min_section_chars {
            return Err(ExtractError::InsufficientContent {
                section: section.to_string(),
                chars,
                min: self.min_section_chars,
            });
        }
        Ok(cleaned)
    }

    /// Full pipeline for one raw filing.
    ///
    /// Missing or too-short sections are logged and left absent. Fails only
    /// when there is no `<TEXT>` body or none of the three sections survive.
    pub fn extract(&self, raw_document: &str) -> Result<ProcessedDocument, ExtractError> {
        let body = self.locate_text_body(raw_document)?;

        let mut doc = ProcessedDocument::default();
        for section in SectionKind::ALL {
            match self.extract_section(body, section) {
                Ok(text) => {
                    tracing::debug!("Extracted {} ({} chars)", section, text.len());
                    *doc.slot(section) = Some(text);
                }
                Err(e) => tracing::warn!("Skipping section: {}", e),
            }
        }

        if doc.present_count() == 0 {
            return Err(ExtractError::NoUsableSections);
        }
        Ok(doc)
    }
}
