// src/extractors/patterns.rs
//
// Section header patterns live here as data. A table maps each target
// section to its start pattern, end pattern and occurrence policy, and can
// be loaded from JSON so tuning a filer template never needs a code change.

use crate::utils::error::ExtractError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placeholder usable inside table patterns for "any run of whitespace or
/// non-breaking-space entities". Raw filings often encode the gap in
/// `Item 1.` as `&nbsp;` or `&#160;`.
pub const WS_TOKEN: &str = "{ws}";
const WS_FRAGMENT: &str = r"(?:\s|&nbsp;|&#160;|&#xa0;)*";

pub const DEFAULT_TABLE_VERSION: &str = "2";

/// The three narrative sections, in the order they appear in a 10-K.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SectionKind {
    #[serde(rename = "item1_business")]
    Business,
    #[serde(rename = "item1a_risk_factors")]
    RiskFactors,
    #[serde(rename = "item7_mda")]
    Mda,
}

impl SectionKind {
    /// Document order. Output is always assembled in this order.
    pub const ALL: [SectionKind; 3] = [SectionKind::Business, SectionKind::RiskFactors, SectionKind::Mda];

    pub fn field_name(self) -> &'static str {
        match self {
            SectionKind::Business => "item1_business",
            SectionKind::RiskFactors => "item1a_risk_factors",
            SectionKind::Mda => "item7_mda",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Which match of a start pattern counts as the real section header.
///
/// Filings repeat headers in the table of contents and in cross
/// references, so the choice is a tuning knob rather than a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occurrence {
    /// 1-based ordinal among all matches.
    Nth(usize),
    /// The final match in the body.
    Last,
}

impl Occurrence {
    /// Picks the selected item from the matches, in document order.
    pub fn select<T: Copy>(self, matches: &[T]) -> Option<T> {
        match self {
            Occurrence::Nth(0) => None,
            Occurrence::Nth(n) => matches.get(n - 1).copied(),
            Occurrence::Last => matches.last().copied(),
        }
    }
}

impl FromStr for Occurrence {
    type Err = String;

    /// `last` or a 1-based ordinal such as `2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("last") {
            return Ok(Occurrence::Last);
        }
        match s.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(Occurrence::Nth(n)),
            _ => Err(format!("invalid occurrence '{}' (expected 'last' or a number from 1)", s)),
        }
    }
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Occurrence::Nth(n) => write!(f, "occurrence #{}", n),
            Occurrence::Last => f.write_str("last occurrence"),
        }
    }
}

/// One uncompiled table row, as stored in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub section: SectionKind,
    pub start: String,
    pub end: String,
    pub occurrence: Occurrence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternTable {
    pub version: String,
    pub rules: Vec<RuleSpec>,
}

impl Default for PatternTable {
    fn default() -> Self {
        let rule = |section, start: &str, end: &str| RuleSpec {
            section,
            start: start.to_string(),
            end: end.to_string(),
            occurrence: Occurrence::Last,
        };
        Self {
            version: DEFAULT_TABLE_VERSION.to_string(),
            rules: vec![
                rule(
                    SectionKind::Business,
                    r"\bitem{ws}1{ws}\.",
                    r"\bitem{ws}(?:1{ws}[a-c]|(?:[2-9]|1[0-6]){ws}[a-c]?){ws}\.",
                ),
                rule(
                    SectionKind::RiskFactors,
                    r"\bitem{ws}1{ws}a{ws}\.",
                    r"\bitem{ws}(?:1{ws}[bc]|(?:[2-9]|1[0-6]){ws}[a-c]?){ws}\.",
                ),
                rule(
                    SectionKind::Mda,
                    r"\bitem{ws}7{ws}\.",
                    r"\bitem{ws}(?:7{ws}a|(?:[89]|1[0-6]){ws}[a-c]?){ws}\.",
                ),
            ],
        }
    }
}

impl PatternTable {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Same table with every rule switched to `occurrence`.
    pub fn with_occurrence(mut self, occurrence: Occurrence) -> Self {
        for rule in &mut self.rules {
            rule.occurrence = occurrence;
        }
        self
    }

    /// Compiles every row case-insensitively, expanding `{ws}`.
    /// Rejects duplicate sections and a zero ordinal.
    pub fn compile(&self) -> Result<Vec<SectionRule>, ExtractError> {
        let mut compiled: Vec<SectionRule> = Vec::with_capacity(self.rules.len());
        for spec in &self.rules {
            if compiled.iter().any(|r| r.section == spec.section) {
                return Err(ExtractError::Pattern {
                    pattern: spec.section.to_string(),
                    message: "section listed more than once".to_string(),
                });
            }
            if spec.occurrence == Occurrence::Nth(0) {
                return Err(ExtractError::Pattern {
                    pattern: spec.start.clone(),
                    message: "occurrence ordinals start at 1".to_string(),
                });
            }
            compiled.push(SectionRule {
                section: spec.section,
                start: compile_pattern(&spec.start)?,
                end: compile_pattern(&spec.end)?,
                occurrence: spec.occurrence,
            });
        }
        Ok(compiled)
    }
}

/// A compiled table row.
#[derive(Debug, Clone)]
pub struct SectionRule {
    pub section: SectionKind,
    pub start: Regex,
    pub end: Regex,
    pub occurrence: Occurrence,
}

pub fn compile_pattern(pattern: &str) -> Result<Regex, ExtractError> {
    RegexBuilder::new(&pattern.replace(WS_TOKEN, WS_FRAGMENT))
        .case_insensitive(true)
        .build()
        .map_err(|e| ExtractError::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_for(rules: &[SectionRule], kind: SectionKind) -> &SectionRule {
        rules.iter().find(|r| r.section == kind).unwrap()
    }

    #[test]
    fn default_table_compiles_all_sections() {
        let rules = PatternTable::default().compile().unwrap();
        assert_eq!(rules.len(), 3);
        for kind in SectionKind::ALL {
            assert_eq!(rule_for(&rules, kind).occurrence, Occurrence::Last);
        }
    }

    #[test]
    fn start_patterns_tolerate_spacing_and_case() {
        let rules = PatternTable::default().compile().unwrap();
        let business = &rule_for(&rules, SectionKind::Business).start;
        for header in ["Item 1.", "Item 1 .", "Item  1.", "ITEM 1.", "item&nbsp;1.", "Item&#160;1."] {
            assert!(business.is_match(header), "should match {:?}", header);
        }
        for other in ["Item 1A.", "Item 10.", "Item 11.", "subitem 1."] {
            assert!(!business.is_match(other), "should not match {:?}", other);
        }
    }

    #[test]
    fn end_patterns_stop_at_next_item() {
        let rules = PatternTable::default().compile().unwrap();
        let business_end = &rule_for(&rules, SectionKind::Business).end;
        assert!(business_end.is_match("Item 1A. Risk Factors"));
        assert!(business_end.is_match("Item 2. Properties"));
        assert!(!business_end.is_match("Item 1. Business"));

        let risk_end = &rule_for(&rules, SectionKind::RiskFactors).end;
        assert!(risk_end.is_match("Item 1B. Unresolved Staff Comments"));
        assert!(risk_end.is_match("Item 7. Management's Discussion"));
        assert!(!risk_end.is_match("Item 1A. Risk Factors"));

        let mda_end = &rule_for(&rules, SectionKind::Mda).end;
        assert!(mda_end.is_match("Item 7A. Quantitative and Qualitative"));
        assert!(mda_end.is_match("Item 8. Financial Statements"));
        assert!(!mda_end.is_match("Item 7. MD&A"));
    }

    #[test]
    fn occurrence_selection() {
        let hits = [50usize, 4000, 12000];
        assert_eq!(Occurrence::Nth(1).select(&hits), Some(50));
        assert_eq!(Occurrence::Nth(2).select(&hits), Some(4000));
        assert_eq!(Occurrence::Nth(4).select(&hits), None);
        assert_eq!(Occurrence::Last.select(&hits), Some(12000));
        assert_eq!(Occurrence::Last.select::<usize>(&[]), None);
    }

    #[test]
    fn occurrence_parses_from_cli_text() {
        assert_eq!("LAST".parse::<Occurrence>(), Ok(Occurrence::Last));
        assert_eq!("2".parse::<Occurrence>(), Ok(Occurrence::Nth(2)));
        assert!("0".parse::<Occurrence>().is_err());
        assert!("second".parse::<Occurrence>().is_err());
    }

    #[test]
    fn table_loads_from_json() {
        let json = r#"{
            "version": "toc-skip",
            "rules": [
                {"section": "item7_mda", "start": "item{ws}7\\.", "end": "item{ws}8\\.", "occurrence": {"nth": 2}}
            ]
        }"#;
        let table = PatternTable::from_json(json).unwrap();
        assert_eq!(table.version, "toc-skip");
        assert_eq!(table.rules[0].section, SectionKind::Mda);
        assert_eq!(table.rules[0].occurrence, Occurrence::Nth(2));
        assert!(table.compile().is_ok());
    }

    #[test]
    fn compile_rejects_bad_rows() {
        let mut table = PatternTable::default();
        table.rules[0].start = "item(".to_string();
        assert!(matches!(table.compile(), Err(ExtractError::Pattern { .. })));

        let mut table = PatternTable::default();
        table.rules.push(table.rules[0].clone());
        assert!(matches!(table.compile(), Err(ExtractError::Pattern { .. })));

        let table = PatternTable::default().with_occurrence(Occurrence::Nth(0));
        assert!(matches!(table.compile(), Err(ExtractError::Pattern { .. })));
    }
}
