// src/utils/html_debug.rs
use crate::extractors::patterns::SectionRule;
use crate::utils::error::AppError;
use std::fs;
use std::path::Path;

/// One highlighted byte range and the labels of every pattern that hit it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Highlight {
    start: usize,
    end: usize,
    labels: Vec<String>,
}

fn collect_highlights(html: &str, rules: &[SectionRule]) -> Vec<Highlight> {
    let mut highlights: Vec<Highlight> = Vec::new();
    for rule in rules {
        for (kind, re) in [("start", &rule.start), ("end", &rule.end)] {
            for mat in re.find_iter(html) {
                let label = format!("{}-{}", kind, rule.section);
                match highlights.iter_mut().find(|h| h.start == mat.start() && h.end == mat.end()) {
                    Some(existing) => existing.labels.push(label),
                    None => highlights.push(Highlight {
                        start: mat.start(),
                        end: mat.end(),
                        labels: vec![label],
                    }),
                }
            }
        }
    }
    highlights.sort_by_key(|h| (h.start, h.end));
    highlights
}

/// Returns `html` with every start/end header match wrapped in a coloured,
/// titled `<span>`. Overlapping matches after the first are dropped.
pub fn annotate_section_matches(html: &str, rules: &[SectionRule]) -> String {
    let mut out = String::from("<!DOCTYPE html>\n<html>\n<head>\n<style>\n");
    out.push_str(".hl-start { background-color: #90EE90; }\n");
    out.push_str(".hl-end { background-color: #FFA500; }\n");
    out.push_str(".hl-both { background-color: #ADD8E6; }\n");
    out.push_str("</style>\n</head>\n<body>\n");

    let mut last_pos = 0;
    for h in collect_highlights(html, rules) {
        if h.start < last_pos {
            continue;
        }
        out.push_str(&html[last_pos..h.start]);

        let has_start = h.labels.iter().any(|l| l.starts_with("start-"));
        let has_end = h.labels.iter().any(|l| l.starts_with("end-"));
        let css_class = match (has_start, has_end) {
            (true, true) => "hl-both",
            (true, false) => "hl-start",
            _ => "hl-end",
        };
        out.push_str(&format!(
            "<span class=\"{}\" title=\"Position: {}-{}, Match: {}\">",
            css_class,
            h.start,
            h.end,
            h.labels.join(" ")
        ));
        out.push_str(&html[h.start..h.end]);
        out.push_str("</span>");
        last_pos = h.end;
    }
    out.push_str(&html[last_pos..]);

    out.push_str("\n</body>\n</html>");
    out
}

/// Writes the annotated copy of a raw filing next to the processed output.
pub fn write_annotated_filing(html: &str, path: &Path, rules: &[SectionRule]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, annotate_section_matches(html, rules))?;
    tracing::info!("Saved debug HTML to {}", path.display());
    Ok(())
}
