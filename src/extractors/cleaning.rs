// src/extractors/cleaning.rs

// --- Imports ---
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::{node::Node, Html};

// Elements whose text never belongs in the narrative output.
// `ix:header` holds the hidden inline-XBRL fact block at the top of iXBRL filings.
const NON_CONTENT_ELEMENTS: &[&str] = &["script", "style", "head", "title", "ix:header"];

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Failed to compile cleaning regex")
}

// --- normalize() rules, applied in declaration order ---
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| re(r"\s+"));
static LOWER_UPPER_RE: Lazy<Regex> = Lazy::new(|| re(r"([a-z])([A-Z])"));
static LETTER_DIGIT_RE: Lazy<Regex> = Lazy::new(|| re(r"([a-zA-Z])(\d)"));
static DIGIT_LETTER_RE: Lazy<Regex> = Lazy::new(|| re(r"(\d)([a-zA-Z])"));
// "item 1 a.business" (after the digit/letter split) -> "item 1a business"
static ITEM_ORDINAL_RE: Lazy<Regex> = Lazy::new(|| re(r"(?i)\b(item)\s*(\d+)\s*([a-z]?)\s*\.(\w)"));

// --- remove_boilerplate_noise() rules, applied in declaration order ---
static GLUED_URL_RE: Lazy<Regex> = Lazy::new(|| re(r"([a-z])(https?://)"));
static URL_RE: Lazy<Regex> = Lazy::new(|| re(r"https?://\S+|\bwww\.\S+"));
static XBRL_TAG_RE: Lazy<Regex> = Lazy::new(|| re(r"\b[a-z]{2,10}(?:-[a-z]{2,10})?:[a-z0-9_\-\.]+"));
static LONG_DIGITS_RE: Lazy<Regex> = Lazy::new(|| re(r"\b\d{8,12}\b(\s*%)?"));
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    re(r"\b\d{4}-\d{1,2}-\d{1,2}\b|\b\d{1,2}/\d{1,2}/\d{2,4}\b|\b\d{1,2}-\d{1,2}-\d{4}\b")
});
// Letter/digit splitting has already run, so "fy2020" arrives as "fy 2020" and "p10y" as "p 10 y".
static FISCAL_PERIOD_RE: Lazy<Regex> =
    Lazy::new(|| re(r"\bfy\s?\d{2,4}\b|\bp\s?\d+\s?[ymdw](?:\s?\d+\s?[ymdw])*\b"));
static FOOTNOTE_RE: Lazy<Regex> = Lazy::new(|| re(r"[†‡*©®§¶]+"));
static TABLE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| re(r"\b\d+\.\d+\b(\s*%)?"));

/// Parses `fragment` as HTML and returns its visible text nodes joined by
/// single spaces, so adjacent blocks never fuse into one token.
pub fn strip_markup(fragment: &str) -> String {
    let document = Html::parse_fragment(fragment);
    let mut out = String::with_capacity(fragment.len() / 2);

    for node in document.tree.root().descendants() {
        let Node::Text(text_node) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| match ancestor.value() {
            Node::Element(el) => NON_CONTENT_ELEMENTS.contains(&el.name()),
            _ => false,
        });
        if hidden {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&text_node.text);
    }

    out
}

/// Whitespace collapse, glued-token repair, header ordinal repair, lowercase.
/// Each step assumes the previous one has run.
pub fn normalize(text: &str) -> String {
    let text = WHITESPACE_RE.replace_all(text, " ");
    let text = text.trim();
    let text = LOWER_UPPER_RE.replace_all(text, "${1} ${2}");
    let text = LETTER_DIGIT_RE.replace_all(&text, "${1} ${2}");
    let text = DIGIT_LETTER_RE.replace_all(&text, "${1} ${2}");
    let text = ITEM_ORDINAL_RE.replace_all(&text, "${1} ${2}${3} ${4}");
    text.to_lowercase()
}

/// Keeps a numeric match when it carries a trailing percent sign.
fn drop_unless_percent(caps: &Captures) -> String {
    if caps.get(1).is_some() {
        caps[0].to_string()
    } else {
        " ".to_string()
    }
}

/// Removes URLs, XBRL tag references, identifier digit runs, dates, fiscal
/// period tokens, footnote symbols and bare table decimals from lowercased
/// text. Percent-attached numbers are content and survive.
pub fn remove_boilerplate_noise(text: &str) -> String {
    let text = GLUED_URL_RE.replace_all(text, "${1} ${2}");
    let text = URL_RE.replace_all(&text, " ");
    let text = XBRL_TAG_RE.replace_all(&text, " ");
    let text = LONG_DIGITS_RE.replace_all(&text, drop_unless_percent);
    let text = DATE_RE.replace_all(&text, " ");
    let text = FISCAL_PERIOD_RE.replace_all(&text, " ");
    let text = FOOTNOTE_RE.replace_all(&text, " ");
    let text = TABLE_NUMBER_RE.replace_all(&text, drop_unless_percent);
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

/// Full cleaning chain for one raw section slice.
pub fn clean_section(raw_section: &str) -> String {
    remove_boilerplate_noise(&normalize(&strip_markup(raw_section)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_markup_separates_adjacent_blocks() {
        let html = "<div><p>Risk</p><p>Factors</p></div><span>Overview</span>";
        assert_eq!(strip_markup(html), "Risk Factors Overview");
    }

    #[test]
    fn strip_markup_drops_scripts_styles_and_hidden_xbrl() {
        let html = r#"<style>p { color: red; }</style>
            <ix:header><ix:hidden>dei:EntityCentralIndexKey 0000320193</ix:hidden></ix:header>
            <p>We design smartphones.</p>
            <script>var tracking = 1;</script>"#;
        let text = strip_markup(html);
        assert!(text.contains("We design smartphones."));
        assert!(!text.contains("color"));
        assert!(!text.contains("tracking"));
        assert!(!text.contains("0000320193"));
    }

    #[test]
    fn strip_markup_decodes_entities() {
        let text = strip_markup("<p>Item&nbsp;1.&#160;Business &amp; Strategy</p>");
        assert_eq!(normalize(&text), "item 1. business & strategy");
    }

    #[test]
    fn strip_markup_is_deterministic() {
        let html = "<table><tr><td>A</td><td>B</td></tr></table><p>C <b>D</b></p>";
        assert_eq!(strip_markup(html), strip_markup(html));
    }

    #[test]
    fn normalize_repairs_merged_tokens() {
        let text = strip_markup("<b>Risk</b>Factors2020disclosure");
        assert_eq!(normalize(&text), "risk factors 2020 disclosure");
        assert_eq!(normalize("RiskFactors2020disclosure"), "risk factors 2020 disclosure");
        assert_eq!(normalize("fiscal2020"), "fiscal 2020");
    }

    #[test]
    fn normalize_collapses_whitespace_and_lowercases() {
        assert_eq!(normalize("  Net\n\n  Sales\t\u{a0}Grew  "), "net sales grew");
    }

    #[test]
    fn normalize_splits_glued_item_headers() {
        assert_eq!(normalize("item1a.business"), "item 1a business");
        assert_eq!(normalize("Item 7.Management"), "item 7 management");
    }

    #[test]
    fn noise_keeps_percentages_and_drops_table_numbers() {
        let out = remove_boilerplate_noise("net margin improved 5.2 % year over year");
        assert_eq!(out, "net margin improved 5.2 % year over year");

        let out = remove_boilerplate_noise("see exhibit 4.1 for details");
        assert_eq!(out, "see exhibit for details");

        let out = remove_boilerplate_noise("growth of 12.5% in services");
        assert!(out.contains("12.5%"));
    }

    #[test]
    fn noise_removes_urls_and_xbrl_tags() {
        let out = remove_boilerplate_noise(
            "liabilities noncurrenthttp://fasb.org/us-gaap/2023#liabilities see us-gaap:revenues and aapl:iphonemember today",
        );
        assert_eq!(out, "liabilities noncurrent see and today");
    }

    #[test]
    fn noise_removes_identifiers_dates_and_periods() {
        let out = remove_boilerplate_noise(
            "cik 0000320193 filed 2023-11-03 and 11/03/2023 for fy2023 fy 2022 p10y p 6 m period",
        );
        assert_eq!(out, "cik filed and for period");
    }

    #[test]
    fn noise_keeps_short_numbers_and_percent_digit_runs() {
        let out = remove_boilerplate_noise("we employ 164000 people and 12345678 % is odd");
        assert_eq!(out, "we employ 164000 people and 12345678 % is odd");
    }

    #[test]
    fn noise_removes_footnote_symbols() {
        let out = remove_boilerplate_noise("revenue† grew* strongly‡ in © 2023 ®");
        assert_eq!(out, "revenue grew strongly in 2023");
    }

    #[test]
    fn clean_section_runs_full_chain() {
        let raw = "<p>Our <b>Net</b>Sales rose 8.1 % in FY2023.</p><p>See https://investor.example.com.</p>";
        assert_eq!(clean_section(raw), "our net sales rose 8.1 % in . see");
    }
}
