//! Best-effort parser for the LLM's markdown content outline.
//!
//! There is no grammar here. The parser recognises the layout the outline
//! prompt asks for and a few common deviations; anything else degrades to
//! defaults rather than failing.

use crate::model::{ContentOutline, OutlineSection};
use once_cell::sync::Lazy;
use regex::Regex;

const DEFAULT_H1: &str = "Comprehensive Guide";
const DEFAULT_SECTION_WORDS: u32 = 200;
const DEFAULT_TOTAL_WORDS: u32 = 2000;

static SECTION_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:#{2,6}\s*(?:\d+[.)]\s*)?|[-*]\s+|\d+[.)]\s+)(.+)$").unwrap());
static WORD_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\((?:[^)]*estimated\s+word\s+count[:\s]*~?([\d,]+)[^)]*|~?([\d,]+)\s*words?)\)")
        .unwrap()
});
static TOTAL_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^total\s+estimated\s+word\s+count\W*([\d,]+)").unwrap());
static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#"["“]([^"”]+)["”]"#).unwrap());

/// Headings that organise the outline rather than name a section.
const STRUCTURAL_HEADINGS: &[&str] = &[
    "h2 sections",
    "sections",
    "content outline",
    "outline",
    "recommended h1",
];

fn strip_emphasis(s: &str) -> &str {
    s.trim().trim_matches('*').trim_matches('_').trim()
}

fn clean_h1(s: &str) -> String {
    let s = strip_emphasis(s);
    if let Some(c) = QUOTED.captures(s) {
        return c[1].trim().to_string();
    }
    s.trim_matches(|c| c == '"' || c == '\'').trim().to_string()
}

fn parse_count(s: &str) -> Option<u32> {
    s.replace(',', "").parse().ok()
}

fn is_total_line(line: &str) -> Option<Option<u32>> {
    let plain = line.replace('*', "");
    let plain = plain.trim_start_matches('#').trim();
    if !plain.to_ascii_lowercase().starts_with("total estimated") {
        return None;
    }
    Some(TOTAL_LINE.captures(plain).and_then(|c| parse_count(&c[1])))
}

fn parse_section(line: &str) -> Option<OutlineSection> {
    let caps = SECTION_START.captures(line)?;
    let rest = caps[1].trim();

    let (title, words) = match WORD_COUNT.captures(rest) {
        Some(c) => {
            let count = c
                .get(1)
                .or_else(|| c.get(2))
                .and_then(|m| parse_count(m.as_str()));
            let whole = c.get(0).map(|m| m.range()).unwrap_or(0..0);
            let mut title = String::new();
            title.push_str(&rest[..whole.start]);
            title.push_str(&rest[whole.end..]);
            (title, count)
        }
        None => (rest.to_string(), None),
    };

    let title = strip_emphasis(title.trim()).trim_end_matches(':').trim().to_string();
    if title.is_empty() {
        return None;
    }
    Some(OutlineSection {
        title,
        estimated_word_count: words.unwrap_or(DEFAULT_SECTION_WORDS),
        description: String::new(),
    })
}

pub fn parse_content_outline(text: &str) -> ContentOutline {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut h1: Option<String> = None;
    let mut sections: Vec<OutlineSection> = Vec::new();
    let mut total_line: Option<u32> = None;
    let mut expect_h1 = false;

    for line in &lines {
        if expect_h1 {
            expect_h1 = false;
            let candidate = clean_h1(line.trim_start_matches('#'));
            if !candidate.is_empty() && h1.is_none() {
                h1 = Some(candidate);
                continue;
            }
        }

        let lower = line.to_ascii_lowercase();
        if lower.contains("recommended h1") {
            // "Recommended H1: Title" or a heading followed by the title line
            let after = line
                .split_once(':')
                .map(|(_, rest)| clean_h1(rest))
                .filter(|s| !s.is_empty());
            match after {
                Some(t) if h1.is_none() => h1 = Some(t),
                _ => expect_h1 = true,
            }
            continue;
        }

        if let Some(total) = is_total_line(line) {
            if total.is_some() {
                total_line = total;
            }
            continue;
        }

        if line.starts_with('#') && !line.starts_with("##") {
            let candidate = clean_h1(line.trim_start_matches('#'));
            if h1.is_none() && !candidate.is_empty() {
                h1 = Some(candidate);
            }
            continue;
        }

        if h1.is_none() && sections.is_empty() {
            let bare = strip_emphasis(line);
            if bare.starts_with(['"', '“', '\'']) {
                h1 = Some(clean_h1(bare));
                continue;
            }
        }

        if *line == "---" || *line == "***" {
            continue;
        }

        if let Some(section) = parse_section(line) {
            let heading = section.title.to_ascii_lowercase();
            if line.starts_with("##") && STRUCTURAL_HEADINGS.contains(&heading.as_str()) {
                continue;
            }
            sections.push(section);
            continue;
        }

        if let Some(current) = sections.last_mut() {
            if !current.description.is_empty() {
                current.description.push(' ');
            }
            current.description.push_str(line);
        }
    }

    if h1.is_none() {
        if let Some(first) = lines.first() {
            if !first.starts_with('#')
                && SECTION_START.captures(first).is_none()
                && is_total_line(first).is_none()
            {
                h1 = Some(clean_h1(first));
            }
        }
    }

    let total = if sections.is_empty() {
        total_line.unwrap_or(DEFAULT_TOTAL_WORDS)
    } else {
        sections.iter().map(|s| s.estimated_word_count).sum()
    };

    ContentOutline {
        recommended_h1: h1
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_H1.to_string()),
        h2_sections: sections,
        total_estimated_word_count: if total == 0 { DEFAULT_TOTAL_WORDS } else { total },
    }
}
