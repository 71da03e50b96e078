//! Generated marketing copy
//!
//! The chat model returns free-form markdown. [`CopyResult`] keeps that text
//! verbatim for display and download, alongside a best-effort structured
//! parse whose gaps are reported as warnings instead of errors.

use serde::Serialize;

pub const EXPECTED_KEYWORDS: usize = 6;
pub const EXPECTED_HASHTAGS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedCopy {
    pub headline: Option<String>,
    pub body: Option<String>,
    pub keywords: Vec<String>,
    pub hashtags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CopyResult {
    raw: String,
    parsed: ParsedCopy,
    warnings: Vec<String>,
}

impl CopyResult {
    pub fn new(raw: String) -> Self {
        let parsed = parse(&raw);
        let warnings = format_warnings(&parsed);
        Self {
            raw,
            parsed,
            warnings,
        }
    }

    /// The model output exactly as received.
    pub fn text(&self) -> &str {
        &self.raw
    }

    pub fn parsed(&self) -> &ParsedCopy {
        &self.parsed
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Headline,
    Body,
    Keywords,
    Hashtags,
}

fn parse(raw: &str) -> ParsedCopy {
    let mut current: Option<Section> = None;
    let mut headline: Vec<String> = Vec::new();
    let mut body: Vec<String> = Vec::new();
    let mut keywords: Vec<String> = Vec::new();
    let mut hashtags: Vec<String> = Vec::new();

    for line in raw.lines() {
        if let Some((section, inline)) = classify_header(line) {
            current = Some(section);
            let Some(inline) = inline else { continue };
            push_item(section, inline, &mut headline, &mut body, &mut keywords, &mut hashtags);
            continue;
        }

        let item = strip_bullet(line);
        if item.is_empty() {
            continue;
        }
        if let Some(section) = current {
            push_item(
                section,
                item.to_string(),
                &mut headline,
                &mut body,
                &mut keywords,
                &mut hashtags,
            );
        }
    }

    ParsedCopy {
        headline: headline.into_iter().next(),
        body: (!body.is_empty()).then(|| body.join(" ")),
        keywords,
        hashtags,
    }
}

fn push_item(
    section: Section,
    item: String,
    headline: &mut Vec<String>,
    body: &mut Vec<String>,
    keywords: &mut Vec<String>,
    hashtags: &mut Vec<String>,
) {
    match section {
        Section::Headline => headline.push(trim_quotes(&item).to_string()),
        Section::Body => body.push(item),
        Section::Keywords => keywords.extend(
            item.split(',')
                .map(|k| k.trim().trim_end_matches('.').trim())
                .filter(|k| !k.is_empty())
                .map(str::to_string),
        ),
        Section::Hashtags => hashtags.extend(
            item.split(|c: char| c.is_whitespace() || c == ',')
                .map(|t| t.trim_end_matches(['.', ';']))
                .filter(|t| t.len() > 1 && t.starts_with('#'))
                .map(str::to_string),
        ),
    }
}

/// Recognizes lines such as `1. **Catchy Headline:** Text` or `### Hashtags`.
fn classify_header(line: &str) -> Option<(Section, Option<String>)> {
    let cleaned = line.replace(['*', '_'], "");
    let cleaned = cleaned.trim().trim_start_matches(|c: char| {
        matches!(c, '-' | '+' | '#' | '>' | '.' | ')') || c.is_ascii_digit() || c.is_whitespace()
    });
    let label = cleaned.split(':').next().unwrap_or_default();
    let label = label.split('(').next().unwrap_or_default();
    let label = label
        .trim()
        .trim_start_matches(|c: char| c.is_ascii_digit() || c.is_whitespace())
        .to_lowercase();

    let section = match label.as_str() {
        "headline" | "catchy headline" | "title" => Section::Headline,
        "body" | "ad body" | "body copy" | "ad copy" => Section::Body,
        "keywords" | "seo keywords" => Section::Keywords,
        "hashtags" => Section::Hashtags,
        _ => return None,
    };

    let inline = line
        .split_once(':')
        .map(|(_, rest)| rest.trim().trim_matches('*').trim())
        .filter(|rest| !rest.is_empty())
        .map(str::to_string);
    Some((section, inline))
}

fn strip_bullet(line: &str) -> &str {
    let trimmed = line.trim();
    let without_marker = ["- ", "* ", "+ "]
        .iter()
        .find_map(|marker| trimmed.strip_prefix(marker))
        .unwrap_or(trimmed);
    let without_number = match without_marker.split_once(". ") {
        Some((number, rest)) if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) => {
            rest
        }
        _ => without_marker,
    };
    without_number.trim().trim_matches('*').trim()
}

fn trim_quotes(text: &str) -> &str {
    text.trim_matches(|c| matches!(c, '"' | '“' | '”')).trim()
}

fn format_warnings(parsed: &ParsedCopy) -> Vec<String> {
    let mut warnings = Vec::new();
    if parsed.headline.is_none() {
        warnings.push("no headline found in generated copy".to_string());
    }
    if parsed.body.is_none() {
        warnings.push("no ad body found in generated copy".to_string());
    }
    if parsed.keywords.len() != EXPECTED_KEYWORDS {
        warnings.push(format!(
            "expected {} keywords, found {}",
            EXPECTED_KEYWORDS,
            parsed.keywords.len()
        ));
    }
    if parsed.hashtags.len() != EXPECTED_HASHTAGS {
        warnings.push(format!(
            "expected {} hashtags, found {}",
            EXPECTED_HASHTAGS,
            parsed.hashtags.len()
        ));
    }
    warnings
}
