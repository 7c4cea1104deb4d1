//! Canonicalisation of oracle answers into taxonomy labels.
//!
//! Shared by every pipeline so case folding, prefix matching and fallback behave the
//! same everywhere.

use super::error::ParseError;
use super::taxonomy::Label;

/// One parsed answer line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict<L> {
    pub label: L,
    /// Text after the label, or the whole line when there is none.
    pub reason: String,
}

const WRAPPERS: &[char] = &['"', '\'', '`', '*', '_', '“', '”', '‘', '’', '[', ']', '(', ')'];

/// Lowercased line with list markers, quotes and markdown emphasis removed.
pub fn normalize_line(line: &str) -> String {
    let mut s = line.trim();

    loop {
        let before = s;
        s = s.trim_start_matches(['-', '*', '•', '#', '>']).trim_start();
        s = strip_enumerator(s);
        s = s.trim_matches(WRAPPERS).trim();
        if s == before {
            break;
        }
    }

    s.to_lowercase()
}

/// Strips a leading `1.` / `2)` style enumerator.
fn strip_enumerator(s: &str) -> &str {
    let digits = s.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return s;
    }
    let rest = &s[digits..];
    match rest.chars().next() {
        Some('.') | Some(')') | Some(':') => rest[1..].trim_start(),
        _ => s,
    }
}

/// Plain inflections accepted after a token: "conflicts", "matched", "duplicates".
const INFLECTIONS: &[&str] = &["es", "ed", "s", "d"];

/// Shorter tokens ("no", "yes") must end at a word boundary as written.
const MIN_INFLECTED_TOKEN: usize = 4;

/// Maps one answer line to a label: exact token match, then the longest token that
/// prefixes the line at a word boundary, optionally followed by a plain inflection.
pub fn parse_label<L: Label>(line: &str) -> Result<L, ParseError> {
    match_label::<L>(&normalize_line(line)).ok_or_else(|| no_label(line))
}

fn match_label<L: Label>(normalized: &str) -> Option<L> {
    if normalized.is_empty() {
        return None;
    }

    for label in L::PROMPTED {
        if label.tokens().contains(&normalized) {
            return Some(*label);
        }
    }

    let mut best: Option<(L, usize)> = None;
    for label in L::PROMPTED {
        for token in label.tokens() {
            if let Some(len) = prefix_len(normalized, token)
                && best.is_none_or(|(_, best_len)| len > best_len)
            {
                best = Some((*label, len));
            }
        }
    }
    best.map(|(label, _)| label)
}

/// Bytes of `normalized` covered by `token` plus any accepted inflection.
fn prefix_len(normalized: &str, token: &str) -> Option<usize> {
    let rest = normalized.strip_prefix(token)?;
    if at_word_boundary(rest) {
        return Some(token.len());
    }
    if token.chars().count() < MIN_INFLECTED_TOKEN {
        return None;
    }
    INFLECTIONS
        .iter()
        .find(|suffix| rest.strip_prefix(**suffix).is_some_and(at_word_boundary))
        .map(|suffix| token.len() + suffix.len())
}

fn at_word_boundary(rest: &str) -> bool {
    rest.chars().next().is_none_or(|c| !c.is_alphanumeric())
}

fn no_label(line: &str) -> ParseError {
    ParseError::NoLabel {
        line: line.trim().to_string(),
    }
}

/// Label from the first non-blank line of `response`.
pub fn parse_single<L: Label>(response: &str) -> Result<L, ParseError> {
    let line = response
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or(ParseError::Empty)?;
    parse_label(line)
}

/// One verdict per expected item, aligned by line order.
///
/// Blank lines are skipped and surplus lines ignored. Items without a line, or whose
/// line names no label, get an error in their slot; the caller applies the fallback.
pub fn parse_each<L: Label>(
    response: &str,
    expected: usize,
) -> Vec<Result<Verdict<L>, ParseError>> {
    let mut lines = response.lines().filter(|l| !l.trim().is_empty());

    (0..expected)
        .map(|index| {
            let line = lines.next().ok_or(ParseError::MissingLine { index })?;
            parse_verdict(line)
        })
        .collect()
}

fn parse_verdict<L: Label>(line: &str) -> Result<Verdict<L>, ParseError> {
    let label = parse_label::<L>(line)?;

    let line = line.trim();
    let reason = line
        .split_once(':')
        .or_else(|| line.split_once(" - "))
        .map(|(_, rest)| rest.trim())
        .filter(|rest| !rest.is_empty())
        .unwrap_or(line);

    Ok(Verdict {
        label,
        reason: reason.to_string(),
    })
}
