//! Template scanner: finds placeholder tokens (`[name]`) and choice groups
//! (`(A/B)`) in stored template text.
//!
//! Offsets are byte offsets into the scanned text. All delimiters are ASCII,
//! so every reported span starts and ends on a char boundary.
//!
//! Only innermost parenthesised groups are reported; an outer group that wraps
//! another group becomes visible once the inner one has been collapsed.
//! `[MISSING: ...]` markers are opaque, so rescanning filled text is a no-op.

use std::ops::Range;

/// Opening of a missing-item marker: `[MISSING: <description>]`.
pub const MISSING_PREFIX: &str = "[MISSING:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    UnclosedBracket,
    InvalidPlaceholder,
    UnclosedGroup,
    StrayClosingParen,
    NoSlash,
    MultipleSlashes,
}

impl MalformedReason {
    /// Human-readable (Dutch) description used inside the missing-item marker.
    pub fn description(&self) -> &'static str {
        match self {
            MalformedReason::UnclosedBracket => "onvolledig invulveld in sjabloon",
            MalformedReason::InvalidPlaceholder => "onleesbaar invulveld in sjabloon",
            MalformedReason::UnclosedGroup => "onvolledige keuze in sjabloon",
            MalformedReason::StrayClosingParen => "losse sluithaak in sjabloon",
            MalformedReason::NoSlash => "keuze zonder opties in sjabloon",
            MalformedReason::MultipleSlashes => "keuze met meer dan twee opties in sjabloon",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `[name]`; `name` is normalised (trimmed, lowercase, spaces → `_`).
    Placeholder { name: String, span: Range<usize> },
    /// `(negative/positive)`; both sides trimmed.
    Choice {
        negative: String,
        positive: String,
        span: Range<usize>,
    },
    /// Template syntax that cannot be interpreted.
    Malformed {
        reason: MalformedReason,
        span: Range<usize>,
    },
}

impl Token {
    pub fn span(&self) -> &Range<usize> {
        match self {
            Token::Placeholder { span, .. }
            | Token::Choice { span, .. }
            | Token::Malformed { span, .. } => span,
        }
    }

    /// Choice groups and malformed syntax are rewritten by the collapser;
    /// placeholders are substituted by name.
    pub fn is_group(&self) -> bool {
        !matches!(self, Token::Placeholder { .. })
    }
}

/// Scans `text` left to right and returns all tokens ordered by offset.
pub fn scan(text: &str) -> Vec<Token> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    // (offset of '(', whether another group opened inside it)
    let mut open: Vec<(usize, bool)> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'[' => {
                let Some(rel) = text[i + 1..].find(']') else {
                    tokens.push(Token::Malformed {
                        reason: MalformedReason::UnclosedBracket,
                        span: i..i + 1,
                    });
                    i += 1;
                    continue;
                };
                let end = i + 1 + rel + 1;
                if !text[i..].starts_with(MISSING_PREFIX) {
                    let inner = &text[i + 1..end - 1];
                    tokens.push(match normalize_name(inner) {
                        Some(name) => Token::Placeholder {
                            name,
                            span: i..end,
                        },
                        None => Token::Malformed {
                            reason: MalformedReason::InvalidPlaceholder,
                            span: i..end,
                        },
                    });
                }
                i = end;
                continue;
            }
            b'(' => {
                if let Some(parent) = open.last_mut() {
                    parent.1 = true;
                }
                open.push((i, false));
            }
            b')' => match open.pop() {
                None => tokens.push(Token::Malformed {
                    reason: MalformedReason::StrayClosingParen,
                    span: i..i + 1,
                }),
                Some((start, false)) => tokens.push(classify_group(text, start..i + 1)),
                Some((_, true)) => {}
            },
            _ => {}
        }
        i += 1;
    }

    for (start, _) in open {
        tokens.push(Token::Malformed {
            reason: MalformedReason::UnclosedGroup,
            span: start..start + 1,
        });
    }

    tokens.sort_by_key(|t| t.span().start);
    tokens
}

/// Interprets the text of an innermost `( ... )` span.
pub fn classify_group(text: &str, span: Range<usize>) -> Token {
    let inner = &text[span.start + 1..span.end - 1];
    match split_choice(inner) {
        Ok((negative, positive)) => Token::Choice {
            negative: negative.trim().to_string(),
            positive: positive.trim().to_string(),
            span,
        },
        Err(reason) => Token::Malformed { reason, span },
    }
}

/// Splits group content on its single top-level `/`. Slashes inside
/// `[...]` (placeholders, markers) do not count.
pub fn split_choice(inner: &str) -> Result<(&str, &str), MalformedReason> {
    let mut depth = 0usize;
    let mut slash = None;
    for (idx, c) in inner.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                if slash.is_some() {
                    return Err(MalformedReason::MultipleSlashes);
                }
                slash = Some(idx);
            }
            _ => {}
        }
    }
    let idx = slash.ok_or(MalformedReason::NoSlash)?;
    Ok((&inner[..idx], &inner[idx + 1..]))
}

fn normalize_name(inner: &str) -> Option<String> {
    let trimmed = inner.trim();
    if trimmed.is_empty() || trimmed.contains(['[', '(', ')']) {
        return None;
    }
    Some(
        trimmed
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase(),
    )
}

/// Builds a missing-item marker. Template delimiters are stripped from the
/// description so the marker stays opaque to later scans.
pub fn missing_marker(description: &str) -> String {
    let cleaned: String = description
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '(' | ')'))
        .collect();
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("{MISSING_PREFIX} {cleaned}]")
}

/// Returns the descriptions of all missing-item markers in `text`, in order.
pub fn missing_markers(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find(MISSING_PREFIX) {
        let after = &rest[pos + MISSING_PREFIX.len()..];
        let Some(end) = after.find(']') else { break };
        found.push(after[..end].trim().to_string());
        rest = &after[end + 1..];
    }
    found
}
