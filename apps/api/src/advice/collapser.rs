//! Choice collapser: rewrites one `(negative/positive)` group in place.
//!
//! Polarity is fixed: `Resolved(true)` keeps the second side, `Resolved(false)`
//! the first. Text outside the group's span is never touched.

use std::ops::Range;

use crate::advice::scanner::{missing_marker, split_choice};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceDecision {
    Resolved(bool),
    /// Replace the whole group with a missing-item marker carrying this description.
    Unresolved(String),
}

/// Human-readable description of an undecided choice, e.g.
/// `keuze geen dekking/wel dekking`.
pub fn describe_choice(negative: &str, positive: &str) -> String {
    format!("keuze {}/{}", short_side(negative), short_side(positive))
}

fn short_side(side: &str) -> String {
    let words: Vec<&str> = side.split_whitespace().take(6).collect();
    words
        .join(" ")
        .trim_end_matches(['.', ',', ';', ':'])
        .to_string()
}

/// Rewrites the group at `span` according to `decision`.
pub fn collapse_group(text: &str, span: Range<usize>, decision: &ChoiceDecision) -> String {
    let replacement = match decision {
        ChoiceDecision::Resolved(keep_positive) if span.len() >= 2 => {
            let inner = &text[span.start + 1..span.end - 1];
            match split_choice(inner) {
                Ok((negative, positive)) => {
                    let side = if *keep_positive { positive } else { negative };
                    side.trim().to_string()
                }
                Err(reason) => missing_marker(reason.description()),
            }
        }
        ChoiceDecision::Resolved(_) => missing_marker("onvolledige keuze in sjabloon"),
        ChoiceDecision::Unresolved(description) => missing_marker(description),
    };

    let mut start = span.start;
    // An empty side would leave a double space behind.
    if replacement.is_empty()
        && text[..start].ends_with(' ')
        && text[span.end..].starts_with([' ', '.', ',', ';', ':', '!', '?'])
    {
        start -= 1;
    }

    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..start]);
    out.push_str(&replacement);
    out.push_str(&text[span.end..]);
    out
}

/// Collapses several groups, right to left by offset so earlier spans stay
/// valid. A span nested inside another one is skipped; it shows up again when
/// the collapsed text is rescanned.
pub fn collapse_all(text: &str, groups: &[(Range<usize>, ChoiceDecision)]) -> String {
    let mut ordered: Vec<&(Range<usize>, ChoiceDecision)> = groups.iter().collect();
    ordered.sort_by_key(|(span, _)| (span.start, std::cmp::Reverse(span.end)));

    let mut disjoint: Vec<&(Range<usize>, ChoiceDecision)> = Vec::with_capacity(ordered.len());
    for group in ordered {
        if disjoint.last().is_some_and(|(kept, _)| group.0.start < kept.end) {
            continue;
        }
        disjoint.push(group);
    }

    let mut out = text.to_string();
    for (span, decision) in disjoint.into_iter().rev() {
        out = collapse_group(&out, span.clone(), decision);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::scanner::{scan, Token};

    fn first_group(text: &str) -> Range<usize> {
        scan(text)
            .into_iter()
            .find(|t| t.is_group())
            .map(|t| t.span().clone())
            .expect("group")
    }

    #[test]
    fn test_true_keeps_second_side() {
        let text = "Klant wil (geen dekking/wel dekking).";
        let span = first_group(text);
        assert_eq!(
            collapse_group(text, span, &ChoiceDecision::Resolved(true)),
            "Klant wil wel dekking."
        );
    }

    #[test]
    fn test_false_keeps_first_side() {
        let text = "Klant wil (geen dekking/wel dekking).";
        let span = first_group(text);
        assert_eq!(
            collapse_group(text, span, &ChoiceDecision::Resolved(false)),
            "Klant wil geen dekking."
        );
    }

    #[test]
    fn test_unresolved_replaces_whole_group_with_marker() {
        let text = "Klant wil (geen dekking/wel dekking).";
        let span = first_group(text);
        let description = describe_choice("geen dekking", "wel dekking");
        assert_eq!(
            collapse_group(text, span, &ChoiceDecision::Unresolved(description)),
            "Klant wil [MISSING: keuze geen dekking/wel dekking]."
        );
    }

    #[test]
    fn test_empty_side_does_not_leave_double_space() {
        let text = "Wij adviseren (/extra) dekking.";
        let span = first_group(text);
        assert_eq!(
            collapse_group(text, span, &ChoiceDecision::Resolved(false)),
            "Wij adviseren dekking."
        );
    }

    #[test]
    fn test_collapse_all_works_right_to_left() {
        let text = "A (x/y) B (p/q) C";
        let groups: Vec<_> = scan(text)
            .into_iter()
            .map(|t| t.span().clone())
            .zip([ChoiceDecision::Resolved(true), ChoiceDecision::Resolved(false)])
            .collect();
        assert_eq!(collapse_all(text, &groups), "A y B p C");
    }

    #[test]
    fn test_collapse_all_skips_spans_nested_in_another_group() {
        let text = "Klant wil (geen dekking []/wel dekking) nu.";
        let groups: Vec<_> = scan(text)
            .into_iter()
            .filter(Token::is_group)
            .map(|t| (t.span().clone(), ChoiceDecision::Resolved(true)))
            .collect();
        assert_eq!(groups.len(), 2);
        assert_eq!(collapse_all(text, &groups), "Klant wil wel dekking nu.");
    }

    #[test]
    fn test_collapsing_twice_is_noop() {
        let text = "A (x/y) B";
        let groups = vec![(first_group(text), ChoiceDecision::Resolved(true))];
        let once = collapse_all(text, &groups);
        let remaining: Vec<_> = scan(&once)
            .into_iter()
            .filter(Token::is_group)
            .map(|t| (t.span().clone(), ChoiceDecision::Resolved(true)))
            .collect();
        assert!(remaining.is_empty());
        assert_eq!(collapse_all(&once, &remaining), once);
    }

    #[test]
    fn test_resolved_on_single_char_span_becomes_marker() {
        assert_eq!(
            collapse_group("a ( b", 2..3, &ChoiceDecision::Resolved(true)),
            "a [MISSING: onvolledige keuze in sjabloon] b"
        );
    }
}
