//! Input normalizer: cleans up pasted intake text before it reaches the
//! screener, the oracle and the research context.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n)+").unwrap());
static INLINE_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static SPACE_BEFORE_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([.,!?;:])").unwrap());

pub fn normalize_input(raw: &str) -> String {
    let text = dedent(raw);
    let text: String = text.trim().nfkc().collect();
    let text = text.replace("\r\n", "\n");
    let text = BLANK_LINES_RE.replace_all(&text, "\n");
    let text = INLINE_SPACE_RE.replace_all(&text, " ");
    let text = text
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    SPACE_BEFORE_PUNCT_RE.replace_all(&text, "$1").into_owned()
}

/// Removes the space/tab prefix shared by every non-blank line.
fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(leading_blanks)
        .min()
        .unwrap_or(0);

    text.lines()
        .map(|l| &l[leading_blanks(l).min(indent)..])
        .collect::<Vec<_>>()
        .join("\n")
}

/// Byte length of the leading run of ASCII spaces and tabs.
fn leading_blanks(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}
