//! Research context: the client narrative plus the oracle's research notes,
//! with the deterministic lookups the resolver uses to fill placeholders and
//! decide choice groups.
//!
//! Nothing here guesses: a lookup that finds no signal, or conflicting signals,
//! returns `None`/empty and the caller marks the item missing.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::advice::rules::AmountSlot;

static FACT_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•]\s*)?([A-Za-z][A-Za-z0-9_ ]{0,40}?)\s*[:=]\s*(.+?)\s*$").unwrap()
});

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:€|\beur\b|\beuro\b)\s?(\d{1,3}(?:\.\d{3})+(?:,\d{1,2})?|\d+(?:,\d{1,2})?)|\b(\d{1,3}(?:\.\d{3})+(?:,\d{1,2})?|\d+(?:,\d{1,2})?)\s?(?:euro|eur)\b",
    )
    .unwrap()
});

static SENTENCE_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]\s+").unwrap());

static BRACKETED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap());

static OMDAT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bomdat\s+(.+)").unwrap());

/// Recognised coverage/liability terms: (lowercase pattern, display form).
const COVERAGE_TERMS: &[(&str, &str)] = &[
    ("wa + volledig casco", "WA + volledig casco"),
    ("wa volledig casco", "WA volledig casco"),
    ("wa + beperkt casco", "WA + beperkt casco"),
    ("wa beperkt casco", "WA beperkt casco"),
    ("schadeverzekering inzittenden", "schadeverzekering inzittenden"),
    ("wettelijke aansprakelijkheid", "wettelijke aansprakelijkheid"),
    ("extra bedrijfskosten", "extra bedrijfskosten"),
    ("diefstal bagage", "diefstal bagage"),
    ("brand/diefstal", "brand/diefstal"),
    ("volledig casco", "volledig casco"),
    ("beperkt casco", "beperkt casco"),
    ("aansprakelijkheid", "aansprakelijkheid"),
    ("bedrijfskosten", "bedrijfskosten"),
    ("casco", "casco"),
    ("svi", "SVI"),
    ("wa", "WA"),
];

static COVERAGE_RES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    let mut terms: Vec<_> = COVERAGE_TERMS.to_vec();
    terms.sort_by_key(|(pattern, _)| std::cmp::Reverse(pattern.len()));
    terms
        .into_iter()
        .map(|(pattern, display)| {
            let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(pattern))).unwrap();
            (re, display)
        })
        .collect()
});

/// Valuation bases accepted for the insured amount when no amount is given.
const INSURED_BASIS_TERMS: &[&str] = &[
    "dagwaarde",
    "nieuwwaarde",
    "cataloguswaarde",
    "aanschafwaarde",
    "vervangingswaarde",
];

const DECLINE_PHRASES: &[&str] = &[
    "volgt het advies niet op",
    "volgt mijn advies niet op",
    "volgt ons advies niet op",
    "volgt advies niet op",
    "advies wordt niet opgevolgd",
    "advies niet opvolgen",
    "niet akkoord met het advies",
    "wijst het advies af",
    "neemt het advies niet over",
    "accepteert het advies niet",
    "does not follow the advice",
    "declines the advice",
];

const ACCEPT_PHRASES: &[&str] = &[
    "volgt het advies op",
    "volgt mijn advies op",
    "volgt ons advies op",
    "volgt advies op",
    "advies wordt opgevolgd",
    "advies opvolgen",
    "akkoord met het advies",
    "neemt het advies over",
    "accepteert het advies",
    "follows the advice",
    "accepts the advice",
];

const ACCEPTANCE_FACT_KEYS: &[&str] = &[
    "volgt_advies_op",
    "volg_advies_op",
    "advies_opgevolgd",
    "advies_wordt_opgevolgd",
];

const REASON_FACT_KEYS: &[&str] = &["reden_niet_opvolgen", "reden"];

/// Subjects stripped from a decline reason so it reads after "omdat u".
const REASON_SUBJECTS: &[&str] = &[
    "de klant ",
    "klant ",
    "hij ",
    "zij ",
    "ze ",
    "u ",
    "wij ",
    "we ",
];

const UNKNOWN_VALUES: &[&str] = &["onbekend", "unknown", "null", "none", "n.v.t.", "nvt", "-", "?"];

#[derive(Debug, Clone)]
pub struct ResearchContext {
    text: String,
    facts: HashMap<String, Vec<String>>,
}

impl ResearchContext {
    pub fn new(narrative: &str, notes: Option<&str>) -> Self {
        let text = match notes {
            Some(notes) if !notes.trim().is_empty() => {
                format!("{}\n{}", narrative.trim(), notes.trim())
            }
            _ => narrative.trim().to_string(),
        };
        let facts = parse_facts(&text);
        Self { text, facts }
    }

    pub fn from_narrative(narrative: &str) -> Self {
        Self::new(narrative, None)
    }

    /// An explicit `key: value` fact. Conflicting values make it absent.
    pub fn fact(&self, key: &str) -> Option<String> {
        let values = self.facts.get(&normalize_key(key))?;
        let mut distinct: Vec<&String> = Vec::new();
        for value in values {
            if !distinct.iter().any(|d| d.eq_ignore_ascii_case(value)) {
                distinct.push(value);
            }
        }
        match distinct.as_slice() {
            [only] => Some((*only).clone()),
            _ => None,
        }
    }

    /// All values of facts whose key starts with `prefix`.
    fn facts_with_prefix(&self, prefix: &str) -> Vec<&str> {
        self.facts
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .flat_map(|(_, values)| values.iter().map(String::as_str))
            .collect()
    }

    /// `Some(true)` when the client accepts the advice, `Some(false)` when they
    /// decline, `None` when there is no signal or the signals conflict.
    pub fn advice_acceptance(&self) -> Option<bool> {
        let explicit: Vec<bool> = ACCEPTANCE_FACT_KEYS
            .iter()
            .filter_map(|key| self.fact(key))
            .filter_map(|value| parse_yes_no(&value))
            .collect();
        if !explicit.is_empty() {
            return if explicit.iter().all(|v| *v == explicit[0]) {
                Some(explicit[0])
            } else {
                None
            };
        }

        let mut lower = self.text.to_lowercase();
        let declined = DECLINE_PHRASES.iter().any(|p| lower.contains(p));
        // Blank out decline phrases so "niet akkoord met het advies" does not
        // also count as "akkoord met het advies".
        for phrase in DECLINE_PHRASES {
            lower = lower.replace(phrase, " ");
        }
        let accepted = ACCEPT_PHRASES.iter().any(|p| lower.contains(p));

        match (accepted, declined) {
            (true, false) => Some(true),
            (false, true) => Some(false),
            _ => None,
        }
    }

    /// Why the client declines the advice, phrased to follow "omdat u".
    pub fn decline_reason(&self) -> Option<String> {
        if let Some(reason) = REASON_FACT_KEYS.iter().find_map(|key| self.fact(key)) {
            return Some(tidy_reason(&reason));
        }
        self.sentences()
            .into_iter()
            .filter(|s| {
                let lower = s.to_lowercase();
                DECLINE_PHRASES.iter().any(|p| lower.contains(p))
            })
            .find_map(|s| {
                let clause = OMDAT_RE.captures(s)?.get(1)?;
                let reason = tidy_reason(clause.as_str());
                (!reason.is_empty()).then_some(reason)
            })
    }

    /// Every distinct currency amount stated in a sentence that mentions the
    /// slot, in order of appearance, formatted as `€ 1.000`.
    pub fn amounts_for(&self, slot: AmountSlot) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for sentence in self.sentences() {
            let lower = sentence.to_lowercase();
            if !slot.keywords().iter().any(|k| lower.contains(k)) {
                continue;
            }
            for amount in extract_amounts(sentence) {
                if !found.contains(&amount) {
                    found.push(amount);
                }
            }
        }
        found
    }

    /// The valuation basis ("de dagwaarde") when one is named.
    pub fn insured_basis(&self) -> Option<String> {
        let lower = self.text.to_lowercase();
        let named: Vec<&str> = INSURED_BASIS_TERMS
            .iter()
            .copied()
            .filter(|term| lower.contains(term))
            .collect();
        match named.as_slice() {
            [only] => Some(format!("de {only}")),
            _ => None,
        }
    }

    /// Recognised coverage terms in order of appearance, longest match first
    /// where terms overlap.
    pub fn coverage_terms(&self) -> Vec<String> {
        let mut claimed: Vec<(usize, usize, &str)> = Vec::new();
        for (re, display) in COVERAGE_RES.iter() {
            for m in re.find_iter(&self.text) {
                let overlaps = claimed
                    .iter()
                    .any(|(start, end, _)| m.start() < *end && *start < m.end());
                if !overlaps {
                    claimed.push((m.start(), m.end(), display));
                }
            }
        }
        claimed.sort_by_key(|(start, _, _)| *start);

        let mut terms: Vec<String> = Vec::new();
        for (_, _, display) in claimed {
            if !terms.iter().any(|t| t == display) {
                terms.push(display.to_string());
            }
        }
        terms
    }

    /// Decides a choice group. `Some(true)` keeps the second (positive) side,
    /// `Some(false)` the first (negative) side.
    ///
    /// Explicit `keuze`/`optie` facts take precedence; otherwise exactly one
    /// side's leading clause must appear literally in the context.
    pub fn choice_decision(&self, negative: &str, positive: &str) -> Option<bool> {
        let neg_key = leading_clause(negative);
        let pos_key = leading_clause(positive);
        if neg_key.is_empty() && pos_key.is_empty() {
            return None;
        }

        let stated: Vec<String> = self
            .facts_with_prefix("keuze")
            .into_iter()
            .chain(self.facts_with_prefix("optie"))
            .map(normalize_phrase)
            .filter(|v| !v.is_empty())
            .collect();
        if !stated.is_empty() {
            let neg_hit = stated.iter().any(|v| phrase_matches_statement(&neg_key, v));
            let pos_hit = stated.iter().any(|v| phrase_matches_statement(&pos_key, v));
            if let Some(decision) = pick_side(neg_hit, pos_hit, &neg_key, &pos_key) {
                return Some(decision);
            }
        }

        let haystack = format!(" {} ", normalize_phrase(&self.text));
        let neg_hit = !neg_key.is_empty() && haystack.contains(&format!(" {neg_key} "));
        let pos_hit = !pos_key.is_empty() && haystack.contains(&format!(" {pos_key} "));
        pick_side(neg_hit, pos_hit, &neg_key, &pos_key)
    }

    fn sentences(&self) -> Vec<&str> {
        self.text
            .lines()
            .flat_map(|line| SENTENCE_END_RE.split(line))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn parse_facts(text: &str) -> HashMap<String, Vec<String>> {
    let mut facts: HashMap<String, Vec<String>> = HashMap::new();
    for line in text.lines() {
        let Some(caps) = FACT_LINE_RE.captures(line) else {
            continue;
        };
        let value = caps[2].trim().trim_end_matches(['.', ';']).trim();
        if value.is_empty() || UNKNOWN_VALUES.contains(&value.to_lowercase().as_str()) {
            continue;
        }
        facts
            .entry(normalize_key(&caps[1]))
            .or_default()
            .push(value.to_string());
    }
    facts
}

fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

fn parse_yes_no(value: &str) -> Option<bool> {
    let lower = value.trim().to_lowercase();
    let first = lower.split_whitespace().next().unwrap_or("");
    match first.trim_matches(|c: char| !c.is_alphanumeric()) {
        "ja" | "yes" | "true" | "wel" | "opgevolgd" | "akkoord" => Some(true),
        "nee" | "no" | "false" | "niet" | "geen" => Some(false),
        _ => None,
    }
}

fn tidy_reason(raw: &str) -> String {
    let mut reason = raw
        .trim()
        .trim_end_matches(['.', '!', '?', ';'])
        .trim()
        .to_string();
    let subject = REASON_SUBJECTS.iter().find(|subject| {
        reason
            .get(..subject.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(subject))
    });
    if let Some(subject) = subject {
        reason = reason[subject.len()..].trim_start().to_string();
    }
    reason
}

/// Whether a stated value reads as an amount for `slot`: a currency amount,
/// or a valuation basis for the insured amount.
pub fn states_amount(value: &str, slot: AmountSlot) -> bool {
    if !extract_amounts(value).is_empty() {
        return true;
    }
    let lower = value.to_lowercase();
    slot == AmountSlot::InsuredAmount && INSURED_BASIS_TERMS.iter().any(|t| lower.contains(t))
}

/// Currency amounts in `sentence`, formatted as `€ <number>`.
fn extract_amounts(sentence: &str) -> Vec<String> {
    AMOUNT_RE
        .captures_iter(sentence)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| format!("€ {}", m.as_str()))
        .collect()
}

/// Lowercase, placeholder-free, punctuation-free rendering of `text`.
fn normalize_phrase(text: &str) -> String {
    let without_brackets = BRACKETED_RE.replace_all(text, " ");
    without_brackets
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// The normalised first clause of a choice side: text up to the first sentence
/// end, so long sides that carry follow-up sentences still match the narrative.
fn leading_clause(side: &str) -> String {
    let cut = SENTENCE_END_RE
        .find(side)
        .map(|m| &side[..m.start()])
        .unwrap_or(side);
    normalize_phrase(cut)
}

fn phrase_matches_statement(key: &str, statement: &str) -> bool {
    if key.is_empty() {
        return false;
    }
    let padded_statement = format!(" {statement} ");
    let padded_key = format!(" {key} ");
    padded_statement.contains(&padded_key)
        || (statement.split_whitespace().count() >= 2 && padded_key.contains(&padded_statement))
}

fn pick_side(neg_hit: bool, pos_hit: bool, neg_key: &str, pos_key: &str) -> Option<bool> {
    match (neg_hit, pos_hit) {
        (true, false) => Some(false),
        (false, true) => Some(true),
        // Both present: the longer clause explains the shorter one.
        (true, true) if format!(" {pos_key} ").contains(&format!(" {neg_key} ")) => Some(true),
        (true, true) if format!(" {neg_key} ").contains(&format!(" {pos_key} ")) => Some(false),
        _ => None,
    }
}
