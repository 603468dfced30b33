//! Placeholder resolver: classifies every token of one template as resolved
//! (with its value or decision) or missing, using the rule table and the
//! research context.

use std::ops::Range;

use tracing::warn;

use crate::advice::collapser::describe_choice;
use crate::advice::research::{states_amount, ResearchContext};
use crate::advice::rules::{
    AmountSlot, PlaceholderRule, RuleTable, ACCEPTED_CLAUSE, DECLINED_CLAUSE,
    DECLINE_REASON_PLACEHOLDER,
};
use crate::advice::scanner::{missing_marker, scan, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Placeholder,
    Choice,
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Value(String),
    /// Decision for a choice group; `true` keeps the second side.
    Choice(bool),
    /// Several matching values were found; all are reported.
    Candidates(Vec<String>),
    Missing(String),
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Resolution::Missing(_))
    }

    /// Text substituted for a placeholder.
    pub fn render(&self) -> String {
        match self {
            Resolution::Value(value) => value.clone(),
            Resolution::Candidates(values) => values.join(" of "),
            Resolution::Missing(description) => missing_marker(description),
            Resolution::Choice(_) => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub token: Token,
    pub kind: TokenKind,
    pub resolution: Resolution,
}

impl ResolvedToken {
    pub fn span(&self) -> &Range<usize> {
        self.token.span()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateResolution {
    pub tokens: Vec<ResolvedToken>,
    /// False only when the template has tokens and none of them resolved.
    /// Advisory; filling always proceeds.
    pub can_proceed: bool,
}

impl TemplateResolution {
    pub fn missing_count(&self) -> usize {
        self.tokens
            .iter()
            .filter(|t| !t.resolution.is_resolved())
            .count()
    }
}

pub struct PlaceholderResolver<'a> {
    rules: &'a RuleTable,
    context: &'a ResearchContext,
}

impl<'a> PlaceholderResolver<'a> {
    pub fn new(rules: &'a RuleTable, context: &'a ResearchContext) -> Self {
        Self { rules, context }
    }

    pub fn resolve(&self, text: &str) -> TemplateResolution {
        let tokens: Vec<ResolvedToken> = scan(text)
            .into_iter()
            .map(|token| self.resolve_token(token))
            .collect();
        let can_proceed = tokens.is_empty() || tokens.iter().any(|t| t.resolution.is_resolved());
        TemplateResolution {
            tokens,
            can_proceed,
        }
    }

    fn resolve_token(&self, token: Token) -> ResolvedToken {
        let (kind, resolution) = match &token {
            Token::Placeholder { name, .. } => {
                (TokenKind::Placeholder, self.resolve_placeholder(name))
            }
            Token::Choice {
                negative, positive, ..
            } => (TokenKind::Choice, self.resolve_choice(negative, positive)),
            Token::Malformed { reason, span } => {
                warn!(?reason, ?span, "malformed template syntax");
                (
                    TokenKind::Malformed,
                    Resolution::Missing(reason.description().to_string()),
                )
            }
        };
        ResolvedToken {
            token,
            kind,
            resolution,
        }
    }

    pub fn resolve_placeholder(&self, name: &str) -> Resolution {
        let rule = self.rules.rule_for(name);
        let missing = || Resolution::Missing(rule.missing_description(name));
        let explicit = self.context.fact(name).map(|v| clean_value(&v));

        match rule {
            PlaceholderRule::AdviceAcceptance => match self.context.advice_acceptance() {
                Some(true) => Resolution::Value(ACCEPTED_CLAUSE.to_string()),
                Some(false) => Resolution::Value(self.declined_clause()),
                None => missing(),
            },
            PlaceholderRule::DeclineReason => match self.context.decline_reason() {
                Some(reason) => Resolution::Value(clean_value(&reason)),
                None => missing(),
            },
            PlaceholderRule::Amount(slot) => {
                if let Some(value) = explicit.filter(|v| states_amount(v, slot)) {
                    return Resolution::Value(value);
                }
                self.resolve_amount(name, slot).unwrap_or_else(missing)
            }
            PlaceholderRule::CoverageType => {
                if let Some(value) = explicit {
                    return Resolution::Value(value);
                }
                let terms = self.context.coverage_terms();
                if terms.is_empty() {
                    missing()
                } else {
                    Resolution::Value(terms.join(" en "))
                }
            }
            PlaceholderRule::ClientIdentity { default } => {
                Resolution::Value(explicit.unwrap_or_else(|| default.to_string()))
            }
            PlaceholderRule::Generic => explicit.map(Resolution::Value).unwrap_or_else(missing),
        }
    }

    fn resolve_amount(&self, name: &str, slot: AmountSlot) -> Option<Resolution> {
        let amounts = self.context.amounts_for(slot);
        match amounts.len() {
            0 if slot == AmountSlot::InsuredAmount => {
                self.context.insured_basis().map(Resolution::Value)
            }
            0 => None,
            1 => amounts.into_iter().next().map(Resolution::Value),
            _ => {
                warn!(placeholder = name, ?amounts, "several amounts match one placeholder");
                Some(Resolution::Candidates(amounts))
            }
        }
    }

    /// The declined clause with its reason sub-placeholder already filled.
    fn declined_clause(&self) -> String {
        let reason = self.resolve_placeholder(DECLINE_REASON_PLACEHOLDER);
        DECLINED_CLAUSE.replace(&format!("[{DECLINE_REASON_PLACEHOLDER}]"), &reason.render())
    }

    pub fn resolve_choice(&self, negative: &str, positive: &str) -> Resolution {
        match self.context.choice_decision(negative, positive) {
            Some(decision) => Resolution::Choice(decision),
            None => Resolution::Missing(describe_choice(negative, positive)),
        }
    }
}

/// Context values never carry template delimiters into the output.
fn clean_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '(' | ')'))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(text: &str, narrative: &str) -> TemplateResolution {
        let rules = RuleTable::standard();
        let ctx = ResearchContext::from_narrative(narrative);
        PlaceholderResolver::new(&rules, &ctx).resolve(text)
    }

    #[test]
    fn test_acceptance_and_choice_resolve_from_narrative() {
        let resolution = resolve(
            "Klant wil (geen dekking/wel dekking). U volgt [volgt_advies_op]",
            "De klant wil wel dekking en volgt het advies op.",
        );
        assert!(resolution.can_proceed);
        assert_eq!(resolution.tokens[0].kind, TokenKind::Choice);
        assert_eq!(resolution.tokens[0].resolution, Resolution::Choice(true));
        assert_eq!(
            resolution.tokens[1].resolution,
            Resolution::Value(ACCEPTED_CLAUSE.to_string())
        );
    }

    #[test]
    fn test_missing_acceptance_is_marked_not_guessed() {
        let resolution = resolve("U volgt [volgt_advies_op]", "De klant heeft drie trekkers.");
        assert_eq!(
            resolution.tokens[0].resolution,
            Resolution::Missing("keuze wel/niet advies opvolgen".into())
        );
        assert!(!resolution.can_proceed);
    }

    #[test]
    fn test_declined_clause_carries_reason() {
        let resolution = resolve(
            "U volgt [volgt_advies_op]",
            "De klant volgt het advies niet op, omdat hij de premie te hoog vindt.",
        );
        let Resolution::Value(value) = &resolution.tokens[0].resolution else {
            panic!("expected value");
        };
        assert!(value.starts_with("mijn advies niet op, omdat u de premie te hoog vindt."));
        assert!(!value.contains('['));
    }

    #[test]
    fn test_declined_clause_without_reason_marks_reason_missing() {
        let resolution = resolve("U volgt [volgt_advies_op]", "De klant volgt het advies niet op.");
        assert!(resolution.tokens[0]
            .resolution
            .render()
            .contains("[MISSING: reden om het advies niet op te volgen]"));
    }

    #[test]
    fn test_multiple_amounts_are_candidates() {
        let resolution = resolve(
            "een eigen risico van [eigen_risico]",
            "Eigen risico € 500 voor de trekker, eigen risico € 1.000 voor de oplegger.",
        );
        assert_eq!(
            resolution.tokens[0].resolution,
            Resolution::Candidates(vec!["€ 500".into(), "€ 1.000".into()])
        );
        assert_eq!(resolution.tokens[0].resolution.render(), "€ 500 of € 1.000");
    }

    #[test]
    fn test_insured_amount_falls_back_to_basis() {
        let resolution = resolve(
            "op basis van [basis_verzekerd_bedrag]",
            "Verzekeren tegen dagwaarde.",
        );
        assert_eq!(
            resolution.tokens[0].resolution,
            Resolution::Value("de dagwaarde".into())
        );
    }

    #[test]
    fn test_coverage_type_from_terms() {
        let resolution = resolve("de [verzekering_soort] dekking", "Klant kiest volledig casco.");
        assert_eq!(
            resolution.tokens[0].resolution,
            Resolution::Value("volledig casco".into())
        );
    }

    #[test]
    fn test_client_identity_defaults_instead_of_missing() {
        let resolution = resolve("[klant] heeft gekozen", "Geen naam genoemd.");
        assert_eq!(resolution.tokens[0].resolution, Resolution::Value("de klant".into()));
    }

    #[test]
    fn test_generic_needs_explicit_fact() {
        let missing = resolve("[aantal_voertuigen] voertuigen", "Een paar voertuigen.");
        assert_eq!(
            missing.tokens[0].resolution,
            Resolution::Missing("aantal voertuigen".into())
        );

        let found = resolve("[aantal_voertuigen] voertuigen", "aantal voertuigen: 12");
        assert_eq!(found.tokens[0].resolution, Resolution::Value("12".into()));
    }

    #[test]
    fn test_amount_fact_without_amount_is_ignored() {
        let rules = RuleTable::standard();
        let ctx = ResearchContext::new("Gesprek met de klant.", Some("eigen risico: ja graag"));
        let resolver = PlaceholderResolver::new(&rules, &ctx);
        assert_eq!(
            resolver.resolve_placeholder("eigen_risico"),
            Resolution::Missing(rules.rule_for("eigen_risico").missing_description("eigen_risico"))
        );

        let ctx = ResearchContext::new("Gesprek met de klant.", Some("eigen risico: € 500"));
        let resolver = PlaceholderResolver::new(&rules, &ctx);
        assert_eq!(
            resolver.resolve_placeholder("eigen_risico"),
            Resolution::Value("€ 500".into())
        );

        let ctx = ResearchContext::new("Gesprek.", Some("verzekerd bedrag: de dagwaarde"));
        let resolver = PlaceholderResolver::new(&rules, &ctx);
        assert_eq!(
            resolver.resolve_placeholder("verzekerd_bedrag"),
            Resolution::Value("de dagwaarde".into())
        );
    }

    #[test]
    fn test_malformed_group_is_missing() {
        let resolution = resolve("zie (polis)", "");
        assert_eq!(resolution.tokens[0].kind, TokenKind::Malformed);
        assert!(!resolution.tokens[0].resolution.is_resolved());
    }

    #[test]
    fn test_template_without_tokens_can_proceed() {
        let resolution = resolve("Hierover wordt niet geadviseerd.", "");
        assert!(resolution.tokens.is_empty());
        assert!(resolution.can_proceed);
        assert_eq!(resolution.missing_count(), 0);
    }
}
