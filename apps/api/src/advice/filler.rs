//! Template filler: runs resolver and collapser over every found template and
//! assembles the per-category fragments into one document.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::advice::catalog::{category_label, TemplateMatch};
use crate::advice::collapser::{collapse_all, ChoiceDecision};
use crate::advice::research::ResearchContext;
use crate::advice::resolver::{PlaceholderResolver, Resolution, ResolvedToken, TokenKind};
use crate::advice::rules::RuleTable;
use crate::advice::scanner::{missing_markers, scan, Token};

/// Emitted verbatim for every category without an applicable template.
pub const FALLBACK_SENTENCE: &str = "Over dit deel is geen advies gegeven.";

/// Heading of the consolidated missing-items section.
pub const MISSING_SECTION_TITLE: &str = "Ontbrekende gegevens:";

/// Upper bound on collapse passes for nested groups.
const MAX_GROUP_PASSES: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub category: String,
    pub label: String,
    pub text: String,
    /// False when the fallback sentence was emitted.
    pub from_template: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingItem {
    pub category: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilledDocument {
    pub fragments: Vec<Fragment>,
    pub missing: Vec<MissingItem>,
}

impl FilledDocument {
    pub fn has_missing(&self) -> bool {
        !self.missing.is_empty()
    }

    /// Plain-text rendering: label line plus text per fragment, blank line
    /// between fragments, missing-items section last.
    pub fn render(&self) -> String {
        let mut out = self
            .fragments
            .iter()
            .map(|f| format!("{}\n{}", f.label, f.text))
            .collect::<Vec<_>>()
            .join("\n\n");

        if self.has_missing() {
            out.push_str("\n\n");
            out.push_str(MISSING_SECTION_TITLE);
            for item in &self.missing {
                let label = category_label(&item.category);
                out.push_str(&format!("\n- {label}: {}", item.description));
            }
        }
        out
    }
}

pub struct TemplateFiller<'a> {
    rules: &'a RuleTable,
}

impl<'a> TemplateFiller<'a> {
    pub fn new(rules: &'a RuleTable) -> Self {
        Self { rules }
    }

    /// Builds one fragment per entry, in entry order. Entries without text get
    /// the fallback sentence.
    pub fn fill_document(
        &self,
        entries: &[TemplateMatch],
        context: &ResearchContext,
    ) -> FilledDocument {
        let mut document = FilledDocument::default();

        for entry in entries {
            let fragment = match &entry.text {
                Some(template) => Fragment {
                    category: entry.category.clone(),
                    label: category_label(&entry.category),
                    text: self.fill_template(template, context),
                    from_template: true,
                },
                None => Fragment {
                    category: entry.category.clone(),
                    label: category_label(&entry.category),
                    text: FALLBACK_SENTENCE.to_string(),
                    from_template: false,
                },
            };

            let mut seen: Vec<String> = Vec::new();
            for description in missing_markers(&fragment.text) {
                if !seen.contains(&description) {
                    seen.push(description.clone());
                    document.missing.push(MissingItem {
                        category: entry.category.clone(),
                        description,
                    });
                }
            }
            document.fragments.push(fragment);
        }

        document
    }

    /// Fills a single template. Text without tokens comes back unchanged.
    pub fn fill_template(&self, template: &str, context: &ResearchContext) -> String {
        let resolver = PlaceholderResolver::new(self.rules, context);
        let first = resolver.resolve(template);
        if first.tokens.is_empty() {
            return template.to_string();
        }
        debug!(
            tokens = first.tokens.len(),
            missing = first.missing_count(),
            can_proceed = first.can_proceed,
            "resolved template"
        );

        let mut values: HashMap<String, Resolution> = HashMap::new();
        let mut text = template.to_string();
        let mut resolution = first;

        // Every collapse removes at least one delimiter, so the loop ends.
        // After MAX_GROUP_PASSES, remaining groups are forced to markers.
        let mut pass = 0;
        loop {
            for token in &resolution.tokens {
                if let Token::Placeholder { name, .. } = &token.token {
                    values
                        .entry(name.clone())
                        .or_insert_with(|| token.resolution.clone());
                }
            }

            let force_unresolved = pass + 1 >= MAX_GROUP_PASSES;
            let groups: Vec<_> = resolution
                .tokens
                .iter()
                .filter(|t| t.kind != TokenKind::Placeholder)
                .map(|t| (t.span().clone(), group_decision(t, force_unresolved)))
                .collect();
            if groups.is_empty() {
                break;
            }
            text = collapse_all(&text, &groups);
            resolution = resolver.resolve(&text);
            pass += 1;
        }

        substitute_placeholders(&text, &values, &resolver)
    }
}

fn group_decision(token: &ResolvedToken, force_unresolved: bool) -> ChoiceDecision {
    match &token.resolution {
        Resolution::Choice(decision) if !force_unresolved => ChoiceDecision::Resolved(*decision),
        Resolution::Missing(description) => ChoiceDecision::Unresolved(description.clone()),
        _ => ChoiceDecision::Unresolved("geneste keuze in sjabloon".to_string()),
    }
}

/// Replaces every remaining `[name]`, right to left.
fn substitute_placeholders(
    text: &str,
    values: &HashMap<String, Resolution>,
    resolver: &PlaceholderResolver<'_>,
) -> String {
    let mut out = text.to_string();
    let mut placeholders: Vec<Token> = scan(text)
        .into_iter()
        .filter(|t| matches!(t, Token::Placeholder { .. }))
        .collect();
    placeholders.sort_by_key(|t| std::cmp::Reverse(t.span().start));

    for token in placeholders {
        let Token::Placeholder { name, span } = token else {
            continue;
        };
        let rendered = match values.get(&name) {
            Some(resolution) => resolution.render(),
            None => resolver.resolve_placeholder(&name).render(),
        };
        out.replace_range(span, &rendered);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(template: &str, narrative: &str) -> String {
        let rules = RuleTable::standard();
        let ctx = ResearchContext::from_narrative(narrative);
        TemplateFiller::new(&rules).fill_template(template, &ctx)
    }

    fn entry(category: &str, text: Option<&str>) -> TemplateMatch {
        TemplateMatch {
            category: category.to_string(),
            sub_category: text.map(|_| "minrisk".to_string()),
            text: text.map(str::to_string),
        }
    }

    #[test]
    fn test_fully_resolved_scenario() {
        assert_eq!(
            fill(
                "Klant wil (geen dekking/wel dekking). U volgt [volgt_advies_op]",
                "De klant wil wel dekking en volgt het advies op."
            ),
            "Klant wil wel dekking. U volgt mijn advies op."
        );
    }

    #[test]
    fn test_missing_acceptance_scenario() {
        let rules = RuleTable::standard();
        let ctx = ResearchContext::from_narrative("De klant wil wel dekking.");
        let doc = TemplateFiller::new(&rules).fill_document(
            &[entry(
                "damage_by_standstill",
                Some("Klant wil (geen dekking/wel dekking). U volgt [volgt_advies_op]"),
            )],
            &ctx,
        );
        assert_eq!(
            doc.fragments[0].text,
            "Klant wil wel dekking. U volgt [MISSING: keuze wel/niet advies opvolgen]"
        );
        assert_eq!(
            doc.missing,
            vec![MissingItem {
                category: "damage_by_standstill".into(),
                description: "keuze wel/niet advies opvolgen".into(),
            }]
        );
        assert!(doc.render().ends_with(
            "Ontbrekende gegevens:\n- Damage by standstill: keuze wel/niet advies opvolgen"
        ));
    }

    #[test]
    fn test_template_without_tokens_is_unchanged() {
        let text = "Hierover wordt niet geadviseerd.";
        assert_eq!(fill(text, "wat dan ook"), text);
    }

    #[test]
    fn test_null_entry_gets_fallback_verbatim() {
        let rules = RuleTable::standard();
        let ctx = ResearchContext::from_narrative("");
        let doc = TemplateFiller::new(&rules)
            .fill_document(&[entry("loss_of_personal_items", None)], &ctx);
        assert_eq!(doc.fragments[0].text, FALLBACK_SENTENCE);
        assert!(!doc.fragments[0].from_template);
        assert!(!doc.has_missing());
    }

    #[test]
    fn test_four_categories_keep_order_and_summary_only_when_needed() {
        let rules = RuleTable::standard();
        let ctx = ResearchContext::from_narrative("De klant wil wel dekking.");
        let entries = vec![
            entry("a_cat", Some("Klant wil (geen dekking/wel dekking).")),
            entry("b_cat", None),
            entry("c_cat", Some("Geen tokens hier.")),
            entry("d_cat", Some("Ook (geen dekking/wel dekking) hier.")),
        ];
        let doc = TemplateFiller::new(&rules).fill_document(&entries, &ctx);
        let cats: Vec<_> = doc.fragments.iter().map(|f| f.category.as_str()).collect();
        assert_eq!(cats, vec!["a_cat", "b_cat", "c_cat", "d_cat"]);
        assert_eq!(doc.fragments[1].text, FALLBACK_SENTENCE);
        assert!(!doc.has_missing());
        assert!(!doc.render().contains(MISSING_SECTION_TITLE));
    }

    #[test]
    fn test_nested_groups_collapse_inside_out() {
        let out = fill(
            "U kiest (geen dekking/ een dekking met (een eigen risico/geen eigen risico)).",
            "De klant wil een dekking met geen eigen risico.",
        );
        assert_eq!(out, "U kiest een dekking met geen eigen risico.");
    }

    #[test]
    fn test_placeholder_in_kept_side_is_substituted() {
        let out = fill(
            "Wij adviseren (geen eigen risico./een eigen risico van [eigen_risico].)",
            "De klant kiest een eigen risico van € 250.",
        );
        assert_eq!(out, "Wij adviseren een eigen risico van € 250.");
    }

    #[test]
    fn test_malformed_group_becomes_marker() {
        let out = fill("Zie (de polis) voor details.", "");
        assert_eq!(out, "Zie [MISSING: keuze zonder opties in sjabloon] voor details.");
    }

    #[test]
    fn test_malformed_placeholder_inside_choice() {
        assert_eq!(
            fill("Klant wil (geen dekking []/wel dekking) nu.", "De klant wil geen dekking."),
            "Klant wil geen dekking [MISSING: onleesbaar invulveld in sjabloon] nu."
        );
        assert_eq!(
            fill("Zie (a [b/c) einde.", ""),
            "Zie [MISSING: keuze zonder opties in sjabloon] einde."
        );
    }

    #[test]
    fn test_filling_filled_text_is_noop() {
        let once = fill(
            "Klant wil (geen dekking/wel dekking). U volgt [volgt_advies_op]",
            "De klant wil wel dekking.",
        );
        assert_eq!(fill(&once, "De klant wil wel dekking."), once);
    }

    #[test]
    fn test_output_has_no_stray_template_syntax() {
        let out = fill(
            "A (x/y) [onbekend_veld] (p/q/r) ) einde",
            "niets bruikbaars",
        );
        let outside_markers = out
            .split("[MISSING:")
            .enumerate()
            .map(|(i, part)| {
                if i == 0 {
                    part
                } else {
                    part.split_once(']').map(|(_, rest)| rest).unwrap_or("")
                }
            })
            .collect::<String>();
        assert!(!outside_markers.contains(['[', ']', '(', ')']), "{out}");
    }
}
