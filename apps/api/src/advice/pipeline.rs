//! Fill pipeline: catalog → classify → lookup → research → fill.
//!
//! Soft failures (no subcategory, store miss, missing data) end up in the
//! document. Oracle and store errors abort the request; no partial document is
//! ever returned.

use tracing::info;

use crate::advice::catalog::TemplateMatch;
use crate::advice::classifier::classify_narrative;
use crate::advice::filler::{FilledDocument, TemplateFiller};
use crate::advice::oracle::Oracle;
use crate::advice::prompts::RESEARCH_PROMPT_TEMPLATE;
use crate::advice::research::ResearchContext;
use crate::advice::rules::RuleTable;
use crate::advice::scanner::{scan, Token};
use crate::errors::AppError;
use crate::llm_client::prompts::NO_INVENTION_INSTRUCTION;
use crate::templates::store::TemplateStore;

pub struct AdvicePipeline<'a> {
    oracle: &'a dyn Oracle,
    store: &'a dyn TemplateStore,
    rules: &'a RuleTable,
}

impl<'a> AdvicePipeline<'a> {
    pub fn new(oracle: &'a dyn Oracle, store: &'a dyn TemplateStore, rules: &'a RuleTable) -> Self {
        Self {
            oracle,
            store,
            rules,
        }
    }

    pub async fn run(&self, narrative: &str) -> Result<FilledDocument, AppError> {
        let catalog = self.store.catalog().await?;
        let classifications = classify_narrative(self.oracle, narrative, &catalog).await?;
        let matches = self.store.lookup_templates(&classifications).await?;

        let found = matches.iter().filter(|m| m.text.is_some()).count();
        info!(
            categories = matches.len(),
            templates_found = found,
            "templates looked up"
        );

        let notes = if found > 0 {
            let prompt = research_prompt(&matches);
            Some(self.oracle.generate(&prompt, narrative).await?)
        } else {
            None
        };
        let context = ResearchContext::new(narrative, notes.as_deref());

        let document = TemplateFiller::new(self.rules).fill_document(&matches, &context);
        info!(
            fragments = document.fragments.len(),
            missing = document.missing.len(),
            "document filled"
        );
        Ok(document)
    }
}

/// Lists the placeholders and choice groups of all found templates.
fn research_prompt(matches: &[TemplateMatch]) -> String {
    let mut placeholders: Vec<String> = Vec::new();
    let mut choices: Vec<String> = Vec::new();

    for text in matches.iter().filter_map(|m| m.text.as_deref()) {
        for token in scan(text) {
            match token {
                Token::Placeholder { name, .. } => {
                    let line = format!("- {name}");
                    if !placeholders.contains(&line) {
                        placeholders.push(line);
                    }
                }
                Token::Choice {
                    negative, positive, ..
                } => {
                    let line = format!("- '{negative}' of '{positive}'");
                    if !choices.contains(&line) {
                        choices.push(line);
                    }
                }
                Token::Malformed { .. } => {}
            }
        }
    }

    let or_none = |lines: Vec<String>| {
        if lines.is_empty() {
            "- geen".to_string()
        } else {
            lines.join("\n")
        }
    };

    RESEARCH_PROMPT_TEMPLATE
        .replace("{placeholders}", &or_none(placeholders))
        .replace("{choices}", &or_none(choices))
        .replace("{no_invention}", NO_INVENTION_INSTRUCTION.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::catalog::Classification;
    use crate::advice::filler::FALLBACK_SENTENCE;
    use crate::advice::testing::{InMemoryTemplateStore, StubOracle};

    const CHOICE_TEMPLATE: &str = "Klant wil (geen dekking/wel dekking). U volgt [volgt_advies_op]";

    #[tokio::test]
    async fn test_scenario_fully_resolved_document() {
        let store = InMemoryTemplateStore::new().with_template(
            "damage_by_standstill",
            "minrisk",
            CHOICE_TEMPLATE,
        );
        let oracle = StubOracle::new().with_classifications(vec![Classification::new(
            "damage_by_standstill",
            Some("minrisk"),
        )]);
        let rules = RuleTable::standard();

        let document = AdvicePipeline::new(&oracle, &store, &rules)
            .run("De klant wil wel dekking en volgt het advies op.")
            .await
            .expect("pipeline");

        assert_eq!(document.fragments.len(), 1);
        assert_eq!(document.fragments[0].text, "Klant wil wel dekking. U volgt mijn advies op.");
        assert!(!document.has_missing());
    }

    #[tokio::test]
    async fn test_research_notes_resolve_what_the_narrative_leaves_implicit() {
        let store = InMemoryTemplateStore::new().with_template(
            "damage_by_standstill",
            "minrisk",
            CHOICE_TEMPLATE,
        );
        let oracle = StubOracle::new()
            .with_classifications(vec![Classification::new(
                "damage_by_standstill",
                Some("minrisk"),
            )])
            .with_notes("keuze: wel dekking\nvolgt_advies_op: ja");
        let rules = RuleTable::standard();

        let document = AdvicePipeline::new(&oracle, &store, &rules)
            .run("Klant is het eens met de aanpak.")
            .await
            .expect("pipeline");

        assert_eq!(document.fragments[0].text, "Klant wil wel dekking. U volgt mijn advies op.");
        assert_eq!(oracle.generate_calls().len(), 1);
        assert!(oracle.generate_calls()[0].contains("- volgt_advies_op"));
    }

    #[tokio::test]
    async fn test_scenario_four_categories_one_null() {
        let store = InMemoryTemplateStore::new()
            .with_template("a_cat", "minrisk", "Klant wil (geen dekking/wel dekking).")
            .with_template("b_cat", "minrisk", "Geen tokens.")
            .with_template("c_cat", "minrisk", "U volgt [volgt_advies_op]")
            .with_sub_category("d_cat", "minrisk");
        let oracle = StubOracle::new().with_classifications(vec![
            Classification::new("a_cat", Some("minrisk")),
            Classification::new("b_cat", Some("minrisk")),
            Classification::new("c_cat", Some("minrisk")),
            Classification::new("d_cat", None),
        ]);
        let rules = RuleTable::standard();

        let document = AdvicePipeline::new(&oracle, &store, &rules)
            .run("De klant wil wel dekking.")
            .await
            .expect("pipeline");

        let categories: Vec<_> = document.fragments.iter().map(|f| f.category.as_str()).collect();
        assert_eq!(categories, vec!["a_cat", "b_cat", "c_cat", "d_cat"]);
        assert_eq!(document.fragments[3].text, FALLBACK_SENTENCE);
        assert_eq!(document.missing.len(), 1);
        assert_eq!(document.missing[0].category, "c_cat");
        assert!(document.render().contains("- C cat: keuze wel/niet advies opvolgen"));
    }

    #[tokio::test]
    async fn test_no_templates_found_skips_research() {
        let store = InMemoryTemplateStore::new().with_category("loss_of_personal_items");
        let oracle = StubOracle::new();
        let rules = RuleTable::standard();

        let document = AdvicePipeline::new(&oracle, &store, &rules)
            .run("Iets over verzekeringen.")
            .await
            .expect("pipeline");

        assert_eq!(document.fragments[0].text, FALLBACK_SENTENCE);
        assert!(oracle.generate_calls().is_empty());
    }

    #[tokio::test]
    async fn test_oracle_failure_aborts_without_document() {
        let store = InMemoryTemplateStore::new().with_template("a_cat", "minrisk", CHOICE_TEMPLATE);
        let oracle = StubOracle::failing();
        let rules = RuleTable::standard();

        let result = AdvicePipeline::new(&oracle, &store, &rules).run("tekst").await;
        assert!(matches!(result, Err(AppError::Llm(_))));
    }

    #[test]
    fn test_research_prompt_lists_tokens_once() {
        let matches = vec![
            TemplateMatch {
                category: "a".into(),
                sub_category: Some("x".into()),
                text: Some("[eigen_risico] (a/b) [eigen_risico]".into()),
            },
            TemplateMatch {
                category: "b".into(),
                sub_category: None,
                text: None,
            },
        ];
        let prompt = research_prompt(&matches);
        assert_eq!(prompt.matches("- eigen_risico\n").count(), 1);
        assert!(prompt.contains("- 'a' of 'b'"));
        assert!(!prompt.contains("{no_invention}"));
    }
}
