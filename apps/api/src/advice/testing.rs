//! Deterministic test doubles for the oracle and the Template Store.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::advice::catalog::{Catalog, Classification, TemplateMatch};
use crate::advice::oracle::Oracle;
use crate::advice::prompts::SCREENING_PROMPT;
use crate::errors::AppError;
use crate::templates::store::{merge_lookup, TemplateStore};

/// Answers `classify` with a fixed list, screening prompts with a fixed
/// verdict and every other `generate` call with fixed research notes.
pub struct StubOracle {
    classifications: Vec<Classification>,
    screening: String,
    notes: String,
    fail: bool,
    generate_calls: Mutex<Vec<String>>,
}

impl StubOracle {
    pub fn new() -> Self {
        Self {
            classifications: Vec::new(),
            screening: "YES".to_string(),
            notes: String::new(),
            fail: false,
            generate_calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails like an unreachable model.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_classifications(mut self, classifications: Vec<Classification>) -> Self {
        self.classifications = classifications;
        self
    }

    pub fn with_screening(mut self, answer: &str) -> Self {
        self.screening = answer.to_string();
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = notes.to_string();
        self
    }

    /// Prompts passed to `generate`, in call order.
    pub fn generate_calls(&self) -> Vec<String> {
        self.generate_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Oracle for StubOracle {
    async fn classify(
        &self,
        _narrative: &str,
        _catalog: &Catalog,
    ) -> Result<Vec<Classification>, AppError> {
        if self.fail {
            return Err(AppError::Llm("stub oracle unavailable".to_string()));
        }
        Ok(self.classifications.clone())
    }

    async fn generate(&self, prompt: &str, _context: &str) -> Result<String, AppError> {
        if self.fail {
            return Err(AppError::Llm("stub oracle unavailable".to_string()));
        }
        if let Ok(mut calls) = self.generate_calls.lock() {
            calls.push(prompt.to_string());
        }
        if prompt == SCREENING_PROMPT {
            Ok(self.screening.clone())
        } else {
            Ok(self.notes.clone())
        }
    }
}

/// `(category, sub_category, text)` rows; a `None` subcategory registers a
/// category without subcategories.
pub struct InMemoryTemplateStore {
    rows: Vec<(String, Option<String>, Option<String>)>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn with_template(mut self, category: &str, sub_category: &str, text: &str) -> Self {
        self.rows.push((
            category.to_string(),
            Some(sub_category.to_string()),
            Some(text.to_string()),
        ));
        self
    }

    /// A subcategory that exists in the catalog but has no stored text.
    pub fn with_sub_category(mut self, category: &str, sub_category: &str) -> Self {
        self.rows
            .push((category.to_string(), Some(sub_category.to_string()), None));
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.rows.push((category.to_string(), None, None));
        self
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn catalog(&self) -> Result<Catalog, AppError> {
        Ok(Catalog::from_rows(
            self.rows
                .iter()
                .map(|(category, sub, _)| (category.clone(), sub.clone())),
        ))
    }

    async fn lookup_templates(
        &self,
        pairs: &[Classification],
    ) -> Result<Vec<TemplateMatch>, AppError> {
        let found: Vec<(String, String, String)> = self
            .rows
            .iter()
            .filter_map(|(category, sub, text)| {
                Some((category.clone(), sub.clone()?, text.clone()?))
            })
            .collect();
        Ok(merge_lookup(pairs, &found))
    }
}
