//! Oracle: the language-model capability the advice pipeline consumes.
//!
//! `AppState` holds an `Arc<dyn Oracle>`; production uses `LlmOracle`, tests
//! use a deterministic stub. Any error is fatal for the request.

use async_trait::async_trait;
use serde::Deserialize;

use crate::advice::catalog::{Catalog, Classification};
use crate::advice::prompts::{CLASSIFY_PROMPT_TEMPLATE, CLASSIFY_SYSTEM, GENERATE_SYSTEM};
use crate::errors::AppError;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::LlmClient;

#[async_trait]
pub trait Oracle: Send + Sync {
    /// Raw per-category classification. Callers align the answer with the
    /// catalog; implementations may return names outside it.
    async fn classify(
        &self,
        narrative: &str,
        catalog: &Catalog,
    ) -> Result<Vec<Classification>, AppError>;

    /// Free text generation for `prompt` over `context`.
    async fn generate(&self, prompt: &str, context: &str) -> Result<String, AppError>;
}

#[derive(Debug, Deserialize)]
struct ClassificationResponse {
    classifications: Vec<Classification>,
}

/// Oracle backed by the Claude API.
pub struct LlmOracle(pub LlmClient);

#[async_trait]
impl Oracle for LlmOracle {
    async fn classify(
        &self,
        narrative: &str,
        catalog: &Catalog,
    ) -> Result<Vec<Classification>, AppError> {
        let prompt = CLASSIFY_PROMPT_TEMPLATE
            .replace("{catalog}", &catalog.to_prompt_json())
            .replace("{narrative}", narrative);
        let system = format!("{CLASSIFY_SYSTEM} {JSON_ONLY_SYSTEM}");
        let response: ClassificationResponse = self
            .0
            .call_json(&prompt, &system)
            .await
            .map_err(|e| AppError::Llm(format!("Classification failed: {e}")))?;
        Ok(response.classifications)
    }

    async fn generate(&self, prompt: &str, context: &str) -> Result<String, AppError> {
        let content = format!("{prompt}\n\n---\n{context}");
        self.0
            .call_text(&content, GENERATE_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Generation failed: {e}")))
    }
}
