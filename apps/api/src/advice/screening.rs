//! Topic screening: rejects input that is not about insurance or advisory work.

use tracing::info;

use crate::advice::oracle::Oracle;
use crate::advice::prompts::SCREENING_PROMPT;
use crate::errors::AppError;

/// Reply stored and returned instead of a document for off-topic input.
pub const OFF_TOPIC_REPLY: &str = "Sorry, ik kan alleen helpen bij het omzetten van adviesteksten. \
Stuur alstublieft alleen een adviestekst die u wilt omzetten.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screening {
    OnTopic,
    OffTopic,
}

/// A failed oracle call is an error, never an implicit pass.
pub async fn screen_input(oracle: &dyn Oracle, input: &str) -> Result<Screening, AppError> {
    let answer = oracle.generate(SCREENING_PROMPT, input).await?;
    let verdict = if answer.to_uppercase().contains("YES") {
        Screening::OnTopic
    } else {
        Screening::OffTopic
    };
    info!(?verdict, "input screened");
    Ok(verdict)
}
