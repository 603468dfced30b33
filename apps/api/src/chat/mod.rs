//! Conversations and messages. Only the rendered text of a fill request is
//! persisted; the filled document itself is never stored.
//!
//! The helpers take any executor so `/run` can store a whole exchange in one
//! transaction.

pub mod handlers;

use chrono::Utc;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::chat::{ConversationRow, MessageRow};

/// The caller's own conversation, or `None`.
pub async fn find_conversation<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<ConversationRow>, AppError> {
    Ok(
        sqlx::query_as("SELECT * FROM conversations WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(executor)
            .await?,
    )
}

pub async fn create_conversation<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
) -> Result<ConversationRow, AppError> {
    Ok(sqlx::query_as(
        "INSERT INTO conversations (id, user_id, created_at) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(Utc::now())
    .fetch_one(executor)
    .await?)
}

pub async fn insert_message<'e, E: PgExecutor<'e>>(
    executor: E,
    conversation_id: Uuid,
    content: &str,
    is_user_message: bool,
) -> Result<MessageRow, AppError> {
    Ok(sqlx::query_as(
        r#"
        INSERT INTO messages (id, conversation_id, content, is_user_message, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(conversation_id)
    .bind(content)
    .bind(is_user_message)
    .bind(Utc::now())
    .fetch_one(executor)
    .await?)
}
