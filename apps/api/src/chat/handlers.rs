use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::chat::{create_conversation, find_conversation};
use crate::errors::AppError;
use crate::models::chat::{ConversationRow, MessageRow};
use crate::state::AppState;

/// GET /conversations: newest first.
pub async fn handle_list_conversations(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<ConversationRow>>, AppError> {
    let rows: Vec<ConversationRow> =
        sqlx::query_as("SELECT * FROM conversations WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(current.id)
            .fetch_all(&state.db)
            .await?;
    if rows.is_empty() {
        return Err(AppError::NotFound("Geen gesprekken gevonden!".to_string()));
    }
    Ok(Json(rows))
}

/// POST /conversations
pub async fn handle_create_conversation(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<(StatusCode, Json<ConversationRow>), AppError> {
    let conversation = create_conversation(&state.db, current.id).await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /conversations/:id/messages: oldest first.
pub async fn handle_list_messages(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MessageRow>>, AppError> {
    find_conversation(&state.db, id, current.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Gesprek niet gevonden".to_string()))?;

    let rows: Vec<MessageRow> =
        sqlx::query_as("SELECT * FROM messages WHERE conversation_id = $1 ORDER BY created_at ASC")
            .bind(id)
            .fetch_all(&state.db)
            .await?;
    if rows.is_empty() {
        return Err(AppError::NotFound(
            "Geen bericht(en) voor dit gesprek".to_string(),
        ));
    }
    Ok(Json(rows))
}

/// DELETE /conversations/:id
pub async fn handle_delete_conversation(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    find_conversation(&state.db, id, current.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Gesprek niet gevonden".to_string()))?;

    let mut tx = state.db.begin().await?;
    sqlx::query("DELETE FROM messages WHERE conversation_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM conversations WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(conversation_id = %id, "conversation deleted");
    Ok(Json(json!({ "message": format!("Gesprek {id} succesvol verwijderd!") })))
}

/// DELETE /conversations: all of the caller's conversations.
pub async fn handle_delete_all_conversations(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Value>, AppError> {
    let mut tx = state.db.begin().await?;
    sqlx::query(
        "DELETE FROM messages WHERE conversation_id IN (SELECT id FROM conversations WHERE user_id = $1)",
    )
    .bind(current.id)
    .execute(&mut *tx)
    .await?;
    let deleted = sqlx::query("DELETE FROM conversations WHERE user_id = $1")
        .bind(current.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    tx.commit().await?;

    if deleted == 0 {
        return Ok(Json(json!({ "message": "Geen gesprekken gevonden" })));
    }
    info!(user = %current.username, deleted, "all conversations deleted");
    Ok(Json(json!({ "message": format!("Alle {deleted} gesprekken succesvol verwijderd!") })))
}
