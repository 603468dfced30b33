use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::advice::filler::MissingItem;
use crate::advice::input::normalize_input;
use crate::advice::pipeline::AdvicePipeline;
use crate::advice::screening::{screen_input, Screening, OFF_TOPIC_REPLY};
use crate::auth::CurrentUser;
use crate::chat::{create_conversation, find_conversation, insert_message};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RunRequest {
    pub input: String,
    #[serde(default)]
    pub conversation_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct RunResponse {
    pub output: String,
    pub conversation_id: Uuid,
    pub conversation_created: bool,
    pub user_message_id: Uuid,
    pub ai_message_id: Uuid,
    pub missing_items: Vec<MissingItem>,
}

/// POST /run
///
/// Normalizes and screens the intake text and runs the fill pipeline. The
/// exchange is stored in the caller's conversation, or in a new one when the
/// given id is unknown or belongs to someone else.
pub async fn handle_run(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<RunRequest>,
) -> Result<Json<RunResponse>, AppError> {
    let input = normalize_input(&req.input);
    if input.is_empty() {
        return Err(AppError::Validation("Invoer mag niet leeg zijn.".to_string()));
    }

    let (output, missing_items) = match screen_input(state.oracle.as_ref(), &input).await? {
        Screening::OffTopic => (OFF_TOPIC_REPLY.to_string(), Vec::new()),
        Screening::OnTopic => {
            let pipeline =
                AdvicePipeline::new(state.oracle.as_ref(), state.store.as_ref(), &state.rules);
            let document = pipeline.run(&input).await?;
            (document.render(), document.missing)
        }
    };

    let mut tx = state.db.begin().await?;
    let existing = match req.conversation_id {
        Some(id) => find_conversation(&mut *tx, id, current.id).await?,
        None => None,
    };
    if existing.is_none() {
        if let Some(id) = req.conversation_id {
            info!(conversation_id = %id, "conversation not found, starting a new one");
        }
    }
    let conversation_created = existing.is_none();
    let conversation = match existing {
        Some(conversation) => conversation,
        None => create_conversation(&mut *tx, current.id).await?,
    };
    // Stored as typed; only the pipeline sees the normalized text.
    let user_message = insert_message(&mut *tx, conversation.id, &req.input, true).await?;
    let ai_message = insert_message(&mut *tx, conversation.id, &output, false).await?;
    tx.commit().await?;

    info!(
        user = %current.username,
        conversation_id = %conversation.id,
        missing = missing_items.len(),
        "run completed"
    );

    Ok(Json(RunResponse {
        output,
        conversation_id: conversation.id,
        conversation_created,
        user_message_id: user_message.id,
        ai_message_id: ai_message.id,
        missing_items,
    }))
}

// Postgres-backed. Run with:
// DATABASE_URL=postgres://localhost/advisory_test cargo test -p advisory -- --ignored
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use sqlx::PgPool;
    use tower::ServiceExt;

    use super::*;
    use crate::advice::catalog::Classification;
    use crate::advice::rules::RuleTable;
    use crate::advice::testing::{InMemoryTemplateStore, StubOracle};
    use crate::auth::JwtKeys;
    use crate::models::user::UserRow;
    use crate::routes::build_router;

    const SECRET: &str = "run-test-secret";

    const SCHEMA: &[&str] = &[
        "CREATE TABLE IF NOT EXISTS users (id UUID PRIMARY KEY, username TEXT UNIQUE NOT NULL, \
         hashed_password TEXT NOT NULL, role TEXT NOT NULL)",
        "CREATE TABLE IF NOT EXISTS conversations (id UUID PRIMARY KEY, user_id UUID NOT NULL, \
         created_at TIMESTAMPTZ NOT NULL)",
        "CREATE TABLE IF NOT EXISTS messages (id UUID PRIMARY KEY, conversation_id UUID NOT NULL, \
         content TEXT NOT NULL, is_user_message BOOLEAN NOT NULL, created_at TIMESTAMPTZ NOT NULL)",
    ];

    async fn test_pool() -> PgPool {
        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for database tests");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .expect("failed to connect to test database");
        for ddl in SCHEMA {
            sqlx::query(ddl).execute(&pool).await.expect("schema");
        }
        pool
    }

    async fn create_user(pool: &PgPool) -> UserRow {
        let id = Uuid::new_v4();
        sqlx::query_as(
            "INSERT INTO users (id, username, hashed_password, role) VALUES ($1, $2, '', 'user') \
             RETURNING *",
        )
        .bind(id)
        .bind(format!("adviseur-{id}"))
        .fetch_one(pool)
        .await
        .expect("user")
    }

    fn test_app(pool: PgPool, oracle: StubOracle, store: InMemoryTemplateStore) -> axum::Router {
        build_router(AppState {
            db: pool,
            jwt: JwtKeys::new(SECRET, 30),
            oracle: Arc::new(oracle),
            store: Arc::new(store),
            rules: Arc::new(RuleTable::standard()),
        })
    }

    async fn post_run(app: axum::Router, user: &UserRow, body: Value) -> (StatusCode, Value) {
        let token = JwtKeys::new(SECRET, 30).issue(user).expect("token");
        let request = Request::builder()
            .method("POST")
            .uri("/run")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn conversation_count(pool: &PgPool, user_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM conversations WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .expect("count")
    }

    #[tokio::test]
    #[ignore]
    async fn test_unknown_or_foreign_conversation_starts_a_new_one() {
        let pool = test_pool().await;
        let user = create_user(&pool).await;
        let other = create_user(&pool).await;
        let foreign = create_conversation(&pool, other.id).await.expect("conversation");

        for given in [Uuid::new_v4(), foreign.id] {
            let app = test_app(pool.clone(), StubOracle::new(), InMemoryTemplateStore::new());
            let (status, body) = post_run(
                app,
                &user,
                json!({ "input": "De klant heeft drie trekkers.", "conversation_id": given }),
            )
            .await;
            assert_eq!(status, StatusCode::OK, "{body}");
            assert_eq!(body["conversation_created"], true);
            assert_ne!(body["conversation_id"], json!(given));
        }
        assert_eq!(conversation_count(&pool, user.id).await, 2);
        assert_eq!(conversation_count(&pool, other.id).await, 1);
    }

    #[tokio::test]
    #[ignore]
    async fn test_user_message_is_stored_as_typed() {
        let pool = test_pool().await;
        let user = create_user(&pool).await;
        let raw = "  De klant   heeft drie trekkers .  ";

        let app = test_app(pool.clone(), StubOracle::new(), InMemoryTemplateStore::new());
        let (status, body) = post_run(app, &user, json!({ "input": raw })).await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let id: Uuid = serde_json::from_value(body["user_message_id"].clone()).expect("id");
        let content: String = sqlx::query_scalar("SELECT content FROM messages WHERE id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .expect("message");
        assert_eq!(content, raw);
    }

    #[tokio::test]
    #[ignore]
    async fn test_failed_reply_insert_stores_nothing() {
        let pool = test_pool().await;
        let user = create_user(&pool).await;
        // Postgres rejects NUL in text columns, so only the reply insert fails.
        let oracle = StubOracle::new().with_classifications(vec![Classification::new(
            "damage_by_standstill",
            Some("minrisk"),
        )]);
        let store = InMemoryTemplateStore::new().with_template(
            "damage_by_standstill",
            "minrisk",
            "Tekst met \0 erin.",
        );

        let (status, _) = post_run(
            test_app(pool.clone(), oracle, store),
            &user,
            json!({ "input": "De klant heeft drie trekkers." }),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(conversation_count(&pool, user.id).await, 0);
    }
}
