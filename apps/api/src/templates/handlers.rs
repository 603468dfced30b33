//! CRUD for categories, subcategories and advisory texts. Reads are open to
//! every authenticated user; writes require the admin role.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::advisory::{AdvisoryTextRow, CategoryRow, SubCategoryRow};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateAdvisoryTextRequest {
    pub category_id: Uuid,
    pub sub_category: String,
    pub text: String,
}

#[derive(Deserialize)]
pub struct UpdateAdvisoryTextRequest {
    pub text: String,
}

fn required(value: &str, what: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{what} mag niet leeg zijn.")));
    }
    Ok(trimmed.to_string())
}

async fn fetch_category(state: &AppState, id: Uuid) -> Result<CategoryRow, AppError> {
    let category: Option<CategoryRow> = sqlx::query_as("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    category.ok_or_else(|| AppError::NotFound("Categorie niet gevonden.".to_string()))
}

// ── Categories ────────────────────────────────────────────────────────────

/// GET /categories
pub async fn handle_list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryRow>>, AppError> {
    let categories: Vec<CategoryRow> = sqlx::query_as("SELECT * FROM categories ORDER BY name")
        .fetch_all(&state.db)
        .await?;
    if categories.is_empty() {
        return Err(AppError::NotFound("Geen categorieën gevonden.".to_string()));
    }
    Ok(Json(categories))
}

/// GET /categories/:id
pub async fn handle_get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CategoryRow>, AppError> {
    Ok(Json(fetch_category(&state, id).await?))
}

/// POST /categories
pub async fn handle_create_category(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<CategoryRow>), AppError> {
    current.require_admin()?;
    let name = required(&req.name, "Categorienaam")?;

    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM categories WHERE name = $1")
        .bind(&name)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Validation("Deze categorie bestaat al.".to_string()));
    }

    let category: CategoryRow =
        sqlx::query_as("INSERT INTO categories (id, name) VALUES ($1, $2) RETURNING *")
            .bind(Uuid::new_v4())
            .bind(&name)
            .fetch_one(&state.db)
            .await?;

    info!(category = %category.name, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /categories/:id: renaming also renames the category on its advisory texts.
pub async fn handle_update_category(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<CategoryRow>, AppError> {
    current.require_admin()?;
    let name = required(&req.name, "Categorienaam")?;
    let old = fetch_category(&state, id).await?;

    let clash: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM categories WHERE name = $1 AND id <> $2")
            .bind(&name)
            .bind(id)
            .fetch_optional(&state.db)
            .await?;
    if clash.is_some() {
        return Err(AppError::Validation("Deze categorie bestaat al.".to_string()));
    }

    let mut tx = state.db.begin().await?;
    let category: CategoryRow =
        sqlx::query_as("UPDATE categories SET name = $1 WHERE id = $2 RETURNING *")
            .bind(&name)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
    sqlx::query("UPDATE advisory_texts SET category = $1 WHERE category = $2")
        .bind(&name)
        .bind(&old.name)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(from = %old.name, to = %category.name, "category renamed");
    Ok(Json(category))
}

/// DELETE /categories/:id: removes its subcategories and advisory texts too.
pub async fn handle_delete_category(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    current.require_admin()?;
    let category = fetch_category(&state, id).await?;

    let mut tx = state.db.begin().await?;
    sqlx::query("DELETE FROM sub_categories WHERE category_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM advisory_texts WHERE category = $1")
        .bind(&category.name)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(category = %category.name, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ── Subcategories ─────────────────────────────────────────────────────────

/// GET /subcategories
pub async fn handle_list_sub_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<SubCategoryRow>>, AppError> {
    let rows: Vec<SubCategoryRow> = sqlx::query_as("SELECT * FROM sub_categories ORDER BY name")
        .fetch_all(&state.db)
        .await?;
    if rows.is_empty() {
        return Err(AppError::NotFound("Geen subcategorieën gevonden.".to_string()));
    }
    Ok(Json(rows))
}

/// GET /categories/:id/subcategories
pub async fn handle_list_sub_categories_by_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SubCategoryRow>>, AppError> {
    fetch_category(&state, id).await?;
    let rows: Vec<SubCategoryRow> =
        sqlx::query_as("SELECT * FROM sub_categories WHERE category_id = $1 ORDER BY name")
            .bind(id)
            .fetch_all(&state.db)
            .await?;
    if rows.is_empty() {
        return Err(AppError::NotFound(
            "Geen subcategorieën voor deze categorie gevonden.".to_string(),
        ));
    }
    Ok(Json(rows))
}

/// GET /subcategories/:id
pub async fn handle_get_sub_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubCategoryRow>, AppError> {
    let row: Option<SubCategoryRow> = sqlx::query_as("SELECT * FROM sub_categories WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    row.map(Json)
        .ok_or_else(|| AppError::NotFound("Subcategorie niet gevonden.".to_string()))
}

// ── Advisory texts ────────────────────────────────────────────────────────

/// GET /advisorytexts
pub async fn handle_list_advisory_texts(
    State(state): State<AppState>,
) -> Result<Json<Vec<AdvisoryTextRow>>, AppError> {
    let rows: Vec<AdvisoryTextRow> =
        sqlx::query_as("SELECT * FROM advisory_texts ORDER BY category, sub_category")
            .fetch_all(&state.db)
            .await?;
    if rows.is_empty() {
        return Err(AppError::NotFound("Geen adviesteksten gevonden.".to_string()));
    }
    Ok(Json(rows))
}

/// GET /advisorytexts/:id
pub async fn handle_get_advisory_text(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AdvisoryTextRow>, AppError> {
    let row: Option<AdvisoryTextRow> = sqlx::query_as("SELECT * FROM advisory_texts WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    row.map(Json)
        .ok_or_else(|| AppError::NotFound("Adviestekst niet gevonden.".to_string()))
}

/// GET /advisorytexts/subcategory/:id
pub async fn handle_get_advisory_text_by_sub_category(
    State(state): State<AppState>,
    Path(sub_category_id): Path<Uuid>,
) -> Result<Json<AdvisoryTextRow>, AppError> {
    let sub: Option<SubCategoryRow> = sqlx::query_as("SELECT * FROM sub_categories WHERE id = $1")
        .bind(sub_category_id)
        .fetch_optional(&state.db)
        .await?;
    let sub = sub.ok_or_else(|| AppError::NotFound("Subcategorie niet gevonden.".to_string()))?;
    let category = fetch_category(&state, sub.category_id).await?;

    let row: Option<AdvisoryTextRow> = sqlx::query_as(
        "SELECT * FROM advisory_texts WHERE category = $1 AND sub_category = $2",
    )
    .bind(&category.name)
    .bind(&sub.name)
    .fetch_optional(&state.db)
    .await?;
    row.map(Json).ok_or_else(|| {
        AppError::NotFound("Geen adviestekst gevonden voor deze subcategorie.".to_string())
    })
}

/// POST /advisorytexts: creates the text and its subcategory together.
pub async fn handle_create_advisory_text(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateAdvisoryTextRequest>,
) -> Result<(StatusCode, Json<AdvisoryTextRow>), AppError> {
    current.require_admin()?;
    let text = required(&req.text, "Adviestekst")?;
    let sub_name = required(&req.sub_category, "Subcategorienaam")?;
    let category = fetch_category(&state, req.category_id).await?;

    let same_text: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM advisory_texts WHERE text = $1")
            .bind(&text)
        .fetch_optional(&state.db)
        .await?;
    if same_text.is_some() {
        return Err(AppError::Validation("De gegeven tekst bestaat al.".to_string()));
    }

    let same_sub: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM sub_categories WHERE category_id = $1 AND name = $2")
            .bind(category.id)
            .bind(&sub_name)
            .fetch_optional(&state.db)
            .await?;
    if same_sub.is_some() {
        return Err(AppError::Validation(
            "De gegeven subcategorie bestaat al voor deze categorie.".to_string(),
        ));
    }

    let mut tx = state.db.begin().await?;
    sqlx::query("INSERT INTO sub_categories (id, category_id, name) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(category.id)
        .bind(&sub_name)
        .execute(&mut *tx)
        .await?;
    let row: AdvisoryTextRow = sqlx::query_as(
        "INSERT INTO advisory_texts (id, category, sub_category, text) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&category.name)
    .bind(&sub_name)
    .bind(&text)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(category = %row.category, sub_category = %row.sub_category, "advisory text created");
    Ok((StatusCode::CREATED, Json(row)))
}

/// PUT /advisorytexts/:id
pub async fn handle_update_advisory_text(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAdvisoryTextRequest>,
) -> Result<Json<AdvisoryTextRow>, AppError> {
    current.require_admin()?;
    let text = required(&req.text, "Adviestekst")?;

    let row: Option<AdvisoryTextRow> =
        sqlx::query_as("UPDATE advisory_texts SET text = $1 WHERE id = $2 RETURNING *")
            .bind(&text)
            .bind(id)
            .fetch_optional(&state.db)
            .await?;
    let row = row.ok_or_else(|| AppError::NotFound("Adviestekst niet gevonden.".to_string()))?;

    info!(category = %row.category, sub_category = %row.sub_category, "advisory text updated");
    Ok(Json(row))
}

/// DELETE /advisorytexts/:id: also removes the matching subcategory.
pub async fn handle_delete_advisory_text(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    current.require_admin()?;

    let row: Option<AdvisoryTextRow> = sqlx::query_as("SELECT * FROM advisory_texts WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    let row = row.ok_or_else(|| AppError::NotFound("Adviestekst niet gevonden.".to_string()))?;

    let mut tx = state.db.begin().await?;
    sqlx::query(
        r#"
        DELETE FROM sub_categories s
        USING categories c
        WHERE s.category_id = c.id AND c.name = $1 AND s.name = $2
        "#,
    )
    .bind(&row.category)
    .bind(&row.sub_category)
    .execute(&mut *tx)
    .await?;
    sqlx::query("DELETE FROM advisory_texts WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(category = %row.category, sub_category = %row.sub_category, "advisory text deleted");
    Ok(StatusCode::NO_CONTENT)
}
