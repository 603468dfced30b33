use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CategoryRow {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubCategoryRow {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
}

/// A stored template. `category` and `sub_category` hold names, not ids;
/// at most one row exists per (category, sub_category) pair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdvisoryTextRow {
    pub id: Uuid,
    pub category: String,
    pub sub_category: String,
    pub text: String,
}
