//! Template Store: catalog and batched template lookup behind a trait.
//!
//! `AppState` holds an `Arc<dyn TemplateStore>`. `PgTemplateStore` is the
//! production backend; pipeline tests use an in-memory store.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use crate::advice::catalog::{Catalog, Classification, TemplateMatch};
use crate::errors::AppError;

#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Fresh snapshot of all categories and their subcategories.
    async fn catalog(&self) -> Result<Catalog, AppError>;

    /// One result per input pair, in input order. Pairs with a null
    /// subcategory are not queried; misses come back with `text: None`.
    async fn lookup_templates(
        &self,
        pairs: &[Classification],
    ) -> Result<Vec<TemplateMatch>, AppError>;
}

/// Maps found `(category, sub_category, text)` rows back onto `pairs`.
pub fn merge_lookup(
    pairs: &[Classification],
    found: &[(String, String, String)],
) -> Vec<TemplateMatch> {
    pairs
        .iter()
        .map(|pair| {
            let text = pair.sub_category.as_deref().and_then(|sub| {
                found
                    .iter()
                    .find(|(category, sub_category, _)| {
                        *category == pair.category && sub_category == sub
                    })
                    .map(|(_, _, text)| text.clone())
            });
            if text.is_none() && pair.sub_category.is_some() {
                info!(
                    category = %pair.category,
                    sub_category = ?pair.sub_category,
                    "no advisory text stored for pair"
                );
            }
            TemplateMatch {
                category: pair.category.clone(),
                sub_category: pair.sub_category.clone(),
                text,
            }
        })
        .collect()
}

pub struct PgTemplateStore {
    pool: PgPool,
}

impl PgTemplateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateStore for PgTemplateStore {
    async fn catalog(&self) -> Result<Catalog, AppError> {
        let rows: Vec<(String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT c.name, s.name
            FROM categories c
            LEFT JOIN sub_categories s ON s.category_id = c.id
            ORDER BY c.name, s.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(Catalog::from_rows(rows))
    }

    async fn lookup_templates(
        &self,
        pairs: &[Classification],
    ) -> Result<Vec<TemplateMatch>, AppError> {
        let (categories, sub_categories): (Vec<String>, Vec<String>) = pairs
            .iter()
            .filter_map(|p| p.sub_category.clone().map(|sub| (p.category.clone(), sub)))
            .unzip();

        let found: Vec<(String, String, String)> = if categories.is_empty() {
            Vec::new()
        } else {
            sqlx::query_as(
                r#"
                SELECT t.category, t.sub_category, t.text
                FROM advisory_texts t
                JOIN UNNEST($1::text[], $2::text[]) AS p(category, sub_category)
                  ON t.category = p.category AND t.sub_category = p.sub_category
                "#,
            )
            .bind(&categories)
            .bind(&sub_categories)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(merge_lookup(pairs, &found))
    }
}
