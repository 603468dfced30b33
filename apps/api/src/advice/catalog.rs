//! Catalog: the per-request snapshot of known categories and their subcategories.
//!
//! Fetched fresh from the Template Store at the start of every fill request,
//! passed by reference through classification and assembly, then dropped.

use serde::{Deserialize, Serialize};

/// One category with the subcategory names known for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogCategory {
    pub category: String,
    pub sub_categories: Vec<String>,
}

/// Ordered category → subcategories mapping. Order is the document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Catalog {
    categories: Vec<CatalogCategory>,
}

impl Catalog {
    /// Builds a catalog from `(category, subcategory)` rows, keeping first-seen
    /// category order. A `None` subcategory registers the category alone.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        let mut catalog = Catalog::default();
        for (category, sub_category) in rows {
            let idx = match catalog
                .categories
                .iter()
                .position(|c| c.category == category)
            {
                Some(idx) => idx,
                None => {
                    catalog.categories.push(CatalogCategory {
                        category,
                        sub_categories: Vec::new(),
                    });
                    catalog.categories.len() - 1
                }
            };
            if let Some(sub) = sub_category {
                let subs = &mut catalog.categories[idx].sub_categories;
                if !subs.contains(&sub) {
                    subs.push(sub);
                }
            }
        }
        catalog
    }

    pub fn categories(&self) -> &[CatalogCategory] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// JSON rendering used in classification prompts.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&self.categories).unwrap_or_else(|_| "[]".to_string())
    }
}

/// The classifier's decision for one category. `sub_category` is `None`
/// when the narrative carries no signal for that category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    pub sub_category: Option<String>,
}

impl Classification {
    pub fn new(category: impl Into<String>, sub_category: Option<&str>) -> Self {
        Self {
            category: category.into(),
            sub_category: sub_category.map(str::to_string),
        }
    }
}

/// One Template Store lookup result. `text` is `None` for a null
/// subcategory or a store miss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateMatch {
    pub category: String,
    pub sub_category: Option<String>,
    pub text: Option<String>,
}

/// Turns a snake_case category key into a display label:
/// `damage_to_third_parties` → `Damage to third parties`.
pub fn category_label(category: &str) -> String {
    let spaced = category.replace('_', " ");
    let mut chars = spaced.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
