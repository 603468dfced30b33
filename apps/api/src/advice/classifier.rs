//! Category classifier: asks the oracle for a subcategory per category and
//! forces the answer back into the catalog's shape.

use tracing::{info, warn};

use crate::advice::catalog::{Catalog, Classification};
use crate::advice::oracle::Oracle;
use crate::errors::AppError;

/// One entry per catalog category, in catalog order. Never calls the oracle
/// for an empty catalog.
pub async fn classify_narrative(
    oracle: &dyn Oracle,
    narrative: &str,
    catalog: &Catalog,
) -> Result<Vec<Classification>, AppError> {
    if catalog.is_empty() {
        return Ok(Vec::new());
    }
    let raw = oracle.classify(narrative, catalog).await?;
    let aligned = align_with_catalog(&raw, catalog);
    info!(
        categories = aligned.len(),
        with_sub_category = aligned.iter().filter(|c| c.sub_category.is_some()).count(),
        "narrative classified"
    );
    Ok(aligned)
}

/// Keeps only names present in the catalog. Category and subcategory names
/// match case-insensitively and are returned in their catalog spelling; a
/// subcategory outside the catalog becomes `None`.
pub fn align_with_catalog(raw: &[Classification], catalog: &Catalog) -> Vec<Classification> {
    for answer in raw {
        if !catalog
            .categories()
            .iter()
            .any(|c| c.category.eq_ignore_ascii_case(answer.category.trim()))
        {
            warn!(category = %answer.category, "classifier returned unknown category");
        }
    }

    catalog
        .categories()
        .iter()
        .map(|known| {
            let answer = raw
                .iter()
                .find(|a| a.category.trim().eq_ignore_ascii_case(&known.category));
            let sub_category = answer
                .and_then(|a| a.sub_category.as_deref())
                .map(str::trim)
                .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
                .and_then(|sub| {
                    let canonical = known
                        .sub_categories
                        .iter()
                        .find(|s| s.eq_ignore_ascii_case(sub));
                    if canonical.is_none() {
                        warn!(
                            category = %known.category,
                            sub_category = sub,
                            "classifier returned subcategory outside the catalog"
                        );
                    }
                    canonical.map(String::as_str)
                });
            Classification::new(known.category.as_str(), sub_category)
        })
        .collect()
}
