//! The ordered fallback techniques of the search cascade. Each strategy is
//! one or more parameterized catalog queries behind a common `attempt`
//! interface; user text is only ever bound as a query parameter.

use std::sync::Arc;

use async_trait::async_trait;

use budtender_core::domain::intent::SearchIntent;
use budtender_core::domain::product::Product;
use budtender_db::repositories::{CatalogFilters, CatalogRepository, RepositoryError};

use crate::extractor::STOPWORDS;

/// Minimum token length considered meaningful for per-token retries.
const MIN_TOKEN_LEN: usize = 3;

#[async_trait]
pub trait SearchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cheap predicate so the orchestrator can skip strategies that have no
    /// signal to work with.
    fn applies(&self, intent: &SearchIntent, raw_query: &str) -> bool;

    async fn attempt(
        &self,
        intent: &SearchIntent,
        raw_query: &str,
    ) -> Result<Vec<Product>, RepositoryError>;
}

/// Builds the cascade in contract order over one shared catalog handle.
pub fn default_cascade(catalog: Arc<dyn CatalogRepository>) -> Vec<Box<dyn SearchStrategy>> {
    vec![
        Box::new(BrandSpecialStrategy { catalog: catalog.clone() }),
        Box::new(NameStrategy { catalog: catalog.clone() }),
        Box::new(BrandNameSplitStrategy { catalog: catalog.clone() }),
        Box::new(FilterStrategy { catalog: catalog.clone() }),
        Box::new(WordByWordStrategy { catalog: catalog.clone() }),
        Box::new(FreeTokenStrategy { catalog }),
    ]
}

/// Strategy 0: brand or special-type, the strongest signal when present.
struct BrandSpecialStrategy {
    catalog: Arc<dyn CatalogRepository>,
}

#[async_trait]
impl SearchStrategy for BrandSpecialStrategy {
    fn name(&self) -> &'static str {
        "brand_special"
    }

    fn applies(&self, intent: &SearchIntent, _raw_query: &str) -> bool {
        intent.brand.is_some() || intent.special_type.is_some()
    }

    async fn attempt(
        &self,
        intent: &SearchIntent,
        _raw_query: &str,
    ) -> Result<Vec<Product>, RepositoryError> {
        self.catalog
            .find_by_brand_or_special(intent.brand.as_deref(), intent.special_type.as_deref())
            .await
    }
}

/// Strategy 1: fuzzy product-name match, additionally trying the trailing
/// token as a sub-category hint ("pink kush joint" → name "pink kush",
/// sub-category "joint").
struct NameStrategy {
    catalog: Arc<dyn CatalogRepository>,
}

#[async_trait]
impl SearchStrategy for NameStrategy {
    fn name(&self) -> &'static str {
        "product_name"
    }

    fn applies(&self, intent: &SearchIntent, _raw_query: &str) -> bool {
        intent.product_name.is_some()
    }

    async fn attempt(
        &self,
        intent: &SearchIntent,
        _raw_query: &str,
    ) -> Result<Vec<Product>, RepositoryError> {
        let Some(name) = intent.product_name.as_deref() else {
            return Ok(Vec::new());
        };

        let mut rows = self.catalog.find_by_name(name).await?;

        let tokens: Vec<&str> = name.split_whitespace().collect();
        if let Some((last, head)) = tokens.split_last() {
            if !head.is_empty() {
                let head_name = head.join(" ");
                rows.extend(
                    self.catalog.find_by_name_and_sub_category(&head_name, last).await?,
                );
            }
        }
        Ok(rows)
    }
}

/// Strategy 2: re-reads a multi-token product name as brand + product,
/// trying one and two leading tokens as the brand.
struct BrandNameSplitStrategy {
    catalog: Arc<dyn CatalogRepository>,
}

#[async_trait]
impl SearchStrategy for BrandNameSplitStrategy {
    fn name(&self) -> &'static str {
        "brand_name_split"
    }

    fn applies(&self, intent: &SearchIntent, _raw_query: &str) -> bool {
        intent
            .product_name
            .as_deref()
            .map(|name| name.split_whitespace().count() >= 2)
            .unwrap_or(false)
    }

    async fn attempt(
        &self,
        intent: &SearchIntent,
        _raw_query: &str,
    ) -> Result<Vec<Product>, RepositoryError> {
        let Some(name) = intent.product_name.as_deref() else {
            return Ok(Vec::new());
        };
        let tokens: Vec<&str> = name.split_whitespace().collect();

        let mut rows = Vec::new();
        for split in 1..tokens.len().min(3) {
            let brand = tokens[..split].join(" ");
            let product = tokens[split..].join(" ");
            rows.extend(self.catalog.find_by_brand_and_name(&brand, &product).await?);
        }
        Ok(rows)
    }
}

/// Strategy 3: AND-combined category/sub-category/strain/price filter.
struct FilterStrategy {
    catalog: Arc<dyn CatalogRepository>,
}

#[async_trait]
impl SearchStrategy for FilterStrategy {
    fn name(&self) -> &'static str {
        "attribute_filter"
    }

    fn applies(&self, intent: &SearchIntent, _raw_query: &str) -> bool {
        intent.has_filter_criteria()
    }

    async fn attempt(
        &self,
        intent: &SearchIntent,
        _raw_query: &str,
    ) -> Result<Vec<Product>, RepositoryError> {
        let filters = CatalogFilters {
            category: intent.category.clone(),
            sub_category: intent.sub_category.clone(),
            strain_type: intent.strain_type.clone(),
            min_price_cents: intent.min_price_cents,
            max_price_cents: intent.max_price_cents,
        };
        if filters.is_empty() {
            return Ok(Vec::new());
        }
        self.catalog.find_by_filters(&filters).await
    }
}

/// Strategy 4: the product name word by word, once the whole-name search
/// has come up empty.
struct WordByWordStrategy {
    catalog: Arc<dyn CatalogRepository>,
}

#[async_trait]
impl SearchStrategy for WordByWordStrategy {
    fn name(&self) -> &'static str {
        "word_by_word"
    }

    fn applies(&self, intent: &SearchIntent, _raw_query: &str) -> bool {
        intent
            .product_name
            .as_deref()
            .map(|name| name.split_whitespace().any(|t| t.len() >= MIN_TOKEN_LEN))
            .unwrap_or(false)
    }

    async fn attempt(
        &self,
        intent: &SearchIntent,
        _raw_query: &str,
    ) -> Result<Vec<Product>, RepositoryError> {
        let Some(name) = intent.product_name.as_deref() else {
            return Ok(Vec::new());
        };

        let mut rows = Vec::new();
        for token in name.split_whitespace().filter(|t| t.len() >= MIN_TOKEN_LEN) {
            rows.extend(self.catalog.find_by_name(token).await?);
        }
        Ok(rows)
    }
}

/// Strategy 5, last resort: every stopword-stripped token of the raw
/// message against name, brand and description.
struct FreeTokenStrategy {
    catalog: Arc<dyn CatalogRepository>,
}

fn free_tokens(raw_query: &str) -> Vec<String> {
    raw_query
        .to_ascii_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() >= MIN_TOKEN_LEN && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl SearchStrategy for FreeTokenStrategy {
    fn name(&self) -> &'static str {
        "free_token"
    }

    fn applies(&self, _intent: &SearchIntent, raw_query: &str) -> bool {
        !free_tokens(raw_query).is_empty()
    }

    async fn attempt(
        &self,
        _intent: &SearchIntent,
        raw_query: &str,
    ) -> Result<Vec<Product>, RepositoryError> {
        let mut rows = Vec::new();
        for token in free_tokens(raw_query) {
            rows.extend(self.catalog.find_by_token(&token).await?);
        }
        Ok(rows)
    }
}
