use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use budtender_core::domain::context::ConversationContext;
use budtender_core::domain::product::Product;

use super::{CatalogFilters, CatalogRepository, ContextStore, RepositoryError};

/// Catalog double backed by a plain vector, mirroring the SQL semantics
/// (case-insensitive substring match, price-ascending order). Used by agent
/// and engine tests that must not touch SQLite.
pub struct InMemoryCatalogRepository {
    products: Vec<Product>,
    unavailable: AtomicBool,
}

impl InMemoryCatalogRepository {
    pub fn new(mut products: Vec<Product>) -> Self {
        products.sort_by_key(|product| product.price_cents);
        Self { products, unavailable: AtomicBool::new(false) }
    }

    /// Simulates a total store outage: every method, including `ping`,
    /// starts failing.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("catalog store offline".to_string()));
        }
        Ok(())
    }

    fn matching(&self, predicate: impl Fn(&Product) -> bool) -> Vec<Product> {
        self.products.iter().filter(|product| predicate(product)).cloned().collect()
    }
}

fn contains(haystack: &Option<String>, needle: &str) -> bool {
    haystack
        .as_deref()
        .map(|value| value.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        self.check_available()
    }

    async fn find_by_brand_or_special(
        &self,
        brand: Option<&str>,
        special_type: Option<&str>,
    ) -> Result<Vec<Product>, RepositoryError> {
        self.check_available()?;
        Ok(self.matching(|product| {
            let brand_hit = brand
                .map(|value| contains(&product.brand, value))
                .unwrap_or(false);
            let special_hit = special_type
                .map(|value| {
                    contains(&product.sub_sub_category, value)
                        || contains(&product.description, value)
                })
                .unwrap_or(false);
            brand_hit || special_hit
        }))
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<Product>, RepositoryError> {
        self.check_available()?;
        let needle = name.to_lowercase();
        Ok(self.matching(|product| product.name.to_lowercase().contains(&needle)))
    }

    async fn find_by_name_and_sub_category(
        &self,
        name: &str,
        sub_category: &str,
    ) -> Result<Vec<Product>, RepositoryError> {
        self.check_available()?;
        let needle = name.to_lowercase();
        Ok(self.matching(|product| {
            product.name.to_lowercase().contains(&needle)
                && (contains(&product.sub_category, sub_category)
                    || contains(&product.category, sub_category))
        }))
    }

    async fn find_by_brand_and_name(
        &self,
        brand: &str,
        name: &str,
    ) -> Result<Vec<Product>, RepositoryError> {
        self.check_available()?;
        let needle = name.to_lowercase();
        Ok(self.matching(|product| {
            contains(&product.brand, brand) && product.name.to_lowercase().contains(&needle)
        }))
    }

    async fn find_by_filters(
        &self,
        filters: &CatalogFilters,
    ) -> Result<Vec<Product>, RepositoryError> {
        self.check_available()?;
        Ok(self.matching(|product| {
            filters.category.as_deref().map(|v| contains(&product.category, v)).unwrap_or(true)
                && filters
                    .sub_category
                    .as_deref()
                    .map(|v| contains(&product.sub_category, v))
                    .unwrap_or(true)
                && filters
                    .strain_type
                    .as_deref()
                    .map(|v| contains(&product.strain_type, v))
                    .unwrap_or(true)
                && filters.min_price_cents.map(|v| product.price_cents >= v).unwrap_or(true)
                && filters.max_price_cents.map(|v| product.price_cents <= v).unwrap_or(true)
        }))
    }

    async fn find_by_token(&self, token: &str) -> Result<Vec<Product>, RepositoryError> {
        self.check_available()?;
        let needle = token.to_lowercase();
        Ok(self.matching(|product| {
            product.name.to_lowercase().contains(&needle)
                || contains(&product.brand, token)
                || contains(&product.description, token)
        }))
    }
}

/// Context store double. Unlike the catalog it is mutable, so it sits
/// behind an async lock.
#[derive(Default)]
pub struct InMemoryContextStore {
    contexts: RwLock<HashMap<String, ConversationContext>>,
    fail_writes: AtomicBool,
}

impl InMemoryContextStore {
    /// Makes subsequent `put` calls fail, for persistence-failure paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn get(
        &self,
        session_id: &str,
    ) -> Result<Option<ConversationContext>, RepositoryError> {
        let contexts = self.contexts.read().await;
        Ok(contexts.get(session_id).cloned())
    }

    async fn put(&self, context: &ConversationContext) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("context store write failed".to_string()));
        }
        let mut contexts = self.contexts.write().await;
        contexts.insert(context.session_id.clone(), context.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use budtender_core::domain::context::ConversationContext;
    use budtender_core::domain::product::{Product, ProductId};

    use super::{InMemoryCatalogRepository, InMemoryContextStore};
    use crate::repositories::{CatalogFilters, CatalogRepository, ContextStore};

    fn product(id: &str, name: &str, brand: Option<&str>, price_cents: i64) -> Product {
        Product {
            id: ProductId(id.to_string()),
            name: name.to_string(),
            brand: brand.map(str::to_string),
            category: Some("Flower".to_string()),
            sub_category: None,
            sub_sub_category: None,
            size: None,
            price_cents,
            thc_min_pct: None,
            thc_max_pct: None,
            cbd_min_pct: None,
            cbd_max_pct: None,
            strain_type: Some("Indica".to_string()),
            description: None,
        }
    }

    #[tokio::test]
    async fn name_matches_are_case_insensitive_and_price_ordered() {
        let repo = InMemoryCatalogRepository::new(vec![
            product("1", "Pink Kush 7g", None, 4_500),
            product("2", "Pink Kush 3.5g", None, 2_500),
        ]);
        let found = repo.find_by_name("PINK kush").await.expect("query");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id.0, "2");
    }

    #[tokio::test]
    async fn unavailable_flag_fails_ping_and_queries() {
        let repo = InMemoryCatalogRepository::new(vec![product("1", "Pink Kush", None, 2_500)]);
        repo.set_unavailable(true);
        assert!(repo.ping().await.is_err());
        assert!(repo.find_by_name("pink").await.is_err());
    }

    #[tokio::test]
    async fn filters_apply_price_bounds() {
        let repo = InMemoryCatalogRepository::new(vec![
            product("1", "Cheap", None, 1_000),
            product("2", "Expensive", None, 9_000),
        ]);
        let filters =
            CatalogFilters { max_price_cents: Some(5_000), ..CatalogFilters::default() };
        let found = repo.find_by_filters(&filters).await.expect("query");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.0, "1");
    }

    #[tokio::test]
    async fn context_round_trip_preserves_order() {
        let store = InMemoryContextStore::default();
        let mut context = ConversationContext::new("s-1");
        context.show_products(vec![
            product("a", "A", None, 1_000),
            product("b", "B", None, 2_000),
        ]);
        store.put(&context).await.expect("put");

        let loaded = store.get("s-1").await.expect("get").expect("present");
        let ids: Vec<_> = loaded.last_products_shown.iter().map(|p| p.id.0.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn failed_writes_surface_as_errors() {
        let store = InMemoryContextStore::default();
        store.set_fail_writes(true);
        let context = ConversationContext::new("s-2");
        assert!(store.put(&context).await.is_err());
    }
}
