use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use budtender_core::domain::context::PAGE_SIZE;
use budtender_core::domain::intent::SearchIntent;
use budtender_core::domain::product::Product;
use budtender_core::errors::EngineError;
use budtender_db::repositories::CatalogRepository;

use crate::strategies::{default_cascade, SearchStrategy};

/// Rows returned with full detail when the result set fits on one page.
const FULL_PAGE: usize = PAGE_SIZE;
/// Rows returned when the result set overflows; images are dropped as a
/// bandwidth trade-off, not a search-depth limit.
const SHORT_PAGE: usize = 10;

#[derive(Clone, Debug, Serialize)]
pub struct SearchOutcome {
    pub products: Vec<Product>,
    pub total_found: usize,
    pub includes_images: bool,
    /// Which cascade strategy produced the rows, for observability.
    pub strategy: Option<&'static str>,
}

impl SearchOutcome {
    pub fn empty() -> Self {
        Self { products: Vec::new(), total_found: 0, includes_images: true, strategy: None }
    }
}

/// Runs the strategy cascade sequentially and stops at the first strategy
/// that leaves the accumulator non-empty. Sequential execution is load-
/// bearing: it preserves "which strategy found it" and spends no query
/// budget past the first hit.
pub struct SearchOrchestrator {
    catalog: Arc<dyn CatalogRepository>,
    strategies: Vec<Box<dyn SearchStrategy>>,
}

impl SearchOrchestrator {
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        let strategies = default_cascade(catalog.clone());
        Self { catalog, strategies }
    }

    /// Replaces the cascade, for tests that need scripted strategies.
    pub fn with_strategies(
        catalog: Arc<dyn CatalogRepository>,
        strategies: Vec<Box<dyn SearchStrategy>>,
    ) -> Self {
        Self { catalog, strategies }
    }

    pub async fn run(
        &self,
        intent: &SearchIntent,
        raw_query: &str,
    ) -> Result<SearchOutcome, EngineError> {
        // A dead store means no strategy can succeed; fail the whole search
        // in one round-trip instead of six.
        self.catalog
            .ping()
            .await
            .map_err(|error| EngineError::StoreUnavailable(error.to_string()))?;

        let mut candidates = CandidateSet::default();
        let mut winning_strategy = None;

        for strategy in &self.strategies {
            if !strategy.applies(intent, raw_query) {
                continue;
            }
            match strategy.attempt(intent, raw_query).await {
                Ok(rows) => candidates.extend(rows),
                Err(error) => {
                    warn!(
                        event_name = "search.strategy.error",
                        strategy = strategy.name(),
                        error = %error,
                        "strategy failed, continuing cascade"
                    );
                    continue;
                }
            }
            if !candidates.is_empty() {
                winning_strategy = Some(strategy.name());
                break;
            }
        }

        let mut products = candidates.into_products();
        rank(&mut products, intent.product_name.as_deref());

        let total_found = products.len();
        let includes_images = total_found <= FULL_PAGE;
        if !includes_images {
            products.truncate(SHORT_PAGE);
        }

        debug!(
            event_name = "search.cascade.complete",
            strategy = winning_strategy.unwrap_or("none"),
            total_found,
            includes_images,
            "search cascade finished"
        );

        Ok(SearchOutcome { products, total_found, includes_images, strategy: winning_strategy })
    }
}

/// Shared accumulator over all executed strategies; unions rows and drops
/// duplicate product ids, keeping the first-seen row.
#[derive(Default)]
struct CandidateSet {
    products: Vec<Product>,
    seen: HashSet<String>,
}

impl CandidateSet {
    fn extend(&mut self, rows: Vec<Product>) {
        for product in rows {
            if self.seen.insert(product.id.0.clone()) {
                self.products.push(product);
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    fn into_products(self) -> Vec<Product> {
        self.products
    }
}

/// With a product name: exact matches first, then price ascending. Without
/// one: the filter strategy's native price-ascending order.
fn rank(products: &mut [Product], product_name: Option<&str>) {
    match product_name {
        Some(name) => {
            let needle = name.to_lowercase();
            products.sort_by(|a, b| {
                let a_exact = is_exact_match(a, &needle);
                let b_exact = is_exact_match(b, &needle);
                b_exact.cmp(&a_exact).then(a.price_cents.cmp(&b.price_cents))
            });
        }
        None => products.sort_by_key(|product| product.price_cents),
    }
}

fn is_exact_match(product: &Product, needle: &str) -> bool {
    product.name.to_lowercase() == *needle || product.base_name().to_lowercase() == *needle
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use budtender_core::domain::intent::SearchIntent;
    use budtender_core::domain::product::{Product, ProductId};
    use budtender_db::repositories::{
        CatalogFilters, CatalogRepository, InMemoryCatalogRepository, RepositoryError,
    };

    use super::{rank, CandidateSet, SearchOrchestrator};
    use crate::strategies::SearchStrategy;

    fn product(id: &str, name: &str, price_cents: i64) -> Product {
        Product {
            id: ProductId(id.to_string()),
            name: name.to_string(),
            brand: Some("Pure Sunfarms".to_string()),
            category: Some("Flower".to_string()),
            sub_category: None,
            sub_sub_category: None,
            size: Some("3.5g".to_string()),
            price_cents,
            thc_min_pct: None,
            thc_max_pct: None,
            cbd_min_pct: None,
            cbd_max_pct: None,
            strain_type: Some("Indica".to_string()),
            description: None,
        }
    }

    /// Delegates to the in-memory catalog while recording which query
    /// methods the cascade actually invoked.
    struct RecordingCatalog {
        inner: InMemoryCatalogRepository,
        calls: Mutex<Vec<&'static str>>,
    }

    impl RecordingCatalog {
        fn new(products: Vec<Product>) -> Self {
            Self { inner: InMemoryCatalogRepository::new(products), calls: Mutex::new(Vec::new()) }
        }

        async fn record(&self, method: &'static str) {
            self.calls.lock().await.push(method);
        }

        async fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl CatalogRepository for RecordingCatalog {
        async fn ping(&self) -> Result<(), RepositoryError> {
            self.inner.ping().await
        }

        async fn find_by_brand_or_special(
            &self,
            brand: Option<&str>,
            special_type: Option<&str>,
        ) -> Result<Vec<Product>, RepositoryError> {
            self.record("find_by_brand_or_special").await;
            self.inner.find_by_brand_or_special(brand, special_type).await
        }

        async fn find_by_name(&self, name: &str) -> Result<Vec<Product>, RepositoryError> {
            self.record("find_by_name").await;
            self.inner.find_by_name(name).await
        }

        async fn find_by_name_and_sub_category(
            &self,
            name: &str,
            sub_category: &str,
        ) -> Result<Vec<Product>, RepositoryError> {
            self.record("find_by_name_and_sub_category").await;
            self.inner.find_by_name_and_sub_category(name, sub_category).await
        }

        async fn find_by_brand_and_name(
            &self,
            brand: &str,
            name: &str,
        ) -> Result<Vec<Product>, RepositoryError> {
            self.record("find_by_brand_and_name").await;
            self.inner.find_by_brand_and_name(brand, name).await
        }

        async fn find_by_filters(
            &self,
            filters: &CatalogFilters,
        ) -> Result<Vec<Product>, RepositoryError> {
            self.record("find_by_filters").await;
            self.inner.find_by_filters(filters).await
        }

        async fn find_by_token(&self, token: &str) -> Result<Vec<Product>, RepositoryError> {
            self.record("find_by_token").await;
            self.inner.find_by_token(token).await
        }
    }

    #[tokio::test]
    async fn brand_only_intent_executes_only_the_brand_strategy() {
        let catalog = Arc::new(RecordingCatalog::new(vec![
            product("1", "Pink Kush 3.5g", 2_499),
            product("2", "Blue Dream 3.5g", 3_299),
        ]));
        let orchestrator = SearchOrchestrator::new(catalog.clone());

        let intent = SearchIntent {
            brand: Some("Pure Sunfarms".to_string()),
            ..SearchIntent::default()
        };
        let outcome = orchestrator.run(&intent, "pure sunfarms").await.expect("search");

        assert!(!outcome.products.is_empty());
        assert_eq!(outcome.strategy, Some("brand_special"));
        assert_eq!(catalog.calls().await, vec!["find_by_brand_or_special"]);
    }

    #[tokio::test]
    async fn empty_brand_result_falls_through_the_cascade() {
        let catalog = Arc::new(RecordingCatalog::new(vec![product("1", "Pink Kush 3.5g", 2_499)]));
        let orchestrator = SearchOrchestrator::new(catalog.clone());

        let intent = SearchIntent {
            brand: Some("Nonexistent Brand".to_string()),
            product_name: Some("pink kush".to_string()),
            ..SearchIntent::default()
        };
        let outcome = orchestrator.run(&intent, "nonexistent brand pink kush").await.expect("ok");

        assert_eq!(outcome.strategy, Some("product_name"));
        let calls = catalog.calls().await;
        assert_eq!(calls[0], "find_by_brand_or_special");
        assert!(calls.contains(&"find_by_name"));
    }

    #[tokio::test]
    async fn store_outage_short_circuits_before_any_strategy() {
        let inner = InMemoryCatalogRepository::new(vec![product("1", "Pink Kush 3.5g", 2_499)]);
        inner.set_unavailable(true);
        let catalog = Arc::new(RecordingCatalog {
            inner,
            calls: Mutex::new(Vec::new()),
        });
        let orchestrator = SearchOrchestrator::new(catalog.clone());

        let intent = SearchIntent {
            product_name: Some("pink kush".to_string()),
            ..SearchIntent::default()
        };
        let result = orchestrator.run(&intent, "pink kush").await;

        assert!(result.is_err());
        assert!(catalog.calls().await.is_empty());
    }

    #[tokio::test]
    async fn overflowing_result_set_returns_short_page_without_images() {
        let products: Vec<Product> =
            (0..21).map(|n| product(&format!("p{n}"), &format!("Kush {n}"), 1_000 + n)).collect();
        let catalog = Arc::new(InMemoryCatalogRepository::new(products));
        let orchestrator = SearchOrchestrator::new(catalog);

        let intent = SearchIntent {
            product_name: Some("kush".to_string()),
            ..SearchIntent::default()
        };
        let outcome = orchestrator.run(&intent, "kush").await.expect("search");

        assert_eq!(outcome.total_found, 21);
        assert_eq!(outcome.products.len(), 10);
        assert!(!outcome.includes_images);
    }

    #[tokio::test]
    async fn full_page_keeps_all_rows_and_images() {
        let products: Vec<Product> =
            (0..20).map(|n| product(&format!("p{n}"), &format!("Kush {n}"), 1_000 + n)).collect();
        let catalog = Arc::new(InMemoryCatalogRepository::new(products));
        let orchestrator = SearchOrchestrator::new(catalog);

        let intent = SearchIntent {
            product_name: Some("kush".to_string()),
            ..SearchIntent::default()
        };
        let outcome = orchestrator.run(&intent, "kush").await.expect("search");

        assert_eq!(outcome.total_found, 20);
        assert_eq!(outcome.products.len(), 20);
        assert!(outcome.includes_images);
    }

    #[test]
    fn overlapping_batches_deduplicate_by_id() {
        let mut candidates = CandidateSet::default();
        candidates.extend(vec![
            product("a", "Pink Kush 3.5g", 2_499),
            product("b", "Pink Kush 7g", 4_499),
        ]);
        candidates.extend(vec![
            product("b", "Pink Kush 7g", 4_499),
            product("c", "Blue Dream 3.5g", 3_299),
        ]);

        let products = candidates.into_products();
        let ids: Vec<_> = products.iter().map(|p| p.id.0.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn erroring_strategy_is_skipped_not_fatal() {
        struct FailingStrategy;

        #[async_trait]
        impl SearchStrategy for FailingStrategy {
            fn name(&self) -> &'static str {
                "failing"
            }
            fn applies(&self, _intent: &SearchIntent, _raw: &str) -> bool {
                true
            }
            async fn attempt(
                &self,
                _intent: &SearchIntent,
                _raw: &str,
            ) -> Result<Vec<Product>, RepositoryError> {
                Err(RepositoryError::Decode("boom".to_string()))
            }
        }

        struct FixedStrategy(Vec<Product>);

        #[async_trait]
        impl SearchStrategy for FixedStrategy {
            fn name(&self) -> &'static str {
                "fixed"
            }
            fn applies(&self, _intent: &SearchIntent, _raw: &str) -> bool {
                true
            }
            async fn attempt(
                &self,
                _intent: &SearchIntent,
                _raw: &str,
            ) -> Result<Vec<Product>, RepositoryError> {
                Ok(self.0.clone())
            }
        }

        let catalog = Arc::new(InMemoryCatalogRepository::new(Vec::new()));
        let orchestrator = SearchOrchestrator::with_strategies(
            catalog,
            vec![
                Box::new(FailingStrategy),
                Box::new(FixedStrategy(vec![product("a", "Pink Kush 3.5g", 2_499)])),
            ],
        );

        let outcome =
            orchestrator.run(&SearchIntent::default(), "anything").await.expect("search");
        assert_eq!(outcome.strategy, Some("fixed"));
        assert_eq!(outcome.products.len(), 1);
    }

    #[test]
    fn exact_name_matches_rank_before_cheaper_fuzzy_matches() {
        let mut products = vec![
            product("a", "Pink Kush Shake 3.5g", 1_000),
            product("b", "Pink Kush", 2_499),
        ];
        rank(&mut products, Some("pink kush"));
        assert_eq!(products[0].id.0, "b");
    }

    #[test]
    fn without_a_name_ranking_is_price_ascending() {
        let mut products = vec![
            product("a", "Expensive", 9_000),
            product("b", "Cheap", 1_000),
        ];
        rank(&mut products, None);
        assert_eq!(products[0].id.0, "b");
    }
}
