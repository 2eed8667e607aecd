use async_trait::async_trait;
use thiserror::Error;

use budtender_core::domain::context::ConversationContext;
use budtender_core::domain::product::Product;

pub mod catalog;
pub mod context;
pub mod memory;

pub use catalog::SqlCatalogRepository;
pub use context::SqlContextStore;
pub use memory::{InMemoryCatalogRepository, InMemoryContextStore};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// AND-combined filter parameters for the category/strain/price strategy.
/// Absent fields simply drop out of the WHERE clause.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CatalogFilters {
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub strain_type: Option<String>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
}

impl CatalogFilters {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.sub_category.is_none()
            && self.strain_type.is_none()
            && self.min_price_cents.is_none()
            && self.max_price_cents.is_none()
    }
}

/// Read-only window onto the product store. Every method is one
/// parameterized query; user text is only ever bound, never concatenated.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Cheap liveness probe; an error here means the whole cascade is
    /// skipped for the turn.
    async fn ping(&self) -> Result<(), RepositoryError>;

    async fn find_by_brand_or_special(
        &self,
        brand: Option<&str>,
        special_type: Option<&str>,
    ) -> Result<Vec<Product>, RepositoryError>;

    async fn find_by_name(&self, name: &str) -> Result<Vec<Product>, RepositoryError>;

    async fn find_by_name_and_sub_category(
        &self,
        name: &str,
        sub_category: &str,
    ) -> Result<Vec<Product>, RepositoryError>;

    async fn find_by_brand_and_name(
        &self,
        brand: &str,
        name: &str,
    ) -> Result<Vec<Product>, RepositoryError>;

    async fn find_by_filters(
        &self,
        filters: &CatalogFilters,
    ) -> Result<Vec<Product>, RepositoryError>;

    async fn find_by_token(&self, token: &str) -> Result<Vec<Product>, RepositoryError>;
}

/// Durable, session-keyed conversation state. `get` must re-read the
/// backing store on every call (read-through, no staleness window) so that
/// reference resolution never sees a product list another worker replaced.
#[async_trait]
pub trait ContextStore: Send + Sync {
    async fn get(&self, session_id: &str)
        -> Result<Option<ConversationContext>, RepositoryError>;

    async fn put(&self, context: &ConversationContext) -> Result<(), RepositoryError>;
}
