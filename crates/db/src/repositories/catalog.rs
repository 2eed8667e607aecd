use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};

use budtender_core::domain::product::{Product, ProductId};

use super::{CatalogFilters, CatalogRepository, RepositoryError};
use crate::DbPool;

/// Per-query row cap. Pagination happens in the orchestrator; this only
/// bounds what one strategy can pull out of the store.
const ROW_LIMIT: i64 = 50;

const PRODUCT_COLUMNS: &str = "id, name, brand, category, sub_category, sub_sub_category, \
     size, price_cents, thc_min_pct, thc_max_pct, cbd_min_pct, cbd_max_pct, strain_type, \
     description";

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|error| RepositoryError::Unavailable(error.to_string()))?;
        Ok(())
    }

    async fn find_by_brand_or_special(
        &self,
        brand: Option<&str>,
        special_type: Option<&str>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE (?1 IS NOT NULL AND brand LIKE '%' || ?1 || '%')
               OR (?2 IS NOT NULL AND (
                      sub_sub_category LIKE '%' || ?2 || '%'
                   OR description LIKE '%' || ?2 || '%'))
            ORDER BY price_cents ASC
            LIMIT ?3
            "#
        ))
        .bind(brand)
        .bind(special_type)
        .bind(ROW_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE name LIKE '%' || ?1 || '%'
            ORDER BY price_cents ASC
            LIMIT ?2
            "#
        ))
        .bind(name)
        .bind(ROW_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn find_by_name_and_sub_category(
        &self,
        name: &str,
        sub_category: &str,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE name LIKE '%' || ?1 || '%'
              AND (sub_category LIKE '%' || ?2 || '%' OR category LIKE '%' || ?2 || '%')
            ORDER BY price_cents ASC
            LIMIT ?3
            "#
        ))
        .bind(name)
        .bind(sub_category)
        .bind(ROW_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn find_by_brand_and_name(
        &self,
        brand: &str,
        name: &str,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE brand LIKE '%' || ?1 || '%'
              AND name LIKE '%' || ?2 || '%'
            ORDER BY price_cents ASC
            LIMIT ?3
            "#
        ))
        .bind(brand)
        .bind(name)
        .bind(ROW_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn find_by_filters(
        &self,
        filters: &CatalogFilters,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE (?1 IS NULL OR category LIKE '%' || ?1 || '%')
              AND (?2 IS NULL OR sub_category LIKE '%' || ?2 || '%')
              AND (?3 IS NULL OR strain_type LIKE '%' || ?3 || '%')
              AND (?4 IS NULL OR price_cents >= ?4)
              AND (?5 IS NULL OR price_cents <= ?5)
            ORDER BY price_cents ASC
            LIMIT ?6
            "#
        ))
        .bind(filters.category.as_deref())
        .bind(filters.sub_category.as_deref())
        .bind(filters.strain_type.as_deref())
        .bind(filters.min_price_cents)
        .bind(filters.max_price_cents)
        .bind(ROW_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn find_by_token(&self, token: &str) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE name LIKE '%' || ?1 || '%'
               OR brand LIKE '%' || ?1 || '%'
               OR description LIKE '%' || ?1 || '%'
            ORDER BY price_cents ASC
            LIMIT ?2
            "#
        ))
        .bind(token)
        .bind(ROW_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }
}

fn product_from_row(row: &SqliteRow) -> Result<Product, RepositoryError> {
    Ok(Product {
        id: ProductId(row.try_get::<String, _>("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        brand: row.try_get("brand").map_err(decode)?,
        category: row.try_get("category").map_err(decode)?,
        sub_category: row.try_get("sub_category").map_err(decode)?,
        sub_sub_category: row.try_get("sub_sub_category").map_err(decode)?,
        size: row.try_get("size").map_err(decode)?,
        price_cents: row.try_get("price_cents").map_err(decode)?,
        thc_min_pct: row.try_get("thc_min_pct").map_err(decode)?,
        thc_max_pct: row.try_get("thc_max_pct").map_err(decode)?,
        cbd_min_pct: row.try_get("cbd_min_pct").map_err(decode)?,
        cbd_max_pct: row.try_get("cbd_max_pct").map_err(decode)?,
        strain_type: row.try_get("strain_type").map_err(decode)?,
        description: row.try_get("description").map_err(decode)?,
    })
}

fn decode(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}
