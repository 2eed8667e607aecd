//! Demo catalog seeds used by integration tests and local smoke runs.

use crate::repositories::RepositoryError;
use crate::DbPool;

struct SeedProduct {
    id: &'static str,
    name: &'static str,
    brand: &'static str,
    category: &'static str,
    sub_category: &'static str,
    sub_sub_category: Option<&'static str>,
    size: &'static str,
    price_cents: i64,
    thc_range: (f64, f64),
    strain_type: &'static str,
    description: &'static str,
}

const SEED_PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        id: "prod-pk-35",
        name: "Pink Kush 3.5g",
        brand: "Pure Sunfarms",
        category: "Flower",
        sub_category: "Dried Flower",
        sub_sub_category: None,
        size: "3.5g",
        price_cents: 2_499,
        thc_range: (20.0, 26.0),
        strain_type: "Indica",
        description: "Earthy indica with sweet vanilla notes.",
    },
    SeedProduct {
        id: "prod-pk-70",
        name: "Pink Kush 7g",
        brand: "Pure Sunfarms",
        category: "Flower",
        sub_category: "Dried Flower",
        sub_sub_category: None,
        size: "7g",
        price_cents: 4_499,
        thc_range: (20.0, 26.0),
        strain_type: "Indica",
        description: "Earthy indica with sweet vanilla notes.",
    },
    SeedProduct {
        id: "prod-pk-pr",
        name: "Pink Kush Pre-Roll 3x0.5g",
        brand: "Redecan",
        category: "Pre-Rolls",
        sub_category: "Joints",
        sub_sub_category: None,
        size: "3x0.5g",
        price_cents: 1_599,
        thc_range: (18.0, 24.0),
        strain_type: "Indica",
        description: "Three half-gram pink kush joints.",
    },
    SeedProduct {
        id: "prod-bd-35",
        name: "Blue Dream 3.5g",
        brand: "Broken Coast",
        category: "Flower",
        sub_category: "Dried Flower",
        sub_sub_category: None,
        size: "3.5g",
        price_cents: 3_299,
        thc_range: (18.0, 22.0),
        strain_type: "Sativa",
        description: "Bright sativa with citrus and berry aroma.",
    },
    SeedProduct {
        id: "prod-sb-28",
        name: "Sour Tangie 28g",
        brand: "Broken Coast",
        category: "Flower",
        sub_category: "Dried Flower",
        sub_sub_category: Some("Sale"),
        size: "28g",
        price_cents: 11_999,
        thc_range: (19.0, 24.0),
        strain_type: "Sativa",
        description: "Citrus-forward ounce, on sale this week.",
    },
    SeedProduct {
        id: "prod-gm-10",
        name: "Peach Mango Gummies 2x4.5g",
        brand: "Wana",
        category: "Edibles",
        sub_category: "Gummies",
        sub_sub_category: None,
        size: "2x4.5g",
        price_cents: 699,
        thc_range: (0.0, 1.0),
        strain_type: "Hybrid",
        description: "Soft chews, 5mg THC each.",
    },
];

/// Inserts the demo catalog, replacing any rows with the same ids so
/// reseeding is idempotent.
pub async fn seed_demo_catalog(pool: &DbPool) -> Result<(), RepositoryError> {
    for seed in SEED_PRODUCTS {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, brand, category, sub_category, sub_sub_category,
                size, price_cents, thc_min_pct, thc_max_pct, strain_type, description
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                brand = excluded.brand,
                category = excluded.category,
                sub_category = excluded.sub_category,
                sub_sub_category = excluded.sub_sub_category,
                size = excluded.size,
                price_cents = excluded.price_cents,
                thc_min_pct = excluded.thc_min_pct,
                thc_max_pct = excluded.thc_max_pct,
                strain_type = excluded.strain_type,
                description = excluded.description
            "#,
        )
        .bind(seed.id)
        .bind(seed.name)
        .bind(seed.brand)
        .bind(seed.category)
        .bind(seed.sub_category)
        .bind(seed.sub_sub_category)
        .bind(seed.size)
        .bind(seed.price_cents)
        .bind(seed.thc_range.0)
        .bind(seed.thc_range.1)
        .bind(seed.strain_type)
        .bind(seed.description)
        .execute(pool)
        .await?;
    }
    Ok(())
}
