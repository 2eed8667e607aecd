use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

/// Read-only projection of a catalog row. Owned by the product store;
/// this subsystem never writes it back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub sub_sub_category: Option<String>,
    pub size: Option<String>,
    pub price_cents: i64,
    pub thc_min_pct: Option<f64>,
    pub thc_max_pct: Option<f64>,
    pub cbd_min_pct: Option<f64>,
    pub cbd_max_pct: Option<f64>,
    pub strain_type: Option<String>,
    pub description: Option<String>,
}

impl Product {
    /// Product name with any trailing size suffix removed, used to group
    /// size variants of the same base product ("Pink Kush 3.5g" and
    /// "Pink Kush 7g" share the base "Pink Kush").
    pub fn base_name(&self) -> &str {
        let name = self.name.trim_end();
        if let Some(size) = &self.size {
            if let Some(stripped) = name.strip_suffix(size.as_str()) {
                return stripped.trim_end_matches(['-', ' ']);
            }
        }
        name
    }
}
