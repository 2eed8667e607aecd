use serde::{Deserialize, Serialize};

use crate::sizes;

/// Structured search intent extracted from one user message. Built fresh per
/// request and discarded with the turn; every field is optional so an empty
/// intent is a valid "no signal" result.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchIntent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strain_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price_cents: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price_cents: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_type: Option<String>,
}

impl SearchIntent {
    pub fn is_empty(&self) -> bool {
        self.product_name.is_none()
            && self.brand.is_none()
            && self.category.is_none()
            && self.sub_category.is_none()
            && self.size.is_none()
            && self.strain_type.is_none()
            && self.min_price_cents.is_none()
            && self.max_price_cents.is_none()
            && self.effects.is_empty()
            && self.special_type.is_none()
    }

    pub fn has_filter_criteria(&self) -> bool {
        self.category.is_some()
            || self.sub_category.is_some()
            || self.strain_type.is_some()
            || self.min_price_cents.is_some()
            || self.max_price_cents.is_some()
    }

    /// Re-applies size normalization so the canonical-grammar invariant holds
    /// no matter which extraction path produced the intent.
    pub fn normalized(mut self) -> Self {
        if let Some(size) = self.size.take() {
            self.size = sizes::normalize_size(&size);
        }
        self
    }
}
