//! Pure derivation of follow-up actions from a ranked result set. No model
//! calls, no store access, so every branch is unit-testable offline.

use serde_json::json;

use crate::domain::action::{QuickAction, QuickActionType};
use crate::domain::product::Product;

const MAX_ACTIONS: usize = 6;
const MAX_SIZE_FILTERS: usize = 5;
const MAX_STRAIN_FILTERS: usize = 3;
const MAX_SIZE_VARIANTS: usize = 4;

/// Derives up to [`MAX_ACTIONS`] follow-ups for the given ranked results.
/// `message` is the triggering customer message; a detail-style message over
/// size variants of one base product switches to size selection.
pub fn derive_quick_actions(products: &[Product], message: &str) -> Vec<QuickAction> {
    if products.is_empty() {
        return empty_result_actions();
    }

    if is_detail_request(message) {
        let variants = size_variants_of_top(products);
        if variants.len() >= 2 {
            return variants
                .into_iter()
                .take(MAX_SIZE_VARIANTS)
                .map(|product| {
                    let size = product.size.clone().unwrap_or_default();
                    QuickAction::new(
                        format!("{} — {size}", product.base_name()),
                        QuickActionType::SelectSize,
                        json!({ "product_id": product.id.0, "size": size }),
                    )
                })
                .collect();
        }
    }

    let mut actions = Vec::new();

    for size in distinct(products, |p| p.size.clone()).into_iter().take(MAX_SIZE_FILTERS) {
        actions.push(QuickAction::new(
            format!("Only {size}"),
            QuickActionType::FilterSize,
            json!({ "size": size }),
        ));
    }

    for strain in distinct(products, |p| p.strain_type.clone()).into_iter().take(MAX_STRAIN_FILTERS)
    {
        actions.push(QuickAction::new(
            format!("{strain} only"),
            QuickActionType::FilterStrain,
            json!({ "strain_type": strain }),
        ));
    }

    let top = &products[0];
    actions.push(QuickAction::new(
        format!("More about {}", top.name),
        QuickActionType::ProductDetails,
        json!({ "product_id": top.id.0 }),
    ));
    actions.push(QuickAction::new(
        format!("Add {} to cart", top.name),
        QuickActionType::AddToCart,
        json!({ "product_id": top.id.0 }),
    ));

    actions.truncate(MAX_ACTIONS);
    actions
}

fn empty_result_actions() -> Vec<QuickAction> {
    vec![
        QuickAction::new("Browse flower", QuickActionType::Browse, json!({ "category": "Flower" })),
        QuickAction::new(
            "Browse edibles",
            QuickActionType::Browse,
            json!({ "category": "Edibles" }),
        ),
        QuickAction::new("Show everything", QuickActionType::ShowAll, json!({})),
    ]
}

fn is_detail_request(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    ["tell me more", "more about", "more info", "details", "describe"]
        .iter()
        .any(|phrase| lowered.contains(phrase))
}

/// Size variants of the top product's base name, in ranked order, one per
/// distinct size.
fn size_variants_of_top<'a>(products: &'a [Product]) -> Vec<&'a Product> {
    let base = products[0].base_name().to_ascii_lowercase();
    let mut seen_sizes = Vec::new();
    let mut variants = Vec::new();
    for product in products {
        if product.base_name().to_ascii_lowercase() != base {
            continue;
        }
        let Some(size) = &product.size else { continue };
        if seen_sizes.contains(size) {
            continue;
        }
        seen_sizes.push(size.clone());
        variants.push(product);
    }
    variants
}

/// Distinct non-empty values of `field`, preserving first-seen (ranked)
/// order.
fn distinct(products: &[Product], field: impl Fn(&Product) -> Option<String>) -> Vec<String> {
    let mut values = Vec::new();
    for product in products {
        let Some(value) = field(product) else { continue };
        if value.is_empty() || values.contains(&value) {
            continue;
        }
        values.push(value);
    }
    values
}
