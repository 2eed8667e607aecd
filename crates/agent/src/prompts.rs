//! Prompt builders and per-purpose token budgets. Budgets are deliberately
//! small so a slow completion can only cost a bounded slice of the turn.

use budtender_core::domain::product::Product;

pub const INTENT_MAX_TOKENS: u32 = 300;
pub const REFERENCE_MAX_TOKENS: u32 = 120;
pub const SIMILARITY_MAX_TOKENS: u32 = 60;
pub const DISAMBIGUATION_MAX_TOKENS: u32 = 10;

pub fn intent_extraction(query: &str) -> String {
    format!(
        r#"Extract a product search intent from a dispensary customer message.
Respond with only a JSON object. Omit fields that are not mentioned.
Fields: product_name, brand, category (Flower, Pre-Rolls, Edibles, Vapes,
Concentrates, Beverages), sub_category, size, strain_type (Indica, Sativa,
Hybrid), min_price, max_price (numbers, dollars), effects (array of strings),
special_type.

Message: {query}
Output:"#
    )
}

pub fn reference_resolution(message: &str, products: &[Product]) -> String {
    format!(
        r#"A customer was just shown this numbered product list:
{}
Decide whether their next message refers to one of these products, or is a
new search. Respond with only a JSON object:
{{"is_reference": bool, "product_index": 0-based int or null,
"action": "select" | "inquire" | "similar", "confidence": 0.0-1.0}}
"select" means they want to buy it, "inquire" means they want information,
"similar" means they want products like it.

Message: {message}
Output:"#,
        labelled_list(products)
    )
}

pub fn similarity_resolution(message: &str, products: &[Product]) -> String {
    format!(
        r#"A customer was just shown this numbered product list:
{}
Is their next message asking for products similar to one of these (rather
than a new, specific search)? Respond with only a JSON object:
{{"is_similarity_request": bool, "product_index": 0-based int or null,
"confidence": 0.0-1.0}}

Message: {message}
Output:"#,
        labelled_list(products)
    )
}

pub fn purchase_vs_inquiry(message: &str, product_name: &str) -> String {
    format!(
        r#"The customer said: "{message}" about the product "{product_name}".
Do they want to purchase it or just learn about it?
Answer with exactly one word: purchase or inquiry."#
    )
}

/// Products rendered one per line with the 0-based index the resolver must
/// answer with.
fn labelled_list(products: &[Product]) -> String {
    products
        .iter()
        .enumerate()
        .map(|(index, product)| {
            let size = product.size.as_deref().unwrap_or("-");
            format!(
                "{index}. {} ({size}, ${}.{:02})",
                product.name,
                product.price_cents / 100,
                product.price_cents % 100
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use budtender_core::domain::product::{Product, ProductId};

    use super::{intent_extraction, reference_resolution};

    fn product(id: &str, name: &str, price_cents: i64) -> Product {
        Product {
            id: ProductId(id.to_string()),
            name: name.to_string(),
            brand: None,
            category: None,
            sub_category: None,
            sub_sub_category: None,
            size: Some("3.5g".to_string()),
            price_cents,
            thc_min_pct: None,
            thc_max_pct: None,
            cbd_min_pct: None,
            cbd_max_pct: None,
            strain_type: None,
            description: None,
        }
    }

    #[test]
    fn intent_prompt_embeds_the_query() {
        let prompt = intent_extraction("cheap indica please");
        assert!(prompt.contains("cheap indica please"));
    }

    #[test]
    fn reference_prompt_labels_products_zero_based() {
        let products = vec![product("a", "Pink Kush 3.5g", 2_499), product("b", "Blue Dream", 3_299)];
        let prompt = reference_resolution("the second one", &products);
        assert!(prompt.contains("0. Pink Kush 3.5g (3.5g, $24.99)"));
        assert!(prompt.contains("1. Blue Dream"));
    }
}
