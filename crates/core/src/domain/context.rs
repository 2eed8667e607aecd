use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::intent::SearchIntent;
use super::product::Product;

/// Most products a single turn will ever show; also the cap on
/// `last_products_shown` so reference indexes stay addressable.
pub const PAGE_SIZE: usize = 20;

/// Messages retained per session.
pub const HISTORY_CAPACITY: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    Customer,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageEntry {
    pub role: MessageRole,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Fixed-capacity FIFO over the conversation transcript. Pushing beyond
/// capacity evicts the oldest entry; capacity never changes after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageHistory {
    capacity: usize,
    entries: Vec<MessageEntry>,
}

impl MessageHistory {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), entries: Vec::new() }
    }

    pub fn push(&mut self, entry: MessageEntry) {
        if self.entries.len() == self.capacity {
            self.entries.remove(0);
        }
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &MessageEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&MessageEntry> {
        self.entries.last()
    }
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

/// Per-session conversation state. The ordering of `last_products_shown` is
/// contractual: reference resolution indexes into exactly the list the client
/// saw last, so it is only ever replaced wholesale, never edited in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub session_id: String,
    pub customer_id: Option<String>,
    pub last_products_shown: Vec<Product>,
    pub last_selected_product: Option<Product>,
    pub last_search_criteria: Option<SearchIntent>,
    pub message_history: MessageHistory,
    pub updated_at: DateTime<Utc>,
}

impl ConversationContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            customer_id: None,
            last_products_shown: Vec::new(),
            last_selected_product: None,
            last_search_criteria: None,
            message_history: MessageHistory::default(),
            updated_at: Utc::now(),
        }
    }

    pub fn has_products(&self) -> bool {
        !self.last_products_shown.is_empty()
    }

    pub fn product_at(&self, index: usize) -> Option<&Product> {
        self.last_products_shown.get(index)
    }

    /// Replaces the shown list wholesale, truncating to the page size.
    pub fn show_products(&mut self, products: Vec<Product>) {
        let mut products = products;
        products.truncate(PAGE_SIZE);
        self.last_products_shown = products;
        self.updated_at = Utc::now();
    }

    pub fn record_message(&mut self, role: MessageRole, text: impl Into<String>) {
        self.message_history.push(MessageEntry { role, text: text.into(), at: Utc::now() });
        self.updated_at = Utc::now();
    }

    pub fn select_product(&mut self, product: Product) {
        self.last_selected_product = Some(product);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ConversationContext, MessageEntry, MessageHistory, MessageRole, HISTORY_CAPACITY,
        PAGE_SIZE,
    };
    use crate::domain::product::{Product, ProductId};
    use chrono::Utc;

    fn product(id: &str) -> Product {
        Product {
            id: ProductId(id.to_string()),
            name: format!("Product {id}"),
            brand: None,
            category: None,
            sub_category: None,
            sub_sub_category: None,
            size: None,
            price_cents: 1_000,
            thc_min_pct: None,
            thc_max_pct: None,
            cbd_min_pct: None,
            cbd_max_pct: None,
            strain_type: None,
            description: None,
        }
    }

    #[test]
    fn history_evicts_oldest_at_capacity() {
        let mut history = MessageHistory::new(3);
        for n in 0..5 {
            history.push(MessageEntry {
                role: MessageRole::Customer,
                text: format!("m{n}"),
                at: Utc::now(),
            });
        }
        assert_eq!(history.len(), 3);
        let texts: Vec<_> = history.iter().map(|entry| entry.text.as_str()).collect();
        assert_eq!(texts, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn default_history_capacity_matches_contract() {
        assert_eq!(MessageHistory::default().capacity(), HISTORY_CAPACITY);
    }

    #[test]
    fn show_products_truncates_to_page_size() {
        let mut context = ConversationContext::new("s-1");
        let products = (0..30).map(|n| product(&n.to_string())).collect();
        context.show_products(products);
        assert_eq!(context.last_products_shown.len(), PAGE_SIZE);
        assert_eq!(context.product_at(0).map(|p| p.id.0.as_str()), Some("0"));
    }

    #[test]
    fn record_message_touches_updated_at() {
        let mut context = ConversationContext::new("s-2");
        let before = context.updated_at;
        context.record_message(MessageRole::Customer, "hi");
        assert!(context.updated_at >= before);
        assert_eq!(context.message_history.len(), 1);
    }
}
