use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceAction {
    /// Customer wants to buy the referenced product.
    Select,
    /// Customer wants more information about it.
    Inquire,
    /// Customer wants products like it.
    Similar,
}

/// Outcome of resolving a possibly-deictic message ("the second one", "#2")
/// against the products most recently shown. `product_index` is 0-based into
/// exactly that list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceResolution {
    pub is_reference: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_index: Option<usize>,
    pub action: ReferenceAction,
    pub confidence: f64,
}

impl ReferenceResolution {
    /// The safe default: treat the message as a fresh search.
    pub fn not_a_reference() -> Self {
        Self { is_reference: false, product_index: None, action: ReferenceAction::Inquire, confidence: 0.0 }
    }
}
