use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickActionType {
    FilterSize,
    FilterStrain,
    ProductDetails,
    AddToCart,
    SelectSize,
    ShowAll,
    Browse,
}

/// One suggested follow-up the client can render as a button. Created per
/// turn and never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuickAction {
    pub label: String,
    pub action_type: QuickActionType,
    pub payload: Value,
}

impl QuickAction {
    pub fn new(label: impl Into<String>, action_type: QuickActionType, payload: Value) -> Self {
        Self { label: label.into(), action_type, payload }
    }
}
