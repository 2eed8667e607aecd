pub mod config;
pub mod domain;
pub mod errors;
pub mod quick_actions;
pub mod scrape;
pub mod sizes;

pub use domain::action::{QuickAction, QuickActionType};
pub use domain::context::{ConversationContext, MessageEntry, MessageHistory, MessageRole};
pub use domain::intent::SearchIntent;
pub use domain::product::{Product, ProductId};
pub use domain::resolution::{ReferenceAction, ReferenceResolution};
pub use errors::{EngineError, TurnFailure};
pub use quick_actions::derive_quick_actions;

pub use chrono;
