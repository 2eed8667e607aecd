use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use budtender_core::domain::context::ConversationContext;
use budtender_core::domain::resolution::{ReferenceAction, ReferenceResolution};
use budtender_core::scrape;

use crate::llm::LlmClient;
use crate::prompts;

/// Default floor under which a resolution is discarded as ambiguous.
const CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Maps deictic messages onto the product list the session last saw.
///
/// Implementations must uphold two guards regardless of how they judge the
/// message: with an empty `last_products_shown` everything is a fresh
/// search, and a `product_index` outside that list is never returned.
/// Misclassifying a fresh search as a reference acts on the wrong product,
/// so every uncertain path collapses to `not_a_reference`.
#[async_trait]
pub trait ReferenceResolver: Send + Sync {
    async fn resolve(&self, message: &str, context: &ConversationContext) -> ReferenceResolution;

    /// Separately guarded "show me similar" judgment, so a new specific
    /// product query is not mistaken for a similarity request.
    async fn resolve_similarity(
        &self,
        message: &str,
        context: &ConversationContext,
    ) -> ReferenceResolution;
}

#[derive(Debug, Deserialize)]
struct ResolutionDraft {
    is_reference: bool,
    product_index: Option<i64>,
    action: Option<String>,
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SimilarityDraft {
    is_similarity_request: bool,
    product_index: Option<i64>,
    confidence: Option<f64>,
}

pub struct LlmReferenceResolver {
    llm: Arc<dyn LlmClient>,
    budget: Duration,
    confidence_threshold: f64,
}

impl LlmReferenceResolver {
    pub fn new(llm: Arc<dyn LlmClient>, budget: Duration) -> Self {
        Self { llm, budget, confidence_threshold: CONFIDENCE_THRESHOLD }
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> Option<String> {
        tokio::time::timeout(self.budget, self.llm.complete(prompt, max_tokens, 0.0))
            .await
            .ok()?
            .ok()
    }

    /// One extra, tightly budgeted call deciding purchase vs inquiry for a
    /// resolution whose action came back missing or unrecognized.
    async fn disambiguate(&self, message: &str, product_name: &str) -> ReferenceAction {
        let prompt = prompts::purchase_vs_inquiry(message, product_name);
        match self.complete(&prompt, prompts::DISAMBIGUATION_MAX_TOKENS).await {
            Some(answer) if answer.to_ascii_lowercase().contains("purchase") => {
                ReferenceAction::Select
            }
            _ => ReferenceAction::Inquire,
        }
    }
}

#[async_trait]
impl ReferenceResolver for LlmReferenceResolver {
    async fn resolve(&self, message: &str, context: &ConversationContext) -> ReferenceResolution {
        if !context.has_products() {
            return ReferenceResolution::not_a_reference();
        }

        let prompt = prompts::reference_resolution(message, &context.last_products_shown);
        let Some(completion) = self.complete(&prompt, prompts::REFERENCE_MAX_TOKENS).await else {
            return ReferenceResolution::not_a_reference();
        };
        let Some(draft) = scrape::scrape_into::<ResolutionDraft>(&completion) else {
            return ReferenceResolution::not_a_reference();
        };

        if !draft.is_reference {
            return ReferenceResolution::not_a_reference();
        }

        let confidence = draft.confidence.unwrap_or(0.0);
        if confidence < self.confidence_threshold {
            debug!(
                event_name = "resolver.low_confidence",
                confidence,
                "discarding low-confidence resolution as a fresh search"
            );
            return ReferenceResolution::not_a_reference();
        }

        let Some(index) = valid_index(draft.product_index, context.last_products_shown.len())
        else {
            return ReferenceResolution::not_a_reference();
        };

        let action = match draft.action.as_deref() {
            Some("select") => ReferenceAction::Select,
            Some("inquire") => ReferenceAction::Inquire,
            Some("similar") => ReferenceAction::Similar,
            _ => {
                let product_name = &context.last_products_shown[index].name;
                self.disambiguate(message, product_name).await
            }
        };

        ReferenceResolution { is_reference: true, product_index: Some(index), action, confidence }
    }

    async fn resolve_similarity(
        &self,
        message: &str,
        context: &ConversationContext,
    ) -> ReferenceResolution {
        if !context.has_products() {
            return ReferenceResolution::not_a_reference();
        }

        let prompt = prompts::similarity_resolution(message, &context.last_products_shown);
        let Some(completion) = self.complete(&prompt, prompts::SIMILARITY_MAX_TOKENS).await else {
            return ReferenceResolution::not_a_reference();
        };
        let Some(draft) = scrape::scrape_into::<SimilarityDraft>(&completion) else {
            return ReferenceResolution::not_a_reference();
        };

        let confidence = draft.confidence.unwrap_or(0.0);
        if !draft.is_similarity_request || confidence < self.confidence_threshold {
            return ReferenceResolution::not_a_reference();
        }

        // An unspecified anchor defaults to the top of the list.
        let index = valid_index(draft.product_index.or(Some(0)), context.last_products_shown.len());
        let Some(index) = index else {
            return ReferenceResolution::not_a_reference();
        };

        ReferenceResolution {
            is_reference: true,
            product_index: Some(index),
            action: ReferenceAction::Similar,
            confidence,
        }
    }
}

fn valid_index(raw: Option<i64>, len: usize) -> Option<usize> {
    let raw = raw?;
    if raw < 0 {
        return None;
    }
    let index = raw as usize;
    (index < len).then_some(index)
}

/// Deterministic resolver over ordinal phrases and intent verbs. Substitutes
/// for the model-backed resolver in tests and offline runs.
#[derive(Default)]
pub struct RuleBasedResolver;

const ORDINALS: &[(&str, usize)] = &[
    ("first", 0),
    ("second", 1),
    ("third", 2),
    ("fourth", 3),
    ("fifth", 4),
    ("last", usize::MAX),
];

const PURCHASE_MARKERS: &[&str] = &["take", "buy", "add", "grab", "purchase", "i'll have", "get me"];
const SIMILARITY_MARKERS: &[&str] = &["similar", "more like", "like that", "like this", "anything else like"];

impl RuleBasedResolver {
    fn find_index(message: &str, len: usize) -> Option<usize> {
        for (word, index) in ORDINALS {
            if message.contains(word) {
                let index = if *index == usize::MAX { len - 1 } else { *index };
                return (index < len).then_some(index);
            }
        }

        // "#2", "number 2", "item 2" are 1-based on screen.
        for marker in ["#", "number ", "item "] {
            if let Some(position) = message.find(marker) {
                let digits: String = message[position + marker.len()..]
                    .chars()
                    .take_while(char::is_ascii_digit)
                    .collect();
                if let Ok(display_number) = digits.parse::<usize>() {
                    if display_number >= 1 && display_number <= len {
                        return Some(display_number - 1);
                    }
                }
            }
        }

        let refers_to_top = message.contains("that one")
            || message.contains("this one")
            || message.split_whitespace().any(|word| word == "it");
        if refers_to_top {
            return (len > 0).then_some(0);
        }
        None
    }
}

#[async_trait]
impl ReferenceResolver for RuleBasedResolver {
    async fn resolve(&self, message: &str, context: &ConversationContext) -> ReferenceResolution {
        if !context.has_products() {
            return ReferenceResolution::not_a_reference();
        }

        let lowered = message.to_ascii_lowercase();
        let Some(index) = Self::find_index(&lowered, context.last_products_shown.len()) else {
            return ReferenceResolution::not_a_reference();
        };

        let action = if SIMILARITY_MARKERS.iter().any(|m| lowered.contains(m)) {
            ReferenceAction::Similar
        } else if PURCHASE_MARKERS.iter().any(|m| lowered.contains(m)) {
            ReferenceAction::Select
        } else {
            ReferenceAction::Inquire
        };

        ReferenceResolution {
            is_reference: true,
            product_index: Some(index),
            action,
            confidence: 0.9,
        }
    }

    async fn resolve_similarity(
        &self,
        message: &str,
        context: &ConversationContext,
    ) -> ReferenceResolution {
        if !context.has_products() {
            return ReferenceResolution::not_a_reference();
        }

        let lowered = message.to_ascii_lowercase();
        if !SIMILARITY_MARKERS.iter().any(|m| lowered.contains(m)) {
            return ReferenceResolution::not_a_reference();
        }

        let index =
            Self::find_index(&lowered, context.last_products_shown.len()).unwrap_or(0);
        ReferenceResolution {
            is_reference: true,
            product_index: Some(index),
            action: ReferenceAction::Similar,
            confidence: 0.9,
        }
    }
}
