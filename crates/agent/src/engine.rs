use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use budtender_core::domain::context::{ConversationContext, MessageRole};
use budtender_core::domain::intent::SearchIntent;
use budtender_core::domain::product::Product;
use budtender_core::domain::resolution::ReferenceAction;
use budtender_core::errors::EngineError;
use budtender_core::quick_actions::derive_quick_actions;
use budtender_core::QuickAction;
use budtender_db::repositories::{CatalogRepository, ContextStore};

use crate::extractor::IntentExtractor;
use crate::llm::LlmClient;
use crate::resolver::{LlmReferenceResolver, ReferenceResolver};
use crate::search::{SearchOrchestrator, SearchOutcome};

/// One request/response cycle of the conversation. Explicitly constructed
/// with its collaborators; holds no global state.
pub struct TurnEngine {
    context_store: Arc<dyn ContextStore>,
    orchestrator: SearchOrchestrator,
    extractor: IntentExtractor,
    resolver: Arc<dyn ReferenceResolver>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TurnResponse {
    pub message: String,
    pub products: Vec<Product>,
    pub quick_actions: Vec<QuickAction>,
    pub search_performed: bool,
    pub search_intent: Option<SearchIntent>,
    pub total_found: usize,
    pub includes_images: bool,
}

impl TurnEngine {
    pub fn new(
        context_store: Arc<dyn ContextStore>,
        catalog: Arc<dyn CatalogRepository>,
        llm: Arc<dyn LlmClient>,
        llm_budget: Duration,
    ) -> Self {
        Self {
            context_store,
            orchestrator: SearchOrchestrator::new(catalog),
            extractor: IntentExtractor::new(llm.clone(), llm_budget),
            resolver: Arc::new(LlmReferenceResolver::new(llm, llm_budget)),
        }
    }

    /// Swaps the resolver, letting tests run a deterministic implementation
    /// instead of the model-backed one.
    pub fn with_resolver(mut self, resolver: Arc<dyn ReferenceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Processes one customer message. Never returns an error to the
    /// caller: every failure path degrades into a clarification or apology
    /// response.
    pub async fn process_query(
        &self,
        message: &str,
        session_id: &str,
        customer_id: Option<&str>,
    ) -> TurnResponse {
        let mut context = self.load_context(session_id).await;
        if let Some(customer_id) = customer_id {
            context.customer_id = Some(customer_id.to_string());
        }
        context.record_message(MessageRole::Customer, message);

        let response = if context.has_products() {
            match self.try_resolve_reference(message, &mut context).await {
                Some(response) => response,
                None => self.fresh_search(message, &mut context).await,
            }
        } else {
            self.fresh_search(message, &mut context).await
        };

        context.record_message(MessageRole::Assistant, &response.message);
        if let Err(error) = self.context_store.put(&context).await {
            // Availability over strict context consistency: the customer
            // still gets their answer, the next turn may see stale state.
            let failure = EngineError::PersistenceFailure(error.to_string());
            warn!(
                event_name = "turn.context.persist_failed",
                session_id,
                error = %failure,
                "context write failed, returning response anyway"
            );
        }

        response
    }

    async fn load_context(&self, session_id: &str) -> ConversationContext {
        match self.context_store.get(session_id).await {
            Ok(Some(context)) => context,
            Ok(None) => ConversationContext::new(session_id),
            Err(error) => {
                warn!(
                    event_name = "turn.context.read_failed",
                    session_id,
                    error = %error,
                    "context read failed, starting from an empty session"
                );
                ConversationContext::new(session_id)
            }
        }
    }

    /// Reference path; `None` means the message should be treated as a
    /// fresh search.
    async fn try_resolve_reference(
        &self,
        message: &str,
        context: &mut ConversationContext,
    ) -> Option<TurnResponse> {
        let resolution = self.resolver.resolve(message, context).await;
        if resolution.is_reference {
            let product = context.product_at(resolution.product_index?)?.clone();
            info!(
                event_name = "turn.reference.resolved",
                session_id = %context.session_id,
                product_id = %product.id.0,
                action = ?resolution.action,
                "message resolved to a prior product"
            );
            return Some(match resolution.action {
                ReferenceAction::Select => self.select_product(product, context),
                ReferenceAction::Inquire => inquire_response(product, message),
                ReferenceAction::Similar => {
                    self.similar_search(product, message, context).await
                }
            });
        }

        let similarity = self.resolver.resolve_similarity(message, context).await;
        if similarity.is_reference {
            let product = context.product_at(similarity.product_index?)?.clone();
            return Some(self.similar_search(product, message, context).await);
        }

        None
    }

    fn select_product(&self, product: Product, context: &mut ConversationContext) -> TurnResponse {
        context.select_product(product.clone());
        let message = format!(
            "Sounds good — {} ({}) is ready to add to your cart.",
            product.name,
            format_price(product.price_cents)
        );
        let quick_actions = derive_quick_actions(std::slice::from_ref(&product), "add to cart");
        TurnResponse {
            message,
            products: vec![product],
            quick_actions,
            search_performed: false,
            search_intent: None,
            total_found: 1,
            includes_images: true,
        }
    }

    async fn similar_search(
        &self,
        anchor: Product,
        message: &str,
        context: &mut ConversationContext,
    ) -> TurnResponse {
        let intent = SearchIntent {
            category: anchor.category.clone(),
            strain_type: anchor.strain_type.clone(),
            ..SearchIntent::default()
        };

        match self.orchestrator.run(&intent, message).await {
            Ok(mut outcome) => {
                let removed_anchor = outcome.products.iter().any(|p| p.id == anchor.id);
                outcome.products.retain(|p| p.id != anchor.id);
                if removed_anchor {
                    outcome.total_found = outcome.total_found.saturating_sub(1);
                }
                let lead = format!("Here's what's similar to {}:", anchor.name);
                self.search_response(lead, Some(intent), outcome, message, context)
            }
            Err(error) => apology_response(&error),
        }
    }

    async fn fresh_search(
        &self,
        message: &str,
        context: &mut ConversationContext,
    ) -> TurnResponse {
        let intent = self.extractor.extract(message).await;

        match self.orchestrator.run(&intent, message).await {
            Ok(outcome) => {
                let lead = if outcome.products.is_empty() {
                    "I couldn't find anything matching that. Want to browse instead?".to_string()
                } else if outcome.includes_images {
                    format!("Found {} matching products.", outcome.total_found)
                } else {
                    format!(
                        "Found {} matching products — here are the top {}.",
                        outcome.total_found,
                        outcome.products.len()
                    )
                };
                self.search_response(lead, Some(intent), outcome, message, context)
            }
            Err(error) => apology_response(&error),
        }
    }

    fn search_response(
        &self,
        message_text: String,
        intent: Option<SearchIntent>,
        outcome: SearchOutcome,
        customer_message: &str,
        context: &mut ConversationContext,
    ) -> TurnResponse {
        let quick_actions = derive_quick_actions(&outcome.products, customer_message);
        context.show_products(outcome.products.clone());
        context.last_search_criteria = intent.clone();

        TurnResponse {
            message: message_text,
            products: outcome.products,
            quick_actions,
            search_performed: true,
            search_intent: intent,
            total_found: outcome.total_found,
            includes_images: outcome.includes_images,
        }
    }
}

fn inquire_response(product: Product, message: &str) -> TurnResponse {
    let detail = product
        .description
        .clone()
        .unwrap_or_else(|| format!("{} by {}.", product.name, product.brand.as_deref().unwrap_or("an unlisted producer")));
    let text = format!("About {}: {detail}", product.name);
    let quick_actions = derive_quick_actions(std::slice::from_ref(&product), message);
    TurnResponse {
        message: text,
        products: vec![product],
        quick_actions,
        search_performed: false,
        search_intent: None,
        total_found: 1,
        includes_images: true,
    }
}

fn apology_response(error: &EngineError) -> TurnResponse {
    TurnResponse {
        message: error.user_message().to_string(),
        products: Vec::new(),
        quick_actions: Vec::new(),
        search_performed: false,
        search_intent: None,
        total_found: 0,
        includes_images: true,
    }
}

fn format_price(cents: i64) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}
