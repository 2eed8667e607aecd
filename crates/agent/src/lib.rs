//! Conversational product-search orchestration.
//!
//! One turn flows through this crate as follows:
//! 1. **Reference resolution** (`resolver`) - when the session already has a
//!    product list on screen, decide whether the message points back into it
//!    ("the second one", "#2") before treating it as a new search.
//! 2. **Intent extraction** (`extractor`) - free text → structured
//!    `SearchIntent`, via the LLM with a deterministic keyword fallback.
//! 3. **Search cascade** (`strategies`, `search`) - ordered fallback of
//!    parameterized catalog queries, deduplicated and ranked.
//! 4. **Quick actions** - follow-up suggestions derived purely from results
//!    (lives in `budtender-core`).
//! 5. **Context update** - the session row is re-written so the next turn can
//!    resolve references against exactly what this turn showed.
//!
//! # Safety principle
//!
//! The LLM is strictly a translator and classifier. It never touches the
//! catalog, never fabricates products, and every call it makes carries a
//! small token budget and a timeout with a deterministic fallback behind it.

pub mod engine;
pub mod extractor;
pub mod llm;
pub mod prompts;
pub mod resolver;
pub mod search;
pub mod strategies;

pub use engine::{TurnEngine, TurnResponse};
pub use extractor::IntentExtractor;
pub use llm::{HttpLlmClient, LlmClient, ScriptedLlmClient};
pub use resolver::{LlmReferenceResolver, ReferenceResolver, RuleBasedResolver};
pub use search::{SearchOrchestrator, SearchOutcome};
