use thiserror::Error;

/// Failure taxonomy for one conversational turn. Every variant degrades to a
/// user-safe reply; none of them surfaces as a raw error to the caller.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("intent extraction failed: {0}")]
    ExtractionFailure(String),
    #[error("product store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("reference resolution ambiguous: {0}")]
    ResolutionAmbiguous(String),
    #[error("context persistence failed: {0}")]
    PersistenceFailure(String),
}

/// How a failed turn presents to the customer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnFailure {
    /// Degrade silently; the deterministic path already produced an answer.
    Silent,
    /// Apologize and return an empty result.
    Apology,
}

impl EngineError {
    pub fn turn_failure(&self) -> TurnFailure {
        match self {
            Self::StoreUnavailable(_) => TurnFailure::Apology,
            Self::ExtractionFailure(_)
            | Self::ResolutionAmbiguous(_)
            | Self::PersistenceFailure(_) => TurnFailure::Silent,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::StoreUnavailable(_) => {
                "Sorry, I couldn't reach the product catalog just now. Please try again in a moment."
            }
            Self::ExtractionFailure(_) | Self::ResolutionAmbiguous(_) => {
                "I didn't quite catch that. Could you tell me what you're looking for?"
            }
            Self::PersistenceFailure(_) => {
                "Here's what I found, though I may not remember this next time."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineError, TurnFailure};

    #[test]
    fn store_outage_is_the_only_apology_path() {
        assert_eq!(
            EngineError::StoreUnavailable("connection refused".to_string()).turn_failure(),
            TurnFailure::Apology
        );
        assert_eq!(
            EngineError::ExtractionFailure("timeout".to_string()).turn_failure(),
            TurnFailure::Silent
        );
        assert_eq!(
            EngineError::ResolutionAmbiguous("low confidence".to_string()).turn_failure(),
            TurnFailure::Silent
        );
        assert_eq!(
            EngineError::PersistenceFailure("row lock".to_string()).turn_failure(),
            TurnFailure::Silent
        );
    }

    #[test]
    fn every_variant_has_a_user_safe_message() {
        let variants = [
            EngineError::ExtractionFailure(String::new()),
            EngineError::StoreUnavailable(String::new()),
            EngineError::ResolutionAmbiguous(String::new()),
            EngineError::PersistenceFailure(String::new()),
        ];
        for variant in variants {
            assert!(!variant.user_message().is_empty());
        }
    }
}
