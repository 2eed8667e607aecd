use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use budtender_core::domain::intent::SearchIntent;
use budtender_core::scrape;
use budtender_core::sizes;

use crate::llm::LlmClient;
use crate::prompts;

/// Free text → `SearchIntent`. The LLM path is primary; the keyword path
/// below is the deterministic fallback, so `extract` never fails and never
/// blocks longer than the budget.
pub struct IntentExtractor {
    llm: Arc<dyn LlmClient>,
    budget: Duration,
}

/// Tolerant shape for whatever JSON the model produces. Prices arrive in
/// dollars and are converted to cents on the way out.
#[derive(Debug, Default, Deserialize)]
struct IntentDraft {
    product_name: Option<String>,
    brand: Option<String>,
    category: Option<String>,
    sub_category: Option<String>,
    size: Option<String>,
    strain_type: Option<String>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    #[serde(default)]
    effects: Vec<String>,
    special_type: Option<String>,
}

impl IntentExtractor {
    pub fn new(llm: Arc<dyn LlmClient>, budget: Duration) -> Self {
        Self { llm, budget }
    }

    pub async fn extract(&self, query: &str) -> SearchIntent {
        match self.extract_via_llm(query).await {
            Some(intent) if !intent.is_empty() => intent,
            _ => {
                debug!(
                    event_name = "intent.extract.fallback",
                    query_len = query.len(),
                    "llm extraction yielded nothing, using keyword extraction"
                );
                heuristic_extract(query).normalized()
            }
        }
    }

    async fn extract_via_llm(&self, query: &str) -> Option<SearchIntent> {
        let prompt = prompts::intent_extraction(query);
        let completion = tokio::time::timeout(
            self.budget,
            self.llm.complete(&prompt, prompts::INTENT_MAX_TOKENS, 0.0),
        )
        .await
        .ok()?
        .ok()?;

        let draft: IntentDraft = scrape::scrape_into(&completion)?;
        Some(draft.into_intent())
    }
}

impl IntentDraft {
    fn into_intent(self) -> SearchIntent {
        SearchIntent {
            product_name: non_empty(self.product_name),
            brand: non_empty(self.brand),
            category: non_empty(self.category),
            sub_category: non_empty(self.sub_category),
            size: non_empty(self.size),
            strain_type: non_empty(self.strain_type),
            min_price_cents: self.min_price.map(dollars_to_cents),
            max_price_cents: self.max_price.map(dollars_to_cents),
            effects: self.effects.into_iter().filter(|effect| !effect.trim().is_empty()).collect(),
            special_type: non_empty(self.special_type),
        }
        .normalized()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn dollars_to_cents(dollars: f64) -> i64 {
    (dollars * 100.0).round() as i64
}

const KNOWN_BRANDS: &[&str] = &[
    "pure sunfarms",
    "broken coast",
    "redecan",
    "wana",
    "aurora",
    "tweed",
    "7acres",
    "simply bare",
    "good supply",
];

/// (keyword, category, optional sub-category)
const CATEGORY_KEYWORDS: &[(&str, &str, Option<&str>)] = &[
    ("flower", "Flower", None),
    ("bud", "Flower", None),
    ("pre-roll", "Pre-Rolls", Some("Joints")),
    ("preroll", "Pre-Rolls", Some("Joints")),
    ("joint", "Pre-Rolls", Some("Joints")),
    ("edible", "Edibles", None),
    ("gummies", "Edibles", Some("Gummies")),
    ("gummy", "Edibles", Some("Gummies")),
    ("chocolate", "Edibles", Some("Chocolates")),
    ("vape", "Vapes", None),
    ("cartridge", "Vapes", Some("Cartridges")),
    ("concentrate", "Concentrates", None),
    ("shatter", "Concentrates", Some("Shatter")),
    ("hash", "Concentrates", Some("Hash")),
    ("rosin", "Concentrates", Some("Rosin")),
    ("beverage", "Beverages", None),
    ("drink", "Beverages", None),
];

const STRAIN_KEYWORDS: &[&str] = &["indica", "sativa", "hybrid"];

const SPECIAL_KEYWORDS: &[(&str, &str)] = &[("sale", "Sale"), ("discount", "Sale"), ("new", "New")];

pub(crate) const STOPWORDS: &[&str] = &[
    "the", "a", "an", "i", "im", "me", "my", "we", "some", "any", "want", "need", "looking",
    "for", "show", "find", "give", "get", "got", "do", "you", "have", "has", "please", "can",
    "could", "would", "like", "something", "stuff", "me", "in", "of", "and", "or", "with",
];

/// Deterministic extraction: known brands, category/strain keyword tables,
/// size and price phrases, and the stopword-stripped remainder as a
/// free-text product name.
pub fn heuristic_extract(query: &str) -> SearchIntent {
    let lowered = query.to_ascii_lowercase();
    let mut intent = SearchIntent::default();
    let mut consumed: Vec<String> = Vec::new();

    for brand in KNOWN_BRANDS {
        if lowered.contains(brand) {
            intent.brand = Some(title_case(brand));
            consumed.extend(brand.split_whitespace().map(str::to_string));
            break;
        }
    }

    let tokens: Vec<String> = lowered
        .split(|c: char| !c.is_ascii_alphanumeric() && !matches!(c, '$' | '.' | '/' | '-'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    for (keyword, category, sub_category) in CATEGORY_KEYWORDS {
        if tokens.iter().any(|t| t == keyword || t.trim_end_matches('s') == *keyword) {
            intent.category = Some((*category).to_string());
            intent.sub_category = sub_category.map(str::to_string);
            consumed.push((*keyword).to_string());
            break;
        }
    }

    for strain in STRAIN_KEYWORDS {
        if tokens.iter().any(|t| t == strain) {
            intent.strain_type = Some(title_case(strain));
            consumed.push((*strain).to_string());
            break;
        }
    }

    for (keyword, special) in SPECIAL_KEYWORDS {
        if tokens.iter().any(|t| t == keyword) {
            intent.special_type = Some((*special).to_string());
            consumed.push((*keyword).to_string());
            break;
        }
    }

    if let Some((size, size_tokens)) = scan_size(&tokens) {
        intent.size = Some(size);
        consumed.extend(size_tokens);
    }

    apply_price_phrases(&tokens, &mut intent, &mut consumed);

    let remainder: Vec<&str> = tokens
        .iter()
        .map(String::as_str)
        .filter(|t| !STOPWORDS.contains(t) && !consumed.iter().any(|c| c == t))
        .filter(|t| t.parse::<f64>().is_err() && !t.starts_with('$'))
        .collect();
    if !remainder.is_empty() {
        intent.product_name = Some(title_case(&remainder.join(" ")));
    }

    intent
}

/// Slides windows of up to three tokens through the size grammar, widest
/// first so "3 x .5g" beats ".5g". Only windows made entirely of
/// size-vocabulary tokens are considered, so neighbors like "indica" are
/// never swallowed. Returns the canonical size and the consumed tokens.
fn scan_size(tokens: &[String]) -> Option<(String, Vec<String>)> {
    for width in (1..=3).rev() {
        for window in tokens.windows(width) {
            if !window.iter().all(|token| is_size_vocab(token)) {
                continue;
            }
            let phrase = window.join(" ");
            if let Some(size) = sizes::normalize_size(&phrase) {
                return Some((size, window.to_vec()));
            }
        }
    }
    None
}

fn is_size_vocab(token: &str) -> bool {
    const WORDS: &[&str] = &[
        "x", "by", "oz", "ounce", "ounces", "eighth", "quarter", "half", "gram", "grams", "g",
        "1/8", "1/4", "1/2",
    ];
    WORDS.contains(&token)
        || token.parse::<f64>().is_ok()
        || token.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'x' | 'g' | '/'))
}

fn apply_price_phrases(tokens: &[String], intent: &mut SearchIntent, consumed: &mut Vec<String>) {
    const MAX_MARKERS: &[&str] = &["under", "below", "max", "cheaper"];
    const MIN_MARKERS: &[&str] = &["over", "above", "least", "min"];

    for (index, token) in tokens.iter().enumerate() {
        let Some(cents) = parse_money(token) else { continue };
        let marker = tokens[..index].iter().rev().take(2).find(|t| {
            MAX_MARKERS.contains(&t.as_str()) || MIN_MARKERS.contains(&t.as_str())
        });
        match marker {
            Some(m) if MIN_MARKERS.contains(&m.as_str()) => {
                intent.min_price_cents = Some(cents);
                consumed.push(m.clone());
            }
            Some(m) => {
                intent.max_price_cents = Some(cents);
                consumed.push(m.clone());
            }
            // A bare dollar figure reads as a ceiling.
            None if token.starts_with('$') => intent.max_price_cents = Some(cents),
            None => continue,
        }
        consumed.push(token.clone());
    }
}

fn parse_money(token: &str) -> Option<i64> {
    let value: f64 = token.trim_start_matches('$').parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * 100.0).round() as i64)
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
