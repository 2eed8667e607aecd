use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use tracing::info;

use budtender_agent::{TurnEngine, TurnResponse};

#[derive(Clone)]
pub struct ChatState {
    engine: Arc<TurnEngine>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
    #[serde(default)]
    pub customer_id: Option<String>,
}

pub fn router(engine: Arc<TurnEngine>) -> Router {
    Router::new().route("/chat", post(chat)).with_state(ChatState { engine })
}

pub async fn chat(
    State(state): State<ChatState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<TurnResponse>, StatusCode> {
    if request.message.trim().is_empty() || request.session_id.trim().is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let response = state
        .engine
        .process_query(&request.message, &request.session_id, request.customer_id.as_deref())
        .await;

    info!(
        event_name = "chat.turn.completed",
        session_id = %request.session_id,
        search_performed = response.search_performed,
        products = response.products.len(),
        "chat turn completed"
    );

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::util::ServiceExt;

    use budtender_agent::{ScriptedLlmClient, TurnEngine};
    use budtender_core::domain::product::{Product, ProductId};
    use budtender_db::repositories::{InMemoryCatalogRepository, InMemoryContextStore};

    use crate::chat::router;

    fn demo_engine() -> Arc<TurnEngine> {
        let catalog = Arc::new(InMemoryCatalogRepository::new(vec![Product {
            id: ProductId("pk-35".to_string()),
            name: "Pink Kush 3.5g".to_string(),
            brand: Some("Pure Sunfarms".to_string()),
            category: Some("Flower".to_string()),
            sub_category: None,
            sub_sub_category: None,
            size: Some("3.5g".to_string()),
            price_cents: 2_499,
            thc_min_pct: None,
            thc_max_pct: None,
            cbd_min_pct: None,
            cbd_max_pct: None,
            strain_type: Some("Indica".to_string()),
            description: None,
        }]));
        Arc::new(TurnEngine::new(
            Arc::new(InMemoryContextStore::default()),
            catalog,
            Arc::new(ScriptedLlmClient::new(vec![
                r#"{"product_name": "Pink Kush", "category": "Flower"}"#,
            ])),
            Duration::from_secs(1),
        ))
    }

    #[tokio::test]
    async fn chat_endpoint_runs_a_turn_and_returns_products() {
        let app = router(demo_engine());

        let request = Request::post("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"message": "pink kush flower", "session_id": "sess-http-1"}"#,
            ))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let payload: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(payload["search_performed"], true);
        assert_eq!(payload["products"][0]["id"], "pk-35");
    }

    #[tokio::test]
    async fn chat_endpoint_rejects_blank_messages() {
        let app = router(demo_engine());

        let request = Request::post("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"message": "   ", "session_id": "sess-http-2"}"#))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
