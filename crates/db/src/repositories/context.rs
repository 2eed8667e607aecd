use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use budtender_core::domain::context::{ConversationContext, MessageHistory};
use budtender_core::domain::intent::SearchIntent;
use budtender_core::domain::product::Product;

use super::{ContextStore, RepositoryError};
use crate::DbPool;

/// Durable context store over the `conversation_contexts` table. Every
/// `get` hits the database; there is deliberately no process-local cache so
/// a restarted or sibling worker never resolves references against a stale
/// product list.
pub struct SqlContextStore {
    pool: DbPool,
}

impl SqlContextStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContextStore for SqlContextStore {
    async fn get(
        &self,
        session_id: &str,
    ) -> Result<Option<ConversationContext>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT session_id, customer_id, last_products_shown, last_selected_product,
                   last_search_criteria, message_history, updated_at
            FROM conversation_contexts
            WHERE session_id = ?1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|value| context_from_row(&value)).transpose()
    }

    async fn put(&self, context: &ConversationContext) -> Result<(), RepositoryError> {
        let products = serde_json::to_string(&context.last_products_shown)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;
        let selected = context
            .last_selected_product
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;
        let criteria = context
            .last_search_criteria
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;
        let history = serde_json::to_string(&context.message_history)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO conversation_contexts (
                session_id, customer_id, last_products_shown, last_selected_product,
                last_search_criteria, message_history, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(session_id) DO UPDATE SET
                customer_id = excluded.customer_id,
                last_products_shown = excluded.last_products_shown,
                last_selected_product = excluded.last_selected_product,
                last_search_criteria = excluded.last_search_criteria,
                message_history = excluded.message_history,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&context.session_id)
        .bind(context.customer_id.as_deref())
        .bind(products)
        .bind(selected)
        .bind(criteria)
        .bind(history)
        .bind(context.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn context_from_row(row: &SqliteRow) -> Result<ConversationContext, RepositoryError> {
    let products_json: String = row.try_get("last_products_shown").map_err(decode_sql)?;
    let last_products_shown: Vec<Product> =
        serde_json::from_str(&products_json).map_err(decode_json)?;

    let selected_json: Option<String> =
        row.try_get("last_selected_product").map_err(decode_sql)?;
    let last_selected_product = selected_json
        .as_deref()
        .map(serde_json::from_str::<Product>)
        .transpose()
        .map_err(decode_json)?;

    let criteria_json: Option<String> =
        row.try_get("last_search_criteria").map_err(decode_sql)?;
    let last_search_criteria = criteria_json
        .as_deref()
        .map(serde_json::from_str::<SearchIntent>)
        .transpose()
        .map_err(decode_json)?;

    let history_json: String = row.try_get("message_history").map_err(decode_sql)?;
    let message_history: MessageHistory =
        serde_json::from_str(&history_json).map_err(decode_json)?;

    let updated_at_raw: String = row.try_get("updated_at").map_err(decode_sql)?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_at_raw)
        .map_err(|error| RepositoryError::Decode(error.to_string()))?
        .with_timezone(&Utc);

    Ok(ConversationContext {
        session_id: row.try_get("session_id").map_err(decode_sql)?,
        customer_id: row.try_get("customer_id").map_err(decode_sql)?,
        last_products_shown,
        last_selected_product,
        last_search_criteria,
        message_history,
        updated_at,
    })
}

fn decode_sql(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

fn decode_json(error: serde_json::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}
