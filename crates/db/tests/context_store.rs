//! Round-trip and read-through contract of the durable context store.

use budtender_core::domain::context::{ConversationContext, MessageRole};
use budtender_core::domain::intent::SearchIntent;
use budtender_core::domain::product::{Product, ProductId};
use budtender_db::migrations::run_pending;
use budtender_db::repositories::{ContextStore, SqlContextStore};
use budtender_db::{connect_with_settings, DbPool};

// One connection per pool so the in-memory database survives across calls.
async fn migrated_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
    run_pending(&pool).await.expect("migrate");
    pool
}

fn product(id: &str, name: &str, price_cents: i64) -> Product {
    Product {
        id: ProductId(id.to_string()),
        name: name.to_string(),
        brand: Some("Pure Sunfarms".to_string()),
        category: Some("Flower".to_string()),
        sub_category: Some("Dried Flower".to_string()),
        sub_sub_category: None,
        size: Some("3.5g".to_string()),
        price_cents,
        thc_min_pct: Some(20.0),
        thc_max_pct: Some(26.0),
        cbd_min_pct: None,
        cbd_max_pct: None,
        strain_type: Some("Indica".to_string()),
        description: Some("Earthy indica.".to_string()),
    }
}

#[tokio::test]
async fn round_trip_preserves_products_order_and_selection() {
    let store = SqlContextStore::new(migrated_pool().await);

    let mut context = ConversationContext::new("sess-1");
    context.customer_id = Some("cust-9".to_string());
    context.show_products(vec![
        product("a", "Pink Kush 3.5g", 2_499),
        product("b", "Pink Kush 7g", 4_499),
        product("c", "Blue Dream 3.5g", 3_299),
    ]);
    context.select_product(product("b", "Pink Kush 7g", 4_499));
    context.last_search_criteria =
        Some(SearchIntent { product_name: Some("pink kush".to_string()), ..SearchIntent::default() });
    context.record_message(MessageRole::Customer, "got any pink kush?");
    context.record_message(MessageRole::Assistant, "Found 3 products.");

    store.put(&context).await.expect("put");
    let loaded = store.get("sess-1").await.expect("get").expect("present");

    let ids: Vec<_> = loaded.last_products_shown.iter().map(|p| p.id.0.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(loaded.last_selected_product, context.last_selected_product);
    assert_eq!(loaded.last_search_criteria, context.last_search_criteria);
    assert_eq!(loaded.customer_id.as_deref(), Some("cust-9"));
    assert_eq!(loaded.message_history.len(), 2);
}

#[tokio::test]
async fn get_is_read_through_and_sees_sibling_writes() {
    let pool = migrated_pool().await;
    let store_a = SqlContextStore::new(pool.clone());
    let store_b = SqlContextStore::new(pool);

    let mut context = ConversationContext::new("sess-2");
    context.show_products(vec![product("a", "Pink Kush 3.5g", 2_499)]);
    store_a.put(&context).await.expect("put via a");

    // A second repository over the same durable store must observe the
    // write immediately; there is no process cache to go stale.
    let loaded = store_b.get("sess-2").await.expect("get via b").expect("present");
    assert_eq!(loaded.last_products_shown.len(), 1);

    context.show_products(vec![
        product("x", "Sour Tangie 28g", 11_999),
        product("y", "Blue Dream 3.5g", 3_299),
    ]);
    store_b.put(&context).await.expect("put via b");

    let reloaded = store_a.get("sess-2").await.expect("get via a").expect("present");
    let ids: Vec<_> = reloaded.last_products_shown.iter().map(|p| p.id.0.as_str()).collect();
    assert_eq!(ids, vec!["x", "y"]);
}

#[tokio::test]
async fn missing_session_reads_as_empty() {
    let store = SqlContextStore::new(migrated_pool().await);
    assert!(store.get("never-seen").await.expect("get").is_none());
}

#[tokio::test]
async fn last_writer_wins_on_the_same_session() {
    let store = SqlContextStore::new(migrated_pool().await);

    let mut first = ConversationContext::new("sess-3");
    first.show_products(vec![product("a", "Pink Kush 3.5g", 2_499)]);
    let mut second = ConversationContext::new("sess-3");
    second.show_products(vec![product("b", "Pink Kush 7g", 4_499)]);

    store.put(&first).await.expect("first put");
    store.put(&second).await.expect("second put");

    let loaded = store.get("sess-3").await.expect("get").expect("present");
    assert_eq!(loaded.last_products_shown[0].id.0, "b");
}
