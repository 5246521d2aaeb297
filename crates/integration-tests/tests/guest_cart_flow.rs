//! Guest cart lifecycle against the stateful backend double: add, read
//! back, update, remove, claim after login, sync, and clear.

#![allow(clippy::unwrap_used)]

use royal_burger_client::cart::{AddItemInput, CartOutcome, ExtraInput, UpdateItemInput};
use royal_burger_client::storage::KeyValueStore;
use royal_burger_integration_tests::{TEST_TOKEN, TestBackend, client_against, ordering_backend};
use serde_json::Value;

#[tokio::test]
async fn test_guest_add_then_read_back() {
    let (router, _state) = ordering_backend();
    let backend = TestBackend::spawn(router).await;
    let (client, storage) = client_against(&backend);

    let outcome = client
        .cart
        .add_item(AddItemInput::new(5, 2))
        .await
        .unwrap();
    let CartOutcome::Success(mutation) = outcome else {
        panic!("add failed: {outcome:?}");
    };

    // A numeric identifier was allocated and persisted
    let cart_id = mutation.cart_id.unwrap();
    assert!(cart_id.bytes().all(|b| b.is_ascii_digit()));
    let raw = storage
        .get("royal_burger_cart")
        .expect("snapshot persisted");
    let snapshot: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(snapshot["cartId"].as_str().unwrap(), cart_id);

    // Read back through the service
    let cart = client.cart.get_cart().await.success().unwrap();
    assert_eq!(cart.id.as_deref(), Some(cart_id.as_str()));
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].product_id, 5);
    assert_eq!(cart.items[0].quantity, 2);
}

#[tokio::test]
async fn test_guest_second_add_reuses_cart() {
    let (router, state) = ordering_backend();
    let backend = TestBackend::spawn(router).await;
    let (client, _storage) = client_against(&backend);

    let first = client
        .cart
        .add_item(AddItemInput::new(5, 1))
        .await
        .unwrap()
        .success()
        .unwrap();
    let second = client
        .cart
        .add_item(AddItemInput::new(8, 3))
        .await
        .unwrap()
        .success()
        .unwrap();

    assert_eq!(first.cart_id, second.cart_id);
    assert_eq!(state.guest_carts.lock().unwrap().len(), 1);

    let cart = client.cart.get_cart().await.success().unwrap();
    assert_eq!(cart.items.len(), 2);
}

#[tokio::test]
async fn test_guest_update_and_remove_with_extras() {
    let (router, _state) = ordering_backend();
    let backend = TestBackend::spawn(router).await;
    let (client, _storage) = client_against(&backend);

    let mut input = AddItemInput::new(5, 1);
    input.extras = vec![ExtraInput {
        ingredient_id: 2,
        quantity: 1,
    }];
    client.cart.add_item(input).await.unwrap();
    client
        .cart
        .add_item(AddItemInput::new(6, 1))
        .await
        .unwrap();

    let cart = client.cart.get_cart().await.success().unwrap();
    let first_id = cart.items[0].id.unwrap();

    // Update goes through proactive identifier validation
    let updates = UpdateItemInput {
        quantity: Some(4),
        notes: Some("sem cebola".to_string()),
        ..UpdateItemInput::default()
    };
    let outcome = client.cart.update_item(first_id, updates).await.unwrap();
    assert!(outcome.is_success());

    let cart = client.cart.get_cart().await.success().unwrap();
    let updated = cart
        .items
        .iter()
        .find(|item| item.id == Some(first_id))
        .unwrap();
    assert_eq!(updated.quantity, 4);
    assert_eq!(updated.notes.as_deref(), Some("sem cebola"));

    // Remove the other line
    let second_id = cart
        .items
        .iter()
        .find(|item| item.id != Some(first_id))
        .unwrap()
        .id
        .unwrap();
    let outcome = client.cart.remove_item(second_id).await.unwrap();
    assert!(outcome.is_success());

    let cart = client.cart.get_cart().await.success().unwrap();
    assert_eq!(cart.items.len(), 1);
}

#[tokio::test]
async fn test_claim_after_login_clears_local_snapshot() {
    let (router, state) = ordering_backend();
    let backend = TestBackend::spawn(router).await;
    let (client, storage) = client_against(&backend);

    client
        .cart
        .add_item(AddItemInput::new(5, 2))
        .await
        .unwrap();
    assert!(storage.get("royal_burger_cart").is_some());

    // Simulate a completed login
    storage.set("rb.token", TEST_TOKEN).unwrap();

    let outcome = client.cart.claim_guest_cart().await;
    assert!(outcome.is_success());

    // Local snapshot gone, items merged server-side
    assert!(storage.get("royal_burger_cart").is_none());
    assert_eq!(state.user_cart.lock().unwrap().len(), 1);
    assert_eq!(state.claimed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_claim_without_login_is_rejected_locally() {
    let (router, state) = ordering_backend();
    let backend = TestBackend::spawn(router).await;
    let (client, storage) = client_against(&backend);

    client
        .cart
        .add_item(AddItemInput::new(5, 1))
        .await
        .unwrap();

    let outcome = client.cart.claim_guest_cart().await;
    assert!(!outcome.is_success());
    // Snapshot survives; nothing was claimed
    assert!(storage.get("royal_burger_cart").is_some());
    assert!(state.claimed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_submits_snapshot_then_clears() {
    let (router, state) = ordering_backend();
    let backend = TestBackend::spawn(router).await;
    let (client, storage) = client_against(&backend);

    client
        .cart
        .add_item(AddItemInput::new(5, 2))
        .await
        .unwrap();
    storage.set("rb.token", TEST_TOKEN).unwrap();

    let outcome = client.cart.sync_cart().await;
    assert!(outcome.is_success());
    assert!(storage.get("royal_burger_cart").is_none());
    assert_eq!(state.user_cart.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_sync_purges_unparseable_snapshot_without_network() {
    let (router, state) = ordering_backend();
    let backend = TestBackend::spawn(router).await;
    let (client, storage) = client_against(&backend);

    storage.set("rb.token", TEST_TOKEN).unwrap();
    storage.set("royal_burger_cart", "{corrupt").unwrap();

    let outcome = client.cart.sync_cart().await;
    assert!(outcome.is_success());
    assert!(storage.get("royal_burger_cart").is_none());
    assert!(state.user_cart.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_guest_clear_removes_every_item_and_purges() {
    let (router, state) = ordering_backend();
    let backend = TestBackend::spawn(router).await;
    let (client, storage) = client_against(&backend);

    for product_id in [5, 6, 7] {
        client
            .cart
            .add_item(AddItemInput::new(product_id, 1))
            .await
            .unwrap();
    }

    let outcome = client.cart.clear_cart().await;
    assert!(outcome.is_success());

    // Per-item removals reached the server, local state purged
    let carts = state.guest_carts.lock().unwrap();
    assert!(carts.values().all(Vec::is_empty));
    drop(carts);
    assert!(storage.get("royal_burger_cart").is_none());

    let cart = client.cart.get_cart().await.success().unwrap();
    assert!(cart.items.is_empty());
}

#[tokio::test]
async fn test_authenticated_clear_uses_single_call() {
    let (router, state) = ordering_backend();
    let backend = TestBackend::spawn(router).await;
    let (client, storage) = client_against(&backend);

    storage.set("rb.token", TEST_TOKEN).unwrap();
    client
        .cart
        .add_item(AddItemInput::new(5, 1))
        .await
        .unwrap();
    assert_eq!(state.user_cart.lock().unwrap().len(), 1);

    let outcome = client.cart.clear_cart().await;
    assert!(outcome.is_success());
    assert!(state.user_cart.lock().unwrap().is_empty());
}
