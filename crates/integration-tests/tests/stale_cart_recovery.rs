//! Stale guest-identifier repair: the add path recreates the cart, the
//! read path settles for an empty cart, and the validator fails closed.

#![allow(clippy::unwrap_used)]

use royal_burger_client::cart::{AddItemInput, CartOutcome, UpdateItemInput};
use royal_burger_client::storage::{KeyValueStore, MemoryStore};
use royal_burger_integration_tests::{TestBackend, client_against, ordering_backend};
use serde_json::json;

fn seed_stale_snapshot(storage: &MemoryStore, cart_id: &str) {
    let raw = json!({ "cartId": cart_id, "items": [], "timestamp": 0 }).to_string();
    storage.set("royal_burger_cart", &raw).unwrap();
}

#[tokio::test]
async fn test_add_recovers_from_vanished_guest_cart() {
    let (router, _state) = ordering_backend();
    let backend = TestBackend::spawn(router).await;
    let (client, storage) = client_against(&backend);

    // Identifier for a cart the server never heard of
    seed_stale_snapshot(&storage, "424242");

    let outcome = client
        .cart
        .add_item(AddItemInput::new(5, 2))
        .await
        .unwrap();
    let CartOutcome::Success(mutation) = outcome else {
        panic!("recovery should surface the retried call's success: {outcome:?}");
    };

    // A fresh identifier was allocated and persisted; the stale one is gone
    let new_id = mutation.cart_id.unwrap();
    assert_ne!(new_id, "424242");

    let raw = storage.get("royal_burger_cart").unwrap();
    assert!(raw.contains(&new_id));
    assert!(!raw.contains("424242"));

    // And the cart is readable under the new identity
    let cart = client.cart.get_cart().await.success().unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].product_id, 5);
}

#[tokio::test]
async fn test_read_path_treats_stale_identifier_as_empty() {
    let (router, _state) = ordering_backend();
    let backend = TestBackend::spawn(router).await;
    let (client, storage) = client_against(&backend);

    seed_stale_snapshot(&storage, "424242");

    let cart = client.cart.get_cart().await.success().unwrap();
    assert!(cart.items.is_empty());

    // The stale identifier was purged, not retried
    assert!(storage.get("royal_burger_cart").is_none());
}

#[tokio::test]
async fn test_fallback_identifier_is_purged_without_network() {
    let (router, _state) = ordering_backend();
    let backend = TestBackend::spawn(router).await;
    let (client, storage) = client_against(&backend);

    seed_stale_snapshot(&storage, "fallback_1700000000");

    let cart = client.cart.get_cart().await.success().unwrap();
    assert!(cart.items.is_empty());

    assert!(storage.get("royal_burger_cart").is_none());
}

#[tokio::test]
async fn test_update_with_stale_identifier_drops_it_first() {
    let (router, _state) = ordering_backend();
    let backend = TestBackend::spawn(router).await;
    let (client, storage) = client_against(&backend);

    seed_stale_snapshot(&storage, "424242");

    // Proactive validation finds the cart gone, clears the identifier,
    // and proceeds without one; the backend then reports the item
    // missing, which surfaces as a failure rather than an exception.
    let outcome = client
        .cart
        .update_item(
            1,
            UpdateItemInput {
                quantity: Some(2),
                ..UpdateItemInput::default()
            },
        )
        .await
        .unwrap();
    assert!(!outcome.is_success());

    assert!(storage.get("royal_burger_cart").is_none());
}

#[tokio::test]
async fn test_validator_verdict_is_cached() {
    let (router, state) = ordering_backend();
    let backend = TestBackend::spawn(router).await;
    let (client, _storage) = client_against(&backend);

    // Create a real cart, then drive two validated mutations; the
    // existence check runs once and the second mutation hits the cache.
    client
        .cart
        .add_item(AddItemInput::new(5, 1))
        .await
        .unwrap();
    let cart = client.cart.get_cart().await.success().unwrap();
    let item_id = cart.items[0].id.unwrap();

    client
        .cart
        .update_item(
            item_id,
            UpdateItemInput {
                quantity: Some(2),
                ..UpdateItemInput::default()
            },
        )
        .await
        .unwrap();
    client
        .cart
        .update_item(
            item_id,
            UpdateItemInput {
                quantity: Some(3),
                ..UpdateItemInput::default()
            },
        )
        .await
        .unwrap();

    let cart = client.cart.get_cart().await.success().unwrap();
    assert_eq!(cart.items[0].quantity, 3);
    // Both updates landed on the same cart
    assert_eq!(state.guest_carts.lock().unwrap().len(), 1);
}
