//! Expected cart failure modes: input bounds rejected before the
//! network, and stock-insufficiency surfaced with its dedicated code.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{post, put};
use serde_json::json;

use royal_burger_client::cart::{
    AddItemInput, CartErrorCode, CartInputError, CartOutcome, UpdateItemInput,
};
use royal_burger_core::MAX_ITEM_QUANTITY;
use royal_burger_integration_tests::{TestBackend, client_against};

/// Router that rejects every mutation with a stock error, counting hits.
fn stock_error_router() -> (Router, Arc<AtomicU32>) {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&hits);
    let put_counter = Arc::clone(&hits);
    let router = Router::new()
        .route(
            "/api/cart/items",
            post(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        axum::Json(json!({
                            "error": "Ingrediente 'Queijo' insuficiente para 2 unidades"
                        })),
                    )
                }
            }),
        )
        .route(
            "/api/cart/items/{item_id}",
            put(move || {
                let counter = Arc::clone(&put_counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        axum::Json(json!({
                            "error": "Ingrediente 'Queijo' insuficiente para 2 unidades"
                        })),
                    )
                }
            }),
        );
    (router, hits)
}

#[tokio::test]
async fn test_quantity_bound_rejected_before_any_network_call() {
    let (router, hits) = stock_error_router();
    let backend = TestBackend::spawn(router).await;
    let (client, _storage) = client_against(&backend);

    let over_limit = i64::from(MAX_ITEM_QUANTITY) + 1;
    let error = client
        .cart
        .add_item(AddItemInput::new(5, over_limit))
        .await
        .unwrap_err();
    assert_eq!(error, CartInputError::InvalidQuantity(over_limit));
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    let error = client
        .cart
        .add_item(AddItemInput::new(-1, 2))
        .await
        .unwrap_err();
    assert_eq!(error, CartInputError::InvalidProductId(-1));

    let error = client
        .cart
        .update_item(0, UpdateItemInput::default())
        .await
        .unwrap_err();
    assert_eq!(error, CartInputError::InvalidItemId(0));

    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stock_error_surfaced_on_update() {
    let (router, hits) = stock_error_router();
    let backend = TestBackend::spawn(router).await;
    let (client, _storage) = client_against(&backend);

    let outcome = client
        .cart
        .update_item(
            7,
            UpdateItemInput {
                quantity: Some(2),
                ..UpdateItemInput::default()
            },
        )
        .await
        .unwrap();

    let CartOutcome::Failure(failure) = outcome else {
        panic!("expected a stock failure");
    };
    assert_eq!(failure.code, Some(CartErrorCode::InsufficientStock));
    assert_eq!(
        failure.message,
        "Ingrediente 'Queijo' insuficiente para 2 unidades"
    );
    // Validation errors are not retried
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stock_error_surfaced_on_add() {
    let (router, _hits) = stock_error_router();
    let backend = TestBackend::spawn(router).await;
    let (client, _storage) = client_against(&backend);

    let outcome = client
        .cart
        .add_item(AddItemInput::new(5, 2))
        .await
        .unwrap();

    let failure = match outcome {
        CartOutcome::Failure(failure) => failure,
        CartOutcome::Success(_) => panic!("expected a stock failure"),
    };
    assert_eq!(failure.code, Some(CartErrorCode::InsufficientStock));
}
