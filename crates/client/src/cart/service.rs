//! Cart reconciliation across the guest and authenticated identities.
//!
//! The cart's effective owner is re-derived on every call from whether a
//! bearer token is stored; there is no explicit state machine field.
//! Input validation failures throw synchronously before any network
//! call. Network and server failures are folded into [`CartOutcome`]
//! instead of propagating, so UI code never needs exception handling for
//! expected failure modes.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{instrument, warn};

use crate::api::error::{is_guest_cart_gone, is_stock_error};
use crate::api::{ApiClient, ApiError, ErrorKind};
use crate::auth::CredentialStore;

use super::envelope::{extract_cart_id, extract_items};
use super::guest::GuestCartStore;
use super::types::{AddItemInput, AddItemPayload, Cart, CartInputError, UpdateItemInput};
use super::validator::GuestCartValidator;

/// Machine-readable sub-classification attached to certain failures so
/// the UI can render dedicated messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartErrorCode {
    /// The backend rejected the mutation for lack of ingredient stock.
    InsufficientStock,
}

/// A cart operation failure, already classified and worded for display.
#[derive(Debug, Clone)]
pub struct CartFailure {
    /// Message suitable for direct display.
    pub message: String,
    /// Failure category from the classifier.
    pub kind: ErrorKind,
    /// Dedicated sub-classification, when one applies.
    pub code: Option<CartErrorCode>,
}

/// Uniform result of a cart operation.
///
/// Expected failure modes (network, server rejection) land in
/// `Failure`; only caller input errors surface as `Err` from the
/// operations themselves.
#[derive(Debug)]
pub enum CartOutcome<T> {
    /// The operation succeeded.
    Success(T),
    /// The operation failed in an expected, user-presentable way.
    Failure(CartFailure),
}

impl<T> CartOutcome<T> {
    /// Whether the operation succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The success value, if any.
    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// The failure, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<&CartFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }
}

/// Success data of a cart mutation.
#[derive(Debug, Clone)]
pub struct CartMutation {
    /// Cart identifier echoed by the server, when present.
    pub cart_id: Option<String>,
    /// Raw response body, shape per operation.
    pub body: Value,
}

/// Orchestrator for cart operations over both identity domains.
pub struct CartService {
    api: ApiClient,
    credentials: Arc<CredentialStore>,
    guest: Arc<GuestCartStore>,
    validator: GuestCartValidator,
}

impl CartService {
    /// Create a cart service over its injected collaborators.
    #[must_use]
    pub fn new(
        api: ApiClient,
        credentials: Arc<CredentialStore>,
        guest: Arc<GuestCartStore>,
        validator: GuestCartValidator,
    ) -> Self {
        Self {
            api,
            credentials,
            guest,
            validator,
        }
    }

    /// Add an item to the cart.
    ///
    /// Guests attach their stored cart identifier without pre-validating
    /// it, trading one wasted round-trip on a stale id for one fewer
    /// network call on the common path. If the server reports the guest
    /// cart gone, the stale identifier is cleared and the identical
    /// request re-issued once with no identifier so the server allocates
    /// a fresh cart.
    ///
    /// # Errors
    ///
    /// Returns `CartInputError` before any network call when the input
    /// violates the backend's bounds.
    #[instrument(skip(self, input), fields(product_id = input.product_id))]
    pub async fn add_item(
        &self,
        input: AddItemInput,
    ) -> Result<CartOutcome<CartMutation>, CartInputError> {
        let mut payload = input.into_payload()?;

        let as_guest = !self.credentials.is_authenticated();
        if as_guest {
            payload.guest_cart_id = self.guest.get();
        }

        let outcome = match self.api.post("/api/cart/items", to_body(&payload)).await {
            Ok(body) => CartOutcome::Success(self.record_mutation(body, as_guest)),
            Err(original) if as_guest && payload.guest_cart_id.is_some()
                && is_guest_cart_gone(&original) =>
            {
                self.recreate_guest_cart(payload, &original).await
            }
            Err(e) => CartOutcome::Failure(failure_from(&e)),
        };
        Ok(outcome)
    }

    /// The current cart, from whichever identity owns it.
    ///
    /// For guests a stale or absent identifier yields an empty cart (a
    /// valid terminal answer on the read path, unlike the add path where
    /// a retry can recover); the stale identifier is purged.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> CartOutcome<Cart> {
        if self.credentials.is_authenticated() {
            return match self.api.get("/api/cart/me").await {
                Ok(body) => CartOutcome::Success(parse_cart(&body)),
                Err(e) => CartOutcome::Failure(failure_from(&e)),
            };
        }

        let Some(cart_id) = self.guest.get() else {
            return CartOutcome::Success(Cart::empty());
        };

        match self.api.get(&format!("/api/cart/guest/{cart_id}")).await {
            Ok(body) => CartOutcome::Success(parse_cart(&body)),
            Err(e) => match e.status().map(|s| s.as_u16()) {
                Some(400 | 404) => {
                    warn!(%cart_id, "stored guest cart is gone; treating as empty");
                    self.guest.clear();
                    CartOutcome::Success(Cart::empty())
                }
                _ => CartOutcome::Failure(failure_from(&e)),
            },
        }
    }

    /// Update an item in the cart.
    ///
    /// Unlike add, the guest identifier is validated before the
    /// mutation: an update against a nonexistent cart is unrecoverable
    /// without knowing which cart to recreate. An invalid identifier is
    /// cleared and the update proceeds without one.
    ///
    /// # Errors
    ///
    /// Returns `CartInputError` before any network call when the input
    /// violates the backend's bounds.
    #[instrument(skip(self, updates), fields(item_id = item_id))]
    pub async fn update_item(
        &self,
        item_id: i64,
        updates: UpdateItemInput,
    ) -> Result<CartOutcome<CartMutation>, CartInputError> {
        if item_id <= 0 {
            return Err(CartInputError::InvalidItemId(item_id));
        }
        let mut payload = updates.into_payload()?;

        let as_guest = !self.credentials.is_authenticated();
        if as_guest {
            payload.guest_cart_id = self.validated_guest_id().await;
        }

        let outcome = match self
            .api
            .put(&format!("/api/cart/items/{item_id}"), to_body(&payload))
            .await
        {
            Ok(body) => CartOutcome::Success(self.record_mutation(body, as_guest)),
            Err(e) => CartOutcome::Failure(failure_from(&e)),
        };
        Ok(outcome)
    }

    /// Remove an item from the cart. Same proactive-validation pattern
    /// as update.
    ///
    /// # Errors
    ///
    /// Returns `CartInputError` when `item_id` is not a positive integer.
    #[instrument(skip(self), fields(item_id = item_id))]
    pub async fn remove_item(
        &self,
        item_id: i64,
    ) -> Result<CartOutcome<CartMutation>, CartInputError> {
        if item_id <= 0 {
            return Err(CartInputError::InvalidItemId(item_id));
        }

        let as_guest = !self.credentials.is_authenticated();
        let body = if as_guest {
            self.validated_guest_id()
                .await
                .map(|id| json!({ "guest_cart_id": id }))
        } else {
            None
        };

        let outcome = match self
            .api
            .delete(&format!("/api/cart/items/{item_id}"), body)
            .await
        {
            Ok(body) => CartOutcome::Success(self.record_mutation(body, as_guest)),
            Err(e) => CartOutcome::Failure(failure_from(&e)),
        };
        Ok(outcome)
    }

    /// Merge the stored guest cart into the authenticated user's cart.
    ///
    /// The local snapshot is cleared unconditionally on success: after a
    /// claim the guest cart ceases to exist as a distinct entity, and
    /// the client cannot safely resume against it regardless of partial
    /// failures server-side.
    #[instrument(skip(self))]
    pub async fn claim_guest_cart(&self) -> CartOutcome<Value> {
        if !self.credentials.is_authenticated() {
            return CartOutcome::Failure(login_required());
        }
        let Some(guest_cart_id) = self.guest.get() else {
            return CartOutcome::Success(Value::Null);
        };

        match self
            .api
            .post("/api/cart/claim", json!({ "guest_cart_id": guest_cart_id }))
            .await
        {
            Ok(body) => {
                self.guest.clear();
                CartOutcome::Success(body)
            }
            Err(e) => CartOutcome::Failure(failure_from(&e)),
        }
    }

    /// Submit the locally stored item snapshot to the sync endpoint.
    ///
    /// Reads the raw stored document rather than the normal accessor so
    /// a snapshot predating the current validation rules can still be
    /// submitted. An unparseable snapshot is purged and treated as
    /// nothing to sync. Local state is cleared unconditionally on
    /// success.
    #[instrument(skip(self))]
    pub async fn sync_cart(&self) -> CartOutcome<Value> {
        if !self.credentials.is_authenticated() {
            return CartOutcome::Failure(login_required());
        }
        let Some(raw) = self.guest.raw() else {
            return CartOutcome::Success(Value::Null);
        };

        let items = match serde_json::from_str::<Value>(&raw) {
            Ok(document) => document
                .get("items")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "unparseable guest snapshot; nothing to sync");
                self.guest.clear();
                return CartOutcome::Success(Value::Null);
            }
        };
        if items.is_empty() {
            self.guest.clear();
            return CartOutcome::Success(Value::Null);
        }

        match self.api.post("/api/cart/sync", json!({ "items": items })).await {
            Ok(body) => {
                self.guest.clear();
                CartOutcome::Success(body)
            }
            Err(e) => CartOutcome::Failure(failure_from(&e)),
        }
    }

    /// Empty the cart.
    ///
    /// The authenticated path is a single server call. The guest path
    /// fetches current items and issues the per-item removals in
    /// parallel, each isolated so an individual failure cannot abort the
    /// batch; local state is then purged regardless of per-item
    /// outcomes, since it is the authority for "cart is empty" from the
    /// user's perspective.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> CartOutcome<()> {
        if self.credentials.is_authenticated() {
            return match self.api.delete("/api/cart/me/clear", None).await {
                Ok(_) => CartOutcome::Success(()),
                Err(e) => CartOutcome::Failure(failure_from(&e)),
            };
        }

        let Some(cart_id) = self.guest.get() else {
            return CartOutcome::Success(());
        };

        let items = match self.api.get(&format!("/api/cart/guest/{cart_id}")).await {
            Ok(body) => extract_items(&body),
            Err(e) => {
                warn!(error = %e, "could not fetch guest cart before clear");
                Vec::new()
            }
        };

        let removals = items
            .iter()
            .filter_map(|item| item.get("id").and_then(Value::as_i64))
            .map(|item_id| {
                let api = self.api.clone();
                let guest_cart_id = cart_id.clone();
                async move {
                    if let Err(e) = api
                        .delete(
                            &format!("/api/cart/items/{item_id}"),
                            Some(json!({ "guest_cart_id": guest_cart_id })),
                        )
                        .await
                    {
                        warn!(item_id, error = %e, "item removal failed during clear");
                    }
                }
            });
        futures::future::join_all(removals).await;

        self.guest.clear();
        CartOutcome::Success(())
    }

    // =========================================================================
    // Recovery & Bookkeeping
    // =========================================================================

    /// One-shot compensating action for a vanished guest cart: clear the
    /// stale identifier and re-issue the identical add with none attached
    /// so the server allocates a fresh cart. Never recursive; if the
    /// retry also fails, the original error is what surfaces.
    async fn recreate_guest_cart(
        &self,
        mut payload: AddItemPayload,
        original: &ApiError,
    ) -> CartOutcome<CartMutation> {
        warn!("guest cart vanished server-side; retrying add without identifier");
        self.guest.clear();
        payload.guest_cart_id = None;

        match self.api.post("/api/cart/items", to_body(&payload)).await {
            Ok(body) => CartOutcome::Success(self.record_mutation(body, true)),
            Err(retry_error) => {
                warn!(error = %retry_error, "recovery add failed");
                CartOutcome::Failure(failure_from(original))
            }
        }
    }

    fn record_mutation(&self, body: Value, as_guest: bool) -> CartMutation {
        let cart_id = extract_cart_id(&body);
        if as_guest && let Some(id) = &cart_id {
            self.guest.save(id, &extract_items(&body));
        }
        CartMutation { cart_id, body }
    }

    async fn validated_guest_id(&self) -> Option<String> {
        let cart_id = self.guest.get()?;
        if self.validator.is_valid(&cart_id).await {
            Some(cart_id)
        } else {
            self.guest.clear();
            None
        }
    }
}

fn parse_cart(body: &Value) -> Cart {
    let id = extract_cart_id(body);
    let items = extract_items(body)
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(error = %e, "dropping unreadable cart item");
                None
            }
        })
        .collect();
    Cart { id, items }
}

fn failure_from(error: &ApiError) -> CartFailure {
    let classification = error.classification();
    let code = error.status().and_then(|status| {
        let message = error
            .server_message()
            .unwrap_or_else(|| classification.user_message.clone());
        is_stock_error(status, &message).then_some(CartErrorCode::InsufficientStock)
    });
    CartFailure {
        message: classification.user_message,
        kind: classification.kind,
        code,
    }
}

fn login_required() -> CartFailure {
    CartFailure {
        message: "Faça login para continuar.".to_string(),
        kind: ErrorKind::Unauthorized,
        code: None,
    }
}

fn to_body<T: Serialize>(payload: &T) -> Value {
    // Infallible for these payload types
    serde_json::to_value(payload).unwrap_or(Value::Null)
}
