//! Cart domain types: caller inputs, wire payloads, and the read model.
//!
//! Inputs arrive as loosely-typed values and are checked against the
//! backend's bounds before any request is built. Bound violations on the
//! item itself fail fast; malformed entries inside `extras` and
//! `base_modifications` are dropped during normalization instead, since
//! a single bad extra should not reject the whole item.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use royal_burger_core::{
    IngredientId, MAX_ITEM_QUANTITY, MAX_NOTES_LEN, MIN_ITEM_QUANTITY, ProductId,
};

/// Input validation failures. Thrown synchronously before any network
/// call; never retried or classified.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartInputError {
    /// Product id is not a positive integer.
    #[error("product id must be a positive integer, got {0}")]
    InvalidProductId(i64),

    /// Item id is not a positive integer.
    #[error("item id must be a positive integer, got {0}")]
    InvalidItemId(i64),

    /// Quantity outside the accepted range.
    #[error("quantity must be between {MIN_ITEM_QUANTITY} and {MAX_ITEM_QUANTITY}, got {0}")]
    InvalidQuantity(i64),

    /// Notes exceed the maximum length.
    #[error("notes must be at most {MAX_NOTES_LEN} characters, got {0}")]
    NotesTooLong(usize),
}

// =============================================================================
// Caller Inputs
// =============================================================================

/// Raw extra-ingredient portion as supplied by the caller.
#[derive(Debug, Clone, Copy)]
pub struct ExtraInput {
    /// Ingredient to add.
    pub ingredient_id: i64,
    /// Portions of it.
    pub quantity: i64,
}

/// Raw recipe adjustment as supplied by the caller.
#[derive(Debug, Clone, Copy)]
pub struct BaseModificationInput {
    /// Recipe ingredient to adjust.
    pub ingredient_id: i64,
    /// Signed portion delta; zero means "no change" and is dropped.
    pub delta: i64,
}

/// Raw add-item request.
#[derive(Debug, Clone)]
pub struct AddItemInput {
    /// Product to add.
    pub product_id: i64,
    /// Units of the product.
    pub quantity: i64,
    /// Extra ingredient portions.
    pub extras: Vec<ExtraInput>,
    /// Free-form preparation notes.
    pub notes: String,
    /// Adjustments to the product's default recipe.
    pub base_modifications: Vec<BaseModificationInput>,
}

impl AddItemInput {
    /// Minimal input: a product and a quantity.
    #[must_use]
    pub fn new(product_id: i64, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
            extras: Vec::new(),
            notes: String::new(),
            base_modifications: Vec::new(),
        }
    }

    /// Validate bounds and normalize into the wire payload.
    ///
    /// # Errors
    ///
    /// Returns `CartInputError` when the product id, quantity, or notes
    /// violate the backend's bounds.
    pub fn into_payload(self) -> Result<AddItemPayload, CartInputError> {
        let product_id =
            positive_id(self.product_id).ok_or(CartInputError::InvalidProductId(self.product_id))?;
        let quantity = validate_quantity(self.quantity)?;
        validate_notes(&self.notes)?;

        Ok(AddItemPayload {
            product_id: ProductId::new(product_id),
            quantity,
            extras: normalize_extras(&self.extras),
            notes: self.notes,
            base_modifications: normalize_base_modifications(&self.base_modifications),
            guest_cart_id: None,
        })
    }
}

/// Raw update-item request; absent fields are left untouched server-side.
#[derive(Debug, Clone, Default)]
pub struct UpdateItemInput {
    /// New quantity.
    pub quantity: Option<i64>,
    /// New notes.
    pub notes: Option<String>,
    /// Replacement extras list.
    pub extras: Option<Vec<ExtraInput>>,
    /// Replacement recipe adjustments.
    pub base_modifications: Option<Vec<BaseModificationInput>>,
}

impl UpdateItemInput {
    /// Validate present fields and normalize into the wire payload.
    ///
    /// # Errors
    ///
    /// Returns `CartInputError` when a present field violates the
    /// backend's bounds.
    pub fn into_payload(self) -> Result<UpdateItemPayload, CartInputError> {
        let quantity = self.quantity.map(validate_quantity).transpose()?;
        if let Some(notes) = &self.notes {
            validate_notes(notes)?;
        }

        Ok(UpdateItemPayload {
            quantity,
            notes: self.notes,
            extras: self.extras.as_deref().map(normalize_extras),
            base_modifications: self
                .base_modifications
                .as_deref()
                .map(normalize_base_modifications),
            guest_cart_id: None,
        })
    }
}

// =============================================================================
// Wire Payloads
// =============================================================================

/// Normalized extra portion in the server's expected shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraPayload {
    /// Ingredient to add.
    pub ingredient_id: IngredientId,
    /// Portions of it.
    pub quantity: u32,
}

/// Normalized recipe adjustment in the server's expected shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseModificationPayload {
    /// Recipe ingredient to adjust.
    pub ingredient_id: IngredientId,
    /// Signed portion delta, never zero.
    pub delta: i32,
}

/// Add-item request body.
#[derive(Debug, Clone, Serialize)]
pub struct AddItemPayload {
    /// Product to add.
    pub product_id: ProductId,
    /// Units of the product.
    pub quantity: u32,
    /// Normalized extras.
    pub extras: Vec<ExtraPayload>,
    /// Preparation notes.
    pub notes: String,
    /// Normalized recipe adjustments, omitted when empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub base_modifications: Vec<BaseModificationPayload>,
    /// Guest cart to add into; absent for authenticated users and for
    /// the first guest add (the server allocates a cart).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_cart_id: Option<String>,
}

/// Update-item request body.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateItemPayload {
    /// New quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    /// New notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Replacement extras list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<Vec<ExtraPayload>>,
    /// Replacement recipe adjustments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_modifications: Option<Vec<BaseModificationPayload>>,
    /// Guest cart the item belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_cart_id: Option<String>,
}

// =============================================================================
// Read Model
// =============================================================================

/// Deserialized cart view returned by the read path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    /// Cart identifier, when the server reports one.
    pub id: Option<String>,
    /// Items in the cart.
    pub items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart: the terminal answer for a guest with no (or a
    /// stale) identifier.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A single cart line in the read model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    /// Server-side line id.
    #[serde(default)]
    pub id: Option<i64>,
    /// Product on the line.
    pub product_id: i64,
    /// Units of the product.
    pub quantity: u32,
    /// Product display name, when denormalized into the response.
    #[serde(default)]
    pub product_name: Option<String>,
    /// Preparation notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Extra ingredient portions on the line.
    #[serde(default)]
    pub extras: Vec<ExtraPayload>,
}

// =============================================================================
// Validation & Normalization
// =============================================================================

fn positive_id(raw: i64) -> Option<i32> {
    i32::try_from(raw).ok().filter(|id| *id > 0)
}

fn validate_quantity(raw: i64) -> Result<u32, CartInputError> {
    let quantity = u32::try_from(raw).map_err(|_| CartInputError::InvalidQuantity(raw))?;
    if (MIN_ITEM_QUANTITY..=MAX_ITEM_QUANTITY).contains(&quantity) {
        Ok(quantity)
    } else {
        Err(CartInputError::InvalidQuantity(raw))
    }
}

fn validate_notes(notes: &str) -> Result<(), CartInputError> {
    let len = notes.chars().count();
    if len > MAX_NOTES_LEN {
        return Err(CartInputError::NotesTooLong(len));
    }
    Ok(())
}

/// Normalize extras, dropping entries whose id is not a positive integer
/// or whose quantity is out of bounds.
fn normalize_extras(extras: &[ExtraInput]) -> Vec<ExtraPayload> {
    extras
        .iter()
        .filter_map(|extra| {
            let ingredient_id = positive_id(extra.ingredient_id)?;
            let quantity = validate_quantity(extra.quantity).ok()?;
            Some(ExtraPayload {
                ingredient_id: IngredientId::new(ingredient_id),
                quantity,
            })
        })
        .collect()
}

/// Normalize recipe adjustments, dropping entries whose id is not a
/// positive integer or whose delta is zero.
fn normalize_base_modifications(
    modifications: &[BaseModificationInput],
) -> Vec<BaseModificationPayload> {
    modifications
        .iter()
        .filter_map(|modification| {
            let ingredient_id = positive_id(modification.ingredient_id)?;
            let delta = i32::try_from(modification.delta).ok().filter(|d| *d != 0)?;
            Some(BaseModificationPayload {
                ingredient_id: IngredientId::new(ingredient_id),
                delta,
            })
        })
        .collect()
}
