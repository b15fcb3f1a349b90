//! Wire models shared by the checkout pipeline.

use serde::{Deserialize, Serialize};

/// Snapshot of a shopping cart as returned by the cart service.
///
/// The orchestrator only reads it; the cart service owns mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: i64,
    #[serde(default)]
    pub items: Vec<CartItem>,
    pub total: f64,
}

impl Cart {
    /// Returns true if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A single cart line.
///
/// `price` is the unit price the buyer saw when the item was added, which
/// may differ from the catalog's current price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: i64,
    pub quantity: u32,
    pub price: f64,
}

impl CartItem {
    /// Creates a cart line.
    pub fn new(product_id: i64, quantity: u32, price: f64) -> Self {
        Self {
            product_id,
            quantity,
            price,
        }
    }

    /// Catalog price minus the price seen in the cart. Signed.
    pub fn price_delta(&self, inventory: &Inventory) -> f64 {
        inventory.product.price - self.price
    }

    /// Builds the pending inventory decrement for this line.
    pub fn to_inventory_update(&self) -> InventoryUpdateMessage {
        InventoryUpdateMessage {
            amount_ordered: self.quantity,
            product_id: self.product_id,
        }
    }
}

/// Stock level for a product, with the authoritative product record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub id: i64,
    pub product: Product,
    pub quantity: i64,
}

impl Inventory {
    /// Returns true if at least one unit is on hand.
    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

/// Catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub image: Option<Image>,
}

/// Product image metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: i64,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub size: i64,
}

/// Inventory decrement published once per cart line after a successful order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryUpdateMessage {
    pub amount_ordered: u32,
    pub product_id: i64,
}

/// Body of `POST /api/v1/checkout/{cartId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub user_id: String,
    pub email: String,
    pub address: Address,
    pub credit_card: CreditCard,
}

/// Shipping address. Only `postal_code` feeds the shipping steps.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street_address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
}

/// Card details. Accepted as-is; the payment step does not inspect them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CreditCard {
    pub card_number: String,
    pub card_cvv: i32,
    pub card_expiration_month: i32,
    pub card_expiration_year: i32,
}
