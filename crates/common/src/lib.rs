//! Shared models for the checkout service.
//!
//! Holds the wire shapes exchanged with the cart and catalog services, the
//! inbound order request and the broker message.

pub mod models;

pub use models::{
    Address, Cart, CartItem, CreditCard, Image, Inventory, InventoryUpdateMessage,
    PlaceOrderRequest, Product,
};
