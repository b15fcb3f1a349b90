//! Checkout error taxonomy.

use thiserror::Error;

/// Why a checkout call failed.
///
/// Exactly one kind per failed call, bound to the step that failed. Raw
/// collaborator errors never cross this boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum CheckoutError {
    /// The order request was missing.
    #[error("missing order request")]
    InvalidRequest,

    /// The cart could not be fetched.
    #[error("cart not found")]
    CartNotFound,

    /// Stock for a cart line could not be fetched.
    #[error("product not found")]
    ProductNotFound,

    /// A cart line has no stock left.
    #[error("insufficient inventory")]
    InsufficientInventory,

    /// The shipping cost estimate failed.
    #[error("shipping cost calculation failed")]
    ShippingCostCalculationFailed,

    /// The card charge failed.
    #[error("card declined")]
    CardDeclined,

    /// The shipping label could not be issued.
    #[error("shipping label not issued")]
    ShippingLabelNotIssued,

    /// An inventory update could not be published.
    #[error("failed to update inventory")]
    InventoryUpdateFailure,
}

impl CheckoutError {
    /// Failure-counter tag for this kind. `None` for request validation,
    /// which happens before the pipeline starts.
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            CheckoutError::InvalidRequest => None,
            CheckoutError::CartNotFound => Some(FailureReason::CartFailure),
            CheckoutError::ProductNotFound => Some(FailureReason::CatalogFailure),
            CheckoutError::InsufficientInventory => Some(FailureReason::InsufficientInventory),
            CheckoutError::ShippingCostCalculationFailed => {
                Some(FailureReason::ShippingCostFailure)
            }
            CheckoutError::CardDeclined => Some(FailureReason::CardDeclined),
            CheckoutError::ShippingLabelNotIssued => Some(FailureReason::ShippingLabelFailure),
            CheckoutError::InventoryUpdateFailure => Some(FailureReason::InventoryUpdateFailure),
        }
    }
}

/// Tag attached to the failed-order counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    CartFailure,
    CatalogFailure,
    InsufficientInventory,
    ShippingCostFailure,
    CardDeclined,
    ShippingLabelFailure,
    InventoryUpdateFailure,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::CartFailure => "CART_FAILURE",
            FailureReason::CatalogFailure => "CATALOG_FAILURE",
            FailureReason::InsufficientInventory => "INSUFFICIENT_INVENTORY",
            FailureReason::ShippingCostFailure => "SHIPPING_COST_FAILURE",
            FailureReason::CardDeclined => "CARD_DECLINED",
            FailureReason::ShippingLabelFailure => "SHIPPING_LABEL_FAILURE",
            FailureReason::InventoryUpdateFailure => "INVENTORY_UPDATE_FAILURE",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors from the simulated payment and shipping providers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// The provider refused the request.
    #[error("{0}")]
    Rejected(String),
}
