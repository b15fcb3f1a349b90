//! Checkout state machine.

use crate::error::CheckoutError;

/// Progress of a single checkout call.
///
/// State transitions:
/// ```text
/// Start ──► CartFetched ──► InventoryValidated ──► ShippingPriced
///       ──► Charged ──► Shipped ──► Confirmed
///
/// any non-terminal state ──► Failed(kind)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutState {
    #[default]
    Start,
    CartFetched,
    InventoryValidated,
    ShippingPriced,
    Charged,
    Shipped,
    /// Order placed (terminal).
    Confirmed,
    /// Order aborted (terminal).
    Failed(CheckoutError),
}

impl CheckoutState {
    /// The only legal successor on the success path.
    pub fn next(&self) -> Option<CheckoutState> {
        match self {
            CheckoutState::Start => Some(CheckoutState::CartFetched),
            CheckoutState::CartFetched => Some(CheckoutState::InventoryValidated),
            CheckoutState::InventoryValidated => Some(CheckoutState::ShippingPriced),
            CheckoutState::ShippingPriced => Some(CheckoutState::Charged),
            CheckoutState::Charged => Some(CheckoutState::Shipped),
            CheckoutState::Shipped => Some(CheckoutState::Confirmed),
            CheckoutState::Confirmed | CheckoutState::Failed(_) => None,
        }
    }

    /// Returns true once the card has been charged on the success path.
    pub fn is_charged(&self) -> bool {
        matches!(
            self,
            CheckoutState::Charged | CheckoutState::Shipped | CheckoutState::Confirmed
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Start => "Start",
            CheckoutState::CartFetched => "CartFetched",
            CheckoutState::InventoryValidated => "InventoryValidated",
            CheckoutState::ShippingPriced => "ShippingPriced",
            CheckoutState::Charged => "Charged",
            CheckoutState::Shipped => "Shipped",
            CheckoutState::Confirmed => "Confirmed",
            CheckoutState::Failed(_) => "Failed",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckoutState::Failed(kind) => write!(f, "Failed({kind})"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}
