use pcs_common::Pence;
use prize_engine::{
    cart_objects::CartLine,
    db_types::{NewInstantPrize, NewOrderItem},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartValidationRequest {
    pub lines: Vec<CartLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// The client-generated order reference; becomes the gateway's `clientUniqueId`.
    pub order_ref: String,
    pub lines: Vec<NewOrderItem>,
    /// Wallet credit the customer chose to apply. Clamped server-side.
    #[serde(default)]
    pub credit: Pence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub amount: Pence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedPrizesRequest {
    pub prizes: Vec<NewInstantPrize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterFileRequest {
    pub path: String,
}

/// Query parameters for the admin order search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderSearchParams {
    pub customer_id: Option<String>,
    /// Comma-separated status list, e.g. `Pending,Paid`
    pub status: Option<String>,
}
