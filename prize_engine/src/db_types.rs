//! Row types and enumerations shared by the storage traits and their implementations.
//!
//! Every row coming out of the database deserializes into one of the structs in this module via `sqlx::FromRow`.
//! Dynamic, stringly-typed access to rows is deliberately avoided; the boundary between SQL and the rest of the
//! engine is exactly here.

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use pcs_common::{Pence, GBP_CURRENCY_CODE};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(String);

//--------------------------------------       OrderRef        --------------------------------------------------------
/// The client-supplied order reference (the gateway's `clientUniqueId`). Distinct from the internal row id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderRef(pub String);

impl FromStr for OrderRef {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType     --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been created and no gateway outcome has been received yet.
    Pending,
    /// The gateway confirmed the payment and tickets have been allocated.
    Paid,
    /// The gateway reported a decline or error for this order.
    PaymentFailed,
    /// The order sat unpaid past the configured timeout and was swept.
    Expired,
    /// The order was cancelled by an admin before payment.
    Cancelled,
}

impl OrderStatusType {
    /// Every status other than `Pending` is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatusType::Pending)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Paid => write!(f, "Paid"),
            OrderStatusType::PaymentFailed => write!(f, "PaymentFailed"),
            OrderStatusType::Expired => write!(f, "Expired"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "PaymentFailed" => Ok(Self::PaymentFailed),
            "Expired" => Ok(Self::Expired),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------        Order          --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_ref: OrderRef,
    pub customer_id: String,
    pub status: OrderStatusType,
    pub subtotal: Pence,
    pub credit_applied: Pence,
    pub total: Pence,
    pub currency: String,
    pub gateway_txn_id: Option<String>,
    pub gateway_payload: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder        --------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_ref: OrderRef,
    pub customer_id: String,
    pub currency: String,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    pub fn new(order_ref: OrderRef, customer_id: String) -> Self {
        Self { order_ref, customer_id, currency: GBP_CURRENCY_CODE.to_string(), items: Vec::new() }
    }

    pub fn with_item(mut self, item: NewOrderItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn subtotal(&self) -> Pence {
        self.items.iter().map(|i| i.line_total()).sum()
    }

    pub fn ticket_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub competition_id: i64,
    pub quantity: i64,
    pub unit_price: Pence,
}

impl NewOrderItem {
    pub fn new(competition_id: i64, quantity: i64, unit_price: Pence) -> Self {
        Self { competition_id, quantity, unit_price }
    }

    pub fn line_total(&self) -> Pence {
        self.unit_price * self.quantity
    }
}

//--------------------------------------      OrderItem        --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub competition_id: i64,
    pub quantity: i64,
    pub unit_price: Pence,
    pub line_total: Pence,
}

//--------------------------------------  CompetitionStatus    --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum CompetitionStatus {
    Draft,
    Active,
    SoldOut,
    Closed,
    Drawn,
}

impl Display for CompetitionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompetitionStatus::Draft => write!(f, "Draft"),
            CompetitionStatus::Active => write!(f, "Active"),
            CompetitionStatus::SoldOut => write!(f, "SoldOut"),
            CompetitionStatus::Closed => write!(f, "Closed"),
            CompetitionStatus::Drawn => write!(f, "Drawn"),
        }
    }
}

impl FromStr for CompetitionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(Self::Draft),
            "Active" => Ok(Self::Active),
            "SoldOut" => Ok(Self::SoldOut),
            "Closed" => Ok(Self::Closed),
            "Drawn" => Ok(Self::Drawn),
            s => Err(ConversionError(format!("Invalid competition status: {s}"))),
        }
    }
}

//--------------------------------------     Competition       --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Competition {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub status: CompetitionStatus,
    pub ticket_price: Pence,
    pub total_tickets: i64,
    pub tickets_sold: i64,
    pub instant_win: bool,
    pub image_file_id: Option<i64>,
    pub draw_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Competition {
    pub fn tickets_remaining(&self) -> i64 {
        (self.total_tickets - self.tickets_sold).max(0)
    }

    /// A competition can be bought into only while it is `Active` and has stock left.
    pub fn is_purchasable(&self, quantity: i64) -> bool {
        self.status == CompetitionStatus::Active && self.tickets_remaining() >= quantity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCompetition {
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub ticket_price: Pence,
    pub total_tickets: i64,
    #[serde(default)]
    pub instant_win: bool,
    #[serde(default)]
    pub image_file_id: Option<i64>,
    #[serde(default)]
    pub draw_at: Option<DateTime<Utc>>,
}

//--------------------------------------        Ticket         --------------------------------------------------------
/// One purchased competition entry. Rows only ever come into existence on the `Pending` → `Paid` order transition.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub competition_id: i64,
    pub order_id: i64,
    pub customer_id: String,
    pub ticket_number: i64,
    pub revealed: bool,
    pub prize_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------     InstantPrize      --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum InstantPrizeKind {
    Cash,
    Credit,
    Physical,
}

impl Display for InstantPrizeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstantPrizeKind::Cash => write!(f, "Cash"),
            InstantPrizeKind::Credit => write!(f, "Credit"),
            InstantPrizeKind::Physical => write!(f, "Physical"),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InstantPrize {
    pub id: i64,
    pub competition_id: i64,
    pub ticket_number: i64,
    pub kind: InstantPrizeKind,
    pub value: Pence,
    pub claimed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInstantPrize {
    pub ticket_number: i64,
    pub kind: InstantPrizeKind,
    pub value: Pence,
}

//--------------------------------------     WalletCredit      --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum WalletCreditSource {
    Prize,
    Referral,
    Refund,
    Admin,
}

impl Display for WalletCreditSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletCreditSource::Prize => write!(f, "Prize"),
            WalletCreditSource::Referral => write!(f, "Referral"),
            WalletCreditSource::Refund => write!(f, "Refund"),
            WalletCreditSource::Admin => write!(f, "Admin"),
        }
    }
}

/// A store-credit balance unit. `remaining` only ever decreases, and never below zero. Spend order is
/// oldest-expiry-first so customers lose as little as possible to the expiry sweep.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WalletCredit {
    pub id: i64,
    pub customer_id: String,
    pub initial: Pence,
    pub remaining: Pence,
    pub source: WalletCreditSource,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WalletCredit {
    pub fn is_spendable(&self, now: DateTime<Utc>) -> bool {
        self.remaining > Pence::from(0) && self.expires_at > now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWalletCredit {
    pub customer_id: String,
    pub amount: Pence,
    pub source: WalletCreditSource,
    pub expires_at: DateTime<Utc>,
}

//--------------------------------------      Withdrawal       --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    Requested,
    Paid,
    Rejected,
}

impl Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalStatus::Requested => write!(f, "Requested"),
            WithdrawalStatus::Paid => write!(f, "Paid"),
            WithdrawalStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: i64,
    pub customer_id: String,
    pub amount: Pence,
    pub status: WithdrawalStatus,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

//--------------------------------------         Draw          --------------------------------------------------------
/// The recorded outcome of a competition draw. `seal` is a Blake2b digest over the draw inputs so the result can be
/// re-verified later (see `helpers::draw_seal`).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Draw {
    pub id: i64,
    pub competition_id: i64,
    pub winning_ticket_number: i64,
    pub winner_customer_id: String,
    pub seal: String,
    pub drawn_at: DateTime<Utc>,
}

//--------------------------------------  ReferralAttribution  --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReferralAttribution {
    pub id: i64,
    pub customer_id: String,
    pub code: String,
    pub attributed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ReferralAttribution {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

//--------------------------------------     StorageFile       --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StorageFile {
    pub id: i64,
    pub path: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------  GatewayTransaction   --------------------------------------------------------
/// The reconciliation-relevant slice of a gateway callback, already verified and parsed by the HTTP layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayTransaction {
    pub txn_id: String,
    /// The amount the gateway says it settled, if it reported one. Checked against the order total.
    pub amount: Option<Pence>,
    /// The raw callback payload, stored verbatim against the order for audit.
    pub payload: String,
}

impl GatewayTransaction {
    pub fn new<S: Into<String>>(txn_id: S, amount: Option<Pence>, payload: String) -> Self {
        Self { txn_id: txn_id.into(), amount, payload }
    }
}
