//! # G2Pay gateway callback contract
//!
//! G2Pay notifies us of a transaction outcome with an asynchronous form-encoded POST. The request is authenticated
//! by a `signature` field computed over every other field:
//!
//! 1. sort the fields by name,
//! 2. URL-encode each key and value, with every line-ending variant (`\r\n`, `\r`) in values normalised to `\n`
//!    first,
//! 3. join as a single query string `k=v&k2=v2`,
//! 4. append the merchant secret and hash the lot with SHA-256,
//! 5. hex-encode, lowercase.
//!
//! The comparison against the supplied signature must not short-circuit; see
//! [`crate::helpers::constant_time_eq`]. A request with a missing or mismatching signature is rejected before any
//! field is even parsed, and nothing is mutated.

use std::{borrow::Cow, collections::BTreeMap, fmt::Display, str::FromStr};

use pcs_common::Pence;
use prize_engine::db_types::OrderRef;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::helpers::constant_time_eq;

/// The form field carrying the signature. Excluded from the signature base string.
pub const SIGNATURE_FIELD: &str = "signature";

#[derive(Debug, Clone, Error)]
pub enum CallbackError {
    #[error("Callback is missing the required field '{0}'")]
    MissingField(&'static str),
    #[error("'{0}' is not a recognised transaction status")]
    UnknownStatus(String),
    #[error("Callback field '{field}' is malformed: {reason}")]
    MalformedField { field: &'static str, reason: String },
}

//--------------------------------------  TransactionStatus    --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Approved,
    Declined,
    Error,
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Approved => write!(f, "APPROVED"),
            TransactionStatus::Declined => write!(f, "DECLINED"),
            TransactionStatus::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = CallbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "APPROVED" => Ok(Self::Approved),
            "DECLINED" => Ok(Self::Declined),
            "ERROR" => Ok(Self::Error),
            other => Err(CallbackError::UnknownStatus(other.to_string())),
        }
    }
}

//--------------------------------------    G2PayCallback      --------------------------------------------------------
/// The reconciliation-relevant fields of a verified callback. Unknown fields are kept in the raw field map (and in
/// the signature base string) but are not interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct G2PayCallback {
    pub transaction_status: TransactionStatus,
    pub transaction_id: String,
    /// Our order reference, echoed back by the gateway.
    pub client_unique_id: OrderRef,
    /// The settled amount as a decimal currency string, when reported.
    pub total_amount: Option<Pence>,
    pub currency: Option<String>,
}

impl G2PayCallback {
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Result<Self, CallbackError> {
        let require = |name: &'static str| {
            fields.get(name).filter(|v| !v.is_empty()).ok_or(CallbackError::MissingField(name))
        };
        let transaction_status = require("transactionStatus")?.parse::<TransactionStatus>()?;
        let transaction_id = require("transactionId")?.clone();
        let client_unique_id = OrderRef(require("clientUniqueId")?.clone());
        let total_amount = fields
            .get("totalAmount")
            .filter(|v| !v.is_empty())
            .map(|v| {
                v.parse::<Pence>().map_err(|e| CallbackError::MalformedField {
                    field: "totalAmount",
                    reason: e.to_string(),
                })
            })
            .transpose()?;
        let currency = fields.get("currency").filter(|v| !v.is_empty()).cloned();
        Ok(Self { transaction_status, transaction_id, client_unique_id, total_amount, currency })
    }
}

//--------------------------------------      Signatures       --------------------------------------------------------

/// The expected signature for a callback field map (the `signature` field itself must not be in the map).
pub fn callback_signature(fields: &BTreeMap<String, String>, secret: &str) -> String {
    // BTreeMap iteration is already name-sorted
    let encoded = fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(&normalise_newlines(v))))
        .collect::<Vec<_>>()
        .join("&");
    let digest = Sha256::digest(format!("{encoded}{secret}").as_bytes());
    hex::encode(digest)
}

/// Whether `provided` matches the expected signature for `fields`. Case of the hex digits is not significant.
pub fn verify_signature(fields: &BTreeMap<String, String>, provided: &str, secret: &str) -> bool {
    let expected = callback_signature(fields, secret);
    constant_time_eq(expected.as_bytes(), provided.to_ascii_lowercase().as_bytes())
}

/// Gateways are not consistent about line endings in free-text fields; all variants hash as `\n`.
fn normalise_newlines(value: &str) -> Cow<'_, str> {
    if value.contains('\r') {
        Cow::Owned(value.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(value)
    }
}
