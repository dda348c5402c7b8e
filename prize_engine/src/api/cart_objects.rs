use pcs_common::Pence;
use serde::{Deserialize, Serialize};

use crate::db_types::NewOrderItem;

/// One proposed cart line as the client last saw it. `expected_unit_price` is the price the customer was shown;
/// validation compares it against the authoritative listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub competition_id: i64,
    pub quantity: i64,
    pub expected_unit_price: Pence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovedCartLine {
    pub competition_id: i64,
    pub reason: String,
}

/// The outcome of validating a cart. `lines` carries the authoritative prices and is what checkout should submit;
/// `removed` explains every line that was dropped; `repriced` counts lines kept with a corrected price.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartValidation {
    pub lines: Vec<NewOrderItem>,
    pub removed: Vec<RemovedCartLine>,
    pub repriced: u64,
}

impl CartValidation {
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }
}

/// Maximum tolerated drift between the price a cart line was built with and the authoritative price, as a fraction
/// of the expected price in basis points. Within tolerance the line is repriced; beyond it, the line is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTolerance {
    basis_points: i64,
}

impl PriceTolerance {
    pub fn percent(pct: i64) -> Self {
        Self { basis_points: pct * 100 }
    }

    pub fn basis_points(bps: i64) -> Self {
        Self { basis_points: bps }
    }

    /// Exact match is always allowed; any drift on a zero expected price is not.
    pub fn allows(&self, expected: Pence, actual: Pence) -> bool {
        if expected == actual {
            return true;
        }
        let drift = (actual.value() - expected.value()).abs();
        drift * 10_000 <= expected.value() * self.basis_points
    }
}

impl Default for PriceTolerance {
    fn default() -> Self {
        Self::percent(5)
    }
}
