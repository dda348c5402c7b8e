//! # Draw audit seals
//!
//! A draw's fairness cannot be proven after the fact, but its *record* can be made tamper-evident. When a draw is
//! executed we hash the inputs and outcome into a seal that is stored alongside the result:
//!
//! ```text
//!     Blake2b-512( "draw.v1" || competition_id || tickets_sold || winning_number || winner_customer_id )
//! ```
//!
//! with fields joined by `|`. Verification recomputes the seal from the live rows; any edit to the winner, the
//! winning number, or the sold counter after the fact shows up as a mismatch.

use blake2::{Blake2b512, Digest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawInputs<'a> {
    pub competition_id: i64,
    pub tickets_sold: i64,
    pub winning_ticket_number: i64,
    pub winner_customer_id: &'a str,
}

/// The hex-encoded seal for the given draw record.
pub fn draw_seal(inputs: &DrawInputs<'_>) -> String {
    let preimage = format!(
        "draw.v1|{}|{}|{}|{}",
        inputs.competition_id, inputs.tickets_sold, inputs.winning_ticket_number, inputs.winner_customer_id
    );
    let digest = Blake2b512::digest(preimage.as_bytes());
    hex::encode(digest)
}
