use std::collections::HashMap;

use log::*;

use crate::{
    cart_objects::{CartLine, CartValidation, PriceTolerance, RemovedCartLine},
    db_types::{Competition, CompetitionStatus, NewOrderItem},
    traits::{CompetitionApiError, CompetitionManagement},
};

/// Cart validation against the authoritative catalogue. The policy is: never silently keep a line the catalogue no
/// longer supports. Lines that merely drifted in price within tolerance are repriced; everything else questionable
/// is removed with a reason the storefront can show the customer.
pub struct CartApi<B> {
    db: B,
}

impl<B> CartApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CartApi<B>
where B: CompetitionManagement
{
    pub async fn validate_cart(
        &self,
        lines: &[CartLine],
        tolerance: PriceTolerance,
    ) -> Result<CartValidation, CompetitionApiError> {
        let mut ids = lines.iter().map(|l| l.competition_id).collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        let competitions = self
            .db
            .fetch_competitions_by_ids(&ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect::<HashMap<_, _>>();
        let mut result = CartValidation::default();
        for line in lines {
            match validate_line(line, competitions.get(&line.competition_id), tolerance) {
                LineOutcome::Keep(item) => result.lines.push(item),
                LineOutcome::Reprice(item) => {
                    result.repriced += 1;
                    result.lines.push(item);
                },
                LineOutcome::Remove(reason) => {
                    debug!("🛒️ Dropping cart line for competition {}: {reason}", line.competition_id);
                    result.removed.push(RemovedCartLine { competition_id: line.competition_id, reason });
                },
            }
        }
        if !result.removed.is_empty() {
            info!("🛒️ Cart validation removed {} of {} lines", result.removed.len(), lines.len());
        }
        Ok(result)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

enum LineOutcome {
    Keep(NewOrderItem),
    Reprice(NewOrderItem),
    Remove(String),
}

fn validate_line(line: &CartLine, competition: Option<&Competition>, tolerance: PriceTolerance) -> LineOutcome {
    let competition = match competition {
        Some(c) => c,
        None => return LineOutcome::Remove("competition is no longer available".to_string()),
    };
    if line.quantity < 1 {
        return LineOutcome::Remove(format!("{} is not a valid ticket quantity", line.quantity));
    }
    if !competition.is_purchasable(line.quantity) {
        let reason = match competition.status {
            CompetitionStatus::SoldOut => "competition is sold out".to_string(),
            CompetitionStatus::Active if competition.tickets_remaining() == 0 => {
                "competition is sold out".to_string()
            },
            CompetitionStatus::Active => format!("only {} tickets remaining", competition.tickets_remaining()),
            status => format!("competition is {status}"),
        };
        return LineOutcome::Remove(reason);
    }
    let authoritative = competition.ticket_price;
    if authoritative == line.expected_unit_price {
        LineOutcome::Keep(NewOrderItem::new(competition.id, line.quantity, authoritative))
    } else if tolerance.allows(line.expected_unit_price, authoritative) {
        LineOutcome::Reprice(NewOrderItem::new(competition.id, line.quantity, authoritative))
    } else {
        LineOutcome::Remove(format!(
            "price changed from {} to {}",
            line.expected_unit_price, authoritative
        ))
    }
}
