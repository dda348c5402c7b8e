//! `SqliteDatabase` is a concrete implementation of a platform storage backend.
//!
//! Unsurprisingly, it uses SQLite, and implements all the traits defined in the [`crate::traits`] module. Every
//! multi-step mutation runs inside a single transaction; dropping the transaction on an early error return rolls
//! everything back, so no partial state survives a failed flow.

use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;
use pcs_common::Pence;
use rand::Rng;
use sqlx::SqlitePool;

use super::db::{competitions, db_url, draws, files, new_pool, orders, tickets, wallet};
use crate::{
    db_types::{
        Competition,
        CompetitionStatus,
        Draw,
        GatewayTransaction,
        InstantPrizeKind,
        NewCompetition,
        NewInstantPrize,
        NewOrder,
        NewWalletCredit,
        Order,
        OrderItem,
        OrderRef,
        OrderStatusType,
        ReferralAttribution,
        StorageFile,
        Ticket,
        WalletCredit,
        WalletCreditSource,
        Withdrawal,
    },
    helpers::{draw_seal, DrawInputs},
    order_objects::OrderQueryFilter,
    traits::{
        CheckoutOutcome,
        CompetitionApiError,
        CompetitionManagement,
        DrawCheck,
        DrawVerification,
        ExpirySweep,
        FailureOutcome,
        MaintenanceError,
        MaintenanceOperations,
        PaymentGatewayDatabase,
        PaymentGatewayError,
        PayoutRunResult,
        RevealOutcome,
        SettlementOutcome,
        WalletApiError,
        WalletManagement,
        WalletSummary,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_order(
        &self,
        order: NewOrder,
        credit_requested: Pence,
    ) -> Result<CheckoutOutcome, PaymentGatewayError> {
        if order.items.is_empty() {
            return Err(PaymentGatewayError::EmptyOrder);
        }
        let mut tx = self.pool.begin().await?;
        if orders::fetch_order_by_ref(&order.order_ref, &mut tx).await?.is_some() {
            return Err(PaymentGatewayError::OrderAlreadyExists(order.order_ref));
        }
        for item in &order.items {
            let competition = competitions::fetch_competition(item.competition_id, &mut tx)
                .await?
                .ok_or(PaymentGatewayError::CompetitionNotFound(item.competition_id))?;
            if !competition.is_purchasable(item.quantity) {
                let reason = purchasability_reason(&competition);
                return Err(PaymentGatewayError::NotPurchasable(competition.id, reason));
            }
            if competition.ticket_price != item.unit_price {
                return Err(PaymentGatewayError::StalePrice(competition.id));
            }
        }
        let subtotal = order.subtotal();
        // Clamp to the post-discount ceiling; debit_credits clamps to the available balance.
        let requested = credit_requested.min(subtotal).max(Pence::from(0));
        let applied = wallet::debit_credits(&order.customer_id, requested, Utc::now(), &mut tx).await?;
        let total = subtotal - applied;
        let mut order_row = orders::insert_order(&order, subtotal, applied, total, &mut tx).await?;
        let items = orders::insert_order_items(order_row.id, &order, &mut tx).await?;
        debug!("🗃️ Order {} created: subtotal {subtotal}, credit {applied}, total {total}", order_row.order_ref);
        let mut allocated = Vec::new();
        if total.is_zero() {
            // Fully covered by credit: settle now, no gateway round-trip will ever come.
            let payload = serde_json::json!({ "settledBy": "wallet-credit" }).to_string();
            let txn = GatewayTransaction::new("wallet-credit", Some(Pence::from(0)), payload);
            if let Some(paid) = orders::mark_paid(order_row.id, &txn, &mut tx).await? {
                allocated = tickets::allocate_for_order(&paid, &items, &mut tx).await?;
                info!(
                    "🗃️ Order {} settled immediately from wallet credit; {} tickets allocated",
                    paid.order_ref,
                    allocated.len()
                );
                order_row = paid;
            }
        }
        tx.commit().await?;
        Ok(CheckoutOutcome { order: order_row, items, tickets: allocated })
    }

    async fn fetch_order_by_ref(&self, order_ref: &OrderRef) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_ref(order_ref, &mut conn).await?)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_items(order_id, &mut conn).await?)
    }

    async fn fetch_tickets_for_order(&self, order_id: i64) -> Result<Vec<Ticket>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        Ok(tickets::fetch_tickets_for_order(order_id, &mut conn).await?)
    }

    async fn confirm_order_paid(
        &self,
        order_ref: &OrderRef,
        txn: &GatewayTransaction,
    ) -> Result<SettlementOutcome, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let existing = orders::fetch_order_by_ref(order_ref, &mut tx)
            .await?
            .ok_or_else(|| PaymentGatewayError::OrderNotFound(order_ref.clone()))?;
        if let Some(received) = txn.amount {
            if received != existing.total {
                return Err(PaymentGatewayError::AmountMismatch { expected: existing.total, received });
            }
        }
        let outcome = match orders::mark_paid(existing.id, txn, &mut tx).await? {
            Some(paid) => {
                let items = orders::fetch_order_items(paid.id, &mut tx).await?;
                let allocated = tickets::allocate_for_order(&paid, &items, &mut tx).await?;
                info!("🗃️ Order {} marked Paid; {} tickets allocated", paid.order_ref, allocated.len());
                SettlementOutcome { order: paid, tickets: allocated, newly_paid: true }
            },
            None => {
                // The conditional update matched nothing: re-read, since a concurrent delivery may have settled
                // the order between our fetch and the update.
                let current = orders::fetch_order_by_ref(order_ref, &mut tx)
                    .await?
                    .ok_or_else(|| PaymentGatewayError::OrderNotFound(order_ref.clone()))?;
                match current.status {
                    OrderStatusType::Paid => {
                        debug!("🗃️ Duplicate settlement for {}; returning existing allocations", current.order_ref);
                        let existing_tickets = tickets::fetch_tickets_for_order(current.id, &mut tx).await?;
                        SettlementOutcome { order: current, tickets: existing_tickets, newly_paid: false }
                    },
                    status => return Err(PaymentGatewayError::OrderStateConflict(order_ref.clone(), status)),
                }
            },
        };
        tx.commit().await?;
        Ok(outcome)
    }

    async fn fail_order(
        &self,
        order_ref: &OrderRef,
        txn: &GatewayTransaction,
    ) -> Result<FailureOutcome, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let existing = orders::fetch_order_by_ref(order_ref, &mut tx)
            .await?
            .ok_or_else(|| PaymentGatewayError::OrderNotFound(order_ref.clone()))?;
        let outcome = match orders::mark_failed(existing.id, txn, &mut tx).await? {
            Some(failed) => {
                info!("🗃️ Order {} marked PaymentFailed", failed.order_ref);
                FailureOutcome { order: failed, newly_failed: true }
            },
            None => {
                let current = orders::fetch_order_by_ref(order_ref, &mut tx)
                    .await?
                    .ok_or_else(|| PaymentGatewayError::OrderNotFound(order_ref.clone()))?;
                match current.status {
                    OrderStatusType::PaymentFailed => FailureOutcome { order: current, newly_failed: false },
                    status => return Err(PaymentGatewayError::OrderStateConflict(order_ref.clone(), status)),
                }
            },
        };
        tx.commit().await?;
        Ok(outcome)
    }

    async fn cancel_order(&self, order_ref: &OrderRef) -> Result<Order, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let existing = orders::fetch_order_by_ref(order_ref, &mut tx)
            .await?
            .ok_or_else(|| PaymentGatewayError::OrderNotFound(order_ref.clone()))?;
        let order = orders::mark_cancelled(existing.id, &mut tx)
            .await?
            .ok_or(PaymentGatewayError::OrderStateConflict(order_ref.clone(), existing.status))?;
        tx.commit().await?;
        info!("🗃️ Order {} cancelled", order.order_ref);
        Ok(order)
    }

    async fn reveal_ticket(
        &self,
        ticket_id: i64,
        customer_id: &str,
        credit_validity: Duration,
    ) -> Result<RevealOutcome, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        // A foreign ticket id is reported identically to a missing one.
        let ticket = tickets::fetch_ticket(ticket_id, &mut tx)
            .await?
            .filter(|t| t.customer_id == customer_id)
            .ok_or(PaymentGatewayError::TicketNotFound(ticket_id))?;
        if ticket.revealed {
            let prize = match ticket.prize_id {
                Some(prize_id) => tickets::fetch_prize(prize_id, &mut tx).await?,
                None => None,
            };
            tx.commit().await?;
            return Ok(RevealOutcome { ticket, prize, credit_awarded: None });
        }
        let mut ticket = tickets::mark_revealed(ticket_id, &mut tx).await?;
        let mut prize = None;
        let mut credit_awarded = None;
        if let Some(unclaimed) =
            tickets::find_unclaimed_prize(ticket.competition_id, ticket.ticket_number, &mut tx).await?
        {
            let claimed = tickets::claim_prize(unclaimed.id, customer_id, &mut tx).await?;
            ticket = tickets::link_prize(ticket.id, claimed.id, &mut tx).await?;
            info!(
                "🎉️ Ticket #{} revealed an instant win: {} {} for {customer_id}",
                ticket.ticket_number, claimed.kind, claimed.value
            );
            if claimed.kind == InstantPrizeKind::Credit {
                let new_credit = NewWalletCredit {
                    customer_id: customer_id.to_string(),
                    amount: claimed.value,
                    source: WalletCreditSource::Prize,
                    expires_at: Utc::now() + credit_validity,
                };
                credit_awarded = Some(wallet::insert_credit(&new_credit, &mut tx).await?);
            }
            prize = Some(claimed);
        }
        tx.commit().await?;
        Ok(RevealOutcome { ticket, prize, credit_awarded })
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(query, &mut conn).await?)
    }

    async fn expire_old_orders(&self, unpaid_limit: Duration) -> Result<ExpirySweep, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let expired = orders::expire_pending(unpaid_limit, &mut tx).await?;
        let credits_expired = wallet::expire_credits(Utc::now(), &mut tx).await?;
        tx.commit().await?;
        Ok(ExpirySweep { orders: expired, credits_expired })
    }
}

fn purchasability_reason(competition: &Competition) -> String {
    if competition.status != CompetitionStatus::Active {
        format!("competition is {}", competition.status)
    } else if competition.tickets_remaining() == 0 {
        "competition is sold out".to_string()
    } else {
        format!("only {} tickets remaining", competition.tickets_remaining())
    }
}

impl CompetitionManagement for SqliteDatabase {
    async fn create_competition(&self, competition: NewCompetition) -> Result<Competition, CompetitionApiError> {
        let mut conn = self.pool.acquire().await?;
        match competitions::insert_competition(&competition, &mut conn).await {
            Ok(row) => {
                info!("🗃️ Competition '{}' created with id {}", row.slug, row.id);
                Ok(row)
            },
            Err(e) if is_unique_violation(&e) => Err(CompetitionApiError::SlugTaken(competition.slug)),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_competition_status(
        &self,
        competition_id: i64,
        status: CompetitionStatus,
    ) -> Result<Competition, CompetitionApiError> {
        let mut conn = self.pool.acquire().await?;
        competitions::set_status(competition_id, status, &mut conn)
            .await?
            .ok_or(CompetitionApiError::CompetitionNotFound(competition_id))
    }

    async fn fetch_competition(&self, competition_id: i64) -> Result<Option<Competition>, CompetitionApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(competitions::fetch_competition(competition_id, &mut conn).await?)
    }

    async fn fetch_competition_by_slug(&self, slug: &str) -> Result<Option<Competition>, CompetitionApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(competitions::fetch_competition_by_slug(slug, &mut conn).await?)
    }

    async fn fetch_active_competitions(&self) -> Result<Vec<Competition>, CompetitionApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(competitions::fetch_active_competitions(&mut conn).await?)
    }

    async fn fetch_competitions_by_ids(&self, ids: &[i64]) -> Result<Vec<Competition>, CompetitionApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(competitions::fetch_competitions_by_ids(ids, &mut conn).await?)
    }

    async fn seed_instant_prizes(
        &self,
        competition_id: i64,
        prizes: Vec<NewInstantPrize>,
    ) -> Result<u64, CompetitionApiError> {
        let mut tx = self.pool.begin().await?;
        let competition = competitions::fetch_competition(competition_id, &mut tx)
            .await?
            .ok_or(CompetitionApiError::CompetitionNotFound(competition_id))?;
        for prize in &prizes {
            if prize.ticket_number < 1 || prize.ticket_number > competition.total_tickets {
                return Err(CompetitionApiError::PrizeNumberOutOfRange(prize.ticket_number));
            }
        }
        let seeded = competitions::seed_prizes(competition_id, &prizes, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Seeded {seeded} instant prizes for competition {competition_id}");
        Ok(seeded)
    }
}

impl WalletManagement for SqliteDatabase {
    async fn wallet_summary(&self, customer_id: &str) -> Result<WalletSummary, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        let credits = wallet::credits_for_customer(customer_id, &mut conn).await?;
        let now = Utc::now();
        let balance = credits.iter().filter(|c| c.is_spendable(now)).map(|c| c.remaining).sum();
        Ok(WalletSummary { customer_id: customer_id.to_string(), balance, credits })
    }

    async fn award_credit(&self, credit: NewWalletCredit) -> Result<WalletCredit, WalletApiError> {
        if credit.amount <= Pence::from(0) {
            return Err(WalletApiError::InvalidAmount(credit.amount));
        }
        let mut conn = self.pool.acquire().await?;
        let row = wallet::insert_credit(&credit, &mut conn).await?;
        info!("🗃️ Awarded {} ({}) to {}", row.initial, row.source, row.customer_id);
        Ok(row)
    }

    async fn request_withdrawal(&self, customer_id: &str, amount: Pence) -> Result<Withdrawal, WalletApiError> {
        if amount <= Pence::from(0) {
            return Err(WalletApiError::InvalidAmount(amount));
        }
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let available = wallet::spendable_credits(customer_id, now, &mut tx)
            .await?
            .iter()
            .map(|c| c.remaining)
            .sum::<Pence>();
        if available < amount {
            return Err(WalletApiError::InsufficientBalance { requested: amount, available });
        }
        let applied = wallet::debit_credits(customer_id, amount, now, &mut tx).await?;
        debug_assert_eq!(applied, amount);
        let withdrawal = wallet::insert_withdrawal(customer_id, amount, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Withdrawal #{} of {} requested by {}", withdrawal.id, amount, customer_id);
        Ok(withdrawal)
    }

    async fn attribute_referral(
        &self,
        customer_id: &str,
        code: &str,
        validity: Duration,
    ) -> Result<ReferralAttribution, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        let now = Utc::now();
        let attribution = wallet::upsert_referral(customer_id, code, now + validity, now, &mut conn).await?;
        Ok(attribution)
    }

    async fn fetch_referral(&self, customer_id: &str) -> Result<Option<ReferralAttribution>, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        let attribution = wallet::fetch_referral(customer_id, &mut conn).await?;
        Ok(attribution.filter(|a| a.is_active(Utc::now())))
    }
}

impl MaintenanceOperations for SqliteDatabase {
    async fn execute_draw(&self, competition_id: i64) -> Result<Draw, MaintenanceError> {
        let mut tx = self.pool.begin().await?;
        let competition = competitions::fetch_competition(competition_id, &mut tx)
            .await?
            .ok_or(MaintenanceError::CompetitionNotFound(competition_id))?;
        if draws::fetch_draw(competition_id, &mut tx).await?.is_some() {
            return Err(MaintenanceError::AlreadyDrawn(competition_id));
        }
        if matches!(competition.status, CompetitionStatus::Draft | CompetitionStatus::Drawn) {
            return Err(MaintenanceError::NotDrawable(competition_id, competition.status));
        }
        let count = tickets::count_tickets(competition_id, &mut tx).await?;
        if count == 0 {
            return Err(MaintenanceError::NoTicketsSold(competition_id));
        }
        let offset = rand::thread_rng().gen_range(0..count);
        let winner = tickets::nth_ticket(competition_id, offset, &mut tx)
            .await?
            .ok_or_else(|| MaintenanceError::DatabaseError(format!("ticket at offset {offset} vanished mid-draw")))?;
        let seal = draw_seal(&DrawInputs {
            competition_id,
            tickets_sold: competition.tickets_sold,
            winning_ticket_number: winner.ticket_number,
            winner_customer_id: &winner.customer_id,
        });
        let draw =
            draws::insert_draw(competition_id, winner.ticket_number, &winner.customer_id, &seal, &mut tx).await?;
        competitions::set_status(competition_id, CompetitionStatus::Drawn, &mut tx).await?;
        tx.commit().await?;
        info!(
            "🎲️ Competition {competition_id} drawn: ticket #{} wins for customer {}",
            draw.winning_ticket_number, draw.winner_customer_id
        );
        Ok(draw)
    }

    async fn verify_draw(&self, competition_id: i64) -> Result<DrawVerification, MaintenanceError> {
        let mut conn = self.pool.acquire().await?;
        let competition = competitions::fetch_competition(competition_id, &mut conn)
            .await?
            .ok_or(MaintenanceError::CompetitionNotFound(competition_id))?;
        let draw = draws::fetch_draw(competition_id, &mut conn)
            .await?
            .ok_or(MaintenanceError::DrawNotFound(competition_id))?;
        let expected_seal = draw_seal(&DrawInputs {
            competition_id,
            tickets_sold: competition.tickets_sold,
            winning_ticket_number: draw.winning_ticket_number,
            winner_customer_id: &draw.winner_customer_id,
        });
        let winning_ticket = tickets::fetch_by_number(competition_id, draw.winning_ticket_number, &mut conn).await?;
        let ticket_count = tickets::count_tickets(competition_id, &mut conn).await?;
        let checks = vec![
            DrawCheck::new("seal matches", expected_seal == draw.seal),
            DrawCheck::new("winning ticket exists", winning_ticket.is_some()),
            DrawCheck::new(
                "winner owns the ticket",
                winning_ticket.map(|t| t.customer_id == draw.winner_customer_id).unwrap_or(false),
            ),
            DrawCheck::new("sold counter matches ticket count", competition.tickets_sold == ticket_count),
        ];
        let verification = DrawVerification::from_checks(competition_id, checks);
        if !verification.valid {
            warn!("🎲️ Draw verification FAILED for competition {competition_id}: {verification:?}");
        }
        Ok(verification)
    }

    async fn process_pending_payouts(&self) -> Result<PayoutRunResult, MaintenanceError> {
        let mut tx = self.pool.begin().await?;
        let pending = wallet::fetch_requested_withdrawals(&mut tx).await?;
        let mut result = PayoutRunResult::default();
        for withdrawal in pending {
            match wallet::mark_withdrawal_paid(withdrawal.id, &mut tx).await {
                Ok(paid) => {
                    result.processed += 1;
                    result.total_amount += paid.amount;
                },
                Err(e) => {
                    warn!("🗃️ Could not process withdrawal #{}: {e}", withdrawal.id);
                    result.errors.push(format!("withdrawal #{}: {e}", withdrawal.id));
                },
            }
        }
        tx.commit().await?;
        info!("🗃️ Payout run complete: {} withdrawals totalling {}", result.processed, result.total_amount);
        Ok(result)
    }

    async fn register_file(&self, path: &str) -> Result<StorageFile, MaintenanceError> {
        let mut conn = self.pool.acquire().await?;
        match files::insert_file(path, &mut conn).await {
            Ok(row) => Ok(row),
            Err(e) if is_unique_violation(&e) => Err(MaintenanceError::DuplicateFile(path.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn check_file_usage(&self) -> Result<Vec<StorageFile>, MaintenanceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(files::unused_files(&mut conn).await?)
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error().map(|d| d.is_unique_violation()).unwrap_or(false)
}
