use chrono::Duration;
use log::*;
use prize_engine::{db_types::Order, events::EventProducers, OrderFlowApi, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every minute, `Pending` orders past the unpaid timeout are swept to `Expired`, and wallet credit past its
/// expiry date is zeroed out.
pub fn start_expiry_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    unpaid_expiry: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(60));
        let api = OrderFlowApi::new(db, producers);
        info!("🕰️ Expiry worker started");
        loop {
            timer.tick().await;
            trace!("🕰️ Running expiry sweep");
            match api.expire_old_orders(unpaid_expiry).await {
                Ok(sweep) => {
                    if sweep.order_count() > 0 {
                        info!("🕰️ {} unpaid orders expired: {}", sweep.order_count(), order_list(&sweep.orders));
                    }
                    if sweep.credits_expired > 0 {
                        info!("🕰️ {} wallet credits expired", sweep.credits_expired);
                    }
                },
                Err(e) => {
                    error!("🕰️ Error running expiry sweep: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] order_ref: {} cust_id: {}", o.id, o.order_ref, o.customer_id))
        .collect::<Vec<String>>()
        .join(", ")
}
