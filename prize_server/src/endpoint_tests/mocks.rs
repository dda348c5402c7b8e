use chrono::{Duration, TimeZone, Utc};
use mockall::mock;
use pcs_common::Pence;
use prize_engine::{
    db_types::{
        Competition,
        CompetitionStatus,
        GatewayTransaction,
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
        Withdrawal,
    },
    order_objects::OrderQueryFilter,
    traits::{
        CheckoutOutcome,
        CompetitionApiError,
        CompetitionManagement,
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

mock! {
    pub GatewayDb {}
    impl Clone for GatewayDb {
        fn clone(&self) -> Self;
    }
    impl PaymentGatewayDatabase for GatewayDb {
        fn url(&self) -> &str;
        async fn create_order(&self, order: NewOrder, credit_requested: Pence) -> Result<CheckoutOutcome, PaymentGatewayError>;
        async fn fetch_order_by_ref(&self, order_ref: &OrderRef) -> Result<Option<Order>, PaymentGatewayError>;
        async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, PaymentGatewayError>;
        async fn fetch_tickets_for_order(&self, order_id: i64) -> Result<Vec<Ticket>, PaymentGatewayError>;
        async fn confirm_order_paid(&self, order_ref: &OrderRef, txn: &GatewayTransaction) -> Result<SettlementOutcome, PaymentGatewayError>;
        async fn fail_order(&self, order_ref: &OrderRef, txn: &GatewayTransaction) -> Result<FailureOutcome, PaymentGatewayError>;
        async fn cancel_order(&self, order_ref: &OrderRef) -> Result<Order, PaymentGatewayError>;
        async fn reveal_ticket(&self, ticket_id: i64, customer_id: &str, credit_validity: Duration) -> Result<RevealOutcome, PaymentGatewayError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, PaymentGatewayError>;
        async fn expire_old_orders(&self, unpaid_limit: Duration) -> Result<ExpirySweep, PaymentGatewayError>;
    }
}

mock! {
    pub CompetitionDb {}
    impl CompetitionManagement for CompetitionDb {
        async fn create_competition(&self, competition: NewCompetition) -> Result<Competition, CompetitionApiError>;
        async fn set_competition_status(&self, competition_id: i64, status: CompetitionStatus) -> Result<Competition, CompetitionApiError>;
        async fn fetch_competition(&self, competition_id: i64) -> Result<Option<Competition>, CompetitionApiError>;
        async fn fetch_competition_by_slug(&self, slug: &str) -> Result<Option<Competition>, CompetitionApiError>;
        async fn fetch_active_competitions(&self) -> Result<Vec<Competition>, CompetitionApiError>;
        async fn fetch_competitions_by_ids(&self, ids: &[i64]) -> Result<Vec<Competition>, CompetitionApiError>;
        async fn seed_instant_prizes(&self, competition_id: i64, prizes: Vec<NewInstantPrize>) -> Result<u64, CompetitionApiError>;
    }
}

mock! {
    pub WalletDb {}
    impl WalletManagement for WalletDb {
        async fn wallet_summary(&self, customer_id: &str) -> Result<WalletSummary, WalletApiError>;
        async fn award_credit(&self, credit: NewWalletCredit) -> Result<WalletCredit, WalletApiError>;
        async fn request_withdrawal(&self, customer_id: &str, amount: Pence) -> Result<Withdrawal, WalletApiError>;
        async fn attribute_referral(&self, customer_id: &str, code: &str, validity: Duration) -> Result<ReferralAttribution, WalletApiError>;
        async fn fetch_referral(&self, customer_id: &str) -> Result<Option<ReferralAttribution>, WalletApiError>;
    }
}

mock! {
    pub MaintenanceDb {}
    impl MaintenanceOperations for MaintenanceDb {
        async fn execute_draw(&self, competition_id: i64) -> Result<prize_engine::db_types::Draw, MaintenanceError>;
        async fn verify_draw(&self, competition_id: i64) -> Result<DrawVerification, MaintenanceError>;
        async fn process_pending_payouts(&self) -> Result<PayoutRunResult, MaintenanceError>;
        async fn register_file(&self, path: &str) -> Result<StorageFile, MaintenanceError>;
        async fn check_file_usage(&self) -> Result<Vec<StorageFile>, MaintenanceError>;
    }
}

//--------------------------------------       Fixtures        --------------------------------------------------------

pub fn test_options() -> crate::config::ServerOptions {
    crate::config::ServerOptions {
        use_x_forwarded_for: false,
        use_forwarded: false,
        customer_id_header: "x-customer-id".to_string(),
        price_tolerance: prize_engine::cart_objects::PriceTolerance::percent(5),
        prize_credit_validity: Duration::days(365),
        referral_validity: Duration::days(30),
    }
}

pub fn sample_order(order_ref: &str, customer_id: &str, status: OrderStatusType, total: i64) -> Order {
    let ts = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    Order {
        id: 1,
        order_ref: OrderRef(order_ref.to_string()),
        customer_id: customer_id.to_string(),
        status,
        subtotal: Pence::from(total),
        credit_applied: Pence::from(0),
        total: Pence::from(total),
        currency: "GBP".to_string(),
        gateway_txn_id: None,
        gateway_payload: None,
        paid_at: None,
        created_at: ts,
        updated_at: ts,
    }
}

pub fn sample_tickets(order: &Order, competition_id: i64, count: i64) -> Vec<Ticket> {
    (1..=count)
        .map(|n| Ticket {
            id: n,
            competition_id,
            order_id: order.id,
            customer_id: order.customer_id.clone(),
            ticket_number: n,
            revealed: false,
            prize_id: None,
            created_at: order.created_at,
        })
        .collect()
}

pub fn sample_competition(id: i64, slug: &str, price: i64, total: i64, sold: i64) -> Competition {
    let ts = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    Competition {
        id,
        slug: slug.to_string(),
        title: format!("Win: {slug}"),
        description: None,
        status: CompetitionStatus::Active,
        ticket_price: Pence::from(price),
        total_tickets: total,
        tickets_sold: sold,
        instant_win: false,
        image_file_id: None,
        draw_at: None,
        created_at: ts,
        updated_at: ts,
    }
}
