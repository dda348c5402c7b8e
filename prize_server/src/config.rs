use std::{env, io::Write};

use chrono::Duration;
use log::*;
use pcs_common::{parse_boolean_flag, Secret};
use prize_engine::cart_objects::PriceTolerance;
use rand::RngCore;
use tempfile::NamedTempFile;

const DEFAULT_PCS_HOST: &str = "127.0.0.1";
const DEFAULT_PCS_PORT: u16 = 8360;
const DEFAULT_CUSTOMER_ID_HEADER: &str = "x-customer-id";
const DEFAULT_UNPAID_ORDER_TIMEOUT: Duration = Duration::hours(48);
const DEFAULT_PRICE_TOLERANCE_PCT: i64 = 5;
const DEFAULT_PRIZE_CREDIT_EXPIRY_DAYS: i64 = 365;
const DEFAULT_REFERRAL_EXPIRY_DAYS: i64 = 30;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// The header carrying the authenticated customer id, injected by the auth layer in front of this server.
    pub customer_id_header: String,
    /// The time before an unpaid order is considered expired and marked as such.
    pub unpaid_order_timeout: Duration,
    /// How far the price on a cart line may drift from the listed price before the line is dropped.
    pub price_tolerance: PriceTolerance,
    /// How long instant-win credit prizes remain spendable.
    pub prize_credit_validity: Duration,
    /// How long a referral attribution sticks.
    pub referral_validity: Duration,
    /// G2Pay gateway configuration
    pub g2pay: G2PayConfig,
    /// The shared key required on every /admin request.
    pub admin_api_key: Secret<String>,
}

#[derive(Clone, Debug, Default)]
pub struct G2PayConfig {
    /// The merchant secret used to verify callback signatures.
    pub merchant_secret: Secret<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PCS_HOST.to_string(),
            port: DEFAULT_PCS_PORT,
            database_url: String::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            customer_id_header: DEFAULT_CUSTOMER_ID_HEADER.to_string(),
            unpaid_order_timeout: DEFAULT_UNPAID_ORDER_TIMEOUT,
            price_tolerance: PriceTolerance::percent(DEFAULT_PRICE_TOLERANCE_PCT),
            prize_credit_validity: Duration::days(DEFAULT_PRIZE_CREDIT_EXPIRY_DAYS),
            referral_validity: Duration::days(DEFAULT_REFERRAL_EXPIRY_DAYS),
            g2pay: G2PayConfig::default(),
            admin_api_key: Secret::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("PCS_HOST").ok().unwrap_or_else(|| DEFAULT_PCS_HOST.into());
        let port = env::var("PCS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for PCS_PORT. {e} Using the default, {DEFAULT_PCS_PORT}, instead."
                    );
                    DEFAULT_PCS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_PCS_PORT);
        let database_url = env::var("PCS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ PCS_DATABASE_URL is not set. Please set it to the URL for the platform database.");
            String::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("PCS_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("PCS_USE_FORWARDED").ok(), false);
        let customer_id_header = env::var("PCS_CUSTOMER_ID_HEADER")
            .map(|s| s.to_lowercase())
            .ok()
            .unwrap_or_else(|| DEFAULT_CUSTOMER_ID_HEADER.to_string());
        let unpaid_order_timeout = duration_from_env(
            "PCS_UNPAID_ORDER_TIMEOUT",
            Duration::hours,
            DEFAULT_UNPAID_ORDER_TIMEOUT,
        );
        let price_tolerance = env::var("PCS_PRICE_DRIFT_TOLERANCE")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for PCS_PRICE_DRIFT_TOLERANCE. {e}"))
                    .ok()
            })
            .map(PriceTolerance::percent)
            .unwrap_or_else(|| PriceTolerance::percent(DEFAULT_PRICE_TOLERANCE_PCT));
        let prize_credit_validity = duration_from_env(
            "PCS_PRIZE_CREDIT_EXPIRY_DAYS",
            Duration::days,
            Duration::days(DEFAULT_PRIZE_CREDIT_EXPIRY_DAYS),
        );
        let referral_validity = duration_from_env(
            "PCS_REFERRAL_EXPIRY_DAYS",
            Duration::days,
            Duration::days(DEFAULT_REFERRAL_EXPIRY_DAYS),
        );
        let g2pay = G2PayConfig::from_env_or_default();
        let admin_api_key = admin_api_key_from_env();
        Self {
            host,
            port,
            database_url,
            use_x_forwarded_for,
            use_forwarded,
            customer_id_header,
            unpaid_order_timeout,
            price_tolerance,
            prize_credit_validity,
            referral_validity,
            g2pay,
            admin_api_key,
        }
    }
}

impl G2PayConfig {
    pub fn from_env_or_default() -> Self {
        let merchant_secret = env::var("PCS_G2PAY_MERCHANT_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ PCS_G2PAY_MERCHANT_SECRET is not set. Gateway callbacks cannot be verified and will all be \
                 rejected until it is configured."
            );
            String::default()
        });
        Self { merchant_secret: Secret::new(merchant_secret) }
    }
}

fn duration_from_env(var: &str, unit: fn(i64) -> Duration, default: Duration) -> Duration {
    env::var(var)
        .map_err(|_| info!("🪛️ {var} is not set. Using the default value."))
        .and_then(|s| {
            s.parse::<i64>().map(unit).map_err(|e| warn!("🪛️ Invalid configuration value for {var}. {e}"))
        })
        .ok()
        .unwrap_or(default)
}

/// Reads the admin API key, or generates a random one for this session. The generated key is dumped to a temporary
/// file so an operator can still reach the admin endpoints, but running like this in production loses admin access
/// on every restart.
fn admin_api_key_from_env() -> Secret<String> {
    if let Ok(key) = env::var("PCS_ADMIN_API_KEY") {
        if !key.trim().is_empty() {
            return Secret::new(key);
        }
    }
    warn!(
        "🚨️🚨️🚨️ The admin API key has not been set. I'm using a random value for this session. DO NOT operate on \
         production like this. Set PCS_ADMIN_API_KEY instead. 🚨️🚨️🚨️"
    );
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let key = hex::encode(bytes);
    let tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
    match tmpfile {
        Some((mut f, p)) => match writeln!(f, "PCS_ADMIN_API_KEY={key}") {
            Ok(()) => warn!(
                "🚨️🚨️🚨️ The admin API key for this session was written to {}. 🚨️🚨️🚨️",
                p.to_str().unwrap_or("???")
            ),
            Err(e) => warn!("🪛️ Could not write the admin API key to the temporary file. {e}"),
        },
        None => {
            warn!("🪛️ Could not create a temporary file to store the admin API key.");
        },
    }
    Secret::new(key)
}

/// A subset of the server configuration that request handlers need. Generally we try to keep this as small as
/// possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub customer_id_header: String,
    pub price_tolerance: PriceTolerance,
    pub prize_credit_validity: Duration,
    pub referral_validity: Duration,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
            customer_id_header: config.customer_id_header.clone(),
            price_tolerance: config.price_tolerance,
            prize_credit_validity: config.prize_credit_validity,
            referral_validity: config.referral_validity,
        }
    }
}
