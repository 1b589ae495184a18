use std::env;

use crate::types::pricing::ShippingPolicy;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub shipping: ShippingPolicy,
    pub sentiment: SentimentConfig,
}

/// Where review comments are sent for labelling. `api_url = None` means
/// reviews are stored with a fixed `UNCLASSIFIED` label.
#[derive(Debug, Clone)]
pub struct SentimentConfig {
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);

        let defaults = ShippingPolicy::default();
        let shipping = ShippingPolicy {
            flat_fee: parse_var("SHIPPING_FEE")?.unwrap_or(defaults.flat_fee),
            free_order_limit: parse_var("FREE_SHIPPING_ORDER_LIMIT")?
                .unwrap_or(defaults.free_order_limit),
        };
        if shipping.flat_fee < 0 {
            anyhow::bail!("SHIPPING_FEE must not be negative");
        }

        let sentiment = SentimentConfig {
            api_url: non_empty_var("SENTIMENT_API_URL"),
            api_token: non_empty_var("SENTIMENT_API_TOKEN"),
            timeout_secs: parse_var("SENTIMENT_TIMEOUT_SECS")?.unwrap_or(10),
        };

        Ok(Self {
            port,
            database_url,
            host,
            shipping,
            sentiment,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// `None` when unset. An unparsable value is an error.
fn parse_var<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid {key}: {e}")),
        None => Ok(None),
    }
}
