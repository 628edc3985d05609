use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub mail: MailConfig,
    pub scan: ScanConfig,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
}

/// Outbound mail settings. Missing credentials are not an error here; the
/// dispatcher reports them when it is asked to send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub sender: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub recipient: Option<String>,
    pub smtp_host: String,
    pub smtp_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub interval_hours: u64,
    pub run_on_startup: bool,
    pub dedup: bool,
    pub catch_up_days: u32,
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub ledger_write_attempts: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "mem://".to_string()),
                namespace: env::var("DATABASE_NS")
                    .unwrap_or_else(|_| "expiry_tracker".to_string()),
                database: env::var("DATABASE_DB").unwrap_or_else(|_| "main".to_string()),
            },
            mail: MailConfig::from_env(),
            scan: ScanConfig::from_env(),
            port: parse_var("PORT", 8080),
        }
    }
}

impl MailConfig {
    pub fn from_env() -> Self {
        Self::from_parts(
            non_empty_var("EMAIL"),
            non_empty_var("EMAIL_PASS"),
            non_empty_var("NOTIFY_EMAIL_TO"),
            non_empty_var("SMTP_HOST"),
            parse_var("SMTP_PORT", 587),
        )
    }

    /// Recipient defaults to the sender, relay to Gmail.
    fn from_parts(
        sender: Option<String>,
        password: Option<String>,
        recipient: Option<String>,
        smtp_host: Option<String>,
        smtp_port: u16,
    ) -> Self {
        Self {
            recipient: recipient.or_else(|| sender.clone()),
            sender,
            password,
            smtp_host: smtp_host.unwrap_or_else(|| "smtp.gmail.com".to_string()),
            smtp_port,
        }
    }
}

impl ScanConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            interval_hours: parse_var("SCAN_INTERVAL_HOURS", defaults.interval_hours),
            run_on_startup: parse_var("SCAN_ON_STARTUP", defaults.run_on_startup),
            dedup: parse_var("SCAN_DEDUP", defaults.dedup),
            catch_up_days: parse_var("SCAN_CATCH_UP_DAYS", defaults.catch_up_days),
            concurrency: parse_var("SCAN_CONCURRENCY", defaults.concurrency).max(1),
            timeout_secs: parse_var("SCAN_TIMEOUT_SECS", defaults.timeout_secs),
            ledger_write_attempts: parse_var("LEDGER_WRITE_ATTEMPTS", defaults.ledger_write_attempts)
                .max(1),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval_hours: 24,
            run_on_startup: false,
            dedup: true,
            catch_up_days: 0,
            concurrency: 8,
            timeout_secs: 0,
            ledger_write_attempts: 3,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// Malformed values fall back to the default instead of failing startup.
fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}
