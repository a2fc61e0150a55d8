use crate::models::ProtocolRate;
use crate::price_feed::MAX_FETCH_ATTEMPTS;
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_ACCESS_NODE: &str = "access.testnet.nodes.onflow.org:9000";
const DEFAULT_PRICE_FEED_URL: &str = "https://api.coingecko.com/api/v3";
const DEFAULT_PROTOCOLS: &str = "ankr:12.5,increment:15.3,figment:10.8";

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub run_migrations: bool,
}

/// Flow ledger configuration
#[derive(Clone)]
pub struct FlowConfig {
    pub access_node: String,
    pub private_key_hex: String,
    pub account_address: String,
    pub contract_address: String,
    pub key_index: u32,
    pub gas_limit: u64,
    pub seal_poll_interval_ms: u64,
    pub seal_timeout_secs: Option<u64>,
}

/// Update cycle configuration
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub symbol: String,
    pub coin_id: String,
    pub price_feed_url: String,
    pub price_fetch_max_attempts: u32,
    pub update_interval_secs: u64,
    pub skip_blockchain: bool,
    pub protocols: Vec<ProtocolRate>,
    pub min_apy: Decimal,
    pub max_apy: Decimal,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub flow: FlowConfig,
    pub oracle: OracleConfig,
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, String> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} has an invalid value: {}", key, raw)),
        _ => Ok(default),
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, String> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| format!("{} environment variable is required", key))
}

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let url = required(lookup, "DATABASE_URL")?;
        let max_connections = parse_or(lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?;
        let min_connections = parse_or(lookup, "DATABASE_MIN_CONNECTIONS", 2u32)?;
        let acquire_timeout_secs = parse_or(lookup, "DATABASE_ACQUIRE_TIMEOUT_SECS", 30u64)?;
        let idle_timeout_secs = parse_or(lookup, "DATABASE_IDLE_TIMEOUT_SECS", 1800u64)?;
        let max_lifetime_secs = parse_or(lookup, "DATABASE_MAX_LIFETIME_SECS", 3600u64)?;
        let run_migrations = parse_or(lookup, "DATABASE_RUN_MIGRATIONS", false)?;

        // Validate configuration
        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if min_connections > max_connections {
            return Err(
                "DATABASE_MIN_CONNECTIONS must not exceed DATABASE_MAX_CONNECTIONS".to_string(),
            );
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            min_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            run_migrations,
        })
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get max lifetime as Duration
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/flow_oracle".to_string(),
            max_connections: 10,
            min_connections: 2,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 1800,
            max_lifetime_secs: 3600,
            run_migrations: false,
        }
    }
}

impl FlowConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let private_key_hex = required(lookup, "FLOW_PRIVATE_KEY")?;
        let account_address = required(lookup, "FLOW_ACCOUNT_ADDRESS")?;

        // The oracle contract is usually deployed to the signing account itself
        let contract_address = lookup("PRICE_ORACLE_CONTRACT")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| account_address.clone());

        let access_node = lookup("FLOW_ACCESS_NODE")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ACCESS_NODE.to_string());

        let key_index = parse_or(lookup, "FLOW_KEY_INDEX", 0u32)?;
        let gas_limit = parse_or(lookup, "FLOW_GAS_LIMIT", 100u64)?;
        let seal_poll_interval_ms = parse_or(lookup, "FLOW_SEAL_POLL_INTERVAL_MS", 1000u64)?;
        let seal_timeout_secs = match lookup("FLOW_SEAL_TIMEOUT_SECS") {
            Some(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| format!("FLOW_SEAL_TIMEOUT_SECS has an invalid value: {}", raw))?,
            ),
            _ => None,
        };

        if seal_poll_interval_ms == 0 {
            return Err("FLOW_SEAL_POLL_INTERVAL_MS must be greater than 0".to_string());
        }

        Ok(Self {
            access_node,
            private_key_hex,
            account_address,
            contract_address,
            key_index,
            gas_limit,
            seal_poll_interval_ms,
            seal_timeout_secs,
        })
    }

    pub fn seal_poll_interval(&self) -> Duration {
        Duration::from_millis(self.seal_poll_interval_ms)
    }

    pub fn seal_timeout(&self) -> Option<Duration> {
        self.seal_timeout_secs.map(Duration::from_secs)
    }
}

// Hand-written so the private key never reaches the logs
impl std::fmt::Debug for FlowConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowConfig")
            .field("access_node", &self.access_node)
            .field("private_key_hex", &"<redacted>")
            .field("account_address", &self.account_address)
            .field("contract_address", &self.contract_address)
            .field("key_index", &self.key_index)
            .field("gas_limit", &self.gas_limit)
            .field("seal_poll_interval_ms", &self.seal_poll_interval_ms)
            .field("seal_timeout_secs", &self.seal_timeout_secs)
            .finish()
    }
}

/// Parse an ordered `name:base_apy` list, e.g. `ankr:12.5,increment:15.3`
pub fn parse_protocols(raw: &str) -> Result<Vec<ProtocolRate>, String> {
    let mut protocols: Vec<ProtocolRate> = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, rate) = entry
            .split_once(':')
            .ok_or_else(|| format!("Invalid protocol entry '{}', expected name:apy", entry))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("Invalid protocol entry '{}': empty name", entry));
        }
        if protocols.iter().any(|p| p.name == name) {
            return Err(format!("Duplicate protocol '{}'", name));
        }
        let base_apy = Decimal::from_str(rate.trim())
            .map_err(|e| format!("Invalid base APY for '{}': {}", name, e))?;
        protocols.push(ProtocolRate::new(name, base_apy));
    }
    if protocols.is_empty() {
        return Err("APY_PROTOCOLS must list at least one protocol".to_string());
    }
    Ok(protocols)
}

impl OracleConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let symbol = lookup("PRICE_SYMBOL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "FLOW".to_string());
        let coin_id = lookup("PRICE_FEED_COIN_ID")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| symbol.to_lowercase());
        let price_feed_url = lookup("PRICE_FEED_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PRICE_FEED_URL.to_string());
        let price_fetch_max_attempts = parse_or(lookup, "PRICE_FETCH_MAX_ATTEMPTS", 3u32)?;
        let update_interval_secs = parse_or(lookup, "UPDATE_INTERVAL_SECS", 300u64)?;
        let skip_blockchain = parse_or(lookup, "SKIP_BLOCKCHAIN", false)?;
        let protocols = parse_protocols(
            &lookup("APY_PROTOCOLS").unwrap_or_else(|| DEFAULT_PROTOCOLS.to_string()),
        )?;
        let min_apy = parse_or(lookup, "APY_MIN", Decimal::new(50, 1))?;
        let max_apy = parse_or(lookup, "APY_MAX", Decimal::new(500, 1))?;

        if price_fetch_max_attempts == 0 || price_fetch_max_attempts > MAX_FETCH_ATTEMPTS {
            return Err(format!(
                "PRICE_FETCH_MAX_ATTEMPTS must be between 1 and {}",
                MAX_FETCH_ATTEMPTS
            ));
        }

        if update_interval_secs == 0 {
            return Err("UPDATE_INTERVAL_SECS must be greater than 0".to_string());
        }

        if min_apy > max_apy {
            return Err(format!("APY_MIN ({}) must not exceed APY_MAX ({})", min_apy, max_apy));
        }

        Ok(Self {
            symbol,
            coin_id,
            price_feed_url,
            price_fetch_max_attempts,
            update_interval_secs,
            skip_blockchain,
            protocols,
            min_apy,
            max_apy,
        })
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            symbol: "FLOW".to_string(),
            coin_id: "flow".to_string(),
            price_feed_url: DEFAULT_PRICE_FEED_URL.to_string(),
            price_fetch_max_attempts: 3,
            update_interval_secs: 300,
            skip_blockchain: false,
            protocols: ProtocolRate::defaults(),
            min_apy: Decimal::new(50, 1),
            max_apy: Decimal::new(500, 1),
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(&env_lookup)
    }

    /// Create application config from an arbitrary key lookup
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let flow = FlowConfig::from_lookup(lookup)?;
        let database = DatabaseConfig::from_lookup(lookup)?;
        let oracle = OracleConfig::from_lookup(lookup)?;

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        let log_format = match lookup("LOG_FORMAT")
            .unwrap_or_else(|| "pretty".to_string())
            .to_lowercase()
            .as_str()
        {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => {
                return Err(format!(
                    "Invalid LOG_FORMAT: {}. Must be one of: [\"pretty\", \"json\"]",
                    other
                ))
            }
        };

        Ok(Self {
            database,
            flow,
            oracle,
            log_level: log_level.to_lowercase(),
            log_format,
        })
    }

    /// Get database URL (convenience method)
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}
