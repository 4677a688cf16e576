//! Configuration loading for the control plane
//!
//! Supports JSON configuration files for:
//! - Server binding and CORS origins
//! - Market simulator tuning
//! - Store defaults (fallback price, default symbol, log history)
//! - Seed strategies, orders, prices and exchange accounts

use crate::application::{OrderDefaults, SimulatorSettings};
use crate::domain::{
    ExchangeConnection, ExchangeConnectionStatus, Order, OrderId, OrderStatus, Side, Strategy,
    StrategyStatus, Timestamp, mask_api_key,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Root configuration for the control plane
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPlaneConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub simulator: SimulatorConfig,

    #[serde(default)]
    pub store: StoreConfig,

    /// Strategies present at startup
    #[serde(default = "default_strategies")]
    pub strategies: Vec<Strategy>,

    /// Orders present at startup
    #[serde(default)]
    pub orders: Vec<SeedOrderConfig>,

    /// Tracked symbols and their starting prices
    #[serde(default = "default_prices")]
    pub prices: BTreeMap<String, Decimal>,

    /// Exchange accounts present at startup
    #[serde(default = "default_exchanges")]
    pub exchanges: Vec<SeedExchangeConfig>,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            simulator: SimulatorConfig::default(),
            store: StoreConfig::default(),
            strategies: default_strategies(),
            orders: Vec::new(),
            prices: default_prices(),
            exchanges: default_exchanges(),
        }
    }
}

impl ControlPlaneConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
                path: path.as_ref().display().to_string(),
                source,
            })?;

        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `HOST` / `PORT` environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulator.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "simulator.interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.simulator.volatility < Decimal::ZERO || self.simulator.volatility >= Decimal::ONE {
            return Err(ConfigError::Invalid(format!(
                "simulator.volatility must be in [0, 1), got {}",
                self.simulator.volatility
            )));
        }
        if self.server.outbound_queue == 0 {
            return Err(ConfigError::Invalid(
                "server.outbound_queue must be greater than zero".to_string(),
            ));
        }
        if self.store.default_size <= Decimal::ZERO {
            return Err(ConfigError::Invalid(
                "store.default_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn simulator_settings(&self) -> SimulatorSettings {
        SimulatorSettings {
            interval: Duration::from_millis(self.simulator.interval_ms),
            volatility: self.simulator.volatility,
            seed: self.simulator.seed,
        }
    }

    pub fn order_defaults(&self) -> OrderDefaults {
        OrderDefaults {
            symbol: self.store.default_symbol.clone(),
            size: self.store.default_size,
            fallback_price: self.store.fallback_price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Capacity of each connection's outbound queue
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_outbound_queue() -> usize {
    1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Start a simulator for each stream session
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Maximum relative move per tick
    #[serde(default = "default_volatility")]
    pub volatility: Decimal,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_true() -> bool {
    true
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_volatility() -> Decimal {
    dec!(0.01)
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_interval_ms(),
            volatility: default_volatility(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Price for orders on symbols without a tracked price
    #[serde(default = "default_fallback_price")]
    pub fallback_price: Decimal,
    #[serde(default = "default_symbol")]
    pub default_symbol: String,
    #[serde(default = "default_size")]
    pub default_size: Decimal,
    /// Number of log records kept for `/api/logs`
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

fn default_fallback_price() -> Decimal {
    dec!(50000)
}

fn default_symbol() -> String {
    "BTC/USDT".to_string()
}

fn default_size() -> Decimal {
    dec!(1.0)
}

fn default_log_capacity() -> usize {
    1000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            fallback_price: default_fallback_price(),
            default_symbol: default_symbol(),
            default_size: default_size(),
            log_capacity: default_log_capacity(),
        }
    }
}

/// Order fixture; timestamps are taken at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedOrderConfig {
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    #[serde(default = "default_seed_status")]
    pub status: OrderStatus,
    #[serde(default)]
    pub strategy: Option<String>,
}

fn default_seed_status() -> OrderStatus {
    OrderStatus::Filled
}

impl SeedOrderConfig {
    pub fn to_order(&self, now: Timestamp) -> Order {
        let mut order = Order::pending(
            OrderId::from(self.order_id.as_str()),
            self.symbol.as_str(),
            self.side,
            self.size,
            self.price,
            self.strategy.clone(),
            now,
        );
        order.status = self.status;
        if self.status == OrderStatus::Filled {
            order.filled = self.size;
            order.remaining = Decimal::ZERO;
        }
        order
    }
}

/// Exchange account fixture; `lastSync` is taken at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedExchangeConfig {
    pub id: u64,
    pub exchange: String,
    /// Stored masked; only the last four characters survive
    pub api_key: String,
    #[serde(default)]
    pub testnet: bool,
    #[serde(default = "default_exchange_status")]
    pub status: ExchangeConnectionStatus,
    #[serde(default)]
    pub strategies: u32,
}

fn default_exchange_status() -> ExchangeConnectionStatus {
    ExchangeConnectionStatus::Connected
}

impl SeedExchangeConfig {
    pub fn to_connection(&self, now: Timestamp) -> ExchangeConnection {
        ExchangeConnection {
            id: self.id,
            exchange: self.exchange.clone(),
            status: self.status,
            api_key: mask_api_key(&self.api_key),
            testnet: self.testnet,
            last_sync: now,
            strategies: self.strategies,
        }
    }
}

fn default_exchanges() -> Vec<SeedExchangeConfig> {
    vec![
        SeedExchangeConfig {
            id: 1,
            exchange: "Binance".to_string(),
            api_key: "kL3x".to_string(),
            testnet: false,
            status: ExchangeConnectionStatus::Connected,
            strategies: 2,
        },
        SeedExchangeConfig {
            id: 2,
            exchange: "Coinbase".to_string(),
            api_key: "pM7n".to_string(),
            testnet: false,
            status: ExchangeConnectionStatus::Connected,
            strategies: 1,
        },
    ]
}

#[allow(clippy::too_many_arguments)]
fn seed_strategy(
    id: u64,
    name: &str,
    kind: &str,
    exchange: &str,
    pair: &str,
    status: StrategyStatus,
    profit: Decimal,
    trades: u64,
    created: (i32, u32, u32),
) -> Strategy {
    Strategy {
        id,
        name: name.to_string(),
        kind: kind.to_string(),
        exchange: exchange.to_string(),
        pair: pair.to_string(),
        status,
        profit,
        trades,
        created: NaiveDate::from_ymd_opt(created.0, created.1, created.2).unwrap_or_default(),
    }
}

fn default_strategies() -> Vec<Strategy> {
    vec![
        seed_strategy(
            1,
            "PMM Strategy",
            "Pure Market Making",
            "Binance",
            "BTC/USDT",
            StrategyStatus::Running,
            dec!(523.00),
            324,
            (2024, 1, 15),
        ),
        seed_strategy(
            2,
            "Arbitrage Bot",
            "Arbitrage",
            "Binance & Coinbase",
            "ETH/BTC",
            StrategyStatus::Running,
            dec!(892.00),
            156,
            (2024, 1, 10),
        ),
        seed_strategy(
            3,
            "Market Maker SOL",
            "Pure Market Making",
            "Binance",
            "SOL/USDT",
            StrategyStatus::Paused,
            dec!(238.00),
            89,
            (2024, 1, 8),
        ),
    ]
}

fn default_prices() -> BTreeMap<String, Decimal> {
    BTreeMap::from([
        ("BTC/USDT".to_string(), dec!(52345.00)),
        ("ETH/USDT".to_string(), dec!(2856.00)),
        ("SOL/USDT".to_string(), dec!(98.50)),
    ])
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
