use std::collections::HashMap;
use std::path::Path;

use decimal::FixedDecimal;
use serde::Deserialize;

/// What happens to a liquidated position's leftover collateral. Left as a
/// config flag rather than a branch in `liquidation-engine` — every setting
/// here still forfeits the remainder to the protocol; this only labels
/// intent for the operator reading the config.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LiquidationCollateralDisposition {
    ProtocolFees,
    InsuranceFund,
}

impl Default for LiquidationCollateralDisposition {
    fn default() -> Self {
        LiquidationCollateralDisposition::ProtocolFees
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketSeed {
    pub symbol: String,
    pub token_address: String,
    pub max_leverage: FixedDecimal,
    pub maintenance_margin: FixedDecimal,
    pub initial_price: FixedDecimal,
}

fn default_admin_pin() -> String {
    "change-me".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Shared-secret PIN gating admin-only market operations at the
    /// transport boundary (out of this crate's scope, kept here since it
    /// is the one piece of transport config the core needs to know about).
    #[serde(default = "default_admin_pin")]
    pub admin_pin: String,

    #[serde(default)]
    pub liquidation_collateral_disposition: LiquidationCollateralDisposition,

    /// Markets to seed on startup if the store is empty, keyed by symbol.
    #[serde(default)]
    pub markets: Vec<MarketSeed>,

    /// Static collateral-asset USD prices used by the bundled test feed.
    /// A production deployment swaps `price_oracle::OracleFeed` for a real
    /// venue adapter and ignores this table.
    #[serde(default)]
    pub static_prices: HashMap<String, FixedDecimal>,
}

impl EngineConfig {
    /// Loads a YAML file named by `ENGINE_CONFIG_PATH` (default
    /// `config.yaml`), falling back to built-in defaults entirely if the
    /// file is absent, then lets any `ENGINE_ADMIN_PIN` environment
    /// variable override the PIN so the secret itself never has to live
    /// in the checked-in file.
    pub fn read() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let path = std::env::var("ENGINE_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
        let mut config = if Path::new(&path).exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_yaml::from_str(&raw)?
        } else {
            log::warn!("no config file at {path}, using defaults");
            EngineConfig {
                admin_pin: default_admin_pin(),
                liquidation_collateral_disposition: LiquidationCollateralDisposition::default(),
                markets: Vec::new(),
                static_prices: HashMap::new(),
            }
        };

        if let Ok(pin) = std::env::var("ENGINE_ADMIN_PIN") {
            config.admin_pin = pin;
        }
        Ok(config)
    }
}
