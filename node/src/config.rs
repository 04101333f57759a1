//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use vigil_types::{Address, Amount, Bytes32, ExecutionState, GameParams, RollupParams};

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for a vigil node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory for the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Milliseconds between crank ticks.
    #[serde(default = "default_crank_interval_ms")]
    pub crank_interval_ms: u64,

    /// Upper bound on assertions confirmed or rejected in one tick.
    #[serde(default = "default_max_resolutions_per_tick")]
    pub max_resolutions_per_tick: usize,

    /// Host block time, only used to make log lines readable.
    #[serde(default = "default_block_time_secs")]
    pub block_time_secs: u64,

    /// Address the node calls the cranks as, `0x`-prefixed hex.
    #[serde(default = "default_validator")]
    pub validator: String,

    /// Record Prometheus metrics. When off the node builds no registry.
    #[serde(default)]
    pub enable_metrics: bool,

    /// Log every chain event as a JSON line.
    #[serde(default)]
    pub log_events: bool,

    #[serde(default)]
    pub rollup: RollupConfig,
}

/// The `[rollup]` table: chain parameters in TOML-friendly form.
///
/// Amounts are integers and hashes and addresses are hex strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollupConfig {
    pub base_stake: u64,
    pub confirm_period_blocks: u64,
    pub extra_challenge_time_blocks: u64,
    pub minimum_assertion_period: u64,
    pub wasm_module_root: String,
    pub owner: String,
    pub loser_stake_escrow: String,
    pub genesis_inbox_count: u64,
    pub game: GameParams,
}

// --- serde default helpers ---

fn default_data_dir() -> PathBuf {
    PathBuf::from("./vigil_data")
}

fn default_map_size() -> usize {
    vigil_store_lmdb::DEFAULT_MAP_SIZE
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_crank_interval_ms() -> u64 {
    1_000
}

fn default_max_resolutions_per_tick() -> usize {
    16
}

fn default_block_time_secs() -> u64 {
    12
}

fn default_validator() -> String {
    Address::ZERO.to_string()
}

// --- impl ---

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn validator_address(&self) -> Result<Address, NodeError> {
        Address::from_hex(&self.validator).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        LogFormat::from_str(&self.log_format)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size: default_map_size(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            crank_interval_ms: default_crank_interval_ms(),
            max_resolutions_per_tick: default_max_resolutions_per_tick(),
            block_time_secs: default_block_time_secs(),
            validator: default_validator(),
            enable_metrics: false,
            log_events: false,
            rollup: RollupConfig::default(),
        }
    }
}

impl RollupConfig {
    /// The table that describes `params`. Fails if the base stake does not
    /// fit a TOML integer.
    pub fn from_params(params: &RollupParams) -> Result<Self, NodeError> {
        let base_stake = u64::try_from(params.base_stake.raw())
            .ok()
            .filter(|v| i64::try_from(*v).is_ok())
            .ok_or_else(|| NodeError::Config(format!("base stake {} too large", params.base_stake)))?;
        Ok(Self {
            base_stake,
            confirm_period_blocks: params.confirm_period_blocks,
            extra_challenge_time_blocks: params.extra_challenge_time_blocks,
            minimum_assertion_period: params.minimum_assertion_period,
            wasm_module_root: params.wasm_module_root.to_string(),
            owner: params.owner.to_string(),
            loser_stake_escrow: params.loser_stake_escrow.to_string(),
            genesis_inbox_count: params.genesis_inbox_count,
            game: params.game,
        })
    }

    /// Parse into chain parameters, starting from the genesis state.
    pub fn to_params(&self) -> Result<RollupParams, NodeError> {
        let config_err = |e: vigil_types::VigilError| NodeError::Config(e.to_string());
        let params = RollupParams {
            base_stake: Amount::new(u128::from(self.base_stake)),
            confirm_period_blocks: self.confirm_period_blocks,
            extra_challenge_time_blocks: self.extra_challenge_time_blocks,
            minimum_assertion_period: self.minimum_assertion_period,
            wasm_module_root: Bytes32::from_hex(&self.wasm_module_root).map_err(config_err)?,
            owner: Address::from_hex(&self.owner).map_err(config_err)?,
            loser_stake_escrow: Address::from_hex(&self.loser_stake_escrow).map_err(config_err)?,
            genesis_state: ExecutionState::genesis(),
            genesis_inbox_count: self.genesis_inbox_count,
            game: self.game,
        };
        params.validate().map_err(config_err)?;
        Ok(params)
    }
}

impl Default for RollupConfig {
    fn default() -> Self {
        let defaults = RollupParams::default();
        Self {
            base_stake: 1_000_000_000_000_000_000,
            confirm_period_blocks: defaults.confirm_period_blocks,
            extra_challenge_time_blocks: defaults.extra_challenge_time_blocks,
            minimum_assertion_period: defaults.minimum_assertion_period,
            wasm_module_root: defaults.wasm_module_root.to_string(),
            owner: defaults.owner.to_string(),
            loser_stake_escrow: defaults.loser_stake_escrow.to_string(),
            genesis_inbox_count: defaults.genesis_inbox_count,
            game: defaults.game,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.crank_interval_ms, config.crank_interval_ms);
        assert_eq!(parsed.rollup, config.rollup);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.crank_interval_ms, 1_000);
        assert_eq!(config.log_format, "human");
        assert_eq!(config.validator_address().unwrap(), Address::ZERO);
        assert_eq!(config.rollup.to_params().unwrap(), RollupParams::default());
    }

    #[test]
    fn partial_rollup_table_overrides() {
        let toml = r#"
            crank_interval_ms = 250
            validator = "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1"

            [rollup]
            base_stake = 10
            confirm_period_blocks = 100

            [rollup.game]
            block_leaf_size = 32
            big_step_leaf_size = 8
            small_step_leaf_size = 4
            num_big_step_levels = 1
            round_timeout_blocks = 10
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.crank_interval_ms, 250);
        assert_eq!(config.validator_address().unwrap(), Address::new([0xa1; 20]));
        let params = config.rollup.to_params().unwrap();
        assert_eq!(params.base_stake, Amount::new(10));
        assert_eq!(params.confirm_period_blocks, 100);
        assert_eq!(params.extra_challenge_time_blocks, 200); // default
        assert_eq!(params.game, RollupParams::dev().game);
    }

    #[test]
    fn dev_params_survive_the_table() {
        let dev = RollupParams::dev();
        let table = RollupConfig::from_params(&dev).unwrap();
        assert_eq!(table.owner, format!("0x{}", "ad".repeat(20)));
        assert_eq!(table.to_params().unwrap(), dev);
    }

    #[test]
    fn bad_values_are_config_errors() {
        let mut config = NodeConfig::default();
        config.validator = "0x1234".into();
        assert!(matches!(config.validator_address(), Err(NodeError::Config(_))));

        config.rollup.confirm_period_blocks = 0;
        assert!(matches!(config.rollup.to_params(), Err(NodeError::Config(_))));

        config.log_format = "xml".into();
        assert!(config.log_format().is_err());
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/vigil.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
