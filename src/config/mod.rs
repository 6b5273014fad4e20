//! Configuration Management Module
//!
//! This module handles loading and managing configuration for the facilitator.
//! Configuration includes both chain endpoints, the gateway pair being facilitated,
//! the signing key location, executor settings and the intake API.

use anyhow::Context;
use ethereum_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use crate::address::GlobalAddress;
use crate::entities::GatewayType;

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all service settings.
///
/// This structure holds configuration for:
/// - Origin chain connection details
/// - Auxiliary chain connection details
/// - The gateway / cogateway pair
/// - Facilitator keys, fees and polling
/// - API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Origin chain (where the value gateway lives)
    pub origin: ChainConfig,
    /// Auxiliary chain (where the cogateway lives)
    pub auxiliary: ChainConfig,
    pub gateway: GatewayConfig,
    pub facilitator: FacilitatorConfig,
    /// API server configuration (host, port, CORS settings)
    pub api: ApiConfig,
}

/// Configuration for a blockchain connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Human-readable name for the chain
    pub name: String,
    /// RPC endpoint URL for blockchain communication
    pub rpc_url: String,
    /// Unique chain identifier
    pub chain_id: u64,
    /// Anchor contract on this chain (records the other chain's state roots)
    pub anchor_addr: String,
    /// Gas price in wei for transactions submitted to this chain
    pub gas_price: u64,
}

/// The gateway pair being facilitated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway contract on the origin chain
    pub origin_gateway_addr: String,
    /// Cogateway contract on the auxiliary chain
    pub auxiliary_cogateway_addr: String,
    /// Gateway kind (ERC20, MOST, CONSENSUS, NFT)
    #[serde(default = "default_gateway_type")]
    pub gateway_type: String,
    /// Storage slot index of the gateways' outbox mapping
    #[serde(default = "default_outbox_offset")]
    pub outbox_offset: u64,
}

fn default_gateway_type() -> String {
    "ERC20".to_string()
}

fn default_outbox_offset() -> u64 {
    7
}

/// Facilitator configuration: signing key, executor polling and token allow-list.
///
/// The key is loaded from an environment variable at runtime. The config file contains
/// the environment variable name, not the key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilitatorConfig {
    /// Environment variable name containing the hex secp256k1 private key
    /// Default: "FACILITATOR_PRIVATE_KEY"
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
    /// Executor polling interval in milliseconds
    pub polling_interval_ms: u64,
    /// Timeout for chain RPC requests in milliseconds
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,
    /// Tokens to facilitate. Omit to facilitate every token.
    #[serde(default)]
    pub facilitate_tokens: Option<Vec<String>>,
}

fn default_private_key_env() -> String {
    "FACILITATOR_PRIVATE_KEY".to_string()
}

fn default_rpc_timeout_ms() -> u64 {
    30000
}

impl FacilitatorConfig {
    /// Loads the private key from the environment variable.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The private key (hex encoded)
    /// * `Err(anyhow::Error)` - Failed to load from environment
    pub fn get_private_key(&self) -> anyhow::Result<String> {
        std::env::var(&self.private_key_env).map_err(|_| {
            anyhow::anyhow!(
                "Environment variable '{}' not set. Please set it with the facilitator's secp256k1 private key (hex encoded).",
                self.private_key_env
            )
        })
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

/// API server configuration for the indexer intake endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host address to bind the API server to
    pub host: String,
    /// Port number to bind the API server to
    pub port: u16,
    /// Allowed CORS origins for cross-origin requests
    pub cors_origins: Vec<String>,
}

// ============================================================================
// FACILITATION ALLOW-LIST
// ============================================================================

/// Tokens whose transfers the facilitator acts on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FacilitationAllowList {
    #[default]
    All,
    Only(HashSet<GlobalAddress>),
}

impl FacilitationAllowList {
    pub fn permits(&self, token: &GlobalAddress) -> bool {
        match self {
            FacilitationAllowList::All => true,
            FacilitationAllowList::Only(tokens) => tokens.contains(token),
        }
    }
}

// ============================================================================
// CONFIGURATION LOADING AND MANAGEMENT
// ============================================================================

impl Config {
    /// Validates the configuration.
    ///
    /// This function ensures that:
    /// - Origin and auxiliary chains have different chain IDs
    /// - Every configured address parses
    /// - Gateway and cogateway are distinct
    /// - The gateway type is known and the polling interval is non-zero
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Configuration is valid
    /// - `Err(anyhow::Error)` - Validation failed
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.origin.chain_id == self.auxiliary.chain_id {
            return Err(anyhow::anyhow!(
                "Configuration error: Origin chain and auxiliary chain have the same chain ID {}. Each chain must have a unique chain ID.",
                self.origin.chain_id
            ));
        }

        let gateway = self.origin_gateway()?;
        let cogateway = self.auxiliary_cogateway()?;
        if gateway == cogateway {
            return Err(anyhow::anyhow!(
                "Configuration error: Gateway and cogateway have the same address {}",
                gateway
            ));
        }
        self.origin_anchor()?;
        self.auxiliary_anchor()?;
        self.gateway_type()?;
        self.allow_list()?;

        for chain in [&self.origin, &self.auxiliary] {
            url::Url::parse(&chain.rpc_url).with_context(|| {
                format!("Configuration error: Invalid rpc_url '{}' for chain {}", chain.rpc_url, chain.name)
            })?;
        }

        if self.facilitator.polling_interval_ms == 0 {
            return Err(anyhow::anyhow!("Configuration error: polling_interval_ms must be greater than zero"));
        }

        Ok(())
    }

    /// Loads configuration from the TOML file.
    ///
    /// This function:
    /// 1. Checks if config/facilitator.toml (or $FACILITATOR_CONFIG_PATH) exists
    /// 2. If it exists, loads it with `FACILITATOR__<SECTION>__<KEY>` environment overrides
    /// 3. Validates the configuration
    /// 4. If it doesn't exist, returns an error asking user to copy template
    ///
    /// # Returns
    ///
    /// - `Ok(Config)` - Successfully loaded and validated configuration
    /// - `Err(anyhow::Error)` - Failed to load configuration, file doesn't exist, or validation failed
    pub fn load() -> anyhow::Result<Self> {
        // Check for custom config path via environment variable (for tests)
        let config_path = std::env::var("FACILITATOR_CONFIG_PATH")
            .unwrap_or_else(|_| "config/facilitator.toml".to_string());
        Self::load_from_path(&config_path)
    }

    /// Loads and validates configuration from an explicit path.
    pub fn load_from_path(config_path: &str) -> anyhow::Result<Self> {
        if !std::path::Path::new(config_path).exists() {
            // Configuration file doesn't exist - user needs to copy template
            return Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/facilitator.template.toml config/facilitator.toml\n\
                Then edit config/facilitator.toml with your actual values.",
                config_path
            ));
        }

        let settings = ::config::Config::builder()
            .add_source(::config::File::new(config_path, ::config::FileFormat::Toml))
            .add_source(::config::Environment::with_prefix("FACILITATOR").separator("__"))
            .build()
            .with_context(|| format!("Failed to read configuration file '{}'", config_path))?;

        let config: Config = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse configuration file '{}'", config_path))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn origin_gateway(&self) -> anyhow::Result<GlobalAddress> {
        parse_address("gateway.origin_gateway_addr", &self.gateway.origin_gateway_addr)
    }

    pub fn auxiliary_cogateway(&self) -> anyhow::Result<GlobalAddress> {
        parse_address("gateway.auxiliary_cogateway_addr", &self.gateway.auxiliary_cogateway_addr)
    }

    pub fn origin_anchor(&self) -> anyhow::Result<GlobalAddress> {
        parse_address("origin.anchor_addr", &self.origin.anchor_addr)
    }

    pub fn auxiliary_anchor(&self) -> anyhow::Result<GlobalAddress> {
        parse_address("auxiliary.anchor_addr", &self.auxiliary.anchor_addr)
    }

    pub fn gateway_type(&self) -> anyhow::Result<GatewayType> {
        GatewayType::from_str(&self.gateway.gateway_type)
            .context("Configuration error: Invalid gateway.gateway_type")
    }

    /// Builds the facilitation allow-list from `facilitate_tokens`.
    pub fn allow_list(&self) -> anyhow::Result<FacilitationAllowList> {
        match &self.facilitator.facilitate_tokens {
            None => Ok(FacilitationAllowList::All),
            Some(tokens) => {
                let parsed = tokens
                    .iter()
                    .map(|t| parse_address("facilitator.facilitate_tokens", t))
                    .collect::<anyhow::Result<HashSet<_>>>()?;
                Ok(FacilitationAllowList::Only(parsed))
            }
        }
    }
}

impl ChainConfig {
    pub fn gas_price(&self) -> U256 {
        U256::from(self.gas_price)
    }
}

fn parse_address(field: &str, value: &str) -> anyhow::Result<GlobalAddress> {
    GlobalAddress::from_str(value)
        .with_context(|| format!("Configuration error: Invalid address in {}", field))
}

impl Default for Config {
    /// Creates a default configuration with placeholder values.
    ///
    /// This configuration is suitable for local development against two dev nodes.
    /// For production use, all placeholder values must be replaced with actual chain
    /// URLs and contract addresses.
    fn default() -> Self {
        Self {
            origin: ChainConfig {
                name: "Origin Chain".to_string(),
                rpc_url: "http://127.0.0.1:8545".to_string(),
                chain_id: 1337,
                anchor_addr: "0x00000000000000000000000000000000000000a1".to_string(),
                gas_price: 1_000_000_000,
            },
            auxiliary: ChainConfig {
                name: "Auxiliary Chain".to_string(),
                rpc_url: "http://127.0.0.1:8546".to_string(),
                chain_id: 1338,
                anchor_addr: "0x00000000000000000000000000000000000000a2".to_string(),
                gas_price: 1_000_000_000,
            },
            gateway: GatewayConfig {
                origin_gateway_addr: "0x00000000000000000000000000000000000000b1".to_string(),
                auxiliary_cogateway_addr: "0x00000000000000000000000000000000000000b2".to_string(),
                gateway_type: default_gateway_type(),
                outbox_offset: default_outbox_offset(),
            },
            facilitator: FacilitatorConfig {
                private_key_env: default_private_key_env(),
                polling_interval_ms: 2000,
                rpc_timeout_ms: default_rpc_timeout_ms(),
                facilitate_tokens: None,
            },
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 3340,
                cors_origins: vec!["http://localhost:3340".to_string()],
            },
        }
    }
}
