use eyre::Result;
use serde::Deserialize;
use std::{env, path::PathBuf};

/// Environment variable prefix for every setting
pub const ENV_PREFIX: &str = "STAKE_NODE";

/// Node configuration structure
///
/// This structure contains all the configuration parameters for the node:
/// where its files live, where the RPC server binds, and how it reaches the
/// consensus node.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Node home directory holding consensus config, chain data and keystore
    #[serde(default = "default_home")]
    pub home: PathBuf,

    /// Host address to bind the RPC server to (default: 127.0.0.1)
    pub host: String,

    /// Port to listen on (default: 8545)
    pub port: u16,

    /// Consensus node RPC endpoint URL
    pub consensus_rpc_url: String,

    /// Chain id written into the execution-layer genesis
    pub eth_chain_id: u64,

    /// Version reported by `net_version`
    pub network_version: u64,

    /// Chain id used when signing stake transactions
    pub signing_chain_id: u64,
}

fn default_home() -> PathBuf {
    env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".stake-node")
}

impl Config {
    /// Load configuration
    ///
    /// Sources, later ones overriding earlier ones:
    ///
    /// * built-in defaults
    /// * `<home>/config/node.toml`, if present
    /// * `STAKE_NODE_*` environment variables (a `.env` file is loaded first)
    ///
    /// # Arguments
    ///
    /// * `home` - Home directory override, e.g. from the command line
    ///
    /// # Environment Variables
    ///
    /// * `STAKE_NODE_HOME` - Node home (default: "$HOME/.stake-node")
    /// * `STAKE_NODE_HOST` - Server host address (default: "127.0.0.1")
    /// * `STAKE_NODE_PORT` - Server port (default: 8545)
    /// * `STAKE_NODE_CONSENSUS_RPC_URL` - Consensus RPC URL (default: "http://127.0.0.1:26657")
    /// * `STAKE_NODE_ETH_CHAIN_ID` - Execution chain id (default: 15)
    /// * `STAKE_NODE_NETWORK_VERSION` - Network version (default: 15)
    /// * `STAKE_NODE_SIGNING_CHAIN_ID` - Signing chain id (default: 15)
    pub fn load(home: Option<PathBuf>) -> Result<Self> {
        // Load .env file if it exists (useful for development)
        let _ = dotenv::dotenv();

        let home = home
            .or_else(|| env::var(format!("{}_HOME", ENV_PREFIX)).ok().map(PathBuf::from))
            .unwrap_or_else(default_home);

        let settings = defaults(config::Config::builder())?
            .add_source(config::File::from(home.join("config").join("node.toml")).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        let mut config: Config = settings.try_deserialize()?;
        config.home = home;
        Ok(config)
    }

    /// Built-in defaults rooted at `home`, ignoring files and environment
    pub fn with_home(home: impl Into<PathBuf>) -> Result<Self> {
        let mut config: Config = defaults(config::Config::builder())?.build()?.try_deserialize()?;
        config.home = home.into();
        Ok(config)
    }

    /// Consensus directory holding the validator key and genesis document
    pub fn consensus_config_dir(&self) -> PathBuf {
        self.home.join("config")
    }

    pub fn priv_validator_file(&self) -> PathBuf {
        self.consensus_config_dir().join("priv_validator.json")
    }

    pub fn genesis_file(&self) -> PathBuf {
        self.consensus_config_dir().join("genesis.json")
    }

    /// Execution-layer chain database
    pub fn chaindata_dir(&self) -> PathBuf {
        self.home.join("vm").join("chaindata")
    }

    pub fn keystore_dir(&self) -> PathBuf {
        self.home.join("keystore")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(builder
        .set_default("host", "127.0.0.1")?
        .set_default("port", 8545_i64)?
        .set_default("consensus_rpc_url", "http://127.0.0.1:26657")?
        .set_default("eth_chain_id", 15_i64)?
        .set_default("network_version", 15_i64)?
        .set_default("signing_chain_id", 15_i64)?)
}
