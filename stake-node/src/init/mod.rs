//! The `init` command: one-shot setup of a node home directory.
//!
//! Creates the consensus validator key and genesis document, writes the
//! execution-layer genesis block and seeds the keystore. Every step leaves
//! existing files alone, so running it twice is harmless.

pub mod chaindata;
pub mod genesis;
pub mod keystore;
pub mod validator;

use std::path::PathBuf;

use clap::Args;
use eyre::Result;
use tracing::info;

use crate::config::Config;
use chaindata::{parse_genesis_or_default, setup_genesis_block, ChainDb, GenesisStatus};
use genesis::GenesisDoc;
use validator::PrivValidator;

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    /// Chain ID
    #[arg(long, default_value = "local")]
    pub chain_id: String,

    /// Execution-layer genesis JSON; the built-in genesis is used when omitted
    #[arg(value_name = "GENESIS")]
    pub genesis: Option<PathBuf>,
}

/// Run every init step against `config.home`
pub fn run(config: &Config, args: &InitArgs) -> Result<()> {
    info!(home = %config.home.display(), chain_id = %args.chain_id, "Initializing node");
    init_consensus(config, &args.chain_id)?;
    init_execution(config, args)
}

/// Validator key and consensus genesis
pub fn init_consensus(config: &Config, chain_id: &str) -> Result<()> {
    let priv_val_file = config.priv_validator_file();
    let (validator, created) = PrivValidator::load_or_generate(&priv_val_file)?;
    if created {
        info!(path = %priv_val_file.display(), "Generated private validator");
    } else {
        info!(path = %priv_val_file.display(), "Found private validator");
    }

    let gen_file = config.genesis_file();
    if gen_file.exists() {
        info!(path = %gen_file.display(), "Found genesis file");
    } else {
        GenesisDoc::single_validator(chain_id, validator.pub_key()).save_as(&gen_file)?;
        info!(path = %gen_file.display(), "Generated genesis file");
    }
    Ok(())
}

/// Execution-layer genesis block and keystore seed
pub fn init_execution(config: &Config, args: &InitArgs) -> Result<()> {
    let mut genesis = parse_genesis_or_default(args.genesis.as_deref())?;
    genesis.config.chain_id = config.eth_chain_id;

    let db = ChainDb::open(config.chaindata_dir())?;
    let (status, hash) = setup_genesis_block(&db, &genesis)?;
    match status {
        GenesisStatus::Written => info!(%hash, "successfully wrote genesis block and/or chain rule set"),
        GenesisStatus::Found => info!(%hash, "genesis block already present"),
    }

    keystore::seed_keystore(&config.keystore_dir())?;
    Ok(())
}
