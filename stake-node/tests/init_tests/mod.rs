//! End-to-end tests for the `init` command

use std::fs;

use stake_node::{
    config::Config,
    init::{
        self,
        chaindata::{parse_genesis_or_default, setup_genesis_block, ChainDb, GenesisStatus},
        genesis::{GenesisDoc, DEFAULT_VALIDATOR_POWER},
        keystore::KEYSTORE_FILES,
        validator::PrivValidator,
        InitArgs,
    },
};

fn args(chain_id: &str) -> InitArgs {
    InitArgs {
        chain_id: chain_id.to_string(),
        genesis: None,
    }
}

#[test]
fn test_init_creates_node_home() {
    let home = tempfile::tempdir().unwrap();
    let config = Config::with_home(home.path()).unwrap();

    init::run(&config, &args("test-chain")).unwrap();

    let validator = PrivValidator::load(config.priv_validator_file()).unwrap();
    let genesis = GenesisDoc::load(config.genesis_file()).unwrap();
    assert_eq!(genesis.chain_id, "test-chain");
    assert_eq!(genesis.validators.len(), 1);
    assert_eq!(genesis.validators[0].pub_key, validator.pub_key());
    assert_eq!(genesis.validators[0].power, DEFAULT_VALIDATOR_POWER);

    for (name, _) in KEYSTORE_FILES {
        assert!(config.keystore_dir().join(name).is_file(), "{} not seeded", name);
    }

    let db = ChainDb::open(config.chaindata_dir()).unwrap();
    let hash = db.canonical_hash(0).unwrap().expect("genesis block written");
    let chain_config = db.chain_config(&hash).unwrap().unwrap();
    assert_eq!(chain_config["chainId"], config.eth_chain_id);
}

#[test]
fn test_init_is_idempotent() {
    let home = tempfile::tempdir().unwrap();
    let config = Config::with_home(home.path()).unwrap();

    init::run(&config, &args("first")).unwrap();
    let validator = PrivValidator::load(config.priv_validator_file()).unwrap();
    let genesis_json = fs::read_to_string(config.genesis_file()).unwrap();
    let hash = ChainDb::open(config.chaindata_dir()).unwrap().canonical_hash(0).unwrap();

    init::run(&config, &args("second")).unwrap();
    let again = PrivValidator::load(config.priv_validator_file()).unwrap();
    assert_eq!(again.pub_key(), validator.pub_key());
    assert_eq!(fs::read_to_string(config.genesis_file()).unwrap(), genesis_json);

    let db = ChainDb::open(config.chaindata_dir()).unwrap();
    assert_eq!(db.canonical_hash(0).unwrap(), hash);
}

#[test]
fn test_init_with_genesis_file() {
    let home = tempfile::tempdir().unwrap();
    let config = Config::with_home(home.path()).unwrap();

    let genesis_path = home.path().join("eth-genesis.json");
    let mut custom = parse_genesis_or_default(None).unwrap();
    custom.gas_limit = 0x4000000;
    fs::write(&genesis_path, serde_json::to_string(&custom).unwrap()).unwrap();

    let args = InitArgs {
        chain_id: "local".to_string(),
        genesis: Some(genesis_path.clone()),
    };
    init::run(&config, &args).unwrap();

    let mut expected = parse_genesis_or_default(Some(&genesis_path)).unwrap();
    expected.config.chain_id = config.eth_chain_id;
    let db = ChainDb::open(config.chaindata_dir()).unwrap();
    let (status, _) = setup_genesis_block(&db, &expected).unwrap();
    assert_eq!(status, GenesisStatus::Found);
}

#[test]
fn test_init_rejects_missing_genesis_file() {
    let home = tempfile::tempdir().unwrap();
    let config = Config::with_home(home.path()).unwrap();
    let args = InitArgs {
        chain_id: "local".to_string(),
        genesis: Some(home.path().join("missing.json")),
    };
    assert!(init::run(&config, &args).is_err());
}
