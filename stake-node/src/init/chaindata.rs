//! Execution-layer genesis database.
//!
//! Writes the genesis block of the execution chain into the chain database
//! under the key layout the execution engine reads on startup:
//!
//! * `h` + num (8 bytes BE) + `n`      -> canonical block hash
//! * `h` + num (8 bytes BE) + hash     -> RLP encoded header
//! * `LastHeader`                      -> head header hash
//! * `ethereum-config-` + hash         -> chain config JSON
//! * `ethereum-genesis-` + hash        -> genesis allocation JSON

use std::{fs, path::Path};

use alloy::{
    consensus::{constants::EMPTY_OMMER_ROOT_HASH, Header},
    genesis::Genesis,
    primitives::{keccak256, B256, B64, U256},
    rlp::Encodable,
};
use alloy_trie::{
    root::{state_root_unhashed, storage_root_unhashed},
    TrieAccount, EMPTY_ROOT_HASH,
};
use eyre::{Result, WrapErr};
use rocksdb::{Options, WriteBatch, DB};
use thiserror::Error;
use tracing::{debug, info};

/// Base fee of the genesis block when London is active from block 0
pub const INITIAL_BASE_FEE: u64 = 1_000_000_000;

const HEAD_HEADER_KEY: &[u8] = b"LastHeader";
const CONFIG_PREFIX: &[u8] = b"ethereum-config-";
const GENESIS_PREFIX: &[u8] = b"ethereum-genesis-";

/// Genesis used when no genesis file is given. Funds the seeded keystore account.
pub const DEFAULT_GENESIS: &str = r#"{
  "config": {
    "chainId": 15,
    "homesteadBlock": 0,
    "eip150Block": 0,
    "eip155Block": 0,
    "eip158Block": 0,
    "byzantiumBlock": 0
  },
  "nonce": "0xdeadbeefdeadbeef",
  "timestamp": "0x0",
  "extraData": "0x",
  "gasLimit": "0x8000000",
  "difficulty": "0x40",
  "mixHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
  "coinbase": "0x0000000000000000000000000000000000000000",
  "alloc": {
    "0x7eff122b94897ea5b0e2a9abf47b86337fafebdc": {
      "balance": "0x200000000000000000000000000000000000000000000000000000000000000"
    }
  }
}"#;

#[derive(Debug, Error)]
pub enum ChainDataError {
    #[error("database contains incompatible genesis (have {stored}, new {computed})")]
    GenesisMismatch { stored: B256, computed: B256 },

    #[error("corrupt canonical hash entry: {0} bytes")]
    CorruptHash(usize),
}

/// Outcome of [`setup_genesis_block`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenesisStatus {
    /// The genesis block was written
    Written,
    /// The database already held this genesis block
    Found,
}

/// Parse the genesis file at `path`, or the built-in default genesis
pub fn parse_genesis_or_default(path: Option<&Path>) -> Result<Genesis> {
    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .wrap_err_with(|| format!("Failed to read genesis file {}", path.display()))?;
            serde_json::from_str(&raw).wrap_err("invalid genesis file")
        }
        None => serde_json::from_str(DEFAULT_GENESIS).wrap_err("invalid default genesis"),
    }
}

/// State root committing to the genesis allocation
pub fn genesis_state_root(genesis: &Genesis) -> B256 {
    state_root_unhashed(genesis.alloc.iter().map(|(address, account)| {
        let storage_root = match &account.storage {
            Some(storage) if !storage.is_empty() => storage_root_unhashed(
                storage
                    .iter()
                    .map(|(slot, value)| (*slot, U256::from_be_bytes(value.0))),
            ),
            _ => EMPTY_ROOT_HASH,
        };
        let code_hash = match &account.code {
            Some(code) => keccak256(code),
            None => keccak256(b""),
        };
        (
            *address,
            TrieAccount {
                nonce: account.nonce.unwrap_or_default(),
                balance: account.balance,
                storage_root,
                code_hash,
            },
        )
    }))
}

/// Header of block 0
pub fn genesis_header(genesis: &Genesis) -> Result<Header> {
    let base_fee_per_gas = match (genesis.config.london_block, genesis.base_fee_per_gas) {
        (Some(0), Some(fee)) => Some(
            u64::try_from(fee).map_err(|_| eyre::eyre!("genesis base fee {} does not fit in 64 bits", fee))?,
        ),
        (Some(0), None) => Some(INITIAL_BASE_FEE),
        _ => None,
    };

    Ok(Header {
        parent_hash: B256::ZERO,
        ommers_hash: EMPTY_OMMER_ROOT_HASH,
        beneficiary: genesis.coinbase,
        state_root: genesis_state_root(genesis),
        transactions_root: EMPTY_ROOT_HASH,
        receipts_root: EMPTY_ROOT_HASH,
        difficulty: genesis.difficulty,
        number: 0,
        gas_limit: genesis.gas_limit,
        gas_used: 0,
        timestamp: genesis.timestamp,
        extra_data: genesis.extra_data.clone(),
        mix_hash: genesis.mix_hash,
        nonce: B64::new(genesis.nonce.to_be_bytes()),
        base_fee_per_gas,
        ..Default::default()
    })
}

fn number_prefix(number: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(41);
    key.push(b'h');
    key.extend_from_slice(&number.to_be_bytes());
    key
}

pub fn canonical_hash_key(number: u64) -> Vec<u8> {
    let mut key = number_prefix(number);
    key.push(b'n');
    key
}

pub fn header_key(number: u64, hash: &B256) -> Vec<u8> {
    let mut key = number_prefix(number);
    key.extend_from_slice(hash.as_slice());
    key
}

fn prefixed(prefix: &[u8], hash: &B256) -> Vec<u8> {
    [prefix, hash.as_slice()].concat()
}

/// Handle on the execution-layer chain database
pub struct ChainDb {
    db: DB,
}

impl ChainDb {
    /// Open the database at `path`, creating it if missing
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        fs::create_dir_all(path).wrap_err_with(|| format!("Failed to create {}", path.display()))?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path).wrap_err("could not open database")?;
        Ok(Self { db })
    }

    /// Canonical hash of block `number`, if stored
    pub fn canonical_hash(&self, number: u64) -> Result<Option<B256>> {
        match self.db.get(canonical_hash_key(number))? {
            None => Ok(None),
            Some(raw) if raw.len() == 32 => Ok(Some(B256::from_slice(&raw))),
            Some(raw) => Err(ChainDataError::CorruptHash(raw.len()).into()),
        }
    }

    /// RLP encoded header of block `number` with `hash`, if stored
    pub fn header_rlp(&self, number: u64, hash: &B256) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(header_key(number, hash))?)
    }

    /// Chain config stored with the genesis block `hash`
    pub fn chain_config(&self, hash: &B256) -> Result<Option<serde_json::Value>> {
        self.db
            .get(prefixed(CONFIG_PREFIX, hash))?
            .map(|raw| serde_json::from_slice(&raw).wrap_err("corrupt chain config"))
            .transpose()
    }

    fn write_genesis(&self, genesis: &Genesis, header: &Header, hash: &B256) -> Result<()> {
        let mut rlp = Vec::new();
        header.encode(&mut rlp);

        let mut batch = WriteBatch::default();
        batch.put(header_key(0, hash), &rlp);
        batch.put(canonical_hash_key(0), hash.as_slice());
        batch.put(HEAD_HEADER_KEY, hash.as_slice());
        batch.put(prefixed(CONFIG_PREFIX, hash), serde_json::to_vec(&genesis.config)?);
        batch.put(prefixed(GENESIS_PREFIX, hash), serde_json::to_vec(&genesis.alloc)?);
        self.db.write(batch).wrap_err("failed to write genesis block")?;
        Ok(())
    }
}

/// Write the genesis block unless the database already has one
///
/// # Returns
///
/// * The genesis hash and whether it was written or already present
/// * `ChainDataError::GenesisMismatch` if a different genesis is stored
pub fn setup_genesis_block(db: &ChainDb, genesis: &Genesis) -> Result<(GenesisStatus, B256)> {
    let header = genesis_header(genesis)?;
    let hash = header.hash_slow();

    if let Some(stored) = db.canonical_hash(0)? {
        if stored != hash {
            return Err(ChainDataError::GenesisMismatch { stored, computed: hash }.into());
        }
        debug!(%hash, "Genesis block already present");
        return Ok((GenesisStatus::Found, hash));
    }

    db.write_genesis(genesis, &header, &hash)?;
    info!(%hash, state_root = %header.state_root, "Wrote genesis block");
    Ok((GenesisStatus::Written, hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_genesis(chain_id: u64) -> Genesis {
        let mut genesis = parse_genesis_or_default(None).unwrap();
        genesis.config.chain_id = chain_id;
        genesis
    }

    #[test]
    fn default_genesis_funds_keystore_account() {
        let genesis = default_genesis(15);
        assert_eq!(genesis.alloc.len(), 1);
        assert_eq!(genesis.gas_limit, 0x8000000);
        assert_ne!(genesis_state_root(&genesis), EMPTY_ROOT_HASH);
    }

    #[test]
    fn empty_alloc_has_empty_state_root() {
        let mut genesis = default_genesis(15);
        genesis.alloc.clear();
        assert_eq!(genesis_state_root(&genesis), EMPTY_ROOT_HASH);
    }

    #[test]
    fn setup_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db = ChainDb::open(dir.path().join("chaindata")).unwrap();
        let genesis = default_genesis(15);

        let (status, hash) = setup_genesis_block(&db, &genesis).unwrap();
        assert_eq!(status, GenesisStatus::Written);
        let (status, again) = setup_genesis_block(&db, &genesis).unwrap();
        assert_eq!(status, GenesisStatus::Found);
        assert_eq!(hash, again);

        let rlp = db.header_rlp(0, &hash).unwrap().unwrap();
        assert_eq!(keccak256(&rlp), hash);
        let config = db.chain_config(&hash).unwrap().unwrap();
        assert_eq!(config["chainId"], 15);
    }

    #[test]
    fn london_genesis_base_fee() {
        let mut genesis = default_genesis(15);
        genesis.config.london_block = Some(0);
        assert_eq!(genesis_header(&genesis).unwrap().base_fee_per_gas, Some(INITIAL_BASE_FEE));

        genesis.base_fee_per_gas = Some(7);
        assert_eq!(genesis_header(&genesis).unwrap().base_fee_per_gas, Some(7));

        genesis.base_fee_per_gas = Some(u64::MAX as u128 + 1);
        let err = genesis_header(&genesis).unwrap_err();
        assert!(err.to_string().contains("does not fit in 64 bits"));
        let dir = tempfile::tempdir().unwrap();
        let db = ChainDb::open(dir.path()).unwrap();
        assert!(setup_genesis_block(&db, &genesis).is_err());
        assert_eq!(db.canonical_hash(0).unwrap(), None);
    }

    #[test]
    fn different_genesis_is_a_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let db = ChainDb::open(dir.path()).unwrap();
        setup_genesis_block(&db, &default_genesis(15)).unwrap();

        let mut other = default_genesis(15);
        other.gas_limit = 0x1000;
        let err = setup_genesis_block(&db, &other).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChainDataError>(),
            Some(ChainDataError::GenesisMismatch { .. })
        ));
    }
}
