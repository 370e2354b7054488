use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use alloy::{
    primitives::{Address, B256},
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;

use stake_node::{
    accounts::AccountManager,
    config::Config,
    error::ServiceError,
    models::consensus::{
        AbciQueryResponse, ResultAbciQuery, ResultBlock, ResultBroadcastTxCommit, ResultStatus, ResultTx,
    },
    rpc::ConsensusClient,
    services::RpcServices,
};

pub const PASSWORD: &str = "correct horse";

/// Scripted consensus node: canned blocks, transactions and store values,
/// and a log of everything broadcast to it.
#[derive(Default)]
pub struct FakeConsensus {
    pub network: String,
    pub blocks: HashMap<i64, ResultBlock>,
    pub txs: HashMap<Vec<u8>, ResultTx>,
    pub store: HashMap<(String, Vec<u8>), Vec<u8>>,
    pub broadcasts: Mutex<Vec<Vec<u8>>>,
}

impl FakeConsensus {
    pub fn new(network: &str) -> Self {
        Self {
            network: network.to_string(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ConsensusClient for FakeConsensus {
    async fn status(&self) -> Result<ResultStatus, ServiceError> {
        Ok(serde_json::from_value(json!({
            "node_info": {"network": self.network},
            "sync_info": {"latest_block_height": "10", "catching_up": false}
        }))
        .unwrap())
    }

    async fn block(&self, height: Option<i64>) -> Result<ResultBlock, ServiceError> {
        let height = height.unwrap_or(10);
        self.blocks.get(&height).cloned().ok_or(ServiceError::ConsensusError {
            code: -32603,
            message: format!("height {} must be less than or equal to the current blockchain height", height),
        })
    }

    async fn tx(&self, hash: Vec<u8>, _prove: bool) -> Result<ResultTx, ServiceError> {
        self.txs.get(&hash).cloned().ok_or(ServiceError::ConsensusError {
            code: -32603,
            message: format!("tx ({}) not found", hex::encode_upper(&hash)),
        })
    }

    async fn abci_query(
        &self,
        path: String,
        data: Vec<u8>,
        _height: i64,
        _prove: bool,
    ) -> Result<ResultAbciQuery, ServiceError> {
        let value = self.store.get(&(path, data)).cloned().unwrap_or_default();
        Ok(ResultAbciQuery {
            response: AbciQueryResponse {
                value: value.into(),
                height: 10,
                ..Default::default()
            },
        })
    }

    async fn broadcast_tx_commit(&self, tx: Vec<u8>) -> Result<ResultBroadcastTxCommit, ServiceError> {
        self.broadcasts.lock().unwrap().push(tx);
        Ok(serde_json::from_value(json!({
            "check_tx": {"code": 0},
            "deliver_tx": {"code": 0},
            "hash": "ABCDEF",
            "height": "11"
        }))
        .unwrap())
    }
}

/// Keystore holding one account encrypted with [`PASSWORD`]
pub fn keystore_with_account() -> (TempDir, Address) {
    let dir = tempfile::tempdir().unwrap();
    let key = B256::repeat_byte(0x5a);
    let address = PrivateKeySigner::from_bytes(&key).unwrap().address();
    let name = format!("UTC--2018-01-01T00-00-00.000000000Z--{}", hex::encode(address));
    PrivateKeySigner::encrypt_keystore(dir.path(), &mut rand::thread_rng(), key, PASSWORD, Some(name.as_str()))
        .unwrap();
    (dir, address)
}

pub fn services(fake: Arc<FakeConsensus>, keystore: &TempDir) -> Arc<RpcServices> {
    let config = Config::with_home(keystore.path()).unwrap();
    let accounts = Arc::new(AccountManager::new(keystore.path()));
    Arc::new(RpcServices::new(fake, accounts, &config))
}
