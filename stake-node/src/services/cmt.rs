use std::sync::Arc;

use tracing::{debug, instrument};

use crate::{
    error::ServiceError,
    models::{
        consensus::{tx_hash, ResultBlock, ResultStatus, ResultTx},
        jsonrpc::parse_hex_bytes,
    },
    rpc::ConsensusClient,
};

/// Block and transaction lookups served straight from the consensus node
#[derive(Clone)]
pub struct CmtService {
    client: Arc<dyn ConsensusClient>,
}

/// Convert an RPC height into the node's int64 height. 0 selects the latest block.
pub fn to_height(height: u64) -> Result<i64, ServiceError> {
    i64::try_from(height).map_err(|_| ServiceError::InvalidParams(format!("height {} out of range", height)))
}

impl CmtService {
    pub fn new(client: Arc<dyn ConsensusClient>) -> Self {
        Self { client }
    }

    pub async fn status(&self) -> Result<ResultStatus, ServiceError> {
        self.client.status().await
    }

    /// Block at `height`
    #[instrument(skip(self), err)]
    pub async fn get_block(&self, height: u64) -> Result<ResultBlock, ServiceError> {
        let h = to_height(height)?;
        self.client.block((h > 0).then_some(h)).await
    }

    /// Committed transaction by hex hash, "0x" optional
    #[instrument(skip(self), err)]
    pub async fn get_transaction(&self, hash: &str) -> Result<ResultTx, ServiceError> {
        let key = parse_hex_bytes(hash).map_err(ServiceError::InvalidParams)?;
        self.client.tx(key, false).await
    }

    /// Transaction at `index` inside the block at `height`
    #[instrument(skip(self), err)]
    pub async fn get_transaction_from_block(&self, height: u64, index: i64) -> Result<ResultTx, ServiceError> {
        let block = self.get_block(height).await?;
        let raw = usize::try_from(index)
            .ok()
            .filter(|_| index < block.block.num_txs())
            .and_then(|i| block.block.tx(i))
            .ok_or_else(|| {
                ServiceError::InvalidParams(format!(
                    "No transaction in block {}, index {}. ",
                    height, index
                ))
            })?;

        let hash = hex::encode(tx_hash(raw));
        debug!(%hash, "Resolved transaction from block");
        self.get_transaction(&hash).await
    }
}
