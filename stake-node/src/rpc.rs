use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::{
    error::ServiceError,
    models::consensus::{
        ResultAbciQuery, ResultBlock, ResultBroadcastTxCommit, ResultStatus, ResultTx,
    },
};

/// Client for the local consensus node
///
/// Every RPC handler reaches the chain through this trait, so the HTTP
/// implementation can be swapped for a scripted one in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConsensusClient: Send + Sync {
    /// Node status, including the chain id it runs
    async fn status(&self) -> Result<ResultStatus, ServiceError>;

    /// Block at `height`, or the latest block when `None`
    async fn block(&self, height: Option<i64>) -> Result<ResultBlock, ServiceError>;

    /// Committed transaction by hash
    async fn tx(&self, hash: Vec<u8>, prove: bool) -> Result<ResultTx, ServiceError>;

    /// Query the application store. A height of 0 reads the latest state.
    async fn abci_query(
        &self,
        path: String,
        data: Vec<u8>,
        height: i64,
        prove: bool,
    ) -> Result<ResultAbciQuery, ServiceError>;

    /// Submit a transaction and wait until it is committed in a block
    async fn broadcast_tx_commit(&self, tx: Vec<u8>) -> Result<ResultBroadcastTxCommit, ServiceError>;
}

/// Consensus client speaking the node's JSON-RPC over HTTP
///
/// Byte parameters are sent base64 encoded, ABCI query data hex encoded and
/// heights as decimal strings, which is what the node expects.
pub struct HttpConsensusClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcFault>,
}

#[derive(Deserialize)]
struct RpcFault {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl HttpConsensusClient {
    /// Create a client for the node at `rpc_url` without contacting it
    pub fn new(rpc_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: rpc_url.to_string(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a client and verify the node answers
    ///
    /// # Arguments
    ///
    /// * `rpc_url` - URL of the consensus node RPC endpoint
    ///
    /// # Returns
    ///
    /// * `Result<Self, ServiceError>` - New client instance or the connection error
    pub async fn connect(rpc_url: &str) -> Result<Self, ServiceError> {
        let client = Self::new(rpc_url);
        let status = client.status().await?;
        info!(
            network = %status.node_info.network,
            height = status.sync_info.latest_block_height,
            "Connected to consensus node"
        );
        Ok(client)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ServiceError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "Consensus RPC call");

        let response = self
            .http
            .post(&self.url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .send()
            .await
            .map_err(|e| ServiceError::RPCConnectionError(e.to_string()))?;

        let envelope: RpcEnvelope<T> = response
            .json()
            .await
            .map_err(|e| ServiceError::Decode(format!("{} response: {}", method, e)))?;

        if let Some(fault) = envelope.error {
            let message = match fault.data {
                Some(Value::String(data)) if !data.is_empty() => format!("{}: {}", fault.message, data),
                _ => fault.message,
            };
            return Err(ServiceError::ConsensusError { code: fault.code, message });
        }
        envelope
            .result
            .ok_or_else(|| ServiceError::Decode(format!("{} response has no result", method)))
    }
}

#[async_trait]
impl ConsensusClient for HttpConsensusClient {
    async fn status(&self) -> Result<ResultStatus, ServiceError> {
        self.call("status", json!({})).await
    }

    async fn block(&self, height: Option<i64>) -> Result<ResultBlock, ServiceError> {
        let params = match height {
            Some(h) => json!({ "height": h.to_string() }),
            None => json!({}),
        };
        self.call("block", params).await
    }

    async fn tx(&self, hash: Vec<u8>, prove: bool) -> Result<ResultTx, ServiceError> {
        self.call("tx", json!({ "hash": STANDARD.encode(hash), "prove": prove }))
            .await
    }

    async fn abci_query(
        &self,
        path: String,
        data: Vec<u8>,
        height: i64,
        prove: bool,
    ) -> Result<ResultAbciQuery, ServiceError> {
        self.call(
            "abci_query",
            json!({
                "path": path,
                "data": hex::encode(data),
                "height": height.to_string(),
                "prove": prove,
            }),
        )
        .await
    }

    async fn broadcast_tx_commit(&self, tx: Vec<u8>) -> Result<ResultBroadcastTxCommit, ServiceError> {
        self.call("broadcast_tx_commit", json!({ "tx": STANDARD.encode(tx) }))
            .await
    }
}
