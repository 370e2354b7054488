//! Result types returned by the consensus node's JSON-RPC interface.
//!
//! Only the fields this service reads are typed; everything else a result
//! carries is kept in a flattened map so responses can be handed back to RPC
//! callers without losing information.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Serde helpers for int64 values, which the consensus RPC encodes as
/// decimal strings. Plain JSON numbers are accepted as well.
pub mod str_i64 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &i64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Num(i64),
        }
        match Raw::deserialize(d)? {
            Raw::Str(s) if s.is_empty() => Ok(0),
            Raw::Str(s) => s.parse().map_err(de::Error::custom),
            Raw::Num(n) => Ok(n),
        }
    }
}

/// Raw bytes carried as base64 on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Base64Bytes(pub Vec<u8>);

impl Base64Bytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Base64Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Serialize for Base64Bytes {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Base64Bytes {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
        STANDARD
            .decode(raw.as_bytes())
            .map(Base64Bytes)
            .map_err(de::Error::custom)
    }
}

/// Result of the `status` RPC call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultStatus {
    pub node_info: NodeInfo,
    pub sync_info: SyncInfo,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeInfo {
    #[serde(default)]
    pub id: String,
    /// The chain id the node is running
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub moniker: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncInfo {
    #[serde(default)]
    pub latest_block_hash: String,
    #[serde(default, with = "str_i64")]
    pub latest_block_height: i64,
    #[serde(default)]
    pub latest_block_time: String,
    #[serde(default)]
    pub catching_up: bool,
}

/// Result of the `block` RPC call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultBlock {
    #[serde(default)]
    pub block_id: Value,
    pub block: Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    #[serde(default)]
    pub data: BlockData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Block {
    /// Number of transactions included in the block
    pub fn num_txs(&self) -> i64 {
        self.data.txs.as_ref().map_or(0, |txs| txs.len() as i64)
    }

    /// Raw bytes of the transaction at `index`, if present
    pub fn tx(&self, index: usize) -> Option<&[u8]> {
        self.data
            .txs
            .as_ref()
            .and_then(|txs| txs.get(index))
            .map(Base64Bytes::as_slice)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockHeader {
    #[serde(default)]
    pub chain_id: String,
    #[serde(with = "str_i64")]
    pub height: i64,
    #[serde(default)]
    pub time: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockData {
    /// Null when the block is empty
    #[serde(default)]
    pub txs: Option<Vec<Base64Bytes>>,
}

/// Hash under which the consensus node indexes a raw transaction.
pub fn tx_hash(tx: &[u8]) -> Vec<u8> {
    Sha256::digest(tx).to_vec()
}

/// Result of the `tx` RPC call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultTx {
    #[serde(default)]
    pub hash: String,
    #[serde(with = "str_i64")]
    pub height: i64,
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub tx_result: TxResponse,
    #[serde(default)]
    pub tx: Base64Bytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Value>,
}

/// CheckTx / DeliverTx response body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxResponse {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub log: String,
    #[serde(default)]
    pub info: String,
    #[serde(default, with = "str_i64")]
    pub gas_wanted: i64,
    #[serde(default, with = "str_i64")]
    pub gas_used: i64,
    #[serde(default)]
    pub events: Vec<Value>,
    #[serde(default)]
    pub codespace: String,
}

impl TxResponse {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// Result of the `broadcast_tx_commit` RPC call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultBroadcastTxCommit {
    #[serde(default)]
    pub check_tx: TxResponse,
    #[serde(default)]
    pub deliver_tx: TxResponse,
    #[serde(default)]
    pub hash: String,
    #[serde(default, with = "str_i64")]
    pub height: i64,
}

/// Result of the `abci_query` RPC call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultAbciQuery {
    pub response: AbciQueryResponse,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbciQueryResponse {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub log: String,
    #[serde(default)]
    pub info: String,
    #[serde(default, with = "str_i64")]
    pub index: i64,
    #[serde(default)]
    pub key: Base64Bytes,
    #[serde(default)]
    pub value: Base64Bytes,
    #[serde(default, with = "str_i64")]
    pub height: i64,
    #[serde(default)]
    pub codespace: String,
}
