//! RPC services and the method table that routes JSON-RPC calls to them.

pub mod cmt;
pub mod net;
pub mod stake;

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{
    accounts::AccountManager,
    config::Config,
    error::ServiceError,
    models::stake::{AcceptSlotArgs, CancelSlotArgs, DeclareCandidacyArgs, ProposeSlotArgs, WithdrawSlotArgs},
    rpc::ConsensusClient,
};

pub use cmt::CmtService;
pub use net::NetService;
pub use stake::StakeService;

/// Every method served over JSON-RPC, by name
pub const METHODS: &[&str] = &[
    "net_listening",
    "net_peerCount",
    "net_version",
    "cmt_getBlock",
    "cmt_getTransaction",
    "cmt_getTransactionFromBlock",
    "cmt_unlockAccount",
    "cmt_declareCandidacy",
    "cmt_proposeSlot",
    "cmt_acceptSlot",
    "cmt_withdrawSlot",
    "cmt_cancelSlot",
    "cmt_queryValidators",
    "cmt_queryValidator",
    "cmt_querySlots",
    "cmt_querySlot",
    "cmt_queryDelegator",
];

/// All RPC services sharing one consensus client
pub struct RpcServices {
    pub net: NetService,
    pub cmt: CmtService,
    pub stake: StakeService,
}

impl RpcServices {
    pub fn new(client: Arc<dyn ConsensusClient>, accounts: Arc<AccountManager>, config: &Config) -> Self {
        Self {
            net: NetService::new(config.network_version),
            cmt: CmtService::new(client.clone()),
            stake: StakeService::new(client, accounts, config.signing_chain_id),
        }
    }

    /// Route one call to its handler and encode the result
    ///
    /// # Arguments
    ///
    /// * `method` - JSON-RPC method name
    /// * `params` - Positional parameters; `null` is treated as no parameters
    pub async fn dispatch(&self, method: &str, params: Value) -> Result<Value, ServiceError> {
        debug!(method, "Dispatching RPC call");
        match method {
            "net_listening" => {
                positional::<()>(params, 0)?;
                encode(self.net.listening())
            }
            "net_peerCount" => {
                positional::<()>(params, 0)?;
                encode(self.net.peer_count())
            }
            "net_version" => {
                positional::<()>(params, 0)?;
                encode(self.net.version())
            }
            "cmt_getBlock" => {
                let (height,): (u64,) = positional(params, 1)?;
                encode(self.cmt.get_block(height).await?)
            }
            "cmt_getTransaction" => {
                let (hash,): (String,) = positional(params, 1)?;
                encode(self.cmt.get_transaction(&hash).await?)
            }
            "cmt_getTransactionFromBlock" => {
                let (height, index): (u64, i64) = positional(params, 2)?;
                encode(self.cmt.get_transaction_from_block(height, index).await?)
            }
            "cmt_unlockAccount" => {
                let (address, password, duration): (String, String, Option<u64>) = positional(params, 3)?;
                encode(self.stake.unlock_account(&address, password, duration).await?)
            }
            "cmt_declareCandidacy" => {
                let (args,): (DeclareCandidacyArgs,) = positional(params, 1)?;
                encode(self.stake.declare_candidacy(args).await?)
            }
            "cmt_proposeSlot" => {
                let (args,): (ProposeSlotArgs,) = positional(params, 1)?;
                encode(self.stake.propose_slot(args).await?)
            }
            "cmt_acceptSlot" => {
                let (args,): (AcceptSlotArgs,) = positional(params, 1)?;
                encode(self.stake.accept_slot(args).await?)
            }
            "cmt_withdrawSlot" => {
                let (args,): (WithdrawSlotArgs,) = positional(params, 1)?;
                encode(self.stake.withdraw_slot(args).await?)
            }
            "cmt_cancelSlot" => {
                let (args,): (CancelSlotArgs,) = positional(params, 1)?;
                encode(self.stake.cancel_slot(args).await?)
            }
            "cmt_queryValidators" => {
                let (height,): (u64,) = positional(params, 1)?;
                encode(self.stake.query_validators(height).await?)
            }
            "cmt_queryValidator" => {
                let (pubkey, height): (String, u64) = positional(params, 2)?;
                encode(self.stake.query_validator(&pubkey, height).await?)
            }
            "cmt_querySlots" => {
                let (address, height): (String, u64) = positional(params, 2)?;
                encode(self.stake.query_slots(&address, height).await?)
            }
            "cmt_querySlot" => {
                let (slot_id, height): (String, u64) = positional(params, 2)?;
                encode(self.stake.query_slot(&slot_id, height).await?)
            }
            "cmt_queryDelegator" => {
                let (address, height): (String, u64) = positional(params, 2)?;
                encode(self.stake.query_delegator(&address, height).await?)
            }
            other => Err(ServiceError::MethodNotFound(other.to_string())),
        }
    }
}

/// Decode positional parameters into a tuple of `arity` elements
///
/// Missing trailing parameters are filled with `null`, so optional
/// arguments may be left out; required ones then fail to decode.
pub fn positional<T: DeserializeOwned>(params: Value, arity: usize) -> Result<T, ServiceError> {
    let mut args = match params {
        Value::Null => Vec::new(),
        Value::Array(args) => args,
        _ => return Err(ServiceError::InvalidParams("non-array args".to_string())),
    };
    if args.len() > arity {
        return Err(ServiceError::InvalidParams(format!(
            "too many arguments, want at most {}",
            arity
        )));
    }
    if arity == 0 {
        return serde_json::from_value(Value::Null).map_err(|e| ServiceError::InvalidParams(e.to_string()));
    }
    args.resize(arity, Value::Null);
    serde_json::from_value(Value::Array(args)).map_err(|e| ServiceError::InvalidParams(e.to_string()))
}

fn encode<T: Serialize>(value: T) -> Result<Value, ServiceError> {
    serde_json::to_value(value).map_err(|e| ServiceError::Decode(e.to_string()))
}
