//! `cmt_*` staking methods: transaction submission and stake queries.

use std::sync::Arc;

use alloy::{
    consensus::{SignableTransaction, TxLegacy},
    primitives::{Address, Bytes, TxKind, U256},
};
use borsh::BorshDeserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::{
    accounts::{unlock_duration, AccountManager},
    error::ServiceError,
    keys,
    models::{
        consensus::ResultBroadcastTxCommit,
        jsonrpc::parse_hex_address,
        stake::{
            AcceptSlotArgs, CancelSlotArgs, Candidate, DeclareCandidacyArgs, ProposeSlotArgs, PubKey,
            Slot, SlotDelegate, StakeQueryResult, WithdrawSlotArgs,
        },
    },
    rpc::ConsensusClient,
    services::cmt::to_height,
    tx::{Actor, ChainTx, NonceTx, SignedTx, StakeTx, TxSignature},
};

/// ABCI path for raw store reads
pub const KEY_PATH: &str = "/key";
/// ABCI path resolving a slot by id
pub const SLOT_PATH: &str = "/slot";
/// ABCI path listing a delegator's slot stakes
pub const DELEGATOR_PATH: &str = "/delegator";

pub struct StakeService {
    client: Arc<dyn ConsensusClient>,
    accounts: Arc<AccountManager>,
    signing_chain_id: u64,
    chain_id: RwLock<Option<String>>,
}

fn pub_key(hex: &str) -> Result<PubKey, ServiceError> {
    PubKey::from_hex(hex).map_err(ServiceError::InvalidParams)
}

fn address(hex: &str) -> Result<Address, ServiceError> {
    parse_hex_address(hex).map_err(ServiceError::InvalidParams)
}

impl StakeService {
    pub fn new(client: Arc<dyn ConsensusClient>, accounts: Arc<AccountManager>, signing_chain_id: u64) -> Self {
        Self {
            client,
            accounts,
            signing_chain_id,
            chain_id: RwLock::new(None),
        }
    }

    /// Chain id reported by the consensus node, cached once known
    pub async fn chain_id(&self) -> Result<String, ServiceError> {
        if let Some(id) = self.chain_id.read().await.as_ref() {
            return Ok(id.clone());
        }
        let status = self.client.status().await?;
        let network = status.node_info.network;
        if network.is_empty() {
            return Err(ServiceError::ChainIdUnavailable);
        }
        *self.chain_id.write().await = Some(network.clone());
        Ok(network)
    }

    /// Unlock a keystore account for signing
    ///
    /// # Arguments
    ///
    /// * `addr` - Account address
    /// * `password` - Keystore password
    /// * `duration` - Seconds to stay unlocked, 300 when omitted
    #[instrument(skip(self, password), err)]
    pub async fn unlock_account(&self, addr: &str, password: String, duration: Option<u64>) -> Result<bool, ServiceError> {
        let duration = unlock_duration(duration)?;
        self.accounts.unlock(address(addr)?, password, duration).await?;
        Ok(true)
    }

    #[instrument(skip(self), err)]
    pub async fn declare_candidacy(&self, args: DeclareCandidacyArgs) -> Result<ResultBroadcastTxCommit, ServiceError> {
        let tx = StakeTx::Declare {
            pub_key: pub_key(&args.pub_key)?,
        };
        let signed = self.wrap_and_sign(tx, &args.from, args.sequence).await?;
        self.broadcast_tx(&signed).await
    }

    #[instrument(skip(self), err)]
    pub async fn propose_slot(&self, args: ProposeSlotArgs) -> Result<ResultBroadcastTxCommit, ServiceError> {
        let tx = StakeTx::ProposeSlot {
            pub_key: pub_key(&args.pub_key)?,
            amount: args.amount,
            proposed_roi: args.proposed_roi,
        };
        let signed = self.wrap_and_sign(tx, &args.from, args.sequence).await?;
        self.broadcast_tx(&signed).await
    }

    #[instrument(skip(self), err)]
    pub async fn accept_slot(&self, args: AcceptSlotArgs) -> Result<ResultBroadcastTxCommit, ServiceError> {
        let tx = StakeTx::AcceptSlot {
            amount: args.amount,
            slot_id: args.slot_id,
        };
        let signed = self.wrap_and_sign(tx, &args.from, args.sequence).await?;
        self.broadcast_tx(&signed).await
    }

    #[instrument(skip(self), err)]
    pub async fn withdraw_slot(&self, args: WithdrawSlotArgs) -> Result<ResultBroadcastTxCommit, ServiceError> {
        let tx = StakeTx::WithdrawSlot {
            amount: args.amount,
            slot_id: args.slot_id,
        };
        let signed = self.wrap_and_sign(tx, &args.from, args.sequence).await?;
        self.broadcast_tx(&signed).await
    }

    #[instrument(skip(self), err)]
    pub async fn cancel_slot(&self, args: CancelSlotArgs) -> Result<ResultBroadcastTxCommit, ServiceError> {
        let tx = StakeTx::CancelSlot {
            pub_key: pub_key(&args.pub_key)?,
            slot_id: args.slot_id,
        };
        let signed = self.wrap_and_sign(tx, &args.from, args.sequence).await?;
        self.broadcast_tx(&signed).await
    }

    /// Wrap `tx` with nonce and chain layers, validate it and sign it as `from`
    ///
    /// A `sequence` of 0 means "next": the signer's stored sequence is read
    /// from the nonce store and incremented.
    pub async fn wrap_and_sign(&self, tx: StakeTx, from: &str, sequence: u32) -> Result<SignedTx, ServiceError> {
        if from.trim().is_empty() {
            return Err(ServiceError::Signing("address is required to sign tx".to_string()));
        }
        let signer = address(from)?;
        let signers = vec![Actor::sig_perm(&signer)];

        let sequence = match sequence {
            0 => {
                let next = self.get_sequence(&signers).await? + 1;
                debug!(%signer, sequence = next, "Using next sequence");
                next
            }
            s => s,
        };

        let chain_id = self.chain_id().await?;
        let mut signed = SignedTx::new(ChainTx::new(&chain_id, 0, NonceTx::new(sequence, signers, tx)));

        signed.validate_basic()?;
        self.sign_tx(&mut signed, &signer).await?;
        Ok(signed)
    }

    /// Last sequence committed for `signers`, 0 when none is stored
    pub async fn get_sequence(&self, signers: &[Actor]) -> Result<u32, ServiceError> {
        let key = keys::prefixed_key(keys::NONCE_MODULE, &keys::seq_key(signers)?);
        let result = self.client.abci_query(KEY_PATH.to_string(), key, 0, false).await?;
        let value = result.response.value;
        if value.is_empty() {
            return Ok(0);
        }
        u32::try_from_slice(value.as_slice()).map_err(|e| ServiceError::Decode(format!("sequence: {}", e)))
    }

    /// Sign the EIP-155 hash of an execution-layer legacy transaction
    /// carrying the sign bytes as its data.
    async fn sign_tx(&self, signed: &mut SignedTx, signer: &Address) -> Result<(), ServiceError> {
        let carrier = TxLegacy {
            chain_id: Some(self.signing_chain_id),
            nonce: 0,
            gas_price: 0,
            gas_limit: 0,
            to: TxKind::Call(Address::ZERO),
            value: U256::ZERO,
            input: Bytes::from(signed.sign_bytes()?),
        };
        let hash = carrier.signature_hash();
        let signature = self.accounts.sign_hash(signer, &hash).await?;

        signed.attach(TxSignature {
            signer: (*signer).into(),
            signature: signature.to_vec(),
        });
        Ok(())
    }

    /// Broadcast a signed transaction and wait for it to commit
    pub async fn broadcast_tx(&self, signed: &SignedTx) -> Result<ResultBroadcastTxCommit, ServiceError> {
        let result = self.client.broadcast_tx_commit(signed.to_bytes()?).await?;
        info!(
            hash = %result.hash,
            height = result.height,
            check_code = result.check_tx.code,
            deliver_code = result.deliver_tx.code,
            "Broadcast stake transaction"
        );
        Ok(result)
    }

    /// Public keys of all candidates
    #[instrument(skip(self), err)]
    pub async fn query_validators(&self, height: u64) -> Result<StakeQueryResult<Vec<PubKey>>, ServiceError> {
        let key = keys::prefixed_key(keys::STAKE_MODULE, &keys::candidates_pubkeys_key());
        self.get_parsed(KEY_PATH, key, height).await
    }

    /// One candidate by public key
    #[instrument(skip(self), err)]
    pub async fn query_validator(&self, pubkey: &str, height: u64) -> Result<StakeQueryResult<Candidate>, ServiceError> {
        let pk = pub_key(pubkey)?;
        let key = keys::prefixed_key(keys::STAKE_MODULE, &keys::candidate_key(&pk));
        self.get_parsed(KEY_PATH, key, height).await
    }

    /// Candidates the delegator at `address` has bonded to
    #[instrument(skip(self), err)]
    pub async fn query_slots(&self, address: &str, height: u64) -> Result<StakeQueryResult<Vec<PubKey>>, ServiceError> {
        let chain_id = self.chain_id().await?;
        let delegator = Actor::sig_perm(&self::address(address)?).with_chain(&chain_id);
        let key = keys::prefixed_key(keys::STAKE_MODULE, &keys::delegator_bonds_key(&delegator)?);
        self.get_parsed(KEY_PATH, key, height).await
    }

    #[instrument(skip(self), err)]
    pub async fn query_slot(&self, slot_id: &str, height: u64) -> Result<StakeQueryResult<Slot>, ServiceError> {
        self.get_parsed(SLOT_PATH, slot_id.as_bytes().to_vec(), height).await
    }

    #[instrument(skip(self), err)]
    pub async fn query_delegator(&self, address: &str, height: u64) -> Result<StakeQueryResult<Vec<SlotDelegate>>, ServiceError> {
        self.get_parsed(DELEGATOR_PATH, address.as_bytes().to_vec(), height).await
    }

    /// Run an ABCI query and decode its value
    ///
    /// # Returns
    ///
    /// * The height the node answered at with the decoded value, `NoData`
    ///   when the store has nothing under the key
    pub async fn get_parsed<T: BorshDeserialize>(
        &self,
        path: &str,
        key: Vec<u8>,
        height: u64,
    ) -> Result<StakeQueryResult<T>, ServiceError> {
        let result = self
            .client
            .abci_query(path.to_string(), key, to_height(height)?, false)
            .await?;
        let response = result.response;
        if response.value.is_empty() {
            return Err(ServiceError::NoData);
        }
        let data = T::try_from_slice(response.value.as_slice())
            .map_err(|e| ServiceError::Decode(format!("{} value: {}", path, e)))?;
        Ok(StakeQueryResult {
            height: response.height,
            data,
        })
    }
}
