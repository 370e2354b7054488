//! Application transaction envelope.
//!
//! A stake transaction travels wrapped in layers, innermost first:
//! the [`StakeTx`] payload, a [`NonceTx`] binding it to its signers'
//! sequence, a [`ChainTx`] binding it to one chain, and finally a
//! [`SignedTx`] carrying the signature over the borsh encoding of the
//! [`ChainTx`]. The signed envelope is what gets broadcast.

use alloy::primitives::Address;
use borsh::{BorshDeserialize, BorshSerialize};

use crate::{error::ServiceError, models::stake::PubKey};

/// App name of signature-permission actors
pub const SIGS_APP: &str = "sigs";

/// An account known to the application: which app controls it, on which chain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct Actor {
    pub chain_id: String,
    pub app: String,
    pub address: Vec<u8>,
}

impl Actor {
    /// Actor authorised by a signature from `address`
    pub fn sig_perm(address: &Address) -> Self {
        Self {
            chain_id: String::new(),
            app: SIGS_APP.to_string(),
            address: address.to_vec(),
        }
    }

    /// Same actor pinned to `chain_id`
    pub fn with_chain(self, chain_id: &str) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum StakeTx {
    Declare {
        pub_key: PubKey,
    },
    ProposeSlot {
        pub_key: PubKey,
        amount: i64,
        proposed_roi: i64,
    },
    AcceptSlot {
        amount: i64,
        slot_id: String,
    },
    WithdrawSlot {
        amount: i64,
        slot_id: String,
    },
    CancelSlot {
        pub_key: PubKey,
        slot_id: String,
    },
}

impl StakeTx {
    pub fn validate_basic(&self) -> Result<(), ServiceError> {
        match self {
            StakeTx::Declare { .. } => Ok(()),
            StakeTx::ProposeSlot { amount, proposed_roi, .. } => {
                positive("amount", *amount)?;
                positive("proposed roi", *proposed_roi)
            }
            StakeTx::AcceptSlot { amount, slot_id } | StakeTx::WithdrawSlot { amount, slot_id } => {
                positive("amount", *amount)?;
                slot(slot_id)
            }
            StakeTx::CancelSlot { slot_id, .. } => slot(slot_id),
        }
    }
}

fn positive(what: &str, value: i64) -> Result<(), ServiceError> {
    if value <= 0 {
        return Err(ServiceError::Validation(format!("{} must be positive, got {}", what, value)));
    }
    Ok(())
}

fn slot(slot_id: &str) -> Result<(), ServiceError> {
    if slot_id.trim().is_empty() {
        return Err(ServiceError::Validation("slot id is required".to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct NonceTx {
    pub sequence: u32,
    pub signers: Vec<Actor>,
    pub tx: StakeTx,
}

impl NonceTx {
    pub fn new(sequence: u32, signers: Vec<Actor>, tx: StakeTx) -> Self {
        Self { sequence, signers, tx }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ChainTx {
    pub chain_id: String,
    /// Block height after which the tx is rejected, 0 for never
    pub expires_at: u64,
    pub tx: NonceTx,
}

impl ChainTx {
    pub fn new(chain_id: &str, expires_at: u64, tx: NonceTx) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            expires_at,
            tx,
        }
    }
}

/// Recoverable secp256k1 signature over the sign bytes, plus the claimed signer.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TxSignature {
    pub signer: [u8; 20],
    /// r || s || v, 65 bytes
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SignedTx {
    pub tx: ChainTx,
    pub signature: Option<TxSignature>,
}

impl SignedTx {
    pub fn new(tx: ChainTx) -> Self {
        Self { tx, signature: None }
    }

    /// Bytes the signer commits to
    pub fn sign_bytes(&self) -> Result<Vec<u8>, ServiceError> {
        borsh::to_vec(&self.tx).map_err(|e| ServiceError::Decode(e.to_string()))
    }

    pub fn attach(&mut self, signature: TxSignature) {
        self.signature = Some(signature);
    }

    /// Stateless checks run before signing
    pub fn validate_basic(&self) -> Result<(), ServiceError> {
        if self.tx.chain_id.is_empty() {
            return Err(ServiceError::Validation("chain id is required".to_string()));
        }
        let nonce = &self.tx.tx;
        if nonce.signers.is_empty() {
            return Err(ServiceError::Validation("no signers".to_string()));
        }
        if nonce.sequence == 0 {
            return Err(ServiceError::Validation("sequence must be greater than 0".to_string()));
        }
        nonce.tx.validate_basic()
    }

    /// Wire encoding for `broadcast_tx_commit`
    pub fn to_bytes(&self) -> Result<Vec<u8>, ServiceError> {
        borsh::to_vec(self).map_err(|e| ServiceError::Decode(e.to_string()))
    }
}
