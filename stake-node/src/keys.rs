//! Store key layout of the application's nonce and stake modules.

use crate::{error::ServiceError, models::stake::PubKey, tx::Actor};

/// Store prefix of the nonce module
pub const NONCE_MODULE: &str = "nonce";
/// Store prefix of the stake module
pub const STAKE_MODULE: &str = "stake";

const CANDIDATE_KEY_PREFIX: u8 = 0x01;
const CANDIDATES_PUBKEYS_KEY: u8 = 0x02;
const DELEGATOR_BONDS_KEY_PREFIX: u8 = 0x07;

/// Key `k` inside the store of module `name`
pub fn prefixed_key(name: &str, key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len() + 1 + key.len());
    out.extend_from_slice(name.as_bytes());
    out.push(b'/');
    out.extend_from_slice(key);
    out
}

/// Sequence key of a signer set. Signers are sorted so the key does not
/// depend on the order they were listed in.
pub fn seq_key(signers: &[Actor]) -> Result<Vec<u8>, ServiceError> {
    let mut sorted = signers.to_vec();
    sorted.sort();
    borsh::to_vec(&sorted).map_err(|e| ServiceError::Decode(e.to_string()))
}

pub fn candidates_pubkeys_key() -> Vec<u8> {
    vec![CANDIDATES_PUBKEYS_KEY]
}

pub fn candidate_key(pub_key: &PubKey) -> Vec<u8> {
    let mut key = vec![CANDIDATE_KEY_PREFIX];
    key.extend_from_slice(pub_key.as_bytes());
    key
}

pub fn delegator_bonds_key(delegator: &Actor) -> Result<Vec<u8>, ServiceError> {
    let mut key = vec![DELEGATOR_BONDS_KEY_PREFIX];
    key.extend(borsh::to_vec(delegator).map_err(|e| ServiceError::Decode(e.to_string()))?);
    Ok(key)
}
