//! Staking RPC arguments and the stored records returned by stake queries.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::models::jsonrpc::{parse_hex_bytes, strip_hex};

/// An ed25519 validator public key.
///
/// On the JSON side it uses the consensus engine's typed-key layout,
/// `{"type": "ed25519", "data": "<UPPER HEX>"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct PubKey(pub [u8; 32]);

pub const ED25519_KEY_TYPE: &str = "ed25519";

impl PubKey {
    /// Parse a hex encoded public key, with or without "0x"
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let bytes = parse_hex_bytes(s)?;
        let raw: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| format!("invalid pubkey length: expected 32 bytes, got {}", bytes.len()))?;
        Ok(Self(raw))
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

#[derive(Serialize, Deserialize)]
struct TypedKey {
    #[serde(rename = "type")]
    key_type: String,
    data: String,
}

impl Serialize for PubKey {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        TypedKey {
            key_type: ED25519_KEY_TYPE.to_string(),
            data: self.to_hex(),
        }
        .serialize(s)
    }
}

impl<'de> Deserialize<'de> for PubKey {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let typed = TypedKey::deserialize(d)?;
        if typed.key_type != ED25519_KEY_TYPE {
            return Err(de::Error::custom(format!("unsupported key type {}", typed.key_type)));
        }
        PubKey::from_hex(strip_hex(&typed.data)).map_err(de::Error::custom)
    }
}

/// Arguments of `cmt_declareCandidacy`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeclareCandidacyArgs {
    #[serde(default)]
    pub sequence: u32,
    pub from: String,
    #[serde(rename = "pubKey")]
    pub pub_key: String,
}

/// Arguments of `cmt_proposeSlot`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProposeSlotArgs {
    #[serde(default)]
    pub sequence: u32,
    pub from: String,
    #[serde(rename = "pubKey")]
    pub pub_key: String,
    pub amount: i64,
    #[serde(rename = "proposedRoi")]
    pub proposed_roi: i64,
}

/// Arguments of `cmt_acceptSlot`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcceptSlotArgs {
    #[serde(default)]
    pub sequence: u32,
    pub from: String,
    pub amount: i64,
    #[serde(rename = "slotId")]
    pub slot_id: String,
}

/// Arguments of `cmt_withdrawSlot`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WithdrawSlotArgs {
    #[serde(default)]
    pub sequence: u32,
    pub from: String,
    pub amount: i64,
    #[serde(rename = "slotId")]
    pub slot_id: String,
}

/// Arguments of `cmt_cancelSlot`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelSlotArgs {
    #[serde(default)]
    pub sequence: u32,
    pub from: String,
    #[serde(rename = "pubKey")]
    pub pub_key: String,
    #[serde(rename = "slotId")]
    pub slot_id: String,
}

/// Envelope for every stake query: the height the answer was read at and
/// the decoded payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StakeQueryResult<T> {
    pub height: i64,
    pub data: T,
}

/// A validator candidate as stored by the stake module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Candidate {
    pub pub_key: PubKey,
    pub owner_address: String,
    pub shares: i64,
    pub voting_power: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A staking slot offered by a candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Slot {
    pub id: String,
    pub validator_address: String,
    pub total_amount: i64,
    pub available_amount: i64,
    pub proposed_roi: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A delegator's stake in one slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct SlotDelegate {
    pub delegator_address: String,
    pub slot_id: String,
    pub amount: i64,
    pub created_at: String,
    pub updated_at: String,
}
