//! Private validator key file of the consensus engine.
//!
//! The file holds the node's ed25519 consensus key together with the
//! last signed height/round/step, which the consensus engine uses to
//! avoid double signing. A fresh file starts at zero.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::Path,
};

use ed25519_dalek::SigningKey;
use eyre::{bail, Result, WrapErr};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::stake::{PubKey, ED25519_KEY_TYPE};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PrivKeyJson {
    #[serde(rename = "type")]
    key_type: String,
    /// Upper hex of the 64-byte keypair (seed || public key)
    data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PrivValidatorJson {
    address: String,
    pub_key: PubKey,
    priv_key: PrivKeyJson,
    last_height: i64,
    last_round: i64,
    last_step: i8,
}

/// Write `contents` to a file readable by its owner only. A new file is
/// created with mode 0600; an existing one is narrowed to 0600 before writing.
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)?;
    file.sync_all()
}

/// The node's consensus signing identity
#[derive(Debug)]
pub struct PrivValidator {
    signing_key: SigningKey,
    last_height: i64,
    last_round: i64,
    last_step: i8,
}

/// Consensus address of a validator key: the first 20 bytes of sha256(pubkey)
pub fn validator_address(pub_key: &PubKey) -> String {
    hex::encode_upper(&Sha256::digest(pub_key.as_bytes())[..20])
}

impl PrivValidator {
    /// Generate a new validator key
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
            last_height: 0,
            last_round: 0,
            last_step: 0,
        }
    }

    pub fn pub_key(&self) -> PubKey {
        PubKey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn address(&self) -> String {
        validator_address(&self.pub_key())
    }

    /// Write the key file with owner-only permissions
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
        }

        let file = PrivValidatorJson {
            address: self.address(),
            pub_key: self.pub_key(),
            priv_key: PrivKeyJson {
                key_type: ED25519_KEY_TYPE.to_string(),
                data: hex::encode_upper(self.signing_key.to_keypair_bytes()),
            },
            last_height: self.last_height,
            last_round: self.last_round,
            last_step: self.last_step,
        };
        let json = serde_json::to_string_pretty(&file).wrap_err("Failed to serialize private validator")?;
        write_private(path, json.as_bytes()).wrap_err_with(|| format!("Failed to write {}", path.display()))
    }

    /// Load a key file, checking that its public parts match the key
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        let file: PrivValidatorJson =
            serde_json::from_str(&raw).wrap_err("Failed to parse private validator file")?;

        if file.priv_key.key_type != ED25519_KEY_TYPE {
            bail!("Unsupported private key type: {}", file.priv_key.key_type);
        }
        let bytes = hex::decode(&file.priv_key.data).wrap_err("Failed to decode private key")?;
        let keypair: [u8; 64] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| eyre::eyre!("Invalid private key length: expected 64 bytes, got {}", bytes.len()))?;
        let signing_key = SigningKey::from_keypair_bytes(&keypair)
            .map_err(|e| eyre::eyre!("Invalid private key: {}", e))?;

        let validator = Self {
            signing_key,
            last_height: file.last_height,
            last_round: file.last_round,
            last_step: file.last_step,
        };
        if validator.pub_key() != file.pub_key {
            bail!("Public key mismatch: private validator file may be corrupted");
        }
        if !validator.address().eq_ignore_ascii_case(&file.address) {
            bail!("Address mismatch: private validator file may be corrupted");
        }
        Ok(validator)
    }

    /// Load the key file at `path`, or generate and save a new one
    ///
    /// # Returns
    ///
    /// * The validator and whether it was newly generated
    pub fn load_or_generate<P: AsRef<Path>>(path: P) -> Result<(Self, bool)> {
        let path = path.as_ref();
        if path.exists() {
            return Ok((Self::load(path)?, false));
        }
        let validator = Self::generate();
        validator.save(path)?;
        Ok((validator, true))
    }
}
