//! Keystore-backed account manager.
//!
//! Accounts live as encrypted v3 key files in the node's keystore directory.
//! An account must be unlocked with its password before it can sign; the
//! decrypted signer is kept in memory until the unlock deadline passes.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use alloy::{
    primitives::{Address, B256},
    signers::{local::PrivateKeySigner, SignerSync},
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{error::ServiceError, models::jsonrpc::parse_hex_address};

/// Unlock duration used when the caller does not give one
pub const DEFAULT_UNLOCK_DURATION: Duration = Duration::from_secs(300);

/// Longest unlock duration accepted, in seconds
pub const MAX_UNLOCK_SECS: u64 = i64::MAX as u64 / 1_000_000_000;

struct Unlocked {
    signer: PrivateKeySigner,
    expires_at: Instant,
}

pub struct AccountManager {
    keystore_dir: PathBuf,
    unlocked: RwLock<HashMap<Address, Unlocked>>,
}

/// Resolve an optional unlock duration in seconds
pub fn unlock_duration(secs: Option<u64>) -> Result<Duration, ServiceError> {
    match secs {
        None => Ok(DEFAULT_UNLOCK_DURATION),
        Some(s) if s > MAX_UNLOCK_SECS => {
            Err(ServiceError::InvalidParams("unlock duration too large".to_string()))
        }
        Some(s) => Ok(Duration::from_secs(s)),
    }
}

impl AccountManager {
    pub fn new(keystore_dir: impl Into<PathBuf>) -> Self {
        Self {
            keystore_dir: keystore_dir.into(),
            unlocked: RwLock::new(HashMap::new()),
        }
    }

    pub fn keystore_dir(&self) -> &Path {
        &self.keystore_dir
    }

    /// Decrypt the key file of `address` and keep it unlocked for `duration`
    pub async fn unlock(
        &self,
        address: Address,
        password: String,
        duration: Duration,
    ) -> Result<(), ServiceError> {
        let dir = self.keystore_dir.clone();
        // scrypt blocks for a noticeable time; run it off the async workers
        let signer = tokio::task::spawn_blocking(move || -> Result<PrivateKeySigner, ServiceError> {
            let path = find_key_file(&dir, &address)?;
            PrivateKeySigner::decrypt_keystore(&path, password)
                .map_err(|e| ServiceError::Account(format!("could not decrypt key with given password: {}", e)))
        })
        .await
        .map_err(|e| ServiceError::Account(e.to_string()))??;

        if signer.address() != address {
            return Err(ServiceError::Account(format!(
                "key file for {} holds key of {}",
                address,
                signer.address()
            )));
        }

        self.unlocked.write().await.insert(
            address,
            Unlocked {
                signer,
                expires_at: Instant::now() + duration,
            },
        );
        info!(%address, secs = duration.as_secs(), "Unlocked account");
        Ok(())
    }

    /// Drop the decrypted key of `address`, returning whether it was unlocked
    pub async fn lock(&self, address: &Address) -> bool {
        self.unlocked.write().await.remove(address).is_some()
    }

    /// Sign a 32-byte digest with an unlocked account
    pub async fn sign_hash(&self, address: &Address, hash: &B256) -> Result<[u8; 65], ServiceError> {
        {
            let unlocked = self.unlocked.read().await;
            if let Some(entry) = unlocked.get(address) {
                if entry.expires_at > Instant::now() {
                    let signature = entry
                        .signer
                        .sign_hash_sync(hash)
                        .map_err(|e| ServiceError::Signing(e.to_string()))?;
                    return Ok(signature.as_bytes());
                }
            }
        }

        // Expired entries are evicted on first use after the deadline
        if self.unlocked.write().await.remove(address).is_some() {
            debug!(%address, "Unlock expired");
        }
        Err(ServiceError::Account(format!("authentication needed: account {} is locked", address)))
    }
}

/// Find the v3 key file of `address` in `dir`.
///
/// A file matches when the address in its JSON body, or failing that the
/// `UTC--<time>--<address>` suffix of its name, equals `address`.
pub fn find_key_file(dir: &Path, address: &Address) -> Result<PathBuf, ServiceError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| ServiceError::Account(format!("keystore {}: {}", dir.display(), e)))?;

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let declared = fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
            .and_then(|json| json.get("address").and_then(|a| a.as_str()).map(str::to_owned))
            .or_else(|| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| n.rsplit("--").next())
                    .map(str::to_owned)
            });
        match declared.as_deref().map(parse_hex_address) {
            Some(Ok(found)) if found == *address => return Ok(path),
            Some(Err(e)) => debug!(path = %path.display(), error = %e, "Skipping key file"),
            _ => {}
        }
    }
    Err(ServiceError::Account(format!("no key for given address or file: {}", address)))
}
