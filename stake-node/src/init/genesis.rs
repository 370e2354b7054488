//! Consensus genesis document.

use std::{fs, path::Path};

use chrono::{DateTime, Utc};
use eyre::{bail, Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::models::stake::PubKey;

/// Voting power given to the node's own validator in a fresh genesis
pub const DEFAULT_VALIDATOR_POWER: i64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisValidator {
    pub pub_key: PubKey,
    pub power: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisDoc {
    pub genesis_time: DateTime<Utc>,
    pub chain_id: String,
    pub validators: Vec<GenesisValidator>,
    #[serde(default)]
    pub app_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_state: Option<serde_json::Value>,
}

impl GenesisDoc {
    /// Genesis for a single-validator chain
    pub fn single_validator(chain_id: &str, pub_key: PubKey) -> Self {
        Self {
            genesis_time: Utc::now(),
            chain_id: chain_id.to_string(),
            validators: vec![GenesisValidator {
                pub_key,
                power: DEFAULT_VALIDATOR_POWER,
                name: String::new(),
            }],
            app_hash: String::new(),
            app_state: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chain_id.is_empty() {
            bail!("Genesis doc must include non-empty chain_id");
        }
        for v in &self.validators {
            if v.power <= 0 {
                bail!("Genesis file cannot contain validators with no voting power: {}", v.pub_key.to_hex());
            }
        }
        Ok(())
    }

    /// Validate and write the document as pretty JSON
    pub fn save_as<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.validate()?;
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).wrap_err("Failed to serialize genesis doc")?;
        fs::write(path, json).wrap_err_with(|| format!("Failed to write {}", path.display()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        let doc: GenesisDoc = serde_json::from_str(&raw).wrap_err("Failed to parse genesis doc")?;
        doc.validate()?;
        Ok(doc)
    }
}
