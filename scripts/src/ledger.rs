//! The deployments ledger, mapping a component's logical name to its last
//! deployed address and interface schema.
//!
//! A ledger is scoped to one network. The file-backed ledger keeps one
//! human-readable JSON document per component under
//! `<root>/<network>/<Name>.json`, so that repeated runs against the same
//! network observe the addresses recorded by earlier runs.

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use alloy::json_abi::JsonAbi;
use alloy_primitives::{Address, Bytes, TxHash};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    constants::{CHAIN_ID_FILE, LEDGER_RECORD_EXTENSION, LEDGER_TMP_EXTENSION},
    errors::DeployError,
};

/// The ledger entry of a deployed component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRecord {
    /// The logical name under which the component is recorded
    pub name: String,
    /// The address callers should use to reach the component
    pub address: Address,
    /// The component's interface schema
    pub abi: JsonAbi,
    /// The ABI-encoded constructor arguments the instance was created with
    #[serde(default)]
    pub constructor_args: Bytes,
    /// The hash of the deployment transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<TxHash>,
    /// For proxies, the logic instance the proxy was last pointed at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<Address>,
    /// The fully-qualified name of the artifact deployed at `address`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
}

/// A persisted mapping from component name to [`ComponentRecord`]
pub trait DeploymentLedger: Send + Sync {
    /// Fetch the record stored under `name`, if any
    fn get(&self, name: &str) -> Result<Option<ComponentRecord>, DeployError>;

    /// Store `record` under its name, replacing any previous record.
    ///
    /// The write must be durable when this returns.
    fn put(&mut self, record: ComponentRecord) -> Result<(), DeployError>;

    /// All records, sorted by name
    fn records(&self) -> Result<Vec<ComponentRecord>, DeployError>;

    /// Fetch the record stored under `name`, failing if there is none
    fn require(&self, name: &str) -> Result<ComponentRecord, DeployError> {
        self.get(name)?
            .ok_or_else(|| DeployError::UnknownComponent(name.to_string()))
    }
}

// ---------------
// | File Ledger |
// ---------------

/// A ledger persisted as one JSON file per component
pub struct FileLedger {
    /// The network-scoped directory holding the record files
    dir: PathBuf,
}

impl FileLedger {
    /// Open (creating if necessary) the ledger of `network` under `root`.
    ///
    /// The chain id is stored alongside the records the first time the
    /// ledger is opened, and a mismatch on later opens is an error.
    pub fn open(root: impl AsRef<Path>, network: &str, chain_id: u64) -> Result<Self, DeployError> {
        let dir = root.as_ref().join(network);
        fs::create_dir_all(&dir).map_err(|e| DeployError::WriteDeployments(e.to_string()))?;

        let chain_id_path = dir.join(CHAIN_ID_FILE);
        if chain_id_path.exists() {
            let stored = fs::read_to_string(&chain_id_path)
                .map_err(|e| DeployError::ReadDeployments(e.to_string()))?;
            let stored: u64 = stored
                .trim()
                .parse()
                .map_err(|_| DeployError::ReadDeployments(format!("malformed {CHAIN_ID_FILE}")))?;

            if stored != chain_id {
                return Err(DeployError::ReadDeployments(format!(
                    "deployments for `{network}` belong to chain {stored}, connected to chain {chain_id}"
                )));
            }
        } else {
            fs::write(&chain_id_path, chain_id.to_string())
                .map_err(|e| DeployError::WriteDeployments(e.to_string()))?;
        }

        Ok(Self { dir })
    }

    /// The directory holding this network's records
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The path of the record file for `name`
    fn record_path(&self, name: &str) -> Result<PathBuf, DeployError> {
        if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
            return Err(DeployError::WriteDeployments(format!(
                "invalid component name `{name}`"
            )));
        }

        Ok(self.dir.join(format!("{name}.{LEDGER_RECORD_EXTENSION}")))
    }
}

/// Parse a record file
fn read_record(path: &Path) -> Result<ComponentRecord, DeployError> {
    let contents =
        fs::read_to_string(path).map_err(|e| DeployError::ReadDeployments(e.to_string()))?;
    serde_json::from_str(&contents)
        .map_err(|e| DeployError::ReadDeployments(format!("{}: {}", path.display(), e)))
}

impl DeploymentLedger for FileLedger {
    fn get(&self, name: &str) -> Result<Option<ComponentRecord>, DeployError> {
        let path = self.record_path(name)?;
        if !path.exists() {
            return Ok(None);
        }

        read_record(&path).map(Some)
    }

    fn put(&mut self, record: ComponentRecord) -> Result<(), DeployError> {
        let path = self.record_path(&record.name)?;
        let tmp_path = self.dir.join(format!("{}.{LEDGER_TMP_EXTENSION}", record.name));

        let contents = serde_json::to_string_pretty(&record)
            .map_err(|e| DeployError::WriteDeployments(e.to_string()))?;

        // Write the full record aside, then swap it in
        let mut file =
            File::create(&tmp_path).map_err(|e| DeployError::WriteDeployments(e.to_string()))?;
        file.write_all(contents.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| DeployError::WriteDeployments(e.to_string()))?;
        fs::rename(&tmp_path, &path).map_err(|e| DeployError::WriteDeployments(e.to_string()))?;

        #[cfg(unix)]
        File::open(&self.dir)
            .and_then(|dir| dir.sync_all())
            .map_err(|e| DeployError::WriteDeployments(e.to_string()))?;

        debug!("Recorded `{}` at {:#x} in {}", record.name, record.address, path.display());
        Ok(())
    }

    fn records(&self) -> Result<Vec<ComponentRecord>, DeployError> {
        let entries =
            fs::read_dir(&self.dir).map_err(|e| DeployError::ReadDeployments(e.to_string()))?;

        let mut records = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| DeployError::ReadDeployments(e.to_string()))?
                .path();
            let is_record = path.extension().is_some_and(|ext| ext == LEDGER_RECORD_EXTENSION)
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| !name.starts_with('.'));

            if is_record {
                records.push(read_record(&path)?);
            }
        }

        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }
}

// -----------------
// | Memory Ledger |
// -----------------

/// A ledger held in memory, discarded with the process
#[derive(Default)]
pub struct MemoryLedger {
    /// The records, keyed by name
    records: BTreeMap<String, ComponentRecord>,
}

impl MemoryLedger {
    /// An empty ledger
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeploymentLedger for MemoryLedger {
    fn get(&self, name: &str) -> Result<Option<ComponentRecord>, DeployError> {
        Ok(self.records.get(name).cloned())
    }

    fn put(&mut self, record: ComponentRecord) -> Result<(), DeployError> {
        self.records.insert(record.name.clone(), record);
        Ok(())
    }

    fn records(&self) -> Result<Vec<ComponentRecord>, DeployError> {
        Ok(self.records.values().cloned().collect())
    }
}
