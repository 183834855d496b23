//! Loading of compiled contract artifacts.
//!
//! Both Hardhat (`bytecode` as a hex string) and Foundry (`bytecode.object`)
//! artifact layouts are accepted. Hardhat debug files are followed to the
//! build info they reference, which carries the compiler input needed for
//! source verification.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use alloy::json_abi::JsonAbi;
use alloy_primitives::Bytes;
use serde::Deserialize;
use tracing::debug;

use crate::{
    constants::{BUILD_INFO_DIR, DBG_FILE_SUFFIX},
    errors::DeployError,
};

/// A compiled contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// The contract name, e.g. `MyDanDefi`
    pub contract_name: String,
    /// The source file defining the contract, e.g. `src/MyDanDefi.sol`
    pub source_name: String,
    /// The contract's interface schema
    pub abi: JsonAbi,
    /// The creation bytecode
    pub bytecode: Bytes,
}

impl Artifact {
    /// Construct an artifact
    pub fn new(
        contract_name: impl Into<String>,
        source_name: impl Into<String>,
        abi: JsonAbi,
        bytecode: Bytes,
    ) -> Self {
        Self {
            contract_name: contract_name.into(),
            source_name: source_name.into(),
            abi,
            bytecode,
        }
    }

    /// The `<source>:<contract>` identifier of the artifact
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }

    /// The creation code deploying this artifact with the given encoded
    /// constructor arguments
    pub fn creation_code(&self, constructor_args: &[u8]) -> Result<Bytes, DeployError> {
        if self.bytecode.is_empty() {
            return Err(DeployError::ArtifactParsing(format!(
                "`{}` has no creation bytecode",
                self.fully_qualified_name()
            )));
        }

        Ok([self.bytecode.as_ref(), constructor_args].concat().into())
    }
}

/// The compiler settings and sources an artifact was built from
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    /// The full compiler version, e.g. `0.8.11+commit.d7f03943`
    pub solc_long_version: String,
    /// The standard JSON input given to the compiler
    pub input: serde_json::Value,
}

/// The bytecode field in either artifact layout
#[derive(Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    /// Hardhat
    Hex(Bytes),
    /// Foundry
    Object {
        /// The creation bytecode
        object: Bytes,
    },
}

/// An artifact file as found on disk
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    /// Present in Hardhat artifacts only
    contract_name: Option<String>,
    /// Present in Hardhat artifacts only
    source_name: Option<String>,
    /// The interface schema
    abi: JsonAbi,
    /// The creation bytecode
    bytecode: RawBytecode,
}

/// A Hardhat debug file
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DbgFile {
    /// Path to the build info, relative to the debug file
    build_info: PathBuf,
}

/// The set of artifacts available to a run
#[derive(Debug, Default, Clone)]
pub struct ArtifactRegistry {
    /// Artifacts keyed by fully-qualified name
    artifacts: BTreeMap<String, Artifact>,
    /// Build info paths keyed by fully-qualified name
    build_info: BTreeMap<String, PathBuf>,
}

impl ArtifactRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Recursively load every artifact under `root`
    pub fn load_dir(root: impl AsRef<Path>) -> Result<Self, DeployError> {
        let mut registry = Self::new();
        registry.visit(root.as_ref())?;
        debug!("Loaded {} artifacts", registry.artifacts.len());
        Ok(registry)
    }

    /// Add an artifact to the registry, replacing one with the same
    /// fully-qualified name
    pub fn insert(&mut self, artifact: Artifact) {
        self.artifacts.insert(artifact.fully_qualified_name(), artifact);
    }

    /// Look up an artifact by contract name or fully-qualified name.
    ///
    /// A bare contract name must be unambiguous.
    pub fn get(&self, name: &str) -> Result<&Artifact, DeployError> {
        if let Some(artifact) = self.artifacts.get(name) {
            return Ok(artifact);
        }

        let mut matches = self.artifacts.values().filter(|a| a.contract_name == name);
        match (matches.next(), matches.next()) {
            (Some(artifact), None) => Ok(artifact),
            (Some(_), Some(_)) => Err(DeployError::UnknownArtifact(format!(
                "`{name}` is ambiguous, use a fully-qualified name"
            ))),
            (None, _) => Err(DeployError::UnknownArtifact(name.to_string())),
        }
    }

    /// The build info of the artifact with the given fully-qualified name,
    /// if its debug file was found
    pub fn build_info(&self, fully_qualified_name: &str) -> Result<Option<BuildInfo>, DeployError> {
        let Some(path) = self.build_info.get(fully_qualified_name) else {
            return Ok(None);
        };

        let contents =
            fs::read_to_string(path).map_err(|e| DeployError::ArtifactParsing(e.to_string()))?;
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| DeployError::ArtifactParsing(format!("{}: {}", path.display(), e)))
    }

    /// Walk a directory, collecting artifacts
    fn visit(&mut self, dir: &Path) -> Result<(), DeployError> {
        let entries = fs::read_dir(dir)
            .map_err(|e| DeployError::ArtifactParsing(format!("{}: {}", dir.display(), e)))?;

        for entry in entries {
            let path = entry
                .map_err(|e| DeployError::ArtifactParsing(e.to_string()))?
                .path();
            let file_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default()
                .to_string();

            if path.is_dir() {
                if file_name != BUILD_INFO_DIR {
                    self.visit(&path)?;
                }
            } else if !file_name.ends_with(DBG_FILE_SUFFIX)
                && path.extension().is_some_and(|ext| ext == "json")
            {
                self.load_file(&path)?;
            }
        }

        Ok(())
    }

    /// Parse a single artifact file, ignoring JSON files of other shapes
    fn load_file(&mut self, path: &Path) -> Result<(), DeployError> {
        let contents =
            fs::read_to_string(path).map_err(|e| DeployError::ArtifactParsing(e.to_string()))?;
        let Ok(raw) = serde_json::from_str::<RawArtifact>(&contents) else {
            debug!("Skipping non-artifact file {}", path.display());
            return Ok(());
        };

        let file_stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();
        // Foundry nests `<Contract>.json` under a `<Source>.sol` directory
        let parent = path
            .parent()
            .and_then(|dir| dir.file_name())
            .and_then(|name| name.to_str())
            .unwrap_or_default();

        let artifact = Artifact::new(
            raw.contract_name.unwrap_or_else(|| file_stem.to_string()),
            raw.source_name.unwrap_or_else(|| parent.to_string()),
            raw.abi,
            match raw.bytecode {
                RawBytecode::Hex(bytes) => bytes,
                RawBytecode::Object { object } => object,
            },
        );

        let dbg_path = path.with_file_name(format!("{file_stem}{DBG_FILE_SUFFIX}"));
        if dbg_path.exists() {
            let dbg: DbgFile = fs::read_to_string(&dbg_path)
                .map_err(|e| DeployError::ArtifactParsing(e.to_string()))
                .and_then(|s| {
                    serde_json::from_str(&s)
                        .map_err(|e| DeployError::ArtifactParsing(e.to_string()))
                })?;

            let dir = dbg_path.parent().unwrap_or(Path::new("."));
            self.build_info
                .insert(artifact.fully_qualified_name(), dir.join(dbg.build_info));
        }

        self.insert(artifact);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use eyre::Result;
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_hardhat_and_foundry_layouts() -> Result<()> {
        let root = tempdir()?;
        let hardhat_dir = root.path().join("src/MyDanPass.sol");
        let foundry_dir = root.path().join("MyDanDefiProxy.sol");
        let build_info_dir = root.path().join("build-info");
        fs::create_dir_all(&hardhat_dir)?;
        fs::create_dir_all(&foundry_dir)?;
        fs::create_dir_all(&build_info_dir)?;

        fs::write(
            hardhat_dir.join("MyDanPass.json"),
            json!({
                "contractName": "MyDanPass",
                "sourceName": "src/MyDanPass.sol",
                "abi": [{
                    "type": "function",
                    "name": "setMinter",
                    "inputs": [{ "name": "minter", "type": "address", "internalType": "address" }],
                    "outputs": [],
                    "stateMutability": "nonpayable"
                }],
                "bytecode": "0x6080"
            })
            .to_string(),
        )?;
        fs::write(
            hardhat_dir.join("MyDanPass.dbg.json"),
            json!({ "_format": "hh-sol-dbg-1", "buildInfo": "../../build-info/abc.json" })
                .to_string(),
        )?;
        fs::write(
            build_info_dir.join("abc.json"),
            json!({
                "solcLongVersion": "0.8.11+commit.d7f03943",
                "input": { "language": "Solidity" }
            })
            .to_string(),
        )?;
        fs::write(
            foundry_dir.join("MyDanDefiProxy.json"),
            json!({ "abi": [], "bytecode": { "object": "0x60806040" } }).to_string(),
        )?;

        let registry = ArtifactRegistry::load_dir(root.path())?;

        let pass = registry.get("MyDanPass")?;
        assert_eq!(pass.fully_qualified_name(), "src/MyDanPass.sol:MyDanPass");
        assert_eq!(pass.bytecode.as_ref(), &[0x60, 0x80]);
        assert!(pass.abi.function("setMinter").is_some());

        let info = registry.build_info("src/MyDanPass.sol:MyDanPass")?.unwrap();
        assert_eq!(info.solc_long_version, "0.8.11+commit.d7f03943");

        let proxy = registry.get("MyDanDefiProxy")?;
        assert_eq!(proxy.fully_qualified_name(), "MyDanDefiProxy.sol:MyDanDefiProxy");
        assert!(registry.build_info(&proxy.fully_qualified_name())?.is_none());

        Ok(())
    }

    #[test]
    fn test_ambiguous_and_missing_names() {
        let mut registry = ArtifactRegistry::new();
        registry.insert(Artifact::new("Token", "a/Token.sol", JsonAbi::new(), Bytes::new()));
        registry.insert(Artifact::new("Token", "b/Token.sol", JsonAbi::new(), Bytes::new()));

        assert!(matches!(registry.get("Token"), Err(DeployError::UnknownArtifact(_))));
        assert!(registry.get("b/Token.sol:Token").is_ok());
        assert!(matches!(registry.get("Missing"), Err(DeployError::UnknownArtifact(_))));
    }

    #[test]
    fn test_creation_code_appends_constructor_args() {
        let artifact = Artifact::new("A", "A.sol", JsonAbi::new(), Bytes::from(vec![0x60, 0x80]));
        assert_eq!(artifact.creation_code(&[0x01]).unwrap().as_ref(), &[0x60, 0x80, 0x01]);

        let empty = Artifact::new("I", "I.sol", JsonAbi::new(), Bytes::new());
        assert!(empty.creation_code(&[]).is_err());
    }
}
