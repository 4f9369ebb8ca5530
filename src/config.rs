use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, LedgerResult};
use crate::types::{AdminEntry, ClusterConfig, NodeEntry};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    pub data_dir: PathBuf,
    #[serde(default = "default_block_queue_size")]
    pub block_queue_size: usize,
    pub genesis: GenesisConfig,
}

fn default_block_queue_size() -> usize {
    100
}

impl NodeConfig {
    pub fn load(path: &Path) -> LedgerResult<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|err| LedgerError::Config(format!("unable to parse config: {err}")))
    }

    pub fn save(&self, path: &Path) -> LedgerResult<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;
        let encoded = toml::to_string_pretty(self)
            .map_err(|err| LedgerError::Config(format!("unable to encode config: {err}")))?;
        fs::write(path, encoded)?;
        Ok(())
    }

    pub fn ensure_directories(&self) -> LedgerResult<()> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    pub fn block_store_dir(&self) -> PathBuf {
        self.data_dir.join("blockstore")
    }

    pub fn world_state_dir(&self) -> PathBuf {
        self.data_dir.join("worldstate")
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            block_queue_size: default_block_queue_size(),
            genesis: GenesisConfig::default(),
        }
    }
}

/// Bootstrap cluster membership. Certificates are referenced as paths to
/// DER-encoded files and read when the genesis block is assembled.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub nodes: Vec<GenesisNode>,
    pub admins: Vec<GenesisAdmin>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisNode {
    pub id: String,
    pub address: String,
    pub port: u16,
    pub certificate_path: PathBuf,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisAdmin {
    pub id: String,
    pub certificate_path: PathBuf,
}

impl GenesisConfig {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.admins.is_empty()
    }

    pub fn cluster_config(&self) -> LedgerResult<ClusterConfig> {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            nodes.push(NodeEntry {
                id: node.id.clone(),
                address: node.address.clone(),
                port: node.port,
                certificate: fs::read(&node.certificate_path)?,
            });
        }
        let mut admins = Vec::with_capacity(self.admins.len());
        for admin in &self.admins {
            admins.push(AdminEntry {
                id: admin.id.clone(),
                certificate: fs::read(&admin.certificate_path)?,
            });
        }
        Ok(ClusterConfig { nodes, admins })
    }
}
