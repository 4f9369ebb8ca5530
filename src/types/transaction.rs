use serde::{Deserialize, Serialize};

use super::{User, Version};

/// A read performed by a data transaction, together with the version the
/// client observed. `None` means the key was absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRead {
    pub key: String,
    pub version: Option<Version>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataWrite {
    pub key: String,
    pub value: Vec<u8>,
    pub is_delete: bool,
}

impl DataWrite {
    pub fn put(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            is_delete: false,
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Vec::new(),
            is_delete: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTx {
    pub user_id: String,
    pub db_name: String,
    pub reads: Vec<DataRead>,
    pub writes: Vec<DataWrite>,
}

impl DataTx {
    pub fn canonical_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("serializing data transaction")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTxEnvelope {
    pub payload: DataTx,
    pub signature: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub id: String,
    pub address: String,
    pub port: u16,
    pub certificate: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminEntry {
    pub id: String,
    pub certificate: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub nodes: Vec<NodeEntry>,
    pub admins: Vec<AdminEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigTx {
    pub user_id: String,
    /// Version of the cluster configuration the submitter read; `None` when
    /// no configuration has been committed yet.
    pub read_old_config_version: Option<Version>,
    pub new_config: ClusterConfig,
}

impl ConfigTx {
    pub fn canonical_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("serializing config transaction")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigTxEnvelope {
    pub payload: ConfigTx,
    pub signature: Vec<u8>,
}

/// User administration: create, update, and delete entries applied as one
/// transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTx {
    pub user_id: String,
    pub user_creates: Vec<User>,
    pub user_updates: Vec<User>,
    pub user_deletes: Vec<String>,
}

impl UserTx {
    pub fn canonical_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("serializing user transaction")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTxEnvelope {
    pub payload: UserTx,
    pub signature: Vec<u8>,
}
