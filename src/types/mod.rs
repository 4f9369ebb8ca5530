mod block;
mod transaction;
mod user;

pub use block::{Block, BlockHeader, BlockHeaderBase, Flag, Payload, ValidationInfo};
pub use transaction::{
    AdminEntry, ClusterConfig, ConfigTx, ConfigTxEnvelope, DataRead, DataTx, DataTxEnvelope,
    DataWrite, NodeEntry, UserTx, UserTxEnvelope,
};
pub use user::{AccessLevel, Privilege, User};

use serde::{Deserialize, Serialize};

/// Commit site of a key's latest value: the block and the transaction index
/// within that block. Ordered lexicographically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
    pub block_num: u64,
    pub tx_num: u64,
}

impl Version {
    pub fn new(block_num: u64, tx_num: u64) -> Self {
        Self { block_num, tx_num }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub version: Version,
}

impl Metadata {
    pub fn at(block_num: u64, tx_num: u64) -> Self {
        Self {
            version: Version::new(block_num, tx_num),
        }
    }
}
