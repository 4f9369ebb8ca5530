use serde::{Deserialize, Serialize};

use super::{ConfigTxEnvelope, DataTxEnvelope, UserTxEnvelope};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeaderBase {
    pub number: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub base: BlockHeaderBase,
    /// Hashes of preceding block headers at distances 1, B, B², ... supplied
    /// by the block creator.
    pub skipchain_hashes: Vec<Vec<u8>>,
    /// One verdict per transaction. Empty until the block has been validated.
    pub validation_info: Vec<ValidationInfo>,
}

/// Per-transaction validation verdict. The committer only distinguishes
/// `Valid` from the rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flag {
    Valid,
    InvalidDbNotExist,
    InvalidNoPermission,
    InvalidMvccConflict,
    InvalidMalformed,
    InvalidUnauthorizedUser,
    InvalidSignature,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationInfo {
    pub flag: Flag,
}

impl ValidationInfo {
    pub fn new(flag: Flag) -> Self {
        Self { flag }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    DataTxs(Vec<DataTxEnvelope>),
    ConfigTx(ConfigTxEnvelope),
    UserTx(UserTxEnvelope),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub payload: Payload,
}

impl Block {
    pub fn new(number: u64, payload: Payload) -> Self {
        Self {
            header: BlockHeader {
                base: BlockHeaderBase { number },
                skipchain_hashes: Vec::new(),
                validation_info: Vec::new(),
            },
            payload,
        }
    }

    pub fn number(&self) -> u64 {
        self.header.base.number
    }

    /// Number of transactions carried by the payload; config and user
    /// payloads carry exactly one.
    pub fn tx_count(&self) -> usize {
        match &self.payload {
            Payload::DataTxs(envelopes) => envelopes.len(),
            Payload::ConfigTx(_) | Payload::UserTx(_) => 1,
        }
    }

    pub fn header_bytes(&self) -> Vec<u8> {
        bincode::serialize(&self.header).expect("serializing block header")
    }
}
