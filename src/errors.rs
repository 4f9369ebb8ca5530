use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("storage error: {0}")]
    Storage(#[from] rocksdb::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("cryptography error: {0}")]
    Crypto(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("expected block number [{expected}] but received [{received}]")]
    UnexpectedBlockNumber { expected: u64, received: u64 },
    #[error("block [{0}] does not exist in the block store")]
    BlockNotFound(u64),
    #[error("database {0} does not exist")]
    DatabaseNotFound(String),
    #[error("malformed block [{number}]: {reason}")]
    MalformedBlock { number: u64, reason: String },
    #[error(
        "error while recovering node: the height of state database [{state_db}] is higher than \
         the height of block store [{block_store}]. The node cannot be recovered"
    )]
    StateAheadOfBlockStore { state_db: u64, block_store: u64 },
    #[error(
        "error while recovering node: the difference between the height of the block store \
         [{block_store}] and the state database [{state_db}] cannot be greater than 1 block. \
         The node cannot be recovered"
    )]
    RecoveryGapTooLarge { block_store: u64, state_db: u64 },
}

pub type LedgerResult<T> = Result<T, LedgerError>;
