use std::convert::TryInto;
use std::path::Path;
use std::sync::Arc;

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options, WriteBatch,
};

use crate::crypto;
use crate::errors::{LedgerError, LedgerResult};
use crate::types::Block;

/// Fan-out of the skip chain: block creators link each block to the headers
/// at distances 1, B, B², ... behind it.
pub const SKIP_LIST_BASE: u64 = 10;

pub(crate) const CF_BLOCKS: &str = "blocks";
pub(crate) const CF_HASHES: &str = "hashes";
pub(crate) const CF_METADATA: &str = "metadata";
const HEIGHT_KEY: &[u8] = b"height";

/// Append-only store of numbered blocks. Source of truth for replay: the
/// world state can always be reconstructed from here, never the reverse.
pub struct BlockStore {
    db: DBWithThreadMode<MultiThreaded>,
}

impl BlockStore {
    pub fn open(path: &Path) -> LedgerResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_BLOCKS, Options::default()),
            ColumnFamilyDescriptor::new(CF_HASHES, Options::default()),
            ColumnFamilyDescriptor::new(CF_METADATA, Options::default()),
        ];
        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)?;
        Ok(Self { db })
    }

    fn cf(&self, name: &str) -> LedgerResult<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LedgerError::Config(format!("missing {name} column family")))
    }

    /// Appends the next block. The block number must be exactly one above the
    /// current height.
    pub fn commit(&self, block: &Block) -> LedgerResult<()> {
        let expected = self.height()? + 1;
        let received = block.number();
        if received != expected {
            return Err(LedgerError::UnexpectedBlockNumber { expected, received });
        }

        let encoded = bincode::serialize(block)?;
        let header_hash = crypto::sha256(&block.header_bytes());

        let mut batch = WriteBatch::default();
        batch.put_cf(&self.cf(CF_BLOCKS)?, received.to_be_bytes(), encoded);
        batch.put_cf(&self.cf(CF_HASHES)?, received.to_be_bytes(), header_hash);
        batch.put_cf(&self.cf(CF_METADATA)?, HEIGHT_KEY, received.to_be_bytes());
        self.db.write(batch)?;
        Ok(())
    }

    pub fn get(&self, number: u64) -> LedgerResult<Option<Block>> {
        let raw = self.db.get_cf(&self.cf(CF_BLOCKS)?, number.to_be_bytes())?;
        match raw {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// SHA-256 hash of the serialized header of the block at `number`,
    /// recorded when the block was committed.
    pub fn get_hash(&self, number: u64) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.db.get_cf(&self.cf(CF_HASHES)?, number.to_be_bytes())?)
    }

    /// Greatest committed block number; 0 when the store is empty.
    pub fn height(&self) -> LedgerResult<u64> {
        let raw = self.db.get_cf(&self.cf(CF_METADATA)?, HEIGHT_KEY)?;
        match raw {
            Some(bytes) => decode_height(&bytes),
            None => Ok(0),
        }
    }
}

fn decode_height(bytes: &[u8]) -> LedgerResult<u64> {
    let array: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LedgerError::Config("malformed height entry".into()))?;
    Ok(u64::from_be_bytes(array))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::BlockStore;
    use crate::crypto;
    use crate::types::{Block, Payload};

    fn sample_block(number: u64) -> Block {
        Block::new(number, Payload::DataTxs(Vec::new()))
    }

    #[test]
    fn commits_sequential_blocks_and_tracks_height() {
        let dir = tempdir().expect("tempdir");
        let store = BlockStore::open(dir.path()).expect("open block store");
        assert_eq!(store.height().expect("height"), 0);

        for number in 1..=5 {
            store.commit(&sample_block(number)).expect("commit block");
        }
        assert_eq!(store.height().expect("height"), 5);

        let third = store.get(3).expect("get block").expect("block present");
        assert_eq!(third, sample_block(3));
        assert!(store.get(6).expect("get block").is_none());
    }

    #[test]
    fn rejects_out_of_order_block() {
        let dir = tempdir().expect("tempdir");
        let store = BlockStore::open(dir.path()).expect("open block store");

        let err = store.commit(&sample_block(10)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected block number [1] but received [10]"
        );

        store.commit(&sample_block(1)).expect("commit block 1");
        let err = store.commit(&sample_block(1)).unwrap_err();
        assert_eq!(err.to_string(), "expected block number [2] but received [1]");
    }

    #[test]
    fn records_header_hash_on_commit() {
        let dir = tempdir().expect("tempdir");
        let store = BlockStore::open(dir.path()).expect("open block store");

        let block = sample_block(1);
        store.commit(&block).expect("commit block");

        let hash = store.get_hash(1).expect("get hash").expect("hash present");
        assert_eq!(hash, crypto::sha256(&block.header_bytes()));
        assert!(store.get_hash(2).expect("get hash").is_none());
    }

    #[test]
    fn height_survives_reopen() {
        let dir = tempdir().expect("tempdir");
        {
            let store = BlockStore::open(dir.path()).expect("open block store");
            store.commit(&sample_block(1)).expect("commit block");
            store.commit(&sample_block(2)).expect("commit block");
        }
        let reopened = BlockStore::open(dir.path()).expect("reopen block store");
        assert_eq!(reopened.height().expect("height"), 2);
        assert!(reopened.get(2).expect("get block").is_some());
    }
}
