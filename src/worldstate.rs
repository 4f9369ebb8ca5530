use std::collections::BTreeSet;
use std::convert::TryInto;
use std::path::Path;
use std::sync::Arc;

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options, WriteBatch,
};
use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, LedgerResult};
use crate::types::Metadata;

pub const DEFAULT_DB_NAME: &str = "default";
pub const USERS_DB_NAME: &str = "users";
pub const CONFIG_DB_NAME: &str = "config";
pub const DATABASES_DB_NAME: &str = "databases";

/// Key of the cluster configuration entry inside the `config` sub-store.
pub const CONFIG_KEY: &str = "config";

const CF_METADATA: &str = "metadata";
const HEIGHT_KEY: &[u8] = b"height";

const SYSTEM_DB_NAMES: [&str; 4] = [USERS_DB_NAME, CONFIG_DB_NAME, DATABASES_DB_NAME, CF_METADATA];

/// Sub-stores that hold ledger bookkeeping rather than user data. Data
/// transactions may never target them.
pub fn is_system_db(name: &str) -> bool {
    SYSTEM_DB_NAMES.contains(&name)
}

#[derive(Serialize, Deserialize)]
struct VersionedValue {
    value: Vec<u8>,
    metadata: Metadata,
}

/// Write set for one sub-store, applied as part of a single commit.
#[derive(Clone, Debug)]
pub struct DbUpdates {
    pub db_name: String,
    pub writes: Vec<KvWrite>,
}

/// A single key mutation. `value: None` tombstones the key.
#[derive(Clone, Debug)]
pub struct KvWrite {
    pub key: String,
    pub value: Option<Vec<u8>>,
    pub metadata: Metadata,
}

/// Materialized view of all valid writes, partitioned into named sub-stores
/// backed by column families. Single-writer: only the committer (and startup
/// recovery) mutates it.
pub struct WorldState {
    db: DBWithThreadMode<MultiThreaded>,
}

impl WorldState {
    pub fn open(path: &Path) -> LedgerResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let mut cf_names: BTreeSet<String> =
            DBWithThreadMode::<MultiThreaded>::list_cf(&Options::default(), path)
                .unwrap_or_default()
                .into_iter()
                .collect();
        cf_names.insert(DEFAULT_DB_NAME.to_string());
        for name in SYSTEM_DB_NAMES {
            cf_names.insert(name.to_string());
        }

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = cf_names
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();
        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)?;

        let state = Self { db };
        state.register(DEFAULT_DB_NAME)?;
        Ok(state)
    }

    fn cf(&self, name: &str) -> LedgerResult<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LedgerError::DatabaseNotFound(name.to_string()))
    }

    fn register(&self, name: &str) -> LedgerResult<()> {
        let registry = self.cf(DATABASES_DB_NAME)?;
        if self.db.get_cf(&registry, name.as_bytes())?.is_none() {
            self.db.put_cf(&registry, name.as_bytes(), [])?;
        }
        Ok(())
    }

    /// Creates a new user database and records it in the `databases`
    /// registry.
    pub fn create(&self, name: &str) -> LedgerResult<()> {
        if name.is_empty() || is_system_db(name) {
            return Err(LedgerError::Config(format!(
                "{name:?} is not a valid database name"
            )));
        }
        if self.exists(name) {
            return Err(LedgerError::Config(format!(
                "database {name} already exists"
            )));
        }
        self.db.create_cf(name, &Options::default())?;
        self.register(name)
    }

    /// Whether a column family for `name` is present.
    pub fn exists(&self, name: &str) -> bool {
        self.db.cf_handle(name).is_some()
    }

    /// Whether `name` is listed in the `databases` registry, i.e. is a legal
    /// target for data transactions.
    pub fn is_registered(&self, name: &str) -> LedgerResult<bool> {
        let registry = self.cf(DATABASES_DB_NAME)?;
        Ok(self.db.get_cf(&registry, name.as_bytes())?.is_some())
    }

    /// Reads a key; absent (or tombstoned) keys return `None`.
    pub fn get(&self, db_name: &str, key: &str) -> LedgerResult<Option<(Vec<u8>, Metadata)>> {
        let cf = self.cf(db_name)?;
        match self.db.get_cf(&cf, key.as_bytes())? {
            Some(raw) => {
                let stored: VersionedValue = bincode::deserialize(&raw)?;
                Ok(Some((stored.value, stored.metadata)))
            }
            None => Ok(None),
        }
    }

    /// Applies all updates and the new height as one atomic batch. After it
    /// returns, `height()` observes `height` and every write is durable.
    pub fn commit(&self, updates: &[DbUpdates], height: u64) -> LedgerResult<()> {
        let mut batch = WriteBatch::default();
        for update in updates {
            let cf = self.cf(&update.db_name)?;
            for write in &update.writes {
                match &write.value {
                    Some(value) => {
                        let stored = VersionedValue {
                            value: value.clone(),
                            metadata: write.metadata.clone(),
                        };
                        batch.put_cf(&cf, write.key.as_bytes(), bincode::serialize(&stored)?);
                    }
                    None => batch.delete_cf(&cf, write.key.as_bytes()),
                }
            }
        }
        batch.put_cf(&self.cf(CF_METADATA)?, HEIGHT_KEY, height.to_be_bytes());
        self.db.write(batch)?;
        Ok(())
    }

    /// Greatest block number whose effects are durable here; 0 when none.
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
