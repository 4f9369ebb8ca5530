#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ed25519_dalek::Keypair;
use tempfile::{tempdir, TempDir};

use ledgerdb::blockstore::BlockStore;
use ledgerdb::crypto;
use ledgerdb::identity::{user_key, IdentityQuerier};
use ledgerdb::processor::{BlockProcessor, ProcessorConfig, ProcessorHandle};
use ledgerdb::queue::BlockQueue;
use ledgerdb::types::{
    AccessLevel, AdminEntry, Block, ClusterConfig, ConfigTx, ConfigTxEnvelope, DataRead, DataTx,
    DataTxEnvelope, DataWrite, Metadata, NodeEntry, Payload, Privilege, User, UserTx,
    UserTxEnvelope, Version,
};
use ledgerdb::worldstate::{DbUpdates, KvWrite, WorldState, DEFAULT_DB_NAME, USERS_DB_NAME};

pub const BLOCK_QUEUE_CAPACITY: usize = 10;

/// A test user: a signing key plus a self-signed certificate carrying its
/// public key, as a client enrollment would produce.
pub struct TestIdentity {
    pub id: String,
    pub keypair: Keypair,
    pub certificate: Vec<u8>,
}

/// PKCS#8 v1 header for an Ed25519 private key; the raw 32-byte seed follows
/// it directly.
const PKCS8_ED25519_PREFIX: [u8; 16] = [
    0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20,
];

pub fn generate_identity(id: &str) -> TestIdentity {
    let keypair = crypto::generate_keypair();
    let certificate = self_signed_certificate(id, &keypair);
    TestIdentity {
        id: id.to_string(),
        keypair,
        certificate,
    }
}

fn self_signed_certificate(common_name: &str, keypair: &Keypair) -> Vec<u8> {
    let mut pkcs8 = PKCS8_ED25519_PREFIX.to_vec();
    pkcs8.extend_from_slice(keypair.secret.as_bytes());
    let key = rcgen::KeyPair::from_der(&pkcs8).expect("ed25519 key");
    let mut params = rcgen::CertificateParams::new(vec![common_name.to_string()]);
    params.alg = &rcgen::PKCS_ED25519;
    params.key_pair = Some(key);
    rcgen::Certificate::from_params(params)
        .expect("self-signed certificate")
        .serialize_der()
        .expect("der certificate")
}

pub struct TestEnv {
    pub dir: TempDir,
    pub queue: Arc<BlockQueue>,
    pub block_store: Arc<BlockStore>,
    pub worldstate: Arc<WorldState>,
    pub identity: IdentityQuerier,
    pub admin: TestIdentity,
    pub user: TestIdentity,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempdir().expect("tempdir");
        let block_store =
            Arc::new(BlockStore::open(&dir.path().join("blockstore")).expect("open block store"));
        let worldstate =
            Arc::new(WorldState::open(&dir.path().join("worldstate")).expect("open world state"));
        let identity = IdentityQuerier::new(worldstate.clone());
        Self {
            dir,
            queue: Arc::new(BlockQueue::new(BLOCK_QUEUE_CAPACITY)),
            block_store,
            worldstate,
            identity,
            admin: generate_identity("admin1"),
            user: generate_identity("testUser"),
        }
    }

    /// Spawns a processor over the shared stores. Each call uses a fresh
    /// queue, matching the restart contract.
    pub fn start_processor(&mut self) -> ProcessorHandle {
        self.queue = Arc::new(BlockQueue::new(BLOCK_QUEUE_CAPACITY));
        BlockProcessor::new(ProcessorConfig {
            block_queue: self.queue.clone(),
            block_store: self.block_store.clone(),
            worldstate: self.worldstate.clone(),
        })
        .start()
        .expect("start block processor")
    }

    /// Builds a processor without spawning it, for driving `run` directly.
    pub fn processor(&mut self) -> BlockProcessor {
        self.queue = Arc::new(BlockQueue::new(BLOCK_QUEUE_CAPACITY));
        BlockProcessor::new(ProcessorConfig {
            block_queue: self.queue.clone(),
            block_store: self.block_store.clone(),
            worldstate: self.worldstate.clone(),
        })
    }

    /// Commits the genesis configuration block through the processor and
    /// enrolls `testUser` with read-write access to the default database,
    /// mirroring a fresh cluster bootstrap.
    pub fn bootstrap(&self, handle: &ProcessorHandle) {
        assert!(handle.enqueue(self.genesis_block()));
        let identity = self.identity.clone();
        assert!(
            eventually(Duration::from_secs(2), || {
                identity.user_exists("admin1").unwrap_or(false)
            }),
            "genesis configuration was not committed in time"
        );

        let user = User::new(
            self.user.id.clone(),
            self.user.certificate.clone(),
            read_write_privilege(DEFAULT_DB_NAME),
        );
        seed_user(&self.worldstate, &user, Version::new(1, 1));
        assert!(self.identity.user_exists(&self.user.id).expect("query"));
    }

    pub fn genesis_block(&self) -> Block {
        let new_config = ClusterConfig {
            nodes: vec![NodeEntry {
                id: "node1".to_string(),
                address: "127.0.0.1".to_string(),
                port: 6001,
                certificate: self.admin.certificate.clone(),
            }],
            admins: vec![AdminEntry {
                id: self.admin.id.clone(),
                certificate: self.admin.certificate.clone(),
            }],
        };
        // The bootstrap transaction needs no prior identity: any submitter
        // is accepted for the first configuration, unsigned.
        Block::new(
            1,
            Payload::ConfigTx(ConfigTxEnvelope {
                payload: ConfigTx {
                    user_id: "adminUser".to_string(),
                    read_old_config_version: None,
                    new_config,
                },
                signature: Vec::new(),
            }),
        )
    }
}

pub fn read_write_privilege(db_name: &str) -> Privilege {
    let mut db_permission = BTreeMap::new();
    db_permission.insert(db_name.to_string(), AccessLevel::ReadWrite);
    Privilege {
        db_permission,
        ..Privilege::default()
    }
}

pub fn read_privilege(db_name: &str) -> Privilege {
    let mut db_permission = BTreeMap::new();
    db_permission.insert(db_name.to_string(), AccessLevel::Read);
    Privilege {
        db_permission,
        ..Privilege::default()
    }
}

/// Writes a user record straight into the `users` sub-store, bypassing the
/// transaction path, the way an enrollment fixture would.
pub fn seed_user(worldstate: &WorldState, user: &User, version: Version) {
    let updates = vec![DbUpdates {
        db_name: USERS_DB_NAME.to_string(),
        writes: vec![KvWrite {
            key: user_key(&user.id),
            value: Some(bincode::serialize(user).expect("serialize user")),
            metadata: Metadata { version },
        }],
    }];
    worldstate
        .commit(&updates, version.block_num)
        .expect("seed user");
}

pub fn signed_data_tx(
    identity: &TestIdentity,
    db_name: &str,
    reads: Vec<DataRead>,
    writes: Vec<DataWrite>,
) -> DataTxEnvelope {
    let payload = DataTx {
        user_id: identity.id.clone(),
        db_name: db_name.to_string(),
        reads,
        writes,
    };
    let signature = crypto::sign_message(&identity.keypair, &payload.canonical_bytes())
        .to_bytes()
        .to_vec();
    DataTxEnvelope { payload, signature }
}

pub fn signed_config_tx(
    identity: &TestIdentity,
    read_old_config_version: Option<Version>,
    new_config: ClusterConfig,
) -> ConfigTxEnvelope {
    let payload = ConfigTx {
        user_id: identity.id.clone(),
        read_old_config_version,
        new_config,
    };
    let signature = crypto::sign_message(&identity.keypair, &payload.canonical_bytes())
        .to_bytes()
        .to_vec();
    ConfigTxEnvelope { payload, signature }
}

pub fn signed_user_tx(
    identity: &TestIdentity,
    user_creates: Vec<User>,
    user_updates: Vec<User>,
    user_deletes: Vec<String>,
) -> UserTxEnvelope {
    let payload = UserTx {
        user_id: identity.id.clone(),
        user_creates,
        user_updates,
        user_deletes,
    };
    let signature = crypto::sign_message(&identity.keypair, &payload.canonical_bytes())
        .to_bytes()
        .to_vec();
    UserTxEnvelope { payload, signature }
}

/// One data transaction writing `key = value` into the default database,
/// wrapped in a block.
pub fn sample_data_block(number: u64, identity: &TestIdentity, key: &str, value: &[u8]) -> Block {
    Block::new(
        number,
        Payload::DataTxs(vec![signed_data_tx(
            identity,
            DEFAULT_DB_NAME,
            Vec::new(),
            vec![DataWrite::put(key, value.to_vec())],
        )]),
    )
}

pub fn header_hash(block: &Block) -> Vec<u8> {
    crypto::sha256(&block.header_bytes())
}

/// What a block creator would attach to block `number`: hashes of the
/// committed headers at distances 1, B, B², ... behind it.
pub fn skipchain_hashes(block_store: &BlockStore, number: u64) -> Vec<Vec<u8>> {
    let mut hashes = Vec::new();
    let prior = number - 1;
    let mut distance = 1;
    while prior % distance == 0 && distance <= prior {
        let hash = block_store
            .get_hash(number - distance)
            .expect("get hash")
            .expect("hash present");
        hashes.push(hash);
        distance *= ledgerdb::blockstore::SKIP_LIST_BASE;
    }
    hashes
}

/// Polls `condition` until it holds or `timeout` elapses.
pub fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    condition()
}
