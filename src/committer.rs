use std::sync::Arc;

use tracing::debug;

use crate::blockstore::BlockStore;
use crate::errors::LedgerResult;
use crate::identity::user_key;
use crate::types::{Block, ClusterConfig, Flag, Metadata, Payload, Privilege, User};
use crate::worldstate::{DbUpdates, KvWrite, WorldState, CONFIG_DB_NAME, CONFIG_KEY, USERS_DB_NAME};

/// Namespace prefix for per-node registry entries in the `config` sub-store.
pub(crate) const NODE_NAMESPACE: &str = "node:";

fn node_key(id: &str) -> String {
    format!("{NODE_NAMESPACE}{id}")
}

/// Writes a validated block to the block store and its derived state
/// mutations to the world state, in that order. The order is the only legal
/// one: recovery replays state from blocks, it cannot reconstruct blocks
/// from state.
#[derive(Clone)]
pub struct Committer {
    block_store: Arc<BlockStore>,
    worldstate: Arc<WorldState>,
}

impl Committer {
    pub fn new(block_store: Arc<BlockStore>, worldstate: Arc<WorldState>) -> Self {
        Self {
            block_store,
            worldstate,
        }
    }

    pub fn commit_block(&self, block: &Block) -> LedgerResult<()> {
        self.commit_to_block_store(block)?;
        self.commit_to_state_db(block)
    }

    pub(crate) fn commit_to_block_store(&self, block: &Block) -> LedgerResult<()> {
        self.block_store.commit(block)?;
        debug!(number = block.number(), "block appended to block store");
        Ok(())
    }

    pub(crate) fn commit_to_state_db(&self, block: &Block) -> LedgerResult<()> {
        let updates = self.construct_db_updates(block)?;
        self.worldstate.commit(&updates, block.number())?;
        debug!(number = block.number(), "state mutations committed");
        Ok(())
    }

    fn construct_db_updates(&self, block: &Block) -> LedgerResult<Vec<DbUpdates>> {
        let height = block.number();
        let verdicts = &block.header.validation_info;
        let mut updates: Vec<DbUpdates> = Vec::new();

        match &block.payload {
            Payload::DataTxs(envelopes) => {
                for (tx_num, envelope) in envelopes.iter().enumerate() {
                    if verdicts.get(tx_num).map(|v| v.flag) != Some(Flag::Valid) {
                        continue;
                    }
                    let metadata = Metadata::at(height, tx_num as u64);
                    for write in &envelope.payload.writes {
                        let value = (!write.is_delete).then(|| write.value.clone());
                        push_write(
                            &mut updates,
                            &envelope.payload.db_name,
                            KvWrite {
                                key: write.key.clone(),
                                value,
                                metadata: metadata.clone(),
                            },
                        );
                    }
                }
            }
            Payload::ConfigTx(envelope) => {
                if verdicts.first().map(|v| v.flag) == Some(Flag::Valid) {
                    self.construct_config_updates(
                        &envelope.payload.new_config,
                        height,
                        &mut updates,
                    )?;
                }
            }
            Payload::UserTx(envelope) => {
                if verdicts.first().map(|v| v.flag) == Some(Flag::Valid) {
                    let metadata = Metadata::at(height, 0);
                    let tx = &envelope.payload;
                    for user in tx.user_creates.iter().chain(&tx.user_updates) {
                        push_write(
                            &mut updates,
                            USERS_DB_NAME,
                            KvWrite {
                                key: user_key(&user.id),
                                value: Some(bincode::serialize(user)?),
                                metadata: metadata.clone(),
                            },
                        );
                    }
                    for id in &tx.user_deletes {
                        push_write(
                            &mut updates,
                            USERS_DB_NAME,
                            KvWrite {
                                key: user_key(id),
                                value: None,
                                metadata: metadata.clone(),
                            },
                        );
                    }
                }
            }
        }

        Ok(updates)
    }

    /// A valid config transaction replaces the configuration entry, rewrites
    /// the node registry, and materializes the admin set as user records so
    /// that identity queries see them from the next block on.
    fn construct_config_updates(
        &self,
        new_config: &ClusterConfig,
        height: u64,
        updates: &mut Vec<DbUpdates>,
    ) -> LedgerResult<()> {
        let metadata = Metadata::at(height, 0);
        let previous: Option<ClusterConfig> = self
            .worldstate
            .get(CONFIG_DB_NAME, CONFIG_KEY)?
            .map(|(raw, _)| bincode::deserialize(&raw))
            .transpose()?;

        push_write(
            updates,
            CONFIG_DB_NAME,
            KvWrite {
                key: CONFIG_KEY.to_string(),
                value: Some(bincode::serialize(new_config)?),
                metadata: metadata.clone(),
            },
        );

        for node in &new_config.nodes {
            push_write(
                updates,
                CONFIG_DB_NAME,
                KvWrite {
                    key: node_key(&node.id),
                    value: Some(bincode::serialize(node)?),
                    metadata: metadata.clone(),
                },
            );
        }

        for admin in &new_config.admins {
            let user = User::new(
                admin.id.clone(),
                admin.certificate.clone(),
                Privilege {
                    cluster_admin: true,
                    ..Privilege::default()
                },
            );
            push_write(
                updates,
                USERS_DB_NAME,
                KvWrite {
                    key: user_key(&admin.id),
                    value: Some(bincode::serialize(&user)?),
                    metadata: metadata.clone(),
                },
            );
        }

        if let Some(previous) = previous {
            for node in &previous.nodes {
                if !new_config.nodes.iter().any(|n| n.id == node.id) {
                    push_write(
                        updates,
                        CONFIG_DB_NAME,
                        KvWrite {
                            key: node_key(&node.id),
                            value: None,
                            metadata: metadata.clone(),
                        },
                    );
                }
            }
            for admin in &previous.admins {
                if !new_config.admins.iter().any(|a| a.id == admin.id) {
                    push_write(
                        updates,
                        USERS_DB_NAME,
                        KvWrite {
                            key: user_key(&admin.id),
                            value: None,
                            metadata: metadata.clone(),
                        },
                    );
                }
            }
        }

        Ok(())
    }
}

fn push_write(updates: &mut Vec<DbUpdates>, db_name: &str, write: KvWrite) {
    match updates.iter_mut().find(|u| u.db_name == db_name) {
        Some(existing) => existing.writes.push(write),
        None => updates.push(DbUpdates {
            db_name: db_name.to_string(),
            writes: vec![write],
        }),
    }
}
