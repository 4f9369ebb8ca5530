use std::sync::Arc;

use tracing::{debug, info};

use crate::blockstore::BlockStore;
use crate::committer::Committer;
use crate::errors::{LedgerError, LedgerResult};
use crate::worldstate::WorldState;

/// Reconciles the block store and the state database after a restart. The
/// only divergence a crash can produce is the block store being exactly one
/// block ahead (a commit interrupted between the two stores); that block is
/// replayed from its persisted validation info. Anything else is beyond
/// repair.
pub struct Recoverer {
    block_store: Arc<BlockStore>,
    worldstate: Arc<WorldState>,
    committer: Committer,
}

impl Recoverer {
    pub fn new(
        block_store: Arc<BlockStore>,
        worldstate: Arc<WorldState>,
        committer: Committer,
    ) -> Self {
        Self {
            block_store,
            worldstate,
            committer,
        }
    }

    /// Idempotent: once the heights agree, further calls are no-ops.
    pub fn recover(&self) -> LedgerResult<()> {
        let block_store_height = self.block_store.height()?;
        let state_height = self.worldstate.height()?;

        if block_store_height == state_height {
            debug!(height = state_height, "stores agree, nothing to recover");
            return Ok(());
        }

        if block_store_height == state_height + 1 {
            info!(
                number = block_store_height,
                "replaying last block into the state database"
            );
            let block = self
                .block_store
                .get(block_store_height)?
                .ok_or(LedgerError::BlockNotFound(block_store_height))?;
            return self.committer.commit_to_state_db(&block);
        }

        if block_store_height < state_height {
            return Err(LedgerError::StateAheadOfBlockStore {
                state_db: state_height,
                block_store: block_store_height,
            });
        }

        Err(LedgerError::RecoveryGapTooLarge {
            block_store: block_store_height,
            state_db: state_height,
        })
    }
}
