//! Per-block validation: each inbound block is dispatched to the validator
//! for its payload type, producing one verdict per transaction. Only the
//! verdicts decide what the committer later applies; an invalid transaction
//! never blocks the rest of its block.

mod config_tx;
mod data_tx;
mod user_tx;

use std::sync::Arc;

use crate::errors::{LedgerError, LedgerResult};
use crate::types::{Block, Payload};
use crate::worldstate::WorldState;

use config_tx::ConfigTxValidator;
use data_tx::DataTxValidator;
use user_tx::UserTxValidator;

pub struct BlockValidator {
    worldstate: Arc<WorldState>,
    data_tx: DataTxValidator,
    config_tx: ConfigTxValidator,
    user_tx: UserTxValidator,
}

impl BlockValidator {
    pub fn new(worldstate: Arc<WorldState>) -> Self {
        Self {
            data_tx: DataTxValidator::new(worldstate.clone()),
            config_tx: ConfigTxValidator::new(worldstate.clone()),
            user_tx: UserTxValidator::new(worldstate.clone()),
            worldstate,
        }
    }

    /// Validates the block and fills its `validation_info` in place. Fails
    /// terminally when the block number does not extend the committed state
    /// or the payload carries no transactions.
    pub fn validate(&self, block: &mut Block) -> LedgerResult<()> {
        let expected = self.worldstate.height()? + 1;
        let received = block.number();
        if received != expected {
            return Err(LedgerError::UnexpectedBlockNumber { expected, received });
        }

        let validation_info = match &block.payload {
            Payload::DataTxs(envelopes) => {
                if envelopes.is_empty() {
                    return Err(LedgerError::MalformedBlock {
                        number: received,
                        reason: "block carries no transactions".to_string(),
                    });
                }
                self.data_tx.validate(envelopes)?
            }
            Payload::ConfigTx(envelope) => vec![self.config_tx.validate(envelope)?],
            Payload::UserTx(envelope) => vec![self.user_tx.validate(envelope)?],
        };

        block.header.validation_info = validation_info;
        Ok(())
    }
}
