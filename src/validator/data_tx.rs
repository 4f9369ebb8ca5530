use std::collections::HashSet;
use std::sync::Arc;

use crate::crypto;
use crate::errors::LedgerResult;
use crate::identity::IdentityQuerier;
use crate::types::{AccessLevel, DataTxEnvelope, Flag, ValidationInfo};
use crate::worldstate::{is_system_db, WorldState};

/// Validates data transactions against committed state and against the
/// writes of earlier valid transactions in the same block. Deterministic and
/// order-sensitive: the same block yields the same verdict vector everywhere.
pub(crate) struct DataTxValidator {
    worldstate: Arc<WorldState>,
    identity: IdentityQuerier,
}

impl DataTxValidator {
    pub(crate) fn new(worldstate: Arc<WorldState>) -> Self {
        Self {
            identity: IdentityQuerier::new(worldstate.clone()),
            worldstate,
        }
    }

    pub(crate) fn validate(
        &self,
        envelopes: &[DataTxEnvelope],
    ) -> LedgerResult<Vec<ValidationInfo>> {
        let mut verdicts = Vec::with_capacity(envelopes.len());
        // Keys written by earlier valid transactions in this block.
        let mut written: HashSet<(&str, &str)> = HashSet::new();

        for envelope in envelopes {
            let flag = self.validate_envelope(envelope, &written)?;
            if flag == Flag::Valid {
                for write in &envelope.payload.writes {
                    written.insert((envelope.payload.db_name.as_str(), write.key.as_str()));
                }
            }
            verdicts.push(ValidationInfo::new(flag));
        }
        Ok(verdicts)
    }

    fn validate_envelope(
        &self,
        envelope: &DataTxEnvelope,
        written: &HashSet<(&str, &str)>,
    ) -> LedgerResult<Flag> {
        let tx = &envelope.payload;

        let Some((user, _)) = self.identity.get_user(&tx.user_id)? else {
            return Ok(Flag::InvalidUnauthorizedUser);
        };
        let Ok(public_key) = crypto::certificate_public_key(&user.certificate) else {
            return Ok(Flag::InvalidSignature);
        };
        if crypto::verify_signature(&public_key, &tx.canonical_bytes(), &envelope.signature)
            .is_err()
        {
            return Ok(Flag::InvalidSignature);
        }

        if tx.db_name.is_empty()
            || is_system_db(&tx.db_name)
            || !self.worldstate.is_registered(&tx.db_name)?
        {
            return Ok(Flag::InvalidDbNotExist);
        }

        if !tx.reads.is_empty() || !tx.writes.is_empty() {
            let required = if tx.writes.is_empty() {
                AccessLevel::Read
            } else {
                AccessLevel::ReadWrite
            };
            if !self
                .identity
                .has_db_permission(&tx.user_id, &tx.db_name, required)?
            {
                return Ok(Flag::InvalidNoPermission);
            }
        }

        // MVCC against committed state: every read version must still be
        // current, treating an absent key as version None.
        for read in &tx.reads {
            let committed = self
                .worldstate
                .get(&tx.db_name, &read.key)?
                .map(|(_, metadata)| metadata.version);
            if committed != read.version {
                return Ok(Flag::InvalidMvccConflict);
            }
        }

        // Intra-block MVCC: reading or rewriting a key an earlier valid
        // transaction wrote conflicts; the earlier transaction wins.
        for read in &tx.reads {
            if written.contains(&(tx.db_name.as_str(), read.key.as_str())) {
                return Ok(Flag::InvalidMvccConflict);
            }
        }
        for write in &tx.writes {
            if written.contains(&(tx.db_name.as_str(), write.key.as_str())) {
                return Ok(Flag::InvalidMvccConflict);
            }
        }

        Ok(Flag::Valid)
    }
}
