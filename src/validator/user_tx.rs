use std::collections::HashSet;
use std::sync::Arc;

use crate::crypto;
use crate::errors::LedgerResult;
use crate::identity::IdentityQuerier;
use crate::types::{Flag, User, UserTxEnvelope, ValidationInfo};
use crate::worldstate::WorldState;

/// Validates user-administration transactions: only user admins may submit
/// them, creations must not collide with existing ids, updates and deletions
/// must reference existing ids, and every written certificate must parse.
/// Any failing entry invalidates the whole transaction.
pub(crate) struct UserTxValidator {
    identity: IdentityQuerier,
}

impl UserTxValidator {
    pub(crate) fn new(worldstate: Arc<WorldState>) -> Self {
        Self {
            identity: IdentityQuerier::new(worldstate),
        }
    }

    pub(crate) fn validate(&self, envelope: &UserTxEnvelope) -> LedgerResult<ValidationInfo> {
        Ok(ValidationInfo::new(self.verdict(envelope)?))
    }

    fn verdict(&self, envelope: &UserTxEnvelope) -> LedgerResult<Flag> {
        let tx = &envelope.payload;

        let Some((submitter, _)) = self.identity.get_user(&tx.user_id)? else {
            return Ok(Flag::InvalidUnauthorizedUser);
        };
        let Ok(public_key) = crypto::certificate_public_key(&submitter.certificate) else {
            return Ok(Flag::InvalidSignature);
        };
        if crypto::verify_signature(&public_key, &tx.canonical_bytes(), &envelope.signature)
            .is_err()
        {
            return Ok(Flag::InvalidSignature);
        }
        if !submitter.privilege.user_admin {
            return Ok(Flag::InvalidNoPermission);
        }

        let mut touched: HashSet<&str> = HashSet::new();
        for entry in tx.user_creates.iter().chain(&tx.user_updates) {
            if !entry_is_well_formed(entry, &mut touched) {
                return Ok(Flag::InvalidMalformed);
            }
        }
        for id in &tx.user_deletes {
            if id.is_empty() || !touched.insert(id.as_str()) {
                return Ok(Flag::InvalidMalformed);
            }
        }

        for entry in &tx.user_creates {
            if self.identity.user_exists(&entry.id)? {
                return Ok(Flag::InvalidMalformed);
            }
        }
        for entry in &tx.user_updates {
            if !self.identity.user_exists(&entry.id)? {
                return Ok(Flag::InvalidMalformed);
            }
        }
        for id in &tx.user_deletes {
            if !self.identity.user_exists(id)? {
                return Ok(Flag::InvalidMalformed);
            }
        }

        Ok(Flag::Valid)
    }
}

fn entry_is_well_formed<'a>(entry: &'a User, touched: &mut HashSet<&'a str>) -> bool {
    !entry.id.is_empty()
        && touched.insert(entry.id.as_str())
        && crypto::parse_certificate(&entry.certificate).is_ok()
}
