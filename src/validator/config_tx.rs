use std::collections::HashSet;
use std::sync::Arc;

use crate::crypto;
use crate::errors::LedgerResult;
use crate::identity::IdentityQuerier;
use crate::types::{ConfigTxEnvelope, Flag, ValidationInfo};
use crate::worldstate::{WorldState, CONFIG_DB_NAME, CONFIG_KEY};

/// Validates cluster-configuration transactions. Once a configuration is
/// committed only cluster admins may replace it; the very first
/// configuration (the genesis block) is accepted from any submitter because
/// no identity exists yet to authorize against.
pub(crate) struct ConfigTxValidator {
    worldstate: Arc<WorldState>,
    identity: IdentityQuerier,
}

impl ConfigTxValidator {
    pub(crate) fn new(worldstate: Arc<WorldState>) -> Self {
        Self {
            identity: IdentityQuerier::new(worldstate.clone()),
            worldstate,
        }
    }

    pub(crate) fn validate(&self, envelope: &ConfigTxEnvelope) -> LedgerResult<ValidationInfo> {
        Ok(ValidationInfo::new(self.verdict(envelope)?))
    }

    fn verdict(&self, envelope: &ConfigTxEnvelope) -> LedgerResult<Flag> {
        let tx = &envelope.payload;
        let committed = self.worldstate.get(CONFIG_DB_NAME, CONFIG_KEY)?;

        if committed.is_some() {
            let Some((submitter, _)) = self.identity.get_user(&tx.user_id)? else {
                return Ok(Flag::InvalidUnauthorizedUser);
            };
            if !submitter.privilege.cluster_admin {
                return Ok(Flag::InvalidNoPermission);
            }
            let Ok(public_key) = crypto::certificate_public_key(&submitter.certificate) else {
                return Ok(Flag::InvalidSignature);
            };
            if crypto::verify_signature(&public_key, &tx.canonical_bytes(), &envelope.signature)
                .is_err()
            {
                return Ok(Flag::InvalidSignature);
            }
        }

        let committed_version = committed.map(|(_, metadata)| metadata.version);
        if tx.read_old_config_version != committed_version {
            return Ok(Flag::InvalidMvccConflict);
        }

        let config = &tx.new_config;
        if config.admins.is_empty() || config.nodes.is_empty() {
            return Ok(Flag::InvalidMalformed);
        }

        let mut admin_ids = HashSet::new();
        for admin in &config.admins {
            if admin.id.is_empty() || !admin_ids.insert(admin.id.as_str()) {
                return Ok(Flag::InvalidMalformed);
            }
            if crypto::parse_certificate(&admin.certificate).is_err() {
                return Ok(Flag::InvalidMalformed);
            }
        }

        let mut node_ids = HashSet::new();
        for node in &config.nodes {
            if node.id.is_empty() || !node_ids.insert(node.id.as_str()) {
                return Ok(Flag::InvalidMalformed);
            }
            if crypto::parse_certificate(&node.certificate).is_err() {
                return Ok(Flag::InvalidMalformed);
            }
        }

        Ok(Flag::Valid)
    }
}
