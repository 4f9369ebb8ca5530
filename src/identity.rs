use std::sync::Arc;

use crate::errors::LedgerResult;
use crate::types::{AccessLevel, Metadata, User};
use crate::worldstate::{WorldState, USERS_DB_NAME};

/// Namespace prefix under which user records live in the `users` sub-store.
pub const USER_NAMESPACE: &str = "u";

pub fn user_key(id: &str) -> String {
    format!("{USER_NAMESPACE}{id}")
}

/// Read-only view over the `users` sub-store. Pure with respect to the
/// underlying store snapshot; validators query it while the committer is the
/// only writer.
#[derive(Clone)]
pub struct IdentityQuerier {
    worldstate: Arc<WorldState>,
}

impl IdentityQuerier {
    pub fn new(worldstate: Arc<WorldState>) -> Self {
        Self { worldstate }
    }

    pub fn user_exists(&self, id: &str) -> LedgerResult<bool> {
        Ok(self.get_user(id)?.is_some())
    }

    pub fn get_user(&self, id: &str) -> LedgerResult<Option<(User, Metadata)>> {
        match self.worldstate.get(USERS_DB_NAME, &user_key(id))? {
            Some((raw, metadata)) => {
                let user: User = bincode::deserialize(&raw)?;
                Ok(Some((user, metadata)))
            }
            None => Ok(None),
        }
    }

    pub fn certificate(&self, id: &str) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.get_user(id)?.map(|(user, _)| user.certificate))
    }

    /// Whether `id` holds at least `required` access on `db_name`.
    /// `ReadWrite` subsumes `Read`.
    pub fn has_db_permission(
        &self,
        id: &str,
        db_name: &str,
        required: AccessLevel,
    ) -> LedgerResult<bool> {
        let Some((user, _)) = self.get_user(id)? else {
            return Ok(false);
        };
        match user.privilege.db_permission.get(db_name) {
            Some(AccessLevel::ReadWrite) => Ok(true),
            Some(AccessLevel::Read) => Ok(required == AccessLevel::Read),
            None => Ok(false),
        }
    }

    pub fn is_cluster_admin(&self, id: &str) -> LedgerResult<bool> {
        Ok(self
            .get_user(id)?
            .map(|(user, _)| user.privilege.cluster_admin)
            .unwrap_or(false))
    }

    pub fn is_db_admin(&self, id: &str) -> LedgerResult<bool> {
        Ok(self
            .get_user(id)?
            .map(|(user, _)| user.privilege.db_admin)
            .unwrap_or(false))
    }

    pub fn is_user_admin(&self, id: &str) -> LedgerResult<bool> {
        Ok(self
            .get_user(id)?
            .map(|(user, _)| user.privilege.user_admin)
            .unwrap_or(false))
    }
}
