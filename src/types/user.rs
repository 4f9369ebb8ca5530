use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessLevel {
    Read,
    ReadWrite,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Privilege {
    pub db_permission: BTreeMap<String, AccessLevel>,
    pub db_admin: bool,
    pub cluster_admin: bool,
    pub user_admin: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub certificate: Vec<u8>,
    pub privilege: Privilege,
}

impl User {
    pub fn new(id: impl Into<String>, certificate: impl Into<Vec<u8>>, privilege: Privilege) -> Self {
        Self {
            id: id.into(),
            certificate: certificate.into(),
            privilege,
        }
    }
}
