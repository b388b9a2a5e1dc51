use serde::{Deserialize, Deserializer, Serialize};

use crate::role::Role;

pub mod db;

pub static USER_COLLECTION_NAME: &str = "users";

/// Stored part of a user, keyed by the provider uid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default, deserialize_with = "nullable_role")]
    pub role: Role,
}

/// Stored `null` roles read as [Role::Unassigned].
fn nullable_role<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    let role = Option::<String>::deserialize(deserializer)?;
    Ok(role.map(Role::from).unwrap_or_default())
}

impl UserRecord {
    pub fn new(role: Role) -> UserRecord {
        UserRecord { role }
    }
}
