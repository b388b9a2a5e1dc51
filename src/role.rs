use serde::{Deserialize, Serialize};

pub const UNKNOWN_ROLE: &str = "unknown";

/// Role of a signed in user.
///
/// Role names are open ended and come from the `users` collection. Two values
/// are special: [`Role::Unassigned`] for stored users without a role and
/// [`Role::Unknown`] for users that signed in without ever registering.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Unassigned,
    Unknown,
    Named(String),
}

impl Role {
    pub fn named(name: impl ToString) -> Role {
        Role::from(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Unassigned => "",
            Role::Unknown => UNKNOWN_ROLE,
            Role::Named(name) => name.as_str(),
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Unassigned
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "" => Role::Unassigned,
            UNKNOWN_ROLE => Role::Unknown,
            _ => Role::Named(value),
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        match value {
            Role::Named(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_strings() {
        assert_eq!(Role::from(""), Role::Unassigned);
        assert_eq!(Role::from("unknown"), Role::Unknown);
        assert_eq!(Role::from("teacher"), Role::Named("teacher".to_string()));
        assert_eq!(String::from(Role::named("student")), "student");
        assert_eq!(Role::Unknown.to_string(), "unknown");
        assert_eq!(Role::from(UNKNOWN_ROLE.to_string()), Role::Unknown);
    }

    #[test]
    fn role_serializes_as_plain_string() {
        let json = serde_json::to_string(&Role::named("teacher")).unwrap();
        assert_eq!(json, "\"teacher\"");

        let role: Role = serde_json::from_str("\"\"").unwrap();
        assert_eq!(role, Role::Unassigned);
    }
}
