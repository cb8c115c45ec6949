//! Signed-in user identity.

use crate::messages::string_or_number;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a user within the organisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular staff member.
    #[default]
    Employee,
    /// Team lead with access to team records.
    Manager,
    /// Administrator.
    Admin,
}

impl Role {
    /// Returns true if this role may read team records and approve timesheets.
    pub fn can_manage(&self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }

    /// Returns the wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated user as returned by the login exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Backend user ID; numeric IDs are kept in their decimal form.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Role; users stored without one are employees.
    #[serde(default)]
    pub role: Role,
    /// Display name, when the provider shares one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick_name: Option<String>,
    /// Avatar image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl User {
    /// Creates a user with no profile details.
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            nick_name: None,
            avatar_url: None,
        }
    }
}
