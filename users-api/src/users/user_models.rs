use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::users::user_source::UserError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(
        rename = "createdAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of a create request. Fields are optional so that missing values get
/// our own validation message instead of a deserialization rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidNewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl NewUser {
    pub fn validate(self) -> Result<ValidNewUser, UserError> {
        match (non_blank(self.name), non_blank(self.email)) {
            (Some(name), Some(email)) => Ok(ValidNewUser {
                name,
                email,
                role: self.role.unwrap_or_default(),
            }),
            _ => Err(UserError::MissingFields),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl UpdateUser {
    pub fn apply(self, user: &mut User) {
        if let Some(name) = non_blank(self.name) {
            user.name = name;
        }
        if let Some(email) = non_blank(self.email) {
            user.email = email;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
