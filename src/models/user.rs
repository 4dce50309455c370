use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Customer => f.write_str("customer"),
            Role::Admin => f.write_str("admin"),
        }
    }
}

/// A registered account. Never serialized directly; clients see
/// `PublicUser`.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    /// Always stored lower-cased.
    pub email: String,
    /// bcrypt hash, never the plaintext.
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What we expose to the frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            email: u.email.clone(),
            name: u.name.clone(),
            role: u.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_view_drops_the_hash() {
        let now = Utc::now();
        let user = User {
            id: "u1".into(),
            email: "ada@example.com".into(),
            password_hash: "$2b$04$abcdefghijklmnopqrstuv".into(),
            name: "Ada".into(),
            role: Role::Customer,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(PublicUser::from(&user)).unwrap();
        assert_eq!(json["role"], "customer");
        assert_eq!(json["email"], "ada@example.com");
        assert!(json.get("password").is_none());
        assert!(!json.to_string().contains("$2b$"));
    }
}
