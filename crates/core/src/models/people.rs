use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instructor {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub name: String,
}

/// Billing records live outside the engine; only the owning customer matters here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub customer_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserType {
    Customer,
    Instructor,
    Admin,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Customer => "customer",
            UserType::Instructor => "instructor",
            UserType::Admin => "admin",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(UserType::Customer),
            "instructor" => Ok(UserType::Instructor),
            "admin" => Ok(UserType::Admin),
            other => Err(format!("Unknown user type: {other}")),
        }
    }
}

/// Resolved session handed in by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: Uuid,
    pub user_type: UserType,
}

impl Identity {
    pub fn customer(user_id: Uuid) -> Self {
        Self { user_id, user_type: UserType::Customer }
    }

    pub fn instructor(user_id: Uuid) -> Self {
        Self { user_id, user_type: UserType::Instructor }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self { user_id, user_type: UserType::Admin }
    }
}
