//! Core types for faculty-core

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Faculty role catalogue.
///
/// The stored names (`ADMIN`, `TRUONG_KHOA`, ...) are what the `roles` table
/// holds and what clients see in `roleName`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "TRUONG_KHOA")]
    DepartmentHead,
    #[serde(rename = "PHO_KHOA")]
    DeputyHead,
    #[serde(rename = "TRUONG_BO_MON")]
    SubjectHead,
    #[serde(rename = "GIANG_VIEN")]
    Lecturer,
    #[serde(rename = "GIAO_VU")]
    AcademicAffairs,
    #[serde(rename = "SINH_VIEN")]
    Student,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Admin,
        Role::DepartmentHead,
        Role::DeputyHead,
        Role::SubjectHead,
        Role::Lecturer,
        Role::AcademicAffairs,
        Role::Student,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::DepartmentHead => "TRUONG_KHOA",
            Role::DeputyHead => "PHO_KHOA",
            Role::SubjectHead => "TRUONG_BO_MON",
            Role::Lecturer => "GIANG_VIEN",
            Role::AcademicAffairs => "GIAO_VU",
            Role::Student => "SINH_VIEN",
        }
    }

    /// Authority tag granted to a principal holding this role.
    pub fn authority(&self) -> &'static str {
        match self {
            Role::Admin => "ROLE_ADMIN",
            Role::DepartmentHead => "ROLE_TRUONG_KHOA",
            Role::DeputyHead => "ROLE_PHO_KHOA",
            Role::SubjectHead => "ROLE_TRUONG_BO_MON",
            Role::Lecturer => "ROLE_GIANG_VIEN",
            Role::AcademicAffairs => "ROLE_GIAO_VU",
            Role::Student => "ROLE_SINH_VIEN",
        }
    }

    /// Priority rank, 1 is the most privileged.
    pub fn priority(&self) -> u8 {
        match self {
            Role::Admin => 1,
            Role::DepartmentHead => 2,
            Role::DeputyHead | Role::SubjectHead => 3,
            Role::Lecturer => 4,
            Role::AcademicAffairs => 5,
            Role::Student => 6,
        }
    }

    pub fn default_description(&self) -> &'static str {
        match self {
            Role::Admin => "System administrator",
            Role::DepartmentHead => "Head of faculty",
            Role::DeputyHead => "Deputy head of faculty",
            Role::SubjectHead => "Head of subject group",
            Role::Lecturer => "Lecturer",
            Role::AcademicAffairs => "Academic affairs officer",
            Role::Student => "Student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.name() == s)
            .ok_or_else(|| Error::Validation(format!("Unknown role: {}", s)))
    }
}

/// Account as held by the user store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: String,
    pub phone: Option<String>,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub role_description: Option<String>,
    pub active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New account, password already hashed
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub phone: Option<String>,
    pub full_name: String,
    pub role: Role,
    pub active: bool,
}

/// Request to create a new user (plaintext password, admin API)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub phone: Option<String>,
    pub full_name: String,
    pub role_name: Role,
}

/// Partial update of an account; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role_name: Option<Role>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    /// Apply the present fields to `identity`
    pub fn apply_to(&self, identity: &mut Identity) {
        if let Some(email) = &self.email {
            identity.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            identity.phone = Some(phone.clone());
        }
        if let Some(full_name) = &self.full_name {
            identity.full_name = full_name.clone();
        }
        if let Some(avatar_url) = &self.avatar_url {
            identity.avatar_url = Some(avatar_url.clone());
        }
        if let Some(role) = self.role_name {
            identity.role = role;
            identity.role_description = Some(role.default_description().to_string());
        }
        if let Some(active) = self.is_active {
            identity.active = active;
        }
    }
}

/// Filter for listing users
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub active: Option<bool>,
    pub role: Option<Role>,
}

impl UserFilter {
    pub fn matches(&self, identity: &Identity) -> bool {
        self.active.is_none_or(|active| identity.active == active)
            && self.role.is_none_or(|role| identity.role == role)
    }
}

/// Client-facing view of an account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub role_name: String,
    pub role_description: Option<String>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Identity> for UserSummary {
    fn from(identity: &Identity) -> Self {
        Self {
            user_id: identity.id,
            username: identity.username.clone(),
            email: identity.email.clone(),
            phone: identity.phone.clone(),
            full_name: identity.full_name.clone(),
            avatar_url: identity.avatar_url.clone(),
            role_name: identity.role.name().to_string(),
            role_description: identity.role_description.clone(),
            is_active: identity.active,
            last_login: identity.last_login,
            created_at: identity.created_at,
        }
    }
}

/// Entry of the role catalogue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInfo {
    pub role_name: String,
    pub role_description: String,
    pub priority_level: u8,
}

impl From<Role> for RoleInfo {
    fn from(role: Role) -> Self {
        Self {
            role_name: role.name().to_string(),
            role_description: role.default_description().to_string(),
            priority_level: role.priority(),
        }
    }
}
