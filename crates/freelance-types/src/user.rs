use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Backend primary key for a user account.
pub type UserId = u64;

/// An authenticated marketplace account, as returned by `/auth/me/` and the
/// login/register endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub user_type: UserType,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub profile: Option<UserProfile>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl User {
    /// Name shown in greetings and listings.
    ///
    /// Falls back from the profile display name to "first last" to the username.
    pub fn display_name(&self) -> String {
        if let Some(name) = self
            .profile
            .as_ref()
            .map(|p| p.display_name.trim())
            .filter(|n| !n.is_empty())
        {
            return name.to_string();
        }
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    /// Avatar URL, preferring the profile picture over the account one.
    pub fn avatar_url(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .and_then(|p| p.avatar.as_deref())
            .or(self.avatar.as_deref())
    }

    pub fn is_freelancer(&self) -> bool {
        self.user_type == UserType::Freelancer
    }

    pub fn is_client(&self) -> bool {
        self.user_type == UserType::Client
    }

    pub fn is_admin(&self) -> bool {
        self.user_type == UserType::Admin
    }

    /// Coarse role-based permission check.
    ///
    /// Admins hold every permission. Freelancers may manage services and
    /// deliver orders; clients may place orders. Inactive accounts hold none.
    pub fn has_permission(&self, permission: &str) -> bool {
        if !self.is_active {
            return false;
        }
        match self.user_type {
            UserType::Admin => true,
            UserType::Freelancer => matches!(
                permission,
                "service.create" | "service.update" | "service.delete" | "order.deliver" | "order.view"
            ),
            UserType::Client => matches!(
                permission,
                "order.create" | "order.cancel" | "order.complete" | "order.view"
            ),
        }
    }

    /// Whether the profile carries the fields buyers expect to see.
    pub fn is_profile_complete(&self) -> bool {
        let Some(profile) = &self.profile else {
            return false;
        };
        let has_basics = !self.first_name.is_empty()
            && !self.last_name.is_empty()
            && !profile.display_name.is_empty();
        if self.is_freelancer() {
            has_basics && !profile.skills.is_empty() && profile.bio.is_some()
        } else {
            has_basics
        }
    }

    /// Shallow merge: every field present in the patch replaces the current one.
    pub fn apply_patch(&mut self, patch: UserPatch) {
        if let Some(v) = patch.username {
            self.username = v;
        }
        if let Some(v) = patch.email {
            self.email = v;
        }
        if let Some(v) = patch.first_name {
            self.first_name = v;
        }
        if let Some(v) = patch.last_name {
            self.last_name = v;
        }
        if let Some(v) = patch.phone {
            self.phone = Some(v);
        }
        if let Some(v) = patch.avatar {
            self.avatar = Some(v);
        }
        if let Some(v) = patch.bio {
            self.bio = Some(v);
        }
        if let Some(v) = patch.is_verified {
            self.is_verified = v;
        }
        if let Some(v) = patch.profile {
            self.profile = Some(v);
        }
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    #[default]
    Client,
    Freelancer,
    Admin,
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserType::Client => write!(f, "client"),
            UserType::Freelancer => write!(f, "freelancer"),
            UserType::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "client" => Ok(UserType::Client),
            "freelancer" => Ok(UserType::Freelancer),
            "admin" => Ok(UserType::Admin),
            other => Err(format!("invalid user type: '{other}'")),
        }
    }
}

/// Public-facing profile attached to an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UserProfile {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub hourly_rate: Option<f64>,
    #[serde(default)]
    pub availability: bool,
    #[serde(default)]
    pub completed_projects: Option<u32>,
    #[serde(default)]
    pub average_rating: Option<f64>,
}

/// Partial user update. Absent fields are left untouched.
///
/// Used both for local merges (`AuthStore::update_user`) and as the body of
/// `PATCH /auth/profile/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
}
