//! Application roles and the resolver that derives a typed user from a session

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::auth::Session;
use crate::error::Error;

/// Placeholder shown when the session carries no first name
pub const FIRST_NAME_PLACEHOLDER: &str = "Prénom";

/// Placeholder shown when the session carries no last name
pub const LAST_NAME_PLACEHOLDER: &str = "Nom";

/// Role of a dashboard user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrator,
    Teacher,
    Student,
    Parent,
}

impl Role {
    /// Every role, in sidebar order
    pub const ALL: [Role; 4] = [Role::Administrator, Role::Teacher, Role::Student, Role::Parent];

    /// Convert the role to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Parent => "parent",
        }
    }

    /// The dashboard a user with this role lands on
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::Administrator => "/dashboard/admin",
            Role::Teacher => "/dashboard/teacher",
            Role::Student => "/dashboard/student",
            Role::Parent => "/dashboard/parent",
        }
    }

    /// Label shown in the dashboard header
    pub fn label(&self) -> &'static str {
        match self {
            Role::Administrator => "Administrateur",
            Role::Teacher => "Enseignant",
            Role::Student => "Étudiant",
            Role::Parent => "Parent",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "administrator" => Ok(Role::Administrator),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            "parent" => Ok(Role::Parent),
            other => Err(Error::auth(format!("unknown role {:?}", other))),
        }
    }
}

/// What the resolver does with a missing or unrecognised role claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RolePolicy {
    /// Treat the user as a student
    #[default]
    FallbackToStudent,

    /// Treat the session as anonymous
    Deny,
}

impl FromStr for RolePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" | "fallback" | "fallback-to-student" => Ok(RolePolicy::FallbackToStudent),
            "deny" => Ok(RolePolicy::Deny),
            other => Err(Error::config(format!("unknown role policy {:?}", other))),
        }
    }
}

/// Signed-in user as the dashboard sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppUser {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl AppUser {
    /// "First Last"
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Derives an [`AppUser`] from a session
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleResolver {
    policy: RolePolicy,
}

impl RoleResolver {
    pub fn new(policy: RolePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RolePolicy {
        self.policy
    }

    /// Resolve the user behind a session; `None` means anonymous
    pub fn resolve(&self, session: Option<&Session>) -> Option<AppUser> {
        let user = &session?.user;

        let claim = user.user_metadata.get("role");
        let role = match claim.and_then(|v| v.as_str()).map(str::parse::<Role>) {
            Some(Ok(role)) => role,
            _ => match self.policy {
                RolePolicy::FallbackToStudent => {
                    log::warn!(
                        "User {} has unrecognised role claim {:?}, falling back to student",
                        user.id,
                        claim
                    );
                    Role::Student
                }
                RolePolicy::Deny => {
                    log::warn!(
                        "User {} has unrecognised role claim {:?}, treating as anonymous",
                        user.id,
                        claim
                    );
                    return None;
                }
            },
        };

        Some(AppUser {
            id: user.id.clone(),
            email: user.email.clone().unwrap_or_default(),
            first_name: user
                .metadata_str(&["firstName", "first_name"])
                .unwrap_or(FIRST_NAME_PLACEHOLDER)
                .to_string(),
            last_name: user
                .metadata_str(&["lastName", "last_name"])
                .unwrap_or(LAST_NAME_PLACEHOLDER)
                .to_string(),
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;
    use serde_json::{json, Value};

    fn session(metadata: Value) -> Session {
        let user_metadata = match metadata {
            Value::Object(map) => map.into_iter().collect(),
            _ => Default::default(),
        };
        Session {
            access_token: "token".to_string(),
            refresh_token: "refresh".to_string(),
            token_type: "bearer".to_string(),
            expires_in: 3600,
            expires_at: None,
            user: AuthUser {
                id: "u-1".to_string(),
                email: Some("claire@ecole.fr".to_string()),
                user_metadata,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_known_roles_resolve_exactly() {
        let resolver = RoleResolver::default();
        for role in Role::ALL {
            let user = resolver
                .resolve(Some(&session(json!({ "role": role.as_str() }))))
                .unwrap();
            assert_eq!(user.role, role);
        }
    }

    #[test]
    fn test_unknown_roles_fall_back_to_student() {
        let resolver = RoleResolver::default();
        for metadata in [
            json!({ "role": "superadmin" }),
            json!({ "role": "Teacher" }),
            json!({ "role": 3 }),
            json!({ "role": null }),
            json!({}),
        ] {
            let user = resolver.resolve(Some(&session(metadata))).unwrap();
            assert_eq!(user.role, Role::Student);
        }
    }

    #[test]
    fn test_deny_policy_treats_unknown_as_anonymous() {
        let resolver = RoleResolver::new(RolePolicy::Deny);
        assert!(resolver
            .resolve(Some(&session(json!({ "role": "superadmin" }))))
            .is_none());
        assert_eq!(
            resolver
                .resolve(Some(&session(json!({ "role": "parent" }))))
                .map(|u| u.role),
            Some(Role::Parent)
        );
    }

    #[test]
    fn test_absent_session() {
        assert!(RoleResolver::default().resolve(None).is_none());
    }

    #[test]
    fn test_names_and_email() {
        let resolver = RoleResolver::default();

        let user = resolver
            .resolve(Some(&session(json!({ "firstName": "Claire", "lastName": "Martin" }))))
            .unwrap();
        assert_eq!(user.full_name(), "Claire Martin");
        assert_eq!(user.email, "claire@ecole.fr");

        let mut bare = session(json!({}));
        bare.user.email = None;
        let user = resolver.resolve(Some(&bare)).unwrap();
        assert_eq!(user.first_name, FIRST_NAME_PLACEHOLDER);
        assert_eq!(user.last_name, LAST_NAME_PLACEHOLDER);
        assert_eq!(user.email, "");
    }

    #[test]
    fn test_home_paths() {
        assert_eq!(Role::Administrator.home_path(), "/dashboard/admin");
        assert_eq!(Role::Parent.home_path(), "/dashboard/parent");
        assert_eq!("teacher".parse::<Role>().unwrap(), Role::Teacher);
        assert!("superadmin".parse::<Role>().is_err());
    }
}
