//! The static route table

use crate::role::Role;

/// Who may open a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone
    Public,

    /// Anonymous visitors only; signed-in users are sent to their dashboard
    GuestOnly,

    /// Signed-in users holding one of the roles
    Roles(&'static [Role]),
}

impl Access {
    /// Whether a signed-in user with `role` may open the route
    pub fn allows(&self, role: Role) -> bool {
        match self {
            Access::Public => true,
            Access::GuestOnly => false,
            Access::Roles(roles) => roles.contains(&role),
        }
    }
}

/// A route of the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDef {
    /// Normalised path
    pub path: &'static str,

    /// Access rule
    pub access: Access,

    /// Page title
    pub title: &'static str,
}

const ADMIN: &[Role] = &[Role::Administrator];
const TEACHER: &[Role] = &[Role::Teacher];
const STUDENT: &[Role] = &[Role::Student];
const PARENT: &[Role] = &[Role::Parent];

const fn route(path: &'static str, access: Access, title: &'static str) -> RouteDef {
    RouteDef { path, access, title }
}

/// Every route of the dashboard
pub static ROUTES: &[RouteDef] = &[
    route("/", Access::GuestOnly, "Home"),
    route("/auth/sign-in", Access::GuestOnly, "Sign in"),
    route("/auth/sign-up", Access::GuestOnly, "Sign up"),
    route("/auth/forgot-password", Access::Public, "Forgot password"),
    route("/auth/reset-password", Access::Public, "Reset password"),
    // administrator
    route("/dashboard/admin", Access::Roles(ADMIN), "Overview"),
    route("/dashboard/admin/users", Access::Roles(ADMIN), "Users"),
    route("/dashboard/admin/classes", Access::Roles(ADMIN), "Classes"),
    route("/dashboard/admin/settings", Access::Roles(ADMIN), "Settings"),
    // student
    route("/dashboard/student", Access::Roles(STUDENT), "Overview"),
    route("/dashboard/student/courses", Access::Roles(STUDENT), "My Courses"),
    route("/dashboard/student/materials", Access::Roles(STUDENT), "Course Materials"),
    route("/dashboard/student/library", Access::Roles(STUDENT), "Digital Library"),
    route("/dashboard/student/certificates", Access::Roles(STUDENT), "Certificates"),
    route("/dashboard/student/attendance", Access::Roles(STUDENT), "Attendance"),
    route("/dashboard/student/payments", Access::Roles(STUDENT), "Payments"),
    route("/dashboard/student/documents", Access::Roles(STUDENT), "Documents"),
    route("/dashboard/student/assignments", Access::Roles(STUDENT), "Assignments"),
    route("/dashboard/student/support", Access::Roles(STUDENT), "Support et Assistance"),
    // teacher
    route("/dashboard/teacher", Access::Roles(TEACHER), "Overview"),
    route("/dashboard/teacher/classes", Access::Roles(TEACHER), "My Classes"),
    route("/dashboard/teacher/materials", Access::Roles(TEACHER), "Course Materials"),
    route("/dashboard/teacher/students", Access::Roles(TEACHER), "Students"),
    route("/dashboard/teacher/attendance", Access::Roles(TEACHER), "Attendance"),
    route("/dashboard/teacher/assignments", Access::Roles(TEACHER), "Assignments"),
    route("/dashboard/teacher/messages", Access::Roles(TEACHER), "Messages"),
    route("/dashboard/teacher/documents", Access::Roles(TEACHER), "Documents"),
    // parent
    route("/dashboard/parent", Access::Roles(PARENT), "Overview"),
    route("/dashboard/parent/children", Access::Roles(PARENT), "Children"),
    route("/dashboard/parent/progress", Access::Roles(PARENT), "Academic Progress"),
    route("/dashboard/parent/messages", Access::Roles(PARENT), "Messages"),
    route("/dashboard/parent/payments", Access::Roles(PARENT), "Payments"),
    route("/dashboard/parent/documents", Access::Roles(PARENT), "Documents"),
];

/// Strip query string, fragment and trailing slashes
pub fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = path[..end].trim_end_matches('/');
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

/// Find the route for a path
pub fn lookup(path: &str) -> Option<&'static RouteDef> {
    let path = normalize(path);
    ROUTES.iter().find(|route| route.path == path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_paths_are_unique_and_normalised() {
        let mut seen = HashSet::new();
        for route in ROUTES {
            assert!(seen.insert(route.path), "duplicate route {}", route.path);
            assert_eq!(normalize(route.path), route.path);
        }
    }

    #[test]
    fn test_every_role_home_is_restricted_to_that_role() {
        for role in Role::ALL {
            let route = lookup(role.home_path()).unwrap();
            for other in Role::ALL {
                assert_eq!(route.access.allows(other), other == role);
            }
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/dashboard/parent/"), "/dashboard/parent");
        assert_eq!(normalize("/dashboard/parent?child=2#top"), "/dashboard/parent");
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("//"), "/");
    }

    #[test]
    fn test_lookup() {
        assert!(lookup("/dashboard/student/courses/").is_some());
        assert!(lookup("/dashboard/student/unknown").is_none());
        assert!(lookup("/debug").is_none());
    }
}
