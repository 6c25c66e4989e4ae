//! Dashboard shell: sidebar navigation, header and logout for each role

use crate::auth::SessionStore;
use crate::error::Result;
use crate::role::{AppUser, Role};
use crate::routing::normalize;

/// A sidebar entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    pub title: &'static str,
    pub href: &'static str,
}

const fn item(title: &'static str, href: &'static str) -> NavItem {
    NavItem { title, href }
}

static ADMIN_NAV: &[NavItem] = &[
    item("Overview", "/dashboard/admin"),
    item("Users", "/dashboard/admin/users"),
    item("Classes", "/dashboard/admin/classes"),
    item("Settings", "/dashboard/admin/settings"),
];

static TEACHER_NAV: &[NavItem] = &[
    item("Overview", "/dashboard/teacher"),
    item("My Classes", "/dashboard/teacher/classes"),
    item("Course Materials", "/dashboard/teacher/materials"),
    item("Students", "/dashboard/teacher/students"),
    item("Attendance", "/dashboard/teacher/attendance"),
    item("Assignments", "/dashboard/teacher/assignments"),
    item("Messages", "/dashboard/teacher/messages"),
    item("Documents", "/dashboard/teacher/documents"),
];

static STUDENT_NAV: &[NavItem] = &[
    item("Overview", "/dashboard/student"),
    item("My Courses", "/dashboard/student/courses"),
    item("Course Materials", "/dashboard/student/materials"),
    item("Digital Library", "/dashboard/student/library"),
    item("Certificates", "/dashboard/student/certificates"),
    item("Attendance", "/dashboard/student/attendance"),
    item("Payments", "/dashboard/student/payments"),
    item("Documents", "/dashboard/student/documents"),
    item("Assignments", "/dashboard/student/assignments"),
    item("Support et Assistance", "/dashboard/student/support"),
];

static PARENT_NAV: &[NavItem] = &[
    item("Overview", "/dashboard/parent"),
    item("Children", "/dashboard/parent/children"),
    item("Academic Progress", "/dashboard/parent/progress"),
    item("Messages", "/dashboard/parent/messages"),
    item("Payments", "/dashboard/parent/payments"),
    item("Documents", "/dashboard/parent/documents"),
];

/// Sidebar entries for a role
pub fn navigation(role: Role) -> &'static [NavItem] {
    match role {
        Role::Administrator => ADMIN_NAV,
        Role::Teacher => TEACHER_NAV,
        Role::Student => STUDENT_NAV,
        Role::Parent => PARENT_NAV,
    }
}

/// Header contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub title: String,
    pub subtitle: Option<String>,
    pub display_name: String,
    pub role_label: &'static str,
}

/// Sidebar plus header for a signed-in user on a given page
#[derive(Debug, Clone)]
pub struct DashboardShell {
    user: AppUser,
    current_path: String,
}

impl DashboardShell {
    pub fn new(user: AppUser, current_path: &str) -> Self {
        Self {
            user,
            current_path: normalize(current_path).to_string(),
        }
    }

    pub fn user(&self) -> &AppUser {
        &self.user
    }

    /// The user's sidebar entries
    pub fn navigation(&self) -> &'static [NavItem] {
        navigation(self.user.role)
    }

    /// Whether an entry points at the current page
    pub fn is_active(&self, item: &NavItem) -> bool {
        item.href == self.current_path
    }

    /// The highlighted sidebar entry
    pub fn active_item(&self) -> Option<&'static NavItem> {
        self.navigation().iter().find(|item| self.is_active(item))
    }

    pub fn header(&self, title: &str, subtitle: Option<&str>) -> Header {
        Header {
            title: title.to_string(),
            subtitle: subtitle.map(str::to_string),
            display_name: self.user.full_name(),
            role_label: self.user.role.label(),
        }
    }

    /// Sign out. Navigation follows from the session change notification.
    pub async fn logout(&self, sessions: &SessionStore) -> Result<()> {
        log::info!("User {} logging out", self.user.id);
        sessions.sign_out().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{decide, Decision};

    fn make_shell(role: Role, path: &str) -> DashboardShell {
        DashboardShell::new(
            AppUser {
                id: "u-1".to_string(),
                email: "u@ecole.fr".to_string(),
                first_name: "Louis".to_string(),
                last_name: "Bernard".to_string(),
                role,
            },
            path,
        )
    }

    #[test]
    fn test_every_nav_entry_renders_for_its_role() {
        for role in Role::ALL {
            let shell = make_shell(role, role.home_path());
            for item in shell.navigation() {
                assert!(
                    matches!(decide(Some(shell.user()), item.href), Decision::Render(_)),
                    "{} cannot open {}",
                    role,
                    item.href
                );
            }
        }
    }

    #[test]
    fn test_active_item() {
        let shell = make_shell(Role::Parent, "/dashboard/parent/progress/");
        assert_eq!(shell.active_item().map(|i| i.title), Some("Academic Progress"));

        let shell = make_shell(Role::Parent, "/dashboard/parent/unknown");
        assert!(shell.active_item().is_none());
    }

    #[test]
    fn test_header() {
        let header = make_shell(Role::Teacher, "/dashboard/teacher").header("Attendance", None);
        assert_eq!(header.display_name, "Louis Bernard");
        assert_eq!(header.role_label, "Enseignant");
        assert!(header.subtitle.is_none());
    }
}
