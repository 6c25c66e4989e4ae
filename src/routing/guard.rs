//! Route guard: decides what a navigation request renders

use super::route::{lookup, Access, RouteDef};
use super::SIGN_IN_PATH;
use crate::role::AppUser;

/// Outcome of a navigation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Render the requested page
    Render(&'static RouteDef),

    /// Send the visitor to the sign-in page
    RedirectToSignIn,

    /// Send the user to another path (their role's dashboard)
    Redirect(&'static str),

    /// No such route
    NotFound,
}

impl Decision {
    /// Where the visitor ends up, if the decision is a redirect
    pub fn location(&self) -> Option<&'static str> {
        match self {
            Decision::RedirectToSignIn => Some(SIGN_IN_PATH),
            Decision::Redirect(to) => Some(*to),
            Decision::Render(_) | Decision::NotFound => None,
        }
    }

    pub fn is_render(&self) -> bool {
        matches!(self, Decision::Render(_))
    }
}

/// Decide the outcome of navigating to `path` as `user`
pub fn decide(user: Option<&AppUser>, path: &str) -> Decision {
    let route = match lookup(path) {
        Some(route) => route,
        None => return Decision::NotFound,
    };

    match (route.access, user) {
        (Access::Public, _) => Decision::Render(route),
        (Access::GuestOnly, None) => Decision::Render(route),
        (Access::GuestOnly, Some(user)) => Decision::Redirect(user.role.home_path()),
        (Access::Roles(_), None) => Decision::RedirectToSignIn,
        (access @ Access::Roles(_), Some(user)) => {
            if access.allows(user.role) {
                Decision::Render(route)
            } else {
                log::debug!(
                    "{} may not open {}, redirecting home",
                    user.role,
                    route.path
                );
                Decision::Redirect(user.role.home_path())
            }
        }
    }
}
