//! Role-based routing: the route table and the guard

mod guard;
mod route;

pub use guard::*;
pub use route::*;

/// Where anonymous visitors are sent
pub const SIGN_IN_PATH: &str = "/auth/sign-in";
