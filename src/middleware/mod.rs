mod auth;
mod csrf;

pub use auth::require_auth;
pub use csrf::require_csrf;
