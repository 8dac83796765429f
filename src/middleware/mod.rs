pub mod auth;

pub use auth::{extract_current_user, issue_token, verify_jwt_token, CurrentUser, JwtClaims, Role};
