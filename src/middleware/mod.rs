//! Request middleware

mod auth;

pub use auth::{AuthContext, Claims, auth_middleware};
