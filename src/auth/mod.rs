//! Authentication: password hashing, bearer tokens and request extractors
//!
//! A missing bearer header is rejected with 401; a token that fails
//! validation, or whose user no longer exists, is rejected with 403.

mod extract;
mod password;
mod token;

pub use extract::{AdminUser, AuthUser};
pub use password::{hash_password, verify_password, MIN_PASSWORD_LEN};
pub use token::{Claims, TokenService};
