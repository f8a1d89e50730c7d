//! Authentication: password hashing, session tokens, roles and extractors
//!
//! Login issues a signed token carrying the user id and role. Handlers pull
//! the caller out of the `Authorization` header with [`AuthUser`] or
//! [`MaybeUser`].

pub mod extract;
pub mod jwt;
pub mod password;
pub mod roles;

pub use extract::{AuthUser, MaybeUser};
pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput, TokenValidationResult};
pub use password::{hash_password, hash_security_answer, verify_password, verify_security_answer};
pub use roles::Role;
