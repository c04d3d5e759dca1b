//! Bearer-token identity
//!
//! Tokens are HS256 JWTs issued elsewhere; the service only verifies them. A request's
//! identity is the `sub` claim, extracted as a [`Principal`].

pub mod jwt;
pub mod models;

pub use jwt::JwtService;
pub use models::{JwtClaims, Principal};
