//! # Standards
//!
//! Reusable hooks for common definition patterns.

mod password;
mod user;

pub use password::{
    encrypt_password_in_request_data, hash_password, remove_password_from_response_data,
    remove_password_from_response_entity, verify_password,
};
pub use user::{StandardUserDefinition, DEFAULT_SESSION_TTL_SECS};
