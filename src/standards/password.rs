//! # Password Handling
//!
//! Helpers for user entities that store a password property: hash it on
//! its way in, strip it on its way out.
//!
//! ## Invariants
//! - Passwords are only stored as Argon2id hashes
//! - No response carrying a user entity exposes the password property

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde_json::Value;

use crate::core::error::{GatewayResult, ServerError};
use crate::core::request::{RequestBody, RequestData};
use crate::core::response::ResponseData;

/// Hash a password with a fresh salt
pub fn hash_password(password: &str) -> GatewayResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServerError::internal("Password hashing failed").with_stack(e.to_string()))
}

/// Verify a password against its stored hash. Malformed hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

/// Replace every plaintext password the request would write with
/// `encrypt(password)`.
///
/// Covers inserted values and `$set` in update operations (including each
/// operation of a `push`). Other requests pass through unchanged.
pub fn encrypt_password_in_request_data<F>(
    mut request: RequestData,
    password_prop: &str,
    encrypt: F,
) -> GatewayResult<RequestData>
where
    F: Fn(&str) -> GatewayResult<String>,
{
    match &mut request.body {
        RequestBody::InsertOne(c) | RequestBody::InsertAndGet(c) => {
            encrypt_prop(&mut c.value, password_prop, &encrypt)?;
        }
        RequestBody::InsertMulti(c) | RequestBody::InsertAndGetMulti(c) => {
            for value in &mut c.values {
                encrypt_prop(value, password_prop, &encrypt)?;
            }
        }
        RequestBody::UpdateById(c) | RequestBody::UpdateAndGet(c) => {
            encrypt_in_operation(&mut c.operation, password_prop, &encrypt)?;
        }
        RequestBody::UpdateMulti(c) | RequestBody::UpdateAndFetch(c) => {
            encrypt_in_operation(&mut c.operation, password_prop, &encrypt)?;
        }
        RequestBody::Push(c) => {
            for operation in &mut c.operations {
                encrypt_in_operation(operation, password_prop, &encrypt)?;
            }
        }
        _ => {}
    }
    Ok(request)
}

fn encrypt_in_operation<F>(operation: &mut Value, password_prop: &str, encrypt: &F) -> GatewayResult<()>
where
    F: Fn(&str) -> GatewayResult<String>,
{
    match operation.get_mut("$set") {
        Some(set) => encrypt_prop(set, password_prop, encrypt),
        None => Ok(()),
    }
}

fn encrypt_prop<F>(target: &mut Value, password_prop: &str, encrypt: &F) -> GatewayResult<()>
where
    F: Fn(&str) -> GatewayResult<String>,
{
    if let Some(slot) = target.get_mut(password_prop) {
        if let Some(plain) = slot.as_str() {
            *slot = Value::String(encrypt(plain)?);
        }
    }
    Ok(())
}

/// Remove the password property from an entity
pub fn remove_password_from_response_entity(mut entity: Value, password_prop: &str) -> Value {
    if let Some(object) = entity.as_object_mut() {
        object.remove(password_prop);
    }
    entity
}

/// Remove the password property from every entity a response carries
pub fn remove_password_from_response_data(mut response: ResponseData, password_prop: &str) -> ResponseData {
    let strip = |entity: &mut Value| {
        *entity = remove_password_from_response_entity(entity.take(), password_prop);
    };

    match &mut response {
        ResponseData::Find(r) | ResponseData::GetByIds(r) => r.entities.iter_mut().for_each(strip),
        ResponseData::FindOne(r) | ResponseData::Get(r) => strip(&mut r.entity),
        ResponseData::InsertAndGet(r) | ResponseData::UpdateAndGet(r) => strip(&mut r.entity),
        ResponseData::InsertAndGetMulti(r) | ResponseData::UpdateAndFetch(r) => {
            r.entities.iter_mut().for_each(strip)
        }
        ResponseData::Push(r) => strip(&mut r.entity),
        ResponseData::Login(r) => {
            if let Some(user) = r.user.as_mut() {
                strip(user);
            }
        }
        _ => {}
    }
    response
}
