//! Update operators understood by the in-memory store
//!
//! An operation is a JSON object of operator → fields, e.g.
//! `{"$set": {"name": "x"}, "$inc": {"count": 1}}`. Supported operators:
//! `$set`, `$unset`, `$inc` and `$push`. Dotted paths address nested
//! objects; missing intermediate objects are created.

use serde_json::{Map, Value};

use crate::core::error::{GatewayResult, ServerError};

/// Apply one operation to an entity in place
pub fn apply_operation(entity: &mut Value, operation: &Value) -> GatewayResult<()> {
    let operators = operation
        .as_object()
        .ok_or_else(|| ServerError::bad_request("Operation must be an object"))?;

    for (operator, fields) in operators {
        let fields = fields
            .as_object()
            .ok_or_else(|| ServerError::bad_request(format!("Operand of \"{}\" must be an object", operator)))?;

        for (path, value) in fields {
            match operator.as_str() {
                "$set" => *slot(entity, path)? = value.clone(),
                "$unset" => unset(entity, path),
                "$inc" => inc(slot(entity, path)?, path, value)?,
                "$push" => push(slot(entity, path)?, path, value)?,
                other => {
                    return Err(ServerError::bad_request(format!("Unsupported update operator \"{}\"", other)))
                }
            }
        }
    }

    Ok(())
}

/// Mutable slot at a dotted path, creating parents as needed
fn slot<'a>(entity: &'a mut Value, path: &str) -> GatewayResult<&'a mut Value> {
    let mut current = entity;
    for key in path.split('.') {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        let object = current
            .as_object_mut()
            .ok_or_else(|| ServerError::bad_request(format!("Cannot set \"{}\" on a non-object", path)))?;
        current = object.entry(key.to_string()).or_insert(Value::Null);
    }
    Ok(current)
}

fn unset(entity: &mut Value, path: &str) {
    let (parent, key) = match path.rsplit_once('.') {
        Some((parent, key)) => (parent, key),
        None => ("", path),
    };

    let mut current = entity;
    if !parent.is_empty() {
        for segment in parent.split('.') {
            match current.get_mut(segment) {
                Some(next) => current = next,
                None => return,
            }
        }
    }

    if let Some(object) = current.as_object_mut() {
        object.remove(key);
    }
}

fn inc(target: &mut Value, path: &str, by: &Value) -> GatewayResult<()> {
    let not_numeric = || ServerError::bad_request(format!("Cannot increment \"{}\"", path));

    let next = match (target.as_i64(), by.as_i64()) {
        (Some(a), Some(b)) => Value::from(a.saturating_add(b)),
        _ if target.is_null() => by.clone(),
        _ => {
            let a = target.as_f64().ok_or_else(not_numeric)?;
            let b = by.as_f64().ok_or_else(not_numeric)?;
            Value::from(a + b)
        }
    };

    if !next.is_number() {
        return Err(not_numeric());
    }
    *target = next;
    Ok(())
}

fn push(target: &mut Value, path: &str, value: &Value) -> GatewayResult<()> {
    if target.is_null() {
        *target = Value::Array(Vec::new());
    }

    let array = target
        .as_array_mut()
        .ok_or_else(|| ServerError::bad_request(format!("Cannot push to non-array \"{}\"", path)))?;
    array.push(value.clone());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorType;
    use serde_json::json;

    #[test]
    fn test_set_nested() {
        let mut entity = json!({"id": "a"});
        apply_operation(&mut entity, &json!({"$set": {"profile.name": "Shin"}})).unwrap();
        assert_eq!(entity, json!({"id": "a", "profile": {"name": "Shin"}}));
    }

    #[test]
    fn test_unset_inc_push() {
        let mut entity = json!({"id": "a", "tmp": 1, "count": 2, "tags": ["x"]});
        apply_operation(
            &mut entity,
            &json!({"$unset": {"tmp": ""}, "$inc": {"count": 3}, "$push": {"tags": "y"}}),
        )
        .unwrap();

        assert_eq!(entity, json!({"id": "a", "count": 5, "tags": ["x", "y"]}));
    }

    #[test]
    fn test_unknown_operator() {
        let mut entity = json!({});
        let err = apply_operation(&mut entity, &json!({"$rename": {"a": "b"}})).unwrap_err();
        assert_eq!(err.error_type, ErrorType::BadRequest);
    }

    #[test]
    fn test_inc_non_numeric() {
        let mut entity = json!({"name": "x"});
        assert!(apply_operation(&mut entity, &json!({"$inc": {"name": 1}})).is_err());
    }
}
