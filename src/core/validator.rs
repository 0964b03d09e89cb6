//! Request Validation
//!
//! Structural checks applied to every request before routing. Typed
//! deserialization already guarantees field presence; these checks cover
//! what the types cannot express (non-empty names, object-shaped filters).

use serde_json::Value;

use super::error::{GatewayResult, ServerError};
use super::request::{
    CustomPayload, DeleteCommand, IdQuery, IdUpdateCommand, IdsQuery, LoginCommand, LogoutCommand,
    MultiInsertCommand, MultiUpdateCommand, PullQuery, PushCommand, RequestBody, RequestData,
    SingleInsertCommand, WhereQuery,
};

/// Validates the shape of a request
pub trait RequestValidator: Send + Sync {
    fn assert_valid(&self, request: &RequestData) -> GatewayResult<()>;
}

/// Default structural validator
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralValidator;

impl RequestValidator for StructuralValidator {
    fn assert_valid(&self, request: &RequestData) -> GatewayResult<()> {
        check_body(&request.body).map_err(|msg| {
            ServerError::bad_request(format!("Error in \"RequestData(method={})\": {}", request.method(), msg))
        })
    }
}

type Check = Result<(), String>;

fn check_body(body: &RequestBody) -> Check {
    match body {
        RequestBody::Find(q) | RequestBody::FindOne(q) => where_query(q),
        RequestBody::Get(q) => id_query(q),
        RequestBody::GetByIds(q) => ids_query(q),
        RequestBody::Pull(q) => pull_query(q),
        RequestBody::InsertOne(c) | RequestBody::InsertAndGet(c) => single_insert(c),
        RequestBody::InsertMulti(c) | RequestBody::InsertAndGetMulti(c) => multi_insert(c),
        RequestBody::UpdateById(c) | RequestBody::UpdateAndGet(c) => id_update(c),
        RequestBody::UpdateMulti(c) | RequestBody::UpdateAndFetch(c) => multi_update(c),
        RequestBody::Push(c) => push(c),
        RequestBody::Delete(c) => delete(c),
        RequestBody::RunCustomQuery(p) => custom("CustomQuery", p),
        RequestBody::RunCustomCommand(p) => custom("CustomCommand", p),
        RequestBody::Login(c) => login(c),
        RequestBody::Logout(c) => logout(c),
    }
}

fn non_empty(field: &str, value: &str) -> Check {
    if value.is_empty() {
        return Err(format!("{} must be a non-empty string. \"{}\" given.", field, value));
    }
    Ok(())
}

fn object(field: &str, value: &Value) -> Check {
    if !value.is_object() {
        return Err(format!("{} must be an object. \"{}\" given.", field, value));
    }
    Ok(())
}

fn where_query(q: &WhereQuery) -> Check {
    non_empty("WhereQuery.entityName", &q.entity_name)?;
    object("WhereQuery.where", &q.where_)
}

fn id_query(q: &IdQuery) -> Check {
    non_empty("IdQuery.entityName", &q.entity_name)?;
    non_empty("IdQuery.id", &q.id)
}

fn ids_query(q: &IdsQuery) -> Check {
    non_empty("IdsQuery.entityName", &q.entity_name)?;
    match q.ids.first() {
        Some(id) if !id.is_empty() => Ok(()),
        _ => Err("IdsQuery.ids must be a non-empty array.".to_string()),
    }
}

fn pull_query(q: &PullQuery) -> Check {
    non_empty("PullQuery.entityName", &q.entity_name)?;
    non_empty("PullQuery.id", &q.id)?;
    non_empty("PullQuery.versionId", &q.version_id)
}

fn single_insert(c: &SingleInsertCommand) -> Check {
    non_empty("InsertCommand.entityName", &c.entity_name)?;
    object("InsertCommand.value", &c.value)
}

fn multi_insert(c: &MultiInsertCommand) -> Check {
    non_empty("InsertCommand.entityName", &c.entity_name)?;
    match c.values.first() {
        Some(v) if v.is_object() => Ok(()),
        _ => Err("InsertCommand.values must be a non-empty array<Object>.".to_string()),
    }
}

fn id_update(c: &IdUpdateCommand) -> Check {
    non_empty("UpdateCommand.entityName", &c.entity_name)?;
    object("Update operation", &c.operation)?;
    non_empty("UpdateCommand.id", &c.id)
}

fn multi_update(c: &MultiUpdateCommand) -> Check {
    non_empty("UpdateCommand.entityName", &c.entity_name)?;
    object("Update operation", &c.operation)?;
    object("UpdateCommand.where", &c.where_)
}

fn push(c: &PushCommand) -> Check {
    non_empty("PushCommand.entityName", &c.entity_name)?;
    non_empty("PushCommand.id", &c.id)?;
    non_empty("PushCommand.versionId", &c.version_id)?;
    c.operations
        .iter()
        .try_for_each(|operation| object("PushCommand.operations[]", operation))
}

fn delete(c: &DeleteCommand) -> Check {
    non_empty("DeleteCommand.entityName", &c.entity_name)?;
    match (&c.id, &c.where_) {
        (Some(id), _) => non_empty("DeleteCommand.id", id),
        (None, Some(where_)) => object("DeleteCommand.where", where_),
        (None, None) => Err("DeleteCommand must have key \"id\" or \"where\". Neither given.".to_string()),
    }
}

fn custom(kind: &str, p: &CustomPayload) -> Check {
    non_empty(&format!("{}.name", kind), &p.name)?;
    match &p.params {
        None | Some(Value::Null) | Some(Value::Object(_)) => Ok(()),
        Some(_) => Err(format!("{}.params must be an object or null.", kind)),
    }
}

fn login(c: &LoginCommand) -> Check {
    non_empty("LoginCommand.entityName", &c.entity_name)?;
    for (key, value) in &c.credentials {
        match value.as_str() {
            Some(s) if !s.is_empty() => {}
            _ => return Err(format!("LoginCommand.credentials['{}'] must be a non-empty string.", key)),
        }
    }
    Ok(())
}

fn logout(c: &LogoutCommand) -> Check {
    non_empty("LogoutCommand.sessionId", &c.session_id)?;
    non_empty("LogoutCommand.entityName", &c.entity_name)
}
