//! Request Model
//!
//! Every request the dispatcher handles is a `RequestData`: a tagged body
//! (`method` + `payload`) and an optional `sessionId`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::method::RequestMethod;

/// A request routed through the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestData {
    #[serde(flatten)]
    pub body: RequestBody,

    /// Session the request is made under
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl RequestData {
    /// Create a request without a session
    pub fn new(body: RequestBody) -> Self {
        Self {
            body,
            session_id: None,
        }
    }

    /// Attach a session id
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Get the method tag
    pub fn method(&self) -> RequestMethod {
        self.body.method()
    }

    /// Get the entity, query or command name the request targets
    pub fn name(&self) -> &str {
        self.body.name()
    }
}

impl From<RequestBody> for RequestData {
    fn from(body: RequestBody) -> Self {
        Self::new(body)
    }
}

/// Method-tagged request payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "payload", rename_all = "camelCase")]
pub enum RequestBody {
    Find(WhereQuery),
    FindOne(WhereQuery),
    Get(IdQuery),
    GetByIds(IdsQuery),
    Pull(PullQuery),
    InsertOne(SingleInsertCommand),
    InsertMulti(MultiInsertCommand),
    InsertAndGet(SingleInsertCommand),
    InsertAndGetMulti(MultiInsertCommand),
    UpdateById(IdUpdateCommand),
    UpdateMulti(MultiUpdateCommand),
    UpdateAndGet(IdUpdateCommand),
    UpdateAndFetch(MultiUpdateCommand),
    Push(PushCommand),
    Delete(DeleteCommand),
    RunCustomQuery(CustomPayload),
    RunCustomCommand(CustomPayload),
    Login(LoginCommand),
    Logout(LogoutCommand),
}

impl RequestBody {
    /// Get the method tag
    pub fn method(&self) -> RequestMethod {
        match self {
            Self::Find(_) => RequestMethod::Find,
            Self::FindOne(_) => RequestMethod::FindOne,
            Self::Get(_) => RequestMethod::Get,
            Self::GetByIds(_) => RequestMethod::GetByIds,
            Self::Pull(_) => RequestMethod::Pull,
            Self::InsertOne(_) => RequestMethod::InsertOne,
            Self::InsertMulti(_) => RequestMethod::InsertMulti,
            Self::InsertAndGet(_) => RequestMethod::InsertAndGet,
            Self::InsertAndGetMulti(_) => RequestMethod::InsertAndGetMulti,
            Self::UpdateById(_) => RequestMethod::UpdateById,
            Self::UpdateMulti(_) => RequestMethod::UpdateMulti,
            Self::UpdateAndGet(_) => RequestMethod::UpdateAndGet,
            Self::UpdateAndFetch(_) => RequestMethod::UpdateAndFetch,
            Self::Push(_) => RequestMethod::Push,
            Self::Delete(_) => RequestMethod::Delete,
            Self::RunCustomQuery(_) => RequestMethod::RunCustomQuery,
            Self::RunCustomCommand(_) => RequestMethod::RunCustomCommand,
            Self::Login(_) => RequestMethod::Login,
            Self::Logout(_) => RequestMethod::Logout,
        }
    }

    /// Get the `entityName` (or `name` for custom handlers)
    pub fn name(&self) -> &str {
        match self {
            Self::Find(q) | Self::FindOne(q) => &q.entity_name,
            Self::Get(q) => &q.entity_name,
            Self::GetByIds(q) => &q.entity_name,
            Self::Pull(q) => &q.entity_name,
            Self::InsertOne(c) | Self::InsertAndGet(c) => &c.entity_name,
            Self::InsertMulti(c) | Self::InsertAndGetMulti(c) => &c.entity_name,
            Self::UpdateById(c) | Self::UpdateAndGet(c) => &c.entity_name,
            Self::UpdateMulti(c) | Self::UpdateAndFetch(c) => &c.entity_name,
            Self::Push(c) => &c.entity_name,
            Self::Delete(c) => &c.entity_name,
            Self::RunCustomQuery(p) | Self::RunCustomCommand(p) => &p.name,
            Self::Login(c) => &c.entity_name,
            Self::Logout(c) => &c.entity_name,
        }
    }
}

/// Query entities matching a where filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhereQuery {
    pub entity_name: String,
    #[serde(rename = "where")]
    pub where_: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl WhereQuery {
    pub fn new(entity_name: impl Into<String>, where_: Value) -> Self {
        Self {
            entity_name: entity_name.into(),
            where_,
            sort: None,
            skip: None,
            limit: None,
        }
    }
}

/// Read a single entity by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdQuery {
    pub entity_name: String,
    pub id: String,
}

impl IdQuery {
    pub fn new(entity_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            id: id.into(),
        }
    }
}

/// Read several entities by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdsQuery {
    pub entity_name: String,
    pub ids: Vec<String>,
}

/// Fetch the operations applied to an entity since a known version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullQuery {
    pub entity_name: String,
    pub id: String,
    pub version_id: String,
}

/// Insert one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleInsertCommand {
    pub entity_name: String,
    pub value: Value,
}

impl SingleInsertCommand {
    pub fn new(entity_name: impl Into<String>, value: Value) -> Self {
        Self {
            entity_name: entity_name.into(),
            value,
        }
    }
}

/// Insert several entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiInsertCommand {
    pub entity_name: String,
    pub values: Vec<Value>,
}

/// Apply an update operation to one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdUpdateCommand {
    pub entity_name: String,
    pub id: String,
    pub operation: Value,
}

impl IdUpdateCommand {
    pub fn new(entity_name: impl Into<String>, id: impl Into<String>, operation: Value) -> Self {
        Self {
            entity_name: entity_name.into(),
            id: id.into(),
            operation,
        }
    }
}

/// Apply an update operation to every entity matching a where filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiUpdateCommand {
    pub entity_name: String,
    #[serde(rename = "where")]
    pub where_: Value,
    pub operation: Value,
}

/// Apply a batch of operations made against `version_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushCommand {
    pub entity_name: String,
    pub id: String,
    pub version_id: String,
    pub operations: Vec<Value>,
}

/// Delete by id or by where filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCommand {
    pub entity_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_: Option<Value>,
}

impl DeleteCommand {
    pub fn by_id(entity_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            id: Some(id.into()),
            where_: None,
        }
    }
}

/// Payload of `runCustomQuery` and `runCustomCommand`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPayload {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl CustomPayload {
    pub fn new(name: impl Into<String>, params: Value) -> Self {
        Self {
            name: name.into(),
            params: Some(params),
        }
    }
}

/// Credentials presented to a user definition's `authenticate` hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginCommand {
    pub entity_name: String,
    pub credentials: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

impl LoginCommand {
    pub fn new(entity_name: impl Into<String>, credentials: Map<String, Value>) -> Self {
        Self {
            entity_name: entity_name.into(),
            credentials,
            options: None,
        }
    }

    /// Get a credential as a string
    pub fn credential(&self, key: &str) -> Option<&str> {
        self.credentials.get(key).and_then(Value::as_str)
    }
}

/// Ends a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutCommand {
    pub entity_name: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl LogoutCommand {
    pub fn new(entity_name: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            session_id: session_id.into(),
            user_id: None,
        }
    }
}
