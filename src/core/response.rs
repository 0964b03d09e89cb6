//! Response Model
//!
//! Success variants mirror the request tags; `error` carries a
//! `ServerError`. Exactly one of the two is ever populated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ServerError;
use super::method::RequestMethod;
use super::session::Session;

/// Response returned by the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ResponseData {
    Find(QueryResult),
    FindOne(SingleQueryResult),
    Get(SingleQueryResult),
    GetByIds(QueryResult),
    Pull(PullQueryResult),
    InsertOne(SingleInsertResult),
    InsertMulti(MultiInsertResult),
    InsertAndGet(GetCommandResult),
    InsertAndGetMulti(MultiValuesCommandResult),
    UpdateById(IdUpdateCommandResult),
    UpdateMulti(MultiUpdateCommandResult),
    UpdateAndGet(GetCommandResult),
    UpdateAndFetch(MultiValuesCommandResult),
    Push(PushCommandResult),
    Delete(DeleteCommandResult),
    RunCustomQuery(Value),
    RunCustomCommand(Value),
    Login(LoginResult),
    Logout(LogoutResult),
    Error(ServerError),
}

impl ResponseData {
    /// Method tag of a success response, `None` for errors
    pub fn method(&self) -> Option<RequestMethod> {
        let method = match self {
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
            Self::Error(_) => return None,
        };
        Some(method)
    }

    /// Wire name of the `type` tag
    pub fn type_name(&self) -> &'static str {
        self.method().map_or("error", |m| m.as_str())
    }

    /// Get the error payload, if any
    pub fn error(&self) -> Option<&ServerError> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl From<ServerError> for ResponseData {
    fn from(e: ServerError) -> Self {
        Self::Error(e)
    }
}

/// Result of `find` and `getByIds`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub entities: Vec<Value>,
    pub versions_by_id: BTreeMap<String, String>,
}

/// Result of `findOne` and `get`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleQueryResult {
    pub entity: Value,
    pub version_id: String,
}

/// Result of `pull`: `pulled` is 0 when nothing changed since the version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullQueryResult {
    pub pulled: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operations: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

impl PullQueryResult {
    pub fn up_to_date() -> Self {
        Self {
            pulled: 0,
            operations: None,
            version_id: None,
        }
    }

    pub fn pulled(operations: Vec<Value>, version_id: impl Into<String>) -> Self {
        Self {
            pulled: 1,
            operations: Some(operations),
            version_id: Some(version_id.into()),
        }
    }
}

/// Result of `insertOne`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleInsertResult {
    pub n: usize,
    pub id: String,
    pub version_id: String,
}

/// Result of `insertMulti`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiInsertResult {
    pub n: usize,
    pub ids: Vec<String>,
    pub versions_by_id: BTreeMap<String, String>,
}

/// Result of `insertAndGet` and `updateAndGet`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCommandResult {
    pub n: usize,
    pub entity: Value,
    pub version_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_version_id: Option<String>,
}

/// Result of `insertAndGetMulti` and `updateAndFetch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiValuesCommandResult {
    pub n: usize,
    pub entities: Vec<Value>,
    pub versions_by_id: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub prev_versions_by_id: BTreeMap<String, String>,
}

/// Result of `updateById`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdUpdateCommandResult {
    pub n: usize,
    pub id: String,
    pub prev_version_id: String,
    pub version_id: String,
}

/// Result of `updateMulti`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiUpdateCommandResult {
    pub n: usize,
    pub ids: Vec<String>,
    pub prev_versions_by_id: BTreeMap<String, String>,
    pub versions_by_id: BTreeMap<String, String>,
}

/// Result of `push`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushCommandResult {
    pub n: usize,
    pub entity: Value,
    pub prev_version_id: String,
    pub version_id: String,
    /// Operations applied by others since the pushed-against version
    pub new_operations: Vec<Value>,
}

/// Result of `delete`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteCommandResult {
    pub n: usize,
}

/// Result of `login`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub user: Option<Value>,
    pub version_id: Option<String>,
    pub session: Session,
}

/// Result of `logout`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogoutResult {
    pub ok: u8,
}

impl LogoutResult {
    pub fn ok() -> Self {
        Self { ok: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_wire_format() {
        let res = ResponseData::Logout(LogoutResult::ok());
        assert_eq!(
            serde_json::to_value(&res).unwrap(),
            json!({"type": "logout", "payload": {"ok": 1}})
        );
        assert_eq!(res.type_name(), "logout");
    }

    #[test]
    fn test_error_wire_format() {
        let res = ResponseData::from(ServerError::unauthorized("Authorization Required."));
        let json = serde_json::to_value(&res).unwrap();

        assert_eq!(json["type"], "error");
        assert_eq!(json["payload"]["errorType"], "Unauthorized");
        assert!(res.method().is_none());
        assert!(res.is_error());
    }

    #[test]
    fn test_find_result_parsing() {
        let json = r#"{"type": "find", "payload": {"entities": [{"id": "a"}], "versionsById": {"a": "v1"}}}"#;
        let res: ResponseData = serde_json::from_str(json).unwrap();

        if let ResponseData::Find(result) = res {
            assert_eq!(result.entities.len(), 1);
            assert_eq!(result.versions_by_id["a"], "v1");
        } else {
            panic!("Expected Find response");
        }
    }
}
