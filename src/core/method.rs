//! Request Methods
//!
//! Closed enumeration of every request tag the dispatcher understands.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Method tag of a request (and of its success response)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestMethod {
    // Entity queries
    Find,
    FindOne,
    Get,
    GetByIds,
    Pull,

    // Entity commands
    InsertOne,
    InsertMulti,
    InsertAndGet,
    InsertAndGetMulti,
    UpdateById,
    UpdateMulti,
    UpdateAndGet,
    UpdateAndFetch,
    Push,
    Delete,

    // Custom handlers
    RunCustomQuery,
    RunCustomCommand,

    // Session lifecycle
    Login,
    Logout,
}

impl RequestMethod {
    /// Every method, in declaration order
    pub const ALL: [RequestMethod; 19] = [
        Self::Find,
        Self::FindOne,
        Self::Get,
        Self::GetByIds,
        Self::Pull,
        Self::InsertOne,
        Self::InsertMulti,
        Self::InsertAndGet,
        Self::InsertAndGetMulti,
        Self::UpdateById,
        Self::UpdateMulti,
        Self::UpdateAndGet,
        Self::UpdateAndFetch,
        Self::Push,
        Self::Delete,
        Self::RunCustomQuery,
        Self::RunCustomCommand,
        Self::Login,
        Self::Logout,
    ];

    /// Get the wire name of the method
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::FindOne => "findOne",
            Self::Get => "get",
            Self::GetByIds => "getByIds",
            Self::Pull => "pull",
            Self::InsertOne => "insertOne",
            Self::InsertMulti => "insertMulti",
            Self::InsertAndGet => "insertAndGet",
            Self::InsertAndGetMulti => "insertAndGetMulti",
            Self::UpdateById => "updateById",
            Self::UpdateMulti => "updateMulti",
            Self::UpdateAndGet => "updateAndGet",
            Self::UpdateAndFetch => "updateAndFetch",
            Self::Push => "push",
            Self::Delete => "delete",
            Self::RunCustomQuery => "runCustomQuery",
            Self::RunCustomCommand => "runCustomCommand",
            Self::Login => "login",
            Self::Logout => "logout",
        }
    }

    /// Login and logout are served by user executors only
    pub fn is_session_lifecycle(&self) -> bool {
        matches!(self, Self::Login | Self::Logout)
    }

    /// Whether a successful response changes stored entities
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::InsertOne
                | Self::InsertMulti
                | Self::InsertAndGet
                | Self::InsertAndGetMulti
                | Self::UpdateById
                | Self::UpdateMulti
                | Self::UpdateAndGet
                | Self::UpdateAndFetch
                | Self::Push
                | Self::Delete
        )
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
