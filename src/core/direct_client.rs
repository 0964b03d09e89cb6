//! Direct Client
//!
//! Typed in-process client over a dispatcher. Each method builds the
//! request, runs it through the full pipeline and unwraps the matching
//! response variant; error responses come back as `Err(ServerError)`.

use std::sync::Arc;

use serde_json::Value;

use super::dispatcher::RequestDispatcher;
use super::error::{GatewayResult, ServerError};
use super::method::RequestMethod;
use super::request::{
    CustomPayload, DeleteCommand, IdQuery, IdUpdateCommand, IdsQuery, LoginCommand, LogoutCommand,
    MultiInsertCommand, MultiUpdateCommand, PullQuery, PushCommand, RequestBody, RequestData,
    SingleInsertCommand, WhereQuery,
};
use super::response::{
    DeleteCommandResult, GetCommandResult, IdUpdateCommandResult, LoginResult, LogoutResult, MultiInsertResult,
    MultiUpdateCommandResult, MultiValuesCommandResult, PullQueryResult, PushCommandResult, QueryResult,
    ResponseData, SingleInsertResult, SingleQueryResult,
};

macro_rules! direct_methods {
    ($($fn_name:ident($payload:ty) -> $result:ty => $variant:ident;)*) => {
        $(
            pub async fn $fn_name(&self, payload: $payload) -> GatewayResult<$result> {
                match self.call(RequestBody::$variant(payload)).await? {
                    ResponseData::$variant(result) => Ok(result),
                    other => Err(unexpected(RequestMethod::$variant, &other)),
                }
            }
        )*
    };
}

/// In-process client bound to an optional session
#[derive(Clone)]
pub struct DirectClient {
    dispatcher: Arc<RequestDispatcher>,
    session_id: Option<String>,
}

impl DirectClient {
    pub fn new(dispatcher: Arc<RequestDispatcher>) -> Self {
        Self {
            dispatcher,
            session_id: None,
        }
    }

    /// Client that sends every request under `session_id`
    pub fn with_session(&self, session_id: impl Into<String>) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            session_id: Some(session_id.into()),
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Send a raw body and return the non-error response
    pub async fn call(&self, body: RequestBody) -> GatewayResult<ResponseData> {
        let request = RequestData {
            body,
            session_id: self.session_id.clone(),
        };

        match self.dispatcher.handle_request_data(request).await {
            ResponseData::Error(e) => Err(e),
            response => Ok(response),
        }
    }

    direct_methods! {
        find(WhereQuery) -> QueryResult => Find;
        find_one(WhereQuery) -> SingleQueryResult => FindOne;
        get(IdQuery) -> SingleQueryResult => Get;
        get_by_ids(IdsQuery) -> QueryResult => GetByIds;
        pull(PullQuery) -> PullQueryResult => Pull;
        insert_one(SingleInsertCommand) -> SingleInsertResult => InsertOne;
        insert_multi(MultiInsertCommand) -> MultiInsertResult => InsertMulti;
        insert_and_get(SingleInsertCommand) -> GetCommandResult => InsertAndGet;
        insert_and_get_multi(MultiInsertCommand) -> MultiValuesCommandResult => InsertAndGetMulti;
        update_by_id(IdUpdateCommand) -> IdUpdateCommandResult => UpdateById;
        update_multi(MultiUpdateCommand) -> MultiUpdateCommandResult => UpdateMulti;
        update_and_get(IdUpdateCommand) -> GetCommandResult => UpdateAndGet;
        update_and_fetch(MultiUpdateCommand) -> MultiValuesCommandResult => UpdateAndFetch;
        push(PushCommand) -> PushCommandResult => Push;
        delete(DeleteCommand) -> DeleteCommandResult => Delete;
        run_custom_query(CustomPayload) -> Value => RunCustomQuery;
        run_custom_command(CustomPayload) -> Value => RunCustomCommand;
        login(LoginCommand) -> LoginResult => Login;
        logout(LogoutCommand) -> LogoutResult => Logout;
    }
}

fn unexpected(expected: RequestMethod, response: &ResponseData) -> ServerError {
    ServerError::internal(format!(
        "Expected \"{}\" response, got \"{}\"",
        expected,
        response.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryEntityClient;
    use crate::core::definition::EntityDefinition;
    use crate::core::error::ErrorType;
    use crate::core::registry::FunctionalGroup;
    use serde_json::json;

    fn client() -> DirectClient {
        let group = FunctionalGroup::new().with_entity("post", EntityDefinition::new());
        let dispatcher = Arc::new(RequestDispatcher::new(group, Arc::new(MemoryEntityClient::new())));
        dispatcher.create_direct_client()
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let client = client();
        let inserted = client
            .insert_and_get(SingleInsertCommand::new("post", json!({"id": "p1", "title": "x"})))
            .await
            .unwrap();
        assert_eq!(inserted.entity["title"], "x");

        let fetched = client.get(IdQuery::new("post", "p1")).await.unwrap();
        assert_eq!(fetched.version_id, inserted.version_id);
    }

    #[tokio::test]
    async fn test_error_response_surfaces_as_err() {
        let err = client().get(IdQuery::new("comment", "c1")).await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::NotFound);
    }

    #[tokio::test]
    async fn test_with_session_binds_id() {
        let client = client().with_session("s1");
        assert_eq!(client.session_id(), Some("s1"));
    }
}
