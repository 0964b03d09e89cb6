//! # Clients
//!
//! Storage-facing contracts the dispatcher runs against, plus an
//! in-memory implementation of each.
//!
//! Methods take owned payloads and return boxed futures so the traits stay
//! object safe and implementations are free to await real I/O.

mod memory;
mod session;
mod update;

pub use memory::MemoryEntityClient;
pub use session::MemorySessionClient;
pub use update::apply_operation;

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::core::error::GatewayResult;
use crate::core::request::{
    DeleteCommand, IdQuery, IdUpdateCommand, IdsQuery, MultiInsertCommand, MultiUpdateCommand, PullQuery,
    PushCommand, SingleInsertCommand, WhereQuery,
};
use crate::core::response::{
    DeleteCommandResult, GetCommandResult, IdUpdateCommandResult, MultiInsertResult, MultiUpdateCommandResult,
    MultiValuesCommandResult, PullQueryResult, PushCommandResult, QueryResult, SingleInsertResult,
    SingleQueryResult,
};
use crate::core::session::{PreSession, Session};

/// Entity storage operations, one per entity request method
pub trait EntityClient: Send + Sync {
    fn find(&self, query: WhereQuery) -> BoxFuture<'_, GatewayResult<QueryResult>>;

    /// First entity matching the query; NotFound when none match
    fn find_one(&self, query: WhereQuery) -> BoxFuture<'_, GatewayResult<SingleQueryResult>>;

    /// NotFound when the id is unknown
    fn get(&self, query: IdQuery) -> BoxFuture<'_, GatewayResult<SingleQueryResult>>;

    /// Unknown ids are skipped
    fn get_by_ids(&self, query: IdsQuery) -> BoxFuture<'_, GatewayResult<QueryResult>>;

    fn pull(&self, query: PullQuery) -> BoxFuture<'_, GatewayResult<PullQueryResult>>;

    fn insert_one(&self, command: SingleInsertCommand) -> BoxFuture<'_, GatewayResult<SingleInsertResult>>;

    fn insert_multi(&self, command: MultiInsertCommand) -> BoxFuture<'_, GatewayResult<MultiInsertResult>>;

    fn insert_and_get(&self, command: SingleInsertCommand) -> BoxFuture<'_, GatewayResult<GetCommandResult>>;

    fn insert_and_get_multi(
        &self,
        command: MultiInsertCommand,
    ) -> BoxFuture<'_, GatewayResult<MultiValuesCommandResult>>;

    fn update_by_id(&self, command: IdUpdateCommand) -> BoxFuture<'_, GatewayResult<IdUpdateCommandResult>>;

    fn update_multi(&self, command: MultiUpdateCommand) -> BoxFuture<'_, GatewayResult<MultiUpdateCommandResult>>;

    fn update_and_get(&self, command: IdUpdateCommand) -> BoxFuture<'_, GatewayResult<GetCommandResult>>;

    fn update_and_fetch(
        &self,
        command: MultiUpdateCommand,
    ) -> BoxFuture<'_, GatewayResult<MultiValuesCommandResult>>;

    fn push(&self, command: PushCommand) -> BoxFuture<'_, GatewayResult<PushCommandResult>>;

    fn delete(&self, command: DeleteCommand) -> BoxFuture<'_, GatewayResult<DeleteCommandResult>>;

    /// Session client backed by the same store
    fn create_session_client(&self) -> Arc<dyn SessionClient>;
}

/// Session store
pub trait SessionClient: Send + Sync {
    /// Get a session by id. Expired sessions may still be returned.
    fn get(&self, id: String) -> BoxFuture<'_, GatewayResult<Option<Session>>>;

    /// Materialize a pre-session under a fresh id
    fn create(&self, pre_session: PreSession) -> BoxFuture<'_, GatewayResult<Session>>;

    /// Remove a session; `false` when the id was unknown
    fn delete(&self, id: String) -> BoxFuture<'_, GatewayResult<bool>>;
}
