//! Definition Executors
//!
//! An executor pairs one definition with the clients it needs and exposes
//! the four pipeline stages (authorize, normalize, validate, execute) to
//! the dispatcher. The four variants share one pipeline driver; they differ
//! only in the strategy used for the default execution.

use std::sync::Arc;

use crate::client::{EntityClient, SessionClient};
use crate::core::definition::{
    CustomCommandDefinition, CustomQueryDefinition, EntityDefinition, Execution, Hooks, UserDefinition,
    WithHooks,
};
use crate::core::error::{GatewayResult, ServerError};
use crate::core::method::RequestMethod;
use crate::core::request::{LoginCommand, LogoutCommand, RequestBody, RequestData};
use crate::core::response::{LoginResult, LogoutResult, ResponseData};
use crate::core::session::Session;

/// Executor variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorKind {
    Entity,
    User,
    CustomQuery,
    CustomCommand,
}

enum Strategy {
    Entity {
        definition: Arc<EntityDefinition>,
        client: Arc<dyn EntityClient>,
    },
    User {
        definition: Arc<UserDefinition>,
        client: Arc<dyn EntityClient>,
        session_client: Arc<dyn SessionClient>,
    },
    CustomQuery {
        definition: Arc<CustomQueryDefinition>,
    },
    CustomCommand {
        definition: Arc<CustomCommandDefinition>,
    },
}

/// Runtime wrapper pairing a definition with its backing clients
pub struct DefinitionExecutor {
    strategy: Strategy,
}

impl DefinitionExecutor {
    /// Executor for a plain entity
    pub fn entity(definition: impl Into<Arc<EntityDefinition>>, client: Arc<dyn EntityClient>) -> Self {
        Self {
            strategy: Strategy::Entity {
                definition: definition.into(),
                client,
            },
        }
    }

    /// Executor for a user entity
    pub fn user(
        definition: impl Into<Arc<UserDefinition>>,
        client: Arc<dyn EntityClient>,
        session_client: Arc<dyn SessionClient>,
    ) -> Self {
        Self {
            strategy: Strategy::User {
                definition: definition.into(),
                client,
                session_client,
            },
        }
    }

    /// Executor for a custom query
    pub fn custom_query(definition: impl Into<Arc<CustomQueryDefinition>>) -> Self {
        Self {
            strategy: Strategy::CustomQuery {
                definition: definition.into(),
            },
        }
    }

    /// Executor for a custom command
    pub fn custom_command(definition: impl Into<Arc<CustomCommandDefinition>>) -> Self {
        Self {
            strategy: Strategy::CustomCommand {
                definition: definition.into(),
            },
        }
    }

    pub fn kind(&self) -> ExecutorKind {
        match self.strategy {
            Strategy::Entity { .. } => ExecutorKind::Entity,
            Strategy::User { .. } => ExecutorKind::User,
            Strategy::CustomQuery { .. } => ExecutorKind::CustomQuery,
            Strategy::CustomCommand { .. } => ExecutorKind::CustomCommand,
        }
    }

    fn hooks(&self) -> &Hooks {
        match &self.strategy {
            Strategy::Entity { definition, .. } => definition.hooks(),
            Strategy::User { definition, .. } => definition.hooks(),
            Strategy::CustomQuery { definition } | Strategy::CustomCommand { definition } => definition.hooks(),
        }
    }

    /// Whether the request may proceed. Defaults to `true`.
    pub async fn authorize(&self, request: &RequestData, session: Option<&Session>) -> GatewayResult<bool> {
        match &self.hooks().authorize {
            Some(hook) => hook(request.clone(), session.cloned()).await,
            None => Ok(true),
        }
    }

    /// Possibly transformed request. Defaults to the request itself.
    pub async fn normalize(&self, request: RequestData, session: Option<&Session>) -> GatewayResult<RequestData> {
        match &self.hooks().normalize {
            Some(hook) => hook(request, session.cloned()).await,
            None => Ok(request),
        }
    }

    /// Fails on invalid input. Defaults to a no-op.
    pub async fn validate(&self, request: &RequestData, session: Option<&Session>) -> GatewayResult<()> {
        match &self.hooks().validate {
            Some(hook) => hook(request.clone(), session.cloned()).await,
            None => Ok(()),
        }
    }

    /// Produce the response.
    ///
    /// User executors serve `login` and `logout` themselves, before any
    /// wrap hook is consulted. Custom executors always run their
    /// definition's `execute` and never consult a wrap hook. Entity and user
    /// requests go through the wrap hook when one is set, or the default
    /// execution otherwise.
    pub async fn execute(&self, request: RequestData, session: Option<&Session>) -> GatewayResult<ResponseData> {
        let request = match (&self.strategy, request.body) {
            (Strategy::User { definition, session_client, .. }, RequestBody::Login(command)) => {
                return login(definition, session_client.as_ref(), command, session).await;
            }
            (Strategy::User { session_client, .. }, RequestBody::Logout(command)) => {
                return logout(session_client.as_ref(), command).await;
            }
            (_, body) => RequestData {
                body,
                session_id: request.session_id,
            },
        };

        let execution = self.default_execution();
        let wrap = match &self.strategy {
            Strategy::Entity { .. } | Strategy::User { .. } => self.hooks().wrap_execution.as_ref(),
            Strategy::CustomQuery { .. } | Strategy::CustomCommand { .. } => None,
        };
        match wrap {
            Some(wrap) => wrap(request, session.cloned(), execution).await,
            None => execution.run(request, session.cloned()).await,
        }
    }

    fn default_execution(&self) -> Execution {
        match &self.strategy {
            Strategy::Entity { client, .. } | Strategy::User { client, .. } => {
                let client = Arc::clone(client);
                Execution::new(move |request, _session| execute_entity_request(Arc::clone(&client), request))
            }
            Strategy::CustomQuery { definition } => {
                let definition = Arc::clone(definition);
                Execution::new(move |request, session| {
                    let definition = Arc::clone(&definition);
                    async move {
                        match request.body {
                            RequestBody::RunCustomQuery(payload) => {
                                let result = (definition.execute)(payload, session).await?;
                                Ok::<_, ServerError>(ResponseData::RunCustomQuery(result))
                            }
                            other => Ok(invalid_method(other.method())),
                        }
                    }
                })
            }
            Strategy::CustomCommand { definition } => {
                let definition = Arc::clone(definition);
                Execution::new(move |request, session| {
                    let definition = Arc::clone(&definition);
                    async move {
                        match request.body {
                            RequestBody::RunCustomCommand(payload) => {
                                let result = (definition.execute)(payload, session).await?;
                                Ok::<_, ServerError>(ResponseData::RunCustomCommand(result))
                            }
                            other => Ok(invalid_method(other.method())),
                        }
                    }
                })
            }
        }
    }
}

async fn login(
    definition: &UserDefinition,
    session_client: &dyn SessionClient,
    command: LoginCommand,
    session: Option<&Session>,
) -> GatewayResult<ResponseData> {
    let result = (definition.authenticate)(command, session.cloned()).await?;
    let session = session_client.create(result.pre_session).await?;

    Ok(ResponseData::Login(LoginResult {
        user: result.user,
        version_id: result.version_id,
        session,
    }))
}

async fn logout(session_client: &dyn SessionClient, command: LogoutCommand) -> GatewayResult<ResponseData> {
    let removed = session_client.delete(command.session_id).await?;

    if !removed {
        return Err(ServerError::bad_request("sessionId not found"));
    }

    Ok(ResponseData::Logout(LogoutResult::ok()))
}

/// Route a request to the identically named entity client operation
async fn execute_entity_request(client: Arc<dyn EntityClient>, request: RequestData) -> GatewayResult<ResponseData> {
    let response = match request.body {
        RequestBody::Find(q) => ResponseData::Find(client.find(q).await?),
        RequestBody::FindOne(q) => ResponseData::FindOne(client.find_one(q).await?),
        RequestBody::Get(q) => ResponseData::Get(client.get(q).await?),
        RequestBody::GetByIds(q) => ResponseData::GetByIds(client.get_by_ids(q).await?),
        RequestBody::Pull(q) => ResponseData::Pull(client.pull(q).await?),
        RequestBody::InsertOne(c) => ResponseData::InsertOne(client.insert_one(c).await?),
        RequestBody::InsertMulti(c) => ResponseData::InsertMulti(client.insert_multi(c).await?),
        RequestBody::InsertAndGet(c) => ResponseData::InsertAndGet(client.insert_and_get(c).await?),
        RequestBody::InsertAndGetMulti(c) => ResponseData::InsertAndGetMulti(client.insert_and_get_multi(c).await?),
        RequestBody::UpdateById(c) => ResponseData::UpdateById(client.update_by_id(c).await?),
        RequestBody::UpdateMulti(c) => ResponseData::UpdateMulti(client.update_multi(c).await?),
        RequestBody::UpdateAndGet(c) => ResponseData::UpdateAndGet(client.update_and_get(c).await?),
        RequestBody::UpdateAndFetch(c) => ResponseData::UpdateAndFetch(client.update_and_fetch(c).await?),
        RequestBody::Push(c) => ResponseData::Push(client.push(c).await?),
        RequestBody::Delete(c) => ResponseData::Delete(client.delete(c).await?),
        body @ (RequestBody::RunCustomQuery(_)
        | RequestBody::RunCustomCommand(_)
        | RequestBody::Login(_)
        | RequestBody::Logout(_)) => invalid_method(body.method()),
    };
    Ok(response)
}

/// Response for a method this executor does not serve
fn invalid_method(method: RequestMethod) -> ResponseData {
    ResponseData::Error(ServerError::not_found(format!("Invalid method name \"{}\".", method)))
}
