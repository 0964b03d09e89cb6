//! Executor Registry
//!
//! Built once from a functional group and read-only afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use crate::client::{EntityClient, SessionClient};

use super::definition::{CustomCommandDefinition, CustomQueryDefinition, EntityDefinition, UserDefinition};
use super::error::{GatewayResult, ServerError};
use super::executor::DefinitionExecutor;
use super::method::RequestMethod;

/// Integrator-supplied definitions, partitioned by kind
#[derive(Debug, Default)]
pub struct FunctionalGroup {
    pub users: HashMap<String, UserDefinition>,
    pub non_users: HashMap<String, EntityDefinition>,
    pub custom_queries: HashMap<String, CustomQueryDefinition>,
    pub custom_commands: HashMap<String, CustomCommandDefinition>,
}

impl FunctionalGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, name: impl Into<String>, definition: UserDefinition) -> Self {
        self.users.insert(name.into(), definition);
        self
    }

    pub fn with_entity(mut self, name: impl Into<String>, definition: EntityDefinition) -> Self {
        self.non_users.insert(name.into(), definition);
        self
    }

    pub fn with_custom_query(mut self, name: impl Into<String>, definition: CustomQueryDefinition) -> Self {
        self.custom_queries.insert(name.into(), definition);
        self
    }

    pub fn with_custom_command(mut self, name: impl Into<String>, definition: CustomCommandDefinition) -> Self {
        self.custom_commands.insert(name.into(), definition);
        self
    }
}

/// Executors keyed by kind and name
pub struct ExecutorRegistry {
    users: HashMap<String, DefinitionExecutor>,
    entities: HashMap<String, DefinitionExecutor>,
    custom_queries: HashMap<String, DefinitionExecutor>,
    custom_commands: HashMap<String, DefinitionExecutor>,
}

impl ExecutorRegistry {
    /// Wrap every definition of `group` in its executor
    pub fn build(
        group: FunctionalGroup,
        entity_client: &Arc<dyn EntityClient>,
        session_client: &Arc<dyn SessionClient>,
    ) -> Self {
        let mut users = HashMap::with_capacity(group.users.len());
        for (name, definition) in group.users {
            let executor =
                DefinitionExecutor::user(definition, Arc::clone(entity_client), Arc::clone(session_client));
            users.insert(name, executor);
        }

        let mut entities = HashMap::with_capacity(group.non_users.len());
        for (name, definition) in group.non_users {
            entities.insert(name, DefinitionExecutor::entity(definition, Arc::clone(entity_client)));
        }

        let mut custom_queries = HashMap::with_capacity(group.custom_queries.len());
        for (name, definition) in group.custom_queries {
            custom_queries.insert(name, DefinitionExecutor::custom_query(definition));
        }

        let mut custom_commands = HashMap::with_capacity(group.custom_commands.len());
        for (name, definition) in group.custom_commands {
            custom_commands.insert(name, DefinitionExecutor::custom_command(definition));
        }

        Self {
            users,
            entities,
            custom_queries,
            custom_commands,
        }
    }

    /// Select the executor serving `method` on `name`.
    ///
    /// Login and logout only reach users. Entity methods try plain entities
    /// first, then users.
    pub fn resolve(&self, method: RequestMethod, name: &str) -> GatewayResult<&DefinitionExecutor> {
        match method {
            RequestMethod::Login | RequestMethod::Logout => self
                .users
                .get(name)
                .ok_or_else(|| ServerError::not_found(format!("No user entity name found: \"{}\"", name))),
            RequestMethod::RunCustomQuery => self
                .custom_queries
                .get(name)
                .ok_or_else(|| ServerError::not_found(format!("No custom query name found: \"{}\"", name))),
            RequestMethod::RunCustomCommand => self
                .custom_commands
                .get(name)
                .ok_or_else(|| ServerError::not_found(format!("No custom command name found: \"{}\"", name))),
            _ => self
                .entities
                .get(name)
                .or_else(|| self.users.get(name))
                .ok_or_else(|| ServerError::not_found(format!("No entity name found: \"{}\"", name))),
        }
    }

    pub fn user_names(&self) -> impl Iterator<Item = &str> {
        self.users.keys().map(String::as_str)
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Total number of executors
    pub fn len(&self) -> usize {
        self.users.len() + self.entities.len() + self.custom_queries.len() + self.custom_commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
