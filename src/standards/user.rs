//! Standard user definition
//!
//! Account/password login against entities stored through the entity
//! client, with passwords hashed on write and stripped on read.

use std::sync::Arc;

use chrono::Duration;
use serde_json::Value;

use super::password::{
    encrypt_password_in_request_data, hash_password, remove_password_from_response_data,
    remove_password_from_response_entity, verify_password,
};
use crate::client::EntityClient;
use crate::core::definition::{AuthenticationResult, UserDefinition, WithHooks};
use crate::core::error::{ErrorType, GatewayResult, ServerError};
use crate::core::request::{LoginCommand, WhereQuery};
use crate::core::session::PreSession;

/// Default session lifetime
pub const DEFAULT_SESSION_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Builder for a user definition with account/password authentication
#[derive(Clone)]
pub struct StandardUserDefinition {
    entity_client: Arc<dyn EntityClient>,
    account_prop: String,
    password_prop: String,
    session_ttl: Duration,
}

impl StandardUserDefinition {
    pub fn new(
        entity_client: Arc<dyn EntityClient>,
        account_prop: impl Into<String>,
        password_prop: impl Into<String>,
    ) -> Self {
        Self {
            entity_client,
            account_prop: account_prop.into(),
            password_prop: password_prop.into(),
            session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
        }
    }

    /// Lifetime of sessions created on login
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Check credentials and produce the pre-session
    pub async fn authenticate(&self, command: LoginCommand) -> GatewayResult<AuthenticationResult> {
        let (account, password) = match (
            command.credential(&self.account_prop),
            command.credential(&self.password_prop),
        ) {
            (Some(account), Some(password)) => (account.to_string(), password.to_string()),
            _ => {
                return Err(ServerError::bad_request(format!(
                    "Credentials must include \"{}\" and \"{}\"",
                    self.account_prop, self.password_prop
                )))
            }
        };

        let mut where_ = serde_json::Map::new();
        where_.insert(self.account_prop.clone(), Value::String(account));
        let query = WhereQuery::new(command.entity_name.clone(), Value::Object(where_));

        let found = match self.entity_client.find_one(query).await {
            Ok(found) => found,
            Err(e) if e.error_type == ErrorType::NotFound => return Err(invalid_credentials()),
            Err(e) => return Err(e),
        };

        let stored = found.entity.get(&self.password_prop).and_then(Value::as_str).unwrap_or_default();
        if !verify_password(&password, stored) {
            return Err(invalid_credentials());
        }

        let user_id = found
            .entity
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ServerError::internal("User entity has no id"))?
            .to_string();

        Ok(AuthenticationResult {
            user: Some(remove_password_from_response_entity(found.entity, &self.password_prop)),
            version_id: Some(found.version_id),
            pre_session: PreSession::new(command.entity_name, user_id, self.session_ttl),
        })
    }

    /// Assemble the user definition
    pub fn build(self) -> UserDefinition {
        let this = Arc::new(self);

        let auth = Arc::clone(&this);
        let normalize_prop = this.password_prop.clone();
        let strip_prop = this.password_prop.clone();

        UserDefinition::new(move |command, _session| {
            let auth = Arc::clone(&auth);
            async move { auth.authenticate(command).await }
        })
        .normalize(move |request, _session| {
            let result = encrypt_password_in_request_data(request, &normalize_prop, hash_password);
            async move { result }
        })
        .wrap_execution(move |request, session, execution| {
            let strip_prop = strip_prop.clone();
            async move {
                let response = execution.run(request, session).await?;
                Ok::<_, ServerError>(remove_password_from_response_data(response, &strip_prop))
            }
        })
    }
}

fn invalid_credentials() -> ServerError {
    ServerError::unauthorized("Invalid credentials")
}
