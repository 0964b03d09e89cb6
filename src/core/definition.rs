//! Definitions
//!
//! Integrator-supplied bundles of pipeline hooks, one per entity, user
//! entity, custom query or custom command name. Every hook is optional
//! except `authenticate` (users) and `execute` (custom handlers); an
//! executor applies a fixed default for any hook left out.
//!
//! Hooks receive owned values and return boxed futures, so closures can
//! move what they capture into `async` blocks:
//!
//! ```ignore
//! let def = EntityDefinition::new()
//!     .authorize(|_req, session| async move { Ok(session.is_some()) });
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;

use super::error::GatewayResult;
use super::request::{CustomPayload, LoginCommand, RequestData};
use super::response::ResponseData;
use super::session::{PreSession, Session};

/// Decides whether a request may proceed
pub type AuthorizeHook =
    Arc<dyn Fn(RequestData, Option<Session>) -> BoxFuture<'static, GatewayResult<bool>> + Send + Sync>;

/// Rewrites a request before validation and execution
pub type NormalizeHook = Arc<
    dyn Fn(RequestData, Option<Session>) -> BoxFuture<'static, GatewayResult<RequestData>> + Send + Sync,
>;

/// Rejects invalid requests
pub type ValidateHook =
    Arc<dyn Fn(RequestData, Option<Session>) -> BoxFuture<'static, GatewayResult<()>> + Send + Sync>;

/// Owns response production, with access to the default execution
pub type WrapExecutionHook = Arc<
    dyn Fn(RequestData, Option<Session>, Execution) -> BoxFuture<'static, GatewayResult<ResponseData>>
        + Send
        + Sync,
>;

/// Checks login credentials for a user entity
pub type AuthenticateHook = Arc<
    dyn Fn(LoginCommand, Option<Session>) -> BoxFuture<'static, GatewayResult<AuthenticationResult>>
        + Send
        + Sync,
>;

/// Runs a custom query or command
pub type CustomExecuteHook =
    Arc<dyn Fn(CustomPayload, Option<Session>) -> BoxFuture<'static, GatewayResult<Value>> + Send + Sync>;

type ExecutionFn = dyn Fn(RequestData, Option<Session>) -> BoxFuture<'static, GatewayResult<ResponseData>>
    + Send
    + Sync;

/// Handle to an executor's default execution, passed to wrap hooks
#[derive(Clone)]
pub struct Execution {
    run: Arc<ExecutionFn>,
}

impl Execution {
    /// Wrap an execution function
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(RequestData, Option<Session>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<ResponseData>> + Send + 'static,
    {
        Self {
            run: Arc::new(move |request, session| f(request, session).boxed()),
        }
    }

    /// Run the default execution
    pub async fn run(&self, request: RequestData, session: Option<Session>) -> GatewayResult<ResponseData> {
        (self.run)(request, session).await
    }
}

impl fmt::Debug for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Execution")
    }
}

/// Output of a successful `authenticate` hook
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticationResult {
    /// The authenticated user entity
    pub user: Option<Value>,

    /// Version of the user entity
    pub version_id: Option<String>,

    /// Session to materialize in the session store
    pub pre_session: PreSession,
}

/// Optional hooks shared by every definition kind
#[derive(Clone, Default)]
pub struct Hooks {
    pub(crate) authorize: Option<AuthorizeHook>,
    pub(crate) normalize: Option<NormalizeHook>,
    pub(crate) validate: Option<ValidateHook>,
    pub(crate) wrap_execution: Option<WrapExecutionHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("authorize", &self.authorize.is_some())
            .field("normalize", &self.normalize.is_some())
            .field("validate", &self.validate.is_some())
            .field("wrap_execution", &self.wrap_execution.is_some())
            .finish()
    }
}

/// Builder methods for the optional hooks of a definition
pub trait WithHooks: Sized {
    fn hooks(&self) -> &Hooks;

    fn hooks_mut(&mut self) -> &mut Hooks;

    /// Set the authorize hook
    fn authorize<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RequestData, Option<Session>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<bool>> + Send + 'static,
    {
        let hook: AuthorizeHook = Arc::new(move |request, session| f(request, session).boxed());
        self.hooks_mut().authorize = Some(hook);
        self
    }

    /// Set the normalize hook
    fn normalize<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RequestData, Option<Session>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<RequestData>> + Send + 'static,
    {
        let hook: NormalizeHook = Arc::new(move |request, session| f(request, session).boxed());
        self.hooks_mut().normalize = Some(hook);
        self
    }

    /// Set the validate hook
    fn validate<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RequestData, Option<Session>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<()>> + Send + 'static,
    {
        let hook: ValidateHook = Arc::new(move |request, session| f(request, session).boxed());
        self.hooks_mut().validate = Some(hook);
        self
    }

    /// Set the wrap-execution hook
    fn wrap_execution<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RequestData, Option<Session>, Execution) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<ResponseData>> + Send + 'static,
    {
        let hook: WrapExecutionHook =
            Arc::new(move |request, session, execution| f(request, session, execution).boxed());
        self.hooks_mut().wrap_execution = Some(hook);
        self
    }
}

/// Definition of a plain (non-user) entity
#[derive(Debug, Clone, Default)]
pub struct EntityDefinition {
    hooks: Hooks,
}

impl EntityDefinition {
    /// Definition with every hook defaulted
    pub fn new() -> Self {
        Self::default()
    }
}

impl WithHooks for EntityDefinition {
    fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }
}

/// Definition of a user entity: entity hooks plus `authenticate`
#[derive(Clone)]
pub struct UserDefinition {
    hooks: Hooks,
    pub(crate) authenticate: AuthenticateHook,
}

impl UserDefinition {
    /// Create a user definition around its authenticate hook
    pub fn new<F, Fut>(authenticate: F) -> Self
    where
        F: Fn(LoginCommand, Option<Session>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<AuthenticationResult>> + Send + 'static,
    {
        Self {
            hooks: Hooks::default(),
            authenticate: Arc::new(move |command, session| authenticate(command, session).boxed()),
        }
    }
}

impl WithHooks for UserDefinition {
    fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }
}

impl fmt::Debug for UserDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserDefinition")
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// Definition of a custom query or custom command.
///
/// `execute` always runs; a `wrap_execution` hook set on a custom
/// definition is never consulted.
#[derive(Clone)]
pub struct CustomDefinition {
    hooks: Hooks,
    pub(crate) execute: CustomExecuteHook,
}

/// Definition of a named custom query
pub type CustomQueryDefinition = CustomDefinition;

/// Definition of a named custom command
pub type CustomCommandDefinition = CustomDefinition;

impl CustomDefinition {
    /// Create a custom definition around its execute hook
    pub fn new<F, Fut>(execute: F) -> Self
    where
        F: Fn(CustomPayload, Option<Session>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<Value>> + Send + 'static,
    {
        Self {
            hooks: Hooks::default(),
            execute: Arc::new(move |payload, session| execute(payload, session).boxed()),
        }
    }
}

impl WithHooks for CustomDefinition {
    fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }
}

impl fmt::Debug for CustomDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomDefinition")
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}
