//! # Gateway Core
//!
//! Request model, definitions and the dispatch pipeline. Every request,
//! whatever its transport, goes through `RequestDispatcher`.
//!
//! ## Design Principles
//!
//! - One closed request model, one closed response model
//! - Definitions supply optional hooks; executors apply fixed defaults
//! - Registry is built once and read-only afterwards
//! - The dispatcher turns every failure into an `error` response

pub mod definition;
pub mod direct_client;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod method;
pub mod registry;
pub mod request;
pub mod response;
pub mod session;
pub mod validator;

pub use definition::{
    AuthenticationResult, CustomCommandDefinition, CustomDefinition, CustomQueryDefinition, EntityDefinition,
    Execution, UserDefinition, WithHooks,
};
pub use direct_client::DirectClient;
pub use dispatcher::{DispatcherBuilder, RequestDispatcher};
pub use error::{ErrorType, GatewayResult, ServerError};
pub use executor::{DefinitionExecutor, ExecutorKind};
pub use method::RequestMethod;
pub use registry::{ExecutorRegistry, FunctionalGroup};
pub use request::{RequestBody, RequestData};
pub use response::ResponseData;
pub use session::{PreSession, Session};
pub use validator::{RequestValidator, StructuralValidator};
