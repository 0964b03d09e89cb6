//! Request Dispatcher
//!
//! Single entry point for every request. Stages run in a fixed order:
//! Validate shape → Session → Resolve → Authorize → Normalize → Validate
//! → Execute → Publish diffs. Any failure short-circuits into an error
//! response; the dispatcher itself never returns `Err`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures_util::FutureExt;
use tracing::{debug, info, warn};

use super::direct_client::DirectClient;
use super::error::{ErrorType, GatewayResult, ServerError};
use super::registry::{ExecutorRegistry, FunctionalGroup};
use super::request::RequestData;
use super::response::ResponseData;
use super::session::Session;
use super::validator::{RequestValidator, StructuralValidator};
use crate::client::{EntityClient, SessionClient};
use crate::observability::{Event, MetricsRegistry};
use crate::versioning::{DefaultVersionDiffBuilder, VersionDiffBuilder, VersionDiffPublisher};

/// Routes requests to definition executors
pub struct RequestDispatcher {
    entity_client: Arc<dyn EntityClient>,
    session_client: Arc<dyn SessionClient>,
    registry: ExecutorRegistry,
    validator: Arc<dyn RequestValidator>,
    publisher: Option<Arc<dyn VersionDiffPublisher>>,
    diff_builder: Arc<dyn VersionDiffBuilder>,
    metrics: Arc<MetricsRegistry>,
}

impl RequestDispatcher {
    /// Start building a dispatcher over `group`
    pub fn builder(group: FunctionalGroup, entity_client: Arc<dyn EntityClient>) -> DispatcherBuilder {
        DispatcherBuilder {
            group,
            entity_client,
            session_client: None,
            validator: None,
            publisher: None,
            diff_builder: None,
            metrics: None,
        }
    }

    /// Dispatcher with default collaborators and no publisher
    pub fn new(group: FunctionalGroup, entity_client: Arc<dyn EntityClient>) -> Self {
        Self::builder(group, entity_client).build()
    }

    pub fn entity_client(&self) -> &Arc<dyn EntityClient> {
        &self.entity_client
    }

    pub fn session_client(&self) -> &Arc<dyn SessionClient> {
        &self.session_client
    }

    pub fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Typed client that calls this dispatcher in-process
    pub fn create_direct_client(self: &Arc<Self>) -> DirectClient {
        DirectClient::new(Arc::clone(self))
    }

    /// Handle one request. Failures become `error` responses.
    pub async fn handle_request_data(&self, request: RequestData) -> ResponseData {
        self.metrics.increment_requests_handled();

        let method = request.method();
        let name = request.name().to_string();
        debug!(event = %Event::RequestReceived, %method, %name);

        let response = match AssertUnwindSafe(self.run(request)).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => ResponseData::Error(e),
            Err(panic) => ResponseData::Error(ServerError::internal(panic_message(panic.as_ref()))),
        };

        match response.error() {
            Some(e) => {
                self.metrics.record_error(e.error_type);
                if e.error_type == ErrorType::InternalServer {
                    warn!(event = %Event::RequestFailed, %method, %name, error_type = %e.error_type, message = %e.message);
                } else {
                    info!(event = %Event::RequestFailed, %method, %name, error_type = %e.error_type, message = %e.message);
                }
            }
            None => {
                self.metrics.increment_requests_succeeded();
                debug!(event = %Event::RequestExecuted, %method, %name);
            }
        }

        response
    }

    async fn run(&self, request: RequestData) -> GatewayResult<ResponseData> {
        self.validator.assert_valid(&request).map_err(|e| ServerError {
            error_type: ErrorType::BadRequest,
            ..e
        })?;

        let session = self.resolve_session(request.session_id.as_deref()).await?;
        let session = session.as_ref();

        let executor = self.registry.resolve(request.method(), request.name())?;

        if !executor.authorize(&request, session).await? {
            info!(event = %Event::RequestUnauthorized, method = %request.method(), name = %request.name());
            return Err(ServerError::unauthorized("Authorization Required."));
        }

        let request = executor.normalize(request, session).await?;

        if let Err(e) = executor.validate(&request, session).await {
            info!(event = %Event::ValidationFailed, method = %request.method(), message = %e.message);
            return Err(e.into_validation_failure());
        }

        let normalized = self.publisher.as_ref().map(|_| request.clone());
        let response = executor.execute(request, session).await?;

        if let (Some(publisher), Some(normalized)) = (&self.publisher, normalized) {
            self.publish_diffs(publisher.as_ref(), &normalized, &response).await;
        }

        Ok(response)
    }

    /// Look up the request's session. Unknown and expired ids resolve to none.
    async fn resolve_session(&self, session_id: Option<&str>) -> GatewayResult<Option<Session>> {
        let Some(session_id) = session_id else {
            return Ok(None);
        };

        let session = self.session_client.get(session_id.to_string()).await?;
        match session {
            Some(session) if session.is_expired(Utc::now()) => {
                debug!(event = %Event::SessionExpired, session_id = %session.id);
                Ok(None)
            }
            session => Ok(session),
        }
    }

    /// Publish every diff in order. Failures are logged and counted, never
    /// surfaced in the response.
    async fn publish_diffs(&self, publisher: &dyn VersionDiffPublisher, request: &RequestData, response: &ResponseData) {
        for diff in self.diff_builder.build(request, response) {
            let (entity_name, id) = (diff.entity_name.clone(), diff.id.clone());
            match publisher.publish(diff).await {
                Ok(()) => {
                    self.metrics.increment_diffs_published();
                    debug!(event = %Event::DiffPublished, %entity_name, %id);
                }
                Err(e) => {
                    self.metrics.increment_diff_publish_failures();
                    warn!(event = %Event::DiffPublishFailed, %entity_name, %id, message = %e.message);
                }
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("Request handler panicked: {}", detail)
}

/// Builder for dispatcher construction
pub struct DispatcherBuilder {
    group: FunctionalGroup,
    entity_client: Arc<dyn EntityClient>,
    session_client: Option<Arc<dyn SessionClient>>,
    validator: Option<Arc<dyn RequestValidator>>,
    publisher: Option<Arc<dyn VersionDiffPublisher>>,
    diff_builder: Option<Arc<dyn VersionDiffBuilder>>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl DispatcherBuilder {
    /// Use a session store other than the entity client's own
    pub fn session_client(mut self, session_client: Arc<dyn SessionClient>) -> Self {
        self.session_client = Some(session_client);
        self
    }

    pub fn validator(mut self, validator: impl RequestValidator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Publish version diffs after successful mutations
    pub fn publisher(mut self, publisher: impl VersionDiffPublisher + 'static) -> Self {
        self.publisher = Some(Arc::new(publisher));
        self
    }

    pub fn diff_builder(mut self, diff_builder: impl VersionDiffBuilder + 'static) -> Self {
        self.diff_builder = Some(Arc::new(diff_builder));
        self
    }

    /// Share a metrics registry with the caller
    pub fn metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> RequestDispatcher {
        let session_client = self
            .session_client
            .unwrap_or_else(|| self.entity_client.create_session_client());
        let registry = ExecutorRegistry::build(self.group, &self.entity_client, &session_client);

        RequestDispatcher {
            entity_client: self.entity_client,
            session_client,
            registry,
            validator: self.validator.unwrap_or_else(|| Arc::new(StructuralValidator)),
            publisher: self.publisher,
            diff_builder: self.diff_builder.unwrap_or_else(|| Arc::new(DefaultVersionDiffBuilder)),
            metrics: self.metrics.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryEntityClient;
    use crate::core::definition::{EntityDefinition, WithHooks};
    use crate::core::request::{RequestBody, WhereQuery};
    use serde_json::json;

    fn find(entity_name: &str) -> RequestData {
        RequestData::new(RequestBody::Find(WhereQuery::new(entity_name, json!({}))))
    }

    #[tokio::test]
    async fn test_unknown_entity_is_not_found() {
        let dispatcher = RequestDispatcher::new(FunctionalGroup::new(), Arc::new(MemoryEntityClient::new()));

        let response = dispatcher.handle_request_data(find("post")).await;
        let err = response.error().unwrap();
        assert_eq!(err.error_type, ErrorType::NotFound);
        assert_eq!(err.message, "No entity name found: \"post\"");
        assert_eq!(dispatcher.metrics().snapshot().rejected_not_found, 1);
    }

    #[tokio::test]
    async fn test_default_hooks_execute() {
        let group = FunctionalGroup::new().with_entity("post", EntityDefinition::new());
        let dispatcher = RequestDispatcher::new(group, Arc::new(MemoryEntityClient::new()));

        let response = dispatcher.handle_request_data(find("post")).await;
        assert!(matches!(response, ResponseData::Find(_)));
        assert_eq!(dispatcher.metrics().snapshot().requests_succeeded, 1);
    }

    #[tokio::test]
    async fn test_panicking_hook_becomes_internal_error() {
        async fn explode(_: RequestData, _: Option<Session>) -> GatewayResult<bool> {
            panic!("boom")
        }

        let group = FunctionalGroup::new().with_entity("post", EntityDefinition::new().authorize(explode));
        let dispatcher = RequestDispatcher::new(group, Arc::new(MemoryEntityClient::new()));

        let response = dispatcher.handle_request_data(find("post")).await;
        let err = response.error().unwrap();
        assert_eq!(err.error_type, ErrorType::InternalServer);
        assert!(err.message.contains("boom"));
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "Request handler panicked: owned");
    }
}
