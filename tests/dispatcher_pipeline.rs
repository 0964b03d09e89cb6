//! Dispatcher Pipeline Tests
//!
//! End-to-end behaviour of `handle_request_data`:
//! - Resolution failures, authorization and validation short-circuits
//! - Login and logout through the standard user definition
//! - Version diff publication and publisher failures
//! - Session resolution

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Duration;
use futures_util::future::{self, BoxFuture};
use futures_util::FutureExt;
use serde_json::{json, Map, Value};

use entity_gateway::client::{EntityClient, MemoryEntityClient, SessionClient};
use entity_gateway::core::request::{
    CustomPayload, IdQuery, IdUpdateCommand, IdsQuery, LoginCommand, LogoutCommand, MultiUpdateCommand,
    PushCommand, SingleInsertCommand, WhereQuery,
};
use entity_gateway::core::{
    CustomDefinition, EntityDefinition, ErrorType, FunctionalGroup, GatewayResult, PreSession, RequestBody,
    RequestData, RequestDispatcher, ResponseData, ServerError, WithHooks,
};
use entity_gateway::standards::StandardUserDefinition;
use entity_gateway::versioning::{ChannelVersionDiffPublisher, VersionDiff, VersionDiffPublisher};

struct FailingPublisher;

impl VersionDiffPublisher for FailingPublisher {
    fn publish(&self, _diff: VersionDiff) -> BoxFuture<'_, GatewayResult<()>> {
        future::ready(Err(ServerError::internal("broker unavailable"))).boxed()
    }
}

fn request(body: RequestBody) -> RequestData {
    RequestData::new(body)
}

fn insert(entity_name: &str, value: Value) -> RequestData {
    request(RequestBody::InsertOne(SingleInsertCommand::new(entity_name, value)))
}

fn credentials(email: &str, password: &str) -> Map<String, Value> {
    let mut credentials = Map::new();
    credentials.insert("email".into(), json!(email));
    credentials.insert("password".into(), json!(password));
    credentials
}

fn standard_user_dispatcher() -> RequestDispatcher {
    let client: Arc<dyn EntityClient> = Arc::new(MemoryEntityClient::new());
    let user = StandardUserDefinition::new(Arc::clone(&client), "email", "password").build();
    let group = FunctionalGroup::new()
        .with_user("user", user)
        .with_entity("post", EntityDefinition::new());
    RequestDispatcher::new(group, client)
}

// =============================================================================
// Resolution
// =============================================================================

#[tokio::test]
async fn test_unknown_names_are_not_found() {
    let dispatcher = RequestDispatcher::new(FunctionalGroup::new(), Arc::new(MemoryEntityClient::new()));

    let cases = [
        (request(RequestBody::Get(IdQuery::new("post", "p1"))), "No entity name found: \"post\""),
        (
            request(RequestBody::Login(LoginCommand::new("user", credentials("a", "b")))),
            "No user entity name found: \"user\"",
        ),
        (
            request(RequestBody::RunCustomQuery(CustomPayload::new("stats", json!({})))),
            "No custom query name found: \"stats\"",
        ),
        (
            request(RequestBody::RunCustomCommand(CustomPayload::new("reset", json!({})))),
            "No custom command name found: \"reset\"",
        ),
    ];

    for (req, message) in cases {
        let response = dispatcher.handle_request_data(req).await;
        let err = response.error().unwrap();
        assert_eq!(err.error_type, ErrorType::NotFound);
        assert_eq!(err.message, message);
    }
    assert_eq!(dispatcher.metrics().snapshot().rejected_not_found, 4);
}

#[tokio::test]
async fn test_user_entity_serves_crud_methods() {
    let dispatcher = standard_user_dispatcher();

    let response = dispatcher
        .handle_request_data(insert("user", json!({"id": "u1", "email": "a@b.c", "password": "secret"})))
        .await;
    assert!(matches!(response, ResponseData::InsertOne(_)));

    match dispatcher.handle_request_data(request(RequestBody::Get(IdQuery::new("user", "u1")))).await {
        ResponseData::Get(result) => {
            assert_eq!(result.entity["email"], "a@b.c");
            assert!(result.entity.get("password").is_none());
        }
        other => panic!("unexpected response {:?}", other),
    }
}

#[tokio::test]
async fn test_structural_failure_is_bad_request() {
    let dispatcher = standard_user_dispatcher();

    let response = dispatcher
        .handle_request_data(request(RequestBody::GetByIds(IdsQuery {
            entity_name: "post".into(),
            ids: Vec::new(),
        })))
        .await;

    assert_eq!(response.error().unwrap().error_type, ErrorType::BadRequest);
}

// =============================================================================
// Authorization and Validation
// =============================================================================

#[tokio::test]
async fn test_unauthorized_never_normalizes_or_executes() {
    let executed = Arc::new(AtomicUsize::new(0));
    let normalized = Arc::new(AtomicUsize::new(0));

    let execute_count = Arc::clone(&executed);
    let normalize_count = Arc::clone(&normalized);
    let definition = CustomDefinition::new(move |_payload, _session| {
        execute_count.fetch_add(1, Ordering::SeqCst);
        async move { Ok(json!(true)) }
    })
    .authorize(|_request, session| async move { Ok(session.is_some()) })
    .normalize(move |request, _session| {
        normalize_count.fetch_add(1, Ordering::SeqCst);
        async move { Ok(request) }
    });

    let group = FunctionalGroup::new().with_custom_command("reset", definition);
    let dispatcher = RequestDispatcher::new(group, Arc::new(MemoryEntityClient::new()));

    let response = dispatcher
        .handle_request_data(request(RequestBody::RunCustomCommand(CustomPayload::new("reset", json!({})))))
        .await;

    let err = response.error().unwrap();
    assert_eq!(err.error_type, ErrorType::Unauthorized);
    assert_eq!(err.message, "Authorization Required.");
    assert_eq!(executed.load(Ordering::SeqCst), 0);
    assert_eq!(normalized.load(Ordering::SeqCst), 0);
    assert_eq!(dispatcher.metrics().snapshot().rejected_unauthorized, 1);
}

#[tokio::test]
async fn test_validate_runs_once_on_normalized_request() {
    let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);
    let definition = EntityDefinition::new()
        .normalize(|mut request, _session| async move {
            if let RequestBody::InsertOne(command) = &mut request.body {
                command.value["slug"] = json!("hello");
            }
            Ok(request)
        })
        .validate(move |request, _session| {
            if let RequestBody::InsertOne(command) = &request.body {
                record.lock().unwrap().push(command.value.clone());
            }
            async move { Ok(()) }
        });
    let group = FunctionalGroup::new().with_entity("post", definition);
    let dispatcher = RequestDispatcher::new(group, Arc::new(MemoryEntityClient::new()));

    let response = dispatcher.handle_request_data(insert("post", json!({"id": "p1"}))).await;
    assert!(!response.is_error());

    assert_eq!(*seen.lock().unwrap(), vec![json!({"id": "p1", "slug": "hello"})]);
}

#[tokio::test]
async fn test_custom_query_ignores_wrap_execution() {
    let definition = CustomDefinition::new(|_payload, _session| async move { Ok(json!("executed")) })
        .wrap_execution(|_request, _session, _execution| async move {
            Ok(ResponseData::RunCustomQuery(json!("wrapped")))
        });
    let group = FunctionalGroup::new().with_custom_query("stats", definition);
    let dispatcher = RequestDispatcher::new(group, Arc::new(MemoryEntityClient::new()));

    let response = dispatcher
        .handle_request_data(request(RequestBody::RunCustomQuery(CustomPayload::new("stats", json!({})))))
        .await;

    assert_eq!(response, ResponseData::RunCustomQuery(json!("executed")));
}

#[tokio::test]
async fn test_validation_failure_is_bad_request() {
    let definition = EntityDefinition::new().validate(|request, _session| async move {
        match &request.body {
            RequestBody::InsertOne(command) if command.value.get("title").is_none() => {
                Err(ServerError::unauthorized("title is required"))
            }
            _ => Ok(()),
        }
    });
    let client = Arc::new(MemoryEntityClient::new());
    let group = FunctionalGroup::new().with_entity("post", definition);
    let dispatcher = RequestDispatcher::new(group, client.clone());

    let response = dispatcher.handle_request_data(insert("post", json!({"id": "p1"}))).await;
    let err = response.error().unwrap();
    assert_eq!(err.error_type, ErrorType::BadRequest);
    assert_eq!(err.message, "Validation Failed. title is required");
    assert_eq!(client.count("post"), 0);

    let response = dispatcher
        .handle_request_data(insert("post", json!({"id": "p1", "title": "ok"})))
        .await;
    assert!(!response.is_error());
    assert_eq!(client.count("post"), 1);
}

#[tokio::test]
async fn test_validate_sees_normalized_request() {
    let definition = EntityDefinition::new()
        .normalize(|mut request, _session| async move {
            if let RequestBody::InsertOne(command) = &mut request.body {
                command.value["title"] = json!("untitled");
            }
            Ok(request)
        })
        .validate(|request, _session| async move {
            match &request.body {
                RequestBody::InsertOne(command) if command.value.get("title").is_none() => {
                    Err(ServerError::bad_request("title is required"))
                }
                _ => Ok(()),
            }
        });
    let group = FunctionalGroup::new().with_entity("post", definition);
    let dispatcher = RequestDispatcher::new(group, Arc::new(MemoryEntityClient::new()));

    match dispatcher.handle_request_data(insert("post", json!({"id": "p1"}))).await {
        ResponseData::InsertOne(result) => assert_eq!(result.id, "p1"),
        other => panic!("unexpected response {:?}", other),
    }
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_login_logout_flow() {
    let dispatcher = standard_user_dispatcher();
    dispatcher
        .handle_request_data(insert("user", json!({"id": "u1", "email": "a@b.c", "password": "secret"})))
        .await;

    let bad = dispatcher
        .handle_request_data(request(RequestBody::Login(LoginCommand::new("user", credentials("a@b.c", "nope")))))
        .await;
    assert_eq!(bad.error().unwrap().error_type, ErrorType::Unauthorized);

    let login = match dispatcher
        .handle_request_data(request(RequestBody::Login(LoginCommand::new("user", credentials("a@b.c", "secret")))))
        .await
    {
        ResponseData::Login(login) => login,
        other => panic!("unexpected response {:?}", other),
    };
    assert_eq!(login.session.user_id, "u1");
    assert!(login.user.unwrap().get("password").is_none());

    let logout = request(RequestBody::Logout(LogoutCommand::new("user", login.session.id.clone())));
    let response = dispatcher.handle_request_data(logout.clone()).await;
    assert!(matches!(response, ResponseData::Logout(ref r) if r.ok == 1));

    let response = dispatcher.handle_request_data(logout).await;
    let err = response.error().unwrap();
    assert_eq!(err.error_type, ErrorType::BadRequest);
    assert_eq!(err.message, "sessionId not found");
}

#[tokio::test]
async fn test_hooks_receive_resolved_session() {
    let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);
    let definition = EntityDefinition::new().authorize(move |_request, session| {
        record.lock().unwrap().push(session.map(|s| s.user_id));
        async move { Ok(true) }
    });

    let client = Arc::new(MemoryEntityClient::new());
    let sessions = client.sessions();
    let group = FunctionalGroup::new().with_entity("post", definition);
    let dispatcher = RequestDispatcher::new(group, client);

    let live = sessions
        .create(PreSession::new("user", "u1", Duration::hours(1)))
        .await
        .unwrap();
    let expired = sessions
        .create(PreSession::new("user", "u2", Duration::seconds(-1)))
        .await
        .unwrap();

    let find = || request(RequestBody::Find(WhereQuery::new("post", json!({}))));
    dispatcher.handle_request_data(find().with_session(live.id)).await;
    dispatcher.handle_request_data(find().with_session(expired.id)).await;
    dispatcher.handle_request_data(find().with_session("unknown")).await;
    dispatcher.handle_request_data(find()).await;

    assert_eq!(*seen.lock().unwrap(), vec![Some("u1".to_string()), None, None, None]);
}

// =============================================================================
// Version Diffs
// =============================================================================

#[tokio::test]
async fn test_updates_publish_diffs() {
    let (publisher, mut receiver) = ChannelVersionDiffPublisher::channel();
    let client = Arc::new(MemoryEntityClient::new());
    let group = FunctionalGroup::new().with_entity("post", EntityDefinition::new());
    let dispatcher = RequestDispatcher::builder(group, client).publisher(publisher).build();

    let inserted = match dispatcher.handle_request_data(insert("post", json!({"id": "p1", "likes": 0}))).await {
        ResponseData::InsertOne(result) => result,
        other => panic!("unexpected response {:?}", other),
    };
    assert!(receiver.try_recv().is_err());

    let operation = json!({"$inc": {"likes": 1}});
    let updated = match dispatcher
        .handle_request_data(request(RequestBody::UpdateById(IdUpdateCommand::new("post", "p1", operation.clone()))))
        .await
    {
        ResponseData::UpdateById(result) => result,
        other => panic!("unexpected response {:?}", other),
    };

    let diff = receiver.try_recv().unwrap();
    assert_eq!(diff.entity_name, "post");
    assert_eq!(diff.id, "p1");
    assert_eq!(diff.prev_version_id, inserted.version_id);
    assert_eq!(diff.version_id, updated.version_id);
    assert_eq!(diff.operation, operation);
    assert!(receiver.try_recv().is_err());
    assert_eq!(dispatcher.metrics().snapshot().diffs_published, 1);
}

#[tokio::test]
async fn test_multi_update_and_push_publish_per_id() {
    let (publisher, mut receiver) = ChannelVersionDiffPublisher::channel();
    let client = Arc::new(MemoryEntityClient::new());
    client
        .seed("post", vec![json!({"id": "p1", "tag": "a"}), json!({"id": "p2", "tag": "a"})])
        .unwrap();
    let group = FunctionalGroup::new().with_entity("post", EntityDefinition::new());
    let dispatcher = RequestDispatcher::builder(group, client).publisher(publisher).build();

    let response = dispatcher
        .handle_request_data(request(RequestBody::UpdateMulti(MultiUpdateCommand {
            entity_name: "post".into(),
            where_: json!({"tag": "a"}),
            operation: json!({"$set": {"seen": true}}),
        })))
        .await;
    assert!(matches!(response, ResponseData::UpdateMulti(ref r) if r.n == 2));

    let mut ids = vec![receiver.try_recv().unwrap().id, receiver.try_recv().unwrap().id];
    ids.sort();
    assert_eq!(ids, vec!["p1", "p2"]);

    let version_id = match dispatcher.handle_request_data(request(RequestBody::Get(IdQuery::new("post", "p1")))).await {
        ResponseData::Get(result) => result.version_id,
        other => panic!("unexpected response {:?}", other),
    };
    let operations = vec![json!({"$set": {"title": "x"}}), json!({"$set": {"title": "y"}})];
    let response = dispatcher
        .handle_request_data(request(RequestBody::Push(PushCommand {
            entity_name: "post".into(),
            id: "p1".into(),
            version_id,
            operations: operations.clone(),
        })))
        .await;
    assert!(matches!(response, ResponseData::Push(_)));

    let diff = receiver.try_recv().unwrap();
    assert_eq!(diff.operation, Value::Array(operations));
    assert!(receiver.try_recv().is_err());
}

#[tokio::test]
async fn test_publisher_failure_does_not_change_response() {
    let client = Arc::new(MemoryEntityClient::new());
    client.seed("post", vec![json!({"id": "p1", "likes": 0})]).unwrap();
    let group = FunctionalGroup::new().with_entity("post", EntityDefinition::new());
    let dispatcher = RequestDispatcher::builder(group, client).publisher(FailingPublisher).build();

    let response = dispatcher
        .handle_request_data(request(RequestBody::UpdateAndGet(IdUpdateCommand::new(
            "post",
            "p1",
            json!({"$inc": {"likes": 2}}),
        ))))
        .await;

    match response {
        ResponseData::UpdateAndGet(result) => assert_eq!(result.entity["likes"], 2),
        other => panic!("unexpected response {:?}", other),
    }

    let snapshot = dispatcher.metrics().snapshot();
    assert_eq!(snapshot.requests_succeeded, 1);
    assert_eq!(snapshot.diff_publish_failures, 1);
    assert_eq!(snapshot.diffs_published, 0);
}

#[tokio::test]
async fn test_failed_update_publishes_nothing() {
    let (publisher, mut receiver) = ChannelVersionDiffPublisher::channel();
    let group = FunctionalGroup::new().with_entity("post", EntityDefinition::new());
    let dispatcher = RequestDispatcher::builder(group, Arc::new(MemoryEntityClient::new()))
        .publisher(publisher)
        .build();

    let response = dispatcher
        .handle_request_data(request(RequestBody::UpdateById(IdUpdateCommand::new(
            "post",
            "missing",
            json!({"$set": {"a": 1}}),
        ))))
        .await;

    assert_eq!(response.error().unwrap().error_type, ErrorType::NotFound);
    assert!(receiver.try_recv().is_err());
}

// =============================================================================
// Direct Client
// =============================================================================

#[tokio::test]
async fn test_direct_client_runs_full_pipeline() {
    let definition = CustomDefinition::new(|payload, session| async move {
        Ok(json!({"params": payload.params, "user": session.map(|s| s.user_id)}))
    });
    let group = FunctionalGroup::new().with_custom_query("whoami", definition);
    let client = Arc::new(MemoryEntityClient::new());
    let sessions = client.sessions();
    let dispatcher = Arc::new(RequestDispatcher::new(group, client));

    let session = sessions
        .create(PreSession::new("user", "u1", Duration::hours(1)))
        .await
        .unwrap();
    let direct = dispatcher.create_direct_client().with_session(session.id);

    let result = direct
        .run_custom_query(CustomPayload::new("whoami", json!({"x": 1})))
        .await
        .unwrap();
    assert_eq!(result, json!({"params": {"x": 1}, "user": "u1"}));

    let err = direct
        .run_custom_command(CustomPayload::new("whoami", json!({})))
        .await
        .unwrap_err();
    assert_eq!(err.error_type, ErrorType::NotFound);
}
