//! CLI command implementations
//!
//! Both commands follow the same boot sequence:
//! 1. Configuration load and validation
//! 2. Logging initialization
//! 3. Dispatcher assembly (definitions, entity client, diff publisher)
//! 4. Seeding through the dispatcher
//!
//! Request failures are written as `error` responses. Only boot and I/O
//! failures end the process.

use std::path::Path;
use std::sync::Arc;

use chrono::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use super::args::Command;
use super::config::GatewayConfig;
use super::errors::{CliError, CliResult};
use super::io::{parse_request, read_request_file, read_request_line, write_response};
use crate::client::{EntityClient, MemoryEntityClient};
use crate::core::definition::EntityDefinition;
use crate::core::dispatcher::RequestDispatcher;
use crate::core::registry::FunctionalGroup;
use crate::core::request::{MultiInsertCommand, RequestBody, RequestData};
use crate::core::response::ResponseData;
use crate::observability::{init_tracing, Event};
use crate::standards::StandardUserDefinition;
use crate::versioning::{ChannelVersionDiffPublisher, DiffReceiver};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub async fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command).await
}

/// Run the appropriate command based on CLI args
pub async fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Dispatch { config, request } => dispatch(&config, request.as_deref()).await,
        Command::Serve { config } => serve(&config).await,
    }
}

/// Handle a single request and exit
pub async fn dispatch(config_path: &Path, request_path: Option<&Path>) -> CliResult<()> {
    let dispatcher = boot(config_path).await?;

    let input = match request_path {
        Some(path) => read_request_file(path)?,
        None => {
            let mut stdin = BufReader::new(tokio::io::stdin());
            read_request_line(&mut stdin).await?
        }
    };

    let response = handle_line(&dispatcher, &input).await;
    write_response(&mut std::io::stdout().lock(), &response)
}

/// Handle JSON-lines requests from stdin until EOF
pub async fn serve(config_path: &Path) -> CliResult<()> {
    let dispatcher = boot(config_path).await?;
    info!(event = %Event::Serving, "reading requests from stdin");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    serve_lines(&dispatcher, stdin, &mut stdout).await?;

    let snapshot = dispatcher.metrics().snapshot();
    info!(
        event = %Event::ShutdownComplete,
        handled = snapshot.requests_handled,
        succeeded = snapshot.requests_succeeded,
        errors = snapshot.errors(),
    );
    Ok(())
}

/// Answer every non-blank line of `reader` with one response line
pub async fn serve_lines<R, W>(dispatcher: &RequestDispatcher, reader: R, writer: &mut W) -> CliResult<()>
where
    R: AsyncBufRead + Unpin,
    W: std::io::Write,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(dispatcher, &line).await;
        write_response(writer, &response)?;
    }
    Ok(())
}

async fn handle_line(dispatcher: &RequestDispatcher, line: &str) -> ResponseData {
    match parse_request(line) {
        Ok(request) => dispatcher.handle_request_data(request).await,
        Err(e) => {
            dispatcher.metrics().increment_requests_handled();
            dispatcher.metrics().record_error(e.error_type);
            ResponseData::Error(e)
        }
    }
}

async fn boot(config_path: &Path) -> CliResult<Arc<RequestDispatcher>> {
    let config = GatewayConfig::load(config_path)?;
    init_tracing(&config.log_filter).map_err(CliError::config_error)?;
    info!(event = %Event::ConfigLoaded, path = %config_path.display());

    build_dispatcher(&config).await
}

/// Assemble a dispatcher from configuration and insert the seed entities.
///
/// When diff publication is enabled, diffs are drained by a background task
/// that logs each one. Must be called inside a tokio runtime.
pub async fn build_dispatcher(config: &GatewayConfig) -> CliResult<Arc<RequestDispatcher>> {
    let entity_client: Arc<dyn EntityClient> = Arc::new(MemoryEntityClient::new());
    let ttl = Duration::seconds(config.session_ttl_secs);

    let mut group = FunctionalGroup::new();
    for user in &config.users {
        let definition =
            StandardUserDefinition::new(Arc::clone(&entity_client), &user.account_prop, &user.password_prop)
                .session_ttl(ttl)
                .build();
        group = group.with_user(&user.name, definition);
    }
    for name in &config.entities {
        group = group.with_entity(name, EntityDefinition::new());
    }

    let mut builder = RequestDispatcher::builder(group, entity_client);
    if config.publish_version_diffs {
        let (publisher, receiver) = ChannelVersionDiffPublisher::channel();
        tokio::spawn(log_diffs(receiver));
        builder = builder.publisher(publisher);
    }
    let dispatcher = Arc::new(builder.build());

    seed(&dispatcher, config).await?;
    Ok(dispatcher)
}

async fn seed(dispatcher: &RequestDispatcher, config: &GatewayConfig) -> CliResult<()> {
    for (entity_name, values) in &config.seed {
        if values.is_empty() {
            continue;
        }
        let request = RequestData::new(RequestBody::InsertMulti(MultiInsertCommand {
            entity_name: entity_name.clone(),
            values: values.clone(),
        }));

        if let ResponseData::Error(e) = dispatcher.handle_request_data(request).await {
            return Err(CliError::boot_failed(format!(
                "Seeding \"{}\" failed: {}",
                entity_name, e.message
            )));
        }
        info!(entity_name = %entity_name, count = values.len(), "seeded entities");
    }
    Ok(())
}

async fn log_diffs(mut receiver: DiffReceiver) {
    while let Some(diff) = receiver.recv().await {
        info!(
            event = %Event::DiffPublished,
            entity_name = %diff.entity_name,
            id = %diff.id,
            prev_version_id = %diff.prev_version_id,
            version_id = %diff.version_id,
        );
    }
    warn!("version diff channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::config::UserConfig;
    use crate::core::error::ErrorType;
    use serde_json::{json, Value};

    fn config() -> GatewayConfig {
        let mut config = GatewayConfig {
            users: vec![UserConfig {
                name: "user".into(),
                account_prop: "email".into(),
                password_prop: "password".into(),
            }],
            entities: vec!["post".into()],
            ..Default::default()
        };
        config
            .seed
            .insert("user".into(), vec![json!({"id": "u1", "email": "a@b.c", "password": "secret"})]);
        config
    }

    async fn serve_input(dispatcher: &RequestDispatcher, input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        serve_lines(dispatcher, input.as_bytes(), &mut output).await.unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_seeded_passwords_are_hashed() {
        let dispatcher = build_dispatcher(&config()).await.unwrap();
        let responses = serve_input(
            &dispatcher,
            r#"{"method": "get", "payload": {"entityName": "user", "id": "u1"}}"#,
        )
        .await;

        assert_eq!(responses[0]["type"], "get");
        assert!(responses[0]["payload"]["entity"].get("password").is_none());
    }

    #[tokio::test]
    async fn test_login_with_seeded_user() {
        let dispatcher = build_dispatcher(&config()).await.unwrap();
        let responses = serve_input(
            &dispatcher,
            r#"{"method": "login", "payload": {"entityName": "user", "credentials": {"email": "a@b.c", "password": "secret"}}}"#,
        )
        .await;

        assert_eq!(responses[0]["type"], "login");
        assert!(responses[0]["payload"]["session"]["id"].is_string());
        assert!(responses[0]["payload"]["user"].get("password").is_none());
    }

    #[tokio::test]
    async fn test_serve_answers_each_line() {
        let dispatcher = build_dispatcher(&config()).await.unwrap();
        let input = concat!(
            "{\"method\": \"insertOne\", \"payload\": {\"entityName\": \"post\", \"value\": {\"id\": \"p1\"}}}\n",
            "\n",
            "not json\n",
            "{\"method\": \"find\", \"payload\": {\"entityName\": \"comment\", \"where\": {}}}\n",
        );
        let responses = serve_input(&dispatcher, input).await;

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["type"], "insertOne");
        assert_eq!(responses[1]["type"], "error");
        assert_eq!(responses[1]["payload"]["errorType"], "BadRequest");
        assert_eq!(responses[2]["payload"]["errorType"], "NotFound");
        assert_eq!(dispatcher.metrics().snapshot().rejected_bad_request, 1);
    }

    #[tokio::test]
    async fn test_seed_failure_is_boot_failure() {
        let mut config = config();
        config.seed.insert("post".into(), vec![json!({"id": "p1"}), json!({"id": "p1"})]);

        let err = build_dispatcher(&config).await.err().unwrap();
        assert_eq!(err.code_str(), "GATEWAY_CLI_BOOT_FAILED");
    }

    #[tokio::test]
    async fn test_handle_line_malformed() {
        let dispatcher = build_dispatcher(&GatewayConfig::default()).await.unwrap();
        let response = handle_line(&dispatcher, "[]").await;
        assert_eq!(response.error().unwrap().error_type, ErrorType::BadRequest);
    }
}
