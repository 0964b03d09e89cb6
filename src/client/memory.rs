//! In-memory entity store
//!
//! Entities live in per-name tables keyed by id, with insertion order kept
//! for `find`. Every write assigns a fresh version id and appends the
//! operations it applied to the entity's history, which is what `pull` and
//! `push` replay.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use futures_util::future::{self, BoxFuture};
use futures_util::FutureExt;
use serde_json::Value;
use uuid::Uuid;

use super::session::MemorySessionClient;
use super::update::apply_operation;
use super::{EntityClient, SessionClient};
use crate::core::error::{GatewayResult, ServerError};
use crate::core::request::{
    DeleteCommand, IdQuery, IdUpdateCommand, IdsQuery, MultiInsertCommand, MultiUpdateCommand, PullQuery,
    PushCommand, SingleInsertCommand, WhereQuery,
};
use crate::core::response::{
    DeleteCommandResult, GetCommandResult, IdUpdateCommandResult, MultiInsertResult, MultiUpdateCommandResult,
    MultiValuesCommandResult, PullQueryResult, PushCommandResult, QueryResult, SingleInsertResult,
    SingleQueryResult,
};

#[derive(Debug, Clone)]
struct Version {
    id: String,
    operations: Vec<Value>,
}

#[derive(Debug, Clone)]
struct Record {
    entity: Value,
    history: Vec<Version>,
}

impl Record {
    fn new(entity: Value) -> Self {
        Self {
            entity,
            history: vec![Version {
                id: new_version_id(),
                operations: Vec::new(),
            }],
        }
    }

    fn version_id(&self) -> &str {
        self.history.last().map(|v| v.id.as_str()).unwrap_or_default()
    }

    /// Operations applied after `version_id`, `None` if the version is unknown
    fn operations_since(&self, version_id: &str) -> Option<Vec<Value>> {
        let position = self.history.iter().position(|v| v.id == version_id)?;
        Some(
            self.history[position + 1..]
                .iter()
                .flat_map(|v| v.operations.iter().cloned())
                .collect(),
        )
    }

    /// Apply operations as one new version, returning the previous version id
    fn apply(&mut self, operations: Vec<Value>) -> GatewayResult<String> {
        let mut entity = self.entity.clone();
        for operation in &operations {
            apply_operation(&mut entity, operation)?;
        }

        let prev = self.version_id().to_string();
        self.entity = entity;
        self.history.push(Version {
            id: new_version_id(),
            operations,
        });
        Ok(prev)
    }
}

#[derive(Debug, Default)]
struct Table {
    records: HashMap<String, Record>,
    order: Vec<String>,
}

impl Table {
    /// Assign an id to `value` and check it is free, both in the table and
    /// among the ids already staged for the same batch
    fn prepare(
        &self,
        entity_name: &str,
        mut value: Value,
        staged: &HashSet<String>,
    ) -> GatewayResult<(String, Value)> {
        let object = value
            .as_object_mut()
            .ok_or_else(|| ServerError::bad_request("Entity must be an object"))?;

        let id = match object.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                let id = Uuid::new_v4().to_string();
                object.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };

        if self.records.contains_key(&id) || staged.contains(&id) {
            return Err(ServerError::bad_request(format!(
                "\"{}\" entity with id \"{}\" already exists",
                entity_name, id
            )));
        }
        Ok((id, value))
    }

    fn commit(&mut self, id: String, value: Value) -> &Record {
        self.order.push(id.clone());
        self.records.entry(id).or_insert_with(|| Record::new(value))
    }

    fn record(&self, entity_name: &str, id: &str) -> GatewayResult<&Record> {
        self.records.get(id).ok_or_else(|| not_found(entity_name, id))
    }

    fn record_mut(&mut self, entity_name: &str, id: &str) -> GatewayResult<&mut Record> {
        self.records.get_mut(id).ok_or_else(|| not_found(entity_name, id))
    }

    fn matching_ids(&self, where_: &Value) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| self.records.get(*id).is_some_and(|r| matches_where(&r.entity, where_)))
            .cloned()
            .collect()
    }

    fn remove(&mut self, id: &str) -> bool {
        if self.records.remove(id).is_none() {
            return false;
        }
        self.order.retain(|i| i != id);
        true
    }
}

/// Entity client holding every table in process memory
#[derive(Debug, Default)]
pub struct MemoryEntityClient {
    tables: RwLock<HashMap<String, Table>>,
    sessions: Arc<MemorySessionClient>,
}

impl MemoryEntityClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert initial entities, returning their ids
    pub fn seed(&self, entity_name: &str, values: Vec<Value>) -> GatewayResult<Vec<String>> {
        let inserted = self.insert(entity_name, values)?;
        Ok(inserted.into_iter().map(|(id, _, _)| id).collect())
    }

    /// Number of entities stored under `entity_name`
    pub fn count(&self, entity_name: &str) -> usize {
        self.tables
            .read()
            .map(|tables| tables.get(entity_name).map_or(0, |t| t.records.len()))
            .unwrap_or(0)
    }

    /// Shared session store
    pub fn sessions(&self) -> Arc<MemorySessionClient> {
        Arc::clone(&self.sessions)
    }

    fn with_table<T>(&self, entity_name: &str, f: impl FnOnce(&Table) -> GatewayResult<T>) -> GatewayResult<T> {
        let tables = self.tables.read().map_err(|_| lock_poisoned())?;
        match tables.get(entity_name) {
            Some(table) => f(table),
            None => f(&Table::default()),
        }
    }

    fn with_table_mut<T>(
        &self,
        entity_name: &str,
        f: impl FnOnce(&mut Table) -> GatewayResult<T>,
    ) -> GatewayResult<T> {
        let mut tables = self.tables.write().map_err(|_| lock_poisoned())?;
        f(tables.entry(entity_name.to_string()).or_default())
    }

    fn select(&self, query: &WhereQuery) -> GatewayResult<Vec<(Value, String)>> {
        self.with_table(&query.entity_name, |table| {
            let mut found: Vec<(Value, String)> = table
                .matching_ids(&query.where_)
                .iter()
                .filter_map(|id| table.records.get(id))
                .map(|r| (r.entity.clone(), r.version_id().to_string()))
                .collect();

            if let Some(sort) = query.sort.as_ref().and_then(Value::as_object) {
                found.sort_by(|(a, _), (b, _)| {
                    sort.iter()
                        .map(|(field, direction)| {
                            let ordering = compare_values(lookup(a, field), lookup(b, field));
                            if direction.as_i64() == Some(-1) {
                                ordering.reverse()
                            } else {
                                ordering
                            }
                        })
                        .find(|o| *o != Ordering::Equal)
                        .unwrap_or(Ordering::Equal)
                });
            }

            let skip = query.skip.unwrap_or(0);
            let limit = query.limit.unwrap_or(usize::MAX);
            Ok(found.into_iter().skip(skip).take(limit).collect())
        })
    }

    fn find_sync(&self, query: WhereQuery) -> GatewayResult<QueryResult> {
        let found = self.select(&query)?;
        Ok(query_result(found))
    }

    fn find_one_sync(&self, query: WhereQuery) -> GatewayResult<SingleQueryResult> {
        let (entity, version_id) = self.select(&query)?.into_iter().next().ok_or_else(|| {
            ServerError::not_found(format!("\"{}\" entity matching the query not found", query.entity_name))
        })?;
        Ok(SingleQueryResult { entity, version_id })
    }

    fn get_sync(&self, query: IdQuery) -> GatewayResult<SingleQueryResult> {
        self.with_table(&query.entity_name, |table| {
            let record = table.record(&query.entity_name, &query.id)?;
            Ok(SingleQueryResult {
                entity: record.entity.clone(),
                version_id: record.version_id().to_string(),
            })
        })
    }

    fn get_by_ids_sync(&self, query: IdsQuery) -> GatewayResult<QueryResult> {
        self.with_table(&query.entity_name, |table| {
            let found = query
                .ids
                .iter()
                .filter_map(|id| table.records.get(id))
                .map(|r| (r.entity.clone(), r.version_id().to_string()))
                .collect();
            Ok(query_result(found))
        })
    }

    fn pull_sync(&self, query: PullQuery) -> GatewayResult<PullQueryResult> {
        self.with_table(&query.entity_name, |table| {
            let record = table.record(&query.entity_name, &query.id)?;
            if record.version_id() == query.version_id {
                return Ok(PullQueryResult::up_to_date());
            }

            let operations = record
                .operations_since(&query.version_id)
                .ok_or_else(|| version_not_found(&query.entity_name, &query.id, &query.version_id))?;
            Ok(PullQueryResult::pulled(operations, record.version_id()))
        })
    }

    fn insert(&self, entity_name: &str, values: Vec<Value>) -> GatewayResult<Vec<(String, Value, String)>> {
        self.with_table_mut(entity_name, |table| {
            // Every value is checked before any is stored, so a rejected batch stores nothing.
            let mut ids = HashSet::with_capacity(values.len());
            let mut staged = Vec::with_capacity(values.len());
            for value in values {
                let (id, value) = table.prepare(entity_name, value, &ids)?;
                ids.insert(id.clone());
                staged.push((id, value));
            }

            let mut inserted = Vec::with_capacity(staged.len());
            for (id, value) in staged {
                let record = table.commit(id.clone(), value);
                inserted.push((id, record.entity.clone(), record.version_id().to_string()));
            }
            Ok(inserted)
        })
    }

    fn insert_one_sync(&self, command: SingleInsertCommand) -> GatewayResult<SingleInsertResult> {
        let (id, _, version_id) = single(self.insert(&command.entity_name, vec![command.value])?)?;
        Ok(SingleInsertResult { n: 1, id, version_id })
    }

    fn insert_multi_sync(&self, command: MultiInsertCommand) -> GatewayResult<MultiInsertResult> {
        let inserted = self.insert(&command.entity_name, command.values)?;
        Ok(MultiInsertResult {
            n: inserted.len(),
            ids: inserted.iter().map(|(id, _, _)| id.clone()).collect(),
            versions_by_id: inserted.into_iter().map(|(id, _, v)| (id, v)).collect(),
        })
    }

    fn insert_and_get_sync(&self, command: SingleInsertCommand) -> GatewayResult<GetCommandResult> {
        let (_, entity, version_id) = single(self.insert(&command.entity_name, vec![command.value])?)?;
        Ok(GetCommandResult {
            n: 1,
            entity,
            version_id,
            prev_version_id: None,
        })
    }

    fn insert_and_get_multi_sync(&self, command: MultiInsertCommand) -> GatewayResult<MultiValuesCommandResult> {
        let inserted = self.insert(&command.entity_name, command.values)?;
        let mut result = MultiValuesCommandResult {
            n: inserted.len(),
            entities: Vec::with_capacity(inserted.len()),
            versions_by_id: BTreeMap::new(),
            prev_versions_by_id: BTreeMap::new(),
        };
        for (id, entity, version_id) in inserted {
            result.entities.push(entity);
            result.versions_by_id.insert(id, version_id);
        }
        Ok(result)
    }

    /// Apply `operations` to each id, returning (id, entity, prev, version)
    fn update(
        &self,
        entity_name: &str,
        target: UpdateTarget,
        operations: Vec<Value>,
    ) -> GatewayResult<Vec<(String, Value, String, String)>> {
        self.with_table_mut(entity_name, |table| {
            let ids = match target {
                UpdateTarget::Id(id) => {
                    table.record(entity_name, &id)?;
                    vec![id]
                }
                UpdateTarget::Where(where_) => table.matching_ids(&where_),
            };

            // Apply to copies first so a failing operation leaves the table untouched.
            let mut staged = Vec::with_capacity(ids.len());
            for id in &ids {
                let mut record = table.record(entity_name, id)?.clone();
                let prev = record.apply(operations.clone())?;
                staged.push((id.clone(), record, prev));
            }

            let mut updated = Vec::with_capacity(staged.len());
            for (id, record, prev) in staged {
                let entity = record.entity.clone();
                let version_id = record.version_id().to_string();
                *table.record_mut(entity_name, &id)? = record;
                updated.push((id, entity, prev, version_id));
            }
            Ok(updated)
        })
    }

    fn update_by_id_sync(&self, command: IdUpdateCommand) -> GatewayResult<IdUpdateCommandResult> {
        let (id, _, prev_version_id, version_id) = single(self.update(
            &command.entity_name,
            UpdateTarget::Id(command.id),
            vec![command.operation],
        )?)?;
        Ok(IdUpdateCommandResult {
            n: 1,
            id,
            prev_version_id,
            version_id,
        })
    }

    fn update_multi_sync(&self, command: MultiUpdateCommand) -> GatewayResult<MultiUpdateCommandResult> {
        let updated = self.update(
            &command.entity_name,
            UpdateTarget::Where(command.where_),
            vec![command.operation],
        )?;

        let mut result = MultiUpdateCommandResult {
            n: updated.len(),
            ids: Vec::with_capacity(updated.len()),
            prev_versions_by_id: BTreeMap::new(),
            versions_by_id: BTreeMap::new(),
        };
        for (id, _, prev, version_id) in updated {
            result.prev_versions_by_id.insert(id.clone(), prev);
            result.versions_by_id.insert(id.clone(), version_id);
            result.ids.push(id);
        }
        Ok(result)
    }

    fn update_and_get_sync(&self, command: IdUpdateCommand) -> GatewayResult<GetCommandResult> {
        let (_, entity, prev_version_id, version_id) = single(self.update(
            &command.entity_name,
            UpdateTarget::Id(command.id),
            vec![command.operation],
        )?)?;
        Ok(GetCommandResult {
            n: 1,
            entity,
            version_id,
            prev_version_id: Some(prev_version_id),
        })
    }

    fn update_and_fetch_sync(&self, command: MultiUpdateCommand) -> GatewayResult<MultiValuesCommandResult> {
        let updated = self.update(
            &command.entity_name,
            UpdateTarget::Where(command.where_),
            vec![command.operation],
        )?;

        let mut result = MultiValuesCommandResult {
            n: updated.len(),
            entities: Vec::with_capacity(updated.len()),
            versions_by_id: BTreeMap::new(),
            prev_versions_by_id: BTreeMap::new(),
        };
        for (id, entity, prev, version_id) in updated {
            result.entities.push(entity);
            result.prev_versions_by_id.insert(id.clone(), prev);
            result.versions_by_id.insert(id, version_id);
        }
        Ok(result)
    }

    fn push_sync(&self, command: PushCommand) -> GatewayResult<PushCommandResult> {
        let PushCommand {
            entity_name,
            id,
            version_id,
            operations,
        } = command;

        self.with_table_mut(&entity_name, |table| {
            let mut record = table.record(&entity_name, &id)?.clone();
            let new_operations = record
                .operations_since(&version_id)
                .ok_or_else(|| version_not_found(&entity_name, &id, &version_id))?;

            let prev_version_id = record.apply(operations)?;
            let entity = record.entity.clone();
            let version_id = record.version_id().to_string();
            *table.record_mut(&entity_name, &id)? = record;

            Ok(PushCommandResult {
                n: 1,
                entity,
                prev_version_id,
                version_id,
                new_operations,
            })
        })
    }

    fn delete_sync(&self, command: DeleteCommand) -> GatewayResult<DeleteCommandResult> {
        self.with_table_mut(&command.entity_name, |table| {
            let ids = match (command.id, command.where_) {
                (Some(id), _) => vec![id],
                (None, Some(where_)) => table.matching_ids(&where_),
                (None, None) => return Err(ServerError::bad_request("Delete requires an id or a where filter")),
            };
            let n = ids.iter().filter(|id| table.remove(id)).count();
            Ok(DeleteCommandResult { n })
        })
    }
}

enum UpdateTarget {
    Id(String),
    Where(Value),
}

impl EntityClient for MemoryEntityClient {
    fn find(&self, query: WhereQuery) -> BoxFuture<'_, GatewayResult<QueryResult>> {
        future::ready(self.find_sync(query)).boxed()
    }

    fn find_one(&self, query: WhereQuery) -> BoxFuture<'_, GatewayResult<SingleQueryResult>> {
        future::ready(self.find_one_sync(query)).boxed()
    }

    fn get(&self, query: IdQuery) -> BoxFuture<'_, GatewayResult<SingleQueryResult>> {
        future::ready(self.get_sync(query)).boxed()
    }

    fn get_by_ids(&self, query: IdsQuery) -> BoxFuture<'_, GatewayResult<QueryResult>> {
        future::ready(self.get_by_ids_sync(query)).boxed()
    }

    fn pull(&self, query: PullQuery) -> BoxFuture<'_, GatewayResult<PullQueryResult>> {
        future::ready(self.pull_sync(query)).boxed()
    }

    fn insert_one(&self, command: SingleInsertCommand) -> BoxFuture<'_, GatewayResult<SingleInsertResult>> {
        future::ready(self.insert_one_sync(command)).boxed()
    }

    fn insert_multi(&self, command: MultiInsertCommand) -> BoxFuture<'_, GatewayResult<MultiInsertResult>> {
        future::ready(self.insert_multi_sync(command)).boxed()
    }

    fn insert_and_get(&self, command: SingleInsertCommand) -> BoxFuture<'_, GatewayResult<GetCommandResult>> {
        future::ready(self.insert_and_get_sync(command)).boxed()
    }

    fn insert_and_get_multi(
        &self,
        command: MultiInsertCommand,
    ) -> BoxFuture<'_, GatewayResult<MultiValuesCommandResult>> {
        future::ready(self.insert_and_get_multi_sync(command)).boxed()
    }

    fn update_by_id(&self, command: IdUpdateCommand) -> BoxFuture<'_, GatewayResult<IdUpdateCommandResult>> {
        future::ready(self.update_by_id_sync(command)).boxed()
    }

    fn update_multi(&self, command: MultiUpdateCommand) -> BoxFuture<'_, GatewayResult<MultiUpdateCommandResult>> {
        future::ready(self.update_multi_sync(command)).boxed()
    }

    fn update_and_get(&self, command: IdUpdateCommand) -> BoxFuture<'_, GatewayResult<GetCommandResult>> {
        future::ready(self.update_and_get_sync(command)).boxed()
    }

    fn update_and_fetch(
        &self,
        command: MultiUpdateCommand,
    ) -> BoxFuture<'_, GatewayResult<MultiValuesCommandResult>> {
        future::ready(self.update_and_fetch_sync(command)).boxed()
    }

    fn push(&self, command: PushCommand) -> BoxFuture<'_, GatewayResult<PushCommandResult>> {
        future::ready(self.push_sync(command)).boxed()
    }

    fn delete(&self, command: DeleteCommand) -> BoxFuture<'_, GatewayResult<DeleteCommandResult>> {
        future::ready(self.delete_sync(command)).boxed()
    }

    fn create_session_client(&self) -> Arc<dyn SessionClient> {
        self.sessions()
    }
}

fn new_version_id() -> String {
    Uuid::new_v4().to_string()
}

fn lock_poisoned() -> ServerError {
    ServerError::internal("Lock poisoned")
}

fn not_found(entity_name: &str, id: &str) -> ServerError {
    ServerError::not_found(format!("\"{}\" entity with id \"{}\" not found", entity_name, id))
}

fn version_not_found(entity_name: &str, id: &str, version_id: &str) -> ServerError {
    ServerError::not_found(format!(
        "Version \"{}\" of \"{}\" entity \"{}\" not found",
        version_id, entity_name, id
    ))
}

fn single<T>(mut items: Vec<T>) -> GatewayResult<T> {
    match items.len() {
        1 => Ok(items.remove(0)),
        n => Err(ServerError::internal(format!("Expected a single result, got {}", n))),
    }
}

fn query_result(found: Vec<(Value, String)>) -> QueryResult {
    let mut result = QueryResult::default();
    for (entity, version_id) in found {
        if let Some(id) = entity.get("id").and_then(Value::as_str) {
            result.versions_by_id.insert(id.to_string(), version_id);
        }
        result.entities.push(entity);
    }
    result
}

/// Value at a dotted path
fn lookup<'a>(entity: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(entity, |current, key| current.get(key))
}

/// Equality match on every key of `where_`; an empty filter matches all
fn matches_where(entity: &Value, where_: &Value) -> bool {
    match where_.as_object() {
        Some(conditions) => conditions
            .iter()
            .all(|(path, expected)| lookup(entity, path) == Some(expected)),
        None => where_.is_null(),
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
