//! Version diff model and builder

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::request::{RequestBody, RequestData};
use crate::core::response::ResponseData;

/// One entity moving from `prev_version_id` to `version_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDiff {
    pub entity_name: String,
    pub id: String,
    pub prev_version_id: String,
    pub version_id: String,
    /// Update operation applied; a `push` carries its batch as an array
    pub operation: Value,
}

/// Computes the diffs implied by a successful request
pub trait VersionDiffBuilder: Send + Sync {
    fn build(&self, request: &RequestData, response: &ResponseData) -> Vec<VersionDiff>;
}

/// One diff per updated id for the update family and `push`.
///
/// Reads, inserts, deletes and error responses produce nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultVersionDiffBuilder;

impl VersionDiffBuilder for DefaultVersionDiffBuilder {
    fn build(&self, request: &RequestData, response: &ResponseData) -> Vec<VersionDiff> {
        match (&request.body, response) {
            (RequestBody::UpdateById(c), ResponseData::UpdateById(r)) => vec![VersionDiff {
                entity_name: c.entity_name.clone(),
                id: r.id.clone(),
                prev_version_id: r.prev_version_id.clone(),
                version_id: r.version_id.clone(),
                operation: c.operation.clone(),
            }],
            (RequestBody::UpdateAndGet(c), ResponseData::UpdateAndGet(r)) => match &r.prev_version_id {
                Some(prev) => vec![VersionDiff {
                    entity_name: c.entity_name.clone(),
                    id: c.id.clone(),
                    prev_version_id: prev.clone(),
                    version_id: r.version_id.clone(),
                    operation: c.operation.clone(),
                }],
                None => Vec::new(),
            },
            (RequestBody::UpdateMulti(c), ResponseData::UpdateMulti(r)) => r
                .ids
                .iter()
                .filter_map(|id| {
                    Some(VersionDiff {
                        entity_name: c.entity_name.clone(),
                        id: id.clone(),
                        prev_version_id: r.prev_versions_by_id.get(id)?.clone(),
                        version_id: r.versions_by_id.get(id)?.clone(),
                        operation: c.operation.clone(),
                    })
                })
                .collect(),
            (RequestBody::UpdateAndFetch(c), ResponseData::UpdateAndFetch(r)) => r
                .versions_by_id
                .iter()
                .filter_map(|(id, version_id)| {
                    Some(VersionDiff {
                        entity_name: c.entity_name.clone(),
                        id: id.clone(),
                        prev_version_id: r.prev_versions_by_id.get(id)?.clone(),
                        version_id: version_id.clone(),
                        operation: c.operation.clone(),
                    })
                })
                .collect(),
            (RequestBody::Push(c), ResponseData::Push(r)) => vec![VersionDiff {
                entity_name: c.entity_name.clone(),
                id: c.id.clone(),
                prev_version_id: r.prev_version_id.clone(),
                version_id: r.version_id.clone(),
                operation: Value::Array(c.operations.clone()),
            }],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::request::{IdQuery, IdUpdateCommand, MultiUpdateCommand};
    use crate::core::response::{IdUpdateCommandResult, MultiUpdateCommandResult, SingleQueryResult};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_update_by_id_produces_one_diff() {
        let op = json!({"$set": {"a": 1}});
        let request = RequestData::new(RequestBody::UpdateById(IdUpdateCommand::new("post", "p1", op.clone())));
        let response = ResponseData::UpdateById(IdUpdateCommandResult {
            n: 1,
            id: "p1".into(),
            prev_version_id: "v1".into(),
            version_id: "v2".into(),
        });

        let diffs = DefaultVersionDiffBuilder.build(&request, &response);
        assert_eq!(
            diffs,
            vec![VersionDiff {
                entity_name: "post".into(),
                id: "p1".into(),
                prev_version_id: "v1".into(),
                version_id: "v2".into(),
                operation: op,
            }]
        );
    }

    #[test]
    fn test_update_multi_produces_one_diff_per_id() {
        let request = RequestData::new(RequestBody::UpdateMulti(MultiUpdateCommand {
            entity_name: "post".into(),
            where_: json!({}),
            operation: json!({"$set": {"a": 1}}),
        }));
        let response = ResponseData::UpdateMulti(MultiUpdateCommandResult {
            n: 2,
            ids: vec!["p1".into(), "p2".into()],
            prev_versions_by_id: BTreeMap::from([("p1".into(), "a".into()), ("p2".into(), "b".into())]),
            versions_by_id: BTreeMap::from([("p1".into(), "c".into()), ("p2".into(), "d".into())]),
        });

        let diffs = DefaultVersionDiffBuilder.build(&request, &response);
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[1].prev_version_id, "b");
        assert_eq!(diffs[1].version_id, "d");
    }

    #[test]
    fn test_reads_produce_nothing() {
        let request = RequestData::new(RequestBody::Get(IdQuery::new("post", "p1")));
        let response = ResponseData::Get(SingleQueryResult {
            entity: json!({"id": "p1"}),
            version_id: "v1".into(),
        });

        assert!(DefaultVersionDiffBuilder.build(&request, &response).is_empty());
    }
}
