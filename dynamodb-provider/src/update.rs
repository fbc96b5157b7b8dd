use dynamodb_provider_apis::{StreamSpecification, TableParameters};
use json_patch::PatchOperation;
use log::debug;

use crate::client::{
    SseSpecificationInput, TableDescription, UpdateTableInput, TABLE_STATUS_CREATING,
    TABLE_STATUS_UPDATING,
};
use crate::diff::create_patch;
use crate::errors::ReconcileError;

/// Plan the update requests for the current pass. The provider rejects
/// requests combining a capacity change with a stream toggle, so drift
/// is partitioned into groups and at most one group is addressed per
/// pass; the next pass picks up the remainder once the table settles.
/// A table in a transitional state is never updated.
pub fn plan_update(
    external_name: &str,
    description: &TableDescription,
    params: &TableParameters,
) -> Result<Vec<UpdateTableInput>, ReconcileError> {
    match description.table_status.as_deref() {
        Some(TABLE_STATUS_CREATING) | Some(TABLE_STATUS_UPDATING) => {
            debug!(
                "table {} is in a transitional state, deferring update",
                external_name
            );
            return Ok(vec![]);
        }
        _ => (),
    }

    let patch = create_patch(description, params)?;
    if patch.0.is_empty() {
        return Ok(vec![]);
    }

    let mut capacity = false;
    let mut streaming = false;
    for op in patch.0.iter() {
        let path = op_path(op);
        if path.starts_with("/provisionedThroughput") {
            capacity = true;
        } else if path.starts_with("/streamSpecification") {
            streaming = true;
        }
    }

    let mut input = UpdateTableInput {
        table_name: external_name.to_string(),
        attribute_definitions: params.attribute_definitions.clone(),
        sse_specification: params
            .sse_specification
            .as_ref()
            .map(SseSpecificationInput::from),
        provisioned_throughput: None,
        stream_specification: None,
    };

    if capacity {
        input.provisioned_throughput = params.provisioned_throughput.clone();
    } else if streaming {
        let enabled = params
            .stream_specification
            .as_ref()
            .and_then(|s| s.stream_enabled);
        input.stream_specification = Some(StreamSpecification {
            stream_enabled: enabled,
            // The view type may only accompany an enable request.
            stream_view_type: if enabled == Some(true) {
                params
                    .stream_specification
                    .as_ref()
                    .and_then(|s| s.stream_view_type.clone())
            } else {
                None
            },
        });
    }

    Ok(vec![input])
}

fn op_path(op: &PatchOperation) -> &str {
    match op {
        PatchOperation::Add(op) => op.path.as_str(),
        PatchOperation::Remove(op) => op.path.as_str(),
        PatchOperation::Replace(op) => op.path.as_str(),
        PatchOperation::Move(op) => op.path.as_str(),
        PatchOperation::Copy(op) => op.path.as_str(),
        PatchOperation::Test(op) => op.path.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ProvisionedThroughputDescription;
    use dynamodb_provider_apis::{AttributeDefinition, KeySchemaElement, ProvisionedThroughput};

    fn description(status: &str) -> TableDescription {
        TableDescription {
            table_status: Some(status.into()),
            attribute_definitions: vec![AttributeDefinition {
                attribute_name: "id".into(),
                attribute_type: "S".into(),
            }],
            key_schema: vec![KeySchemaElement {
                attribute_name: "id".into(),
                key_type: "HASH".into(),
            }],
            provisioned_throughput: Some(ProvisionedThroughputDescription {
                read_capacity_units: Some(5),
                write_capacity_units: Some(5),
            }),
            ..Default::default()
        }
    }

    fn params(read_capacity: i64) -> TableParameters {
        TableParameters {
            attribute_definitions: vec![AttributeDefinition {
                attribute_name: "id".into(),
                attribute_type: "S".into(),
            }],
            key_schema: vec![KeySchemaElement {
                attribute_name: "id".into(),
                key_type: "HASH".into(),
            }],
            provisioned_throughput: Some(ProvisionedThroughput {
                read_capacity_units: Some(read_capacity),
                write_capacity_units: Some(5),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn transitional_table_is_left_alone() {
        for status in ["CREATING", "UPDATING"] {
            let plan = plan_update("orders", &description(status), &params(50)).unwrap();
            assert!(plan.is_empty());
        }
    }

    #[test]
    fn no_drift_no_requests() {
        let plan = plan_update("orders", &description("ACTIVE"), &params(5)).unwrap();
        assert!(plan.is_empty(), "{:?}", plan);
    }

    #[test]
    fn capacity_drift_yields_capacity_request() {
        let plan = plan_update("orders", &description("ACTIVE"), &params(50)).unwrap();
        assert_eq!(1, plan.len());
        assert_eq!("orders", plan[0].table_name);
        assert_eq!(
            Some(50),
            plan[0]
                .provisioned_throughput
                .as_ref()
                .and_then(|pt| pt.read_capacity_units)
        );
        assert!(plan[0].stream_specification.is_none());
    }

    #[test]
    fn stream_toggle_never_combined_with_capacity() {
        let mut p = params(50);
        p.stream_specification = Some(StreamSpecification {
            stream_enabled: Some(true),
            stream_view_type: Some("NEW_IMAGE".into()),
        });
        let plan = plan_update("orders", &description("ACTIVE"), &p).unwrap();
        assert_eq!(1, plan.len());
        assert!(plan[0].provisioned_throughput.is_some());
        assert!(plan[0].stream_specification.is_none());
    }

    #[test]
    fn stream_enable_carries_view_type() {
        let mut p = params(5);
        p.stream_specification = Some(StreamSpecification {
            stream_enabled: Some(true),
            stream_view_type: Some("NEW_IMAGE".into()),
        });
        let plan = plan_update("orders", &description("ACTIVE"), &p).unwrap();
        assert_eq!(1, plan.len());
        assert!(plan[0].provisioned_throughput.is_none());
        let stream = plan[0].stream_specification.as_ref().unwrap();
        assert_eq!(Some(true), stream.stream_enabled);
        assert_eq!(Some("NEW_IMAGE"), stream.stream_view_type.as_deref());
    }

    #[test]
    fn stream_disable_omits_view_type() {
        let mut desc = description("ACTIVE");
        desc.stream_specification = Some(StreamSpecification {
            stream_enabled: Some(true),
            stream_view_type: Some("NEW_IMAGE".into()),
        });
        let mut p = params(5);
        p.stream_specification = Some(StreamSpecification {
            stream_enabled: Some(false),
            stream_view_type: None,
        });
        let plan = plan_update("orders", &desc, &p).unwrap();
        assert_eq!(1, plan.len());
        let stream = plan[0].stream_specification.as_ref().unwrap();
        assert_eq!(Some(false), stream.stream_enabled);
        assert!(stream.stream_view_type.is_none());
    }
}
