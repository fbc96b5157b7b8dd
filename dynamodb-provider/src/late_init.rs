use dynamodb_provider_apis::{
    GlobalSecondaryIndex, LocalSecondaryIndex, ProvisionedThroughput, SseSpecification,
    TableParameters,
};

use crate::client::{
    GlobalSecondaryIndexDescription, LocalSecondaryIndexDescription, TableDescription,
};

/// Fill fields the user left unset from the observed remote state, so
/// that provider defaults become part of the declared intent and stop
/// showing up as spurious drift. Fields the user did set are never
/// touched. Returns whether anything was filled in.
pub fn late_initialize(params: &mut TableParameters, description: &TableDescription) -> bool {
    let mut changed = false;

    if params.attribute_definitions.is_empty() && !description.attribute_definitions.is_empty() {
        params.attribute_definitions = description.attribute_definitions.clone();
        changed = true;
    }
    if params.key_schema.is_empty() && !description.key_schema.is_empty() {
        params.key_schema = description.key_schema.clone();
        changed = true;
    }
    if params.global_secondary_indexes.is_empty()
        && !description.global_secondary_indexes.is_empty()
    {
        params.global_secondary_indexes =
            build_global_indexes(&description.global_secondary_indexes);
        changed = true;
    }
    if params.local_secondary_indexes.is_empty() && !description.local_secondary_indexes.is_empty()
    {
        params.local_secondary_indexes = build_local_indexes(&description.local_secondary_indexes);
        changed = true;
    }
    if params.provisioned_throughput.is_none() {
        if let Some(pt) = &description.provisioned_throughput {
            params.provisioned_throughput = Some(ProvisionedThroughput {
                read_capacity_units: pt.read_capacity_units,
                write_capacity_units: pt.write_capacity_units,
            });
            changed = true;
        }
    }
    if params.sse_specification.is_none() {
        if let Some(sse) = &description.sse_description {
            // The remote reports a status string and a key ARN; store
            // them in the declared shape so subsequent diffs converge.
            params.sse_specification = Some(SseSpecification {
                enabled: sse.status.as_deref().map(|s| s == "ENABLED"),
                sse_type: sse.sse_type.clone(),
                kms_master_key_id: sse.kms_master_key_arn.clone(),
                kms_master_key_id_ref: None,
                kms_master_key_id_selector: None,
            });
            changed = true;
        }
    }
    if params.stream_specification.is_none() {
        if let Some(stream) = &description.stream_specification {
            params.stream_specification = Some(stream.clone());
            changed = true;
        }
    }

    changed
}

fn build_global_indexes(
    indexes: &[GlobalSecondaryIndexDescription],
) -> Vec<GlobalSecondaryIndex> {
    indexes
        .iter()
        .map(|ix| GlobalSecondaryIndex {
            index_name: ix.index_name.clone(),
            key_schema: ix.key_schema.clone(),
            projection: ix.projection.clone(),
        })
        .collect()
}

fn build_local_indexes(indexes: &[LocalSecondaryIndexDescription]) -> Vec<LocalSecondaryIndex> {
    indexes
        .iter()
        .map(|ix| LocalSecondaryIndex {
            index_name: ix.index_name.clone(),
            key_schema: ix.key_schema.clone(),
            projection: ix.projection.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ProvisionedThroughputDescription, SseDescription};
    use dynamodb_provider_apis::{AttributeDefinition, KeySchemaElement, StreamSpecification};

    fn remote() -> TableDescription {
        TableDescription {
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
            sse_description: Some(SseDescription {
                status: Some("ENABLED".into()),
                sse_type: Some("KMS".into()),
                kms_master_key_arn: Some("arn:aws:kms:::key/1".into()),
            }),
            stream_specification: Some(StreamSpecification {
                stream_enabled: Some(true),
                stream_view_type: Some("NEW_IMAGE".into()),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn fills_unset_fields_from_remote() {
        let mut params = TableParameters::default();
        assert!(late_initialize(&mut params, &remote()));
        assert_eq!(1, params.attribute_definitions.len());
        assert_eq!(1, params.key_schema.len());
        assert_eq!(
            Some(5),
            params
                .provisioned_throughput
                .as_ref()
                .and_then(|pt| pt.read_capacity_units)
        );
        let sse = params.sse_specification.as_ref().unwrap();
        assert_eq!(Some(true), sse.enabled);
        assert_eq!(Some("arn:aws:kms:::key/1"), sse.kms_master_key_id.as_deref());
        assert_eq!(
            Some(true),
            params
                .stream_specification
                .as_ref()
                .and_then(|s| s.stream_enabled)
        );
    }

    #[test]
    fn keeps_user_set_fields() {
        let mut params = TableParameters {
            provisioned_throughput: Some(ProvisionedThroughput {
                read_capacity_units: Some(100),
                write_capacity_units: Some(100),
            }),
            ..Default::default()
        };
        late_initialize(&mut params, &remote());
        assert_eq!(
            Some(100),
            params
                .provisioned_throughput
                .as_ref()
                .and_then(|pt| pt.read_capacity_units)
        );
    }

    #[test]
    fn idempotent_on_second_pass() {
        let mut params = TableParameters::default();
        late_initialize(&mut params, &remote());
        assert!(!late_initialize(&mut params, &remote()));
    }
}
