use async_trait::async_trait;
use dynamodb_provider_apis::{
    AttributeDefinition, GlobalSecondaryIndex, KeySchemaElement, LocalSecondaryIndex, Projection,
    ProvisionedThroughput, SseSpecification, StreamSpecification, TableParameters, Tag,
};

use crate::errors::ProviderError;

pub const TABLE_STATUS_CREATING: &str = "CREATING";
pub const TABLE_STATUS_UPDATING: &str = "UPDATING";
pub const TABLE_STATUS_DELETING: &str = "DELETING";
pub const TABLE_STATUS_ACTIVE: &str = "ACTIVE";
pub const TABLE_STATUS_ARCHIVING: &str = "ARCHIVING";
pub const TABLE_STATUS_ARCHIVED: &str = "ARCHIVED";
pub const TABLE_STATUS_INACCESSIBLE: &str = "INACCESSIBLE_ENCRYPTION_CREDENTIALS";

/// The remote view of a secondary index, which carries its own lifecycle
/// status next to the declared shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalSecondaryIndexDescription {
    pub index_name: Option<String>,
    pub key_schema: Vec<KeySchemaElement>,
    pub projection: Option<Projection>,
    pub index_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalSecondaryIndexDescription {
    pub index_name: Option<String>,
    pub key_schema: Vec<KeySchemaElement>,
    pub projection: Option<Projection>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProvisionedThroughputDescription {
    pub read_capacity_units: Option<i64>,
    pub write_capacity_units: Option<i64>,
}

/// Server-side encryption as reported by the provider. The provider
/// reports a status string and a key ARN rather than echoing the
/// requested toggle and key id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SseDescription {
    pub status: Option<String>,
    pub sse_type: Option<String>,
    pub kms_master_key_arn: Option<String>,
}

/// Snapshot of the remote table as returned by [`TableClient::describe_table`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableDescription {
    pub table_name: Option<String>,
    pub table_arn: Option<String>,
    pub table_status: Option<String>,
    pub attribute_definitions: Vec<AttributeDefinition>,
    pub key_schema: Vec<KeySchemaElement>,
    pub global_secondary_indexes: Vec<GlobalSecondaryIndexDescription>,
    pub local_secondary_indexes: Vec<LocalSecondaryIndexDescription>,
    pub provisioned_throughput: Option<ProvisionedThroughputDescription>,
    pub sse_description: Option<SseDescription>,
    pub stream_specification: Option<StreamSpecification>,
    pub item_count: Option<i64>,
    pub table_size_bytes: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateTableInput {
    pub table_name: String,
    pub attribute_definitions: Vec<AttributeDefinition>,
    pub key_schema: Vec<KeySchemaElement>,
    pub global_secondary_indexes: Vec<GlobalSecondaryIndex>,
    pub local_secondary_indexes: Vec<LocalSecondaryIndex>,
    pub provisioned_throughput: Option<ProvisionedThroughput>,
    pub sse_specification: Option<SseSpecificationInput>,
    pub stream_specification: Option<StreamSpecification>,
    pub tags: Vec<Tag>,
}

/// Encryption settings as sent to the provider. Reference and selector
/// fields never cross the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SseSpecificationInput {
    pub enabled: Option<bool>,
    pub sse_type: Option<String>,
    pub kms_master_key_id: Option<String>,
}

impl From<&SseSpecification> for SseSpecificationInput {
    fn from(sse: &SseSpecification) -> Self {
        SseSpecificationInput {
            enabled: sse.enabled,
            sse_type: sse.sse_type.clone(),
            kms_master_key_id: sse.kms_master_key_id.clone(),
        }
    }
}

/// A single update request. The provider accepts at most one of the
/// mutually exclusive change groups per call, so the planner emits
/// these one group at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateTableInput {
    pub table_name: String,
    pub attribute_definitions: Vec<AttributeDefinition>,
    pub sse_specification: Option<SseSpecificationInput>,
    pub provisioned_throughput: Option<ProvisionedThroughput>,
    pub stream_specification: Option<StreamSpecification>,
}

/// Remote provider operations on a single table. The reconciler only
/// depends on this trait, so tests substitute an in-memory double.
#[async_trait]
pub trait TableClient: Send + Sync {
    async fn describe_table(&self, name: &str) -> Result<TableDescription, ProviderError>;

    async fn create_table(&self, input: &CreateTableInput)
        -> Result<TableDescription, ProviderError>;

    async fn update_table(&self, input: &UpdateTableInput)
        -> Result<TableDescription, ProviderError>;

    async fn delete_table(&self, name: &str) -> Result<(), ProviderError>;
}

/// Materialize the creation request from the declared parameters. All
/// declared fields are forwarded verbatim, the resource policy is
/// managed separately and never part of table creation.
pub fn generate_create_table_input(name: &str, params: &TableParameters) -> CreateTableInput {
    CreateTableInput {
        table_name: name.to_string(),
        attribute_definitions: params.attribute_definitions.clone(),
        key_schema: params.key_schema.clone(),
        global_secondary_indexes: params.global_secondary_indexes.clone(),
        local_secondary_indexes: params.local_secondary_indexes.clone(),
        provisioned_throughput: params.provisioned_throughput.clone(),
        sse_specification: params.sse_specification.as_ref().map(SseSpecificationInput::from),
        stream_specification: params.stream_specification.clone(),
        tags: params.tags.clone(),
    }
}
