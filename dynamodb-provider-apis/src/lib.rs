use std::collections::BTreeMap;

use k8s_openapi::chrono::{SecondsFormat, Utc};
use kube::CustomResource;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const API_GROUP: &'static str = "dynamodb.providers.dev";

/// Annotation holding the resource's name in the remote system. It is
/// assigned exactly once by an external initializer and treated as
/// immutable input by the reconciliation core.
pub const EXTERNAL_NAME_ANNOTATION: &'static str = "dynamodb.providers.dev/external-name";

/// The condition type summarizing a managed resource's lifecycle state.
pub const READY: &'static str = "Ready";

/// We maintain our own copy of Condition as the one from k8s_openapi does not implement JsonSchema.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct Condition {
    /// lastTransitionTime is the last time the condition transitioned from one status to another.
    #[serde(rename = "lastTransitionTime", skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,

    /// message is a human readable message indicating details about the transition. This may be an empty string.
    pub message: String,

    /// reason contains a programmatic identifier indicating the reason for the condition's last transition.
    pub reason: String,

    /// status of the condition, one of True, False, Unknown.
    pub status: String,

    /// type of condition in CamelCase or in foo.example.com/CamelCase.
    #[serde(rename = "type")]
    pub type_: String,
}

impl Condition {
    pub fn new(tpe: &str, status: Option<bool>, reason: &str, message: String) -> Self {
        Self {
            last_transition_time: None,
            message,
            reason: reason.to_string(),
            status: status
                .map(|v| if v { "True" } else { "False" })
                .unwrap_or("Unknown")
                .to_string(),
            type_: tpe.to_string(),
        }
    }

    /// The remote resource is being created and not yet usable.
    pub fn creating() -> Self {
        Self::new(
            READY,
            Some(false),
            "Creating",
            "remote resource is being created".to_string(),
        )
    }

    /// The remote resource exists and is usable.
    pub fn available() -> Self {
        Self::new(
            READY,
            Some(true),
            "Available",
            "remote resource is available".to_string(),
        )
    }

    /// The remote resource is being deleted.
    pub fn deleting() -> Self {
        Self::new(
            READY,
            Some(false),
            "Deleting",
            "remote resource is being deleted".to_string(),
        )
    }

    /// The remote resource exists but is not usable.
    pub fn unavailable() -> Self {
        Self::new(
            READY,
            Some(false),
            "Unavailable",
            "remote resource is not available".to_string(),
        )
    }
}

/// Explicit reference to another managed resource by name.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
pub struct Reference {
    /// The referenced resource's `metadata.name`.
    pub name: String,
}

/// Label based query used to find a reference target absent an explicit
/// reference. Resolution requires exactly one matching candidate.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
pub struct Selector {
    /// Labels the target resource must carry.
    #[serde(rename = "matchLabels")]
    pub match_labels: BTreeMap<String, String>,
}

/// A single remote tag, a key/value pair.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
pub struct AttributeDefinition {
    #[serde(rename = "attributeName")]
    pub attribute_name: String,
    /// One of `S`, `N` or `B`.
    #[serde(rename = "attributeType")]
    pub attribute_type: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
pub struct KeySchemaElement {
    #[serde(rename = "attributeName")]
    pub attribute_name: String,
    /// One of `HASH` or `RANGE`.
    #[serde(rename = "keyType")]
    pub key_type: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
pub struct Projection {
    #[serde(rename = "nonKeyAttributes", skip_serializing_if = "Option::is_none")]
    pub non_key_attributes: Option<Vec<String>>,
    #[serde(rename = "projectionType", skip_serializing_if = "Option::is_none")]
    pub projection_type: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
pub struct GlobalSecondaryIndex {
    #[serde(rename = "indexName", skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    #[serde(rename = "keySchema", default, skip_serializing_if = "Vec::is_empty")]
    pub key_schema: Vec<KeySchemaElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<Projection>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
pub struct LocalSecondaryIndex {
    #[serde(rename = "indexName", skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    #[serde(rename = "keySchema", default, skip_serializing_if = "Vec::is_empty")]
    pub key_schema: Vec<KeySchemaElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<Projection>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
pub struct ProvisionedThroughput {
    #[serde(rename = "readCapacityUnits", skip_serializing_if = "Option::is_none")]
    pub read_capacity_units: Option<i64>,
    #[serde(rename = "writeCapacityUnits", skip_serializing_if = "Option::is_none")]
    pub write_capacity_units: Option<i64>,
}

/// Server side encryption settings. The key id is a reference field: it
/// can be set literally, or resolved from a [`Key`] resource via an
/// explicit reference or a label selector.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
pub struct SseSpecification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(rename = "sseType", skip_serializing_if = "Option::is_none")]
    pub sse_type: Option<String>,
    #[serde(rename = "kmsMasterKeyId", skip_serializing_if = "Option::is_none")]
    pub kms_master_key_id: Option<String>,
    #[serde(rename = "kmsMasterKeyIdRef", skip_serializing_if = "Option::is_none")]
    pub kms_master_key_id_ref: Option<Reference>,
    #[serde(
        rename = "kmsMasterKeyIdSelector",
        skip_serializing_if = "Option::is_none"
    )]
    pub kms_master_key_id_selector: Option<Selector>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
pub struct StreamSpecification {
    #[serde(rename = "streamEnabled", skip_serializing_if = "Option::is_none")]
    pub stream_enabled: Option<bool>,
    #[serde(rename = "streamViewType", skip_serializing_if = "Option::is_none")]
    pub stream_view_type: Option<String>,
}

/// A principal entry inside a policy statement. The ARNs are reference
/// fields resolved from [`User`] and [`Role`] resources.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, JsonSchema, Default)]
pub struct AwsPrincipal {
    #[serde(rename = "userArn", skip_serializing_if = "Option::is_none")]
    pub user_arn: Option<String>,
    #[serde(rename = "userArnRef", skip_serializing_if = "Option::is_none")]
    pub user_arn_ref: Option<Reference>,
    #[serde(rename = "userArnSelector", skip_serializing_if = "Option::is_none")]
    pub user_arn_selector: Option<Selector>,
    #[serde(rename = "roleArn", skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(rename = "roleArnRef", skip_serializing_if = "Option::is_none")]
    pub role_arn_ref: Option<Reference>,
    #[serde(rename = "roleArnSelector", skip_serializing_if = "Option::is_none")]
    pub role_arn_selector: Option<Selector>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, JsonSchema, Default)]
pub struct Principal {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aws: Vec<AwsPrincipal>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
pub struct PolicyStatement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    /// `Allow` or `Deny`.
    pub effect: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    #[serde(rename = "notPrincipal", skip_serializing_if = "Option::is_none")]
    pub not_principal: Option<Principal>,
}

/// Resource based access policy attached to the table.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
pub struct ResourcePolicy {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statements: Vec<PolicyStatement>,
}

/// Desired table parameters. Unset fields are late-initialized from the
/// remote table after creation.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, JsonSchema, Default)]
pub struct TableParameters {
    #[serde(
        rename = "attributeDefinitions",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub attribute_definitions: Vec<AttributeDefinition>,
    #[serde(rename = "keySchema", default, skip_serializing_if = "Vec::is_empty")]
    pub key_schema: Vec<KeySchemaElement>,
    #[serde(
        rename = "globalSecondaryIndexes",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub global_secondary_indexes: Vec<GlobalSecondaryIndex>,
    #[serde(
        rename = "localSecondaryIndexes",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub local_secondary_indexes: Vec<LocalSecondaryIndex>,
    #[serde(
        rename = "provisionedThroughput",
        skip_serializing_if = "Option::is_none"
    )]
    pub provisioned_throughput: Option<ProvisionedThroughput>,
    #[serde(rename = "sseSpecification", skip_serializing_if = "Option::is_none")]
    pub sse_specification: Option<SseSpecification>,
    #[serde(rename = "streamSpecification", skip_serializing_if = "Option::is_none")]
    pub stream_specification: Option<StreamSpecification>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(rename = "resourcePolicy", skip_serializing_if = "Option::is_none")]
    pub resource_policy: Option<ResourcePolicy>,
}

/// Observed remote table state, written to the status sub-resource on
/// every reconcile pass.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, JsonSchema, Default)]
pub struct TableObservation {
    #[serde(rename = "tableArn", skip_serializing_if = "Option::is_none")]
    pub table_arn: Option<String>,
    #[serde(rename = "tableStatus", skip_serializing_if = "Option::is_none")]
    pub table_status: Option<String>,
    #[serde(rename = "itemCount", skip_serializing_if = "Option::is_none")]
    pub item_count: Option<i64>,
    #[serde(rename = "tableSizeBytes", skip_serializing_if = "Option::is_none")]
    pub table_size_bytes: Option<i64>,
}

/// A managed DynamoDB-style table. The spec declares the desired remote
/// state, the status tracks the last observed remote state and the
/// lifecycle condition.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "dynamodb.providers.dev",
    version = "v1alpha1",
    kind = "Table",
    derive = "PartialEq",
    status = "TableStatus",
    namespaced,
    printcolumn = r#"{
        "name":"Ready",
        "type": "string",
        "jsonPath": ".status.conditions[?(@.type==\"Ready\")].status",
        "description": "Whether the remote table is available."
    }"#,
    printcolumn = r#"{
        "name":"State",
        "type": "string",
        "jsonPath": ".status.atProvider.tableStatus",
        "description": "The provider-native table status."
    }"#
)]
pub struct TableSpec {
    /// The desired remote table parameters.
    #[serde(rename = "forProvider")]
    pub for_provider: TableParameters,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema, Default)]
pub struct TableStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
    #[serde(rename = "atProvider", skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<TableObservation>,
}

impl Table {
    pub fn id(&self) -> String {
        format!(
            "{}/{}",
            self.metadata.namespace.as_deref().unwrap_or(""),
            self.metadata.name.as_deref().unwrap_or(""),
        )
    }

    /// The table's name in the remote system, assigned once by an
    /// external initializer. `None` until that initializer has run.
    pub fn external_name(&self) -> Option<&str> {
        external_name(&self.metadata)
    }

    pub fn condition(&self, tpe: &str) -> Option<&Condition> {
        self.status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .and_then(|cs| cs.iter().find(|c| c.type_ == tpe))
    }

    pub fn update_condition(&mut self, c: Condition) {
        let mut status = self.status.take().unwrap_or_default();
        status.update_condition(c);
        self.status = Some(status);
    }

    pub fn update_observation(&mut self, observation: TableObservation) {
        let mut status = self.status.take().unwrap_or_default();
        status.at_provider = Some(observation);
        self.status = Some(status);
    }

    pub fn observed_table_status(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.at_provider.as_ref())
            .and_then(|o| o.table_status.as_deref())
    }
}

impl TableStatus {
    /// Replace the condition of the same type, but only if it effectively
    /// changed, to keep `lastTransitionTime` stable across no-op passes.
    pub fn update_condition(&mut self, mut c: Condition) {
        let time = Utc::now();
        c.last_transition_time = Some(time.to_rfc3339_opts(SecondsFormat::Secs, true));
        let mut conditions: Vec<Condition> = self.conditions.take().unwrap_or_else(|| vec![]);
        if let Some(existing) = conditions.iter().find(|e| e.type_ == c.type_) {
            if existing.status != c.status
                || existing.reason != c.reason
                || existing.message != c.message
            {
                conditions.retain(|v| v.type_ != c.type_);
                conditions.push(c);
            }
        } else {
            conditions.push(c);
        };
        self.conditions = Some(conditions);
    }
}

/// Read the external name annotation from any object's metadata.
pub fn external_name(meta: &kube::api::ObjectMeta) -> Option<&str> {
    meta.annotations
        .as_ref()
        .and_then(|a| a.get(EXTERNAL_NAME_ANNOTATION))
        .map(|v| v.as_str())
}

/// An encryption key the table's `kmsMasterKeyId` may reference.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "dynamodb.providers.dev",
    version = "v1alpha1",
    kind = "Key",
    derive = "PartialEq",
    status = "KeyStatus",
    namespaced
)]
pub struct KeySpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema, Default)]
pub struct KeyStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
}

impl Key {
    /// The attribute extracted when a reference to this kind resolves.
    pub fn arn(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.arn.as_deref())
    }
}

/// An identity user a policy principal may reference.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "dynamodb.providers.dev",
    version = "v1alpha1",
    kind = "User",
    derive = "PartialEq",
    status = "UserStatus",
    namespaced
)]
pub struct UserSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema, Default)]
pub struct UserStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
}

impl User {
    /// The attribute extracted when a reference to this kind resolves.
    pub fn arn(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.arn.as_deref())
    }
}

/// An identity role a policy principal may reference.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "dynamodb.providers.dev",
    version = "v1alpha1",
    kind = "Role",
    derive = "PartialEq",
    status = "RoleStatus",
    namespaced
)]
pub struct RoleSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema, Default)]
pub struct RoleStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
}

impl Role {
    /// The attribute extracted when a reference to this kind resolves.
    pub fn arn(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.arn.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    #[test]
    fn it_works() {
        let p = TableSpec {
            for_provider: TableParameters {
                key_schema: vec![KeySchemaElement {
                    attribute_name: "pk".to_string(),
                    key_type: "HASH".to_string(),
                }],
                ..Default::default()
            },
        };
        assert_eq!(
            r#"{"forProvider":{"keySchema":[{"attributeName":"pk","keyType":"HASH"}]}}"#,
            serde_json::to_string(&p).unwrap()
        );
    }

    #[test]
    fn reference_fields_are_omitted_when_empty() {
        let sse = SseSpecification {
            enabled: Some(true),
            sse_type: None,
            kms_master_key_id: None,
            kms_master_key_id_ref: None,
            kms_master_key_id_selector: None,
        };
        assert_eq!(r#"{"enabled":true}"#, serde_json::to_string(&sse).unwrap());
    }

    #[test]
    fn external_name_is_read_from_annotation() {
        let mut annotations = BTreeMap::new();
        annotations.insert(
            EXTERNAL_NAME_ANNOTATION.to_string(),
            "orders-table".to_string(),
        );
        let table = Table {
            metadata: ObjectMeta {
                name: Some("orders".to_string()),
                namespace: Some("default".to_string()),
                annotations: Some(annotations),
                ..Default::default()
            },
            spec: TableSpec {
                for_provider: Default::default(),
            },
            status: None,
        };
        assert_eq!(Some("orders-table"), table.external_name());
        assert_eq!("default/orders", table.id());
    }

    #[test]
    fn update_condition_replaces_same_type() {
        let mut table = Table {
            metadata: ObjectMeta::default(),
            spec: TableSpec {
                for_provider: Default::default(),
            },
            status: None,
        };
        table.update_condition(Condition::creating());
        table.update_condition(Condition::available());
        let conditions = table.status.as_ref().unwrap().conditions.as_ref().unwrap();
        assert_eq!(1, conditions.len());
        assert_eq!("Available", conditions[0].reason);
        assert_eq!("True", conditions[0].status);
        assert!(conditions[0].last_transition_time.is_some());
    }

    #[test]
    fn update_condition_keeps_unchanged_condition() {
        let mut status = TableStatus::default();
        status.update_condition(Condition::available());
        let first = status.conditions.as_ref().unwrap()[0].clone();
        status.update_condition(Condition::available());
        // Same type, status, reason and message: the stored condition
        // (including its transition time) must not be replaced.
        assert_eq!(Some(vec![first]), status.conditions);
    }

    #[test]
    fn extracted_attributes() {
        let key = Key {
            metadata: ObjectMeta::default(),
            spec: KeySpec { description: None },
            status: Some(KeyStatus {
                arn: Some("arn:aws:kms:eu-west-1:1:key/abc".to_string()),
            }),
        };
        assert_eq!(Some("arn:aws:kms:eu-west-1:1:key/abc"), key.arn());
        let user = User {
            metadata: ObjectMeta::default(),
            spec: UserSpec { path: None },
            status: None,
        };
        assert_eq!(None, user.arn());
    }
}
