use dynamodb_provider_apis::TableParameters;
use json_patch::Patch;
use serde_json::Value;

use crate::client::TableDescription;
use crate::errors::ReconcileError;
use crate::late_init::late_initialize;

/// Fields excluded from the drift comparison. Keys and indexes are
/// immutable after creation, tags and the resource policy are managed
/// through their own channels, so none of them can be corrected by an
/// update call.
const EXCLUDED_FIELDS: &[&str] = &[
    "tags",
    "keySchema",
    "globalSecondaryIndexes",
    "localSecondaryIndexes",
    "resourcePolicy",
];

/// The sparse difference between the observed remote state and the
/// declared parameters. An empty patch means the table is up to date.
pub fn create_patch(
    description: &TableDescription,
    params: &TableParameters,
) -> Result<Patch, ReconcileError> {
    // Project the remote state into the declared shape by late
    // initializing an empty parameter set from it, so both sides of
    // the comparison speak the same schema.
    let mut current = TableParameters::default();
    late_initialize(&mut current, description);
    let current = comparable(&current)?;
    let desired = comparable(params)?;
    Ok(json_patch::diff(&current, &desired))
}

pub fn is_up_to_date(
    description: &TableDescription,
    params: &TableParameters,
) -> Result<bool, ReconcileError> {
    Ok(create_patch(description, params)?.0.is_empty())
}

/// Normalize parameters for comparison: drop fields excluded from the
/// diff, strip reference bookkeeping, and sort attribute definitions so
/// ordering differences do not register as drift.
fn comparable(params: &TableParameters) -> Result<Value, ReconcileError> {
    let mut value = serde_json::to_value(params).map_err(ReconcileError::PatchComputation)?;
    if let Value::Object(map) = &mut value {
        for field in EXCLUDED_FIELDS {
            map.remove(*field);
        }
    }
    strip_reference_fields(&mut value);
    if let Some(Value::Array(defs)) = value.get_mut("attributeDefinitions") {
        defs.sort_by(|a, b| {
            let name = |v: &Value| {
                v.get("attributeName")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string()
            };
            name(a).cmp(&name(b))
        });
    }
    Ok(value)
}

fn strip_reference_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|k, _| !k.ends_with("Ref") && !k.ends_with("Selector"));
            for v in map.values_mut() {
                strip_reference_fields(v);
            }
        }
        Value::Array(items) => {
            for v in items.iter_mut() {
                strip_reference_fields(v);
            }
        }
        _ => {}
    }
}
