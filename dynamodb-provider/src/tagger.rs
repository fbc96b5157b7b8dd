use std::collections::BTreeMap;

use dynamodb_provider_apis::{API_GROUP, Table, Tag};
use kube::ResourceExt;

use crate::MANAGER;

/// Tags identifying the controller and the managing object on the
/// remote resource.
fn external_tags(table: &Table) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("managed-by".to_string(), MANAGER.to_string()),
        (
            "provider-kind".to_string(),
            format!("table.{}", API_GROUP),
        ),
        ("provider-name".to_string(), table.name_any()),
    ])
}

/// Merge the system tags into the user declared ones. On key collision
/// the system value wins, and the result is sorted by key so repeated
/// merges are order stable.
pub fn normalized_tags(declared: &[Tag], system: BTreeMap<String, String>) -> Vec<Tag> {
    let mut merged: BTreeMap<String, String> = declared
        .iter()
        .map(|t| (t.key.clone(), t.value.clone()))
        .collect();
    merged.extend(system);
    merged
        .into_iter()
        .map(|(key, value)| Tag { key, value })
        .collect()
}

/// Ensure the table's spec carries the system tags. Returns whether the
/// spec was changed and needs to be persisted.
pub fn initialize(table: &mut Table) -> bool {
    let tags = normalized_tags(&table.spec.for_provider.tags, external_tags(table));
    if tags != table.spec.for_provider.tags {
        table.spec.for_provider.tags = tags;
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynamodb_provider_apis::{TableParameters, TableSpec};

    fn table_with_tags(tags: Vec<Tag>) -> Table {
        Table::new(
            "orders",
            TableSpec {
                for_provider: TableParameters {
                    tags,
                    ..Default::default()
                },
            },
        )
    }

    fn tag(key: &str, value: &str) -> Tag {
        Tag {
            key: key.into(),
            value: value.into(),
        }
    }

    #[test]
    fn adds_system_tags_sorted_by_key() {
        let mut table = table_with_tags(vec![tag("team", "data")]);
        assert!(initialize(&mut table));
        let tags = &table.spec.for_provider.tags;
        let keys: Vec<&str> = tags.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(
            vec!["managed-by", "provider-kind", "provider-name", "team"],
            keys
        );
        assert_eq!("orders", tags[2].value);
    }

    #[test]
    fn system_tags_win_on_collision() {
        let mut table = table_with_tags(vec![tag("managed-by", "somebody-else")]);
        initialize(&mut table);
        let managed_by = table
            .spec
            .for_provider
            .tags
            .iter()
            .find(|t| t.key == "managed-by")
            .unwrap();
        assert_eq!(MANAGER, managed_by.value);
    }

    #[test]
    fn idempotent_once_initialized() {
        let mut table = table_with_tags(vec![tag("team", "data")]);
        assert!(initialize(&mut table));
        assert!(!initialize(&mut table));
    }
}
