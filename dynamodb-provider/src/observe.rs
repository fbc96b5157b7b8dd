use dynamodb_provider_apis::{Condition, TableObservation};
use log::debug;

use crate::client::{
    TableClient, TableDescription, TABLE_STATUS_ACTIVE, TABLE_STATUS_ARCHIVED,
    TABLE_STATUS_ARCHIVING, TABLE_STATUS_CREATING, TABLE_STATUS_DELETING,
    TABLE_STATUS_INACCESSIBLE,
};
use crate::errors::{Operation, ProviderError, ReconcileError};

/// Fetch the remote table, mapping the provider's not-found response to
/// `None`. Absence is the signal that drives creation, not an error.
pub async fn observe<C: TableClient + ?Sized>(
    client: &C,
    external_name: &str,
) -> Result<Option<TableDescription>, ReconcileError> {
    match client.describe_table(external_name).await {
        Ok(description) => Ok(Some(description)),
        Err(ProviderError::NotFound) => {
            debug!("remote table {} does not exist", external_name);
            Ok(None)
        }
        Err(e) => Err(ReconcileError::provider(Operation::Describe, e)),
    }
}

/// Map the provider-native table status to the lifecycle condition. An
/// unknown status leaves the current condition untouched.
pub fn condition_for_status(status: &str) -> Option<Condition> {
    match status {
        TABLE_STATUS_CREATING => Some(Condition::creating()),
        TABLE_STATUS_DELETING => Some(Condition::deleting()),
        TABLE_STATUS_ACTIVE => Some(Condition::available()),
        TABLE_STATUS_ARCHIVING | TABLE_STATUS_ARCHIVED | TABLE_STATUS_INACCESSIBLE => {
            Some(Condition::unavailable())
        }
        _ => None,
    }
}

/// Project the remote description onto the observation persisted in the
/// status sub-resource.
pub fn observation(description: &TableDescription) -> TableObservation {
    TableObservation {
        table_arn: description.table_arn.clone(),
        table_status: description.table_status.clone(),
        item_count: description.item_count,
        table_size_bytes: description.table_size_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_mapping() {
        assert_eq!(
            Some("Creating"),
            condition_for_status("CREATING").map(|c| c.reason).as_deref()
        );
        assert_eq!(
            Some("Available"),
            condition_for_status("ACTIVE").map(|c| c.reason).as_deref()
        );
        assert_eq!(
            Some("Deleting"),
            condition_for_status("DELETING").map(|c| c.reason).as_deref()
        );
        for s in ["ARCHIVING", "ARCHIVED", "INACCESSIBLE_ENCRYPTION_CREDENTIALS"] {
            assert_eq!(
                Some("Unavailable"),
                condition_for_status(s).map(|c| c.reason).as_deref()
            );
        }
        assert!(condition_for_status("UPDATING").is_none());
    }

    #[test]
    fn observation_projects_remote_state() {
        let description = TableDescription {
            table_arn: Some("arn:aws:dynamodb:::table/orders".into()),
            table_status: Some("ACTIVE".into()),
            item_count: Some(42),
            table_size_bytes: Some(4096),
            ..Default::default()
        };
        let o = observation(&description);
        assert_eq!(description.table_arn, o.table_arn);
        assert_eq!(Some("ACTIVE"), o.table_status.as_deref());
        assert_eq!(Some(42), o.item_count);
        assert_eq!(Some(4096), o.table_size_bytes);
    }
}
