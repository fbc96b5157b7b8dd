use dynamodb_provider_apis::{Condition, Table};
use kube::{Client, ResourceExt};
use log::{debug, info};

use crate::client::{TableClient, generate_create_table_input};
use crate::errors::{Operation, ProviderError, ReconcileError};
use crate::late_init::late_initialize;
use crate::modifications::TableModifications;
use crate::observe::{condition_for_status, observation, observe};
use crate::reference::resolve_references;
use crate::store::KubeStore;
use crate::tagger;
use crate::update::plan_update;

/// What a reconcile pass did, mainly for logging and requeue decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The remote table did not exist and was created.
    Created,
    /// No drift between the remote table and the declared parameters.
    UpToDate,
    /// An update request was issued to correct drift.
    UpdateIssued,
    /// Drift exists but the remote table is in a transitional state;
    /// a later pass will pick it up.
    AwaitingRemote,
    /// The external name annotation has not been assigned yet.
    AwaitingIdentity,
    /// The object is being deleted and the remote table is gone.
    Deleted,
}

/// Drives a single managed table towards its declared state: resolve
/// references, observe the remote table, create or late-initialize, and
/// correct drift one update at a time.
pub struct TableReconciler<C> {
    client: Client,
    provider: C,
}

impl<C: TableClient> TableReconciler<C> {
    pub fn new(client: Client, provider: C) -> Self {
        TableReconciler { client, provider }
    }

    pub async fn reconcile(&self, table: Table) -> Result<Outcome, ReconcileError> {
        let mut table = TableModifications::new(table);
        let id = table.id();

        if tagger::initialize(&mut table) {
            table.patch_spec(self.client.clone()).await?;
        }

        let namespace = table.namespace().unwrap_or_default();
        let store = KubeStore::new(self.client.clone(), &namespace);
        let resolution = resolve_references(&mut table, &store).await;
        // Fields resolved before a failure are persisted, so repeated
        // passes make progress even while later references dangle.
        table.patch_spec(self.client.clone()).await?;
        resolution?;

        let external_name = match table.external_name() {
            Some(name) => name.to_string(),
            None => {
                debug!("table {} has no external name assigned yet", id);
                return Ok(Outcome::AwaitingIdentity);
            }
        };

        if table.is_deleted() {
            return self.delete(&mut table, &external_name).await;
        }

        let description = match observe(&self.provider, &external_name).await? {
            Some(description) => description,
            None => {
                let input = generate_create_table_input(
                    &external_name,
                    &table.spec.for_provider,
                );
                let description = self
                    .provider
                    .create_table(&input)
                    .await
                    .map_err(|e| ReconcileError::provider(Operation::Create, e))?;
                info!("created remote table {} for {}", external_name, id);
                table.update_observation(observation(&description));
                table.update_condition(Condition::creating());
                table.replace_status(self.client.clone()).await?;
                return Ok(Outcome::Created);
            }
        };

        if late_initialize(&mut table.spec.for_provider, &description) {
            debug!("late-initialized spec of {} from remote state", id);
            table.patch_spec(self.client.clone()).await?;
        }

        table.update_observation(observation(&description));
        if let Some(status) = description.table_status.as_deref() {
            if let Some(condition) = condition_for_status(status) {
                table.update_condition(condition);
            }
        }

        let outcome = {
            let plan = plan_update(&external_name, &description, &table.spec.for_provider)?;
            if plan.is_empty() {
                if crate::diff::is_up_to_date(&description, &table.spec.for_provider)? {
                    Outcome::UpToDate
                } else {
                    Outcome::AwaitingRemote
                }
            } else {
                for input in &plan {
                    self.provider
                        .update_table(input)
                        .await
                        .map_err(|e| ReconcileError::provider(Operation::Update, e))?;
                }
                info!("issued update for remote table {} of {}", external_name, id);
                Outcome::UpdateIssued
            }
        };

        table.replace_status(self.client.clone()).await?;
        Ok(outcome)
    }

    async fn delete(
        &self,
        table: &mut TableModifications,
        external_name: &str,
    ) -> Result<Outcome, ReconcileError> {
        match self.provider.delete_table(external_name).await {
            Ok(()) | Err(ProviderError::NotFound) => (),
            Err(e) => return Err(ReconcileError::provider(Operation::Delete, e)),
        }
        info!("deleted remote table {} of {}", external_name, table.id());
        table.update_condition(Condition::deleting());
        table.replace_status(self.client.clone()).await?;
        Ok(Outcome::Deleted)
    }
}
