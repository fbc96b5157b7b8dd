use std::ops::DerefMut;

use dynamodb_provider_apis::Table;
use json_patch::diff;
use kube::api::PostParams;
use kube::{
    Api, Client, ResourceExt,
    api::{Patch, PatchParams},
};
use log::debug;

use crate::MANAGER;
use crate::errors::{ReconcileError, StoreError};

/// Helper construct to simplify updating and patching [`Table`] objects.
/// It keeps the object as loaded next to the working copy, so that only
/// the fields actually modified during a pass are sent back as a sparse
/// JSON patch.
pub(crate) struct TableModifications {
    original: Table,
    pub modified: Table,
}

impl std::ops::Deref for TableModifications {
    type Target = Table;

    fn deref(&self) -> &Self::Target {
        &self.modified
    }
}

impl DerefMut for TableModifications {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.modified
    }
}

impl TableModifications {
    pub(crate) fn new(original: Table) -> Self {
        let modified = original.clone();
        Self { original, modified }
    }

    pub(crate) fn is_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    fn api(&self, client: Client) -> Api<Table> {
        if let Some(ns) = self.original.namespace() {
            Api::<Table>::namespaced(client, ns.as_str())
        } else {
            Api::<Table>::all(client)
        }
    }

    async fn latest(&mut self, client: &Client) -> Result<Table, StoreError> {
        let api = self.api(client.clone());
        let name = self.modified.name_any();
        Ok(api.get_status(name.as_str()).await?)
    }

    fn status_has_changed(&self) -> Result<bool, StoreError> {
        Ok(self.get_status_patch(&self.original)?.is_some())
    }

    fn spec_has_changed(&self) -> Result<bool, StoreError> {
        Ok(self.get_spec_patch(&self.original)?.is_some())
    }

    pub(crate) async fn replace_status(&mut self, client: Client) -> Result<(), ReconcileError> {
        let changed = self.status_has_changed().map_err(ReconcileError::Persistence)?;
        if changed {
            let latest = self
                .latest(&client)
                .await
                .map_err(ReconcileError::Persistence)?;
            self._replace_status(client, &latest)
                .await
                .map_err(ReconcileError::Persistence)?;
        }
        Ok(())
    }

    async fn _replace_status(&mut self, client: Client, latest: &Table) -> Result<(), StoreError> {
        let api = self.api(client);
        let name = self.modified.name_any();
        self.modified.metadata.resource_version = latest.metadata.resource_version.clone();
        let mut pp = PostParams::default();
        pp.field_manager = Some(MANAGER.to_string());
        self.modified = api
            .replace_status(name.as_str(), &pp, serde_json::to_vec(&self.modified)?)
            .await?;
        self.original = self.modified.clone();
        Ok(())
    }

    pub(crate) async fn patch_spec(&mut self, client: Client) -> Result<(), ReconcileError> {
        let changed = self.spec_has_changed().map_err(ReconcileError::Persistence)?;
        if changed {
            self._patch_spec(client)
                .await
                .map_err(ReconcileError::Persistence)?;
        }
        Ok(())
    }

    fn get_spec_patch(&self, latest: &Table) -> Result<Option<json_patch::Patch>, StoreError> {
        let mut latest = latest.clone();
        let mut modified = self.modified.clone();
        latest.status = None;
        modified.status = None;
        let patch = diff(
            &serde_json::to_value(&latest)?,
            &serde_json::to_value(&modified)?,
        );
        Ok(if patch.0.is_empty() { None } else { Some(patch) })
    }

    fn get_status_patch(&self, latest: &Table) -> Result<Option<json_patch::Patch>, StoreError> {
        let patch = diff(
            &serde_json::to_value(&latest.status)?,
            &serde_json::to_value(&self.modified.status)?,
        );
        Ok(if patch.0.is_empty() { None } else { Some(patch) })
    }

    async fn _patch_spec(&mut self, client: Client) -> Result<(), StoreError> {
        let name = self.modified.name_any();
        let namespace = self.original.namespace().unwrap_or("".to_string());
        let api = self.api(client);
        let latest = api.get(name.as_str()).await?;
        if let Some(patch) = self.get_spec_patch(&latest)? {
            let response = api
                .patch(
                    name.as_str(),
                    &PatchParams {
                        field_manager: Some(MANAGER.to_string()),
                        dry_run: false,
                        force: false,
                        field_validation: None,
                    },
                    &Patch::<json_patch::Patch>::Json(patch),
                )
                .await;
            debug!(
                "patch object {}/{} ({:?}) -> {:?}",
                namespace,
                name,
                self.original.resource_version(),
                response
            );
            let new = response?;
            self.original = new.clone();
            self.modified = new;
        }
        Ok(())
    }
}
