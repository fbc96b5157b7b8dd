use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::ListParams;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;

use crate::errors::{ExtKubeApiError, StoreError};
use crate::reference::ReferenceReader;

/// Reference target lookups against the Kubernetes API, scoped to the
/// namespace of the managed resource being reconciled.
pub struct KubeStore {
    client: Client,
    namespace: String,
}

impl KubeStore {
    pub fn new(client: Client, namespace: &str) -> Self {
        KubeStore {
            client,
            namespace: namespace.to_string(),
        }
    }

    fn api<T>(&self) -> Api<T>
    where
        T: Resource<Scope = NamespaceResourceScope>,
        T::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

#[async_trait]
impl<T> ReferenceReader<T> for KubeStore
where
    T: Resource<Scope = NamespaceResourceScope>
        + Clone
        + DeserializeOwned
        + Debug
        + Send
        + Sync
        + 'static,
    T::DynamicType: Default,
{
    async fn get(&self, name: &str) -> Result<Option<T>, StoreError> {
        match self.api::<T>().get(name).await {
            Ok(resource) => Ok(Some(resource)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(StoreError::KubeApi(e)),
        }
    }

    async fn list(
        &self,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<(String, T)>, StoreError> {
        let selector = labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",");
        let params = ListParams::default().labels(&selector);
        let list = self.api::<T>().list(&params).await?;
        Ok(list
            .items
            .into_iter()
            .map(|item| (item.name_any(), item))
            .collect())
    }
}
