use std::collections::BTreeMap;

use async_trait::async_trait;
use dynamodb_provider_apis::{Key, Principal, Reference, Role, Selector, Table, User};
use log::debug;

use crate::errors::{ReconcileError, ResolutionFailure, StoreError};

/// Read access to reference target resources of kind `T`. Backed by the
/// Kubernetes API in production, by in-memory fixtures in tests.
#[async_trait]
pub trait ReferenceReader<T>: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<T>, StoreError>;

    /// All resources carrying the given labels, as (name, resource)
    /// pairs.
    async fn list(&self, labels: &BTreeMap<String, String>) -> Result<Vec<(String, T)>, StoreError>;
}

/// One reference field to resolve: its current value, the declared
/// reference or selector, and how to extract the value from a target.
pub struct ResolutionRequest<'a, T> {
    pub current_value: Option<&'a str>,
    pub reference: Option<&'a Reference>,
    pub selector: Option<&'a Selector>,
    pub extract: fn(&T) -> Option<&str>,
}

/// The resolved value, plus the reference pinned from a selector match
/// so later passes hit the same target even if labels change.
#[derive(Debug, PartialEq, Eq, Default)]
pub struct ResolutionResponse {
    pub resolved_value: Option<String>,
    pub resolved_reference: Option<Reference>,
}

/// Resolve a single reference field. A field that already has a value
/// is left untouched without querying the store.
pub async fn resolve<T, S: ReferenceReader<T> + ?Sized>(
    reader: &S,
    path: &str,
    request: ResolutionRequest<'_, T>,
) -> Result<ResolutionResponse, ReconcileError> {
    if let Some(value) = request.current_value {
        if !value.is_empty() {
            return Ok(ResolutionResponse {
                resolved_value: Some(value.to_string()),
                resolved_reference: request.reference.cloned(),
            });
        }
    }

    if let Some(reference) = request.reference {
        let target = reader.get(&reference.name).await.map_err(|source| {
            ReconcileError::Store {
                path: path.to_string(),
                source,
            }
        })?;
        let target = target
            .ok_or_else(|| ReconcileError::resolution(path, ResolutionFailure::MissingTarget))?;
        let value = (request.extract)(&target)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ReconcileError::resolution(path, ResolutionFailure::NoValue))?;
        debug!("resolved {} from reference {}", path, reference.name);
        return Ok(ResolutionResponse {
            resolved_value: Some(value.to_string()),
            resolved_reference: Some(reference.clone()),
        });
    }

    if let Some(selector) = request.selector {
        let mut candidates =
            reader
                .list(&selector.match_labels)
                .await
                .map_err(|source| ReconcileError::Store {
                    path: path.to_string(),
                    source,
                })?;
        match candidates.len() {
            0 => return Err(ReconcileError::resolution(path, ResolutionFailure::NoMatch)),
            1 => (),
            n => {
                return Err(ReconcileError::resolution(
                    path,
                    ResolutionFailure::Ambiguous(n),
                ))
            }
        }
        let (name, target) = candidates.remove(0);
        let value = (request.extract)(&target)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ReconcileError::resolution(path, ResolutionFailure::NoValue))?;
        debug!("resolved {} from selector match {}", path, name);
        return Ok(ResolutionResponse {
            resolved_value: Some(value.to_string()),
            resolved_reference: Some(Reference { name }),
        });
    }

    Ok(ResolutionResponse::default())
}

/// Resolve every reference field of a table in declaration order,
/// writing results back into the spec. Fails fast on the first
/// unresolvable field; fields resolved before the failure keep their
/// values, so repeated passes make monotonic progress.
pub async fn resolve_references<S>(table: &mut Table, store: &S) -> Result<(), ReconcileError>
where
    S: ReferenceReader<Key> + ReferenceReader<User> + ReferenceReader<Role>,
{
    if let Some(sse) = table.spec.for_provider.sse_specification.as_mut() {
        if sse.kms_master_key_id_ref.is_some() || sse.kms_master_key_id_selector.is_some() {
            let response = resolve(
                store,
                "spec.forProvider.sseSpecification.kmsMasterKeyId",
                ResolutionRequest {
                    current_value: sse.kms_master_key_id.as_deref(),
                    reference: sse.kms_master_key_id_ref.as_ref(),
                    selector: sse.kms_master_key_id_selector.as_ref(),
                    extract: Key::arn,
                },
            )
            .await?;
            if let Some(value) = response.resolved_value {
                sse.kms_master_key_id = Some(value);
            }
            if let Some(reference) = response.resolved_reference {
                sse.kms_master_key_id_ref = Some(reference);
            }
        }
    }

    if let Some(policy) = table.spec.for_provider.resource_policy.as_mut() {
        for (i, statement) in policy.statements.iter_mut().enumerate() {
            if let Some(principal) = statement.principal.as_mut() {
                resolve_principal(store, principal, i, "principal").await?;
            }
            if let Some(principal) = statement.not_principal.as_mut() {
                resolve_principal(store, principal, i, "notPrincipal").await?;
            }
        }
    }

    Ok(())
}

async fn resolve_principal<S>(
    store: &S,
    principal: &mut Principal,
    statement_index: usize,
    field: &str,
) -> Result<(), ReconcileError>
where
    S: ReferenceReader<User> + ReferenceReader<Role>,
{
    for (j, entry) in principal.aws.iter_mut().enumerate() {
        if entry.user_arn_ref.is_some() || entry.user_arn_selector.is_some() {
            let path = format!(
                "spec.forProvider.resourcePolicy.statement[{}].{}.aws[{}].userArn",
                statement_index, field, j
            );
            let response = resolve(
                store,
                &path,
                ResolutionRequest {
                    current_value: entry.user_arn.as_deref(),
                    reference: entry.user_arn_ref.as_ref(),
                    selector: entry.user_arn_selector.as_ref(),
                    extract: User::arn,
                },
            )
            .await?;
            if let Some(value) = response.resolved_value {
                entry.user_arn = Some(value);
            }
            if let Some(reference) = response.resolved_reference {
                entry.user_arn_ref = Some(reference);
            }
        }
        if entry.role_arn_ref.is_some() || entry.role_arn_selector.is_some() {
            let path = format!(
                "spec.forProvider.resourcePolicy.statement[{}].{}.aws[{}].roleArn",
                statement_index, field, j
            );
            let response = resolve(
                store,
                &path,
                ResolutionRequest {
                    current_value: entry.role_arn.as_deref(),
                    reference: entry.role_arn_ref.as_ref(),
                    selector: entry.role_arn_selector.as_ref(),
                    extract: Role::arn,
                },
            )
            .await?;
            if let Some(value) = response.resolved_value {
                entry.role_arn = Some(value);
            }
            if let Some(reference) = response.resolved_reference {
                entry.role_arn_ref = Some(reference);
            }
        }
    }
    Ok(())
}
