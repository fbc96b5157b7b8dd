use std::fmt;

/// Extension methods for Kubernetes API errors.
pub(crate) trait ExtKubeApiError {
    fn is_not_found(&self) -> bool;
}

impl ExtKubeApiError for kube::Error {
    fn is_not_found(&self) -> bool {
        match self {
            kube::Error::Api(e) if e.code == 404 || e.code == 410 => true,
            _ => false,
        }
    }
}

/// The remote call a failure occurred in, used as error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Describe,
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Describe => write!(f, "describe"),
            Operation::Create => write!(f, "create"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// Failures of the remote provider, as distinguished by its responses.
/// `NotFound` during observation is not an error but the absence signal.
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("remote resource not found")]
    NotFound,
    #[error("remote operation conflicts with a concurrent modification")]
    Conflict,
    #[error("remote request was throttled")]
    Throttled,
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Failures of the resource store backing the managed objects.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    KubeApi(#[from] kube::Error),
    #[error("{0}")]
    Serde(#[from] serde_json::Error),
}

/// Why a reference field could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionFailure {
    /// The explicitly referenced resource does not exist.
    MissingTarget,
    /// The selector matched no candidate.
    NoMatch,
    /// The selector matched more than one candidate.
    Ambiguous(usize),
    /// The target exists but its extractable attribute is not set yet.
    NoValue,
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionFailure::MissingTarget => write!(f, "referenced resource does not exist"),
            ResolutionFailure::NoMatch => write!(f, "no resources match the selector"),
            ResolutionFailure::Ambiguous(n) => {
                write!(f, "selector matches {} resources, expected exactly one", n)
            }
            ResolutionFailure::NoValue => {
                write!(f, "referenced resource has no resolvable value yet")
            }
        }
    }
}

/// Everything that can go wrong during a reconcile pass. Each variant
/// carries the operation or field path it occurred at, so the message
/// localizes the failure without inspecting the whole object.
#[derive(thiserror::Error, Debug)]
pub enum ReconcileError {
    /// A reference field could not be resolved, tagged with the dotted
    /// path of the failing field.
    #[error("cannot resolve {path}: {reason}")]
    ReferenceResolution {
        path: String,
        reason: ResolutionFailure,
    },
    /// A store lookup failed while resolving a reference field.
    #[error("cannot look up reference target for {path}: {source}")]
    Store { path: String, source: StoreError },
    /// A remote provider call failed.
    #[error("cannot {operation} Table: {source}")]
    Provider {
        operation: Operation,
        source: ProviderError,
    },
    /// Building the structural diff between current and desired failed.
    #[error("cannot compute patch: {0}")]
    PatchComputation(#[source] serde_json::Error),
    /// Persisting the managed resource to the store failed.
    #[error("cannot persist Table: {0}")]
    Persistence(#[source] StoreError),
}

impl ReconcileError {
    pub(crate) fn resolution(path: &str, reason: ResolutionFailure) -> Self {
        ReconcileError::ReferenceResolution {
            path: path.to_string(),
            reason,
        }
    }

    pub(crate) fn provider(operation: Operation, source: ProviderError) -> Self {
        ReconcileError::Provider { operation, source }
    }

    /// Whether a later pass can be expected to succeed without user
    /// intervention. Ambiguous selectors and diff failures require a
    /// spec change; everything else converges on retry.
    pub fn is_temporary(&self) -> bool {
        match self {
            ReconcileError::ReferenceResolution { reason, .. } => {
                !matches!(reason, ResolutionFailure::Ambiguous(_))
            }
            ReconcileError::PatchComputation(_) => false,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_errors_carry_the_field_path() {
        let e = ReconcileError::resolution(
            "spec.forProvider.resourcePolicy.statement[2].principal.aws[0].userArn",
            ResolutionFailure::Ambiguous(3),
        );
        assert_eq!(
            "cannot resolve spec.forProvider.resourcePolicy.statement[2].principal.aws[0].userArn: \
             selector matches 3 resources, expected exactly one",
            format!("{}", e)
        );
    }

    #[test]
    fn provider_errors_carry_the_operation() {
        let e = ReconcileError::provider(Operation::Update, ProviderError::Throttled);
        assert_eq!(
            "cannot update Table: remote request was throttled",
            format!("{}", e)
        );
    }

    #[test]
    fn temporary_classification() {
        assert!(
            ReconcileError::resolution("spec.forProvider.x", ResolutionFailure::NoMatch)
                .is_temporary()
        );
        assert!(
            !ReconcileError::resolution("spec.forProvider.x", ResolutionFailure::Ambiguous(2))
                .is_temporary()
        );
        assert!(
            ReconcileError::provider(Operation::Describe, ProviderError::Conflict).is_temporary()
        );
    }
}
