//! Reconciliation core for managed DynamoDB-style tables.
//!
//! Each pass takes one [`dynamodb_provider_apis::Table`], resolves its
//! reference fields from sibling resources, observes the remote table,
//! creates it if absent, late-initializes unset spec fields from the
//! remote defaults, and corrects drift with at most one update request
//! per pass.

pub mod client;
pub mod diff;
pub mod errors;
pub mod late_init;
mod modifications;
pub mod observe;
pub mod reference;
pub mod reconcile;
pub mod store;
pub mod tagger;
pub mod update;

/// Field manager identity used for all writes to the API server.
pub const MANAGER: &'static str = "dynamodb-provider";

pub use reconcile::{Outcome, TableReconciler};
