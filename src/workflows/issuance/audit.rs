use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::domain::AuditEntry;
use super::repository::{AuditStore, RepositoryError};

/// Append-only record of sensitive operations.
///
/// `record` never surfaces a failure to the caller: losing an audit line is
/// an operational problem, not a reason to fail the business operation that
/// triggered it. Failures go to the tracing sink instead.
pub struct AuditTrail<L> {
    store: Arc<L>,
}

impl<L> Clone for AuditTrail<L> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<L: AuditStore> AuditTrail<L> {
    pub fn new(store: Arc<L>) -> Self {
        Self { store }
    }

    pub fn record(&self, actor: &str, action: &str, details: String, origin: Option<&str>) {
        let entry = AuditEntry::new(actor, action, details, origin);
        if let Err(err) = self.store.append(entry) {
            warn!(%err, action, actor, "audit append failed; entry dropped");
        }
    }

    pub fn query(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>, RepositoryError> {
        self.store.find_by_date_range(from, to)
    }

    pub fn by_actor(&self, actor: &str) -> Result<Vec<AuditEntry>, RepositoryError> {
        self.store.find_by_actor(actor)
    }

    pub fn by_action(&self, action: &str) -> Result<Vec<AuditEntry>, RepositoryError> {
        self.store.find_by_action(action)
    }

    /// Most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, RepositoryError> {
        self.store.find_recent(limit)
    }
}
