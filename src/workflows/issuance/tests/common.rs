use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::infra::{
    InMemoryApplicationStore, InMemoryAuditStore, InMemoryPersonStore, InMemorySsnStore,
};
use crate::workflows::issuance::audit::AuditTrail;
use crate::workflows::issuance::authority::SsnAuthority;
use crate::workflows::issuance::domain::{
    AuditEntry, CitizenshipStatus, IssuedSsn, PersonDraft, PersonId, Ssn, SsnStatus,
};
use crate::workflows::issuance::registry::PersonRegistry;
use crate::workflows::issuance::repository::{
    AuditStore, RepositoryError, SsnStore,
};
use crate::workflows::issuance::service::{IssuanceWorkflow, WorkflowPolicy};

pub(super) type MemoryWorkflow = IssuanceWorkflow<
    InMemoryPersonStore,
    InMemoryApplicationStore,
    InMemorySsnStore,
    InMemoryAuditStore,
>;

pub(super) struct Fixture {
    pub(super) workflow: MemoryWorkflow,
    pub(super) persons: Arc<InMemoryPersonStore>,
    pub(super) applications: Arc<InMemoryApplicationStore>,
    pub(super) ssns: Arc<InMemorySsnStore>,
    pub(super) audit: Arc<InMemoryAuditStore>,
}

pub(super) fn fixture() -> Fixture {
    fixture_with_policy(WorkflowPolicy::default())
}

pub(super) fn fixture_with_policy(policy: WorkflowPolicy) -> Fixture {
    let persons = Arc::new(InMemoryPersonStore::default());
    let applications = Arc::new(InMemoryApplicationStore::default());
    let ssns = Arc::new(InMemorySsnStore::default());
    let audit = Arc::new(InMemoryAuditStore::default());
    let workflow = IssuanceWorkflow::new(
        persons.clone(),
        applications.clone(),
        ssns.clone(),
        audit.clone(),
        policy,
    );
    Fixture {
        workflow,
        persons,
        applications,
        ssns,
        audit,
    }
}

pub(super) fn draft() -> PersonDraft {
    PersonDraft {
        first_name: "Maria".to_string(),
        middle_name: Some("Luisa".to_string()),
        last_name: "Santos".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1991, 4, 17).expect("valid date"),
        place_of_birth: "Des Moines, IA".to_string(),
        mothers_maiden_name: "Alvarez".to_string(),
        fathers_name: "Carlos Santos".to_string(),
        citizenship: CitizenshipStatus::UsCitizen,
    }
}

pub(super) fn draft_named(first: &str, last: &str) -> PersonDraft {
    PersonDraft {
        first_name: first.to_string(),
        last_name: last.to_string(),
        ..draft()
    }
}

pub(super) fn audit_trail() -> (AuditTrail<InMemoryAuditStore>, Arc<InMemoryAuditStore>) {
    let store = Arc::new(InMemoryAuditStore::default());
    (AuditTrail::new(store.clone()), store)
}

pub(super) fn registry() -> (
    PersonRegistry<InMemoryPersonStore, InMemoryAuditStore>,
    Arc<InMemoryPersonStore>,
    Arc<InMemoryAuditStore>,
) {
    let persons = Arc::new(InMemoryPersonStore::default());
    let audit = Arc::new(InMemoryAuditStore::default());
    let registry = PersonRegistry::new(persons.clone(), AuditTrail::new(audit.clone()));
    (registry, persons, audit)
}

pub(super) fn authority() -> (
    SsnAuthority<InMemorySsnStore, InMemoryAuditStore>,
    Arc<InMemorySsnStore>,
    Arc<InMemoryAuditStore>,
) {
    authority_with_cap(100)
}

pub(super) fn authority_with_cap(
    cap: u32,
) -> (
    SsnAuthority<InMemorySsnStore, InMemoryAuditStore>,
    Arc<InMemorySsnStore>,
    Arc<InMemoryAuditStore>,
) {
    let ssns = Arc::new(InMemorySsnStore::default());
    let audit = Arc::new(InMemoryAuditStore::default());
    let authority = SsnAuthority::new(ssns.clone(), AuditTrail::new(audit.clone()), cap);
    (authority, ssns, audit)
}

/// Ssn store whose reserve always reports a collision, driving generation to
/// its retry cap.
#[derive(Default)]
pub(super) struct CollidingSsnStore;

impl SsnStore for CollidingSsnStore {
    fn reserve(&self, _record: IssuedSsn) -> Result<IssuedSsn, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn fetch(&self, _ssn: &Ssn) -> Result<Option<IssuedSsn>, RepositoryError> {
        Ok(None)
    }

    fn find_by_person(&self, _person_id: PersonId) -> Result<Option<IssuedSsn>, RepositoryError> {
        Ok(None)
    }

    fn exists(&self, _ssn: &Ssn) -> Result<bool, RepositoryError> {
        Ok(true)
    }

    fn find_by_status(&self, _status: SsnStatus) -> Result<Vec<IssuedSsn>, RepositoryError> {
        Ok(Vec::new())
    }

    fn latest_issued(&self) -> Result<Option<IssuedSsn>, RepositoryError> {
        Ok(None)
    }

    fn set_status_if(
        &self,
        _ssn: &Ssn,
        _expected: SsnStatus,
        _next: SsnStatus,
    ) -> Result<IssuedSsn, RepositoryError> {
        Err(RepositoryError::NotFound)
    }

    fn count(&self) -> Result<u64, RepositoryError> {
        Ok(0)
    }
}

/// Audit store that refuses every append, for the swallow-and-warn contract.
#[derive(Default)]
pub(super) struct FailingAuditStore;

impl AuditStore for FailingAuditStore {
    fn append(&self, _entry: AuditEntry) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("audit sink offline".to_string()))
    }

    fn find_by_date_range(
        &self,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>, RepositoryError> {
        Ok(Vec::new())
    }

    fn find_by_actor(&self, _actor: &str) -> Result<Vec<AuditEntry>, RepositoryError> {
        Ok(Vec::new())
    }

    fn find_by_action(&self, _action: &str) -> Result<Vec<AuditEntry>, RepositoryError> {
        Ok(Vec::new())
    }

    fn find_recent(&self, _limit: usize) -> Result<Vec<AuditEntry>, RepositoryError> {
        Ok(Vec::new())
    }
}
