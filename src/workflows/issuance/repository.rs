//! Store contracts the issuance core is written against.
//!
//! Implementations own durability and the atomicity called out on each
//! method; the services in this module never assume anything stronger than
//! what these traits promise. The crate's own [`crate::infra`] stores honor
//! the contracts under a mutex, a database-backed store would use unique
//! constraints and conditional updates.

use chrono::{DateTime, NaiveDate, Utc};

use super::domain::{
    Application, ApplicationDraft, ApplicationId, ApplicationStatus, AuditEntry, IssuedSsn,
    Person, PersonDraft, PersonId, Ssn, SsnStatus,
};

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Person records. Mutation of a person's number field must be serialized
/// per person; `assign_ssn` is the compare-and-set used for that.
pub trait PersonStore: Send + Sync {
    /// Persist a new person, assigning the numeric id.
    fn insert(&self, draft: PersonDraft) -> Result<Person, RepositoryError>;

    fn fetch(&self, id: PersonId) -> Result<Option<Person>, RepositoryError>;

    /// Replace the demographic fields of an existing person. The stored
    /// number field is left untouched regardless of `person.ssn`.
    fn update(&self, person: Person) -> Result<Person, RepositoryError>;

    /// Case-insensitive match on first and last name.
    fn find_by_name(&self, first: &str, last: &str) -> Result<Vec<Person>, RepositoryError>;

    fn find_by_ssn(&self, ssn: &Ssn) -> Result<Option<Person>, RepositoryError>;

    fn find_by_date_of_birth(&self, dob: NaiveDate) -> Result<Vec<Person>, RepositoryError>;

    fn has_ssn(&self, id: PersonId) -> Result<bool, RepositoryError>;

    /// Attach a number to a person. Fails with `Conflict` if one is already
    /// attached; the check and the write are a single atomic step.
    fn assign_ssn(&self, id: PersonId, ssn: Ssn) -> Result<Person, RepositoryError>;
}

/// Application records. `insert` and `update_if_status` carry the two
/// atomicity guarantees the review workflow is built on.
pub trait ApplicationStore: Send + Sync {
    /// Persist a new application, assigning the numeric id. Fails with
    /// `Conflict` if the person already has a pending application or the
    /// reference is taken; both checks happen atomically with the write.
    fn insert(&self, draft: ApplicationDraft) -> Result<Application, RepositoryError>;

    fn fetch(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError>;

    fn find_by_reference(&self, reference: &str) -> Result<Option<Application>, RepositoryError>;

    /// Stable submission order.
    fn find_by_status(&self, status: ApplicationStatus)
        -> Result<Vec<Application>, RepositoryError>;

    /// Stable submission order.
    fn find_by_person(&self, person_id: PersonId) -> Result<Vec<Application>, RepositoryError>;

    fn find_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Application>, RepositoryError>;

    fn count_by_status(&self, status: ApplicationStatus) -> Result<u64, RepositoryError>;

    /// Compare-and-set replacement of the stored record: commits `updated`
    /// only while the stored status still equals `expected`, otherwise fails
    /// with `Conflict` and leaves the record unchanged. Exactly one of any
    /// set of concurrent callers wins.
    fn update_if_status(
        &self,
        updated: Application,
        expected: ApplicationStatus,
    ) -> Result<Application, RepositoryError>;
}

/// The ledger of every number ever issued, in any status. Nothing is ever
/// deleted from it, which is what makes never-reuse enforceable.
pub trait SsnStore: Send + Sync {
    /// The namespace-critical atomic step: check availability and insert the
    /// row as one operation. `Conflict` if the number was ever issued in any
    /// status, or if the person currently holds an Active or Suspended row.
    /// A Revoked row retires the number forever but releases the person, so a
    /// person whose number was revoked can be issued a fresh one.
    fn reserve(&self, record: IssuedSsn) -> Result<IssuedSsn, RepositoryError>;

    fn fetch(&self, ssn: &Ssn) -> Result<Option<IssuedSsn>, RepositoryError>;

    /// The person's current holding: the Active or Suspended row, if any.
    /// Revoked rows are not reported here; they bind the number, not the
    /// person.
    fn find_by_person(&self, person_id: PersonId) -> Result<Option<IssuedSsn>, RepositoryError>;

    fn exists(&self, ssn: &Ssn) -> Result<bool, RepositoryError>;

    fn find_by_status(&self, status: SsnStatus) -> Result<Vec<IssuedSsn>, RepositoryError>;

    /// Most recently issued row, for sequence-style generation schemes.
    fn latest_issued(&self) -> Result<Option<IssuedSsn>, RepositoryError>;

    /// Compare-and-set on the status column. `Conflict` if the stored status
    /// is not `expected`.
    fn set_status_if(
        &self,
        ssn: &Ssn,
        expected: SsnStatus,
        next: SsnStatus,
    ) -> Result<IssuedSsn, RepositoryError>;

    fn count(&self) -> Result<u64, RepositoryError>;
}

/// Append-only audit records. No update or delete exists on purpose.
pub trait AuditStore: Send + Sync {
    fn append(&self, entry: AuditEntry) -> Result<(), RepositoryError>;

    fn find_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>, RepositoryError>;

    fn find_by_actor(&self, actor: &str) -> Result<Vec<AuditEntry>, RepositoryError>;

    fn find_by_action(&self, action: &str) -> Result<Vec<AuditEntry>, RepositoryError>;

    /// Newest first.
    fn find_recent(&self, limit: usize) -> Result<Vec<AuditEntry>, RepositoryError>;
}
