//! SSN application and issuance workflow.
//!
//! Four cooperating pieces: [`registry::PersonRegistry`] validates and stores
//! applicant records, [`authority::SsnAuthority`] mints and manages the
//! nine-digit numbers, [`audit::AuditTrail`] keeps the append-only record of
//! sensitive operations, and [`service::IssuanceWorkflow`] drives the
//! submit, approve, and reject lifecycle across all of them. Storage is
//! abstracted behind the traits in [`repository`].

pub mod audit;
pub mod authority;
pub mod domain;
pub mod registry;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use audit::AuditTrail;
pub use authority::{AuthorityError, SsnAuthority};
pub use domain::{
    actions, Application, ApplicationDraft, ApplicationId, ApplicationStatus, AuditEntry,
    CitizenshipStatus, IssuedSsn, Person, PersonDraft, PersonId, Ssn, SsnStatus,
};
pub use registry::{PersonRegistry, RegistryError};
pub use repository::{
    ApplicationStore, AuditStore, PersonStore, RepositoryError, SsnStore,
};
pub use router::{issuance_router, ApplicationView};
pub use service::{IssuanceWorkflow, WorkflowError, WorkflowPolicy};
