use std::sync::Arc;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::warn;

use super::audit::AuditTrail;
use super::authority::{AuthorityError, SsnAuthority};
use super::domain::{
    actions, reference_for_year, submission_year, Application, ApplicationDraft, ApplicationId,
    ApplicationStatus, Person, PersonDraft, PersonId,
};
use super::registry::{PersonRegistry, RegistryError};
use super::repository::{
    ApplicationStore, AuditStore, PersonStore, RepositoryError, SsnStore,
};

/// Review-policy knobs for the workflow.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowPolicy {
    /// Whether an applicant whose previous application was rejected may
    /// submit again. Only a pending duplicate is ever allowed to block when
    /// this is on.
    pub allow_resubmission_after_rejection: bool,
    /// Retry cap for number generation.
    pub max_generation_attempts: u32,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self {
            allow_resubmission_after_rejection: true,
            max_generation_attempts: 100,
        }
    }
}

/// Errors raised by the application workflow.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("applicant is not eligible for issuance")]
    NotEligible,
    #[error("person already holds an issued number")]
    AlreadyHasSsn,
    #[error("person already has a pending application")]
    DuplicatePendingApplication,
    #[error("a previously rejected applicant may not resubmit under current policy")]
    ResubmissionClosed,
    #[error("application not found")]
    NotFound,
    #[error("application has already been reviewed")]
    NotPending,
    #[error(transparent)]
    Issuance(#[from] AuthorityError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Orchestrates the submit, approve, and reject lifecycle.
///
/// The load-bearing guarantees live here and in the stores underneath:
/// the PENDING-to-terminal transition is a per-application compare-and-set,
/// and approval only commits after the number is safely reserved, so a
/// failed issuance leaves the application pending and the person untouched.
pub struct IssuanceWorkflow<P, A, S, L> {
    persons: Arc<P>,
    applications: Arc<A>,
    registry: PersonRegistry<P, L>,
    authority: SsnAuthority<S, L>,
    audit: AuditTrail<L>,
    policy: WorkflowPolicy,
}

impl<P, A, S, L> IssuanceWorkflow<P, A, S, L>
where
    P: PersonStore,
    A: ApplicationStore,
    S: SsnStore,
    L: AuditStore,
{
    pub fn new(
        persons: Arc<P>,
        applications: Arc<A>,
        ssns: Arc<S>,
        audit_store: Arc<L>,
        policy: WorkflowPolicy,
    ) -> Self {
        let audit = AuditTrail::new(audit_store);
        let registry = PersonRegistry::new(persons.clone(), audit.clone());
        let authority = SsnAuthority::new(ssns, audit.clone(), policy.max_generation_attempts);
        Self {
            persons,
            applications,
            registry,
            authority,
            audit,
            policy,
        }
    }

    pub fn registry(&self) -> &PersonRegistry<P, L> {
        &self.registry
    }

    pub fn authority(&self) -> &SsnAuthority<S, L> {
        &self.authority
    }

    pub fn audit(&self) -> &AuditTrail<L> {
        &self.audit
    }

    /// Register a new applicant and open an application in one step.
    pub fn submit(&self, applicant: PersonDraft) -> Result<Application, WorkflowError> {
        let person = self.registry.register(applicant)?;
        self.open_application(&person)
    }

    /// Open an application for someone already on file, e.g. a resubmission
    /// after an earlier rejection.
    pub fn submit_existing(&self, person_id: PersonId) -> Result<Application, WorkflowError> {
        let person = self
            .persons
            .fetch(person_id)?
            .ok_or(WorkflowError::NotFound)?;
        self.open_application(&person)
    }

    fn open_application(&self, person: &Person) -> Result<Application, WorkflowError> {
        if person.has_ssn() || self.authority.find_by_person(person.id)?.is_some() {
            return Err(WorkflowError::AlreadyHasSsn);
        }

        let prior = self.applications.find_by_person(person.id)?;
        if prior.iter().any(Application::is_pending) {
            return Err(WorkflowError::DuplicatePendingApplication);
        }
        if !self.policy.allow_resubmission_after_rejection
            && prior
                .iter()
                .any(|app| app.status == ApplicationStatus::Rejected)
        {
            return Err(WorkflowError::ResubmissionClosed);
        }

        let now = Utc::now();
        let draft = ApplicationDraft {
            reference: generate_reference(submission_year(now)),
            person_id: person.id,
            submitted_at: now,
        };
        let application = match self.applications.insert(draft) {
            Ok(application) => application,
            // The store's atomic pending-per-person guard closed a race the
            // pre-check above could not see.
            Err(RepositoryError::Conflict) => {
                return Err(WorkflowError::DuplicatePendingApplication)
            }
            Err(err) => return Err(err.into()),
        };

        self.audit.record(
            "workflow",
            actions::APPLICATION_SUBMITTED,
            format!(
                "application {} ({}) for person {}",
                application.id, application.reference, person.id
            ),
            None,
        );
        Ok(application)
    }

    /// Approve a pending application: mint a number, commit the transition,
    /// and attach the number to both the application and the person.
    pub fn approve(
        &self,
        id: ApplicationId,
        reviewer: &str,
    ) -> Result<Application, WorkflowError> {
        let application = self.applications.fetch(id)?.ok_or(WorkflowError::NotFound)?;
        if !application.is_pending() {
            return Err(WorkflowError::NotPending);
        }

        let person = self
            .persons
            .fetch(application.person_id)?
            .ok_or(WorkflowError::NotFound)?;
        if !person.eligible_on(Utc::now().date_naive()) {
            return Err(WorkflowError::NotEligible);
        }

        // Reserve the number before committing the transition: if generation
        // fails the application must stay pending with nothing attached.
        let issued = match self.authority.issue(person.id) {
            Ok(issued) => issued,
            Err(AuthorityError::AlreadyIssued) => return Err(WorkflowError::AlreadyHasSsn),
            Err(err) => return Err(WorkflowError::Issuance(err)),
        };

        let now = Utc::now();
        let updated = application.approved(reviewer, issued.ssn.clone(), now);
        let stored = match self
            .applications
            .update_if_status(updated, ApplicationStatus::Pending)
        {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => {
                // A concurrent reviewer won the transition between our pending
                // check and the commit. The minted number is burned, never
                // returned to the pool; revocation releases the person so a
                // later application can still be issued a fresh number.
                if let Err(err) = self
                    .authority
                    .revoke(&issued.ssn, "approval lost the review race")
                {
                    warn!(%err, "failed to revoke number after lost approval race");
                }
                return Err(WorkflowError::NotPending);
            }
            Err(err) => return Err(err.into()),
        };

        self.persons.assign_ssn(person.id, issued.ssn.clone())?;
        self.audit.record(
            reviewer,
            actions::APPLICATION_APPROVED,
            format!(
                "application {} approved, {} assigned to person {}",
                stored.id,
                issued.ssn.masked(),
                person.id
            ),
            None,
        );
        Ok(stored)
    }

    /// Reject a pending application with a reviewer-supplied reason.
    pub fn reject(
        &self,
        id: ApplicationId,
        reason: &str,
        reviewer: &str,
    ) -> Result<Application, WorkflowError> {
        let application = self.applications.fetch(id)?.ok_or(WorkflowError::NotFound)?;
        if !application.is_pending() {
            return Err(WorkflowError::NotPending);
        }

        let updated = application.rejected(reviewer, reason, Utc::now());
        let stored = match self
            .applications
            .update_if_status(updated, ApplicationStatus::Pending)
        {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => return Err(WorkflowError::NotPending),
            Err(err) => return Err(err.into()),
        };

        self.audit.record(
            reviewer,
            actions::APPLICATION_REJECTED,
            format!("application {} rejected: {reason}", stored.id),
            None,
        );
        Ok(stored)
    }

    /// All applications awaiting review, in submission order.
    pub fn pending(&self) -> Result<Vec<Application>, WorkflowError> {
        Ok(self.applications.find_by_status(ApplicationStatus::Pending)?)
    }

    pub fn by_reference(&self, reference: &str) -> Result<Application, WorkflowError> {
        self.applications
            .find_by_reference(reference)?
            .ok_or(WorkflowError::NotFound)
    }

    pub fn by_person(&self, person_id: PersonId) -> Result<Vec<Application>, WorkflowError> {
        Ok(self.applications.find_by_person(person_id)?)
    }

    pub fn count_by_status(&self, status: ApplicationStatus) -> Result<u64, WorkflowError> {
        Ok(self.applications.count_by_status(status)?)
    }
}

fn generate_reference(year: i32) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();
    reference_for_year(year, &suffix)
}
