use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tracing::debug;

use super::audit::AuditTrail;
use super::domain::{actions, IssuedSsn, PersonId, Ssn, SsnStatus};
use super::repository::{AuditStore, RepositoryError, SsnStore};

/// Errors raised by number issuance and lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthorityError {
    #[error("person already holds an issued number")]
    AlreadyIssued,
    #[error("could not find an unissued number after {attempts} attempts")]
    ExhaustedSpace { attempts: u32 },
    #[error("number not found")]
    NotFound,
    #[error("number is not active")]
    AlreadySuspended,
    #[error("number is not suspended")]
    NotSuspended,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Issues numbers and manages their lifecycle.
///
/// Generation proposes random area/group/serial candidates and relies on the
/// store's atomic [`SsnStore::reserve`] for uniqueness across the whole
/// namespace: a collision simply costs one retry. The ledger keeps every
/// number ever issued, so nothing is recycled after suspension or
/// revocation.
pub struct SsnAuthority<S, L> {
    ssns: Arc<S>,
    audit: AuditTrail<L>,
    max_attempts: u32,
}

impl<S, L> Clone for SsnAuthority<S, L> {
    fn clone(&self) -> Self {
        Self {
            ssns: self.ssns.clone(),
            audit: self.audit.clone(),
            max_attempts: self.max_attempts,
        }
    }
}

fn random_candidate<R: Rng>(rng: &mut R) -> Ssn {
    // Structural segments only: area 001-899 skipping 666, group 01-99,
    // serial 0001-9999. No segment is ever all zeros.
    let mut area: u16 = rng.gen_range(1..=898);
    if area >= 666 {
        area += 1;
    }
    let group: u8 = rng.gen_range(1..=99);
    let serial: u16 = rng.gen_range(1..=9999);
    Ssn::from_parts(area, group, serial)
}

impl<S, L> SsnAuthority<S, L>
where
    S: SsnStore,
    L: AuditStore,
{
    pub fn new(ssns: Arc<S>, audit: AuditTrail<L>, max_attempts: u32) -> Self {
        Self {
            ssns,
            audit,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Mint a number for `person_id`. At most one number is ever issued per
    /// person; retries after a candidate collision are bounded by the
    /// configured attempt cap.
    pub fn issue(&self, person_id: PersonId) -> Result<IssuedSsn, AuthorityError> {
        if self.ssns.find_by_person(person_id)?.is_some() {
            return Err(AuthorityError::AlreadyIssued);
        }

        let mut rng = rand::thread_rng();
        for attempt in 1..=self.max_attempts {
            let candidate = random_candidate(&mut rng);
            match self
                .ssns
                .reserve(IssuedSsn::new(candidate, person_id, Utc::now()))
            {
                Ok(issued) => {
                    self.audit.record(
                        "authority",
                        actions::SSN_ISSUED,
                        format!("{} issued to person {}", issued.ssn.masked(), person_id),
                        None,
                    );
                    return Ok(issued);
                }
                Err(RepositoryError::Conflict) => {
                    // Either the candidate number was taken or another caller
                    // just issued for this person; re-check which.
                    if self.ssns.find_by_person(person_id)?.is_some() {
                        return Err(AuthorityError::AlreadyIssued);
                    }
                    debug!(attempt, "candidate collision, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(AuthorityError::ExhaustedSpace {
            attempts: self.max_attempts,
        })
    }

    pub fn validate_format(&self, raw: &str) -> bool {
        Ssn::is_valid_format(raw)
    }

    /// Look up the ledger row for a number. The access itself is audited.
    pub fn lookup(&self, raw: &str) -> Result<IssuedSsn, AuthorityError> {
        let ssn = Ssn::parse(raw).ok_or(AuthorityError::NotFound)?;
        let record = self.ssns.fetch(&ssn)?.ok_or(AuthorityError::NotFound)?;
        self.audit.record(
            "authority",
            actions::SSN_LOOKUP,
            format!("lookup of {}", record.ssn.masked()),
            None,
        );
        Ok(record)
    }

    pub fn suspend(&self, raw: &str, reason: &str) -> Result<IssuedSsn, AuthorityError> {
        let ssn = Ssn::parse(raw).ok_or(AuthorityError::NotFound)?;
        let current = self.ssns.fetch(&ssn)?.ok_or(AuthorityError::NotFound)?;
        if current.status != SsnStatus::Active {
            return Err(AuthorityError::AlreadySuspended);
        }

        match self
            .ssns
            .set_status_if(&ssn, SsnStatus::Active, SsnStatus::Suspended)
        {
            Ok(updated) => {
                self.audit.record(
                    "authority",
                    actions::SSN_SUSPENDED,
                    format!("{} suspended: {reason}", updated.ssn.masked()),
                    None,
                );
                Ok(updated)
            }
            Err(RepositoryError::Conflict) => Err(AuthorityError::AlreadySuspended),
            Err(err) => Err(err.into()),
        }
    }

    pub fn reactivate(&self, raw: &str) -> Result<IssuedSsn, AuthorityError> {
        let ssn = Ssn::parse(raw).ok_or(AuthorityError::NotFound)?;
        let current = self.ssns.fetch(&ssn)?.ok_or(AuthorityError::NotFound)?;
        if current.status != SsnStatus::Suspended {
            return Err(AuthorityError::NotSuspended);
        }

        match self
            .ssns
            .set_status_if(&ssn, SsnStatus::Suspended, SsnStatus::Active)
        {
            Ok(updated) => {
                self.audit.record(
                    "authority",
                    actions::SSN_REACTIVATED,
                    format!("{} reactivated", updated.ssn.masked()),
                    None,
                );
                Ok(updated)
            }
            Err(RepositoryError::Conflict) => Err(AuthorityError::NotSuspended),
            Err(err) => Err(err.into()),
        }
    }

    /// Permanently retire a number. The ledger row stays forever, so the
    /// value can never be issued again; the holder is released and may be
    /// issued a fresh number.
    pub fn revoke(&self, ssn: &Ssn, reason: &str) -> Result<IssuedSsn, AuthorityError> {
        let current = self.ssns.fetch(ssn)?.ok_or(AuthorityError::NotFound)?;
        let updated = self.ssns.set_status_if(ssn, current.status, SsnStatus::Revoked)?;
        self.audit.record(
            "authority",
            actions::SSN_REVOKED,
            format!("{} revoked: {reason}", updated.ssn.masked()),
            None,
        );
        Ok(updated)
    }

    pub fn find_by_person(&self, person_id: PersonId) -> Result<Option<IssuedSsn>, AuthorityError> {
        Ok(self.ssns.find_by_person(person_id)?)
    }

    /// Total numbers ever issued, in any status.
    pub fn total_issued(&self) -> Result<u64, AuthorityError> {
        Ok(self.ssns.count()?)
    }
}
