//! Mutex-guarded in-memory stores.
//!
//! These back the binary and the test suites. Every atomicity contract from
//! the store traits is honored by doing the check and the write under one
//! lock; a database-backed implementation would use unique constraints and
//! conditional updates instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};

use crate::workflows::issuance::domain::{
    Application, ApplicationDraft, ApplicationId, ApplicationStatus, AuditEntry, IssuedSsn,
    Person, PersonDraft, PersonId, Ssn, SsnStatus,
};
use crate::workflows::issuance::repository::{
    ApplicationStore, AuditStore, PersonStore, RepositoryError, SsnStore,
};

#[derive(Default, Clone)]
pub struct InMemoryPersonStore {
    rows: Arc<Mutex<Vec<Person>>>,
    sequence: Arc<AtomicU64>,
}

impl PersonStore for InMemoryPersonStore {
    fn insert(&self, draft: PersonDraft) -> Result<Person, RepositoryError> {
        let id = PersonId(self.sequence.fetch_add(1, Ordering::Relaxed) + 1);
        let person = Person {
            id,
            first_name: draft.first_name,
            middle_name: draft.middle_name,
            last_name: draft.last_name,
            date_of_birth: draft.date_of_birth,
            place_of_birth: draft.place_of_birth,
            mothers_maiden_name: draft.mothers_maiden_name,
            fathers_name: draft.fathers_name,
            citizenship: draft.citizenship,
            ssn: None,
            created_at: Utc::now(),
        };
        let mut rows = self.rows.lock().expect("person store mutex poisoned");
        rows.push(person.clone());
        Ok(person)
    }

    fn fetch(&self, id: PersonId) -> Result<Option<Person>, RepositoryError> {
        let rows = self.rows.lock().expect("person store mutex poisoned");
        Ok(rows.iter().find(|row| row.id == id).cloned())
    }

    fn update(&self, person: Person) -> Result<Person, RepositoryError> {
        let mut rows = self.rows.lock().expect("person store mutex poisoned");
        let row = rows
            .iter_mut()
            .find(|row| row.id == person.id)
            .ok_or(RepositoryError::NotFound)?;
        // Demographic fields only; the number assignment survives as stored.
        row.first_name = person.first_name;
        row.middle_name = person.middle_name;
        row.last_name = person.last_name;
        row.date_of_birth = person.date_of_birth;
        row.place_of_birth = person.place_of_birth;
        row.mothers_maiden_name = person.mothers_maiden_name;
        row.fathers_name = person.fathers_name;
        row.citizenship = person.citizenship;
        Ok(row.clone())
    }

    fn find_by_name(&self, first: &str, last: &str) -> Result<Vec<Person>, RepositoryError> {
        let rows = self.rows.lock().expect("person store mutex poisoned");
        Ok(rows
            .iter()
            .filter(|row| {
                row.first_name.eq_ignore_ascii_case(first)
                    && row.last_name.eq_ignore_ascii_case(last)
            })
            .cloned()
            .collect())
    }

    fn find_by_ssn(&self, ssn: &Ssn) -> Result<Option<Person>, RepositoryError> {
        let rows = self.rows.lock().expect("person store mutex poisoned");
        Ok(rows
            .iter()
            .find(|row| row.ssn.as_ref() == Some(ssn))
            .cloned())
    }

    fn find_by_date_of_birth(&self, dob: NaiveDate) -> Result<Vec<Person>, RepositoryError> {
        let rows = self.rows.lock().expect("person store mutex poisoned");
        Ok(rows
            .iter()
            .filter(|row| row.date_of_birth == dob)
            .cloned()
            .collect())
    }

    fn has_ssn(&self, id: PersonId) -> Result<bool, RepositoryError> {
        let rows = self.rows.lock().expect("person store mutex poisoned");
        rows.iter()
            .find(|row| row.id == id)
            .map(|row| row.ssn.is_some())
            .ok_or(RepositoryError::NotFound)
    }

    fn assign_ssn(&self, id: PersonId, ssn: Ssn) -> Result<Person, RepositoryError> {
        let mut rows = self.rows.lock().expect("person store mutex poisoned");
        let row = rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if row.ssn.is_some() {
            return Err(RepositoryError::Conflict);
        }
        row.ssn = Some(ssn);
        Ok(row.clone())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryApplicationStore {
    rows: Arc<Mutex<Vec<Application>>>,
    sequence: Arc<AtomicU64>,
}

impl ApplicationStore for InMemoryApplicationStore {
    fn insert(&self, draft: ApplicationDraft) -> Result<Application, RepositoryError> {
        let mut rows = self.rows.lock().expect("application store mutex poisoned");
        let duplicate = rows.iter().any(|row| {
            (row.person_id == draft.person_id && row.is_pending())
                || row.reference == draft.reference
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }

        let application = Application {
            id: ApplicationId(self.sequence.fetch_add(1, Ordering::Relaxed) + 1),
            reference: draft.reference,
            person_id: draft.person_id,
            submitted_at: draft.submitted_at,
            status: ApplicationStatus::Pending,
            reviewed_at: None,
            review_notes: None,
            reviewed_by: None,
            assigned_ssn: None,
        };
        rows.push(application.clone());
        Ok(application)
    }

    fn fetch(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let rows = self.rows.lock().expect("application store mutex poisoned");
        Ok(rows.iter().find(|row| row.id == id).cloned())
    }

    fn find_by_reference(&self, reference: &str) -> Result<Option<Application>, RepositoryError> {
        let rows = self.rows.lock().expect("application store mutex poisoned");
        Ok(rows.iter().find(|row| row.reference == reference).cloned())
    }

    fn find_by_status(
        &self,
        status: ApplicationStatus,
    ) -> Result<Vec<Application>, RepositoryError> {
        let rows = self.rows.lock().expect("application store mutex poisoned");
        Ok(rows
            .iter()
            .filter(|row| row.status == status)
            .cloned()
            .collect())
    }

    fn find_by_person(&self, person_id: PersonId) -> Result<Vec<Application>, RepositoryError> {
        let rows = self.rows.lock().expect("application store mutex poisoned");
        Ok(rows
            .iter()
            .filter(|row| row.person_id == person_id)
            .cloned()
            .collect())
    }

    fn find_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Application>, RepositoryError> {
        let rows = self.rows.lock().expect("application store mutex poisoned");
        Ok(rows
            .iter()
            .filter(|row| row.submitted_at >= from && row.submitted_at <= to)
            .cloned()
            .collect())
    }

    fn count_by_status(&self, status: ApplicationStatus) -> Result<u64, RepositoryError> {
        let rows = self.rows.lock().expect("application store mutex poisoned");
        Ok(rows.iter().filter(|row| row.status == status).count() as u64)
    }

    fn update_if_status(
        &self,
        updated: Application,
        expected: ApplicationStatus,
    ) -> Result<Application, RepositoryError> {
        let mut rows = self.rows.lock().expect("application store mutex poisoned");
        let row = rows
            .iter_mut()
            .find(|row| row.id == updated.id)
            .ok_or(RepositoryError::NotFound)?;
        if row.status != expected {
            return Err(RepositoryError::Conflict);
        }
        *row = updated;
        Ok(row.clone())
    }
}

#[derive(Default, Clone)]
pub struct InMemorySsnStore {
    rows: Arc<Mutex<Vec<IssuedSsn>>>,
}

impl SsnStore for InMemorySsnStore {
    fn reserve(&self, record: IssuedSsn) -> Result<IssuedSsn, RepositoryError> {
        let mut rows = self.rows.lock().expect("ssn store mutex poisoned");
        // A number is taken forever; a person is only bound by a row that is
        // still Active or Suspended.
        let taken = rows.iter().any(|row| {
            row.ssn == record.ssn
                || (row.person_id == record.person_id && row.status != SsnStatus::Revoked)
        });
        if taken {
            return Err(RepositoryError::Conflict);
        }
        rows.push(record.clone());
        Ok(record)
    }

    fn fetch(&self, ssn: &Ssn) -> Result<Option<IssuedSsn>, RepositoryError> {
        let rows = self.rows.lock().expect("ssn store mutex poisoned");
        Ok(rows.iter().find(|row| &row.ssn == ssn).cloned())
    }

    fn find_by_person(&self, person_id: PersonId) -> Result<Option<IssuedSsn>, RepositoryError> {
        let rows = self.rows.lock().expect("ssn store mutex poisoned");
        Ok(rows
            .iter()
            .find(|row| row.person_id == person_id && row.status != SsnStatus::Revoked)
            .cloned())
    }

    fn exists(&self, ssn: &Ssn) -> Result<bool, RepositoryError> {
        let rows = self.rows.lock().expect("ssn store mutex poisoned");
        Ok(rows.iter().any(|row| &row.ssn == ssn))
    }

    fn find_by_status(&self, status: SsnStatus) -> Result<Vec<IssuedSsn>, RepositoryError> {
        let rows = self.rows.lock().expect("ssn store mutex poisoned");
        Ok(rows
            .iter()
            .filter(|row| row.status == status)
            .cloned()
            .collect())
    }

    fn latest_issued(&self) -> Result<Option<IssuedSsn>, RepositoryError> {
        let rows = self.rows.lock().expect("ssn store mutex poisoned");
        Ok(rows.last().cloned())
    }

    fn set_status_if(
        &self,
        ssn: &Ssn,
        expected: SsnStatus,
        next: SsnStatus,
    ) -> Result<IssuedSsn, RepositoryError> {
        let mut rows = self.rows.lock().expect("ssn store mutex poisoned");
        let row = rows
            .iter_mut()
            .find(|row| &row.ssn == ssn)
            .ok_or(RepositoryError::NotFound)?;
        if row.status != expected {
            return Err(RepositoryError::Conflict);
        }
        row.status = next;
        Ok(row.clone())
    }

    fn count(&self) -> Result<u64, RepositoryError> {
        let rows = self.rows.lock().expect("ssn store mutex poisoned");
        Ok(rows.len() as u64)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryAuditStore {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl InMemoryAuditStore {
    /// Snapshot of everything appended so far, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .expect("audit store mutex poisoned")
            .clone()
    }
}

impl AuditStore for InMemoryAuditStore {
    fn append(&self, entry: AuditEntry) -> Result<(), RepositoryError> {
        let mut entries = self.entries.lock().expect("audit store mutex poisoned");
        entries.push(entry);
        Ok(())
    }

    fn find_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>, RepositoryError> {
        let entries = self.entries.lock().expect("audit store mutex poisoned");
        Ok(entries
            .iter()
            .filter(|entry| entry.recorded_at >= from && entry.recorded_at <= to)
            .cloned()
            .collect())
    }

    fn find_by_actor(&self, actor: &str) -> Result<Vec<AuditEntry>, RepositoryError> {
        let entries = self.entries.lock().expect("audit store mutex poisoned");
        Ok(entries
            .iter()
            .filter(|entry| entry.actor == actor)
            .cloned()
            .collect())
    }

    fn find_by_action(&self, action: &str) -> Result<Vec<AuditEntry>, RepositoryError> {
        let entries = self.entries.lock().expect("audit store mutex poisoned");
        Ok(entries
            .iter()
            .filter(|entry| entry.action == action)
            .cloned()
            .collect())
    }

    fn find_recent(&self, limit: usize) -> Result<Vec<AuditEntry>, RepositoryError> {
        let entries = self.entries.lock().expect("audit store mutex poisoned");
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }
}
