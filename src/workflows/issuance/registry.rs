use std::sync::Arc;

use super::audit::AuditTrail;
use super::domain::{actions, Person, PersonDraft, PersonId, Ssn};
use super::repository::{AuditStore, PersonStore, RepositoryError};

/// Errors raised while managing person records.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("required field missing or empty: {field}")]
    Validation { field: &'static str },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Validates and stores demographic records for applicants.
///
/// Registration checks validity only. Eligibility (the age window) is a
/// review-time concern owned by the workflow, so a guardian can register a
/// newborn long before any application is approved.
pub struct PersonRegistry<P, L> {
    persons: Arc<P>,
    audit: AuditTrail<L>,
}

impl<P, L> Clone for PersonRegistry<P, L> {
    fn clone(&self) -> Self {
        Self {
            persons: self.persons.clone(),
            audit: self.audit.clone(),
        }
    }
}

impl<P, L> PersonRegistry<P, L>
where
    P: PersonStore,
    L: AuditStore,
{
    pub fn new(persons: Arc<P>, audit: AuditTrail<L>) -> Self {
        Self { persons, audit }
    }

    pub fn register(&self, draft: PersonDraft) -> Result<Person, RegistryError> {
        if let Some(field) = draft.first_missing_field() {
            return Err(RegistryError::Validation { field });
        }

        let person = self.persons.insert(draft)?;
        self.audit.record(
            "registry",
            actions::PERSON_REGISTERED,
            format!("person {} ({})", person.id, person.full_name()),
            None,
        );
        Ok(person)
    }

    /// Correct the demographic fields of an existing record. The stored
    /// number assignment is not touched by this path.
    pub fn update(&self, person: Person) -> Result<Person, RegistryError> {
        let draft = PersonDraft {
            first_name: person.first_name.clone(),
            middle_name: person.middle_name.clone(),
            last_name: person.last_name.clone(),
            date_of_birth: person.date_of_birth,
            place_of_birth: person.place_of_birth.clone(),
            mothers_maiden_name: person.mothers_maiden_name.clone(),
            fathers_name: person.fathers_name.clone(),
            citizenship: person.citizenship,
        };
        if let Some(field) = draft.first_missing_field() {
            return Err(RegistryError::Validation { field });
        }

        let updated = self.persons.update(person)?;
        self.audit.record(
            "registry",
            actions::PERSON_UPDATED,
            format!("person {}", updated.id),
            None,
        );
        Ok(updated)
    }

    pub fn find(&self, id: PersonId) -> Result<Option<Person>, RegistryError> {
        Ok(self.persons.fetch(id)?)
    }

    pub fn find_by_name(&self, first: &str, last: &str) -> Result<Vec<Person>, RegistryError> {
        Ok(self.persons.find_by_name(first, last)?)
    }

    pub fn find_by_ssn(&self, ssn: &Ssn) -> Result<Option<Person>, RegistryError> {
        Ok(self.persons.find_by_ssn(ssn)?)
    }

    pub fn has_ssn(&self, id: PersonId) -> Result<bool, RegistryError> {
        Ok(self.persons.has_ssn(id)?)
    }
}
