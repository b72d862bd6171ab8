use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for registered persons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PersonId(pub u64);

/// Identifier wrapper for issuance applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub u64);

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Citizenship categories that qualify an applicant for a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CitizenshipStatus {
    UsCitizen,
    PermanentResident,
    WorkVisa,
    OtherAuthorized,
}

impl CitizenshipStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CitizenshipStatus::UsCitizen => "U.S. Citizen",
            CitizenshipStatus::PermanentResident => "Lawful Permanent Resident",
            CitizenshipStatus::WorkVisa => "Work Visa Holder",
            CitizenshipStatus::OtherAuthorized => "Other Authorized Status",
        }
    }
}

/// Applicant-supplied demographic facts, prior to registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonDraft {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub place_of_birth: String,
    pub mothers_maiden_name: String,
    pub fathers_name: String,
    pub citizenship: CitizenshipStatus,
}

impl PersonDraft {
    /// Returns the first required field that is blank, if any.
    ///
    /// The middle name is the only optional demographic field; everything
    /// else must be non-empty after trimming.
    pub fn first_missing_field(&self) -> Option<&'static str> {
        let required = [
            ("first_name", self.first_name.as_str()),
            ("last_name", self.last_name.as_str()),
            ("place_of_birth", self.place_of_birth.as_str()),
            ("mothers_maiden_name", self.mothers_maiden_name.as_str()),
            ("fathers_name", self.fathers_name.as_str()),
        ];
        required
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| field)
    }

    pub fn is_valid(&self) -> bool {
        self.first_missing_field().is_none()
    }
}

/// A registered person. Identity is the assigned `person_id`; demographic
/// fields never participate in equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub place_of_birth: String,
    pub mothers_maiden_name: String,
    pub fathers_name: String,
    pub citizenship: CitizenshipStatus,
    pub ssn: Option<Ssn>,
    pub created_at: DateTime<Utc>,
}

impl Person {
    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref().map(str::trim) {
            Some(middle) if !middle.is_empty() => {
                format!("{} {} {}", self.first_name, middle, self.last_name)
            }
            _ => format!("{} {}", self.first_name, self.last_name),
        }
    }

    /// Age-based issuance rule: born on or before `today`, within 120 years.
    pub fn eligible_on(&self, today: NaiveDate) -> bool {
        let floor = today - chrono::Months::new(120 * 12);
        self.date_of_birth <= today && self.date_of_birth > floor
    }

    pub fn is_eligible(&self) -> bool {
        self.eligible_on(Utc::now().date_naive())
    }

    pub fn has_ssn(&self) -> bool {
        self.ssn.is_some()
    }
}

impl PartialEq for Person {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Person {}

impl Hash for Person {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A nine-digit number in canonical `AAA-GG-SSSS` form.
///
/// Construction goes through [`Ssn::parse`], so a value of this type always
/// holds the canonical separator layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ssn(String);

impl Ssn {
    /// Accepts nine decimal digits with or without separators.
    pub fn parse(raw: &str) -> Option<Ssn> {
        let digits: String = raw.chars().filter(|c| *c != '-').collect();
        if digits.len() != 9 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(Ssn(format!(
            "{}-{}-{}",
            &digits[0..3],
            &digits[3..5],
            &digits[5..9]
        )))
    }

    pub fn is_valid_format(raw: &str) -> bool {
        Ssn::parse(raw).is_some()
    }

    /// Build from numeric segments already known to be in range.
    pub(crate) fn from_parts(area: u16, group: u8, serial: u16) -> Ssn {
        Ssn(format!("{area:03}-{group:02}-{serial:04}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The nine digits without separators.
    pub fn digits(&self) -> String {
        self.0.chars().filter(|c| *c != '-').collect()
    }

    pub fn area(&self) -> &str {
        &self.0[0..3]
    }

    pub fn group(&self) -> &str {
        &self.0[4..6]
    }

    pub fn serial(&self) -> &str {
        &self.0[7..11]
    }

    /// Render for logs and external views: only the serial survives.
    pub fn masked(&self) -> String {
        format!("***-**-{}", self.serial())
    }
}

impl fmt::Display for Ssn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of an issued number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SsnStatus {
    Active,
    Suspended,
    Revoked,
}

impl SsnStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SsnStatus::Active => "active",
            SsnStatus::Suspended => "suspended",
            SsnStatus::Revoked => "revoked",
        }
    }
}

/// Ledger row for an issued number. Identity is the number itself; a number
/// is written exactly once and never reassigned, whatever its status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedSsn {
    pub ssn: Ssn,
    pub person_id: PersonId,
    pub issued_at: DateTime<Utc>,
    pub status: SsnStatus,
}

impl IssuedSsn {
    pub fn new(ssn: Ssn, person_id: PersonId, issued_at: DateTime<Utc>) -> Self {
        Self {
            ssn,
            person_id,
            issued_at,
            status: SsnStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SsnStatus::Active
    }
}

impl PartialEq for IssuedSsn {
    fn eq(&self, other: &Self) -> bool {
        self.ssn == other.ssn
    }
}

impl Eq for IssuedSsn {}

/// Review state of an application. Transitions are one-way out of `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

/// Fields fixed at submission time; the store assigns the numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub reference: String,
    pub person_id: PersonId,
    pub submitted_at: DateTime<Utc>,
}

/// An issuance request moving through review. Identity is the numeric id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub reference: String,
    pub person_id: PersonId,
    pub submitted_at: DateTime<Utc>,
    pub status: ApplicationStatus,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub reviewed_by: Option<String>,
    pub assigned_ssn: Option<Ssn>,
}

impl Application {
    pub fn is_pending(&self) -> bool {
        self.status == ApplicationStatus::Pending
    }

    /// The approved copy of this application, ready for the store's
    /// compare-and-set. Does not touch the stored record.
    pub fn approved(mut self, reviewer: &str, ssn: Ssn, at: DateTime<Utc>) -> Application {
        self.status = ApplicationStatus::Approved;
        self.reviewed_by = Some(reviewer.to_string());
        self.reviewed_at = Some(at);
        self.assigned_ssn = Some(ssn);
        self
    }

    /// The rejected copy of this application, carrying the reviewer's reason.
    pub fn rejected(mut self, reviewer: &str, reason: &str, at: DateTime<Utc>) -> Application {
        self.status = ApplicationStatus::Rejected;
        self.reviewed_by = Some(reviewer.to_string());
        self.reviewed_at = Some(at);
        self.review_notes = Some(reason.to_string());
        self
    }
}

impl PartialEq for Application {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Application {}

/// Reference codes look like `APP-2026-7XK2QD`: submission year plus six
/// uppercase alphanumerics.
pub fn reference_for_year(year: i32, suffix: &str) -> String {
    format!("APP-{year}-{suffix}")
}

pub fn submission_year(at: DateTime<Utc>) -> i32 {
    at.date_naive().year()
}

/// One immutable line of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub recorded_at: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    pub details: String,
    pub origin: Option<String>,
}

impl AuditEntry {
    pub fn new(actor: &str, action: &str, details: String, origin: Option<&str>) -> Self {
        Self {
            recorded_at: Utc::now(),
            actor: actor.to_string(),
            action: action.to_string(),
            details,
            origin: origin.map(str::to_string),
        }
    }
}

/// Action tags recorded on the audit trail.
pub mod actions {
    pub const PERSON_REGISTERED: &str = "PERSON_REGISTERED";
    pub const PERSON_UPDATED: &str = "PERSON_UPDATED";
    pub const APPLICATION_SUBMITTED: &str = "APPLICATION_SUBMITTED";
    pub const APPLICATION_APPROVED: &str = "APPLICATION_APPROVED";
    pub const APPLICATION_REJECTED: &str = "APPLICATION_REJECTED";
    pub const SSN_ISSUED: &str = "SSN_ISSUED";
    pub const SSN_SUSPENDED: &str = "SSN_SUSPENDED";
    pub const SSN_REACTIVATED: &str = "SSN_REACTIVATED";
    pub const SSN_REVOKED: &str = "SSN_REVOKED";
    pub const SSN_LOOKUP: &str = "SSN_LOOKUP";
}
