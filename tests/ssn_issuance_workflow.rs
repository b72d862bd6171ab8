use std::sync::Arc;

use ssa_registry::infra::{
    InMemoryApplicationStore, InMemoryAuditStore, InMemoryPersonStore, InMemorySsnStore,
};
use ssa_registry::workflows::issuance::{
    actions, ApplicationStatus, CitizenshipStatus, IssuanceWorkflow, PersonDraft, Ssn, SsnStatus,
    WorkflowError, WorkflowPolicy,
};

fn applicant(first: &str, last: &str) -> PersonDraft {
    PersonDraft {
        first_name: first.to_string(),
        middle_name: None,
        last_name: last.to_string(),
        date_of_birth: chrono::NaiveDate::from_ymd_opt(1988, 11, 2).expect("valid date"),
        place_of_birth: "Cedar Rapids, IA".to_string(),
        mothers_maiden_name: "Whitfield".to_string(),
        fathers_name: "Daniel Reyes".to_string(),
        citizenship: CitizenshipStatus::PermanentResident,
    }
}

fn workflow() -> (
    IssuanceWorkflow<
        InMemoryPersonStore,
        InMemoryApplicationStore,
        InMemorySsnStore,
        InMemoryAuditStore,
    >,
    Arc<InMemoryAuditStore>,
) {
    let audit = Arc::new(InMemoryAuditStore::default());
    let workflow = IssuanceWorkflow::new(
        Arc::new(InMemoryPersonStore::default()),
        Arc::new(InMemoryApplicationStore::default()),
        Arc::new(InMemorySsnStore::default()),
        audit.clone(),
        WorkflowPolicy::default(),
    );
    (workflow, audit)
}

#[test]
fn lifecycle_runs_from_submission_through_number_management() {
    let (workflow, audit) = workflow();

    let application = workflow
        .submit(applicant("Elena", "Reyes"))
        .expect("complete applicant submits");
    assert_eq!(application.status, ApplicationStatus::Pending);
    assert!(application.reference.starts_with("APP-"));

    let approved = workflow
        .approve(application.id, "field-office-12")
        .expect("pending application approves");
    assert_eq!(approved.status, ApplicationStatus::Approved);
    let ssn = approved.assigned_ssn.expect("number assigned on approval");
    assert!(Ssn::is_valid_format(ssn.as_str()));

    // The person record now carries the number and the ledger agrees.
    let person = workflow
        .registry()
        .find(application.person_id)
        .expect("store reachable")
        .expect("person on file");
    assert_eq!(person.ssn.as_ref(), Some(&ssn));
    let issued = workflow
        .authority()
        .lookup(ssn.as_str())
        .expect("issued number resolves");
    assert_eq!(issued.status, SsnStatus::Active);
    assert_eq!(issued.person_id, person.id);

    // Number management: suspend, then reactivate.
    let suspended = workflow
        .authority()
        .suspend(ssn.as_str(), "reported stolen")
        .expect("active number suspends");
    assert_eq!(suspended.status, SsnStatus::Suspended);
    let reactivated = workflow
        .authority()
        .reactivate(ssn.as_str())
        .expect("suspended number reactivates");
    assert_eq!(reactivated.status, SsnStatus::Active);

    // The trail covers the whole story, with the number only ever masked.
    let entries = audit.entries();
    for expected in [
        actions::PERSON_REGISTERED,
        actions::APPLICATION_SUBMITTED,
        actions::SSN_ISSUED,
        actions::APPLICATION_APPROVED,
        actions::SSN_SUSPENDED,
        actions::SSN_REACTIVATED,
    ] {
        assert!(
            entries.iter().any(|entry| entry.action == expected),
            "missing audit action {expected}"
        );
    }
    assert!(entries
        .iter()
        .all(|entry| !entry.details.contains(ssn.as_str())));
}

#[test]
fn rejection_keeps_the_person_unassigned_and_allows_retry() {
    let (workflow, _) = workflow();

    let first = workflow
        .submit(applicant("Omar", "Haddad"))
        .expect("complete applicant submits");
    let rejected = workflow
        .reject(first.id, "birth record unverifiable", "field-office-3")
        .expect("pending application rejects");
    assert_eq!(rejected.status, ApplicationStatus::Rejected);
    assert_eq!(
        rejected.review_notes.as_deref(),
        Some("birth record unverifiable")
    );

    let person = workflow
        .registry()
        .find(first.person_id)
        .expect("store reachable")
        .expect("person on file");
    assert!(person.ssn.is_none());

    let second = workflow
        .submit_existing(first.person_id)
        .expect("rejected applicant may reapply");
    assert_ne!(second.reference, first.reference);
    workflow
        .approve(second.id, "field-office-3")
        .expect("second application approves");
}

#[test]
fn one_person_one_number_holds_across_the_public_surface() {
    let (workflow, _) = workflow();

    let application = workflow
        .submit(applicant("Priya", "Natarajan"))
        .expect("complete applicant submits");
    workflow
        .approve(application.id, "field-office-7")
        .expect("approves");

    match workflow.submit_existing(application.person_id) {
        Err(WorkflowError::AlreadyHasSsn) => {}
        other => panic!("expected AlreadyHasSsn, got {other:?}"),
    }
    assert_eq!(
        workflow.authority().total_issued().expect("store reachable"),
        1
    );
}
