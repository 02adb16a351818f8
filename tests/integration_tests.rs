//! Integration tests for the complete IIDES pipeline
//!
//! These tests build realistic incident graphs through the public API and
//! push them through the document codec:
//! - entity construction → bundle → relationships
//! - bundle → document → JSON text → document → bundle
//! - removal and dangling-reference handling
//!
//! Run with: cargo test --test integration_tests

use chrono::{NaiveDate, TimeDelta};
use iides_model::{
    bundle_to_document, document_to_bundle, link, replace_many, unlink, unset, Bundle, Document,
    DocumentError, Entity, EntityRef, ErrorKind, ModelError, Value,
};
use serde_json::json;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

struct Case {
    bundle: Bundle,
    incident: EntityRef,
    insiders: [EntityRef; 2],
    org: EntityRef,
    job: EntityRef,
    sponsor: EntityRef,
    collusion: EntityRef,
    legal: EntityRef,
}

/// Two colluding insiders at one victim organization, with a response chain
/// down to the court case.
fn build_case() -> Case {
    let mut bundle = Bundle::new();

    let incident = bundle
        .add(
            Entity::from_values(
                "incident",
                [
                    ("cia_effect", Value::list(["C"])),
                    ("incident_type", Value::list(["E"])),
                    ("status", Value::from("C")),
                    ("brief_summary", Value::from("Design files sold to a competitor")),
                ],
            )
            .unwrap(),
        )
        .unwrap();

    let a = bundle
        .add(
            Entity::from_values(
                "insider",
                [
                    ("incident_role", Value::from("1")),
                    ("first_name", Value::from("Dana")),
                    ("age", Value::Int(41)),
                    ("motive", Value::list(["1"])),
                ],
            )
            .unwrap(),
        )
        .unwrap();
    let b = bundle
        .add(Entity::from_values("insider", [("incident_role", "2")]).unwrap())
        .unwrap();
    link(&mut bundle, incident, "insiders", a).unwrap();
    link(&mut bundle, incident, "insiders", b).unwrap();

    let org = bundle
        .add(
            Entity::from_values(
                "organization",
                [("name", Value::from("Acme Aerospace")), ("industry_sector", Value::from("31"))],
            )
            .unwrap(),
        )
        .unwrap();
    link(&mut bundle, incident, "organizations", org).unwrap();

    let job = bundle
        .add(
            Entity::from_values(
                "job",
                [
                    ("job_function", Value::from("17")),
                    ("occupation", Value::from("17.1")),
                    ("hire_date", Value::Date(day(2012, 4, 2))),
                    ("departure_date", Value::Date(day(2019, 4, 2))),
                ],
            )
            .unwrap(),
        )
        .unwrap();
    link(&mut bundle, a, "jobs", job).unwrap();
    link(&mut bundle, org, "jobs", job).unwrap();

    let sponsor = bundle
        .add(Entity::from_values("sponsor", [("sponsor_type", "C")]).unwrap())
        .unwrap();
    link(&mut bundle, sponsor, "insiders", a).unwrap();

    let collusion = bundle
        .add(
            Entity::from_values(
                "collusion",
                [
                    ("insider1", Value::Ref(a)),
                    ("insider2", Value::Ref(b)),
                    ("relationship", Value::from("1")),
                    ("recruitment", Value::from("2")),
                ],
            )
            .unwrap(),
        )
        .unwrap();

    let response = bundle.add(Entity::new("response").unwrap()).unwrap();
    let legal = bundle
        .add(Entity::from_values("legal-response", [("insider_charged", day(2019, 9, 3))]).unwrap())
        .unwrap();
    let court = bundle
        .add(Entity::from_values("court-case", [("case_type", "1")]).unwrap())
        .unwrap();
    let charge = bundle
        .add(Entity::from_values("charge", [("title", "Theft of trade secrets")]).unwrap())
        .unwrap();
    let sentence = bundle
        .add(
            Entity::from_values(
                "sentence",
                [
                    ("sentence_type", Value::from("1")),
                    ("quantity", Value::Int(18)),
                    ("metric", Value::from("3")),
                ],
            )
            .unwrap(),
        )
        .unwrap();
    link(&mut bundle, incident, "response", response).unwrap();
    link(&mut bundle, response, "legal_response", legal).unwrap();
    link(&mut bundle, legal, "court_cases", court).unwrap();
    link(&mut bundle, court, "charges", charge).unwrap();
    link(&mut bundle, court, "sentences", sentence).unwrap();

    Case {
        bundle,
        incident,
        insiders: [a, b],
        org,
        job,
        sponsor,
        collusion,
        legal,
    }
}

// ============================================================================
// Graph construction
// ============================================================================

#[test]
fn test_case_graph_is_navigable_both_ways() {
    let case = build_case();
    let bundle = &case.bundle;

    let incident = bundle.entity(case.incident).unwrap();
    assert_eq!(incident.many("insiders"), &case.insiders);
    assert_eq!(incident.many("organizations"), &[case.org]);

    let job = bundle.entity(case.job).unwrap();
    assert_eq!(job.one("insider"), Some(case.insiders[0]));
    assert_eq!(job.one("organization"), Some(case.org));
    assert_eq!(job.one("accomplice"), None);
    assert_eq!(job.get("tenure"), Some(&Value::Duration(TimeDelta::days(2556))));

    let a = bundle.entity(case.insiders[0]).unwrap();
    assert_eq!(a.one("sponsor"), Some(case.sponsor));
    assert_eq!(a.one("incident"), Some(case.incident));
    assert_eq!(bundle.holders_of(case.insiders[1]), vec![case.collusion]);
}

#[test]
fn test_moving_a_child_detaches_it_from_the_old_parent() {
    let mut case = build_case();
    let other = case.bundle.add(Entity::new("incident").unwrap()).unwrap();

    link(&mut case.bundle, other, "insiders", case.insiders[1]).unwrap();

    let old = case.bundle.entity(case.incident).unwrap();
    assert_eq!(old.many("insiders"), &[case.insiders[0]]);
    let b = case.bundle.entity(case.insiders[1]).unwrap();
    assert_eq!(b.one("incident"), Some(other));
}

#[test]
fn test_replacing_and_clearing_slots() {
    let mut case = build_case();
    let [a, b] = case.insiders;

    replace_many(&mut case.bundle, case.incident, "insiders", &[b]).unwrap();
    assert_eq!(case.bundle.entity(a).unwrap().one("incident"), None);

    unset(&mut case.bundle, case.job, "organization").unwrap();
    assert!(case.bundle.entity(case.org).unwrap().many("jobs").is_empty());

    assert!(unlink(&mut case.bundle, case.sponsor, "insiders", a).unwrap());
    assert!(!unlink(&mut case.bundle, case.sponsor, "insiders", a).unwrap());
}

// ============================================================================
// Document round trip
// ============================================================================

#[test]
fn test_case_survives_json_text() {
    let case = build_case();
    let text = bundle_to_document(&case.bundle).to_json_string(true).unwrap();

    let doc = Document::from_json_str(&text).unwrap();
    assert_eq!(doc.record_count(), case.bundle.len());
    let restored = document_to_bundle(&doc).unwrap();
    assert_eq!(restored, case.bundle);

    let legal = restored.entity(case.legal).unwrap();
    assert_eq!(legal.get("insider_charged"), Some(&Value::Date(day(2019, 9, 3))));
    let collusion = restored.entity(case.collusion).unwrap();
    assert_eq!(collusion.get("insider2"), Some(&Value::Ref(case.insiders[1])));
}

#[test]
fn test_document_layout() {
    let case = build_case();
    let doc = bundle_to_document(&case.bundle);

    let job = &doc.objects["job"][0];
    assert_eq!(job["tenure"], json!("P2556D"));
    assert_eq!(job["hire_date"], json!("2012-04-02"));
    assert!(!job.contains_key("children"));

    let collusion = &doc.objects["collusion"][0];
    assert_eq!(collusion["insider1"], json!(case.insiders[0].to_string()));

    let sponsor = &doc.objects["sponsor"][0];
    assert_eq!(sponsor["children"], json!([case.insiders[0].to_string()]));
}

#[test]
fn test_missing_collusion_endpoint_is_dangling() {
    let case = build_case();
    let mut doc = bundle_to_document(&case.bundle);
    let b = case.insiders[1].to_string();
    doc.objects.get_mut("insider").unwrap().retain(|r| r["id"] != json!(b));
    for incident in doc.objects.get_mut("incident").unwrap() {
        if let Some(children) = incident.get_mut("children").and_then(|c| c.as_array_mut()) {
            children.retain(|c| c != &json!(b));
        }
    }

    match document_to_bundle(&doc) {
        Err(DocumentError::Dangling { reference, holder }) => {
            assert_eq!(reference, b);
            assert_eq!(holder, case.collusion.to_string());
        }
        other => panic!("expected a dangling reference, got {other:?}"),
    }
}

// ============================================================================
// Removal
// ============================================================================

#[test]
fn test_remove_refuses_while_an_edge_refers() {
    let mut case = build_case();
    let a = case.insiders[0];

    let err = case.bundle.remove(a).unwrap_err();
    assert!(matches!(err, ModelError::StillReferenced { .. }));
    assert_eq!(err.kind(), ErrorKind::Reference);

    case.bundle.remove(case.collusion).unwrap();
    let removed = case.bundle.remove(a).unwrap();
    assert_eq!(removed.reference(), a);

    assert!(!case.bundle.contains(a));
    let incident = case.bundle.entity(case.incident).unwrap();
    assert_eq!(incident.many("insiders"), &[case.insiders[1]]);
    assert_eq!(case.bundle.entity(case.job).unwrap().one("insider"), None);
    assert!(case.bundle.entity(case.sponsor).unwrap().many("insiders").is_empty());
    assert_eq!(case.bundle.of_type("collusion").count(), 0);

    let restored = document_to_bundle(&bundle_to_document(&case.bundle)).unwrap();
    assert_eq!(restored, case.bundle);
}
