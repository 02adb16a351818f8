use chrono::NaiveDate;
use iides_model::{
    bundle_to_document, bundle_to_document_with, document_to_bundle, link, Bundle, CodecConfig,
    Document, DocumentError, Entity, EntityRef, Value,
};
use serde_json::json;

fn court_case_with_two_charges() -> (Bundle, EntityRef, [EntityRef; 2]) {
    let mut bundle = Bundle::new();
    let case = bundle
        .add(Entity::from_values("court-case", [("case_number", "1:19-cr-00042")]).unwrap())
        .unwrap();
    let c1 = bundle
        .add(Entity::from_values("charge", [("title", "18 U.S.C. 1030")]).unwrap())
        .unwrap();
    let c2 = bundle
        .add(Entity::from_values("charge", [("title", "18 U.S.C. 1832")]).unwrap())
        .unwrap();
    link(&mut bundle, case, "charges", c1).unwrap();
    link(&mut bundle, case, "charges", c2).unwrap();
    (bundle, case, [c1, c2])
}

#[test]
fn court_case_lists_exactly_its_charges() {
    let (bundle, _, [c1, c2]) = court_case_with_two_charges();
    let doc = bundle_to_document(&bundle);

    let case = &doc.objects["court-case"][0];
    assert_eq!(case["children"], json!([c1.to_string(), c2.to_string()]));
    for charge in &doc.objects["charge"] {
        assert!(!charge.contains_key("children"));
        assert!(!charge.contains_key("court_case"));
        assert!(charge["id"].as_str().unwrap().starts_with("charge--"));
    }
    assert_eq!(doc.doc_type, "bundle");
    assert_eq!(doc.id, format!("bundle--{}", bundle.id()));
}

#[test]
fn dangling_charge_aborts_deserialization() {
    let (bundle, _, [c1, _]) = court_case_with_two_charges();
    let mut doc = bundle_to_document(&bundle);
    let charges = doc.objects.get_mut("charge").unwrap();
    charges.retain(|r| r["id"] != json!(c1.to_string()));

    match document_to_bundle(&doc) {
        Err(DocumentError::Dangling { reference, .. }) => assert_eq!(reference, c1.to_string()),
        other => panic!("expected a dangling reference, got {other:?}"),
    }
}

#[test]
fn round_trip_preserves_fields_and_edges() {
    let (mut bundle, case, _) = court_case_with_two_charges();
    let legal = bundle
        .add(
            Entity::from_values(
                "legal-response",
                [("insider_arrested", NaiveDate::from_ymd_opt(2019, 2, 14).unwrap())],
            )
            .unwrap(),
        )
        .unwrap();
    link(&mut bundle, legal, "court_cases", case).unwrap();
    let response = bundle.add(Entity::new("response").unwrap()).unwrap();
    link(&mut bundle, response, "legal_response", legal).unwrap();
    let incident = bundle
        .add(Entity::from_values("incident", [("status", "C")]).unwrap())
        .unwrap();
    link(&mut bundle, incident, "response", response).unwrap();
    bundle
        .set_field(incident, "incident_type", Value::list(["F", "E"]))
        .unwrap();
    bundle
        .set_field(incident, "incident_subtype", Value::list(["E.2"]))
        .unwrap();

    let text = bundle_to_document(&bundle).to_json_string(true).unwrap();
    let restored = document_to_bundle(&Document::from_json_str(&text).unwrap()).unwrap();
    assert_eq!(restored, bundle);
    assert_eq!(restored.entity(incident).unwrap().one("response"), Some(response));
}

#[test]
fn one_to_one_children_are_listed_by_the_parent() {
    let mut bundle = Bundle::new();
    let incident = bundle.add(Entity::new("incident").unwrap()).unwrap();
    let detection = bundle.add(Entity::new("detection").unwrap()).unwrap();
    link(&mut bundle, incident, "detection", detection).unwrap();

    let doc = bundle_to_document(&bundle);
    assert_eq!(doc.objects["incident"][0]["children"], json!([detection.to_string()]));
    assert_eq!(document_to_bundle(&doc).unwrap(), bundle);
}

#[test]
fn custom_children_key() {
    let (bundle, _, _) = court_case_with_two_charges();
    let cfg = CodecConfig {
        children_key: "owned_refs".into(),
        ..CodecConfig::default()
    };
    let doc = bundle_to_document_with(&bundle, &cfg).unwrap();
    assert!(doc.objects["court-case"][0].contains_key("owned_refs"));
    assert_eq!(
        iides_model::document_to_bundle_with(&doc, &cfg).unwrap(),
        bundle
    );
}

#[test]
fn record_id_must_match_its_bucket() {
    let (bundle, _, _) = court_case_with_two_charges();
    let mut doc = bundle_to_document(&bundle);
    let charge = doc.objects.get_mut("charge").unwrap().remove(0);
    doc.objects.entry("sentence".into()).or_default().push(charge);
    assert!(matches!(
        document_to_bundle(&doc),
        Err(DocumentError::Record { .. })
    ));
}

#[test]
fn datetime_fields_read_iso_t_separator() {
    let id = format!("detection--{}", uuid::Uuid::new_v4());
    let doc: Document = serde_json::from_value(json!({
        "type": "bundle",
        "id": format!("bundle--{}", uuid::Uuid::new_v4()),
        "objects": {"detection": [{"id": id, "first_detected": "2020-06-01T08:30:00"}]}
    }))
    .unwrap();
    let bundle = document_to_bundle(&doc).unwrap();
    let out = bundle_to_document(&bundle);
    assert_eq!(out.objects["detection"][0]["first_detected"], json!("2020-06-01 08:30:00"));
}

#[test]
fn sub_second_datetimes_survive_the_round_trip() {
    let mut bundle = Bundle::new();
    let incident = bundle.add(Entity::new("incident").unwrap()).unwrap();
    let detected = NaiveDate::from_ymd_opt(2021, 3, 9)
        .unwrap()
        .and_hms_milli_opt(14, 5, 0, 250)
        .unwrap();
    let detection = bundle
        .add(Entity::from_values("detection", [("first_detected", detected)]).unwrap())
        .unwrap();
    link(&mut bundle, incident, "detection", detection).unwrap();

    let doc = bundle_to_document(&bundle);
    assert_eq!(
        doc.objects["detection"][0]["first_detected"],
        json!("2021-03-09 14:05:00.250")
    );
    let text = doc.to_json_string(false).unwrap();
    let restored = document_to_bundle(&Document::from_json_str(&text).unwrap()).unwrap();
    assert_eq!(
        restored.entity(detection).unwrap().get("first_detected"),
        Some(&Value::DateTime(detected))
    );
    assert_eq!(restored, bundle);
}
