//! The concrete IIDES entity types.
//!
//! Pure configuration: each type is a [`Shape`] table consumed by the generic
//! validator and relationship manager.

use crate::error::ModelError;
use crate::schema::{FieldDecl, FieldType, Rule, ScalarKind, Shape, SlotDecl};

const fn text(name: &'static str) -> FieldDecl {
    FieldDecl::optional(name, FieldType::Scalar(ScalarKind::Str))
}

const fn int(name: &'static str) -> FieldDecl {
    FieldDecl::optional(name, FieldType::Scalar(ScalarKind::Int))
}

const fn flag(name: &'static str) -> FieldDecl {
    FieldDecl::optional(name, FieldType::Scalar(ScalarKind::Bool))
}

const fn date(name: &'static str) -> FieldDecl {
    FieldDecl::optional(name, FieldType::Scalar(ScalarKind::Date))
}

const fn datetime(name: &'static str) -> FieldDecl {
    FieldDecl::optional(name, FieldType::Scalar(ScalarKind::DateTime))
}

const fn texts(name: &'static str) -> FieldDecl {
    FieldDecl::optional(name, FieldType::List(ScalarKind::Str))
}

const fn code(name: &'static str, vocab: &'static str) -> FieldDecl {
    FieldDecl::optional(name, FieldType::Code { vocab })
}

const fn codes(name: &'static str, vocab: &'static str) -> FieldDecl {
    FieldDecl::optional(name, FieldType::CodeList { vocab })
}

const fn subtype(name: &'static str, vocab: &'static str, parent: &'static str) -> FieldDecl {
    FieldDecl::optional(name, FieldType::Subtype { vocab, parent })
}

const fn dated(name: &'static str, vocab: &'static str) -> FieldDecl {
    FieldDecl::optional(name, FieldType::DatedCodeList { vocab })
}

const fn pairs(name: &'static str, type_vocab: &'static str, subtype_vocab: &'static str) -> FieldDecl {
    FieldDecl::optional(
        name,
        FieldType::PairList {
            type_vocab,
            subtype_vocab,
        },
    )
}

const fn must(decl: FieldDecl) -> FieldDecl {
    FieldDecl::required(decl.name, decl.ty)
}

const fn edge(name: &'static str, target: &'static str) -> FieldDecl {
    FieldDecl::required(name, FieldType::Ref { target })
}

/// Fields shared by insiders and accomplices.
pub static PERSON_PROFILE: &[FieldDecl] = &[
    text("first_name"),
    text("middle_name"),
    text("last_name"),
    code("suffix", "suffix-vocab"),
    texts("alias"),
    text("city"),
    code("state", "state-vocab-us"),
    code("country", "country-vocab"),
    int("postal_code"),
    texts("country_of_citizenship"),
    texts("nationality"),
    code("residency", "residency-vocab"),
    code("gender", "gender-vocab"),
    int("age"),
    code("education", "education-vocab"),
    code("marital_status", "marital-status-vocab"),
    int("number_of_children"),
    text("comment"),
];

pub static INCIDENT: Shape = Shape {
    type_tag: "incident",
    fields: &[
        codes("cia_effect", "cia-vocab"),
        codes("incident_type", "incident-type-vocab"),
        FieldDecl::optional(
            "incident_subtype",
            FieldType::SubtypeList {
                vocab: "incident-subtype-vocab",
                parent: "incident_type",
            },
        ),
        codes("outcome", "outcome-type-vocab"),
        code("status", "incident-status-vocab"),
        text("summary"),
        text("brief_summary"),
        text("comment"),
    ],
    profile: &[],
    slots: &[
        SlotDecl::child("detection", "detection", "incident"),
        SlotDecl::child("response", "response", "incident"),
        SlotDecl::children("ttps", "ttp", "incident"),
        SlotDecl::children("organizations", "organization", "incident"),
        SlotDecl::children("insiders", "insider", "incident"),
        SlotDecl::children("impacts", "impact", "incident"),
        SlotDecl::children("targets", "target", "incident"),
        SlotDecl::children("notes", "note", "incident"),
        SlotDecl::children("sources", "source", "incident"),
    ],
    rules: &[],
};

pub static DETECTION: Shape = Shape {
    type_tag: "detection",
    fields: &[
        datetime("first_detected"),
        codes("who_detected", "detection-team-vocab"),
        codes("detected_method", "detection-method-vocab"),
        codes("logs", "detection-log-vocab"),
        text("comment"),
    ],
    profile: &[],
    slots: &[SlotDecl::parent("incident", "incident", "detection")],
    rules: &[],
};

pub static RESPONSE: Shape = Shape {
    type_tag: "response",
    fields: &[
        dated("technical_controls", "technical-control-vocab"),
        dated("behavioral_controls", "behavioral-control-vocab"),
        codes("investigated_by", "investigator-vocab"),
        dated("investigation_events", "investigation-vocab"),
        text("comment"),
    ],
    profile: &[],
    slots: &[
        SlotDecl::parent("incident", "incident", "response"),
        SlotDecl::child("legal_response", "legal-response", "response"),
    ],
    rules: &[],
};

pub static TTP: Shape = Shape {
    type_tag: "ttp",
    fields: &[
        datetime("date"),
        int("sequence_num"),
        flag("observed"),
        int("number_of_times"),
        text("ttp_vocab"),
        code("tactic", "tactic-vocab"),
        code("technique", "technique-vocab"),
        codes("location", "attack-location-vocab"),
        codes("hours", "attack-hours-vocab"),
        codes("device", "device-vocab"),
        codes("channel", "channel-vocab"),
        text("description"),
    ],
    profile: &[],
    slots: &[SlotDecl::parent("incident", "incident", "ttps")],
    rules: &[],
};

pub static ORGANIZATION: Shape = Shape {
    type_tag: "organization",
    fields: &[
        text("name"),
        text("city"),
        code("state", "state-vocab-us"),
        code("country", "country-vocab"),
        int("postal_code"),
        flag("small_business"),
        code("industry_sector", "industry-sector-vocab"),
        subtype("industry_subsector", "industry-subsector-vocab", "industry_sector"),
        text("business"),
        text("parent_company"),
        code("incident_role", "org-role-vocab"),
    ],
    profile: &[],
    slots: &[
        SlotDecl::parent("incident", "incident", "organizations"),
        SlotDecl::children("jobs", "job", "organization"),
        SlotDecl::children("stressors", "stressor", "organization"),
    ],
    rules: &[],
};

pub static JOB: Shape = Shape {
    type_tag: "job",
    fields: &[
        code("job_function", "job-function-vocab"),
        subtype("occupation", "occupation-vocab", "job_function"),
        text("title"),
        flag("position_technical"),
        code("access_authorization", "access-auth-vocab"),
        code("employment_type", "employment-type-vocab"),
        date("hire_date"),
        date("departure_date"),
        FieldDecl::optional("tenure", FieldType::Scalar(ScalarKind::Duration)),
        text("comment"),
    ],
    profile: &[],
    slots: &[
        SlotDecl::parent("insider", "insider", "jobs"),
        SlotDecl::parent("organization", "organization", "jobs"),
        SlotDecl::parent("accomplice", "accomplice", "jobs"),
    ],
    rules: &[Rule::DerivedSpan {
        start: "hire_date",
        end: "departure_date",
        span: "tenure",
    }],
};

pub static INSIDER: Shape = Shape {
    type_tag: "insider",
    fields: &[
        must(code("incident_role", "incident-role-vocab")),
        codes("motive", "motive-vocab"),
        flag("substance_use_during_incident"),
        codes("psychological_issues", "psych-issues-vocab"),
        pairs(
            "predispositions",
            "predisposition-type-vocab",
            "predisposition-subtype-vocab",
        ),
        pairs(
            "concerning_behaviors",
            "concerning-behavior-vocab",
            "cb-subtype-vocab",
        ),
    ],
    profile: PERSON_PROFILE,
    slots: &[
        SlotDecl::parent("incident", "incident", "insiders"),
        SlotDecl::parent("sponsor", "sponsor", "insiders"),
        SlotDecl::children("jobs", "job", "insider"),
        SlotDecl::children("stressors", "stressor", "insider"),
        SlotDecl::children("accomplices", "accomplice", "insider"),
    ],
    rules: &[],
};

pub static ACCOMPLICE: Shape = Shape {
    type_tag: "accomplice",
    fields: &[code("relationship_to_insider", "insider-relationship-vocab")],
    profile: PERSON_PROFILE,
    slots: &[
        SlotDecl::parent("insider", "insider", "accomplices"),
        SlotDecl::parent("sponsor", "sponsor", "accomplices"),
        SlotDecl::children("jobs", "job", "accomplice"),
    ],
    rules: &[],
};

pub static SPONSOR: Shape = Shape {
    type_tag: "sponsor",
    fields: &[text("name"), code("sponsor_type", "sponsor-type-vocab")],
    profile: &[],
    slots: &[
        SlotDecl::children("insiders", "insider", "sponsor"),
        SlotDecl::children("accomplices", "accomplice", "sponsor"),
    ],
    rules: &[],
};

pub static STRESSOR: Shape = Shape {
    type_tag: "stressor",
    fields: &[
        date("date"),
        code("category", "stressor-category-vocab"),
        subtype("subcategory", "stressor-subcategory-vocab", "category"),
        text("comment"),
    ],
    profile: &[],
    slots: &[
        SlotDecl::parent("insider", "insider", "stressors"),
        SlotDecl::parent("organization", "organization", "stressors"),
    ],
    rules: &[],
};

pub static IMPACT: Shape = Shape {
    type_tag: "impact",
    fields: &[
        FieldDecl::required("high", FieldType::Scalar(ScalarKind::Float)),
        FieldDecl::optional("low", FieldType::Scalar(ScalarKind::Float)),
        must(code("metric", "impact-metric-vocab")),
        must(flag("estimated")),
        text("comment"),
    ],
    profile: &[],
    slots: &[SlotDecl::parent("incident", "incident", "impacts")],
    rules: &[],
};

pub static TARGET: Shape = Shape {
    type_tag: "target",
    fields: &[
        must(code("asset_type", "target-asset-vocab")),
        must(code("category", "target-category-vocab")),
        must(subtype("subcategory", "target-subcategory-vocab", "category")),
        must(code("format", "target-format-vocab")),
        must(code("owner", "target-owner-vocab")),
        must(codes("sensitivity", "target-sensitivity-vocab")),
        text("description"),
    ],
    profile: &[],
    slots: &[SlotDecl::parent("incident", "incident", "targets")],
    rules: &[],
};

pub static NOTE: Shape = Shape {
    type_tag: "note",
    fields: &[must(text("author")), must(date("date")), must(text("comment"))],
    profile: &[],
    slots: &[SlotDecl::parent("incident", "incident", "notes")],
    rules: &[],
};

pub static SOURCE: Shape = Shape {
    type_tag: "source",
    fields: &[
        must(text("title")),
        text("source_type"),
        text("file_type"),
        datetime("date"),
        flag("public"),
        text("document"),
    ],
    profile: &[],
    slots: &[SlotDecl::parent("incident", "incident", "sources")],
    rules: &[],
};

pub static LEGAL_RESPONSE: Shape = Shape {
    type_tag: "legal-response",
    fields: &[
        date("law_enforcement_contacted"),
        date("insider_arrested"),
        date("insider_charged"),
        date("insider_pleads"),
        date("insider_judgment"),
        date("insider_sentenced"),
        date("insider_charges_dropped"),
        date("insider_charges_dismissed"),
        date("insider_settled"),
        text("comment"),
    ],
    profile: &[],
    slots: &[
        SlotDecl::parent("response", "response", "legal_response"),
        SlotDecl::children("court_cases", "court-case", "legal_response"),
    ],
    rules: &[],
};

pub static COURT_CASE: Shape = Shape {
    type_tag: "court-case",
    fields: &[
        text("case_number"),
        text("case_title"),
        code("court_country", "country-vocab"),
        code("court_state", "state-vocab-us"),
        text("court_district"),
        code("court_type", "court-type-vocab"),
        code("case_type", "case-type-vocab"),
        texts("defendant"),
        texts("plaintiff"),
        text("comment"),
    ],
    profile: &[],
    slots: &[
        SlotDecl::parent("legal_response", "legal-response", "court_cases"),
        SlotDecl::children("charges", "charge", "court_case"),
        SlotDecl::children("sentences", "sentence", "court_case"),
    ],
    rules: &[],
};

pub static CHARGE: Shape = Shape {
    type_tag: "charge",
    fields: &[
        must(text("title")),
        text("section"),
        text("nature_of_offense"),
        int("count"),
        code("plea", "charge-plea-vocab"),
        flag("plea_bargain"),
        code("disposition", "charge-disposition-vocab"),
    ],
    profile: &[],
    slots: &[SlotDecl::parent("court_case", "court-case", "charges")],
    rules: &[],
};

pub static SENTENCE: Shape = Shape {
    type_tag: "sentence",
    fields: &[
        must(code("sentence_type", "sentence-type-vocab")),
        int("quantity"),
        code("metric", "sentence-metric-vocab"),
        flag("concurrency"),
    ],
    profile: &[],
    slots: &[SlotDecl::parent("court_case", "court-case", "sentences")],
    rules: &[Rule::CoupledPair("quantity", "metric")],
};

pub static COLLUSION: Shape = Shape {
    type_tag: "collusion",
    fields: &[
        edge("insider1", "insider"),
        edge("insider2", "insider"),
        must(code("relationship", "insider-relationship-vocab")),
        must(code("recruitment", "insider-recruitment-vocab")),
    ],
    profile: &[],
    slots: &[],
    rules: &[],
};

pub static ORG_RELATIONSHIP: Shape = Shape {
    type_tag: "org-relationship",
    fields: &[
        edge("org1", "organization"),
        edge("org2", "organization"),
        must(code("relationship", "org-relationship-vocab")),
    ],
    profile: &[],
    slots: &[],
    rules: &[],
};

/// Every entity type, sorted by type tag.
pub static ALL: [&Shape; 20] = [
    &ACCOMPLICE,
    &CHARGE,
    &COLLUSION,
    &COURT_CASE,
    &DETECTION,
    &IMPACT,
    &INCIDENT,
    &INSIDER,
    &JOB,
    &LEGAL_RESPONSE,
    &NOTE,
    &ORG_RELATIONSHIP,
    &ORGANIZATION,
    &RESPONSE,
    &SENTENCE,
    &SOURCE,
    &SPONSOR,
    &STRESSOR,
    &TARGET,
    &TTP,
];

pub fn shape(type_tag: &str) -> Option<&'static Shape> {
    ALL.iter().copied().find(|s| s.type_tag == type_tag)
}

pub fn shape_for(type_tag: &str) -> Result<&'static Shape, ModelError> {
    shape(type_tag).ok_or_else(|| ModelError::UnknownEntityType {
        type_tag: type_tag.to_string(),
    })
}
