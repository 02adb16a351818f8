//! The single validator every field write goes through.
//!
//! [`check_value`] covers one value in isolation (runtime shape and
//! vocabulary membership). [`check_record`] covers a whole field map:
//! required fields, subtype/parent consistency and the shape-level rules.

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use crate::error::ModelError;
use crate::schema::{FieldDecl, FieldType, Rule, ScalarKind, Shape};
use crate::value::{format_duration, Value};
use crate::vocab::{parent_segment, VocabularyRegistry};

pub(crate) type Fields = BTreeMap<&'static str, Value>;

/// Checks that `value` has the runtime shape `decl` declares and that every
/// code in it belongs to its vocabulary.
pub fn check_value(shape: &Shape, decl: &FieldDecl, value: &Value) -> Result<(), ModelError> {
    if !has_shape(decl.ty, value) {
        return Err(ModelError::TypeMismatch {
            type_tag: shape.type_tag.to_string(),
            field: decl.name.to_string(),
            expected: decl.ty.to_string(),
            found: describe_found(value),
        });
    }
    match (decl.ty.element(), value) {
        (Some(element), Value::List(items)) => items
            .iter()
            .try_for_each(|item| check_element(shape, decl.name, element, item)),
        _ => check_element(shape, decl.name, decl.ty, value),
    }
}

fn has_shape(ty: FieldType, value: &Value) -> bool {
    match (ty, value) {
        (FieldType::Scalar(kind), v) => has_scalar_shape(kind, v),
        (FieldType::Code { .. } | FieldType::Subtype { .. }, Value::Str(_)) => true,
        (FieldType::Ref { .. }, Value::Ref(_)) => true,
        (FieldType::List(kind), Value::List(items)) => items.iter().all(|v| has_scalar_shape(kind, v)),
        (FieldType::CodeList { .. } | FieldType::SubtypeList { .. }, Value::List(items)) => {
            items.iter().all(|v| matches!(v, Value::Str(_)))
        }
        (FieldType::PairList { .. }, Value::List(items)) => {
            items.iter().all(|v| matches!(v, Value::Pair(..)))
        }
        (FieldType::DatedCodeList { .. }, Value::List(items)) => {
            items.iter().all(|v| matches!(v, Value::Dated(..)))
        }
        _ => false,
    }
}

fn has_scalar_shape(kind: ScalarKind, value: &Value) -> bool {
    match (kind, value) {
        (ScalarKind::Str, Value::Str(_))
        | (ScalarKind::Int, Value::Int(_))
        | (ScalarKind::Bool, Value::Bool(_))
        | (ScalarKind::Date, Value::Date(_))
        | (ScalarKind::DateTime, Value::DateTime(_)) => true,
        (ScalarKind::Float, Value::Float(f)) => f.is_finite(),
        (ScalarKind::Duration, Value::Duration(d)) => d.num_seconds() % 86_400 == 0 && d.subsec_nanos() == 0,
        _ => false,
    }
}

fn describe_found(value: &Value) -> String {
    match value {
        Value::List(items) => match items.iter().find(|v| matches!(v, Value::List(_))) {
            Some(_) => "nested list".to_string(),
            None => {
                let mut kinds: Vec<&str> = items.iter().map(Value::type_name).collect();
                kinds.dedup();
                format!("list of {}", kinds.join("/"))
            }
        },
        Value::Float(f) if !f.is_finite() => "non-finite float".to_string(),
        Value::Duration(d) if d.num_seconds() % 86_400 != 0 || d.subsec_nanos() != 0 => {
            "duration that is not a whole number of days".to_string()
        }
        other => other.type_name().to_string(),
    }
}

fn check_element(shape: &Shape, field: &str, ty: FieldType, value: &Value) -> Result<(), ModelError> {
    let reg = VocabularyRegistry::builtin();
    let tag = shape.type_tag;
    match (ty, value) {
        (FieldType::Code { vocab } | FieldType::Subtype { vocab, .. }, Value::Str(code)) => {
            reg.check_member(tag, field, vocab, code)
        }
        (
            FieldType::PairList {
                type_vocab,
                subtype_vocab,
            },
            Value::Pair(kind, subtype),
        ) => {
            reg.check_member(tag, field, type_vocab, kind)?;
            reg.check_member(tag, field, subtype_vocab, subtype)?;
            if parent_segment(subtype) == kind {
                Ok(())
            } else {
                Err(ModelError::InvalidSubtype {
                    type_tag: tag.to_string(),
                    field: field.to_string(),
                    value: subtype.clone(),
                    parent_field: field.to_string(),
                    parent_value: Some(kind.clone()),
                })
            }
        }
        (FieldType::DatedCodeList { vocab }, Value::Dated(code, _)) => {
            reg.check_member(tag, field, vocab, code)
        }
        (FieldType::Ref { target }, Value::Ref(r)) if r.type_tag() != target => {
            Err(ModelError::WrongEntityType {
                type_tag: tag.to_string(),
                slot: field.to_string(),
                expected: target.to_string(),
                found: r.type_tag().to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Validates a complete field map for `shape`.
pub fn check_record(shape: &Shape, id: Option<Uuid>, fields: &Fields) -> Result<(), ModelError> {
    for (name, value) in fields {
        let decl = shape.field(name).ok_or_else(|| ModelError::UnknownField {
            type_tag: shape.type_tag.to_string(),
            field: name.to_string(),
        })?;
        check_value(shape, decl, value)?;
    }

    if let Some(missing) = shape
        .all_fields()
        .find(|decl| decl.required && !fields.contains_key(decl.name))
    {
        return Err(ModelError::MissingRequired {
            type_tag: shape.type_tag.to_string(),
            id,
            field: missing.name.to_string(),
        });
    }

    for decl in shape.all_fields() {
        let (FieldType::Subtype { parent, .. } | FieldType::SubtypeList { parent, .. }) = decl.ty else {
            continue;
        };
        let Some(child) = fields.get(decl.name) else {
            continue;
        };
        if let Some(bad) = first_orphan(child, fields.get(parent)) {
            return Err(ModelError::InvalidSubtype {
                type_tag: shape.type_tag.to_string(),
                field: decl.name.to_string(),
                value: bad.to_string(),
                parent_field: parent.to_string(),
                parent_value: fields.get(parent).map(|p| codes_of(p).join(", ")),
            });
        }
    }

    for rule in shape.rules {
        check_rule(shape, rule, fields)?;
    }
    Ok(())
}

fn check_rule(shape: &Shape, rule: &Rule, fields: &Fields) -> Result<(), ModelError> {
    match *rule {
        Rule::CoupledPair(a, b) => match (fields.contains_key(a), fields.contains_key(b)) {
            (true, false) | (false, true) => {
                let (present, missing) = if fields.contains_key(a) { (a, b) } else { (b, a) };
                Err(ModelError::Inconsistent {
                    type_tag: shape.type_tag.to_string(),
                    field: missing.to_string(),
                    reason: format!("must be set together with `{present}`"),
                })
            }
            _ => Ok(()),
        },
        Rule::DerivedSpan { start, end, span } => {
            let Some(found) = fields.get(span).and_then(Value::as_duration) else {
                return Ok(());
            };
            let dates = fields
                .get(start)
                .and_then(Value::as_date)
                .zip(fields.get(end).and_then(Value::as_date));
            let Some((from, to)) = dates else {
                return Err(ModelError::Inconsistent {
                    type_tag: shape.type_tag.to_string(),
                    field: span.to_string(),
                    reason: format!("requires both `{start}` and `{end}`"),
                });
            };
            let expected = to - from;
            if expected == found {
                Ok(())
            } else {
                Err(ModelError::DerivedMismatch {
                    type_tag: shape.type_tag.to_string(),
                    field: span.to_string(),
                    derived_from: format!("{end} - {start}"),
                    expected: format_duration(expected),
                    found: format_duration(found),
                })
            }
        }
    }
}

/// First code in `child` whose leading segment is not among the parent's
/// codes. With no parent value every child code is an orphan.
fn first_orphan<'a>(child: &'a Value, parent: Option<&Value>) -> Option<&'a str> {
    let parents = parent.map(codes_of).unwrap_or_default();
    codes_of(child)
        .into_iter()
        .find(|code| !parents.contains(&parent_segment(code)))
}

fn codes_of(value: &Value) -> Vec<&str> {
    match value {
        Value::Str(s) => vec![s.as_str()],
        Value::List(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Rejects a write that changed a parent-type field while an untouched
/// subtype field still holds a value under the old parent.
pub(crate) fn check_orphans(
    shape: &Shape,
    staged: &Fields,
    touched: &BTreeSet<&'static str>,
) -> Result<(), ModelError> {
    for parent in touched {
        for sub in shape.subtypes_of(*parent) {
            if touched.contains(sub.name) {
                continue;
            }
            let Some(child) = staged.get(sub.name) else {
                continue;
            };
            if let Some(orphan) = first_orphan(child, staged.get(parent)) {
                return Err(ModelError::Inconsistent {
                    type_tag: shape.type_tag.to_string(),
                    field: parent.to_string(),
                    reason: format!("`{}` still holds subtype `{orphan}`", sub.name),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::shapes::{INCIDENT, JOB, SENTENCE};
    use chrono::{NaiveDate, TimeDelta};

    fn fields(pairs: Vec<(&'static str, Value)>) -> Fields {
        pairs.into_iter().collect()
    }

    #[test]
    fn rejects_wrong_runtime_shape() {
        let decl = SENTENCE.field("quantity").unwrap();
        let err = check_value(&SENTENCE, decl, &Value::from("ten")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert!(err.to_string().contains("expected integer, found string"));
    }

    #[test]
    fn code_lists_are_checked_element_wise() {
        let decl = INCIDENT.field("cia_effect").unwrap();
        assert!(check_value(&INCIDENT, decl, &Value::list(["C", "I"])).is_ok());
        let err = check_value(&INCIDENT, decl, &Value::list(["C", "Q"])).unwrap_err();
        assert!(matches!(err, ModelError::NotInVocabulary { ref value, .. } if value == "Q"));
    }

    #[test]
    fn subtype_list_needs_matching_parent() {
        let ok = fields(vec![
            ("incident_type", Value::list(["F", "S"])),
            ("incident_subtype", Value::list(["F.1", "S.2"])),
        ]);
        assert!(check_record(&INCIDENT, None, &ok).is_ok());

        let bad = fields(vec![
            ("incident_type", Value::list(["F"])),
            ("incident_subtype", Value::list(["F.1", "E.1"])),
        ]);
        let err = check_record(&INCIDENT, None, &bad).unwrap_err();
        assert!(matches!(err, ModelError::InvalidSubtype { ref value, .. } if value == "E.1"));
    }

    #[test]
    fn coupled_pair_must_travel_together() {
        let half = fields(vec![("sentence_type", Value::from("1")), ("quantity", Value::Int(3))]);
        let err = check_record(&SENTENCE, None, &half).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);
        assert_eq!(err.field(), Some("metric"));
    }

    #[test]
    fn derived_span_must_match() {
        let hire = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let left = NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
        let good = fields(vec![
            ("hire_date", Value::Date(hire)),
            ("departure_date", Value::Date(left)),
            ("tenure", Value::Duration(TimeDelta::days(30))),
        ]);
        assert!(check_record(&JOB, None, &good).is_ok());

        let mut bad = good.clone();
        bad.insert("tenure", Value::Duration(TimeDelta::days(31)));
        assert!(matches!(
            check_record(&JOB, None, &bad),
            Err(ModelError::DerivedMismatch { .. })
        ));
    }

    #[test]
    fn partial_days_are_not_durations() {
        let decl = JOB.field("tenure").unwrap();
        let err = check_value(&JOB, decl, &Value::Duration(TimeDelta::hours(36))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
    }
}
