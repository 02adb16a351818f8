//! Validated records and the references between them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::ModelError;
use crate::schema::{Cardinality, FieldDecl, Rule, Shape};
use crate::shapes;
use crate::validate::{self, Fields};
use crate::value::Value;

/// Separator between type tag and UUID in a reference string.
pub const REF_SEPARATOR: &str = "--";

/// Non-owning pointer to an entity: `"<type_tag>--<uuid>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef {
    type_tag: &'static str,
    id: Uuid,
}

impl EntityRef {
    pub fn new(type_tag: &str, id: Uuid) -> Result<Self, ModelError> {
        let shape = shapes::shape_for(type_tag)?;
        Ok(Self {
            type_tag: shape.type_tag,
            id,
        })
    }

    pub fn type_tag(&self) -> &'static str {
        self.type_tag
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Parses a reference string, resolving its type tag against the known
    /// entity types.
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        let (tag, id) = split_reference(text)?;
        Self::new(tag, id)
    }
}

/// Splits `"<type_tag>--<uuid>"` without checking that the tag is known.
pub fn split_reference(text: &str) -> Result<(&str, Uuid), ModelError> {
    let (tag, id) = text
        .split_once(REF_SEPARATOR)
        .ok_or_else(|| ModelError::MalformedReference {
            text: text.to_string(),
            reason: format!("expected `<type>{REF_SEPARATOR}<uuid>`"),
        })?;
    if tag.is_empty() {
        return Err(ModelError::MalformedReference {
            text: text.to_string(),
            reason: "empty type tag".to_string(),
        });
    }
    let id = Uuid::parse_str(id).map_err(|_| ModelError::MalformedId { text: id.to_string() })?;
    Ok((tag, id))
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{REF_SEPARATOR}{}", self.type_tag, self.id)
    }
}

impl FromStr for EntityRef {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Contents of one relationship slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    One(Option<EntityRef>),
    Many(Vec<EntityRef>),
}

impl Slot {
    fn empty(cardinality: Cardinality) -> Self {
        match cardinality {
            Cardinality::One => Self::One(None),
            Cardinality::Many => Self::Many(Vec::new()),
        }
    }

    pub fn refs(&self) -> &[EntityRef] {
        match self {
            Self::One(r) => r.as_slice(),
            Self::Many(rs) => rs,
        }
    }

    pub fn contains(&self, r: &EntityRef) -> bool {
        self.refs().contains(r)
    }

    pub fn is_empty(&self) -> bool {
        self.refs().is_empty()
    }
}

/// One validated record.
///
/// Fields are only written through the validator; a failed write leaves the
/// entity unchanged. Relationship slots are maintained by the relationship
/// manager and are read-only from outside the crate.
#[derive(Debug, Clone)]
pub struct Entity {
    shape: &'static Shape,
    id: Uuid,
    fields: Fields,
    slots: BTreeMap<&'static str, Slot>,
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.shape.type_tag == other.shape.type_tag
            && self.id == other.id
            && self.fields == other.fields
            && self.slots == other.slots
    }
}

type Update = (&'static FieldDecl, Option<Value>);

impl Entity {
    /// An entity with a fresh id and no fields. Fails for types with
    /// required fields.
    pub fn new(type_tag: &str) -> Result<Self, ModelError> {
        Self::from_values(type_tag, Vec::<(&str, Value)>::new())
    }

    pub fn from_values<I, K, V>(type_tag: &str, values: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        Self::with_id(type_tag, Uuid::new_v4(), values)
    }

    /// Builds an entity with a known id, validating the whole record at once.
    pub fn with_id<I, K, V>(type_tag: &str, id: Uuid, values: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let shape = shapes::shape_for(type_tag)?;
        let blank = Self {
            shape,
            id,
            fields: Fields::new(),
            slots: shape
                .slots
                .iter()
                .map(|s| (s.name, Slot::empty(s.cardinality)))
                .collect(),
        };
        let updates = values
            .into_iter()
            .map(|(name, value)| Ok((blank.decl(name.as_ref())?, Some(value.into()))))
            .collect::<Result<Vec<Update>, ModelError>>()?;
        let fields = blank.stage(updates)?;
        Ok(Self { fields, ..blank })
    }

    pub fn shape(&self) -> &'static Shape {
        self.shape
    }

    pub fn type_tag(&self) -> &'static str {
        self.shape.type_tag
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn reference(&self) -> EntityRef {
        EntityRef {
            type_tag: self.shape.type_tag,
            id: self.id,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Present fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ModelError> {
        let update = (self.decl(name)?, Some(value.into()));
        self.fields = self.stage(vec![update])?;
        Ok(())
    }

    /// Sets several fields as one write: the batch is validated against the
    /// resulting record and either fully applied or not at all.
    pub fn set_fields<I, K, V>(&mut self, values: I) -> Result<(), ModelError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let updates = values
            .into_iter()
            .map(|(name, value)| Ok((self.decl(name.as_ref())?, Some(value.into()))))
            .collect::<Result<Vec<Update>, ModelError>>()?;
        self.fields = self.stage(updates)?;
        Ok(())
    }

    /// Removes a field.
    ///
    /// Clearing half of a coupled pair clears both halves. Clearing a span
    /// endpoint clears the derived span. Clearing a parent type while a
    /// subtype is set is rejected.
    pub fn clear_field(&mut self, name: &str) -> Result<(), ModelError> {
        let decl = self.decl(name)?;
        if decl.required {
            return Err(ModelError::MissingRequired {
                type_tag: self.type_tag().to_string(),
                id: Some(self.id),
                field: decl.name.to_string(),
            });
        }
        if !self.fields.contains_key(decl.name) {
            return Ok(());
        }
        let mut updates = vec![(decl, None)];
        for rule in self.shape.rules {
            if let Rule::CoupledPair(a, b) = *rule {
                let partner = if a == decl.name {
                    Some(b)
                } else if b == decl.name {
                    Some(a)
                } else {
                    None
                };
                if let Some(partner) = partner {
                    updates.push((self.decl(partner)?, None));
                }
            }
        }
        self.fields = self.stage(updates)?;
        Ok(())
    }

    /// Appends one element to a list field.
    pub fn append_item(&mut self, name: &str, item: impl Into<Value>) -> Result<(), ModelError> {
        let decl = self.decl(name)?;
        let item = item.into();
        if !decl.ty.is_list() {
            return Err(ModelError::TypeMismatch {
                type_tag: self.type_tag().to_string(),
                field: decl.name.to_string(),
                expected: "a list field".to_string(),
                found: decl.ty.to_string(),
            });
        }
        let mut items = match self.fields.get(decl.name) {
            Some(Value::List(items)) => items.clone(),
            _ => Vec::new(),
        };
        items.push(item);
        self.fields = self.stage(vec![(decl, Some(Value::List(items)))])?;
        Ok(())
    }

    fn decl(&self, name: &str) -> Result<&'static FieldDecl, ModelError> {
        self.shape.field(name).ok_or_else(|| ModelError::UnknownField {
            type_tag: self.type_tag().to_string(),
            field: name.to_string(),
        })
    }

    /// Applies `updates` to a copy of the fields, recomputes derived spans and
    /// validates the result.
    fn stage(&self, updates: Vec<Update>) -> Result<Fields, ModelError> {
        let mut staged = self.fields.clone();
        let mut touched = BTreeSet::new();
        for (decl, value) in updates {
            touched.insert(decl.name);
            match value {
                Some(value) => {
                    validate::check_value(self.shape, decl, &value)?;
                    staged.insert(decl.name, value);
                }
                None => {
                    staged.remove(decl.name);
                }
            }
        }
        self.derive_spans(&mut staged, &touched);
        validate::check_orphans(self.shape, &staged, &touched)?;
        validate::check_record(self.shape, Some(self.id), &staged)?;
        Ok(staged)
    }

    fn derive_spans(&self, staged: &mut Fields, touched: &BTreeSet<&'static str>) {
        for rule in self.shape.rules {
            let Rule::DerivedSpan { start, end, span } = *rule else {
                continue;
            };
            if touched.contains(span) || !(touched.contains(start) || touched.contains(end)) {
                continue;
            }
            let dates = staged
                .get(start)
                .and_then(Value::as_date)
                .zip(staged.get(end).and_then(Value::as_date));
            match dates {
                Some((from, to)) => {
                    staged.insert(span, Value::Duration(to - from));
                }
                None => {
                    staged.remove(span);
                }
            }
        }
    }

    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.get(name)
    }

    /// Partner in a to-one slot.
    pub fn one(&self, name: &str) -> Option<EntityRef> {
        self.slot(name).and_then(|s| s.refs().first().copied())
    }

    /// Members of a slot; empty for an unknown name.
    pub fn many(&self, name: &str) -> &[EntityRef] {
        self.slot(name).map(Slot::refs).unwrap_or_default()
    }

    pub fn slots(&self) -> impl Iterator<Item = (&'static str, &Slot)> {
        self.slots.iter().map(|(k, v)| (*k, v))
    }

    /// `Ref` values held in fields (edge entities).
    pub fn field_refs(&self) -> impl Iterator<Item = (&'static str, EntityRef)> + '_ {
        self.fields
            .iter()
            .filter_map(|(k, v)| v.as_entity_ref().map(|r| (*k, r)))
    }

    /// Stores `target` in `slot`. For a to-one slot the previous partner is
    /// returned; to-many slots ignore a target already present.
    pub(crate) fn put(&mut self, slot: &str, target: EntityRef) -> Option<EntityRef> {
        match self.slots.get_mut(slot)? {
            Slot::One(current) => current.replace(target).filter(|prev| *prev != target),
            Slot::Many(members) => {
                if !members.contains(&target) {
                    members.push(target);
                }
                None
            }
        }
    }

    /// Removes `target` from `slot`, returning whether it was there.
    pub(crate) fn take(&mut self, slot: &str, target: EntityRef) -> bool {
        match self.slots.get_mut(slot) {
            Some(Slot::One(current)) if *current == Some(target) => {
                *current = None;
                true
            }
            Some(Slot::Many(members)) => {
                let before = members.len();
                members.retain(|m| *m != target);
                members.len() != before
            }
            _ => false,
        }
    }

    pub(crate) fn clear_slots(&mut self) {
        for slot in self.slots.values_mut() {
            match slot {
                Slot::One(current) => *current = None,
                Slot::Many(members) => members.clear(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::{NaiveDate, TimeDelta};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn reference_string_round_trips() {
        let e = Entity::new("incident").unwrap();
        let text = e.reference().to_string();
        assert!(text.starts_with("incident--"));
        assert_eq!(EntityRef::parse(&text).unwrap(), e.reference());
        assert_eq!(
            split_reference("court-case--6f1c2a5e-2b7f-4d8a-9a43-0c1e6d7b9f10").unwrap().0,
            "court-case"
        );
    }

    #[test]
    fn malformed_references() {
        assert!(matches!(
            EntityRef::parse("incident"),
            Err(ModelError::MalformedReference { .. })
        ));
        assert!(matches!(
            EntityRef::parse("incident--not-a-uuid"),
            Err(ModelError::MalformedId { .. })
        ));
        assert!(matches!(
            EntityRef::parse(&format!("spaceship--{}", Uuid::new_v4())),
            Err(ModelError::UnknownEntityType { .. })
        ));
    }

    #[test]
    fn failed_write_leaves_entity_unchanged() {
        let mut job = Entity::from_values("job", [("job_function", "15"), ("occupation", "15.1")]).unwrap();
        let before = job.clone();
        let err = job.set_field("occupation", "17.1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(job, before);
    }

    #[test]
    fn changing_parent_under_a_subtype_is_a_reference_error() {
        let mut job = Entity::from_values("job", [("job_function", "15"), ("occupation", "15.1")]).unwrap();
        let err = job.set_field("job_function", "17").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);
        let err = job.clear_field("job_function").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);

        job.set_fields([("job_function", "17"), ("occupation", "17.1")]).unwrap();
        assert_eq!(job.get("occupation"), Some(&Value::from("17.1")));
    }

    #[test]
    fn tenure_follows_the_dates() {
        let mut job = Entity::new("job").unwrap();
        job.set_field("hire_date", day(2018, 1, 1)).unwrap();
        assert_eq!(job.get("tenure"), None);
        job.set_field("departure_date", day(2019, 1, 1)).unwrap();
        assert_eq!(job.get("tenure"), Some(&Value::Duration(TimeDelta::days(365))));

        let err = job.set_field("tenure", TimeDelta::days(10)).unwrap_err();
        assert!(matches!(err, ModelError::DerivedMismatch { .. }));

        job.clear_field("departure_date").unwrap();
        assert_eq!(job.get("tenure"), None);
        let err = job.set_field("tenure", TimeDelta::days(365)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);
    }

    #[test]
    fn coupled_pair_is_set_and_cleared_together() {
        let mut s = Entity::from_values("sentence", [("sentence_type", "1")]).unwrap();
        let err = s.set_field("quantity", 5i64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);

        s.set_fields([("quantity", Value::Int(5)), ("metric", Value::from("4"))])
            .unwrap();
        s.clear_field("metric").unwrap();
        assert_eq!(s.get("quantity"), None);
        assert_eq!(s.get("metric"), None);
    }

    #[test]
    fn required_fields() {
        let err = Entity::new("charge").unwrap_err();
        assert!(matches!(err, ModelError::MissingRequired { ref field, .. } if field == "title"));

        let mut charge = Entity::from_values("charge", [("title", "Wire fraud")]).unwrap();
        assert_eq!(charge.clear_field("title").unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn append_validates_the_element() {
        let mut incident = Entity::new("incident").unwrap();
        incident.append_item("incident_type", "F").unwrap();
        incident.append_item("incident_subtype", "F.2").unwrap();
        let err = incident.append_item("incident_subtype", "S.1").unwrap_err();
        assert!(matches!(err, ModelError::InvalidSubtype { .. }));
        assert_eq!(incident.get("incident_subtype"), Some(&Value::list(["F.2"])));

        let err = incident.append_item("status", "P").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn profile_fields_are_settable_on_both_person_types() {
        let mut insider = Entity::from_values("insider", [("incident_role", "1")]).unwrap();
        insider.set_field("gender", "F").unwrap();
        insider.append_item("alias", "JD").unwrap();
        let mut accomplice = Entity::new("accomplice").unwrap();
        accomplice.set_field("education", "5").unwrap();
        assert!(accomplice.set_field("education", "42").is_err());
    }
}
