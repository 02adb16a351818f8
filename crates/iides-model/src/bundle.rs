//! The Bundle: sole owner of every entity, bucketed by type tag.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use tracing::debug;
use uuid::Uuid;

use crate::entity::{split_reference, Entity, EntityRef};
use crate::error::ModelError;
use crate::relation;
use crate::value::Value;

type Bucket = IndexMap<Uuid, Entity>;

/// A keyed collection of entities, the unit of exchange.
///
/// Buckets keep insertion order. Relationship slots inside the entities
/// refer to other members by [`EntityRef`]; the bundle itself does not
/// interpret them.
#[derive(Debug, Clone)]
pub struct Bundle {
    id: Uuid,
    buckets: BTreeMap<&'static str, Bucket>,
}

impl Default for Bundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Bundle {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            buckets: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Adds an entity and returns its reference.
    ///
    /// The entity arrives unlinked (any slot contents it carries are
    /// dropped; edges are made with [`relation::link`]). Every `Ref` field
    /// must point at a member already in the bundle.
    pub fn add(&mut self, entity: Entity) -> Result<EntityRef, ModelError> {
        for (_, target) in entity.field_refs() {
            self.entity(target)?;
        }
        self.insert(entity)
    }

    /// Adds without checking `Ref` fields; the importer checks them once
    /// every record is present.
    pub(crate) fn insert(&mut self, mut entity: Entity) -> Result<EntityRef, ModelError> {
        let r = entity.reference();
        let bucket = self.buckets.entry(entity.type_tag()).or_default();
        if bucket.contains_key(&r.id()) {
            return Err(ModelError::DuplicateEntity {
                reference: r.to_string(),
            });
        }
        entity.clear_slots();
        bucket.insert(r.id(), entity);
        Ok(r)
    }

    pub fn contains(&self, r: EntityRef) -> bool {
        self.get(r).is_some()
    }

    pub fn get(&self, r: EntityRef) -> Option<&Entity> {
        self.buckets.get(r.type_tag())?.get(&r.id())
    }

    pub(crate) fn get_mut(&mut self, r: EntityRef) -> Option<&mut Entity> {
        self.buckets.get_mut(r.type_tag())?.get_mut(&r.id())
    }

    /// Like [`Bundle::get`], reporting a missing member as an error.
    pub fn entity(&self, r: EntityRef) -> Result<&Entity, ModelError> {
        self.get(r).ok_or_else(|| ModelError::EntityNotFound {
            reference: r.to_string(),
        })
    }

    pub fn lookup(&self, type_tag: &str, id: &Uuid) -> Option<&Entity> {
        self.buckets.get(type_tag)?.get(id)
    }

    /// Resolves a `"<type_tag>--<uuid>"` string to its member.
    pub fn resolve(&self, reference: &str) -> Result<&Entity, ModelError> {
        let (tag, id) = split_reference(reference)?;
        self.lookup(tag, &id).ok_or_else(|| ModelError::EntityNotFound {
            reference: reference.to_string(),
        })
    }

    pub fn set_field(&mut self, r: EntityRef, name: &str, value: impl Into<Value>) -> Result<(), ModelError> {
        let value = value.into();
        self.check_refs(&value)?;
        self.member_mut(r)?.set_field(name, value)
    }

    pub fn set_fields<I, K, V>(&mut self, r: EntityRef, values: I) -> Result<(), ModelError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let values: Vec<(K, Value)> = values.into_iter().map(|(k, v)| (k, v.into())).collect();
        for (_, value) in &values {
            self.check_refs(value)?;
        }
        self.member_mut(r)?.set_fields(values)
    }

    pub fn clear_field(&mut self, r: EntityRef, name: &str) -> Result<(), ModelError> {
        self.member_mut(r)?.clear_field(name)
    }

    pub fn append_item(&mut self, r: EntityRef, name: &str, item: impl Into<Value>) -> Result<(), ModelError> {
        self.member_mut(r)?.append_item(name, item)
    }

    fn member_mut(&mut self, r: EntityRef) -> Result<&mut Entity, ModelError> {
        self.get_mut(r).ok_or_else(|| ModelError::EntityNotFound {
            reference: r.to_string(),
        })
    }

    fn check_refs(&self, value: &Value) -> Result<(), ModelError> {
        match value {
            Value::Ref(target) => self.entity(*target).map(|_| ()),
            Value::List(items) => items.iter().try_for_each(|item| self.check_refs(item)),
            _ => Ok(()),
        }
    }

    /// Edge entities holding a `Ref` to `r`.
    pub fn holders_of(&self, r: EntityRef) -> Vec<EntityRef> {
        self.iter()
            .filter(|e| e.field_refs().any(|(_, target)| target == r))
            .map(Entity::reference)
            .collect()
    }

    /// Removes a member after severing all of its relationship edges.
    ///
    /// Refused while an edge entity still refers to it; remove the edge
    /// entity first.
    pub fn remove(&mut self, r: EntityRef) -> Result<Entity, ModelError> {
        self.entity(r)?;
        if let Some(holder) = self.holders_of(r).first() {
            return Err(ModelError::StillReferenced {
                reference: r.to_string(),
                holder: holder.to_string(),
            });
        }
        relation::detach_all(self, r);
        let bucket = self
            .buckets
            .get_mut(r.type_tag())
            .ok_or_else(|| ModelError::EntityNotFound {
                reference: r.to_string(),
            })?;
        let entity = bucket.shift_remove(&r.id()).ok_or_else(|| ModelError::EntityNotFound {
            reference: r.to_string(),
        })?;
        if bucket.is_empty() {
            self.buckets.remove(r.type_tag());
        }
        debug!(reference = %r, "removed entity");
        Ok(entity)
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Type tags with at least one member, sorted.
    pub fn type_tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.populated().map(|(tag, _)| *tag)
    }

    /// Members of one type in insertion order.
    pub fn of_type<'a>(&'a self, type_tag: &str) -> impl Iterator<Item = &'a Entity> + 'a {
        self.buckets.get(type_tag).into_iter().flat_map(|b| b.values())
    }

    /// Every member, bucket by bucket.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.buckets.values().flat_map(|b| b.values())
    }

    /// `(type_tag, count)` for every populated bucket.
    pub fn counts(&self) -> Vec<(&'static str, usize)> {
        self.populated().map(|(tag, b)| (*tag, b.len())).collect()
    }

    fn populated(&self) -> impl Iterator<Item = (&&'static str, &Bucket)> {
        self.buckets.iter().filter(|(_, b)| !b.is_empty())
    }
}

/// Same id and the same members (fields and slots), ignoring bucket order.
impl PartialEq for Bundle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.populated().eq(other.populated())
    }
}
