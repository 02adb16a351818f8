//! Document → bundle, in two passes.
//!
//! 1. Materialize: every record becomes a validated [`Entity`] and joins the
//!    bundle. Child lists are only remembered, since they may name records
//!    that come later in the document.
//! 2. Link: each remembered child reference is resolved against the bundle
//!    and wired through the relationship manager. `Ref` fields of edge
//!    entities are resolved last.
//!
//! Any failure discards the partially built bundle.

use serde_json::Value as Json;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::bundle::Bundle;
use crate::config::CodecConfig;
use crate::document::{Document, DocumentError, Record, DOCUMENT_TYPE};
use crate::entity::{split_reference, Entity, EntityRef};
use crate::error::ModelError;
use crate::relation;
use crate::schema::{Cardinality, FieldType, Shape};
use crate::shapes;
use crate::value::Value;

/// Deserializes with the default [`CodecConfig`].
pub fn document_to_bundle(doc: &Document) -> Result<Bundle, DocumentError> {
    document_to_bundle_with(doc, &CodecConfig::default())
}

pub fn document_to_bundle_with(doc: &Document, config: &CodecConfig) -> Result<Bundle, DocumentError> {
    config.validate()?;
    if doc.doc_type != DOCUMENT_TYPE {
        return Err(DocumentError::Malformed {
            reason: format!("expected type `{DOCUMENT_TYPE}`, found `{}`", doc.doc_type),
        });
    }
    let mut bundle = Bundle::with_id(bundle_id(&doc.id)?);

    let mut pending: Vec<(EntityRef, Vec<String>)> = Vec::new();
    for (tag, records) in &doc.objects {
        let shape = shapes::shape_for(tag)?;
        for record in records {
            let (entity, children) = read_record(shape, record, config)?;
            let r = entity.reference();
            bundle.insert(entity).map_err(|source| DocumentError::Record {
                reference: r.to_string(),
                source,
            })?;
            if !children.is_empty() {
                pending.push((r, children));
            }
        }
        trace!(type_tag = tag.as_str(), count = records.len(), "materialized records");
    }

    let mut edges = 0usize;
    for (parent, children) in &pending {
        for child in children {
            link_child(&mut bundle, *parent, child)?;
            edges += 1;
        }
    }

    for entity in bundle.iter() {
        for (_, target) in entity.field_refs() {
            if !bundle.contains(target) {
                return Err(DocumentError::Dangling {
                    reference: target.to_string(),
                    holder: entity.reference().to_string(),
                });
            }
        }
    }

    debug!(bundle = %bundle.id(), entities = bundle.len(), edges, "deserialized bundle");
    Ok(bundle)
}

fn bundle_id(text: &str) -> Result<Uuid, DocumentError> {
    let malformed = || DocumentError::Malformed {
        reason: format!("bundle id `{text}` is not `{DOCUMENT_TYPE}--<uuid>`"),
    };
    let (tag, id) = split_reference(text).map_err(|_| malformed())?;
    if tag != DOCUMENT_TYPE {
        return Err(malformed());
    }
    Ok(id)
}

/// Builds the entity for one record and returns it with its child list.
fn read_record(
    shape: &'static Shape,
    record: &Record,
    config: &CodecConfig,
) -> Result<(Entity, Vec<String>), DocumentError> {
    let type_tag = shape.type_tag;
    let raw_id = record
        .get("id")
        .and_then(Json::as_str)
        .ok_or_else(|| DocumentError::Malformed {
            reason: format!("a `{type_tag}` record has no string `id`"),
        })?;
    let in_record = |source: ModelError| DocumentError::Record {
        reference: raw_id.to_string(),
        source,
    };
    let (id_tag, id) = split_reference(raw_id).map_err(in_record)?;
    if id_tag != type_tag {
        return Err(in_record(ModelError::MalformedReference {
            text: raw_id.to_string(),
            reason: format!("listed under `{type_tag}`"),
        }));
    }

    let mut values: Vec<(&'static str, Value)> = Vec::new();
    let mut children = Vec::new();
    for (key, json) in record {
        if key == "id" {
            continue;
        }
        if *key == config.children_key {
            children = read_children(json).ok_or_else(|| DocumentError::Malformed {
                reason: format!("`{raw_id}`: `{key}` must be a list of reference strings"),
            })?;
            continue;
        }
        let Some(decl) = shape.field(key) else {
            if config.ignore_unknown_fields {
                trace!(record = raw_id, field = key.as_str(), "ignored unknown field");
                continue;
            }
            return Err(in_record(ModelError::UnknownField {
                type_tag: type_tag.to_string(),
                field: key.clone(),
            }));
        };
        if let (FieldType::Ref { .. }, Some(text)) = (decl.ty, json.as_str()) {
            let (target_tag, _) = split_reference(text).map_err(in_record)?;
            if shapes::shape(target_tag).is_none() {
                return Err(DocumentError::Dangling {
                    reference: text.to_string(),
                    holder: raw_id.to_string(),
                });
            }
        }
        if let Some(value) = Value::from_json(type_tag, decl, json).map_err(in_record)? {
            values.push((decl.name, value));
        }
    }

    let entity = Entity::with_id(type_tag, id, values).map_err(in_record)?;
    Ok((entity, children))
}

fn read_children(json: &Json) -> Option<Vec<String>> {
    json.as_array()?
        .iter()
        .map(|c| c.as_str().map(str::to_string))
        .collect()
}

/// Resolves one child reference of `parent` and links the pair.
fn link_child(bundle: &mut Bundle, parent: EntityRef, child: &str) -> Result<(), DocumentError> {
    let dangling = || DocumentError::Dangling {
        reference: child.to_string(),
        holder: parent.to_string(),
    };
    let (tag, id) = split_reference(child).map_err(|source| DocumentError::Record {
        reference: parent.to_string(),
        source,
    })?;
    let child_ref = bundle.lookup(tag, &id).ok_or_else(dangling)?.reference();

    let parent_shape = bundle.entity(parent)?.shape();
    let slot = parent_shape
        .owned_slot_for(child_ref.type_tag())
        .ok_or_else(|| DocumentError::Malformed {
            reason: format!("`{parent}` cannot own `{child}`"),
        })?;

    // A document edge may not silently displace another one.
    let claimed_by = bundle.entity(child_ref)?.one(slot.inverse);
    if let Some(other) = claimed_by.filter(|other| *other != parent) {
        return Err(DocumentError::Malformed {
            reason: format!("`{child}` is listed by both `{other}` and `{parent}`"),
        });
    }
    if slot.cardinality == Cardinality::One {
        let held = bundle.entity(parent)?.one(slot.name);
        if let Some(other) = held.filter(|other| *other != child_ref) {
            return Err(DocumentError::Malformed {
                reason: format!("`{parent}` lists both `{other}` and `{child}` for `{}`", slot.name),
            });
        }
    }

    relation::link(bundle, parent, slot.name, child_ref)?;
    Ok(())
}
