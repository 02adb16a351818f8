//! Bundle → document.
//!
//! Every entity becomes one flat record: its declared fields in document
//! encoding, its `id` rewritten as a reference string, and (for parents) the
//! references of its owned children under the children key. Upward slots are
//! not written; the parent's child list already carries the edge.

use serde_json::Value as Json;
use tracing::{debug, trace};

use crate::bundle::Bundle;
use crate::config::CodecConfig;
use crate::document::{Document, DocumentError, Record, DOCUMENT_TYPE};
use crate::entity::{Entity, REF_SEPARATOR};

/// Serializes with the default [`CodecConfig`].
pub fn bundle_to_document(bundle: &Bundle) -> Document {
    write_document(bundle, &CodecConfig::default())
}

pub fn bundle_to_document_with(bundle: &Bundle, config: &CodecConfig) -> Result<Document, DocumentError> {
    config.validate()?;
    Ok(write_document(bundle, config))
}

fn write_document(bundle: &Bundle, config: &CodecConfig) -> Document {
    let mut doc = Document {
        doc_type: DOCUMENT_TYPE.to_string(),
        id: format!("{DOCUMENT_TYPE}{REF_SEPARATOR}{}", bundle.id()),
        objects: Default::default(),
    };
    for tag in bundle.type_tags() {
        let records: Vec<Record> = bundle.of_type(tag).map(|e| write_record(e, config)).collect();
        trace!(type_tag = tag, count = records.len(), "emitted records");
        doc.objects.insert(tag.to_string(), records);
    }
    debug!(bundle = %doc.id, records = doc.record_count(), "serialized bundle");
    doc
}

fn write_record(entity: &Entity, config: &CodecConfig) -> Record {
    let mut record = Record::new();
    record.insert("id".to_string(), Json::String(entity.reference().to_string()));
    for decl in entity.shape().all_fields() {
        match entity.get(decl.name) {
            Some(value) => {
                record.insert(decl.name.to_string(), value.to_json());
            }
            None if config.emit_nulls => {
                record.insert(decl.name.to_string(), Json::Null);
            }
            None => {}
        }
    }
    let children: Vec<Json> = entity
        .shape()
        .owned_slots()
        .filter_map(|slot| entity.slot(slot.name))
        .flat_map(|slot| slot.refs())
        .map(|child| Json::String(child.to_string()))
        .collect();
    if !children.is_empty() {
        record.insert(config.children_key.clone(), Json::Array(children));
    }
    record
}
