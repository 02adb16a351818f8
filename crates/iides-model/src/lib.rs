//! IIDES: a validated object graph for insider-incident case records.
//!
//! Three pieces do the work:
//!
//! 1. **Validation**: every field write goes through one generic validator
//!    driven by declarative [`Shape`] tables (runtime type, controlled
//!    vocabulary, type/subtype hierarchy, coupled and derived fields).
//! 2. **Relationships**: a [`Bundle`] owns every [`Entity`]; slots hold
//!    non-owning [`EntityRef`]s and the [`relation`] module keeps both ends
//!    of every edge consistent.
//! 3. **Documents**: [`bundle_to_document`] flattens the cyclic graph into a
//!    reference-based [`Document`]; [`document_to_bundle`] rebuilds it in two
//!    passes and rejects dangling references.
//!
//! ```
//! use iides_model::{bundle_to_document, document_to_bundle, link, Bundle, Entity};
//!
//! let mut bundle = Bundle::new();
//! let incident = bundle.add(Entity::new("incident")?)?;
//! let ttp = bundle.add(Entity::from_values("ttp", [("description", "Phishing")])?)?;
//! link(&mut bundle, incident, "ttps", ttp)?;
//!
//! let doc = bundle_to_document(&bundle);
//! assert_eq!(document_to_bundle(&doc)?, bundle);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bundle;
pub mod config;
pub mod document;
pub mod entity;
pub mod error;
pub mod export;
pub mod import;
pub mod relation;
pub mod schema;
pub mod shapes;
pub mod validate;
pub mod value;
pub mod vocab;

pub use bundle::Bundle;
pub use config::CodecConfig;
pub use document::{Document, DocumentError, Record};
pub use entity::{Entity, EntityRef, Slot};
pub use error::{ErrorKind, ModelError};
pub use export::{bundle_to_document, bundle_to_document_with};
pub use import::{document_to_bundle, document_to_bundle_with};
pub use relation::{link, replace_many, unlink, unset};
pub use schema::{Cardinality, FieldDecl, FieldType, Rule, ScalarKind, Shape, SlotDecl};
pub use value::Value;
pub use vocab::{VocabLoadError, Vocabulary, VocabularyRegistry};

/// Creates a validated entity of `type_tag` with a fresh id.
pub fn new_entity<I, K, V>(type_tag: &str, values: I) -> Result<Entity, ModelError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    Entity::from_values(type_tag, values)
}

/// Validated single-field write; on error the entity is unchanged.
pub fn set_field(entity: &mut Entity, name: &str, value: impl Into<Value>) -> Result<(), ModelError> {
    entity.set_field(name, value)
}
