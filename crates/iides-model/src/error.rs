//! Error taxonomy for the object graph.
//!
//! Every failure the model can report is a [`ModelError`]. Callers that need
//! to dispatch on the broad category (bad shape vs. bad vocabulary vs. an
//! inconsistent field pair) use [`ModelError::kind`].

use thiserror::Error;

/// Broad category of a [`ModelError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A value's runtime shape does not match its declared type, or an entity
    /// of the wrong concrete type was offered to a relationship slot.
    Type,
    /// A value is outside its vocabulary, a subtype does not belong to its
    /// parent type, a required field is missing, or a record is otherwise
    /// invalid. Duplicate entities and malformed reference strings or ids
    /// (`DuplicateEntity`, `MalformedReference`, `MalformedId`) also land here.
    Validation,
    /// The operation would leave two linked fields (or a linked entity) in a
    /// mutually inconsistent state.
    Reference,
    /// An entity or bundle member could not be found.
    Lookup,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("unknown entity type `{type_tag}`")]
    UnknownEntityType { type_tag: String },

    #[error("`{type_tag}` has no field `{field}`")]
    UnknownField { type_tag: String, field: String },

    #[error("`{type_tag}` has no relationship slot `{slot}`")]
    UnknownSlot { type_tag: String, slot: String },

    #[error("{type_tag}.{field}: expected {expected}, found {found}")]
    TypeMismatch {
        type_tag: String,
        field: String,
        expected: String,
        found: String,
    },

    #[error("{type_tag}.{slot}: expected a `{expected}` entity, found `{found}`")]
    WrongEntityType {
        type_tag: String,
        slot: String,
        expected: String,
        found: String,
    },

    #[error("{type_tag}.{field}: `{value}` is not in vocabulary `{vocab}`")]
    NotInVocabulary {
        type_tag: String,
        field: String,
        value: String,
        vocab: String,
    },

    #[error(
        "{type_tag}.{field}: `{value}` is not a subtype of {parent_field} {}",
        describe_parent(.parent_value)
    )]
    InvalidSubtype {
        type_tag: String,
        field: String,
        value: String,
        parent_field: String,
        parent_value: Option<String>,
    },

    #[error("{type_tag}{}: required field `{field}` is missing", id_suffix(.id))]
    MissingRequired {
        type_tag: String,
        id: Option<uuid::Uuid>,
        field: String,
    },

    #[error("{type_tag}.{field}: `{found}` does not match the value derived from {derived_from} (`{expected}`)")]
    DerivedMismatch {
        type_tag: String,
        field: String,
        derived_from: String,
        expected: String,
        found: String,
    },

    #[error("{type_tag}.{field}: {reason}")]
    Inconsistent {
        type_tag: String,
        field: String,
        reason: String,
    },

    #[error("`{reference}` is already present in the bundle")]
    DuplicateEntity { reference: String },

    #[error("`{reference}` is not present in the bundle")]
    EntityNotFound { reference: String },

    #[error("`{reference}` is still referenced by `{holder}`")]
    StillReferenced { reference: String, holder: String },

    #[error("malformed reference `{text}`: {reason}")]
    MalformedReference { text: String, reason: String },

    #[error("malformed id `{text}`")]
    MalformedId { text: String },
}

fn describe_parent(value: &Option<String>) -> String {
    match value {
        Some(v) => format!("`{v}`"),
        None => "(unset)".to_string(),
    }
}

fn id_suffix(id: &Option<uuid::Uuid>) -> String {
    id.map(|id| format!(" {id}")).unwrap_or_default()
}

impl ModelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TypeMismatch { .. } | Self::WrongEntityType { .. } | Self::UnknownSlot { .. } => {
                ErrorKind::Type
            }
            Self::UnknownEntityType { .. }
            | Self::UnknownField { .. }
            | Self::NotInVocabulary { .. }
            | Self::InvalidSubtype { .. }
            | Self::MissingRequired { .. }
            | Self::DerivedMismatch { .. }
            | Self::DuplicateEntity { .. }
            | Self::MalformedReference { .. }
            | Self::MalformedId { .. } => ErrorKind::Validation,
            Self::Inconsistent { .. } | Self::StillReferenced { .. } => ErrorKind::Reference,
            Self::EntityNotFound { .. } => ErrorKind::Lookup,
        }
    }

    /// The field a validation failure is about, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::UnknownField { field, .. }
            | Self::TypeMismatch { field, .. }
            | Self::NotInVocabulary { field, .. }
            | Self::InvalidSubtype { field, .. }
            | Self::MissingRequired { field, .. }
            | Self::DerivedMismatch { field, .. }
            | Self::Inconsistent { field, .. } => Some(field),
            Self::UnknownSlot { slot, .. } | Self::WrongEntityType { slot, .. } => Some(slot),
            _ => None,
        }
    }
}
