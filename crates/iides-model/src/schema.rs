//! Declarative entity shapes.
//!
//! A [`Shape`] is a static table: which fields an entity type carries, how
//! each one is typed, which relationship slots it exposes and which
//! cross-field rules hold. The validator and the relationship manager are
//! generic over these tables; no entity type has hand-written logic.

use std::fmt;

/// Runtime shape of a scalar field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Str,
    Int,
    Float,
    Bool,
    Date,
    DateTime,
    /// Whole-day span.
    Duration,
}

impl ScalarKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Str => "string",
            Self::Int => "integer",
            Self::Float => "float",
            Self::Bool => "boolean",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Duration => "duration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Scalar(ScalarKind),
    List(ScalarKind),
    /// A single code from `vocab`.
    Code { vocab: &'static str },
    CodeList { vocab: &'static str },
    /// A code from `vocab` whose leading segment must equal the value of the
    /// `parent` field (a `Code`).
    Subtype {
        vocab: &'static str,
        parent: &'static str,
    },
    /// Like `Subtype`, but each element's leading segment must be one of the
    /// codes in the `parent` field (a `CodeList`).
    SubtypeList {
        vocab: &'static str,
        parent: &'static str,
    },
    /// `(type, subtype)` pairs, each internally consistent.
    PairList {
        type_vocab: &'static str,
        subtype_vocab: &'static str,
    },
    /// `(code, date)` pairs.
    DatedCodeList { vocab: &'static str },
    /// Non-owning pointer to an entity with type tag `target`.
    Ref { target: &'static str },
}

impl FieldType {
    pub fn is_list(self) -> bool {
        matches!(
            self,
            Self::List(_)
                | Self::CodeList { .. }
                | Self::SubtypeList { .. }
                | Self::PairList { .. }
                | Self::DatedCodeList { .. }
        )
    }

    /// The type of a single element of a list field.
    pub fn element(self) -> Option<FieldType> {
        match self {
            Self::List(kind) => Some(Self::Scalar(kind)),
            Self::CodeList { vocab } => Some(Self::Code { vocab }),
            Self::SubtypeList { vocab, parent } => Some(Self::Subtype { vocab, parent }),
            Self::PairList { .. } | Self::DatedCodeList { .. } => Some(self),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => f.write_str(kind.name()),
            Self::List(kind) => write!(f, "list of {}", kind.name()),
            Self::Code { vocab } | Self::Subtype { vocab, .. } => write!(f, "code from {vocab}"),
            Self::CodeList { vocab } | Self::SubtypeList { vocab, .. } => {
                write!(f, "list of codes from {vocab}")
            }
            Self::PairList {
                type_vocab,
                subtype_vocab,
            } => write!(f, "list of ({type_vocab}, {subtype_vocab}) pairs"),
            Self::DatedCodeList { vocab } => write!(f, "list of ({vocab}, date) pairs"),
            Self::Ref { target } => write!(f, "reference to {target}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
}

impl FieldDecl {
    pub const fn optional(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: false,
        }
    }

    pub const fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// One end of a bidirectional relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotDecl {
    pub name: &'static str,
    pub target: &'static str,
    pub cardinality: Cardinality,
    /// Name of the matching slot on `target`.
    pub inverse: &'static str,
    /// True on the parent end. Owned children are listed in the parent's
    /// document record.
    pub owned: bool,
}

impl SlotDecl {
    /// Owned to-many end (parent side).
    pub const fn children(name: &'static str, target: &'static str, inverse: &'static str) -> Self {
        Self {
            name,
            target,
            cardinality: Cardinality::Many,
            inverse,
            owned: true,
        }
    }

    /// Owned to-one end (parent side of a one-to-one relationship).
    pub const fn child(name: &'static str, target: &'static str, inverse: &'static str) -> Self {
        Self {
            name,
            target,
            cardinality: Cardinality::One,
            inverse,
            owned: true,
        }
    }

    /// Upward to-one end (child side).
    pub const fn parent(name: &'static str, target: &'static str, inverse: &'static str) -> Self {
        Self {
            name,
            target,
            cardinality: Cardinality::One,
            inverse,
            owned: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Both fields present or both absent.
    CoupledPair(&'static str, &'static str),
    /// `span == end - start` whenever all three are present; `span` is
    /// recomputed when an endpoint changes and requires both endpoints.
    DerivedSpan {
        start: &'static str,
        end: &'static str,
        span: &'static str,
    },
}

#[derive(Debug)]
pub struct Shape {
    pub type_tag: &'static str,
    pub fields: &'static [FieldDecl],
    /// Shared field table composed into this shape (the person profile).
    pub profile: &'static [FieldDecl],
    pub slots: &'static [SlotDecl],
    pub rules: &'static [Rule],
}

impl Shape {
    /// All declared fields: own fields first, then the composed profile.
    pub fn all_fields(&self) -> impl Iterator<Item = &'static FieldDecl> {
        let (fields, profile): (&'static [FieldDecl], &'static [FieldDecl]) =
            (self.fields, self.profile);
        fields.iter().chain(profile.iter())
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldDecl> {
        self.all_fields().find(|f| f.name == name)
    }

    pub fn slot(&self, name: &str) -> Option<&'static SlotDecl> {
        let slots: &'static [SlotDecl] = self.slots;
        slots.iter().find(|s| s.name == name)
    }

    pub fn owned_slots(&self) -> impl Iterator<Item = &'static SlotDecl> {
        let slots: &'static [SlotDecl] = self.slots;
        slots.iter().filter(|s| s.owned)
    }

    /// The owned slot that holds children of type `child_tag`.
    pub fn owned_slot_for(&self, child_tag: &str) -> Option<&'static SlotDecl> {
        self.owned_slots().find(|s| s.target == child_tag)
    }

    /// Fields whose type is `Subtype`/`SubtypeList` of `parent`.
    pub fn subtypes_of(&self, parent: &'static str) -> impl Iterator<Item = &'static FieldDecl> {
        self.all_fields().filter(move |f| match f.ty {
            FieldType::Subtype { parent: p, .. } | FieldType::SubtypeList { parent: p, .. } => {
                p == parent
            }
            _ => false,
        })
    }

    /// True when the shape only holds `Ref` edges (collusion, org-relationship).
    pub fn is_edge(&self) -> bool {
        self.slots.is_empty() && self.fields.iter().any(|f| matches!(f.ty, FieldType::Ref { .. }))
    }
}
