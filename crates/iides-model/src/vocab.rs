//! Controlled vocabularies.
//!
//! A vocabulary is a closed, ordered list of codes with human-readable
//! titles. Hierarchical vocabularies are plain vocabularies whose codes carry
//! their parent code as the leading dot-separated segment (`"15.1"` belongs to
//! `"15"`), so one prefix rule covers every type/subtype pair in the model.
//!
//! The built-in registry is parsed once from `data/vocab.json` and shared
//! read-only for the rest of the process.

use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

use crate::error::ModelError;

const BUILTIN_VOCAB_JSON: &str = include_str!("../data/vocab.json");

#[derive(Debug, Error)]
pub enum VocabLoadError {
    #[error("vocabulary data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("vocabulary `{vocab}` lists code `{code}` twice")]
    DuplicateCode { vocab: String, code: String },

    #[error("vocabulary `{vocab}` is empty")]
    Empty { vocab: String },
}

#[derive(Debug, Deserialize)]
struct RawTerm {
    #[serde(rename = "const")]
    code: String,
    #[serde(default)]
    title: String,
}

/// One closed code list, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    name: String,
    terms: IndexMap<String, String>,
}

impl Vocabulary {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains(&self, code: &str) -> bool {
        self.terms.contains_key(code)
    }

    pub fn title(&self, code: &str) -> Option<&str> {
        self.terms.get(code).map(String::as_str)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.terms.keys().map(String::as_str)
    }

    /// `(code, title)` pairs in declaration order.
    pub fn terms(&self) -> impl Iterator<Item = (&str, &str)> {
        self.terms.iter().map(|(c, t)| (c.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Leading dot-separated segment of a hierarchical code.
///
/// `"92.811"` → `"92"`; a code without a dot is its own parent segment.
pub fn parent_segment(code: &str) -> &str {
    code.split_once('.').map_or(code, |(head, _)| head)
}

/// Every vocabulary the model validates against, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct VocabularyRegistry {
    vocabs: BTreeMap<String, Vocabulary>,
}

impl VocabularyRegistry {
    pub fn from_json_str(text: &str) -> Result<Self, VocabLoadError> {
        let raw: BTreeMap<String, Vec<RawTerm>> = serde_json::from_str(text)?;
        let mut vocabs = BTreeMap::new();
        for (name, raw_terms) in raw {
            if raw_terms.is_empty() {
                return Err(VocabLoadError::Empty { vocab: name });
            }
            let mut terms = IndexMap::with_capacity(raw_terms.len());
            for term in raw_terms {
                if terms.insert(term.code.clone(), term.title).is_some() {
                    return Err(VocabLoadError::DuplicateCode {
                        vocab: name,
                        code: term.code,
                    });
                }
            }
            vocabs.insert(name.clone(), Vocabulary { name, terms });
        }
        tracing::debug!(count = vocabs.len(), "loaded vocabularies");
        Ok(Self { vocabs })
    }

    /// The registry built from the embedded vocabulary data.
    ///
    /// # Panics
    ///
    /// If the embedded data is malformed. It ships with the crate and is
    /// covered by tests, so this only fires on a broken build.
    pub fn builtin() -> &'static VocabularyRegistry {
        static BUILTIN: OnceLock<VocabularyRegistry> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            VocabularyRegistry::from_json_str(BUILTIN_VOCAB_JSON)
                .unwrap_or_else(|e| panic!("embedded vocabulary data is invalid: {e}"))
        })
    }

    pub fn get(&self, name: &str) -> Option<&Vocabulary> {
        self.vocabs.get(name)
    }

    /// Looks up a vocabulary that the shape tables declare.
    ///
    /// # Panics
    ///
    /// On an unknown name: shape tables only name vocabularies that exist,
    /// so reaching this is a programming error rather than bad input.
    pub fn vocabulary(&self, name: &str) -> &Vocabulary {
        self.vocabs
            .get(name)
            .unwrap_or_else(|| panic!("unknown vocabulary `{name}`"))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vocabs.keys().map(String::as_str)
    }

    pub fn is_member(&self, vocab: &str, code: &str) -> bool {
        self.vocabulary(vocab).contains(code)
    }

    /// True when both codes are members of their vocabularies and the child's
    /// leading segment equals the parent code.
    pub fn is_valid_subtype(
        &self,
        parent_vocab: &str,
        parent_code: &str,
        child_vocab: &str,
        child_code: &str,
    ) -> bool {
        self.is_member(parent_vocab, parent_code)
            && self.is_member(child_vocab, child_code)
            && parent_segment(child_code) == parent_code
    }

    /// Membership check reported as a [`ModelError::NotInVocabulary`] naming
    /// the field it was made for.
    pub fn check_member(
        &self,
        type_tag: &str,
        field: &str,
        vocab: &str,
        code: &str,
    ) -> Result<(), ModelError> {
        if self.is_member(vocab, code) {
            Ok(())
        } else {
            Err(ModelError::NotInVocabulary {
                type_tag: type_tag.to_string(),
                field: field.to_string(),
                value: code.to_string(),
                vocab: vocab.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_loads() {
        let reg = VocabularyRegistry::builtin();
        assert!(reg.is_member("cia-vocab", "C"));
        assert!(!reg.is_member("cia-vocab", "X"));
        assert_eq!(reg.vocabulary("incident-type-vocab").title("F"), Some("Fraud"));
    }

    #[test]
    fn subtype_prefix_rule() {
        let reg = VocabularyRegistry::builtin();
        assert!(reg.is_valid_subtype("job-function-vocab", "15", "occupation-vocab", "15.1"));
        assert!(!reg.is_valid_subtype("job-function-vocab", "17", "occupation-vocab", "15.1"));
        assert!(reg.is_valid_subtype(
            "industry-sector-vocab",
            "92",
            "industry-subsector-vocab",
            "92.811"
        ));
        // "31.21" belongs to "31", not to a hypothetical "31.2".
        assert_eq!(parent_segment("31.21"), "31");
    }

    #[test]
    #[should_panic(expected = "unknown vocabulary")]
    fn unknown_vocabulary_name_panics() {
        VocabularyRegistry::builtin().is_member("no-such-vocab", "1");
    }

    #[test]
    fn rejects_duplicate_codes() {
        let err = VocabularyRegistry::from_json_str(
            r#"{"v": [{"const": "1", "title": "a"}, {"const": "1", "title": "b"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, VocabLoadError::DuplicateCode { .. }));
    }

    #[test]
    fn check_member_names_the_field() {
        let err = VocabularyRegistry::builtin()
            .check_member("incident", "status", "incident-status-vocab", "Z")
            .unwrap_err();
        assert_eq!(err.field(), Some("status"));
        assert!(err.to_string().contains("incident-status-vocab"));
    }
}
