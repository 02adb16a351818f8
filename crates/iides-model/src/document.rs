//! The flat, reference-based bundle document.
//!
//! ```json
//! {
//!   "type": "bundle",
//!   "id": "bundle--<uuid>",
//!   "objects": {
//!     "court-case": [{"id": "court-case--<uuid>", "case_number": "...", "children": ["charge--<uuid>"]}],
//!     "charge": [{"id": "charge--<uuid>", "title": "..."}]
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ModelError;

pub const DOCUMENT_TYPE: &str = "bundle";

/// One flat entity record.
pub type Record = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "type")]
    pub doc_type: String,
    /// `"bundle--<uuid>"`.
    pub id: String,
    /// Records bucketed by type tag.
    #[serde(default)]
    pub objects: BTreeMap<String, Vec<Record>>,
}

impl Document {
    pub fn from_json_str(text: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_string(&self, pretty: bool) -> Result<String, DocumentError> {
        let text = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(text)
    }

    pub fn record_count(&self) -> usize {
        self.objects.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed document: {reason}")]
    Malformed { reason: String },

    #[error("record `{reference}`: {source}")]
    Record {
        reference: String,
        #[source]
        source: ModelError,
    },

    /// A reference with no matching record in the same document.
    #[error("dangling reference `{reference}` in `{holder}`")]
    Dangling { reference: String, holder: String },

    #[error("invalid codec configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}
