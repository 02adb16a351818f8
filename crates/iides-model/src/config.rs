use serde::{Deserialize, Serialize};

use crate::document::DocumentError;
use crate::shapes;

/// Options for reading and writing bundle documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Record key that lists a parent's owned children.
    pub children_key: String,
    /// Write absent optional fields as `null`.
    pub emit_nulls: bool,
    /// Drop undeclared record keys on read instead of rejecting the record.
    pub ignore_unknown_fields: bool,
    /// Pretty-print rendered documents.
    pub pretty: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            children_key: "children".to_string(),
            emit_nulls: false,
            ignore_unknown_fields: false,
            pretty: true,
        }
    }
}

impl CodecConfig {
    /// The children key must not collide with `id` or any declared field.
    pub fn validate(&self) -> Result<(), DocumentError> {
        let key = self.children_key.as_str();
        if key.is_empty() || key == "id" {
            return Err(DocumentError::InvalidConfig {
                reason: format!("`{key}` cannot be used as the children key"),
            });
        }
        if let Some(shape) = shapes::ALL.iter().find(|s| s.field(key).is_some()) {
            return Err(DocumentError::InvalidConfig {
                reason: format!("children key `{key}` collides with field {}.{key}", shape.type_tag),
            });
        }
        Ok(())
    }
}
