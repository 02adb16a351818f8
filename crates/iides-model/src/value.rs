//! Field values and their fixed document encodings.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde_json::Value as Json;

use crate::entity::EntityRef;
use crate::error::ModelError;
use crate::schema::{FieldDecl, FieldType, ScalarKind};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Fractional seconds are written only when present.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const DATETIME_READ_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A present field value. Absence is the field missing from the entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// String scalar or a single vocabulary code.
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Whole-day span.
    Duration(TimeDelta),
    /// Hierarchical `(type, subtype)` codes.
    Pair(String, String),
    /// `(code, date)`.
    Dated(String, NaiveDate),
    Ref(EntityRef),
    List(Vec<Value>),
}

impl Value {
    pub fn pair(kind: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self::Pair(kind.into(), subtype.into())
    }

    pub fn dated(code: impl Into<String>, date: NaiveDate) -> Self {
        Self::Dated(code.into(), date)
    }

    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Short name of the runtime shape, used in type errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "boolean",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
            Self::Duration(_) => "duration",
            Self::Pair(..) => "pair",
            Self::Dated(..) => "dated code",
            Self::Ref(_) => "reference",
            Self::List(_) => "list",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<TimeDelta> {
        match self {
            Self::Duration(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_entity_ref(&self) -> Option<EntityRef> {
        match self {
            Self::Ref(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Renders the value in its document encoding.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Str(s) => Json::String(s.clone()),
            Self::Int(i) => Json::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Self::Bool(b) => Json::Bool(*b),
            Self::Date(d) => Json::String(format_date(*d)),
            Self::DateTime(dt) => Json::String(dt.format(DATETIME_FORMAT).to_string()),
            Self::Duration(d) => Json::String(format_duration(*d)),
            Self::Pair(kind, subtype) => Json::Array(vec![kind.clone().into(), subtype.clone().into()]),
            Self::Dated(code, d) => Json::Array(vec![code.clone().into(), format_date(*d).into()]),
            Self::Ref(r) => Json::String(r.to_string()),
            Self::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
        }
    }

    /// Reads a document value for the field `decl` of `type_tag`.
    ///
    /// JSON `null` is absence and yields `Ok(None)`. The result is shaped
    /// correctly but not yet checked against vocabularies.
    pub fn from_json(type_tag: &str, decl: &FieldDecl, json: &Json) -> Result<Option<Self>, ModelError> {
        if json.is_null() {
            return Ok(None);
        }
        let mismatch = || ModelError::TypeMismatch {
            type_tag: type_tag.to_string(),
            field: decl.name.to_string(),
            expected: decl.ty.to_string(),
            found: json_type_name(json).to_string(),
        };
        let value = if decl.ty.is_list() {
            let element = decl.ty.element().ok_or_else(mismatch)?;
            let items = json.as_array().ok_or_else(mismatch)?;
            let items = items
                .iter()
                .map(|item| decode_one(element, item).ok_or_else(mismatch))
                .collect::<Result<Vec<_>, _>>()?;
            Self::List(items)
        } else if let FieldType::Ref { .. } = decl.ty {
            let text = json.as_str().ok_or_else(mismatch)?;
            Self::Ref(EntityRef::parse(text)?)
        } else {
            decode_one(decl.ty, json).ok_or_else(mismatch)?
        };
        Ok(Some(value))
    }
}

fn decode_one(ty: FieldType, json: &Json) -> Option<Value> {
    match ty {
        FieldType::Scalar(kind) => decode_scalar(kind, json),
        FieldType::Code { .. } | FieldType::Subtype { .. } => json.as_str().map(|s| Value::Str(s.to_string())),
        FieldType::PairList { .. } => match json.as_array()?.as_slice() {
            [kind, subtype] => Some(Value::pair(kind.as_str()?, subtype.as_str()?)),
            _ => None,
        },
        FieldType::DatedCodeList { .. } => match json.as_array()?.as_slice() {
            [code, date] => Some(Value::dated(code.as_str()?, parse_date(date.as_str()?)?)),
            _ => None,
        },
        _ => None,
    }
}

fn decode_scalar(kind: ScalarKind, json: &Json) -> Option<Value> {
    match kind {
        ScalarKind::Str => json.as_str().map(|s| Value::Str(s.to_string())),
        ScalarKind::Int => json.as_i64().map(Value::Int),
        ScalarKind::Float => json.as_f64().map(Value::Float),
        ScalarKind::Bool => json.as_bool().map(Value::Bool),
        ScalarKind::Date => json.as_str().and_then(parse_date).map(Value::Date),
        ScalarKind::DateTime => json.as_str().and_then(parse_datetime).map(Value::DateTime),
        ScalarKind::Duration => json.as_str().and_then(parse_duration).map(Value::Duration),
    }
}

fn json_type_name(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(n) if n.is_f64() => "float",
        Json::Number(_) => "integer",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

pub fn format_date(d: NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT).ok()
}

/// Accepts a space or `T` separator and optional fractional seconds.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    DATETIME_READ_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

/// `P<n>D`.
pub fn format_duration(d: TimeDelta) -> String {
    format!("P{}D", d.num_days())
}

pub fn parse_duration(text: &str) -> Option<TimeDelta> {
    let days = text.strip_prefix('P')?.strip_suffix('D')?;
    TimeDelta::try_days(days.parse().ok()?)
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Self::DateTime(dt)
    }
}

impl From<TimeDelta> for Value {
    fn from(d: TimeDelta) -> Self {
        Self::Duration(d)
    }
}

impl From<EntityRef> for Value {
    fn from(r: EntityRef) -> Self {
        Self::Ref(r)
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(items: Vec<V>) -> Self {
        Self::list(items)
    }
}
