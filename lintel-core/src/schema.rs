//! Schema-driven merging of view payloads into models.
//!
//! A [`Schema`] names the fields a view may write and their shape. Merging
//! walks the schema, not the payload: unknown payload fields are ignored,
//! read-only fields are skipped, nested objects merge recursively and arrays
//! are replaced wholesale.
//!
//! ```
//! use lintel_core::schema::Schema;
//! use serde_json::json;
//!
//! let schema = Schema::new()
//!     .read_only("id")
//!     .primitive("name")
//!     .object("address", Schema::new().primitive("city").primitive("zip"));
//!
//! let mut model = json!({"id": 1, "name": "Ada", "address": {"city": "London", "zip": "N1"}});
//! schema
//!     .merge(&mut model, &json!({"id": 99, "name": "Ada L.", "address": {"city": "Paris"}, "bogus": 1}))
//!     .unwrap();
//!
//! assert_eq!(model, json!({"id": 1, "name": "Ada L.", "address": {"city": "Paris", "zip": "N1"}}));
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("payload must be a JSON object")]
    PayloadNotObject,

    #[error("field `{field}` must be {expected}")]
    Shape { field: String, expected: &'static str },

    #[error("merged value does not fit the model: {0}")]
    Model(String),
}

impl From<MergeError> for crate::Error {
    fn from(err: MergeError) -> Self {
        match err {
            MergeError::Model(detail) => crate::Error::Internal(detail),
            other => crate::Error::BadRequest(other.to_string()),
        }
    }
}

/// Shape of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Strings, numbers, booleans; replaced as a whole.
    Primitive,
    /// A nested object merged field by field.
    Object(Schema),
    /// A list, replaced as a whole.
    Array,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub read_only: bool,
}

/// Writable shape of a view.
///
/// A schema without fields is permissive: every top-level payload field is
/// copied over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(Field {
            name: name.into(),
            kind,
            read_only: false,
        });
        self
    }

    pub fn primitive(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Primitive)
    }

    pub fn object(self, name: impl Into<String>, schema: Schema) -> Self {
        self.field(name, FieldKind::Object(schema))
    }

    pub fn array(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Array)
    }

    /// A field the payload may carry but never overwrites.
    pub fn read_only(mut self, name: impl Into<String>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            kind: FieldKind::Primitive,
            read_only: true,
        });
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn is_permissive(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merge `source` into `target` in place.
    pub fn merge(&self, target: &mut Value, source: &Value) -> Result<(), MergeError> {
        let source = source.as_object().ok_or(MergeError::PayloadNotObject)?;
        if !target.is_object() {
            *target = Value::Object(Map::new());
        }
        let Value::Object(target) = target else {
            return Err(MergeError::Model("model is not an object".to_string()));
        };

        if self.is_permissive() {
            for (key, value) in source {
                target.insert(key.clone(), value.clone());
            }
            return Ok(());
        }

        for field in self.fields.iter().filter(|f| !f.read_only) {
            let Some(incoming) = source.get(&field.name) else {
                continue;
            };
            merge_field(field, target, incoming)?;
        }
        Ok(())
    }

    /// Merge a view into an existing model through their JSON forms.
    pub fn merge_models<M, V>(&self, existing: &M, view: &V) -> Result<M, MergeError>
    where
        M: Serialize + DeserializeOwned,
        V: Serialize,
    {
        let mut target = to_value(existing)?;
        self.merge(&mut target, &to_value(view)?)?;
        serde_json::from_value(target).map_err(|e| MergeError::Model(e.to_string()))
    }

    /// Build a new model from a view, starting from `template` (usually a default model).
    pub fn build_model<M, V>(&self, template: &M, view: &V) -> Result<M, MergeError>
    where
        M: Serialize + DeserializeOwned,
        V: Serialize,
    {
        self.merge_models(template, view)
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, MergeError> {
    serde_json::to_value(value).map_err(|e| MergeError::Model(e.to_string()))
}

fn merge_field(field: &Field, target: &mut Map<String, Value>, incoming: &Value) -> Result<(), MergeError> {
    match &field.kind {
        FieldKind::Primitive => {
            if incoming.is_object() || incoming.is_array() {
                return Err(MergeError::Shape {
                    field: field.name.clone(),
                    expected: "a primitive value",
                });
            }
            target.insert(field.name.clone(), incoming.clone());
        }
        FieldKind::Array => {
            if !(incoming.is_array() || incoming.is_null()) {
                return Err(MergeError::Shape {
                    field: field.name.clone(),
                    expected: "an array",
                });
            }
            target.insert(field.name.clone(), incoming.clone());
        }
        FieldKind::Object(nested) => match incoming {
            Value::Null => {
                target.insert(field.name.clone(), Value::Null);
            }
            Value::Object(_) => {
                let slot = target
                    .entry(field.name.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                nested.merge(slot, incoming)?;
            }
            _ => {
                return Err(MergeError::Shape {
                    field: field.name.clone(),
                    expected: "an object",
                });
            }
        },
    }
    Ok(())
}
