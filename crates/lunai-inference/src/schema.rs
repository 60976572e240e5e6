//! Declared output schemas for structured extraction.
//!
//! A schema is an ordered list of named fields. It renders to the oracle's
//! response-schema JSON and validates a decoded reply before it is
//! deserialized into a typed response.

use serde_json::{json, Map, Value};

use lunai_core::{Error, Result};

/// Type of a single output field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    StringArray,
    /// String restricted to the listed values.
    Enum(&'static [&'static str]),
}

impl FieldType {
    fn to_json(self) -> Value {
        match self {
            FieldType::String => json!({ "type": "STRING" }),
            FieldType::Number => json!({ "type": "NUMBER" }),
            FieldType::StringArray => json!({ "type": "ARRAY", "items": { "type": "STRING" } }),
            FieldType::Enum(values) => json!({ "type": "STRING", "enum": values }),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            FieldType::String | FieldType::Enum(_) => "a string",
            FieldType::Number => "a number",
            FieldType::StringArray => "an array of strings",
        }
    }
}

/// One named field of an output schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub description: &'static str,
    /// Optional fields may be absent or null; absence is kept distinct from zero.
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(
        name: &'static str,
        field_type: FieldType,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            field_type,
            description,
            required: true,
        }
    }

    pub const fn optional(
        name: &'static str,
        field_type: FieldType,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            field_type,
            description,
            required: false,
        }
    }
}

/// Ordered set of output fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSchema {
    pub fields: &'static [FieldSpec],
}

impl OutputSchema {
    pub const fn new(fields: &'static [FieldSpec]) -> Self {
        Self { fields }
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Render as the oracle's `responseSchema` object.
    pub fn to_json(&self) -> Value {
        let mut properties = Map::new();
        for field in self.fields {
            let mut prop = field.field_type.to_json();
            if let Value::Object(ref mut obj) = prop {
                obj.insert("description".to_string(), json!(field.description));
            }
            properties.insert(field.name.to_string(), prop);
        }

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();
        let ordering: Vec<&str> = self.fields.iter().map(|f| f.name).collect();

        json!({
            "type": "OBJECT",
            "properties": properties,
            "required": required,
            "propertyOrdering": ordering,
        })
    }

    /// Check a decoded reply against the declared fields.
    ///
    /// Unknown extra fields are ignored. `raw` is attached to any violation.
    pub fn validate(&self, value: &Value, raw: &str) -> Result<()> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::schema("Reply is not a JSON object", raw))?;

        for field in self.fields {
            let v = match obj.get(field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(Error::schema(
                        format!("Missing required field `{}`", field.name),
                        raw,
                    ));
                }
                None | Some(Value::Null) => continue,
                Some(v) => v,
            };

            let type_ok = match field.field_type {
                FieldType::String | FieldType::Enum(_) => v.is_string(),
                FieldType::Number => v.is_number(),
                FieldType::StringArray => v
                    .as_array()
                    .map(|items| items.iter().all(Value::is_string))
                    .unwrap_or(false),
            };
            if !type_ok {
                return Err(Error::schema(
                    format!(
                        "Field `{}` must be {}",
                        field.name,
                        field.field_type.describe()
                    ),
                    raw,
                ));
            }

            if let (FieldType::Enum(allowed), Some(s)) = (field.field_type, v.as_str()) {
                if !allowed.contains(&s) {
                    return Err(Error::schema(
                        format!(
                            "Field `{}` has value {:?}, expected one of {:?}",
                            field.name, s, allowed
                        ),
                        raw,
                    ));
                }
            }
        }
        Ok(())
    }
}
