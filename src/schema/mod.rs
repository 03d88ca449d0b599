//! Output contracts for stage responses
//!
//! A [`SchemaSpec`] lists the fields a stage's JSON object must carry. It is
//! used twice: rendered as an example object for the model, and enforced by
//! [`validate`] on whatever comes back.

pub mod labels;
pub mod validator;

#[cfg(test)]
mod validator_tests;

use serde_json::{json, Map, Value};

pub use labels::{SentimentLevel, SignalStrength, Verdict};
pub use validator::{validate, ValidationResult, Violation, ViolationKind};

#[derive(Clone, Debug, PartialEq)]
pub enum FieldType {
    /// A string, optionally restricted to an exact set of values
    Text { allowed: Option<Vec<String>> },
    /// A number with optional inclusive bounds
    Number { min: Option<f64>, max: Option<f64> },
    Boolean,
    Array(Box<FieldType>),
    Object(SchemaSpec),
}

impl FieldType {
    pub fn text() -> Self {
        FieldType::Text { allowed: None }
    }

    pub fn one_of(labels: &[&str]) -> Self {
        FieldType::Text {
            allowed: Some(labels.iter().map(|l| l.to_string()).collect()),
        }
    }

    pub fn number() -> Self {
        FieldType::Number { min: None, max: None }
    }

    pub fn ranged(min: f64, max: f64) -> Self {
        FieldType::Number {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn list_of(item: FieldType) -> Self {
        FieldType::Array(Box::new(item))
    }

    pub fn object(schema: SchemaSpec) -> Self {
        FieldType::Object(schema)
    }

    /// JSON type name used in violation messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Text { .. } => "string",
            FieldType::Number { .. } => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array(_) => "array",
            FieldType::Object(_) => "object",
        }
    }

    fn example(&self) -> Value {
        match self {
            FieldType::Text { allowed: None } => json!("string"),
            FieldType::Text {
                allowed: Some(allowed),
            } => {
                let options = allowed
                    .iter()
                    .map(|a| format!("'{}'", a))
                    .collect::<Vec<_>>()
                    .join(", ");
                json!(format!("string, must be one of [{}]", options))
            }
            FieldType::Number { min, max } => match (min, max) {
                (Some(lo), Some(hi)) => json!(format!("number between {} and {}", lo, hi)),
                (Some(lo), None) => json!(format!("number >= {}", lo)),
                (None, Some(hi)) => json!(format!("number <= {}", hi)),
                (None, None) => json!("number"),
            },
            FieldType::Boolean => json!("boolean"),
            FieldType::Array(item) => json!([item.example()]),
            FieldType::Object(schema) => schema.example(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub ty: FieldType,
    pub required: bool,
}

/// Ordered field list of one JSON object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SchemaSpec {
    fields: Vec<FieldSpec>,
}

impl SchemaSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &str, ty: FieldType) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            ty,
            required: true,
        });
        self
    }

    pub fn optional(mut self, name: &str, ty: FieldType) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            ty,
            required: false,
        });
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Example object describing every field, shown to the model.
    pub fn example(&self) -> Value {
        let mut map = Map::new();
        for field in &self.fields {
            map.insert(field.name.clone(), field.ty.example());
        }
        Value::Object(map)
    }

    pub fn example_text(&self) -> String {
        serde_json::to_string_pretty(&self.example()).unwrap_or_else(|_| "{}".to_string())
    }
}
