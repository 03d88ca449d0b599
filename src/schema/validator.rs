use serde_json::{Map, Number, Value};
use std::fmt;

use super::{FieldType, SchemaSpec};

#[derive(Clone, Debug, PartialEq)]
pub enum ViolationKind {
    Missing,
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    NotInSet {
        value: String,
        allowed: Vec<String>,
    },
    OutOfRange {
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },
    /// The response text held no JSON object at all
    Unparseable,
}

/// One broken rule, located by a dotted path such as `market_sentiment.level`.
#[derive(Clone, Debug, PartialEq)]
pub struct Violation {
    pub path: String,
    pub kind: ViolationKind,
}

impl Violation {
    pub fn new(path: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn unparseable() -> Self {
        Self::new("$", ViolationKind::Unparseable)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::Missing => write!(f, "{}: required field missing", self.path),
            ViolationKind::WrongType { expected, found } => {
                write!(f, "{}: expected {}, found {}", self.path, expected, found)
            }
            ViolationKind::NotInSet { value, allowed } => write!(
                f,
                "{}: '{}' is not one of [{}]",
                self.path,
                value,
                allowed.join(", ")
            ),
            ViolationKind::OutOfRange { value, min, max } => write!(
                f,
                "{}: {} outside [{}, {}]",
                self.path,
                value,
                min.map(|v| v.to_string()).unwrap_or_else(|| "-inf".to_string()),
                max.map(|v| v.to_string()).unwrap_or_else(|| "inf".to_string()),
            ),
            ViolationKind::Unparseable => write!(f, "{}: response is not a JSON object", self.path),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ValidationResult {
    /// The checked object, with numeric strings coerced to numbers
    Valid(Value),
    Invalid(Vec<Violation>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            ValidationResult::Valid(_) => &[],
            ValidationResult::Invalid(v) => v,
        }
    }
}

/// Check `output` against `schema`. Malformed input is an `Invalid` result,
/// never a panic.
pub fn validate(output: &Value, schema: &SchemaSpec) -> ValidationResult {
    let Value::Object(map) = output else {
        return ValidationResult::Invalid(vec![Violation::new(
            "$",
            ViolationKind::WrongType {
                expected: "object",
                found: json_type(output),
            },
        )]);
    };

    let mut violations = Vec::new();
    let coerced = check_object(map, schema, "", &mut violations);

    if violations.is_empty() {
        ValidationResult::Valid(Value::Object(coerced))
    } else {
        ValidationResult::Invalid(violations)
    }
}

fn check_object(
    map: &Map<String, Value>,
    schema: &SchemaSpec,
    prefix: &str,
    violations: &mut Vec<Violation>,
) -> Map<String, Value> {
    let mut out = map.clone();

    for field in schema.fields() {
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{}.{}", prefix, field.name)
        };

        match map.get(&field.name) {
            None | Some(Value::Null) => {
                if field.required {
                    violations.push(Violation::new(path, ViolationKind::Missing));
                }
            }
            Some(value) => {
                let checked = check_value(value, &field.ty, &path, violations);
                out.insert(field.name.clone(), checked);
            }
        }
    }

    out
}

fn check_value(value: &Value, ty: &FieldType, path: &str, violations: &mut Vec<Violation>) -> Value {
    match (ty, value) {
        (FieldType::Text { allowed }, Value::String(s)) => {
            if let Some(allowed) = allowed {
                if !allowed.iter().any(|a| a == s) {
                    violations.push(Violation::new(
                        path,
                        ViolationKind::NotInSet {
                            value: s.clone(),
                            allowed: allowed.clone(),
                        },
                    ));
                }
            }
            value.clone()
        }

        (FieldType::Number { min, max }, Value::Number(_) | Value::String(_)) => {
            let Some(n) = as_number(value) else {
                violations.push(Violation::new(
                    path,
                    ViolationKind::WrongType {
                        expected: "number",
                        found: json_type(value),
                    },
                ));
                return value.clone();
            };

            let below = min.is_some_and(|lo| n < lo);
            let above = max.is_some_and(|hi| n > hi);
            if below || above {
                violations.push(Violation::new(
                    path,
                    ViolationKind::OutOfRange {
                        value: n,
                        min: *min,
                        max: *max,
                    },
                ));
            }

            match value {
                Value::String(_) => Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null),
                _ => value.clone(),
            }
        }

        (FieldType::Boolean, Value::Bool(_)) => value.clone(),

        (FieldType::Array(item), Value::Array(items)) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| check_value(v, item, &format!("{}[{}]", path, i), violations))
                .collect(),
        ),

        (FieldType::Object(schema), Value::Object(map)) => {
            Value::Object(check_object(map, schema, path, violations))
        }

        _ => {
            violations.push(Violation::new(
                path,
                ViolationKind::WrongType {
                    expected: ty.type_name(),
                    found: json_type(value),
                },
            ));
            value.clone()
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
