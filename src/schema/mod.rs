//! Declarative config schemas.
//!
//! Every plugin publishes a [`ConfigSchema`]. Validation walks every declared
//! field and reports each offending one, so a user sees all problems with a
//! node at once instead of the first serde error.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSchema {
    pub fields: Vec<FieldSpec>,
    /// Reject keys not declared in `fields`.
    pub deny_unknown: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldKind {
    String {
        #[serde(skip_serializing_if = "Option::is_none")]
        min_len: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_len: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    Integer {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    Boolean,
    Enum {
        values: Vec<String>,
    },
    StringList {
        #[serde(skip_serializing_if = "Option::is_none")]
        allowed: Option<Vec<String>>,
        min_items: usize,
    },
}

/// One offending field. `path` is dotted and rooted at `config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub path: String,
    pub message: String,
}

impl ConfigSchema {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            deny_unknown: true,
        }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Checks `raw` against the schema.
    ///
    /// On success returns the normalized object with defaults filled in for
    /// absent optional fields. A `null` config is treated as `{}`.
    pub fn validate(&self, raw: &Value) -> Result<Map<String, Value>, Vec<FieldIssue>> {
        let empty = Map::new();
        let obj = match raw {
            Value::Object(obj) => obj,
            Value::Null => &empty,
            other => {
                return Err(vec![FieldIssue {
                    path: "config".to_string(),
                    message: format!("expected an object, found {}", type_name(other)),
                }]);
            }
        };

        let mut issues = Vec::new();
        let mut normalized = Map::new();

        for spec in &self.fields {
            let path = format!("config.{}", spec.name);
            match obj.get(&spec.name) {
                None | Some(Value::Null) => {
                    if let Some(default) = &spec.default {
                        normalized.insert(spec.name.clone(), default.clone());
                    } else if spec.required {
                        issues.push(FieldIssue {
                            path,
                            message: "required field is missing".to_string(),
                        });
                    }
                }
                Some(value) => match spec.kind.check(value) {
                    Ok(()) => {
                        normalized.insert(spec.name.clone(), value.clone());
                    }
                    Err(message) => issues.push(FieldIssue { path, message }),
                },
            }
        }

        if self.deny_unknown {
            for key in obj.keys() {
                if !self.fields.iter().any(|f| &f.name == key) {
                    issues.push(FieldIssue {
                        path: format!("config.{}", key),
                        message: "unknown field".to_string(),
                    });
                }
            }
        }

        if issues.is_empty() {
            Ok(normalized)
        } else {
            Err(issues)
        }
    }
}

impl Default for ConfigSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldSpec {
    pub fn required(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            default: None,
            description: None,
        }
    }

    pub fn optional(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            default: None,
            description: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

impl FieldKind {
    pub fn string() -> Self {
        FieldKind::String {
            min_len: Some(1),
            max_len: None,
            pattern: None,
        }
    }

    pub fn pattern(pattern: &str) -> Self {
        FieldKind::String {
            min_len: Some(1),
            max_len: None,
            pattern: Some(pattern.to_string()),
        }
    }

    pub fn integer(min: i64, max: i64) -> Self {
        FieldKind::Integer {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn one_of(values: &[&str]) -> Self {
        FieldKind::Enum {
            values: values.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn list_of(values: &[&str], min_items: usize) -> Self {
        FieldKind::StringList {
            allowed: Some(values.iter().map(|s| s.to_string()).collect()),
            min_items,
        }
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            FieldKind::String { min_len, max_len, pattern } => {
                let s = value
                    .as_str()
                    .ok_or_else(|| format!("expected a string, found {}", type_name(value)))?;
                let len = s.chars().count();
                if let Some(min) = min_len {
                    if len < *min {
                        return Err(format!("must be at least {} character(s)", min));
                    }
                }
                if let Some(max) = max_len {
                    if len > *max {
                        return Err(format!("must be at most {} character(s)", max));
                    }
                }
                if let Some(pattern) = pattern {
                    let re = Regex::new(pattern).map_err(|e| format!("invalid schema pattern: {}", e))?;
                    if !re.is_match(s) {
                        return Err(format!("must match pattern {}", pattern));
                    }
                }
                Ok(())
            }
            FieldKind::Integer { min, max } => {
                let n = value
                    .as_i64()
                    .ok_or_else(|| format!("expected an integer, found {}", type_name(value)))?;
                if let Some(min) = min {
                    if n < *min {
                        return Err(format!("must be >= {}", min));
                    }
                }
                if let Some(max) = max {
                    if n > *max {
                        return Err(format!("must be <= {}", max));
                    }
                }
                Ok(())
            }
            FieldKind::Boolean => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err(format!("expected a boolean, found {}", type_name(value)))
                }
            }
            FieldKind::Enum { values } => {
                let s = value
                    .as_str()
                    .ok_or_else(|| format!("expected a string, found {}", type_name(value)))?;
                if values.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(format!("must be one of: {}", values.join(", ")))
                }
            }
            FieldKind::StringList { allowed, min_items } => {
                let items = value
                    .as_array()
                    .ok_or_else(|| format!("expected an array, found {}", type_name(value)))?;
                if items.len() < *min_items {
                    return Err(format!("must contain at least {} item(s)", min_items));
                }
                for item in items {
                    let s = item
                        .as_str()
                        .ok_or_else(|| format!("expected string items, found {}", type_name(item)))?;
                    if let Some(allowed) = allowed {
                        if !allowed.iter().any(|a| a == s) {
                            return Err(format!("'{}' is not one of: {}", s, allowed.join(", ")));
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

/// Validates `raw` and deserializes the normalized object into `T`.
pub fn parse_config<T: DeserializeOwned>(schema: &ConfigSchema, raw: &Value) -> Result<T, Vec<FieldIssue>> {
    let normalized = schema.validate(raw)?;
    serde_json::from_value(Value::Object(normalized)).map_err(|e| {
        vec![FieldIssue {
            path: "config".to_string(),
            message: e.to_string(),
        }]
    })
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
