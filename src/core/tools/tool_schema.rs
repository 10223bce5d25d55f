// =============================================================================
// TOOL ARGUMENT SCHEMAS
// =============================================================================
//
// Each tool declares a static `ArgSchema`, rendered once into the JSON
// Schema shown in tool listings. The registry compiles that document with
// `jsonschema`, and the compiled validator is what checks incoming argument
// bags, so listing and validation share one source.
//
// **Validation order:**
// 1. The bag must be a JSON object (`null` counts as `{}`)
// 2. Each declared property present in the bag, against its own subschema
// 3. The whole object: required, unknown fields, `anyOf` groups
//
// A `null` value counts as absent everywhere.

use jsonschema::{Draft, Validator};
use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("arguments must be a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    Missing(String),

    #[error("field `{field}` is invalid: {problem}")]
    Invalid { field: String, problem: String },

    #[error("unknown field `{0}`")]
    Unknown(String),

    #[error("at least one of {} must be provided", .0.join(", "))]
    NoneOf(Vec<String>),

    #[error("arguments rejected: {0}")]
    Rejected(String),
}

/// A schema document that does not compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid schema for `{location}`: {message}")]
pub struct SchemaCompileError {
    pub location: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text { non_empty: bool },
    /// A bare document id or a Google Docs URL.
    DocumentId,
    Integer { min: i64, max: Option<i64> },
    Boolean,
    Choice(&'static [&'static str]),
    /// Absolute http(s) URL.
    Url,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ArgSchema {
    pub fields: &'static [FieldSpec],
    pub at_least_one_of: &'static [&'static str],
}

impl ArgSchema {
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in self.fields {
            properties.insert(field.name.to_string(), field_schema(field));
        }

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();

        let mut schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        });

        if !self.at_least_one_of.is_empty() {
            let alternatives: Vec<Value> = self
                .at_least_one_of
                .iter()
                .map(|name| json!({ "required": [name] }))
                .collect();
            schema["anyOf"] = Value::Array(alternatives);
        }

        schema
    }

    pub fn compile(&self) -> Result<CompiledSchema, SchemaCompileError> {
        CompiledSchema::compile(self.to_json_schema())
    }
}

// Patterns stand in for `format`, which draft 2020-12 treats as an annotation.
const NON_BLANK: &str = r"\S";
const HTTP_URL: &str = r"^[Hh][Tt][Tt][Pp][Ss]?://\S";

fn field_schema(field: &FieldSpec) -> Value {
    let mut schema = match field.kind {
        FieldKind::Text { non_empty } => {
            let mut s = json!({ "type": "string" });
            if non_empty {
                s["minLength"] = json!(1);
                s["pattern"] = json!(NON_BLANK);
            }
            s
        }
        FieldKind::DocumentId => json!({ "type": "string", "minLength": 1 }),
        FieldKind::Integer { min, max } => {
            let mut s = json!({ "type": "integer", "minimum": min });
            if let Some(max) = max {
                s["maximum"] = json!(max);
            }
            s
        }
        FieldKind::Boolean => json!({ "type": "boolean" }),
        FieldKind::Choice(options) => json!({ "type": "string", "enum": options }),
        FieldKind::Url => json!({ "type": "string", "format": "uri", "pattern": HTTP_URL }),
    };
    schema["description"] = json!(field.description);
    schema
}

fn build_validator(schema: &Value, location: &str) -> Result<Validator, SchemaCompileError> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| SchemaCompileError {
            location: location.to_string(),
            message: err.to_string(),
        })
}

// ============================================================================
// SECTION: Compiled Schema
// ============================================================================

/// A tool's input schema, compiled once at registration.
///
/// Besides the validator for the whole object, every declared property
/// gets its own validator so a type or range failure can name the field.
pub struct CompiledSchema {
    document: Value,
    validator: Validator,
    properties: Vec<(String, Validator)>,
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("document", &self.document)
            .finish_non_exhaustive()
    }
}

impl CompiledSchema {
    pub fn compile(document: Value) -> Result<Self, SchemaCompileError> {
        let validator = build_validator(&document, "#")?;

        let mut properties = Vec::new();
        if let Some(declared) = document.get("properties").and_then(Value::as_object) {
            for (name, subschema) in declared {
                let property = build_validator(subschema, &format!("#/properties/{}", name))?;
                properties.push((name.clone(), property));
            }
        }

        Ok(Self {
            document,
            validator,
            properties,
        })
    }

    /// The JSON Schema document this was compiled from.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Validates `args` and returns the object with `null` entries removed.
    pub fn validate(&self, args: &Value) -> Result<Map<String, Value>, SchemaViolation> {
        let present: Map<String, Value> = match args {
            Value::Object(map) => map
                .iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            Value::Null => Map::new(),
            _ => return Err(SchemaViolation::NotAnObject),
        };

        for (name, validator) in &self.properties {
            let Some(value) = present.get(name) else {
                continue;
            };
            if let Some(error) = validator.iter_errors(value).next() {
                return Err(SchemaViolation::Invalid {
                    field: name.clone(),
                    problem: error.to_string(),
                });
            }
        }

        let instance = Value::Object(present);
        let first_error = self.validator.iter_errors(&instance).next().map(|e| e.to_string());
        if let Some(message) = first_error {
            return Err(self.name_violation(&instance, message));
        }

        match instance {
            Value::Object(present) => Ok(present),
            _ => Err(SchemaViolation::NotAnObject),
        }
    }

    /// Every property passed on its own, so an object-level failure is a
    /// missing field, an undeclared one, or an unmet `anyOf` group.
    fn name_violation(&self, instance: &Value, message: String) -> SchemaViolation {
        let has = |name: &str| instance.get(name).is_some();

        let required = string_list(self.document.get("required"));
        if let Some(missing) = required.into_iter().find(|name| !has(name)) {
            return SchemaViolation::Missing(missing);
        }

        let declared = self.document.get("properties").and_then(Value::as_object);
        if let (Some(declared), Some(object)) = (declared, instance.as_object()) {
            // Smallest name, so the report doesn't depend on map ordering.
            if let Some(unknown) = object.keys().filter(|key| !declared.contains_key(*key)).min() {
                return SchemaViolation::Unknown(unknown.clone());
            }
        }

        let alternatives: Vec<String> = self
            .document
            .get("anyOf")
            .and_then(Value::as_array)
            .map(|groups| groups.iter().flat_map(|g| string_list(g.get("required"))).collect())
            .unwrap_or_default();
        if !alternatives.is_empty() {
            return SchemaViolation::NoneOf(alternatives);
        }

        SchemaViolation::Rejected(message)
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
