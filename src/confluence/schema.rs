//! Schema validation for untyped Confluence API responses.
//!
//! `serde` stops at the first mismatch, which makes for poor diagnostics when
//! an API proxy or an unexpected Confluence version changes a payload. Each
//! model derives its JSON schema with `schemars`; [`validate`] checks the raw
//! JSON against it with `jsonschema`, collects every violation, and only
//! deserializes once the whole document is known to be well-formed.

use jsonschema::Validator;
use jsonschema::error::ValidationErrorKind;
use schemars::JsonSchema;
use schemars::generate::SchemaSettings;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ValidationError, Violation};

/// A response model that can be checked against its derived JSON schema.
pub trait Schema: JsonSchema + DeserializeOwned {}

impl<T: JsonSchema + DeserializeOwned> Schema for T {}

/// Draft-07 schema of `T` with every subschema inlined, so keyword locations
/// reported by the validator resolve as pointers into the schema itself.
pub fn schema_of<T: JsonSchema>() -> Result<Value, serde_json::Error> {
  let mut generator = SchemaSettings::draft07()
    .with(|settings| settings.inline_subschemas = true)
    .into_generator();
  let schema = generator.root_schema_for::<T>();
  serde_json::to_value(&schema)
}

/// Validate `raw` against `T`'s schema and deserialize it.
///
/// # Arguments
/// * `raw` - Untyped response body.
/// * `context` - Message describing the request, used as the first line of
///   the error.
///
/// # Errors
/// Returns a [`ValidationError`] listing every violation, ordered by path,
/// when the value does not match. No partially parsed value is ever returned.
pub fn validate<T: Schema>(raw: Value, context: &str) -> Result<T, ValidationError> {
  let failure = |message: String| ValidationError {
    context: context.to_string(),
    violations: vec![Violation {
      path: String::new(),
      message,
    }],
  };

  let schema = schema_of::<T>().map_err(|err| failure(format!("Unusable schema: {err}")))?;
  let validator = Validator::new(&schema).map_err(|err| failure(format!("Unusable schema: {err}")))?;

  let violations = check(&validator, &schema, &raw);
  if !violations.is_empty() {
    return Err(ValidationError {
      context: context.to_string(),
      violations,
    });
  }

  // The schema covers structure; serde can still reject values such as
  // numbers that do not fit the target integer type.
  serde_json::from_value(raw).map_err(|err| failure(err.to_string()))
}

/// Collect every violation of `schema` in `value`, ordered by path.
fn check(validator: &Validator, schema: &Value, value: &Value) -> Vec<Violation> {
  let mut found: Vec<(Vec<String>, String)> = validator
    .iter_errors(value)
    .map(|error| describe(&error, schema, value))
    .collect();

  found.sort_by_cached_key(|(segments, _)| path_order(segments));

  found
    .into_iter()
    .map(|(segments, message)| Violation {
      path: segments.join("."),
      message,
    })
    .collect()
}

fn describe(error: &jsonschema::ValidationError<'_>, schema: &Value, value: &Value) -> (Vec<String>, String) {
  let pointer = error.instance_path.to_string();
  let mut segments = pointer_segments(&pointer);

  let message = match &error.kind {
    ValidationErrorKind::Required { property } => {
      segments.push(property.as_str().map_or_else(|| property.to_string(), str::to_string));
      "Required".to_string()
    }
    ValidationErrorKind::Type { .. } => {
      let expected = schema
        .pointer(&error.schema_path.to_string())
        .and_then(expected_types);
      match (expected, value.pointer(&pointer)) {
        (Some(expected), Some(received)) => format!("Expected {expected}, received {}", kind_of(received)),
        _ => error.to_string(),
      }
    }
    _ => error.to_string(),
  };

  (segments, message)
}

/// Split a JSON pointer into unescaped segments; the root pointer has none.
fn pointer_segments(pointer: &str) -> Vec<String> {
  pointer
    .split('/')
    .skip(1)
    .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
    .collect()
}

/// Array indices sort numerically, before names.
fn path_order(segments: &[String]) -> Vec<(u8, usize, String)> {
  segments
    .iter()
    .map(|segment| match segment.parse::<usize>() {
      Ok(index) => (0, index, String::new()),
      Err(_) => (1, 0, segment.clone()),
    })
    .collect()
}

/// The non-null type names of a `type` keyword, e.g. `string` for
/// `["string", "null"]`.
fn expected_types(keyword: &Value) -> Option<String> {
  let names: Vec<&str> = match keyword {
    Value::String(name) => vec![name.as_str()],
    Value::Array(names) => names.iter().filter_map(Value::as_str).collect(),
    _ => return None,
  };
  let names: Vec<&str> = names.into_iter().filter(|name| *name != "null").collect();
  (!names.is_empty()).then(|| names.join(" or "))
}

fn kind_of(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
