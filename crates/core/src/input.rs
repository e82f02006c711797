//! Untrusted raw input (form submissions, import rows).
//!
//! Named constructors read fields through a [`FieldReader`], which records a
//! [`FieldError`](crate::FieldError) for every problem instead of stopping at
//! the first one.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Raw, untyped key/value input.
pub type RawInput = Map<String, Value>;

/// Turn an arbitrary JSON value into [`RawInput`]; anything but an object is
/// rejected under the field name `"input"`.
pub fn raw_input(value: Value) -> Result<RawInput, ValidationError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ValidationError::single(
            "input",
            format!("expected an object, got {}", json_kind(&other)),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Reads typed fields out of [`RawInput`], accumulating failures.
#[derive(Debug)]
pub struct FieldReader<'a> {
    input: &'a RawInput,
    errors: ValidationError,
}

impl<'a> FieldReader<'a> {
    pub fn new(input: &'a RawInput) -> Self {
        Self {
            input,
            errors: ValidationError::new(),
        }
    }

    /// A string field that must be present. Returned untrimmed.
    pub fn required_str(&mut self, field: &str) -> Option<String> {
        match self.input.get(field) {
            None | Some(Value::Null) => {
                self.reject(field, "is required");
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                self.reject(field, format!("must be a string, got {}", json_kind(other)));
                None
            }
        }
    }

    /// A string field that may be absent; blank strings count as absent.
    pub fn optional_str(&mut self, field: &str) -> Option<String> {
        match self.input.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                self.reject(field, format!("must be a string, got {}", json_kind(other)));
                None
            }
        }
    }

    /// An optional array of strings. Absent means empty.
    pub fn string_list(&mut self, field: &str) -> Vec<String> {
        match self.input.get(field) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    match item {
                        Value::String(s) => out.push(s.clone()),
                        other => self.reject(
                            field,
                            format!("element {idx} must be a string, got {}", json_kind(other)),
                        ),
                    }
                }
                out
            }
            Some(other) => {
                self.reject(field, format!("must be an array, got {}", json_kind(other)));
                Vec::new()
            }
        }
    }

    /// A structured field that must be present, deserialized into `T`.
    pub fn required_as<T: DeserializeOwned>(&mut self, field: &str) -> Option<T> {
        match self.input.get(field) {
            None | Some(Value::Null) => {
                self.reject(field, "is required");
                None
            }
            Some(value) => {
                let parsed = serde_json::from_value::<T>(value.clone());
                self.check(field, parsed)
            }
        }
    }

    /// A structured field deserialized into `T`. Absent means `None`
    /// without a failure; a shape mismatch is recorded.
    pub fn optional_as<T: DeserializeOwned>(&mut self, field: &str) -> Option<T> {
        match self.input.get(field) {
            None | Some(Value::Null) => None,
            Some(value) => {
                let parsed = serde_json::from_value::<T>(value.clone());
                self.check(field, parsed)
            }
        }
    }

    /// Record a failure for `field`.
    pub fn reject(&mut self, field: &str, reason: impl Into<String>) {
        self.errors.push(field, reason);
    }

    /// Run a fallible conversion, recording its error under `field`.
    pub fn check<T, E: core::fmt::Display>(
        &mut self,
        field: &str,
        result: Result<T, E>,
    ) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.reject(field, e.to_string());
                None
            }
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        self.errors.into_result()
    }
}
