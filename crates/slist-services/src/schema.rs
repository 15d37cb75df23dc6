//! Schema validation capability.
//!
//! The service never inspects payload shape itself. It asks a
//! [`SchemaValidator`] handed to it at construction. [`ObjectSchema`] is the
//! built-in implementation used by the server binary.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::validation::ValidationReport;

/// Default upper bound for item titles, in characters.
pub const DEFAULT_MAX_TITLE_LENGTH: usize = 50;

/// Checks a raw JSON payload and reports every offending field.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, input: &Value) -> ValidationReport;
}

impl<F> SchemaValidator for F
where
    F: Fn(&Value) -> ValidationReport + Send + Sync,
{
    fn validate(&self, input: &Value) -> ValidationReport {
        self(input)
    }
}

/// Expected type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// String with a length range counted in characters.
    Text { min_len: usize, max_len: usize },
    Boolean,
}

/// One field of an object schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldRule {
    pub fn text(name: impl Into<String>, min_len: usize, max_len: usize) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text { min_len, max_len },
            required: false,
        }
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Boolean,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn check(&self, value: &Value, report: &mut ValidationReport) {
        let name = &self.name;
        match (&self.kind, value) {
            (FieldKind::Text { min_len, max_len }, Value::String(s)) => {
                let len = s.chars().count();
                if len == 0 && *min_len > 0 {
                    report.add(name, format!("\"{name}\" is not allowed to be empty"));
                } else if len < *min_len {
                    report.add(
                        name,
                        format!("\"{name}\" length must be at least {min_len} characters long"),
                    );
                } else if len > *max_len {
                    report.add(
                        name,
                        format!(
                            "\"{name}\" length must be less than or equal to {max_len} characters long"
                        ),
                    );
                }
            }
            (FieldKind::Text { .. }, _) => {
                report.add(name, format!("\"{name}\" must be a string"));
            }
            (FieldKind::Boolean, Value::Bool(_)) => {}
            (FieldKind::Boolean, _) => {
                report.add(name, format!("\"{name}\" must be a boolean"));
            }
        }
    }
}

/// Closed object schema: listed fields only, unknown keys are rejected.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    fields: Vec<FieldRule>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, rule: FieldRule) -> Self {
        self.fields.push(rule);
        self
    }

    /// Schema for a new item: `title` required, `completed` optional.
    pub fn new_item(max_title_length: usize) -> Self {
        Self::new()
            .field(FieldRule::text("title", 1, max_title_length).required())
            .field(FieldRule::boolean("completed"))
    }

    /// Schema for an item update: every field optional, `title` non-empty.
    pub fn item_update(max_title_length: usize) -> Self {
        Self::new()
            .field(FieldRule::text("title", 1, max_title_length))
            .field(FieldRule::boolean("completed"))
    }

    fn check_object(&self, object: &Map<String, Value>, report: &mut ValidationReport) {
        for rule in &self.fields {
            match object.get(&rule.name) {
                Some(value) => rule.check(value, report),
                None if rule.required => {
                    report.add(&rule.name, format!("\"{}\" is required", rule.name));
                }
                None => {}
            }
        }

        for key in object.keys() {
            if !self.fields.iter().any(|rule| &rule.name == key) {
                report.add(key, format!("\"{key}\" is not allowed"));
            }
        }
    }
}

impl SchemaValidator for ObjectSchema {
    fn validate(&self, input: &Value) -> ValidationReport {
        let mut report = ValidationReport::new();
        match input {
            Value::Object(object) => self.check_object(object, &mut report),
            _ => report.add("value", "\"value\" must be of type object"),
        }
        report
    }
}

/// The pair of validators a collection service is built with.
#[derive(Clone)]
pub struct Schemas {
    pub new_item: Arc<dyn SchemaValidator>,
    pub item_update: Arc<dyn SchemaValidator>,
}

impl Schemas {
    pub fn new(
        new_item: impl SchemaValidator + 'static,
        item_update: impl SchemaValidator + 'static,
    ) -> Self {
        Self {
            new_item: Arc::new(new_item),
            item_update: Arc::new(item_update),
        }
    }

    /// Built-in item schemas with the given title bound.
    pub fn items(max_title_length: usize) -> Self {
        Self::new(
            ObjectSchema::new_item(max_title_length),
            ObjectSchema::item_update(max_title_length),
        )
    }
}

impl Default for Schemas {
    fn default() -> Self {
        Self::items(DEFAULT_MAX_TITLE_LENGTH)
    }
}

impl std::fmt::Debug for Schemas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schemas").finish_non_exhaustive()
    }
}
