//! Message interpolation
//!
//! Issue messages may reference record values by placeholder:
//! `{field}`, `{field:value}`, `{field:raw}`, `{field:label}` and
//! `{original.field}`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

use tenet_core::{title_case, EntityModel, Record, ValidationResult, Value};

static PLACEHOLDER: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"\{(original\.)?(\w+)(?::(value|raw|label))?\}"));

/// Renders placeholders with labels and picklist option names.
#[derive(Debug, Clone, Default)]
pub struct MessageInterpolator {
    labels: HashMap<String, String>,
    options: HashMap<String, Vec<(Value, String)>>,
}

impl MessageInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpolator using an entity's display names and picklist options.
    pub fn for_entity(entity: &EntityModel) -> Self {
        let labels = entity
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.label()))
            .collect();
        let options = entity
            .fields
            .iter()
            .filter(|f| !f.options.is_empty())
            .map(|f| {
                let pairs = f
                    .options
                    .iter()
                    .map(|o| (o.value.clone(), o.label.clone()))
                    .collect();
                (f.name.clone(), pairs)
            })
            .collect();
        Self { labels, options }
    }

    pub fn with_label(mut self, field: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(field.into(), label.into());
        self
    }

    /// Replace every placeholder in `template`.
    pub fn interpolate(&self, template: &str, record: &Record, original: Option<&Record>) -> String {
        let Ok(pattern) = PLACEHOLDER.as_ref() else {
            return template.to_string();
        };

        pattern
            .replace_all(template, |caps: &Captures<'_>| {
                let source = if caps.get(1).is_some() { original } else { Some(record) };
                let Some(source) = source else {
                    return String::new();
                };
                let field = &caps[2];
                let value = source.get(field).unwrap_or(&Value::Null);

                match caps.get(3).map(|m| m.as_str()) {
                    Some("label") => self.label(field),
                    Some("raw") if value.is_null() => String::new(),
                    Some("raw") => value.to_display_string(),
                    _ => self.format_value(field, value),
                }
            })
            .into_owned()
    }

    /// Interpolate every message of a validation result.
    pub fn apply(&self, result: ValidationResult, record: &Record, original: Option<&Record>) -> ValidationResult {
        result.map_messages(|message| self.interpolate(message, record, original))
    }

    fn label(&self, field: &str) -> String {
        self.labels
            .get(field)
            .cloned()
            .unwrap_or_else(|| title_case(field))
    }

    fn format_value(&self, field: &str, value: &Value) -> String {
        if value.is_null() {
            return String::new();
        }

        if let Some(options) = self.options.get(field) {
            if let Some((_, label)) = options.iter().find(|(v, _)| v.semantic_eq(value)) {
                return label.clone();
            }
        }

        match value {
            Value::Bool(true) => "Yes".to_string(),
            Value::Bool(false) => "No".to_string(),
            Value::Date(d) => d.format("%B %d, %Y").to_string(),
            Value::Timestamp(ts) => ts.format("%B %d, %Y %I:%M %p").to_string(),
            Value::Float(f) => format_grouped(*f),
            Value::Array(items) => items
                .iter()
                .map(Value::to_display_string)
                .collect::<Vec<_>>()
                .join(", "),
            other => other.to_display_string(),
        }
    }
}

/// Two decimals with comma thousands separators.
fn format_grouped(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    format!("{}{}.{}", sign, grouped, fraction)
}
