//! Entity and field metadata read by the engine

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    DefaultDefinition, EntityScope, HookDefinition, HookPoint, ValidatorDefinition, Value,
};

/// Declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    Text,
    Name,
    Description,
    String,
    Email,
    Phone,
    Url,
    Uuid,
    Number,
    Currency,
    Percent,
    Boolean,
    Date,
    Datetime,
    Picklist,
    MultiPicklist,
    Relation,
    Json,
    #[serde(other)]
    Other,
}

impl FieldType {
    /// Types checked against a fixed format pattern.
    pub fn has_format(&self) -> bool {
        matches!(
            self,
            FieldType::Email
                | FieldType::Phone
                | FieldType::Url
                | FieldType::Uuid
                | FieldType::Date
                | FieldType::Datetime
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Number | FieldType::Currency | FieldType::Percent)
    }

    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            FieldType::Text | FieldType::Name | FieldType::Description | FieldType::String
        )
    }

    pub fn is_picklist(&self) -> bool {
        matches!(self, FieldType::Picklist | FieldType::MultiPicklist)
    }

    /// Upper-case tag used in `INVALID_<TYPE>` codes.
    pub fn code_tag(&self) -> &'static str {
        match self {
            FieldType::Text => "TEXT",
            FieldType::Name => "NAME",
            FieldType::Description => "DESCRIPTION",
            FieldType::String => "STRING",
            FieldType::Email => "EMAIL",
            FieldType::Phone => "PHONE",
            FieldType::Url => "URL",
            FieldType::Uuid => "UUID",
            FieldType::Number => "NUMBER",
            FieldType::Currency => "CURRENCY",
            FieldType::Percent => "PERCENT",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Date => "DATE",
            FieldType::Datetime => "DATETIME",
            FieldType::Picklist => "PICKLIST",
            FieldType::MultiPicklist => "MULTI_PICKLIST",
            FieldType::Relation => "RELATION",
            FieldType::Json => "JSON",
            FieldType::Other => "VALUE",
        }
    }
}

/// Source of an automatically populated field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AutoSource {
    #[serde(rename = "now")]
    Now,
    #[serde(rename = "context.userId")]
    UserId,
    #[serde(rename = "context.tenantId")]
    TenantId,
}

/// Constraint rules declared on a field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRules {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub pattern: Option<String>,
}

impl ValidationRules {
    pub fn is_constrained(&self) -> bool {
        self.required
            || self.min.is_some()
            || self.max.is_some()
            || self.min_length.is_some()
            || self.max_length.is_some()
            || self.pattern.is_some()
    }
}

/// Target of a relation field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationConfig {
    pub entity: String,
    #[serde(default)]
    pub display_field: Option<String>,
    #[serde(default)]
    pub on_delete: Option<String>,
}

/// One selectable picklist value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PicklistOption {
    pub value: Value,
    pub label: String,
}

/// Field descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub auto: Option<AutoSource>,
    #[serde(default)]
    pub options: Vec<PicklistOption>,
    #[serde(default)]
    pub validation: ValidationRules,
    #[serde(default)]
    pub relation: Option<RelationConfig>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            display_name: None,
            primary_key: false,
            read_only: false,
            default: None,
            auto: None,
            options: Vec::new(),
            validation: ValidationRules::default(),
            relation: None,
        }
    }

    pub fn with_display_name(mut self, label: impl Into<String>) -> Self {
        self.display_name = Some(label.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.validation.required = true;
        self
    }

    pub fn with_rules(mut self, rules: ValidationRules) -> Self {
        self.validation = rules;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_auto(mut self, source: AutoSource) -> Self {
        self.auto = Some(source);
        self
    }

    pub fn with_options<I, V>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = (V, &'static str)>,
        V: Into<Value>,
    {
        self.options = options
            .into_iter()
            .map(|(value, label)| PicklistOption {
                value: value.into(),
                label: label.to_string(),
            })
            .collect();
        self
    }

    pub fn with_relation(mut self, entity: impl Into<String>) -> Self {
        self.relation = Some(RelationConfig {
            entity: entity.into(),
            display_field: None,
            on_delete: None,
        });
        self
    }

    /// Display label, falling back to a title-cased field name.
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| title_case(&self.name))
    }
}

/// Entity descriptor: fields plus declared rules.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityModel {
    pub name: String,
    #[serde(default)]
    pub scope: EntityScope,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub validators: Vec<ValidatorDefinition>,
    #[serde(default)]
    pub defaults: Vec<DefaultDefinition>,
    #[serde(default)]
    pub hooks: BTreeMap<HookPoint, Vec<HookDefinition>>,
}

impl EntityModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_validator(mut self, validator: ValidatorDefinition) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_default(mut self, default: DefaultDefinition) -> Self {
        self.defaults.push(default);
        self
    }

    pub fn with_hook(mut self, point: HookPoint, hook: HookDefinition) -> Self {
        self.hooks.entry(point).or_default().push(hook);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Hooks declared at a lifecycle point, in declaration order.
    pub fn hooks_at(&self, point: HookPoint) -> &[HookDefinition] {
        self.hooks.get(&point).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Convert a camelCase or snake_case name to Title Case.
pub fn title_case(name: &str) -> String {
    let mut spaced = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            spaced.push(' ');
        }
        spaced.push(if c == '_' { ' ' } else { c });
    }

    spaced
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
