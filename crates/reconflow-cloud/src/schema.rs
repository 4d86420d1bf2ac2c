//! Per-kind field schemas
//!
//! The schema is where each field's type, optionality, default,
//! sensitivity and comparison rule are declared. Reconcilers never
//! validate against it; that is the job of whoever builds the record
//! (see [`Schema::validate`] and [`Schema::apply_defaults`]).

use crate::error::{ReconcileError, Result};
use crate::property::{PropertyRecord, PropertyValue};

/// Placeholder shown instead of sensitive values
pub const SENSITIVE_PLACEHOLDER: &str = "(sensitive)";

/// Declared field type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Bool,
    Int,
    List,
    Map,
}

impl FieldType {
    fn matches(&self, value: &PropertyValue) -> bool {
        matches!(
            (self, value),
            (FieldType::String, PropertyValue::String(_))
                | (FieldType::Bool, PropertyValue::Bool(_))
                | (FieldType::Int, PropertyValue::Int(_))
                | (FieldType::List, PropertyValue::List(_))
                | (FieldType::Map, PropertyValue::Map(_))
        )
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::String => write!(f, "string"),
            FieldType::Bool => write!(f, "bool"),
            FieldType::Int => write!(f, "int"),
            FieldType::List => write!(f, "list"),
            FieldType::Map => write!(f, "map"),
        }
    }
}

/// How two values of a field are compared when planning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Exact,
    /// Strings compared ignoring ASCII case
    CaseInsensitive,
    /// Lists compared as multisets; the backend gives no ordering guarantee
    Unordered,
    /// `;`-separated key/value segments compared as a case-insensitive set,
    /// ignoring `password=` segments which the API never returns
    ConnectionString,
}

impl Comparison {
    pub fn equivalent(&self, a: &PropertyValue, b: &PropertyValue) -> bool {
        match (self, a, b) {
            (Comparison::CaseInsensitive, PropertyValue::String(a), PropertyValue::String(b)) => {
                a.eq_ignore_ascii_case(b)
            }
            (Comparison::Unordered, PropertyValue::List(a), PropertyValue::List(b)) => {
                let mut a = a.clone();
                let mut b = b.clone();
                a.sort();
                b.sort();
                a == b
            }
            (Comparison::ConnectionString, PropertyValue::String(a), PropertyValue::String(b)) => {
                connection_string_segments(a) == connection_string_segments(b)
            }
            _ => a == b,
        }
    }
}

fn connection_string_segments(value: &str) -> Vec<String> {
    let mut segments: Vec<String> = value
        .split(';')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty() && !s.starts_with("password"))
        .collect();
    segments.sort();
    segments
}

/// Custom check on a field; the error text completes "`field` ..."
#[derive(Clone, Copy)]
pub enum Validator {
    /// Applied to the value of a string field
    Value(fn(&str) -> std::result::Result<(), String>),
    /// Applied to every key of a map field
    Keys(fn(&str) -> std::result::Result<(), String>),
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Validator(..)")
    }
}

/// Declaration of a single field
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    /// Filled in by the backend or the resolver when not configured
    pub computed: bool,
    pub sensitive: bool,
    pub non_empty: bool,
    pub comparison: Comparison,
    pub default: Option<PropertyValue>,
    pub allowed: Option<&'static [&'static str]>,
    pub validator: Option<Validator>,
}

impl FieldSpec {
    fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
            computed: false,
            sensitive: false,
            non_empty: false,
            comparison: Comparison::Exact,
            default: None,
            allowed: None,
            validator: None,
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn bool(name: &'static str) -> Self {
        Self::new(name, FieldType::Bool)
    }

    pub fn int(name: &'static str) -> Self {
        Self::new(name, FieldType::Int)
    }

    pub fn list(name: &'static str) -> Self {
        Self::new(name, FieldType::List)
    }

    pub fn map(name: &'static str) -> Self {
        Self::new(name, FieldType::Map)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn non_empty(mut self) -> Self {
        self.non_empty = true;
        self
    }

    pub fn compare(mut self, comparison: Comparison) -> Self {
        self.comparison = comparison;
        self
    }

    pub fn default_value(mut self, value: impl Into<PropertyValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Restrict a string field to a fixed set of values
    pub fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = Some(allowed);
        self
    }

    /// Run `check` on string values of this field
    pub fn validate_with(mut self, check: fn(&str) -> std::result::Result<(), String>) -> Self {
        self.validator = Some(Validator::Value(check));
        self
    }

    /// Run `check` on each key of a map field
    pub fn validate_keys_with(mut self, check: fn(&str) -> std::result::Result<(), String>) -> Self {
        self.validator = Some(Validator::Keys(check));
        self
    }

    fn check(&self, value: &PropertyValue, problems: &mut Vec<String>) {
        if !self.field_type.matches(value) {
            problems.push(format!(
                "`{}` must be a {}, found {}",
                self.name,
                self.field_type,
                value.type_name()
            ));
            return;
        }

        if let PropertyValue::String(s) = value {
            if self.non_empty && s.is_empty() {
                problems.push(format!("`{}` must not be empty", self.name));
            }
            if let Some(allowed) = self.allowed {
                let ok = allowed.iter().any(|a| match self.comparison {
                    Comparison::CaseInsensitive => a.eq_ignore_ascii_case(s),
                    _ => a == s,
                });
                if !ok {
                    problems.push(format!(
                        "`{}` must be one of {:?}, found {:?}",
                        self.name, allowed, s
                    ));
                }
            }
        }

        match (self.validator, value) {
            (Some(Validator::Value(check)), PropertyValue::String(s)) => {
                if let Err(reason) = check(s) {
                    problems.push(format!("`{}` {}", self.name, reason));
                }
            }
            (Some(Validator::Keys(check)), PropertyValue::Map(entries)) => {
                for key in entries.keys() {
                    if let Err(reason) = check(key) {
                        problems.push(format!("`{}` key {:?} {}", self.name, key, reason));
                    }
                }
            }
            _ => {}
        }
    }
}

/// Field declarations for one resource kind
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    exactly_one_of: Vec<(&'static str, &'static str)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Declare two fields of which exactly one must be set
    pub fn exactly_one_of(mut self, a: &'static str, b: &'static str) -> Self {
        self.exactly_one_of.push((a, b));
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_sensitive(&self, name: &str) -> bool {
        self.get(name).is_some_and(|f| f.sensitive)
    }

    /// Check types, required fields, value constraints and exactly-one-of groups.
    /// All problems are reported at once.
    pub fn validate(&self, record: &PropertyRecord) -> Result<()> {
        let mut problems = Vec::new();

        for (name, value) in record.iter() {
            match self.get(name) {
                Some(spec) => spec.check(value, &mut problems),
                None => problems.push(format!("`{}` is not a known field", name)),
            }
        }

        for spec in &self.fields {
            if spec.required && !record.contains(spec.name) {
                problems.push(format!("`{}` is required", spec.name));
            }
        }

        for (a, b) in &self.exactly_one_of {
            match (record.contains(a), record.contains(b)) {
                (true, true) => problems.push(format!(
                    "only one of `{}` or `{}` can be specified",
                    a, b
                )),
                (false, false) => {
                    problems.push(format!("one of `{}` or `{}` must be specified", a, b))
                }
                _ => {}
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ReconcileError::invalid_config(problems.join("; ")))
        }
    }

    /// Fill declared defaults for absent fields
    /// Empty lists and maps are dropped, as they are for unset fields.
    pub fn apply_defaults(&self, record: &PropertyRecord) -> PropertyRecord {
        let mut filled = record.normalized();
        for spec in &self.fields {
            if let Some(default) = &spec.default {
                if !filled.contains(spec.name) {
                    filled.insert(spec.name, default.clone());
                }
            }
        }
        filled
    }

    /// Copy of the record with sensitive values masked, for display
    pub fn redact(&self, record: &PropertyRecord) -> PropertyRecord {
        record
            .iter()
            .map(|(name, value)| {
                let value = if self.is_sensitive(name) {
                    PropertyValue::String(SENSITIVE_PLACEHOLDER.to_string())
                } else {
                    value.clone()
                };
                (name.clone(), value)
            })
            .collect()
    }

    /// Compare two values of a field using its declared comparison
    pub fn equivalent(&self, name: &str, a: &PropertyValue, b: &PropertyValue) -> bool {
        match self.get(name) {
            Some(spec) => spec.comparison.equivalent(a, b),
            None => a == b,
        }
    }
}
