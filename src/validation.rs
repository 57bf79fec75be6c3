//! Variable Coverage - Rule/Policy Separation
//!
//! Rules compare a template's placeholders with the values on hand and produce
//! structured violations. Nothing here blocks generation: a missing value only
//! means its placeholder stays in the output.

use serde::{Deserialize, Serialize};

use crate::templates::Template;
use crate::variables::{is_standard, ValueMap};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True when every placeholder has a value.
    pub complete: bool,
    pub violations: Vec<ValidationViolation>,
    pub template_id: String,
    pub template_version: String,
}

impl ValidationResult {
    pub fn has_warnings(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Warning)
    }

    /// Placeholder names reported by [`MissingValuesRule`].
    pub fn missing(&self) -> Vec<&str> {
        self.violations
            .iter()
            .filter(|v| v.rule == MissingValuesRule.name())
            .filter_map(|v| v.expected.as_deref())
            .collect()
    }
}

/// What a template needs and what the caller supplied.
#[derive(Debug, Clone, Copy)]
pub struct CoverageInput<'a> {
    pub placeholders: &'a [String],
    pub values: &'a ValueMap,
}

/// Validation rule trait - produces violations
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, input: &CoverageInput<'_>) -> Vec<ValidationViolation>;
}

// --- Concrete Rules ---

pub struct MissingValuesRule;

impl ValidationRule for MissingValuesRule {
    fn name(&self) -> &'static str { "missing_value" }

    fn validate(&self, input: &CoverageInput<'_>) -> Vec<ValidationViolation> {
        input
            .placeholders
            .iter()
            .filter(|name| !input.values.contains_key(name))
            .map(|name| ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Warning,
                message: format!("No value for placeholder {{{{{name}}}}}"),
                expected: Some(name.clone()),
                actual: None,
                remediation: vec![format!("Add \"{name}\" to the template's extra fields")],
            })
            .collect()
    }
}

pub struct UnusedValuesRule;

impl ValidationRule for UnusedValuesRule {
    fn name(&self) -> &'static str { "unused_value" }

    fn validate(&self, input: &CoverageInput<'_>) -> Vec<ValidationViolation> {
        input
            .values
            .keys()
            .filter(|key| !is_standard(key))
            .filter(|key| !input.placeholders.iter().any(|p| p == key))
            .map(|key| ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Info,
                message: format!("Value \"{key}\" is not referenced by the template"),
                expected: None,
                actual: Some(key.to_string()),
                remediation: vec!["Remove the field or add its placeholder to the template".to_string()],
            })
            .collect()
    }
}

/// Validator orchestrates rules
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule + Send + Sync>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![Box::new(MissingValuesRule), Box::new(UnusedValuesRule)],
        }
    }

    pub fn validate(&self, input: &CoverageInput<'_>, template: &Template) -> ValidationResult {
        let violations: Vec<_> = self
            .rules
            .iter()
            .flat_map(|rule| rule.validate(input))
            .collect();

        let complete = !violations.iter().any(|v| v.severity == ViolationSeverity::Warning);

        ValidationResult {
            complete,
            violations,
            template_id: template.id.clone(),
            template_version: template.template_version.clone(),
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
