//! Validation outcome types

use serde::{Deserialize, Serialize};

use crate::Severity;

/// One problem found with a record.
///
/// ERROR issues block the save; WARNING issues require acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// Human-readable message
    pub message: String,
    /// Machine-readable code
    pub code: String,
    /// Field the issue belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub severity: Severity,
}

impl ValidationIssue {
    pub fn error(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            field: None,
            severity: Severity::Error,
        }
    }

    pub fn warning(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(message, code)
        }
    }

    pub fn on_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Aggregated outcome of validating one record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// True if and only if `errors` is empty
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledgment_token: Option<String>,
}

impl ValidationResult {
    /// Create a valid result with no issues.
    pub fn valid() -> Self {
        Self {
            valid: true,
            ..Self::default()
        }
    }

    /// Split issues by severity.
    pub fn from_issues(issues: impl IntoIterator<Item = ValidationIssue>) -> Self {
        let (errors, warnings): (Vec<_>, Vec<_>) =
            issues.into_iter().partition(ValidationIssue::is_error);
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
            acknowledgment_token: None,
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Sorted, de-duplicated warning codes.
    pub fn warning_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.warnings.iter().map(|w| w.code.clone()).collect();
        codes.sort();
        codes.dedup();
        codes
    }

    /// Apply a transformation to every issue message.
    pub fn map_messages(mut self, mut f: impl FnMut(&str) -> String) -> Self {
        for issue in self.errors.iter_mut().chain(self.warnings.iter_mut()) {
            issue.message = f(&issue.message);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_warnings_do_not_invalidate() {
        let result = ValidationResult::from_issues(vec![
            ValidationIssue::warning("Looks odd", "ODD"),
            ValidationIssue::warning("Looks odder", "ODDER"),
        ]);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 2);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_warning_codes_sorted() {
        let result = ValidationResult::from_issues(vec![
            ValidationIssue::warning("b", "B"),
            ValidationIssue::warning("a", "A"),
            ValidationIssue::warning("b again", "B"),
        ]);
        assert_eq!(result.warning_codes(), vec!["A", "B"]);
    }

    fn arb_issue() -> impl Strategy<Value = ValidationIssue> {
        ("[a-z]{1,8}", "[A-Z_]{1,8}", any::<bool>()).prop_map(|(message, code, is_error)| {
            if is_error {
                ValidationIssue::error(message, code)
            } else {
                ValidationIssue::warning(message, code)
            }
        })
    }

    proptest! {
        #[test]
        fn prop_valid_iff_no_errors(issues in prop::collection::vec(arb_issue(), 0..12)) {
            let error_count = issues.iter().filter(|i| i.is_error()).count();
            let result = ValidationResult::from_issues(issues.clone());
            prop_assert_eq!(result.valid, error_count == 0);
            prop_assert_eq!(result.errors.len() + result.warnings.len(), issues.len());
        }
    }
}
