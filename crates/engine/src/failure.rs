//! Business failures
//!
//! A [`Failure`] is the expected, recoverable outcome of a completion attempt
//! that cannot proceed. It is a value, not an error: the processor that receives
//! it turns it into an incident on the element instance.

use serde::{Deserialize, Serialize};

/// Classification of a failure, carried on the incident record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// A guard condition could not be evaluated, or no outgoing flow matched
    ConditionError,

    /// A variable required for completion is not set
    MissingVariable,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConditionError => write!(f, "condition-error"),
            Self::MissingVariable => write!(f, "missing-variable"),
        }
    }
}

/// Why a completion could not proceed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub error_type: ErrorType,
    pub message: String,

    /// The variable or expression the failure refers to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

impl Failure {
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
            expression: None,
        }
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    pub fn missing_variable(element_id: &str, variable: &str) -> Self {
        Self::new(
            ErrorType::MissingVariable,
            format!(
                "expected variable '{variable}' to be set when completing element '{element_id}'"
            ),
        )
        .with_expression(variable)
    }

    pub fn condition(expression: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorType::ConditionError, message).with_expression(expression)
    }

    pub fn no_matching_flow(element_id: &str) -> Self {
        Self::new(
            ErrorType::ConditionError,
            format!(
                "expected at least one condition of element '{element_id}' to evaluate to true, or to have a default flow"
            ),
        )
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_type, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_variable() {
        let failure = Failure::missing_variable("review", "approved");

        assert_eq!(failure.error_type, ErrorType::MissingVariable);
        assert_eq!(failure.expression.as_deref(), Some("approved"));
        assert!(failure.to_string().starts_with("missing-variable: "));
    }

    #[test]
    fn test_serialization_skips_empty_expression() {
        let failure = Failure::no_matching_flow("gw");
        let json = serde_json::to_value(&failure).unwrap();

        assert_eq!(json["error_type"], "condition_error");
        assert!(json.get("expression").is_none());
    }
}
