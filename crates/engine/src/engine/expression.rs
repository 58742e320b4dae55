//! Guard condition evaluation

use minijinja::value::ValueKind;
use minijinja::{Environment, UndefinedBehavior};

use crate::failure::Failure;
use crate::state::Variables;

/// Evaluates sequence flow conditions against process instance variables
///
/// Conditions are minijinja expressions (`amount > 100 and region == "EU"`).
/// Anything that does not produce a boolean is a condition failure.
pub struct ExpressionLanguage {
    env: Environment<'static>,
}

impl Default for ExpressionLanguage {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionLanguage {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Self { env }
    }

    pub fn evaluate_condition(
        &self,
        expression: &str,
        variables: &Variables,
    ) -> Result<bool, Failure> {
        let compiled = self.env.compile_expression(expression).map_err(|err| {
            Failure::condition(
                expression,
                format!("failed to parse expression '{expression}': {err}"),
            )
        })?;

        let value = compiled.eval(variables).map_err(|err| {
            Failure::condition(
                expression,
                format!("failed to evaluate expression '{expression}': {err}"),
            )
        })?;

        match value.kind() {
            ValueKind::Bool => Ok(value.is_true()),
            kind => Err(Failure::condition(
                expression,
                format!(
                    "expected expression '{expression}' to evaluate to a boolean, got {kind:?}"
                ),
            )),
        }
    }
}

impl std::fmt::Debug for ExpressionLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionLanguage").finish_non_exhaustive()
    }
}
