//! Condition expressions
//!
//! A rule's `condition` is compiled once per evaluation pass into an
//! [`ExpressionEvaluator`] and then run against the flat context produced by
//! [`HookContext::to_eval_context`]. Compilation rejects syntax errors,
//! unknown root variables and unknown function names, so a rule that compiles
//! can only fail at evaluation time through a runtime type problem.
//!
//! ```text
//! tool_name == "Bash" and "rm -rf" in tool_input.command
//! $is_path_under(tool_input.file_path, cwd) or not $git_has_staged("*.lock")
//! ```

mod interpreter;
mod lexer;
mod parser;

use thiserror::Error;

use super::context::{EvalContext, HookContext, CONTEXT_FIELDS};
use super::functions::{self, FunctionRegistry};

pub use interpreter::{truthy, values_equal};
pub use parser::{CompareOp, Expr, Segment};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionErrorKind {
    #[error("syntax error at position {position}: {message}")]
    Syntax { message: String, position: usize },

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid expression '{expression}': {kind}")]
pub struct ExpressionError {
    pub expression: String,
    pub kind: ExpressionErrorKind,
}

impl ExpressionError {
    fn new(expression: &str, kind: ExpressionErrorKind) -> Self {
        Self {
            expression: expression.to_string(),
            kind,
        }
    }

    /// Raised by `compile` rather than `evaluate`
    pub fn is_compile_error(&self) -> bool {
        !matches!(self.kind, ExpressionErrorKind::Evaluation(_))
    }
}

/// A compiled condition bound to one invocation's function registry
#[derive(Debug)]
pub struct ExpressionEvaluator<'r> {
    expression: String,
    /// `None` for an empty expression, which always matches
    program: Option<Expr>,
    functions: &'r FunctionRegistry,
}

impl<'r> ExpressionEvaluator<'r> {
    pub fn compile(
        expression: &str,
        functions: &'r FunctionRegistry,
    ) -> Result<Self, ExpressionError> {
        let program = compile_program(expression)?;
        Ok(Self {
            expression: expression.to_string(),
            program,
            functions,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn always_matches(&self) -> bool {
        self.program.is_none()
    }

    /// Adapt the context and evaluate
    pub fn evaluate(&self, context: &HookContext) -> Result<bool, ExpressionError> {
        self.evaluate_with(&context.to_eval_context())
    }

    /// Evaluate against an already-adapted context
    pub fn evaluate_with(&self, context: &EvalContext) -> Result<bool, ExpressionError> {
        let Some(program) = &self.program else {
            return Ok(true);
        };
        interpreter::Interpreter::new(context, self.functions)
            .eval(program)
            .map(|value| truthy(&value))
            .map_err(|message| {
                ExpressionError::new(&self.expression, ExpressionErrorKind::Evaluation(message))
            })
    }
}

/// Check an expression without binding it to any invocation data
pub fn validate(expression: &str) -> Result<(), ExpressionError> {
    compile_program(expression).map(|_| ())
}

fn compile_program(expression: &str) -> Result<Option<Expr>, ExpressionError> {
    if expression.trim().is_empty() {
        return Ok(None);
    }

    let program = parser::parse(expression).map_err(|e| {
        ExpressionError::new(
            expression,
            ExpressionErrorKind::Syntax {
                message: e.message,
                position: e.position,
            },
        )
    })?;

    let mut problem = None;
    program.walk(&mut |node| {
        if problem.is_some() {
            return;
        }
        match node {
            Expr::Path { root, .. } if !CONTEXT_FIELDS.contains(&root.as_str()) => {
                problem = Some(ExpressionErrorKind::UnknownVariable(root.clone()));
            }
            Expr::Call { name, .. } if !functions::is_known_function(name) => {
                problem = Some(ExpressionErrorKind::UnknownFunction(name.clone()));
            }
            _ => {}
        }
    });

    match problem {
        Some(kind) => Err(ExpressionError::new(expression, kind)),
        None => Ok(Some(program)),
    }
}
