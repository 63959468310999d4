//! Tree-walking evaluation of a parsed expression

use glob::Pattern;
use regex::Regex;
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

use super::parser::{CompareOp, Expr, Segment};
use crate::engine::context::EvalContext;
use crate::engine::functions::FunctionRegistry;

/// Python-style truthiness
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Integers compare exactly, anything involving a float compares as f64
fn numbers_equal(a: &Number, b: &Number) -> bool {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x == y,
        _ => a.as_f64() == b.as_f64(),
    }
}

pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        _ => a == b,
    }
}

pub struct Interpreter<'a> {
    context: &'a EvalContext,
    functions: &'a FunctionRegistry,
    regex_cache: HashMap<String, Regex>,
}

impl<'a> Interpreter<'a> {
    pub fn new(context: &'a EvalContext, functions: &'a FunctionRegistry) -> Self {
        Self {
            context,
            functions,
            regex_cache: HashMap::new(),
        }
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value, String> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Expr::Path { root, segments, .. } => Ok(self.resolve(root, segments)),
            Expr::Call { name, args, .. } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.functions
                    .call(name, &args)
                    .map_err(|e| e.to_string())
            }
            Expr::Not(inner) => Ok(Value::Bool(!truthy(&self.eval(inner)?))),
            Expr::Neg(inner) => match self.eval(inner)? {
                Value::Number(n) => Ok(negate(&n)),
                other => Err(format!("cannot negate {}", type_name(&other))),
            },
            Expr::And(lhs, rhs) => {
                let left = self.eval(lhs)?;
                if !truthy(&left) {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(truthy(&self.eval(rhs)?)))
            }
            Expr::Or(lhs, rhs) => {
                let left = self.eval(lhs)?;
                if truthy(&left) {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(truthy(&self.eval(rhs)?)))
            }
            Expr::Compare { op, lhs, rhs } => {
                let left = self.eval(lhs)?;
                let right = self.eval(rhs)?;
                self.compare(*op, &left, &right).map(Value::Bool)
            }
        }
    }

    /// Missing roots, keys and indexes all resolve to null
    fn resolve(&self, root: &str, segments: &[Segment]) -> Value {
        let mut current = match self.context.get(root) {
            Some(value) => value,
            None => return Value::Null,
        };
        for segment in segments {
            let next = match (segment, current) {
                (Segment::Key(key), Value::Object(map)) => map.get(key),
                (Segment::Index(index), Value::Array(items)) => {
                    let len = items.len() as i64;
                    let index = if *index < 0 { len + index } else { *index };
                    usize::try_from(index).ok().and_then(|i| items.get(i))
                }
                _ => None,
            };
            match next {
                Some(value) => current = value,
                None => return Value::Null,
            }
        }
        current.clone()
    }

    fn compare(&mut self, op: CompareOp, left: &Value, right: &Value) -> Result<bool, String> {
        match op {
            CompareOp::Eq => Ok(values_equal(left, right)),
            CompareOp::Ne => Ok(!values_equal(left, right)),
            CompareOp::Lt => order(left, right).map(|o| o == Ordering::Less),
            CompareOp::Le => order(left, right).map(|o| o != Ordering::Greater),
            CompareOp::Gt => order(left, right).map(|o| o == Ordering::Greater),
            CompareOp::Ge => order(left, right).map(|o| o != Ordering::Less),
            CompareOp::In => contains(right, left),
            CompareOp::NotIn => contains(right, left).map(|found| !found),
            CompareOp::RegexMatch => {
                let Value::String(pattern) = right else {
                    return Err(format!(
                        "right side of '=~' must be a string, got {}",
                        type_name(right)
                    ));
                };
                let Value::String(text) = left else {
                    return Ok(false);
                };
                Ok(self.regex(pattern)?.is_match(text))
            }
            CompareOp::Glob => {
                let Value::String(pattern) = right else {
                    return Err(format!(
                        "right side of 'matches' must be a string, got {}",
                        type_name(right)
                    ));
                };
                let Value::String(text) = left else {
                    return Ok(false);
                };
                let glob = Pattern::new(pattern)
                    .map_err(|e| format!("invalid glob '{pattern}': {e}"))?;
                Ok(glob.matches(text))
            }
        }
    }

    fn regex(&mut self, pattern: &str) -> Result<&Regex, String> {
        if !self.regex_cache.contains_key(pattern) {
            let regex =
                Regex::new(pattern).map_err(|e| format!("invalid regex '{pattern}': {e}"))?;
            self.regex_cache.insert(pattern.to_string(), regex);
        }
        self.regex_cache
            .get(pattern)
            .ok_or_else(|| "regex cache inconsistency".to_string())
    }
}

fn negate(n: &Number) -> Value {
    if let Some(i) = n.as_i64() {
        if let Some(negated) = i.checked_neg() {
            return Value::Number(negated.into());
        }
    }
    n.as_f64()
        .and_then(|f| Number::from_f64(-f))
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn order(left: &Value, right: &Value) -> Result<Ordering, String> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
                return Ok(x.cmp(&y));
            }
            let (x, y) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
            x.partial_cmp(&y)
                .ok_or_else(|| format!("cannot order {x} and {y}"))
        }
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        _ => Err(format!(
            "cannot order {} and {}",
            type_name(left),
            type_name(right)
        )),
    }
}

/// `needle in container`
fn contains(container: &Value, needle: &Value) -> Result<bool, String> {
    match container {
        Value::Null => Ok(false),
        Value::String(haystack) => match needle {
            Value::String(needle) => Ok(haystack.contains(needle.as_str())),
            other => Err(format!(
                "'in <string>' requires a string on the left, got {}",
                type_name(other)
            )),
        },
        Value::Array(items) => Ok(items.iter().any(|item| values_equal(item, needle))),
        Value::Object(map) => Ok(needle.as_str().is_some_and(|key| map.contains_key(key))),
        other => Err(format!("'in' needs a string, list or object, got {}", type_name(other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::expression::parser::parse;
    use serde_json::json;

    fn eval(source: &str) -> Result<Value, String> {
        let context = json!({
            "tool_name": "Bash",
            "tool_input": {"command": "rm -rf /tmp/x", "timeout": 30, "edits": [{"old": "a"}]},
            "prompt": null,
            "git_staged_files": ["src/lib.rs"]
        })
        .as_object()
        .cloned()
        .unwrap();
        let functions = FunctionRegistry::builder().cwd("/").build();
        let expr = parse(source).map_err(|e| e.message)?;
        Interpreter::new(&context, &functions).eval(&expr)
    }

    fn check(source: &str) -> bool {
        truthy(&eval(source).unwrap())
    }

    #[test]
    fn test_truthiness() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!(""), json!([]), json!({})] {
            assert!(!truthy(&falsy), "{falsy}");
        }
        for value in [json!(true), json!(-1), json!("x"), json!([0]), json!({"a": 1})] {
            assert!(truthy(&value), "{value}");
        }
    }

    #[test]
    fn test_comparisons() {
        assert!(check(r#"tool_name == "Bash""#));
        assert!(check("tool_input.timeout == 30.0"));
        assert!(check("tool_input.timeout > 10 and tool_input.timeout <= 30"));
        assert!(check("'abc' < 'abd'"));
        assert!(check("-1 < 0"));
        assert!(check("tool_input.missing == null"));
        assert!(check("tool_input.edits[0].old == 'a'"));
        assert!(check("tool_input.edits[-1].old == 'a'"));
        assert!(!check("tool_input.edits[5].old == 'a'"));
    }

    #[test]
    fn test_membership() {
        assert!(check(r#""rm -rf" in tool_input.command"#));
        assert!(check("'src/lib.rs' in git_staged_files"));
        assert!(check("'command' in tool_input"));
        assert!(check("tool_name not in ['Read', 'Glob']"));
        assert!(!check("'x' in prompt"));
        assert!(eval("1 in tool_input.timeout").is_err());
        assert!(eval("1 in tool_name").is_err());
    }

    #[test]
    fn test_regex_and_glob_operators() {
        assert!(check(r#"tool_input.command =~ "rm\\s+-rf""#));
        assert!(!check("prompt =~ 'x'"));
        assert!(eval("tool_name =~ '('").is_err());
        assert!(check("'src/engine/mod.rs' matches 'src/**/*.rs'"));
        assert!(eval("tool_name matches 3").is_err());
    }

    #[test]
    fn test_short_circuit_skips_errors() {
        // the right side would be an ordering error if evaluated
        assert!(!check("false and tool_name < 1"));
        assert!(check("true or tool_name < 1"));
        assert!(eval("true and tool_name < 1").is_err());
    }

    #[test]
    fn test_function_calls() {
        assert!(check("$lower(tool_name) == 'bash'"));
        assert!(check("not $git_has_staged()"));
        let err = eval("$file_exists()").unwrap_err();
        assert!(err.contains("file_exists(path)"));
    }
}
